//! Placement geometry for composition.
//!
//! Everything here is integer arithmetic on rectangles and needs no pixel
//! data, so the orchestrator and the tests can plan a composition without
//! touching an image.
//!
//! # Example
//!
//! ```
//! use image_service::watermark::geometry::{plan_overlay, Rect};
//!
//! let canvas = Rect::from_size(1024, 768);
//! let source = Rect::from_size(2000, 2000);
//!
//! let plan = plan_overlay(canvas, source).unwrap();
//! assert_eq!((plan.width, plan.height), (768, 768));
//! assert_eq!((plan.offset.x, plan.offset.y), (128, 0));
//! ```

use super::error::CompositeError;

/// Rounding bias applied when deriving the unconstrained axis of a
/// proportional resize.
const DERIVED_AXIS_BIAS: f64 = 0.7;

/// Axis-aligned integer rectangle.
///
/// Width and height are derived from the bounds and are never negative:
/// constructors normalise inverted bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Origin-anchored rectangle of the given size.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, clamp_i32(width), clamp_i32(height))
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Same size, moved by `offset`.
    pub fn translate(&self, offset: PlacementPosition) -> Self {
        Self::new(
            self.x0 + offset.x,
            self.y0 + offset.y,
            self.x1 + offset.x,
            self.y1 + offset.y,
        )
    }

    /// Overlap with `other`, or `None` if they do not intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Rect { x0, y0, x1, y1 })
    }
}

/// Top-left corner at which an image is drawn onto the canvas.
///
/// Coordinates may be negative; drawing clips to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Requested resize target. A zero on one axis means "derive it from the
/// other axis, keeping the aspect ratio".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

/// Chooses which axis constrains the proportional resize of `source` onto
/// `canvas`.
///
/// Compares the floored canvas/source height ratio with the floored
/// canvas/source width ratio. A strictly greater height ratio fits the width;
/// anything else, ties included, fits the height.
pub fn resize_dimension(canvas: Rect, source: Rect) -> Result<ResizeTarget, CompositeError> {
    ensure_not_empty("canvas", canvas)?;
    ensure_not_empty("source", source)?;

    let height_ratio = canvas.height() / source.height();
    let width_ratio = canvas.width() / source.width();

    if height_ratio > width_ratio {
        Ok(ResizeTarget {
            width: canvas.width() as u32,
            height: 0,
        })
    } else {
        Ok(ResizeTarget {
            width: 0,
            height: canvas.height() as u32,
        })
    }
}

/// Resolves a [`ResizeTarget`] against the source size into concrete output
/// dimensions.
pub fn resolve_resize(target: ResizeTarget, source_width: u32, source_height: u32) -> (u32, u32) {
    match (target.width, target.height) {
        (0, 0) => (source_width, source_height),
        (0, height) => {
            let scale = source_height as f64 / height as f64;
            (derive_axis(source_width, scale), height)
        }
        (width, 0) => {
            let scale = source_width as f64 / width as f64;
            (width, derive_axis(source_height, scale))
        }
        (width, height) => (width, height),
    }
}

fn derive_axis(source: u32, scale: f64) -> u32 {
    ((DERIVED_AXIS_BIAS + source as f64 / scale) as u32).max(1)
}

/// Offset that centres an `inner` sized block inside `outer`.
///
/// Integer division truncates toward zero, so an odd leftover pixel ends up
/// on the right/bottom edge.
pub fn center_offset(outer: Rect, inner_width: i32, inner_height: i32) -> PlacementPosition {
    PlacementPosition::new(
        (outer.width() - inner_width) / 2,
        (outer.height() - inner_height) / 2,
    )
}

/// Size and position of a source after the scale-and-centre step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayPlan {
    pub width: u32,
    pub height: u32,
    pub offset: PlacementPosition,
}

/// Plans an overlay of `source` onto `canvas` without touching pixels.
pub fn plan_overlay(canvas: Rect, source: Rect) -> Result<OverlayPlan, CompositeError> {
    let target = resize_dimension(canvas, source)?;
    let (width, height) = resolve_resize(target, source.width() as u32, source.height() as u32);
    Ok(OverlayPlan {
        width,
        height,
        offset: center_offset(canvas, clamp_i32(width), clamp_i32(height)),
    })
}

/// A centred grid of unscaled watermark copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub rows: u32,
    pub cols: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Top-left corner of the whole tiled block.
    pub offset: PlacementPosition,
}

impl TileGrid {
    pub fn tile_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Size of the tiled block.
    pub fn block_size(&self) -> (u32, u32) {
        (self.tile_width * self.cols, self.tile_height * self.rows)
    }

    /// Tile positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = PlacementPosition> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| {
                PlacementPosition::new(
                    self.offset.x + (self.tile_width * col) as i32,
                    self.offset.y + (self.tile_height * row) as i32,
                )
            })
        })
    }
}

/// Computes the tiling of `watermark` over `canvas`.
///
/// Returns `Ok(None)` when the watermark does not fit at least once on some
/// axis; the caller then falls back to a single scaled overlay.
pub fn tile_grid(canvas: Rect, watermark: Rect) -> Result<Option<TileGrid>, CompositeError> {
    ensure_not_empty("canvas", canvas)?;
    ensure_not_empty("watermark", watermark)?;

    let rows = canvas.height() / watermark.height();
    let cols = canvas.width() / watermark.width();
    if rows == 0 || cols == 0 {
        return Ok(None);
    }

    let offset = center_offset(
        canvas,
        watermark.width() * cols,
        watermark.height() * rows,
    );

    Ok(Some(TileGrid {
        rows: rows as u32,
        cols: cols as u32,
        tile_width: watermark.width() as u32,
        tile_height: watermark.height() as u32,
        offset,
    }))
}

fn ensure_not_empty(role: &'static str, rect: Rect) -> Result<(), CompositeError> {
    if rect.is_empty() {
        return Err(CompositeError::DegenerateRect {
            role,
            width: rect.width(),
            height: rect.height(),
        });
    }
    Ok(())
}

fn clamp_i32(value: u32) -> i32 {
    value.min(i32::MAX as u32) as i32
}
