//! Compositor for drawing a background and a tiled watermark onto a canvas.
//!
//! Both operations take a caller-owned mutable canvas and a read-only source
//! image. Sources are never modified; scaling always produces a new buffer.
//!
//! # Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use image_service::watermark::{ImageTransformer, Transformer};
//!
//! let mut canvas = RgbaImage::new(64, 48);
//! let background = RgbaImage::from_pixel(128, 96, Rgba([0, 0, 255, 255]));
//! let watermark = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 128]));
//!
//! let transformer = ImageTransformer::new();
//! transformer.overlay(&mut canvas, &background).unwrap();
//! transformer.put_watermark(&mut canvas, &watermark).unwrap();
//! ```

use super::error::CompositeError;
use super::geometry::{plan_overlay, tile_grid, PlacementPosition, Rect};
use super::resize::resize_rgba;
use image::{Rgba, RgbaImage};

/// Draws images onto a canvas.
///
/// The orchestrator only talks to this trait, which lets tests substitute a
/// double that fails without real pixel data.
#[cfg_attr(test, mockall::automock)]
pub trait Transformer: Send + Sync {
    /// Scales `source` proportionally to fit the canvas and draws it centred.
    fn overlay(&self, canvas: &mut RgbaImage, source: &RgbaImage) -> Result<(), CompositeError>;

    /// Tiles `watermark` unscaled over the canvas as a centred block, or falls
    /// back to [`Transformer::overlay`] when it does not fit at least once.
    fn put_watermark(
        &self,
        canvas: &mut RgbaImage,
        watermark: &RgbaImage,
    ) -> Result<(), CompositeError>;
}

/// The pixel-buffer implementation of [`Transformer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTransformer;

impl ImageTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for ImageTransformer {
    fn overlay(&self, canvas: &mut RgbaImage, source: &RgbaImage) -> Result<(), CompositeError> {
        let plan = plan_overlay(bounds(canvas), bounds(source))?;
        let resized = resize_rgba(source, plan.width, plan.height)?;
        draw_over(canvas, &resized, plan.offset);
        Ok(())
    }

    fn put_watermark(
        &self,
        canvas: &mut RgbaImage,
        watermark: &RgbaImage,
    ) -> Result<(), CompositeError> {
        let grid = match tile_grid(bounds(canvas), bounds(watermark))? {
            Some(grid) => grid,
            None => return self.overlay(canvas, watermark),
        };

        for position in grid.positions() {
            draw_over(canvas, watermark, position);
        }
        Ok(())
    }
}

fn bounds(img: &RgbaImage) -> Rect {
    Rect::from_size(img.width(), img.height())
}

/// Draw `src` onto `canvas` with its top-left corner at `position`, using
/// source-over blending. Parts of `src` outside the canvas are clipped.
pub fn draw_over(canvas: &mut RgbaImage, src: &RgbaImage, position: PlacementPosition) {
    let placed = bounds(src).translate(position);
    let visible = match bounds(canvas).intersect(&placed) {
        Some(rect) => rect,
        None => return,
    };

    for ty in visible.y0..visible.y1 {
        for tx in visible.x0..visible.x1 {
            let sx = (tx - position.x) as u32;
            let sy = (ty - position.y) as u32;

            let fg = *src.get_pixel(sx, sy);
            let dst = canvas.get_pixel_mut(tx as u32, ty as u32);
            *dst = blend_over(*dst, fg);
        }
    }
}

/// Porter-Duff "over": `out = fg + bg * (1 - fg.alpha)`, on straight
/// (non-premultiplied) RGBA.
pub fn blend_over(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    match foreground[3] {
        255 => return foreground,
        0 => return background,
        _ => {}
    }

    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
