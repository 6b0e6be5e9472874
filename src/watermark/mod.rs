//! Compositor: draws a background image onto a fixed-size canvas and tiles a
//! watermark over the result.
//!
//! # Algorithm
//!
//! - **Overlay**: the source is scaled proportionally so that one axis matches
//!   the canvas (the axis is picked by comparing floored size ratios), then
//!   drawn centred with source-over blending.
//! - **Put watermark**: the watermark is repeated unscaled as many times as it
//!   fits on each axis, the whole block centred on the canvas. If it does not
//!   fit even once on some axis it is overlaid like a background instead.
//!
//! Nothing in this module does I/O or spawns work; callers own the canvas.

pub mod compositor;
pub mod error;
pub mod geometry;
pub mod resize;

pub use compositor::{blend_over, draw_over, ImageTransformer, Transformer};
#[cfg(test)]
pub use compositor::MockTransformer;
pub use error::CompositeError;
pub use geometry::{
    center_offset, plan_overlay, resize_dimension, resolve_resize, tile_grid, OverlayPlan,
    PlacementPosition, Rect, ResizeTarget, TileGrid,
};
pub use resize::resize_rgba;
