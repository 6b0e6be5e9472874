//! Compositor error types.

use thiserror::Error;

/// Errors that can occur while composing pixel buffers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompositeError {
    /// A canvas or source rectangle has no area
    #[error("Degenerate {role} rectangle {width}x{height}")]
    DegenerateRect {
        role: &'static str,
        width: i32,
        height: i32,
    },

    /// Resampling the source image failed
    #[error("Resize failed: {0}")]
    ResizeFailed(String),
}

impl CompositeError {
    pub fn resize_failed(message: impl Into<String>) -> Self {
        CompositeError::ResizeFailed(message.into())
    }
}
