// Image Service Library
//
// Composes an uploaded JPEG onto a fixed-size canvas, tiles a PNG watermark
// over the result and stores it as a PNG file.

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod server;
pub mod sink;
pub mod watermark;
