// Constants module - centralized default values for configuration
//
// These are the values the service runs with when no configuration file is
// given, or when a section of the file omits a field.

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listening port
pub const DEFAULT_PORT: u16 = 3210;

/// Default time the response path waits for a composition, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default maximum request body size (32 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 32 << 20;

/// Path of the composition endpoint
pub const WATERMARK_ROUTE: &str = "/watermark";

/// Liveness probe path
pub const HEALTH_ROUTE: &str = "/health";

/// Prometheus scrape path
pub const METRICS_ROUTE: &str = "/metrics";

// =============================================================================
// Canvas defaults
// =============================================================================

/// Default canvas width in pixels
pub const DEFAULT_CANVAS_WIDTH: u32 = 1024;

/// Default canvas height in pixels
pub const DEFAULT_CANVAS_HEIGHT: u32 = 768;

// =============================================================================
// Output defaults
// =============================================================================

/// Default directory for composed images
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp";

/// File extension of composed images
pub const OUTPUT_EXTENSION: &str = "png";

// =============================================================================
// Multipart part names
// =============================================================================

/// Form part carrying the background image (JPEG)
pub const IMAGE_PART: &str = "image";

/// Form part carrying the watermark image (PNG)
pub const WATERMARK_PART: &str = "watermark";
