// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install the JSON log subscriber shared by the image service binaries.
///
/// Every event emitted while a request is handled carries the `request`
/// span, so its `request_id`, method and path show up next to composition
/// outcomes and sink paths. Events are filtered by `RUST_LOG`, falling back
/// to [`DEFAULT_LOG_FILTER`], and written to stdout.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
///
/// # Examples
///
/// ```
/// use image_service::logging::init_subscriber;
///
/// init_subscriber().expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber() -> Result<(), Box<dyn Error>> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref())?;

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(true),
        )
        .try_init()?;

    Ok(())
}

/// Build an `EnvFilter` from a directive string, or the default when absent.
pub fn build_filter(directives: Option<&str>) -> Result<EnvFilter, Box<dyn Error>> {
    match directives {
        Some(d) if !d.trim().is_empty() => Ok(EnvFilter::try_new(d)?),
        _ => Ok(EnvFilter::try_new(DEFAULT_LOG_FILTER)?),
    }
}
