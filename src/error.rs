// Error types module
//
// Every way a single composition request can fail, with the HTTP status each
// one is reported with. None of these affect other requests.

use thiserror::Error;

use crate::codec::{CodecError, ImagePart};
use crate::sink::SinkError;
use crate::watermark::CompositeError;

/// Terminal failure of one composition request.
///
/// Categories:
/// - input: `NotMultipart`, `MalformedMultipart`, `MissingPart`, `Decode`, `PayloadTooLarge`
/// - geometry: `Composite`
/// - sink: `Sink`
/// - unexpected: `Timeout`, `Abandoned`, `Internal`
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Needed multipart data: {0}")]
    NotMultipart(String),

    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    #[error("Failed get form part '{0}': part is missing")]
    MissingPart(ImagePart),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Decode(#[from] CodecError),

    #[error("Failed to compose image: {0}")]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Composition did not finish within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Composition abandoned: nobody is waiting for the result")]
    Abandoned,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Maps pipeline errors to HTTP status codes
    ///
    /// - input errors → 400, oversized body → 413
    /// - geometry, sink and internal errors → 500
    /// - timeout → 504
    pub fn to_http_status(&self) -> u16 {
        match self {
            PipelineError::NotMultipart(_)
            | PipelineError::MalformedMultipart(_)
            | PipelineError::MissingPart(_) => 400,

            PipelineError::Decode(CodecError::DecodeFailed { .. }) => 400,
            PipelineError::Decode(CodecError::EncodeFailed { .. }) => 500,

            PipelineError::PayloadTooLarge { .. } => 413,

            PipelineError::Composite(_)
            | PipelineError::Sink(_)
            | PipelineError::Abandoned
            | PipelineError::Internal(_) => 500,

            PipelineError::Timeout { .. } => 504,
        }
    }

    /// The upload part this error is about, if it concerns one.
    pub fn part(&self) -> Option<ImagePart> {
        match self {
            PipelineError::MissingPart(part) => Some(*part),
            PipelineError::Decode(err) => err.part(),
            _ => None,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NotMultipart(_)
            | PipelineError::MalformedMultipart(_)
            | PipelineError::MissingPart(_)
            | PipelineError::PayloadTooLarge { .. } => "input",
            PipelineError::Decode(_) => "decode",
            PipelineError::Composite(_) => "geometry",
            PipelineError::Sink(_) => "sink",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::Abandoned => "abandoned",
            PipelineError::Internal(_) => "internal",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PipelineError::Internal(message.into())
    }
}
