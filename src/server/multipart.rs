// Multipart upload reading
//
// Turns a `multipart/form-data` request body into the two encoded parts a
// composition needs. Parts other than `image` and `watermark` are skipped;
// when a part name repeats, the first occurrence wins.

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use std::convert::Infallible;

use crate::codec::ImagePart;
use crate::error::PipelineError;
use crate::orchestrator::EncodedParts;

/// Extract the multipart boundary from a `Content-Type` header value.
pub fn boundary(content_type: Option<&str>) -> Result<String, PipelineError> {
    let content_type = content_type.ok_or_else(|| {
        PipelineError::NotMultipart("request Content-Type isn't multipart/form-data".to_string())
    })?;

    multer::parse_boundary(content_type).map_err(|e| PipelineError::NotMultipart(e.to_string()))
}

/// Collect the whole request body, refusing anything above `limit` bytes.
pub async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, PipelineError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(PipelineError::PayloadTooLarge { limit })
        }
        Err(e) => Err(PipelineError::MalformedMultipart(format!(
            "failed to read request body: {}",
            e
        ))),
    }
}

/// Split a collected multipart body into its `image` and `watermark` parts.
pub async fn read_parts(boundary: String, body: Bytes) -> Result<EncodedParts, PipelineError> {
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut image: Option<Bytes> = None;
    let mut watermark: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::MalformedMultipart(e.to_string()))?
    {
        let part = field.name().and_then(ImagePart::from_field_name);
        let slot = match part {
            Some(ImagePart::Image) => &mut image,
            Some(ImagePart::Watermark) => &mut watermark,
            None => {
                tracing::debug!(name = ?field.name(), "Skipping unknown form part");
                continue;
            }
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| PipelineError::MalformedMultipart(e.to_string()))?;

        if slot.is_none() {
            *slot = Some(data);
        }
    }

    // Background is checked first, matching the order parts are decoded in.
    let image = image.ok_or(PipelineError::MissingPart(ImagePart::Image))?;
    let watermark = watermark.ok_or(PipelineError::MissingPart(ImagePart::Watermark))?;

    Ok(EncodedParts { image, watermark })
}
