//! Codec layer: decodes the uploaded parts and encodes the composed canvas.
//!
//! Each form part has one fixed codec. The background (`image`) must be a
//! JPEG, the watermark a PNG so it can carry transparency. Output is always
//! PNG.

use image::codecs::png::PngEncoder;
use image::{ImageEncoder as _, ImageFormat, RgbaImage};
use std::fmt;
use thiserror::Error;

use crate::constants::{IMAGE_PART, WATERMARK_PART};

/// A named part of the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImagePart {
    /// Background image, JPEG
    Image,
    /// Watermark image, PNG
    Watermark,
}

impl ImagePart {
    /// Form field name of this part.
    pub fn field_name(&self) -> &'static str {
        match self {
            ImagePart::Image => IMAGE_PART,
            ImagePart::Watermark => WATERMARK_PART,
        }
    }

    /// The only codec accepted for this part.
    pub fn expected_format(&self) -> ImageFormat {
        match self {
            ImagePart::Image => ImageFormat::Jpeg,
            ImagePart::Watermark => ImageFormat::Png,
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            IMAGE_PART => Some(ImagePart::Image),
            WATERMARK_PART => Some(ImagePart::Watermark),
            _ => None,
        }
    }
}

impl fmt::Display for ImagePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Errors from decoding or encoding image bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Bytes of a part could not be decoded with its codec
    #[error("Failed to decode {format} in part '{part}': {message}")]
    DecodeFailed {
        part: ImagePart,
        format: &'static str,
        message: String,
    },

    /// The canvas could not be encoded
    #[error("Failed to encode to {format}: {message}")]
    EncodeFailed {
        format: &'static str,
        message: String,
    },
}

impl CodecError {
    /// The part that failed to decode, if any.
    pub fn part(&self) -> Option<ImagePart> {
        match self {
            CodecError::DecodeFailed { part, .. } => Some(*part),
            CodecError::EncodeFailed { .. } => None,
        }
    }
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        _ => "image",
    }
}

/// Decode the bytes of `part` with that part's codec into an RGBA buffer.
pub fn decode_part(part: ImagePart, data: &[u8]) -> Result<RgbaImage, CodecError> {
    let format = part.expected_format();
    image::load_from_memory_with_format(data, format)
        .map(|img| img.to_rgba8())
        .map_err(|e| CodecError::DecodeFailed {
            part,
            format: format_name(format),
            message: e.to_string(),
        })
}

/// Encode a canvas as PNG.
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, CodecError> {
    let mut output = Vec::new();
    PngEncoder::new(&mut output)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| CodecError::EncodeFailed {
            format: "png",
            message: e.to_string(),
        })?;
    Ok(output)
}
