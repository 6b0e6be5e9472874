//! Proportional resampling of source images.

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::RgbaImage;
use std::num::NonZeroU32;

use super::error::CompositeError;

/// Resize `img` to exactly `target_w` x `target_h` with a Catmull-Rom
/// (bicubic) convolution.
///
/// The convolution runs on premultiplied alpha, so the colour of fully
/// transparent pixels does not bleed into translucent edges.
///
/// Returns a copy when the size is unchanged.
pub fn resize_rgba(
    img: &RgbaImage,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage, CompositeError> {
    if img.width() == target_w && img.height() == target_h {
        return Ok(img.clone());
    }

    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| CompositeError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| CompositeError::resize_failed("Source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| CompositeError::resize_failed("Target width is 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| CompositeError::resize_failed("Target height is 0"))?;

    let mut src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| {
        CompositeError::resize_failed(format!("Failed to create source image: {:?}", e))
    })?;

    let alpha_mul_div = MulDiv::default();
    alpha_mul_div
        .multiply_alpha_inplace(&mut src_image.view_mut())
        .map_err(|e| CompositeError::resize_failed(format!("Failed to multiply alpha: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut dst_view = dst_image.view_mut();

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::CatmullRom));

    resizer
        .resize(&src_image.view(), &mut dst_view)
        .map_err(|e| CompositeError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    alpha_mul_div
        .divide_alpha_inplace(&mut dst_view)
        .map_err(|e| CompositeError::resize_failed(format!("Failed to divide alpha: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| CompositeError::resize_failed("Failed to create output image buffer"))
}
