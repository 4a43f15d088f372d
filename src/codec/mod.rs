//! Raster codec
//!
//! Decoding of source photographs, encoding of the composited result, and
//! aspect-preserving scaling of small decorative assets.

pub mod encoder;
pub mod error;

pub use encoder::{EncoderFactory, EncoderQuality, ImageEncoder, OutputFormat};
pub use error::CodecError;

use std::io::Cursor;
use std::num::NonZeroU32;

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::{DynamicImage, ImageReader, RgbaImage};

/// Decode image bytes, sniffing the format from the content.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, CodecError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CodecError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| CodecError::decode_failed(e.to_string()))
}

/// Encode an RGBA raster to `format`.
pub fn encode_image(
    image: &RgbaImage,
    format: OutputFormat,
    quality: EncoderQuality,
) -> Result<Vec<u8>, CodecError> {
    EncoderFactory::create(format).encode(image.as_raw(), image.width(), image.height(), quality)
}

/// Resize an RGBA raster with a Lanczos3 convolution.
///
/// Filtering runs on premultiplied alpha so fully transparent pixels do not
/// bleed their colour into the edges of the asset.
pub fn resize_rgba(
    image: &RgbaImage,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage, CodecError> {
    if image.width() == target_w && image.height() == target_h {
        return Ok(image.clone());
    }

    let src_width = NonZeroU32::new(image.width())
        .ok_or_else(|| CodecError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(image.height())
        .ok_or_else(|| CodecError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| CodecError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| CodecError::resize_failed("Target height is 0"))?;

    let mut src_image = Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| CodecError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let alpha = MulDiv::default();
    alpha
        .multiply_alpha_inplace(&mut src_image.view_mut())
        .map_err(|e| CodecError::resize_failed(format!("Failed to premultiply alpha: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut dst_view = dst_image.view_mut();
    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_view)
        .map_err(|e| CodecError::resize_failed(format!("Resize operation failed: {:?}", e)))?;
    alpha
        .divide_alpha_inplace(&mut dst_view)
        .map_err(|e| CodecError::resize_failed(format!("Failed to unpremultiply alpha: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| CodecError::resize_failed("Failed to create output image buffer"))
}
