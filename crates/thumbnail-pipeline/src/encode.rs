//! JPEG serialization of finished rasters
//!
//! Output is plain baseline JPEG. No EXIF, XMP or ICC data is written, so
//! nothing from the source image's capture metadata leaks into thumbnails.

use crate::error::ThumbnailError;
use image::codecs::jpeg::JpegEncoder;
use crate::resample::over_black;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

pub const MIN_QUALITY: i32 = 1;
pub const MAX_QUALITY: i32 = 100;

/// Clamp any requested quality into the range the encoder accepts
pub fn clamp_quality(quality: i32) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY) as u8
}

/// Encode `raster` as JPEG at `quality`.
///
/// JPEG has no alpha, so the raster is composited onto black first: fully
/// transparent pixels come out black whatever color they carry.
pub fn encode_jpeg(raster: RgbaImage, quality: i32) -> Result<Vec<u8>, ThumbnailError> {
    let rgb = RgbImage::from_fn(raster.width(), raster.height(), |x, y| {
        let Rgba([r, g, b, a]) = *raster.get_pixel(x, y);
        Rgb([over_black(r, a), over_black(g, a), over_black(b, a)])
    });

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, clamp_quality(quality))
        .encode_image(&rgb)
        .map_err(ThumbnailError::Encode)?;

    Ok(buffer)
}
