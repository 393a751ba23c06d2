//! Source decoding and raster resampling
//!
//! Two interchangeable backends produce the planned raster:
//!
//! - [`ResampleStrategy::ScaleAndSharpen`] scales with a triangle (bilinear)
//!   filter, then runs a light 3x3 sharpening convolution to win back the
//!   softness the low-pass filter introduces.
//! - [`ResampleStrategy::LibraryThumbnail`] hands the whole job to the `image`
//!   crate's thumbnail routine. No sharpening, so output is visibly softer.
//!
//! A deployment should pick one and stick with it. EXIF orientation is never
//! applied: whatever orientation the decoder yields is final.

use crate::error::ThumbnailError;
use crate::plan::SizePlan;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, ImageReader, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Largest planned raster accepted, matching the decoder's default allocation limit
pub const MAX_RASTER_BYTES: u64 = 512 * 1024 * 1024;

/// 3x3 sharpening kernel applied after scaling, row-major
pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [
    [0.0, -0.05, 0.0],
    [-0.05, 1.2, -0.05],
    [0.0, -0.05, 0.0],
];

const SHARPEN_GAIN: f32 = 1.0;
const SHARPEN_BIAS: f32 = 0.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleStrategy {
    /// Bilinear scale to the exact plan followed by the sharpening pass
    #[default]
    ScaleAndSharpen,
    /// The `image` crate's exact thumbnail routine, no sharpening
    LibraryThumbnail,
}

impl std::fmt::Display for ResampleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleStrategy::ScaleAndSharpen => write!(f, "scale-and-sharpen"),
            ResampleStrategy::LibraryThumbnail => write!(f, "library-thumbnail"),
        }
    }
}

impl std::str::FromStr for ResampleStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scale-and-sharpen" | "sharpen" => Ok(ResampleStrategy::ScaleAndSharpen),
            "library-thumbnail" | "library" => Ok(ResampleStrategy::LibraryThumbnail),
            _ => Err(format!(
                "Invalid resample strategy: {}. Valid options: scale-and-sharpen, library-thumbnail",
                s
            )),
        }
    }
}

/// A decoded source image with non-zero dimensions
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
}

impl SourceImage {
    /// Fully decode `source`, guessing the container format from its content
    pub fn decode(source: &[u8]) -> Result<Self, ThumbnailError> {
        let image = reader(source)?.decode().map_err(ThumbnailError::Decode)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(ThumbnailError::empty_image());
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Read only the image header and return `(width, height)`
pub fn probe_dimensions(source: &[u8]) -> Result<(u32, u32), ThumbnailError> {
    let (width, height) = reader(source)?
        .into_dimensions()
        .map_err(ThumbnailError::Decode)?;

    if width == 0 || height == 0 {
        return Err(ThumbnailError::empty_image());
    }
    Ok((width, height))
}

fn reader(source: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, ThumbnailError> {
    ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| ThumbnailError::Decode(ImageError::IoError(e)))
}

/// Decode `source` and produce a raster with exactly the planned dimensions.
///
/// Sources with an alpha channel are scaled in premultiplied space, so color
/// hidden under transparent pixels never bleeds into visible ones. The result
/// carries straight (unassociated) alpha.
pub fn resample(
    source: &[u8],
    plan: SizePlan,
    strategy: ResampleStrategy,
) -> Result<RgbaImage, ThumbnailError> {
    if plan.rgba_bytes() > MAX_RASTER_BYTES {
        return Err(ThumbnailError::raster_too_large());
    }

    let source = SourceImage::decode(source)?;
    let (width, height) = (plan.target_width, plan.target_height);

    let has_alpha = source.image.color().has_alpha();
    let mut prepared = source.image.into_rgba8();
    if has_alpha {
        premultiply(&mut prepared);
    }

    let mut raster = match strategy {
        ResampleStrategy::ScaleAndSharpen => {
            sharpen(&imageops::resize(&prepared, width, height, FilterType::Triangle))
        }
        ResampleStrategy::LibraryThumbnail => imageops::thumbnail(&prepared, width, height),
    };

    if has_alpha {
        unpremultiply(&mut raster);
    }
    Ok(raster)
}

/// `value` scaled by `alpha / 255`, rounded
pub(crate) fn over_black(value: u8, alpha: u8) -> u8 {
    ((u32::from(value) * u32::from(alpha) + 127) / 255) as u8
}

fn premultiply(raster: &mut RgbaImage) {
    for pixel in raster.pixels_mut() {
        let alpha = pixel[3];
        for channel in &mut pixel.0[..3] {
            *channel = over_black(*channel, alpha);
        }
    }
}

fn unpremultiply(raster: &mut RgbaImage) {
    for pixel in raster.pixels_mut() {
        let alpha = u32::from(pixel[3]);
        for channel in &mut pixel.0[..3] {
            *channel = match alpha {
                0 => 0,
                _ => ((u32::from(*channel) * 255 + alpha / 2) / alpha).min(255) as u8,
            };
        }
    }
}

/// Convolve the color channels with [`SHARPEN_KERNEL`].
///
/// Edge pixels repeat outward (clamped tiling). Alpha is copied through.
pub fn sharpen(raster: &RgbaImage) -> RgbaImage {
    let (width, height) = raster.dimensions();

    RgbaImage::from_fn(width, height, |x, y| {
        let mut acc = [0f32; 3];

        for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
            let sy = neighbour(y, ky, height);
            for (kx, &weight) in row.iter().enumerate() {
                if weight == 0.0 {
                    continue;
                }
                let pixel = raster.get_pixel(neighbour(x, kx, width), sy);
                for (sum, &value) in acc.iter_mut().zip(pixel.0.iter()) {
                    *sum += weight * f32::from(value);
                }
            }
        }

        let alpha = raster.get_pixel(x, y)[3];
        Rgba([channel(acc[0]), channel(acc[1]), channel(acc[2]), alpha])
    })
}

/// Kernel tap `k` (0..3) around `center`, clamped into `0..len`
fn neighbour(center: u32, k: usize, len: u32) -> u32 {
    (center + k as u32).saturating_sub(1).min(len - 1)
}

fn channel(sum: f32) -> u8 {
    (sum * SHARPEN_GAIN + SHARPEN_BIAS).round().clamp(0.0, 255.0) as u8
}
