//! Thumbnail generation pipeline for the image proxy
//!
//! Turns the bytes of an encoded source image into a JPEG thumbnail whose
//! long side matches a requested pixel length. The pipeline runs four steps
//! in a fixed order:
//!
//! 1. read the source header for its dimensions,
//! 2. plan the target size ([`plan`]),
//! 3. decode and resample to exactly that size ([`resample`]),
//! 4. encode the raster as metadata-free JPEG ([`encode_jpeg`]).
//!
//! Everything here is synchronous, allocation-only CPU work. There is no I/O,
//! no logging and no shared mutable state, so a [`Thumbnailer`] can be used
//! from any number of threads at once.

pub mod encode;
pub mod error;
pub mod plan;
pub mod resample;

#[cfg(test)]
mod test_support;

pub use encode::{clamp_quality, encode_jpeg};
pub use error::ThumbnailError;
pub use plan::{plan, SizePlan};
pub use resample::{probe_dimensions, resample, sharpen, ResampleStrategy, SourceImage};

use serde::{Deserialize, Serialize};

/// Long side used when the caller does not ask for one
pub const DEFAULT_LONG_SIDE_PX: i32 = 480;
/// JPEG quality used when the caller does not ask for one
pub const DEFAULT_QUALITY: i32 = 90;

/// Pipeline configuration, fixed per deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    pub strategy: ResampleStrategy,
}

/// One thumbnail job
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailRequest<'a> {
    pub source: &'a [u8],
    pub long_side_px: i32,
    pub quality: i32,
}

impl<'a> ThumbnailRequest<'a> {
    /// Request with the default long side and quality
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            long_side_px: DEFAULT_LONG_SIDE_PX,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Runs the pipeline with a fixed configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct Thumbnailer {
    config: ThumbnailConfig,
}

impl Thumbnailer {
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    pub fn process(&self, request: &ThumbnailRequest<'_>) -> Result<Vec<u8>, ThumbnailError> {
        self.make_thumbnail(request.source, request.long_side_px, request.quality)
    }

    /// Produce a JPEG thumbnail of `source` with the given long side and quality
    pub fn make_thumbnail(
        &self,
        source: &[u8],
        long_side_px: i32,
        quality: i32,
    ) -> Result<Vec<u8>, ThumbnailError> {
        let (width, height) = probe_dimensions(source)?;
        let size = plan(width, height, long_side_px);
        let raster = resample(source, size, self.config.strategy)?;
        encode_jpeg(raster, quality)
    }
}

/// [`Thumbnailer::make_thumbnail`] with the default configuration
pub fn make_thumbnail(source: &[u8], long_side_px: i32, quality: i32) -> Result<Vec<u8>, ThumbnailError> {
    Thumbnailer::default().make_thumbnail(source, long_side_px, quality)
}
