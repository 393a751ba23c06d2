//! Failure kinds of the thumbnail pipeline

use image::error::{DecodingError, ImageFormatHint, LimitError, LimitErrorKind};
use image::ImageError;
use thiserror::Error;

/// Errors returned by [`crate::make_thumbnail`].
///
/// Neither kind is transient; retrying with the same input fails again.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The source bytes are not a supported, valid image
    #[error("failed to decode source image: {0}")]
    Decode(#[source] ImageError),

    /// A decoded raster could not be written as JPEG
    #[error("failed to encode JPEG thumbnail: {0}")]
    Encode(#[source] ImageError),
}

impl ThumbnailError {
    /// Whether the failure was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, ThumbnailError::Decode(_))
    }

    pub(crate) fn empty_image() -> Self {
        ThumbnailError::Decode(ImageError::Decoding(DecodingError::new(
            ImageFormatHint::Unknown,
            "image has zero width or height",
        )))
    }

    pub(crate) fn raster_too_large() -> Self {
        ThumbnailError::Decode(ImageError::Limits(LimitError::from_kind(
            LimitErrorKind::InsufficientMemory,
        )))
    }
}
