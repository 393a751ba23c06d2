//! Target size computation for thumbnails
//!
//! Scales the source dimensions so the longer edge matches the requested
//! long side, keeping the aspect ratio. Both edges get a +0.3 bias before
//! rounding, which tips fractional parts from 0.2 upwards to the next pixel.
//! Existing thumbnails were produced with this bias, so it must stay.

use serde::{Deserialize, Serialize};

/// Bias added before rounding each scaled edge
const ROUNDING_BIAS: f64 = 0.3;

/// Pixel dimensions of a thumbnail, both at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePlan {
    pub target_width: u32,
    pub target_height: u32,
}

impl SizePlan {
    /// The larger of the two target edges
    pub fn long_side(&self) -> u32 {
        self.target_width.max(self.target_height)
    }

    /// Bytes needed to hold the planned raster as RGBA8
    pub fn rgba_bytes(&self) -> u64 {
        u64::from(self.target_width) * u64::from(self.target_height) * 4
    }
}

impl std::fmt::Display for SizePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.target_width, self.target_height)
    }
}

/// Plan the thumbnail size for a source image and a requested long side.
///
/// Never fails: zero or negative `long_side_px` yields 1px edges, and
/// results too large for `u32` saturate.
pub fn plan(source_width: u32, source_height: u32, long_side_px: i32) -> SizePlan {
    let long_edge = f64::from(source_width.max(source_height).max(1));
    let resize_factor = f64::from(long_side_px) / long_edge;

    SizePlan {
        target_width: scale_edge(resize_factor, source_width),
        target_height: scale_edge(resize_factor, source_height),
    }
}

fn scale_edge(resize_factor: f64, edge: u32) -> u32 {
    let scaled = (resize_factor * f64::from(edge) + ROUNDING_BIAS).round_ties_even();
    // `as` saturates on overflow
    scaled.max(1.0) as u32
}
