//! In-memory fixtures shared by the unit tests

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Deterministic gradient with pseudo-random noise, hard enough to compress
/// that JPEG quality makes a visible size difference
pub(crate) fn noisy_gradient(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x2545_F491;
    let image = RgbImage::from_fn(width, height, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let noise = (state >> 26) as u8;
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = ((x + y) % 256) as u8;
        image::Rgb([r.saturating_add(noise), g.saturating_add(noise), b.saturating_sub(noise)])
    });
    DynamicImage::ImageRgb8(image)
}

pub(crate) fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .expect("fixture encoding");
    buffer
}

/// JPEG of `image` carrying an EXIF APP1 segment with orientation 6
/// (rotate 90 degrees clockwise)
pub(crate) fn jpeg_with_rotation_exif(image: &DynamicImage) -> Vec<u8> {
    let jpeg = encode(image, ImageFormat::Jpeg);

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    // Orientation tag, SHORT, count 1, value 6
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&6u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Marker bytes of every segment up to and including start-of-scan
pub(crate) fn segment_markers(jpeg: &[u8]) -> Vec<u8> {
    let mut markers = Vec::new();
    let mut offset = 2;

    while offset + 4 <= jpeg.len() && jpeg[offset] == 0xFF {
        let marker = jpeg[offset + 1];
        markers.push(marker);
        if marker == 0xDA {
            break;
        }
        let length = u16::from_be_bytes([jpeg[offset + 2], jpeg[offset + 3]]) as usize;
        offset += 2 + length;
    }

    markers
}
