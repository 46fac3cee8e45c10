//! Per-frame image transform for the outbound stream
//!
//! RGB in, base64 JPEG out: downscale by two (Lanczos3), convert to 8-bit
//! grayscale, optionally stamp the aim crosshair, encode at a low quality.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, GrayImage, Luma, RgbImage};
use rover_core::{RoverError, RoverResult};

/// Half-length of each crosshair arm in pixels
pub const CROSSHAIR_ARM: i32 = 6;

/// Downscale by two and convert to grayscale
pub fn prepare(frame: &RgbImage) -> GrayImage {
    let width = (frame.width() / 2).max(1);
    let height = (frame.height() / 2).max(1);
    let small = imageops::resize(frame, width, height, FilterType::Lanczos3);
    imageops::grayscale(&small)
}

/// Paint a dashed cross centred on `(x, y)`.
///
/// Pixels at even offsets from the centre (the centre included) are black,
/// odd offsets white, so the mark stays visible on any background. Pixels
/// outside the image are skipped.
pub fn draw_crosshair(img: &mut GrayImage, x: i32, y: i32) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut put = |px: i64, py: i64, value: u8| {
        if px >= 0 && py >= 0 && px < w && py < h {
            img.put_pixel(px as u32, py as u32, Luma([value]));
        }
    };

    for offset in -CROSSHAIR_ARM..=CROSSHAIR_ARM {
        let value = if offset % 2 == 0 { 0 } else { 255 };
        let d = offset as i64;
        put(x as i64 + d, y as i64, value);
        put(x as i64, y as i64 + d, value);
    }
}

/// Encode a grayscale image as JPEG
pub fn encode_jpeg(img: &GrayImage, quality: u8) -> RoverResult<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(img.as_raw(), img.width(), img.height(), ColorType::L8)
        .map_err(|e| RoverError::Serialization(format!("JPEG encoding failed: {}", e)))?;
    Ok(out)
}

/// Full transform for one role: prepare, optional crosshair, JPEG, base64
pub fn render(frame: &RgbImage, mark: Option<(i32, i32)>, quality: u8) -> RoverResult<String> {
    let mut gray = prepare(frame);
    if let Some((x, y)) = mark {
        draw_crosshair(&mut gray, x, y);
    }
    let jpeg = encode_jpeg(&gray, quality)?;
    Ok(STANDARD.encode(jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const UNTOUCHED: u8 = 77;

    #[test]
    fn test_crosshair_parity_and_extent() {
        let mut img = GrayImage::from_pixel(320, 240, Luma([UNTOUCHED]));
        draw_crosshair(&mut img, 160, 120);

        for d in -6i32..=6 {
            let expected = if d % 2 == 0 { 0 } else { 255 };
            assert_eq!(img.get_pixel((160 + d) as u32, 120).0[0], expected, "x offset {}", d);
            assert_eq!(img.get_pixel(160, (120 + d) as u32).0[0], expected, "y offset {}", d);
        }
        for d in [7i32, 8, 20] {
            assert_eq!(img.get_pixel((160 + d) as u32, 120).0[0], UNTOUCHED);
            assert_eq!(img.get_pixel((160 - d) as u32, 120).0[0], UNTOUCHED);
            assert_eq!(img.get_pixel(160, (120 + d) as u32).0[0], UNTOUCHED);
            assert_eq!(img.get_pixel(160, (120 - d) as u32).0[0], UNTOUCHED);
        }
        // Off-axis pixels are untouched
        assert_eq!(img.get_pixel(161, 121).0[0], UNTOUCHED);
    }

    #[test]
    fn test_crosshair_is_clipped() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([UNTOUCHED]));
        draw_crosshair(&mut img, 0, 9);
        assert_eq!(img.get_pixel(0, 9).0[0], 0);
        assert_eq!(img.get_pixel(1, 9).0[0], 255);
        assert_eq!(img.get_pixel(0, 8).0[0], 255);

        // Entirely outside: nothing painted, no panic
        let mut img = GrayImage::from_pixel(10, 10, Luma([UNTOUCHED]));
        draw_crosshair(&mut img, -50, 500);
        assert!(img.pixels().all(|p| p.0[0] == UNTOUCHED));
    }

    #[test]
    fn test_prepare_halves_and_grays() {
        let frame = RgbImage::from_pixel(640, 480, Rgb([200, 200, 200]));
        let gray = prepare(&frame);
        assert_eq!(gray.dimensions(), (320, 240));
        let v = gray.get_pixel(100, 100).0[0];
        assert!((195..=205).contains(&v), "got {}", v);
    }

    #[test]
    fn test_render_produces_jpeg() {
        let frame = RgbImage::from_pixel(64, 48, Rgb([10, 120, 240]));
        let encoded = render(&frame, Some((16, 12)), 30).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }
}
