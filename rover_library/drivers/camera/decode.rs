//! Raw capture buffer decoding
//!
//! USB cameras on the robot deliver either MJPEG or packed YUYV 4:2:2.
//! Both are turned into an 8-bit RGB image here. A buffer that does not
//! decode is reported as `None`: the caller treats it as a corrupt frame
//! and skips it.

use image::{ImageFormat, RgbImage};

/// Pixel formats the capture path understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Mjpeg,
    Yuyv,
}

impl PixelFormat {
    /// FourCC code as negotiated with the device
    pub fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            Self::Mjpeg => b"MJPG",
            Self::Yuyv => b"YUYV",
        }
    }

    pub fn from_fourcc(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"MJPG" => Some(Self::Mjpeg),
            b"YUYV" => Some(Self::Yuyv),
            _ => None,
        }
    }
}

/// Decode one captured buffer
pub fn decode_frame(format: PixelFormat, data: &[u8], width: u32, height: u32) -> Option<RgbImage> {
    match format {
        PixelFormat::Mjpeg => decode_mjpeg(data),
        PixelFormat::Yuyv => yuyv_to_rgb(data, width, height),
    }
}

pub fn decode_mjpeg(data: &[u8]) -> Option<RgbImage> {
    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .ok()
        .map(|img| img.to_rgb8())
}

/// Convert packed YUYV (Y0 U Y1 V per pixel pair) to RGB using BT.601 coefficients
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Option<RgbImage> {
    let expected = width as usize * height as usize * 2;
    if width == 0 || height == 0 || width % 2 != 0 || data.len() < expected {
        return None;
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_pixel(y0, u, v));
        rgb.extend_from_slice(&yuv_pixel(y1, u, v));
    }
    RgbImage::from_raw(width, height, rgb)
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |x: i32| (x >> 8).clamp(0, 255) as u8;
    [
        clamp(298 * c + 409 * e + 128),
        clamp(298 * c - 100 * d - 208 * e + 128),
        clamp(298 * c + 516 * d + 128),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_grey_levels() {
        // Y=16 is black, Y=235 is white, neutral chroma
        let data = [16, 128, 235, 128];
        let img = yuyv_to_rgb(&data, 2, 1).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_yuyv_rejects_short_buffers() {
        assert!(yuyv_to_rgb(&[0u8; 6], 2, 2).is_none());
        assert!(yuyv_to_rgb(&[0u8; 6], 3, 1).is_none());
    }

    #[test]
    fn test_corrupt_mjpeg_is_none() {
        assert!(decode_mjpeg(&[0xFF, 0xD8, 0x00, 0x13]).is_none());
        assert!(decode_frame(PixelFormat::Mjpeg, b"", 640, 480).is_none());
    }

    #[test]
    fn test_fourcc_mapping() {
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), Some(PixelFormat::Mjpeg));
        assert_eq!(PixelFormat::from_fourcc(b"H264"), None);
        assert_eq!(PixelFormat::Yuyv.fourcc(), b"YUYV");
    }
}
