//! Pixel-format conversion for display (RGB) and detection (luma).

use jpeg_decoder::{Decoder, PixelFormat as JpegPixelFormat};

use super::frame::{FrameMetadata, PixelFormat};
use crate::error::FrameDecodeError;

/// Convert raw frame data to packed RGB24 for rendering.
pub fn to_rgb(data: &[u8], meta: &FrameMetadata) -> Result<Vec<u8>, FrameDecodeError> {
    match meta.format {
        PixelFormat::Mjpeg => {
            let (pixels, layout) = decode_jpeg(data)?;
            match layout {
                JpegPixelFormat::RGB24 => Ok(pixels),
                JpegPixelFormat::L8 => Ok(pixels.iter().flat_map(|&y| [y, y, y]).collect()),
                JpegPixelFormat::L16 => Err(FrameDecodeError::JpegLayout("L16")),
                JpegPixelFormat::CMYK32 => Err(FrameDecodeError::JpegLayout("CMYK32")),
            }
        }
        PixelFormat::Rgb24 => {
            check_len(data, meta, 3)?;
            Ok(data.to_vec())
        }
        PixelFormat::Yuyv4 => {
            check_len(data, meta, 2)?;
            Ok(yuyv_to_rgb(data))
        }
        PixelFormat::Gray8 => {
            check_len(data, meta, 1)?;
            Ok(data.iter().flat_map(|&y| [y, y, y]).collect())
        }
    }
}

/// Convert raw frame data to an 8-bit luma plane for symbol detection.
pub fn to_luma(data: &[u8], meta: &FrameMetadata) -> Result<Vec<u8>, FrameDecodeError> {
    match meta.format {
        PixelFormat::Mjpeg => {
            let (pixels, layout) = decode_jpeg(data)?;
            match layout {
                JpegPixelFormat::RGB24 => Ok(rgb_to_luma(&pixels)),
                JpegPixelFormat::L8 => Ok(pixels),
                JpegPixelFormat::L16 => Err(FrameDecodeError::JpegLayout("L16")),
                JpegPixelFormat::CMYK32 => Err(FrameDecodeError::JpegLayout("CMYK32")),
            }
        }
        PixelFormat::Rgb24 => {
            check_len(data, meta, 3)?;
            Ok(rgb_to_luma(data))
        }
        // Y is every even byte of a YUYV macropixel pair
        PixelFormat::Yuyv4 => {
            check_len(data, meta, 2)?;
            Ok(data.iter().step_by(2).copied().collect())
        }
        PixelFormat::Gray8 => {
            check_len(data, meta, 1)?;
            Ok(data.to_vec())
        }
    }
}

fn decode_jpeg(data: &[u8]) -> Result<(Vec<u8>, JpegPixelFormat), FrameDecodeError> {
    let mut decoder = Decoder::new(data);
    let pixels = decoder.decode()?;
    // decode() populates info
    let layout = decoder
        .info()
        .map(|i| i.pixel_format)
        .unwrap_or(JpegPixelFormat::RGB24);
    Ok((pixels, layout))
}

fn check_len(data: &[u8], meta: &FrameMetadata, bpp: usize) -> Result<(), FrameDecodeError> {
    let expected = meta.width as usize * meta.height as usize * bpp;
    if data.len() < expected {
        return Err(FrameDecodeError::Truncated {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// BT.601 luma, integer approximation
fn rgb_to_luma(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|p| {
            let (r, g, b) = (p[0] as u32, p[1] as u32, p[2] as u32);
            ((77 * r + 150 * g + 29 * b) >> 8) as u8
        })
        .collect()
}

/// YUYV 4:2:2 to packed RGB24, BT.601 full-range approximation
fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);

    for chunk in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_pixel(y0, u, v));
        rgb.extend_from_slice(&yuv_pixel(y1, u, v));
    }

    rgb
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;

    let r = y + ((351 * v) >> 8);
    let g = y - ((86 * u + 179 * v) >> 8);
    let b = y + ((444 * u) >> 8);

    [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::{Frame, PixelFormat};
    use bytes::Bytes;

    fn meta(width: u32, height: u32, format: PixelFormat) -> FrameMetadata {
        let frame = Frame::new(Bytes::new(), 0, width, height, format);
        (*frame.meta).clone()
    }

    #[test]
    fn yuyv_luma_takes_even_bytes() {
        // Two macropixels: Y0 U Y1 V | Y2 U Y3 V
        let data = [10u8, 128, 20, 128, 30, 128, 40, 128];
        let luma = to_luma(&data, &meta(4, 1, PixelFormat::Yuyv4)).unwrap();
        assert_eq!(luma, vec![10, 20, 30, 40]);
    }

    #[test]
    fn rgb_luma_endpoints() {
        let data = [255u8, 255, 255, 0, 0, 0];
        let luma = to_luma(&data, &meta(2, 1, PixelFormat::Rgb24)).unwrap();
        assert_eq!(luma[0], 255);
        assert_eq!(luma[1], 0);
    }

    #[test]
    fn gray_passthrough() {
        let data = [1u8, 2, 3, 4];
        let luma = to_luma(&data, &meta(4, 1, PixelFormat::Gray8)).unwrap();
        assert_eq!(luma, data.to_vec());

        let rgb = to_rgb(&data, &meta(4, 1, PixelFormat::Gray8)).unwrap();
        assert_eq!(rgb, vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4]);
    }

    #[test]
    fn neutral_chroma_yuyv_is_gray_in_rgb() {
        let data = [100u8, 128, 200, 128];
        let rgb = to_rgb(&data, &meta(2, 1, PixelFormat::Yuyv4)).unwrap();
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let data = [0u8; 4];
        let err = to_luma(&data, &meta(4, 4, PixelFormat::Gray8)).unwrap_err();
        assert!(matches!(
            err,
            FrameDecodeError::Truncated {
                expected: 16,
                actual: 4
            }
        ));
    }
}
