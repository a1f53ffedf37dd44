//! Image decoding for uploaded bytes

use crate::error::VisionError;
use image::RgbImage;
use tracing::debug;

/// Decode an encoded image (format guessed from content) into RGB8 pixels.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::InvalidImage("empty upload".to_string()));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| VisionError::InvalidImage(e.to_string()))?;
    let rgb = decoded.to_rgb8();

    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(VisionError::InvalidImage("image has no pixels".to_string()));
    }

    debug!("Decoded {}x{} image from {} bytes", rgb.width(), rgb.height(), bytes.len());
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn encode(image: &RgbImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut buf, format)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let image = RgbImage::from_pixel(8, 4, Rgb([10, 200, 30]));
        let decoded = decode_image(&encode(&image, ImageOutputFormat::Png)).unwrap();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.get_pixel(3, 2), &Rgb([10, 200, 30]));
    }

    #[test]
    fn test_decode_jpeg() {
        let image = RgbImage::from_pixel(16, 16, Rgb([128, 128, 128]));
        let decoded = decode_image(&encode(&image, ImageOutputFormat::Jpeg(90))).unwrap();
        assert_eq!(decoded.dimensions(), (16, 16));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode_image(&[]), Err(VisionError::InvalidImage(_))));
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(VisionError::InvalidImage(_))));
    }

    #[test]
    fn test_decode_truncated_png() {
        let image = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let bytes = encode(&image, ImageOutputFormat::Png);
        let result = decode_image(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(VisionError::InvalidImage(_))));
    }
}
