//! Utility functions for vision processing

use crate::error::VisionError;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Resize an RGB image and lay it out as a `[3, H, W]` float tensor in `[0, 1]`.
pub fn rgb_to_chw_tensor(
    image: &RgbImage,
    target_width: u32,
    target_height: u32,
) -> Result<Vec<f32>, VisionError> {
    if target_width == 0 || target_height == 0 {
        return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
    }

    let plane = target_width
        .checked_mul(target_height)
        .ok_or_else(|| VisionError::Processing("Target dimensions too large, would overflow".to_string()))?
        as usize;

    if plane > 100_000_000 / 3 {
        return Err(VisionError::Processing("Target dimensions too large (max 100M elements)".to_string()));
    }

    if image.width() == 0 || image.height() == 0 {
        return Err(VisionError::Processing("Invalid image dimensions".to_string()));
    }

    let resized = if image.dimensions() == (target_width, target_height) {
        image.clone()
    } else {
        imageops::resize(image, target_width, target_height, FilterType::Triangle)
    };

    let mut tensor = vec![0.0f32; plane * 3];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (y * target_width + x) as usize;
        for channel in 0..3 {
            tensor[channel * plane + offset] = pixel[channel] as f32 / 255.0;
        }
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_chw_layout() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(0, 1, Rgb([0, 0, 255]));
        image.put_pixel(1, 1, Rgb([255, 255, 255]));

        let tensor = rgb_to_chw_tensor(&image, 2, 2).unwrap();
        assert_eq!(tensor.len(), 12);
        // red plane
        assert_eq!(&tensor[0..4], &[1.0, 0.0, 0.0, 1.0]);
        // green plane
        assert_eq!(&tensor[4..8], &[0.0, 1.0, 0.0, 1.0]);
        // blue plane
        assert_eq!(&tensor[8..12], &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_resize_to_target() {
        let image = RgbImage::from_pixel(10, 5, Rgb([51, 102, 204]));
        let tensor = rgb_to_chw_tensor(&image, 32, 32).unwrap();
        assert_eq!(tensor.len(), 3 * 32 * 32);
        assert!((tensor[0] - 0.2).abs() < 1e-3);
        assert!((tensor[32 * 32] - 0.4).abs() < 1e-3);
        assert!((tensor[2 * 32 * 32] - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_zero_target_rejected() {
        let image = RgbImage::new(4, 4);
        assert!(rgb_to_chw_tensor(&image, 0, 4).is_err());
        assert!(rgb_to_chw_tensor(&image, 4, 0).is_err());
    }

    #[test]
    fn test_oversized_target_rejected() {
        let image = RgbImage::new(4, 4);
        assert!(rgb_to_chw_tensor(&image, 100_000, 100_000).is_err());
    }
}
