/// Unsharp mask applied after resampling
///
/// Works on the value channel (max of R, G, B) so hues are left alone:
/// the channel is blurred with a gaussian of `radius`, and wherever the
/// pixel differs from its blurred neighbourhood by at least `threshold`
/// the difference is boosted by `amount` percent. RGB is then rescaled to
/// the new value. Alpha is untouched.
use image::{imageops, GrayImage, Luma, RgbaImage};

/// Tuning used for every resize
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    /// Strength in percent (80 = add 0.8x the detail)
    pub amount: f32,
    /// Gaussian sigma in pixels
    pub radius: f32,
    /// Minimum value difference (0-255) before sharpening kicks in
    pub threshold: u8,
}

impl Default for UnsharpMask {
    fn default() -> Self {
        Self {
            amount: 80.0,
            radius: 0.6,
            threshold: 2,
        }
    }
}

impl UnsharpMask {
    pub fn apply(&self, image: &mut RgbaImage) {
        if self.amount <= 0.0 || self.radius <= 0.0 {
            return;
        }

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let value = GrayImage::from_fn(width, height, |x, y| {
            let p = image.get_pixel(x, y);
            Luma([p[0].max(p[1]).max(p[2])])
        });
        let blurred = imageops::blur(&value, self.radius);

        let gain = self.amount / 100.0;
        let threshold = self.threshold as i32;

        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let v = value.get_pixel(x, y)[0] as i32;
            let diff = v - blurred.get_pixel(x, y)[0] as i32;

            if diff.abs() < threshold || v == 0 {
                continue;
            }

            let sharpened = (v as f32 + gain * diff as f32).clamp(0.0, 255.0);
            let scale = sharpened / v as f32;

            for channel in pixel.0.iter_mut().take(3) {
                *channel = (*channel as f32 * scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_flat_image_is_unchanged() {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([120, 80, 40, 255]));
        let original = img.clone();
        UnsharpMask::default().apply(&mut img);
        assert_eq!(img, original);
    }

    #[test]
    fn test_edges_gain_contrast() {
        // Left half dark, right half bright
        let mut img = RgbaImage::from_fn(10, 4, |x, _| {
            if x < 5 {
                Rgba([60, 60, 60, 255])
            } else {
                Rgba([180, 180, 180, 255])
            }
        });
        UnsharpMask::default().apply(&mut img);

        // Bright side of the edge gets brighter, dark side darker
        assert!(img.get_pixel(5, 1)[0] > 180);
        assert!(img.get_pixel(4, 1)[0] < 60);
        // Alpha is preserved
        assert_eq!(img.get_pixel(5, 1)[3], 255);
    }

    #[test]
    fn test_zero_amount_is_noop() {
        let mut img = RgbaImage::from_fn(6, 6, |x, y| Rgba([(x * 40) as u8, (y * 40) as u8, 0, 255]));
        let original = img.clone();
        UnsharpMask {
            amount: 0.0,
            ..UnsharpMask::default()
        }
        .apply(&mut img);
        assert_eq!(img, original);
    }
}
