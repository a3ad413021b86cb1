use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;

/// Grayscale conversion followed by a global Otsu threshold: pixels above the
/// level become white, the rest black.
pub(crate) fn binarize_for_ocr(region: &RgbImage) -> GrayImage {
    let gray = to_luma(region);
    let level = otsu_level(&gray);
    tracing::debug!("otsu level {} for {}x{} region", level, gray.width(), gray.height());
    binarize(&gray, level)
}

fn to_luma(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut luma = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let value = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round();
        luma.put_pixel(x, y, Luma([value.clamp(0.0, 255.0) as u8]));
    }
    luma
}

fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn luma_uses_bt601_weights() {
        let image = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(to_luma(&image).get_pixel(0, 0)[0], 76);
        let image = RgbImage::from_pixel(1, 1, Rgb([0, 255, 0]));
        assert_eq!(to_luma(&image).get_pixel(0, 0)[0], 150);
    }

    #[test]
    fn dark_text_on_light_card_splits_cleanly() {
        let image = RgbImage::from_fn(20, 10, |x, _| {
            if x % 4 == 0 {
                Rgb([30, 30, 40])
            } else {
                Rgb([220, 215, 200])
            }
        });
        let binary = binarize_for_ocr(&image);
        assert_eq!(binary.dimensions(), (20, 10));
        for (x, _, pixel) in binary.enumerate_pixels() {
            let expected = if x % 4 == 0 { 0 } else { 255 };
            assert_eq!(pixel[0], expected);
        }
    }

    #[test]
    fn output_is_strictly_binary() {
        let image = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
        let binary = binarize_for_ocr(&image);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
}
