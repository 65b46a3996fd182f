use annotate_common::Rect;
use image::{GrayImage, RgbImage};
use imageproc::contrast::otsu_level;

use crate::color::lab_a_channel;

/// Threshold the LAB a* channel with an Otsu-derived level and keep the
/// below-threshold (green) side.
///
/// When `rects` is non-empty the rule is derived and applied per rectangle,
/// everything outside stays background; otherwise the whole image is used.
pub fn lab_automask(image: &RgbImage, rects: &[Rect]) -> GrayImage {
    let (width, height) = image.dimensions();
    let a_channel = lab_a_channel(image);
    let mut mask = GrayImage::new(width, height);

    let regions: Vec<Rect> = if rects.is_empty() {
        vec![Rect::full(width, height)]
    } else {
        rects
            .iter()
            .map(|r| r.clamp_to(width, height))
            .filter(|r| !r.is_degenerate())
            .collect()
    };

    for rect in regions {
        let mut crop = GrayImage::new(rect.width, rect.height);
        for y in 0..rect.height {
            for x in 0..rect.width {
                crop.put_pixel(x, y, *a_channel.get_pixel(rect.x + x, rect.y + y));
            }
        }
        let level = otsu_level(&crop);
        for y in 0..rect.height {
            for x in 0..rect.width {
                if crop.get_pixel(x, y)[0] <= level {
                    mask.put_pixel(rect.x + x, rect.y + y, image::Luma([255]));
                }
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_green_half_magenta(width: u32, height: u32) -> RgbImage {
        let mut image = RgbImage::new(width, height);
        for (x, _, pixel) in image.enumerate_pixels_mut() {
            *pixel = if x < width / 2 {
                image::Rgb([40, 210, 40])
            } else {
                image::Rgb([210, 40, 210])
            };
        }
        image
    }

    #[test]
    fn green_half_is_masked() {
        let image = half_green_half_magenta(8, 4);
        let mask = lab_automask(&image, &[]);
        for y in 0..4 {
            for x in 0..8 {
                let expected = if x < 4 { 255 } else { 0 };
                assert_eq!(mask.get_pixel(x, y)[0], expected, "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn rectangles_limit_the_masked_area() {
        let image = half_green_half_magenta(8, 4);
        let mask = lab_automask(&image, &[Rect::new(0, 0, 8, 2)]);
        assert_eq!(mask.get_pixel(1, 1)[0], 255);
        // Below the rectangle nothing is proposed, even over green pixels.
        assert_eq!(mask.get_pixel(1, 3)[0], 0);
    }
}
