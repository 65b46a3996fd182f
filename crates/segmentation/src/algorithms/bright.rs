use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::color::hsv_in_range;

/// Lower bound of the bright green HSV band (OpenCV hue scale, 0..180).
pub const HSV_DARK_GREEN: [u8; 3] = [50, 129, 120];
/// Upper bound of the bright green HSV band.
pub const HSV_LIGHT_GREEN: [u8; 3] = [100, 255, 255];

/// In-range HSV threshold for the bright green band, cleaned up with a
/// 3x3 erode / dilate / erode pass to knock out speckle.
pub fn bright_automask(image: &RgbImage) -> GrayImage {
    let mask = hsv_in_range(image, HSV_DARK_GREEN, HSV_LIGHT_GREEN);
    let mask = morphology::erode(&mask, Norm::LInf, 1);
    let mask = morphology::dilate(&mask, Norm::LInf, 1);
    morphology::erode(&mask, Norm::LInf, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_a_solid_green_block_and_drops_speckle() {
        let mut image = RgbImage::new(16, 16);
        // Solid bright green 6x6 block.
        for y in 4..10 {
            for x in 4..10 {
                image.put_pixel(x, y, image::Rgb([40, 220, 60]));
            }
        }
        // One isolated green pixel far away.
        image.put_pixel(14, 14, image::Rgb([40, 220, 60]));

        let mask = bright_automask(&image);
        assert_eq!(mask.get_pixel(6, 6)[0], 255);
        assert_eq!(mask.get_pixel(14, 14)[0], 0, "speckle must be eroded away");
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }
}
