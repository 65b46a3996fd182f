//! Color-space plumbing for the threshold and clustering algorithms: the
//! CIELAB `a*` channel (green-magenta axis) and OpenCV-convention HSV.

use image::{GrayImage, RgbImage};

/// The `a*` channel of the LAB-converted image, offset into `u8` range the
/// way 8-bit Lab images conventionally are (`a* + 128`). Values below 128
/// lie on the green side of the axis.
pub fn lab_a_channel(image: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        out.put_pixel(x, y, image::Luma([lab_a_u8(r, g, b)]));
    }
    out
}

/// `a*` of one sRGB pixel, D65 white point, shifted by +128 into `u8`.
pub fn lab_a_u8(r: u8, g: u8, b: u8) -> u8 {
    let r = srgb_to_linear(r as f32 / 255.0);
    let g = srgb_to_linear(g as f32 / 255.0);
    let b = srgb_to_linear(b as f32 / 255.0);

    // sRGB to XYZ (D65), normalized by the white point.
    let x = (0.4124_f32 * r + 0.3576 * g + 0.1805 * b) / 0.950_456;
    let y = 0.2126_f32 * r + 0.7152 * g + 0.0722 * b;

    let a = 500.0 * (lab_f(x) - lab_f(y));
    (a + 128.0).round().clamp(0.0, 255.0) as u8
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// HSV with OpenCV 8-bit scaling: hue in `0..180`, saturation and value in
/// `0..=255`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (((gf - bf) / delta) % 6.0)
    } else if max == gf {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };
    let hue = if hue < 0.0 { hue + 360.0 } else { hue };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    (
        (hue / 2.0).round().min(179.0) as u8,
        (saturation * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    )
}

/// Binary mask of pixels whose HSV components all fall inside
/// `lo..=hi` (component-wise).
pub fn hsv_in_range(image: &RgbImage, lo: [u8; 3], hi: [u8; 3]) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let inside = h >= lo[0] && h <= hi[0]
            && s >= lo[1] && s <= hi[1]
            && v >= lo[2] && v <= hi[2];
        if inside {
            out.put_pixel(x, y, image::Luma([255]));
        }
    }
    out
}

/// The raw green channel as a grayscale image.
pub fn green_channel(image: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        out.put_pixel(x, y, image::Luma([pixel.0[1]]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_a_separates_green_from_magenta() {
        let green = lab_a_u8(30, 200, 30);
        let magenta = lab_a_u8(220, 30, 220);
        let gray = lab_a_u8(128, 128, 128);
        assert!(green < 128, "green must land below the neutral axis");
        assert!(magenta > 128, "magenta must land above the neutral axis");
        assert!((gray as i32 - 128).abs() <= 2, "neutral stays near 128");
    }

    #[test]
    fn hsv_matches_the_opencv_convention() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        let (h, s, v) = rgb_to_hsv(0, 255, 0);
        assert_eq!((h, s, v), (60, 255, 255));
        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert_eq!(h, 120);
        assert_eq!(rgb_to_hsv(0, 0, 0), (0, 0, 0));
    }

    #[test]
    fn in_range_mask_selects_the_band() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgb([40, 200, 60]));
        image.put_pixel(1, 0, image::Rgb([200, 40, 40]));
        let mask = hsv_in_range(&image, [50, 129, 120], [100, 255, 255]);
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(1, 0)[0], 0);
    }
}
