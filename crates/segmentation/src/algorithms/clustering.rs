use std::collections::HashSet;
use std::sync::atomic::AtomicBool;

use annotate_common::{Point, Rect};
use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::color::lab_a_u8;
use crate::error::{Result, SegmentationError};
use crate::kmeans::kmeans;

/// Cluster the rectangle's pixels into `k` groups over (green channel,
/// LAB a*) features and keep every cluster containing a seed pixel.
///
/// Seeds outside the rectangle are ignored; if none fall inside, the
/// proposal is empty. The rule never reaches outside the rectangle.
pub fn cluster_mask(
    image: &RgbImage,
    rect: Rect,
    seeds: &[Point],
    k: usize,
    cancel: &AtomicBool,
) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    let rect = rect.clamp_to(width, height);
    if rect.is_degenerate() {
        return Err(SegmentationError::InvalidRegion);
    }
    if k == 0 {
        return Err(SegmentationError::InvalidClusterCount);
    }

    let mut features = Vec::with_capacity(rect.area() as usize);
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let [r, g, b] = image.get_pixel(x, y).0;
            features.push([g as f32, lab_a_u8(r, g, b) as f32]);
        }
    }
    let (_, labels) = kmeans(&features, k, cancel)?;

    let label_at = |point: &Point| {
        rect.contains(point.x, point.y).then(|| {
            let index =
                (point.y - rect.y) as usize * rect.width as usize + (point.x - rect.x) as usize;
            labels[index]
        })
    };
    let seed_clusters: HashSet<u32> = seeds.iter().filter_map(label_at).collect();
    if seed_clusters.is_empty() {
        debug!("no seed falls inside the rectangle, proposing nothing");
        return Ok(GrayImage::new(width, height));
    }

    let mut mask = GrayImage::new(width, height);
    let mut index = 0usize;
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            if seed_clusters.contains(&labels[index]) {
                mask.put_pixel(x, y, image::Luma([255]));
            }
            index += 1;
        }
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    fn green_and_red(width: u32, height: u32) -> RgbImage {
        let mut image = RgbImage::new(width, height);
        for (x, _, pixel) in image.enumerate_pixels_mut() {
            *pixel = if x < width / 2 {
                image::Rgb([20, 210, 20])
            } else {
                image::Rgb([210, 20, 20])
            };
        }
        image
    }

    #[test]
    fn seeded_cluster_is_selected() {
        let image = green_and_red(20, 10);
        let rect = Rect::full(20, 10);
        let mask = cluster_mask(&image, rect, &[Point::new(2, 2)], 2, &no_cancel()).unwrap();

        assert_eq!(mask.get_pixel(3, 5)[0], 255);
        assert_eq!(mask.get_pixel(15, 5)[0], 0);
    }

    #[test]
    fn seeds_outside_the_rectangle_propose_nothing() {
        let image = green_and_red(20, 10);
        let rect = Rect::new(0, 0, 8, 8);
        let mask = cluster_mask(&image, rect, &[Point::new(18, 9)], 2, &no_cancel()).unwrap();
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn degenerate_rectangle_is_rejected() {
        let image = green_and_red(20, 10);
        assert!(matches!(
            cluster_mask(&image, Rect::new(3, 3, 0, 0), &[Point::new(3, 3)], 2, &no_cancel()),
            Err(SegmentationError::InvalidRegion)
        ));
    }

    #[test]
    fn mask_stays_inside_the_rectangle() {
        let image = green_and_red(20, 10);
        let rect = Rect::new(0, 0, 6, 6);
        let mask = cluster_mask(&image, rect, &[Point::new(1, 1)], 2, &no_cancel()).unwrap();
        assert_eq!(mask.get_pixel(1, 1)[0], 255);
        assert_eq!(mask.get_pixel(8, 1)[0], 0);
    }
}
