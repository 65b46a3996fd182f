use std::sync::atomic::{AtomicBool, Ordering};

use annotate_common::Rect;
use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::error::{Result, SegmentationError};
use crate::kmeans::kmeans;

/// Margin around the seed rectangle whose pixels feed the background color
/// model.
pub const BACKGROUND_WINDOW: u32 = 50;

/// Model-refit rounds. Each round refits both color models and runs one
/// forward and one backward label sweep.
const ROUNDS: usize = 5;

/// Centers per color model.
const MODEL_CENTERS: usize = 5;

/// Cost added per 4-neighbor holding the opposite label.
const SMOOTHNESS: f32 = 100.0;

/// Scale of the cluster-weight term: clusters explaining few of their
/// model's samples are penalized by `WEIGHT_SCALE * -ln(weight)`.
const WEIGHT_SCALE: f32 = 500.0;

/// Rectangle-seeded foreground extraction by iterative energy minimization.
///
/// Pixels inside the rectangle start as probable foreground, pixels in a
/// [`BACKGROUND_WINDOW`] margin around it are fixed background. Each round
/// refits a weighted k-means color model per side and relabels the
/// rectangle's pixels by color cost plus a smoothness penalty for
/// disagreeing with their neighbors. Only cells inside the rectangle can
/// end up foreground.
pub fn grab_cut(image: &RgbImage, rect: Rect, cancel: &AtomicBool) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    let rect = rect.clamp_to(width, height);
    if rect.is_degenerate() {
        return Err(SegmentationError::InvalidRegion);
    }

    let window = rect.expand(BACKGROUND_WINDOW, width, height);
    let stride = window.width as usize;
    let cell = |x: u32, y: u32| (y - window.y) as usize * stride + (x - window.x) as usize;
    let feature = |x: u32, y: u32| {
        let p = image.get_pixel(x, y).0;
        [p[0] as f32, p[1] as f32, p[2] as f32]
    };

    let mut foreground = vec![false; window.area() as usize];
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            foreground[cell(x, y)] = true;
        }
    }

    // Cells inside the seed rectangle, the only ones ever relabeled.
    let free_cells: Vec<(u32, u32)> = (rect.y..rect.bottom())
        .flat_map(|y| (rect.x..rect.right()).map(move |x| (x, y)))
        .collect();

    for round in 0..ROUNDS {
        if cancel.load(Ordering::Relaxed) {
            return Err(SegmentationError::Cancelled);
        }

        let mut fg_samples = Vec::new();
        let mut bg_samples = Vec::new();
        for y in window.y..window.bottom() {
            for x in window.x..window.right() {
                if foreground[cell(x, y)] {
                    fg_samples.push(feature(x, y));
                } else {
                    bg_samples.push(feature(x, y));
                }
            }
        }
        if fg_samples.is_empty() || bg_samples.is_empty() {
            debug!(round, "one side ran out of samples, keeping current labels");
            break;
        }

        let fg_model = ColorModel::fit(&fg_samples, cancel)?;
        let bg_model = ColorModel::fit(&bg_samples, cancel)?;

        // One forward and one backward ICM sweep, so label changes can
        // propagate in both scan directions within a round.
        let mut changed = 0usize;
        for reverse in [false, true] {
            for step in 0..free_cells.len() {
                let index = if reverse { free_cells.len() - 1 - step } else { step };
                let (x, y) = free_cells[index];
                let sample = feature(x, y);
                let mut fg_cost = fg_model.score(&sample);
                let mut bg_cost = bg_model.score(&sample);
                for (nx, ny) in [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ] {
                    if !window.contains(nx, ny) {
                        continue;
                    }
                    if foreground[cell(nx, ny)] {
                        bg_cost += SMOOTHNESS;
                    } else {
                        fg_cost += SMOOTHNESS;
                    }
                }
                let new_label = fg_cost < bg_cost;
                let slot = cell(x, y);
                if foreground[slot] != new_label {
                    foreground[slot] = new_label;
                    changed += 1;
                }
            }
        }

        if changed == 0 {
            break;
        }
    }

    let mut mask = GrayImage::new(width, height);
    for &(x, y) in &free_cells {
        if foreground[cell(x, y)] {
            mask.put_pixel(x, y, image::Luma([255]));
        }
    }
    Ok(mask)
}

/// A weighted k-means color model: cost of a pixel is the squared distance
/// to the nearest center plus a penalty for centers that explain few
/// samples.
struct ColorModel {
    centers: Vec<[f32; 3]>,
    penalties: Vec<f32>,
}

impl ColorModel {
    fn fit(samples: &[[f32; 3]], cancel: &AtomicBool) -> Result<Self> {
        let (centers, labels) = kmeans(samples, MODEL_CENTERS.min(samples.len()), cancel)?;
        let mut counts = vec![0usize; centers.len()];
        for &label in &labels {
            counts[label as usize] += 1;
        }

        let total = samples.len() as f32;
        let mut kept_centers = Vec::new();
        let mut penalties = Vec::new();
        for (center, count) in centers.into_iter().zip(counts) {
            if count == 0 {
                continue;
            }
            kept_centers.push(center);
            penalties.push(WEIGHT_SCALE * -(count as f32 / total).ln());
        }
        Ok(Self { centers: kept_centers, penalties })
    }

    fn score(&self, sample: &[f32; 3]) -> f32 {
        self.centers
            .iter()
            .zip(&self.penalties)
            .map(|(center, penalty)| {
                let distance: f32 = center
                    .iter()
                    .zip(sample)
                    .map(|(c, s)| (c - s) * (c - s))
                    .sum();
                distance + penalty
            })
            .fold(f32::INFINITY, f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn extracts_a_colored_object_from_a_plain_background() {
        let mut image = RgbImage::from_pixel(40, 20, image::Rgb([120, 120, 120]));
        for y in 5..15 {
            for x in 10..20 {
                image.put_pixel(x, y, image::Rgb([200, 30, 30]));
            }
        }

        let rect = Rect::new(8, 3, 14, 14);
        let mask = grab_cut(&image, rect, &no_cancel()).unwrap();

        // The object's interior is foreground.
        assert_eq!(mask.get_pixel(14, 9)[0], 255);
        assert_eq!(mask.get_pixel(11, 6)[0], 255);
        // Plain background inside the rectangle is dropped.
        assert_eq!(mask.get_pixel(9, 4)[0], 0);
        // Nothing outside the rectangle is ever proposed.
        assert_eq!(mask.get_pixel(30, 10)[0], 0);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn degenerate_rectangle_is_rejected() {
        let image = RgbImage::new(10, 10);
        assert!(matches!(
            grab_cut(&image, Rect::new(2, 2, 0, 5), &no_cancel()),
            Err(SegmentationError::InvalidRegion)
        ));
        // A rectangle entirely outside the image clamps to nothing.
        assert!(matches!(
            grab_cut(&image, Rect::new(50, 50, 5, 5), &no_cancel()),
            Err(SegmentationError::InvalidRegion)
        ));
    }

    #[test]
    fn cancellation_aborts_without_a_mask() {
        let image = RgbImage::new(30, 30);
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            grab_cut(&image, Rect::new(5, 5, 10, 10), &cancel),
            Err(SegmentationError::Cancelled)
        ));
    }
}
