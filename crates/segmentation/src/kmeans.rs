//! Plain k-means over fixed-width feature vectors.
//!
//! Centers are seeded deterministically from feature-norm quantiles instead
//! of random sampling, so repeated runs over the same pixels produce the
//! same clusters and the undo history stays reproducible.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, SegmentationError};

const MAX_ITERATIONS: usize = 20;

/// Cluster `samples` into `k` groups. Returns the centers and one label per
/// sample. `k` is capped at the sample count; zero samples or `k == 0` is a
/// caller bug surfaced as `InvalidClusterCount`.
pub fn kmeans<const D: usize>(
    samples: &[[f32; D]],
    k: usize,
    cancel: &AtomicBool,
) -> Result<(Vec<[f32; D]>, Vec<u32>)> {
    if k == 0 || samples.is_empty() {
        return Err(SegmentationError::InvalidClusterCount);
    }
    let k = k.min(samples.len());

    let mut centers = seed_centers(samples, k);
    let mut labels = vec![0u32; samples.len()];

    for _ in 0..MAX_ITERATIONS {
        if cancel.load(Ordering::Relaxed) {
            return Err(SegmentationError::Cancelled);
        }

        // Assignment step.
        let mut moved = false;
        for (label, sample) in labels.iter_mut().zip(samples) {
            let nearest = nearest_center(&centers, sample);
            if *label != nearest {
                *label = nearest;
                moved = true;
            }
        }
        if !moved {
            break;
        }

        // Update step.
        let mut sums = vec![[0.0f32; D]; k];
        let mut counts = vec![0usize; k];
        for (label, sample) in labels.iter().zip(samples) {
            let slot = *label as usize;
            counts[slot] += 1;
            for (accumulator, value) in sums[slot].iter_mut().zip(sample) {
                *accumulator += value;
            }
        }
        for ((center, sum), count) in centers.iter_mut().zip(&sums).zip(&counts) {
            if *count > 0 {
                for (c, s) in center.iter_mut().zip(sum) {
                    *c = s / *count as f32;
                }
            }
        }
    }

    Ok((centers, labels))
}

/// Squared Euclidean distance to the closest of `centers`.
pub fn nearest_distance<const D: usize>(centers: &[[f32; D]], sample: &[f32; D]) -> f32 {
    centers
        .iter()
        .map(|center| distance2(center, sample))
        .fold(f32::INFINITY, f32::min)
}

fn nearest_center<const D: usize>(centers: &[[f32; D]], sample: &[f32; D]) -> u32 {
    let mut best = 0u32;
    let mut best_distance = f32::INFINITY;
    for (index, center) in centers.iter().enumerate() {
        let distance = distance2(center, sample);
        if distance < best_distance {
            best_distance = distance;
            best = index as u32;
        }
    }
    best
}

fn distance2<const D: usize>(a: &[f32; D], b: &[f32; D]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

/// Pick `k` initial centers at evenly spaced quantiles of the samples
/// ordered by norm, spreading seeds across the value range.
fn seed_centers<const D: usize>(samples: &[[f32; D]], k: usize) -> Vec<[f32; D]> {
    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.sort_by(|&a, &b| {
        let norm_a: f32 = samples[a].iter().map(|v| v * v).sum();
        let norm_b: f32 = samples[b].iter().map(|v| v * v).sum();
        norm_a.partial_cmp(&norm_b).unwrap_or(std::cmp::Ordering::Equal)
    });
    (0..k)
        .map(|i| {
            let position = (i * samples.len() + samples.len() / 2) / k;
            samples[order[position.min(samples.len() - 1)]]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn separates_two_obvious_blobs() {
        let mut samples = Vec::new();
        for i in 0..20 {
            samples.push([i as f32 * 0.1, 0.0]);
            samples.push([100.0 + i as f32 * 0.1, 0.0]);
        }
        let (centers, labels) = kmeans(&samples, 2, &no_cancel()).unwrap();
        assert_eq!(centers.len(), 2);

        // Samples from the same blob share a label; the blobs differ.
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[1], labels[3]);
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn is_deterministic() {
        let samples: Vec<[f32; 2]> = (0..50)
            .map(|i| [(i * 7 % 13) as f32, (i * 3 % 11) as f32])
            .collect();
        let first = kmeans(&samples, 4, &no_cancel()).unwrap();
        let second = kmeans(&samples, 4, &no_cancel()).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn k_is_capped_at_the_sample_count() {
        let samples = [[1.0f32], [2.0]];
        let (centers, _) = kmeans(&samples, 10, &no_cancel()).unwrap();
        assert_eq!(centers.len(), 2);
    }

    #[test]
    fn zero_k_is_rejected() {
        let samples = [[1.0f32]];
        assert!(matches!(
            kmeans(&samples, 0, &no_cancel()),
            Err(SegmentationError::InvalidClusterCount)
        ));
    }

    #[test]
    fn cancellation_aborts_the_loop() {
        let samples: Vec<[f32; 1]> = (0..100).map(|i| [i as f32]).collect();
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            kmeans(&samples, 3, &cancel),
            Err(SegmentationError::Cancelled)
        ));
    }
}
