//! Morphological post-processing over a single layer's mask. Each operator
//! is independently invokable, deterministic, and returns a sparse delta;
//! any non-zero cell counts as foreground, boundary cells are treated as
//! background, and label values of cells that stay foreground are preserved.

use std::collections::HashMap;

use annotate_common::Rect;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use imageproc::region_labelling::{connected_components, Connectivity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::delta::MaskDelta;
use crate::error::Result;
use crate::layers::LayerId;
use crate::store::{MaskStore, BACKGROUND, FOREGROUND};

/// Connectivity used when labelling islands.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IslandConnectivity {
    Four,
    #[default]
    Eight,
}

impl From<IslandConnectivity> for Connectivity {
    fn from(connectivity: IslandConnectivity) -> Self {
        match connectivity {
            IslandConnectivity::Four => Connectivity::Four,
            IslandConnectivity::Eight => Connectivity::Eight,
        }
    }
}

/// One morphological step with its parameter. The recommended default
/// pipeline order is islands, closing, dilation, erosion, but any subset in
/// any order is valid; the product exposes them as independent controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum MorphOp {
    RemoveIslands {
        min_size: u32,
        #[serde(default)]
        connectivity: IslandConnectivity,
    },
    Closing { iterations: u8 },
    Dilate { iterations: u8 },
    Erode { iterations: u8 },
}

/// Run one operator, restricted to `rects` (whole mask when empty).
pub fn apply(
    store: &MaskStore,
    layer: LayerId,
    rects: &[Rect],
    op: &MorphOp,
) -> Result<MaskDelta> {
    match *op {
        MorphOp::RemoveIslands { min_size, connectivity } => {
            remove_islands(store, layer, rects, min_size, connectivity)
        }
        MorphOp::Closing { iterations } => closing(store, layer, rects, iterations),
        MorphOp::Dilate { iterations } => dilate(store, layer, rects, iterations),
        MorphOp::Erode { iterations } => erode(store, layer, rects, iterations),
    }
}

/// Clear every connected foreground component with area below `min_size`.
/// `min_size == 0` never removes anything.
pub fn remove_islands(
    store: &MaskStore,
    layer: LayerId,
    rects: &[Rect],
    min_size: u32,
    connectivity: IslandConnectivity,
) -> Result<MaskDelta> {
    if min_size == 0 {
        return Ok(MaskDelta::new());
    }
    transform_regions(store, layer, rects, 0, |binary| {
        let labels = connected_components(binary, connectivity.into(), Luma([BACKGROUND]));
        let mut areas: HashMap<u32, u32> = HashMap::new();
        for label in labels.pixels() {
            if label[0] != 0 {
                *areas.entry(label[0]).or_insert(0) += 1;
            }
        }
        let mut out = binary.clone();
        for (x, y, label) in labels.enumerate_pixels() {
            if label[0] != 0 && areas[&label[0]] < min_size {
                out.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        out
    })
}

/// `iterations` of dilation followed by the same number of erosions,
/// smoothing boundaries without net size change for convex regions.
pub fn closing(
    store: &MaskStore,
    layer: LayerId,
    rects: &[Rect],
    iterations: u8,
) -> Result<MaskDelta> {
    if iterations == 0 {
        return Ok(MaskDelta::new());
    }
    transform_regions(store, layer, rects, iterations as u32, |binary| {
        morphology::close(binary, Norm::L1, iterations)
    })
}

/// Grow the mask boundary outward with a 4-connected structuring element.
pub fn dilate(
    store: &MaskStore,
    layer: LayerId,
    rects: &[Rect],
    iterations: u8,
) -> Result<MaskDelta> {
    if iterations == 0 {
        return Ok(MaskDelta::new());
    }
    transform_regions(store, layer, rects, 0, |binary| {
        morphology::dilate(binary, Norm::L1, iterations)
    })
}

/// Shrink the mask boundary inward with a 4-connected structuring element.
pub fn erode(
    store: &MaskStore,
    layer: LayerId,
    rects: &[Rect],
    iterations: u8,
) -> Result<MaskDelta> {
    if iterations == 0 {
        return Ok(MaskDelta::new());
    }
    transform_regions(store, layer, rects, iterations as u32, |binary| {
        morphology::erode(binary, Norm::L1, iterations)
    })
}

/// Binarize each region, run the operator on it, and merge the result back,
/// preserving the label value of cells that stay foreground.
///
/// The region is padded with `pad` background cells on every side before
/// the operator runs, so cells at the region border see background beyond
/// it (no wraparound, no border clamping).
fn transform_regions(
    store: &MaskStore,
    layer: LayerId,
    rects: &[Rect],
    pad: u32,
    op: impl Fn(&GrayImage) -> GrayImage,
) -> Result<MaskDelta> {
    let mask = store.mask(layer)?;
    let (width, height) = mask.dimensions();

    let regions: Vec<Rect> = if rects.is_empty() {
        vec![Rect::full(width, height)]
    } else {
        rects
            .iter()
            .map(|r| r.clamp_to(width, height))
            .filter(|r| !r.is_degenerate())
            .collect()
    };

    let mut after = mask.clone();
    for rect in regions {
        let mut binary = GrayImage::new(rect.width + 2 * pad, rect.height + 2 * pad);
        for y in 0..rect.height {
            for x in 0..rect.width {
                if mask.get_pixel(rect.x + x, rect.y + y)[0] != BACKGROUND {
                    binary.put_pixel(x + pad, y + pad, Luma([FOREGROUND]));
                }
            }
        }

        let processed = op(&binary);
        for y in 0..rect.height {
            for x in 0..rect.width {
                let old = mask.get_pixel(rect.x + x, rect.y + y)[0];
                let new = if processed.get_pixel(x + pad, y + pad)[0] != BACKGROUND {
                    if old != BACKGROUND { old } else { FOREGROUND }
                } else {
                    BACKGROUND
                };
                after.put_pixel(rect.x + x, rect.y + y, Luma([new]));
            }
        }
    }

    Ok(MaskDelta::from_diff(mask, &after))
}
