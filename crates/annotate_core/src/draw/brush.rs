use crate::delta::MaskDelta;
use crate::draw::BrushMode;
use crate::error::Result;
use crate::layers::LayerId;
use crate::store::{MaskStore, BACKGROUND};

/// Spacing between stamped disk centers along a stroke, in pixels. Half a
/// pixel keeps the band continuous for any pointer speed.
const STAMP_SPACING: f32 = 0.5;

/// Rasterize a pointer stroke as a band of overlapping filled disks.
///
/// Each sampled path point stamps a Euclidean disk of `radius` (at radius 1
/// that is the 5-cell plus shape); consecutive points are interpolated at
/// sub-pixel spacing so a fast stroke never leaves gaps. `mode` decides
/// whether the band is unioned in as `value` or erased to background.
pub fn brush_stroke(
    store: &MaskStore,
    layer: LayerId,
    path: &[[f32; 2]],
    radius: u32,
    mode: BrushMode,
    value: u8,
) -> Result<MaskDelta> {
    let write = match mode {
        BrushMode::Draw => value,
        BrushMode::Erase => BACKGROUND,
    };
    sweep_disks(store, layer, path, radius, write)
}

/// Rasterize consecutive vertices as thick line segments: the same disk
/// sweep as [`brush_stroke`], but along explicit vertices with a radius of
/// half the requested thickness.
pub fn polyline(
    store: &MaskStore,
    layer: LayerId,
    vertices: &[[f32; 2]],
    thickness: u32,
    mode: BrushMode,
    value: u8,
) -> Result<MaskDelta> {
    let write = match mode {
        BrushMode::Draw => value,
        BrushMode::Erase => BACKGROUND,
    };
    let radius = (thickness / 2).max(1);
    sweep_disks(store, layer, vertices, radius, write)
}

fn sweep_disks(
    store: &MaskStore,
    layer: LayerId,
    path: &[[f32; 2]],
    radius: u32,
    write: u8,
) -> Result<MaskDelta> {
    let mask = store.mask(layer)?;
    let (width, height) = mask.dimensions();
    let mut delta = MaskDelta::new();
    if path.is_empty() {
        return Ok(delta);
    }

    let flat = mask.as_raw();
    let offsets = disk_offsets(radius);
    let mut visited = vec![false; flat.len()];

    let mut stamp = |cx: f32, cy: f32| {
        let cx = cx.round() as i64;
        let cy = cy.round() as i64;
        for &(dx, dy) in &offsets {
            let x = cx + dx as i64;
            let y = cy + dy as i64;
            if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                continue;
            }
            let idx = y as usize * width as usize + x as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            delta.push(x as u32, y as u32, flat[idx], write);
        }
    };

    stamp(path[0][0], path[0][1]);
    for pair in path.windows(2) {
        let [x0, y0] = pair[0];
        let [x1, y1] = pair[1];
        let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let steps = (length / STAMP_SPACING).ceil().max(1.0) as u32;
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            stamp(x0 + t * (x1 - x0), y0 + t * (y1 - y0));
        }
    }

    Ok(delta)
}

/// Cell offsets of a filled Euclidean disk: `dx^2 + dy^2 <= r^2`.
fn disk_offsets(radius: u32) -> Vec<(i32, i32)> {
    let r = radius as i32;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r2 {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FOREGROUND;

    fn store(width: u32, height: u32) -> MaskStore {
        let mut store = MaskStore::new(1);
        store.allocate(width, height);
        store
    }

    #[test]
    fn radius_one_point_stamps_a_five_cell_disk() {
        let store = store(10, 10);
        let delta = brush_stroke(
            &store,
            LayerId(0),
            &[[5.0, 5.0]],
            1,
            BrushMode::Draw,
            FOREGROUND,
        )
        .unwrap();
        assert_eq!(delta.len(), 5);
        let mut cells: Vec<_> = delta.cells().iter().map(|c| (c.x, c.y)).collect();
        cells.sort_unstable();
        assert_eq!(cells, vec![(4, 5), (5, 4), (5, 5), (5, 6), (6, 5)]);
    }

    #[test]
    fn fast_stroke_leaves_no_gaps() {
        let mut store = store(40, 8);
        let delta = brush_stroke(
            &store,
            LayerId(0),
            &[[2.0, 4.0], [37.0, 4.0]],
            1,
            BrushMode::Draw,
            FOREGROUND,
        )
        .unwrap();
        store.apply(LayerId(0), &delta).unwrap();
        for x in 2..=37 {
            assert_eq!(store.read(LayerId(0), x, 4).unwrap(), FOREGROUND);
        }
    }

    #[test]
    fn erase_mode_clears_to_background() {
        let mut store = store(10, 10);
        let drawn = brush_stroke(
            &store,
            LayerId(0),
            &[[5.0, 5.0]],
            2,
            BrushMode::Draw,
            FOREGROUND,
        )
        .unwrap();
        store.apply(LayerId(0), &drawn).unwrap();

        let erased = brush_stroke(
            &store,
            LayerId(0),
            &[[5.0, 5.0]],
            1,
            BrushMode::Erase,
            FOREGROUND,
        )
        .unwrap();
        store.apply(LayerId(0), &erased).unwrap();
        assert_eq!(store.read(LayerId(0), 5, 5).unwrap(), BACKGROUND);
        assert_eq!(store.read(LayerId(0), 7, 5).unwrap(), FOREGROUND);
    }

    #[test]
    fn stroke_clipped_at_the_border_is_absorbed() {
        let store = store(6, 6);
        let delta = brush_stroke(
            &store,
            LayerId(0),
            &[[-3.0, 2.0], [0.0, 2.0]],
            1,
            BrushMode::Draw,
            FOREGROUND,
        )
        .unwrap();
        // Only the in-bounds part of the band is produced.
        assert!(!delta.is_empty());
        assert!(delta.cells().iter().all(|c| c.x < 6 && c.y < 6));
    }

    #[test]
    fn polyline_thickness_maps_to_half_radius() {
        let mut store = store(20, 10);
        let delta = polyline(
            &store,
            LayerId(0),
            &[[2.0, 5.0], [10.0, 5.0], [10.0, 2.0]],
            2,
            BrushMode::Draw,
            FOREGROUND,
        )
        .unwrap();
        store.apply(LayerId(0), &delta).unwrap();
        assert_eq!(store.read(LayerId(0), 6, 5).unwrap(), FOREGROUND);
        assert_eq!(store.read(LayerId(0), 10, 3).unwrap(), FOREGROUND);
        // One pixel above the band stays background.
        assert_eq!(store.read(LayerId(0), 6, 3).unwrap(), BACKGROUND);
    }
}
