use annotate_common::Point;

use crate::delta::MaskDelta;
use crate::error::Result;
use crate::layers::LayerId;
use crate::store::MaskStore;

/// 4-connected flood fill: grow from `seed` over cells holding the seed
/// cell's current value and set them to `value`.
///
/// Re-running on an already filled region is a no-op (empty delta), as is an
/// out-of-bounds seed.
pub fn flood_fill(
    store: &MaskStore,
    layer: LayerId,
    seed: Point,
    value: u8,
) -> Result<MaskDelta> {
    let mask = store.mask(layer)?;
    let (width, height) = mask.dimensions();
    if seed.x >= width || seed.y >= height {
        return Ok(MaskDelta::new());
    }

    let flat = mask.as_raw();
    let w = width as usize;
    let seed_idx = seed.y as usize * w + seed.x as usize;
    let target = flat[seed_idx];
    if target == value {
        // The seed already holds the fill value, so the grown region would
        // be rewritten with its own value.
        return Ok(MaskDelta::new());
    }

    // The visited array doubles as the membership test; the DFS stack holds
    // packed flat indices.
    let mut visited = vec![false; flat.len()];
    let mut stack: Vec<u32> = Vec::with_capacity(1024);
    let mut delta = MaskDelta::new();

    visited[seed_idx] = true;
    stack.push(seed_idx as u32);

    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        let x = (idx % w) as u32;
        let y = (idx / w) as u32;
        delta.push(x, y, target, value);

        let mut try_neighbor = |ni: usize| {
            if !visited[ni] && flat[ni] == target {
                visited[ni] = true;
                stack.push(ni as u32);
            }
        };
        if x > 0 {
            try_neighbor(idx - 1);
        }
        if x + 1 < width {
            try_neighbor(idx + 1);
        }
        if y > 0 {
            try_neighbor(idx - w);
        }
        if y + 1 < height {
            try_neighbor(idx + w);
        }
    }

    Ok(delta)
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
    fn fills_whole_background_and_is_idempotent() {
        let mut store = store(4, 4);
        let delta = flood_fill(&store, LayerId(0), Point::new(0, 0), 1).unwrap();
        assert_eq!(delta.len(), 16);
        store.apply(LayerId(0), &delta).unwrap();

        let again = flood_fill(&store, LayerId(0), Point::new(0, 0), 1).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn stops_at_value_boundaries() {
        let mut store = store(5, 1);
        store.write(LayerId(0), 2, 0, 9).unwrap();
        let delta = flood_fill(&store, LayerId(0), Point::new(0, 0), FOREGROUND).unwrap();
        assert_eq!(delta.len(), 2);
        assert!(delta.cells().iter().all(|c| c.x < 2));
    }

    #[test]
    fn diagonal_neighbors_are_not_connected() {
        let mut store = store(3, 3);
        // Block the two orthogonal routes from (0,0) to (1,1).
        store.write(LayerId(0), 1, 0, 9).unwrap();
        store.write(LayerId(0), 0, 1, 9).unwrap();
        let delta = flood_fill(&store, LayerId(0), Point::new(0, 0), 1).unwrap();
        assert_eq!(delta.len(), 1);
    }

    #[test]
    fn out_of_bounds_seed_is_a_noop() {
        let store = store(4, 4);
        let delta = flood_fill(&store, LayerId(0), Point::new(4, 0), 1).unwrap();
        assert!(delta.is_empty());
    }
}
