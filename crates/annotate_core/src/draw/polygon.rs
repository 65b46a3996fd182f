use crate::delta::MaskDelta;
use crate::draw::BrushMode;
use crate::error::Result;
use crate::layers::LayerId;
use crate::store::{MaskStore, BACKGROUND};

/// Whether a click at `point` closes the polygon: true when it lands within
/// `close_radius` of the first vertex.
pub fn close_hit(vertices: &[[f32; 2]], point: [f32; 2], close_radius: f32) -> bool {
    match vertices.first() {
        Some(&[x0, y0]) => {
            let (dx, dy) = (point[0] - x0, point[1] - y0);
            dx * dx + dy * dy <= close_radius * close_radius
        }
        None => false,
    }
}

/// Scanline polygon fill under the nonzero winding rule.
///
/// The closing edge from the last vertex back to the first is implied.
/// Self-intersecting outlines are filled, not rejected; nonzero winding
/// keeps self-crossing shapes behaving like unions of their loops. Fewer
/// than 3 vertices is a no-op (empty delta).
pub fn fill_polygon(
    store: &MaskStore,
    layer: LayerId,
    vertices: &[[f32; 2]],
    mode: BrushMode,
    value: u8,
) -> Result<MaskDelta> {
    let mask = store.mask(layer)?;
    let (width, height) = mask.dimensions();
    let mut delta = MaskDelta::new();
    if vertices.len() < 3 {
        return Ok(delta);
    }

    let write = match mode {
        BrushMode::Draw => value,
        BrushMode::Erase => BACKGROUND,
    };
    let flat = mask.as_raw();
    let n = vertices.len();

    // Signed crossings of each pixel-center row: +1 where an edge crosses
    // downward, -1 upward. Spans where the running sum is non-zero are
    // interior.
    let mut crossings: Vec<(f32, i32)> = Vec::new();
    for y in 0..height {
        let yf = y as f32 + 0.5;
        crossings.clear();
        for i in 0..n {
            let [x0, y0] = vertices[i];
            let [x1, y1] = vertices[(i + 1) % n];
            let (x, direction) = if y0 <= yf && yf < y1 {
                (x0 + (yf - y0) / (y1 - y0) * (x1 - x0), 1)
            } else if y1 <= yf && yf < y0 {
                (x0 + (yf - y0) / (y1 - y0) * (x1 - x0), -1)
            } else {
                continue;
            };
            crossings.push((x, direction));
        }
        crossings.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            if winding == 0 {
                continue;
            }
            let (span_start, span_end) = (pair[0].0, pair[1].0);
            // Cells whose center x + 0.5 falls inside the span.
            let first = (span_start - 0.5).ceil().max(0.0) as u32;
            let end = ((span_end - 0.5).ceil().max(0.0) as u32).min(width);
            for x in first..end {
                let idx = y as usize * width as usize + x as usize;
                delta.push(x, y, flat[idx], write);
            }
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

    fn fill(store: &MaskStore, vertices: &[[f32; 2]]) -> MaskDelta {
        fill_polygon(store, LayerId(0), vertices, BrushMode::Draw, FOREGROUND).unwrap()
    }

    #[test]
    fn square_fills_exactly_the_enclosed_cells() {
        let store = store(6, 6);
        let delta = fill(
            &store,
            &[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]],
        );
        assert_eq!(delta.len(), 16);
        assert!(delta
            .cells()
            .iter()
            .all(|c| c.x < 4 && c.y < 4 && c.new == FOREGROUND));
    }

    #[test]
    fn fewer_than_three_vertices_is_a_noop() {
        let store = store(6, 6);
        assert!(fill(&store, &[]).is_empty());
        assert!(fill(&store, &[[1.0, 1.0], [4.0, 4.0]]).is_empty());
    }

    #[test]
    fn self_intersection_fills_both_loops_under_nonzero_winding() {
        // A bowtie whose loops share one crossing point; nonzero winding
        // fills both triangles.
        let store = store(12, 12);
        let delta = fill(
            &store,
            &[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0]],
        );
        let cells: Vec<_> = delta.cells().iter().map(|c| (c.x, c.y)).collect();
        assert!(cells.contains(&(1, 5)));
        assert!(cells.contains(&(8, 5)));
    }

    #[test]
    fn erase_mode_clears_the_interior() {
        let mut store = store(6, 6);
        let drawn = fill(
            &store,
            &[[0.0, 0.0], [6.0, 0.0], [6.0, 6.0], [0.0, 6.0]],
        );
        store.apply(LayerId(0), &drawn).unwrap();

        let erased = fill_polygon(
            &store,
            LayerId(0),
            &[[1.0, 1.0], [5.0, 1.0], [5.0, 5.0], [1.0, 5.0]],
            BrushMode::Erase,
            FOREGROUND,
        )
        .unwrap();
        store.apply(LayerId(0), &erased).unwrap();
        assert_eq!(store.read(LayerId(0), 3, 3).unwrap(), BACKGROUND);
        assert_eq!(store.read(LayerId(0), 0, 0).unwrap(), FOREGROUND);
    }

    #[test]
    fn shape_partly_outside_is_clipped() {
        let store = store(4, 4);
        let delta = fill(
            &store,
            &[[-5.0, -5.0], [10.0, -5.0], [10.0, 10.0], [-5.0, 10.0]],
        );
        assert_eq!(delta.len(), 16);
    }

    #[test]
    fn close_hit_uses_the_first_vertex() {
        let vertices = [[10.0, 10.0], [20.0, 10.0], [20.0, 20.0]];
        assert!(close_hit(&vertices, [11.0, 11.0], 2.0));
        assert!(!close_hit(&vertices, [14.0, 10.0], 2.0));
        assert!(!close_hit(&[], [0.0, 0.0], 5.0));
    }
}
