use annotate_common::Rect;
use image::GrayImage;

/// One changed cell: coordinate plus the value before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaCell {
    pub x: u32,
    pub y: u32,
    pub old: u8,
    pub new: u8,
}

/// A sparse mask mutation: the minimal set of changed cells with their old
/// and new values. Applying the new values and later restoring the old ones
/// reproduces the pre-mutation mask bit for bit, without snapshotting the
/// whole buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskDelta {
    cells: Vec<DeltaCell>,
}

impl MaskDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { cells: Vec::with_capacity(capacity) }
    }

    /// Record a cell change. Cells whose value does not actually change are
    /// dropped, keeping deltas minimal and making no-op operations empty.
    pub fn push(&mut self, x: u32, y: u32, old: u8, new: u8) {
        if old != new {
            self.cells.push(DeltaCell { x, y, old, new });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[DeltaCell] {
        &self.cells
    }

    /// Tight bounding rectangle of the changed cells, if any.
    pub fn bounding_rect(&self) -> Option<Rect> {
        let first = self.cells.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (first.x, first.y, first.x, first.y);
        for cell in &self.cells[1..] {
            min_x = min_x.min(cell.x);
            min_y = min_y.min(cell.y);
            max_x = max_x.max(cell.x);
            max_y = max_y.max(cell.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Diff two equally sized buffers into a delta.
    pub fn from_diff(before: &GrayImage, after: &GrayImage) -> Self {
        debug_assert_eq!(before.dimensions(), after.dimensions());
        let mut delta = MaskDelta::new();
        for (x, y, old) in before.enumerate_pixels() {
            let new = after.get_pixel(x, y)[0];
            delta.push(x, y, old[0], new);
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn unchanged_cells_are_dropped() {
        let mut delta = MaskDelta::new();
        delta.push(1, 1, 0, 255);
        delta.push(2, 2, 7, 7);
        assert_eq!(delta.len(), 1);
    }

    #[test]
    fn bounding_rect_is_tight() {
        let mut delta = MaskDelta::new();
        delta.push(3, 5, 0, 1);
        delta.push(7, 2, 0, 1);
        assert_eq!(delta.bounding_rect(), Some(Rect::new(3, 2, 5, 4)));
        assert_eq!(MaskDelta::new().bounding_rect(), None);
    }

    #[test]
    fn diff_finds_only_changed_cells() {
        let before = GrayImage::new(4, 4);
        let mut after = before.clone();
        after.put_pixel(1, 2, Luma([255]));
        after.put_pixel(3, 3, Luma([9]));
        let delta = MaskDelta::from_diff(&before, &after);
        assert_eq!(delta.len(), 2);
        assert!(delta.cells().iter().all(|c| c.old == 0));
    }
}
