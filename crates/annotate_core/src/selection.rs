use annotate_common::{Point, Rect};

/// Transient region state feeding the segmentation algorithms: a stack of
/// rectangles plus groups of seed points. Both are independent of the undo
/// history, they are consumed (or discarded) by the next algorithm run.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    rects: Vec<Rect>,
    seed_groups: Vec<Vec<Point>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a rectangle clamped to the mask bounds. Degenerate rectangles
    /// are kept; the consuming algorithm decides whether to reject them.
    pub fn push_rect(&mut self, rect: Rect, width: u32, height: u32) {
        self.rects.push(rect.clamp_to(width, height));
    }

    pub fn pop_rect(&mut self) -> Option<Rect> {
        self.rects.pop()
    }

    pub fn last_rect(&self) -> Option<Rect> {
        self.rects.last().copied()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Stamp a disk of seed points around `center`, clipped to the mask.
    /// Each stamp forms one group so it can be popped as a unit.
    pub fn stamp_seeds(&mut self, center: Point, radius: u32, width: u32, height: u32) {
        let r = radius as i64;
        let mut group = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let x = center.x as i64 + dx;
                let y = center.y as i64 + dy;
                if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                    group.push(Point::new(x as u32, y as u32));
                }
            }
        }
        if !group.is_empty() {
            self.seed_groups.push(group);
        }
    }

    pub fn pop_seeds(&mut self) -> bool {
        self.seed_groups.pop().is_some()
    }

    pub fn has_seeds(&self) -> bool {
        !self.seed_groups.is_empty()
    }

    /// All seed points across groups.
    pub fn seeds(&self) -> Vec<Point> {
        self.seed_groups.iter().flatten().copied().collect()
    }

    pub fn clear_rects(&mut self) {
        self.rects.clear();
    }

    pub fn clear_seeds(&mut self) {
        self.seed_groups.clear();
    }

    pub fn clear(&mut self) {
        self.clear_rects();
        self.clear_seeds();
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty() && self.seed_groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rects_stack_and_pop() {
        let mut selection = SelectionState::new();
        selection.push_rect(Rect::new(0, 0, 4, 4), 10, 10);
        selection.push_rect(Rect::new(2, 2, 20, 20), 10, 10);
        assert_eq!(selection.last_rect(), Some(Rect::new(2, 2, 8, 8)));
        assert_eq!(selection.pop_rect(), Some(Rect::new(2, 2, 8, 8)));
        assert_eq!(selection.last_rect(), Some(Rect::new(0, 0, 4, 4)));
    }

    #[test]
    fn seed_stamp_forms_one_group() {
        let mut selection = SelectionState::new();
        selection.stamp_seeds(Point::new(5, 5), 1, 10, 10);
        assert_eq!(selection.seeds().len(), 5);
        assert!(selection.pop_seeds());
        assert!(!selection.has_seeds());
    }

    #[test]
    fn seed_stamp_is_clipped_at_borders() {
        let mut selection = SelectionState::new();
        selection.stamp_seeds(Point::new(0, 0), 1, 10, 10);
        assert_eq!(selection.seeds().len(), 3);
    }

    #[test]
    fn clear_discards_everything() {
        let mut selection = SelectionState::new();
        selection.push_rect(Rect::new(0, 0, 2, 2), 10, 10);
        selection.stamp_seeds(Point::new(5, 5), 0, 10, 10);
        selection.clear();
        assert!(selection.is_empty());
    }
}
