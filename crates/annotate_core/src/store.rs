use annotate_common::{Point, Rect};
use image::GrayImage;

use crate::delta::MaskDelta;
use crate::error::{CoreError, Result};
use crate::layers::LayerId;

/// Background value for all masks.
pub const BACKGROUND: u8 = 0;

/// Default foreground value written by drawing primitives.
pub const FOREGROUND: u8 = 255;

/// One mask buffer per layer, all sized exactly to the current image.
///
/// Allocation is explicit and destructive: switching images calls
/// [`MaskStore::allocate`], which throws away every prior mask and bumps the
/// generation counter so stale commands can be detected. Mutation happens
/// only through [`MaskStore::write`] and the delta apply/revert paths used
/// by the command stack.
#[derive(Debug, Clone)]
pub struct MaskStore {
    width: u32,
    height: u32,
    generation: u64,
    masks: Vec<GrayImage>,
}

impl MaskStore {
    /// Create an unallocated store for `layer_count` layers. All reads and
    /// writes fail with `NotAllocated` until [`MaskStore::allocate`] runs.
    pub fn new(layer_count: usize) -> Self {
        Self {
            width: 0,
            height: 0,
            generation: 0,
            masks: vec![GrayImage::new(0, 0); layer_count],
        }
    }

    /// Zero-fill a fresh mask per layer at the given dimensions, discarding
    /// any prior masks.
    pub fn allocate(&mut self, width: u32, height: u32) {
        for mask in &mut self.masks {
            *mask = GrayImage::new(width, height);
        }
        self.width = width;
        self.height = height;
        self.generation += 1;
    }

    pub fn is_allocated(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bumped by every allocation; commands record the generation they were
    /// built against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn layer_count(&self) -> usize {
        self.masks.len()
    }

    pub fn mask(&self, layer: LayerId) -> Result<&GrayImage> {
        self.ensure_allocated()?;
        self.masks.get(layer.index()).ok_or(CoreError::LayerNotFound(layer))
    }

    fn mask_mut(&mut self, layer: LayerId) -> Result<&mut GrayImage> {
        if !self.is_allocated() {
            return Err(CoreError::NotAllocated);
        }
        self.masks.get_mut(layer.index()).ok_or(CoreError::LayerNotFound(layer))
    }

    pub fn read(&self, layer: LayerId, x: u32, y: u32) -> Result<u8> {
        self.check_bounds(x, y)?;
        Ok(self.mask(layer)?.get_pixel(x, y)[0])
    }

    pub fn write(&mut self, layer: LayerId, x: u32, y: u32, value: u8) -> Result<()> {
        self.check_bounds(x, y)?;
        self.mask_mut(layer)?.put_pixel(x, y, image::Luma([value]));
        Ok(())
    }

    /// Whether the layer's mask holds any foreground cell.
    pub fn has_mask(&self, layer: LayerId) -> Result<bool> {
        Ok(self.mask(layer)?.pixels().any(|p| p[0] != BACKGROUND))
    }

    /// Sparse snapshot of the current values inside `rect`, clamped to the
    /// mask. Used to build inverse patches without copying whole buffers.
    pub fn snapshot_region(&self, layer: LayerId, rect: Rect) -> Result<Vec<(Point, u8)>> {
        let mask = self.mask(layer)?;
        let rect = rect.clamp_to(self.width, self.height);
        let mut cells = Vec::with_capacity(rect.area() as usize);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                cells.push((Point::new(x, y), mask.get_pixel(x, y)[0]));
            }
        }
        Ok(cells)
    }

    /// Install an externally loaded mask for one layer. Not an undoable
    /// mutation; used when restoring saved annotations for a fresh image.
    pub fn install(&mut self, layer: LayerId, mask: GrayImage) -> Result<()> {
        let (expected_width, expected_height) = (self.width, self.height);
        if mask.dimensions() != (expected_width, expected_height) {
            let (found_width, found_height) = mask.dimensions();
            return Err(CoreError::DimensionMismatch {
                expected_width,
                expected_height,
                found_width,
                found_height,
            });
        }
        *self.mask_mut(layer)? = mask;
        Ok(())
    }

    /// Apply a delta's new values. Deltas are built against this store, so
    /// every cell is validated before the first write; a bad delta leaves
    /// the mask untouched.
    pub(crate) fn apply(&mut self, layer: LayerId, delta: &MaskDelta) -> Result<()> {
        self.check_delta(delta)?;
        let mask = self.mask_mut(layer)?;
        for cell in delta.cells() {
            mask.put_pixel(cell.x, cell.y, image::Luma([cell.new]));
        }
        Ok(())
    }

    /// Restore a delta's old values.
    pub(crate) fn revert(&mut self, layer: LayerId, delta: &MaskDelta) -> Result<()> {
        self.check_delta(delta)?;
        let mask = self.mask_mut(layer)?;
        for cell in delta.cells() {
            mask.put_pixel(cell.x, cell.y, image::Luma([cell.old]));
        }
        Ok(())
    }

    fn check_delta(&self, delta: &MaskDelta) -> Result<()> {
        for cell in delta.cells() {
            self.check_bounds(cell.x, cell.y)?;
        }
        Ok(())
    }

    fn check_bounds(&self, x: u32, y: u32) -> Result<()> {
        self.ensure_allocated()?;
        if x >= self.width || y >= self.height {
            return Err(CoreError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn ensure_allocated(&self) -> Result<()> {
        if self.is_allocated() {
            Ok(())
        } else {
            Err(CoreError::NotAllocated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MaskStore {
        let mut store = MaskStore::new(2);
        store.allocate(8, 6);
        store
    }

    #[test]
    fn unallocated_store_rejects_access() {
        let store = MaskStore::new(1);
        assert!(matches!(
            store.read(LayerId(0), 0, 0),
            Err(CoreError::NotAllocated)
        ));
    }

    #[test]
    fn allocate_zero_fills_and_bumps_generation() {
        let mut store = store();
        store.write(LayerId(0), 3, 3, 7).unwrap();
        let generation = store.generation();
        store.allocate(4, 4);
        assert_eq!(store.generation(), generation + 1);
        assert!(!store.has_mask(LayerId(0)).unwrap());
        assert_eq!(store.width(), 4);
    }

    #[test]
    fn bounds_are_enforced() {
        let mut store = store();
        assert!(matches!(
            store.read(LayerId(0), 8, 0),
            Err(CoreError::OutOfBounds { .. })
        ));
        assert!(store.write(LayerId(0), 0, 6, 1).is_err());
        assert!(matches!(
            store.read(LayerId(5), 0, 0),
            Err(CoreError::LayerNotFound(_))
        ));
    }

    #[test]
    fn snapshot_region_clamps() {
        let mut store = store();
        store.write(LayerId(0), 7, 5, 9).unwrap();
        let cells = store
            .snapshot_region(LayerId(0), Rect::new(6, 4, 10, 10))
            .unwrap();
        assert_eq!(cells.len(), 4);
        assert!(cells.contains(&(Point::new(7, 5), 9)));
    }

    #[test]
    fn apply_and_revert_are_exact_inverses() {
        let mut store = store();
        store.write(LayerId(1), 2, 2, 5).unwrap();
        let mut delta = MaskDelta::new();
        delta.push(2, 2, 5, 200);
        delta.push(0, 0, 0, 255);

        store.apply(LayerId(1), &delta).unwrap();
        assert_eq!(store.read(LayerId(1), 2, 2).unwrap(), 200);
        assert_eq!(store.read(LayerId(1), 0, 0).unwrap(), 255);

        store.revert(LayerId(1), &delta).unwrap();
        assert_eq!(store.read(LayerId(1), 2, 2).unwrap(), 5);
        assert_eq!(store.read(LayerId(1), 0, 0).unwrap(), 0);
    }

    #[test]
    fn install_checks_dimensions() {
        let mut store = store();
        assert!(store.install(LayerId(0), GrayImage::new(8, 6)).is_ok());
        assert!(matches!(
            store.install(LayerId(0), GrayImage::new(3, 3)),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }
}
