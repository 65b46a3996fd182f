//! Mask persistence helpers. The engine only produces and consumes
//! in-memory `GrayImage` buffers; this module supplies the trait the
//! persistence collaborator implements plus the default filesystem
//! implementation (one grayscale PNG per layer next to the image).

use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::store::BACKGROUND;

/// Storage seam for masks. Implementations decide format and location; the
/// engine only guarantees the buffer dimensions and value domain.
pub trait MaskPersistence {
    fn save_mask(&self, layer_name: &str, mask: &GrayImage) -> Result<()>;
    fn load_mask(&self, layer_name: &str, width: u32, height: u32) -> Result<GrayImage>;
}

/// Filesystem persistence: `<image stem>.mask_<layer>.png` inside a label
/// directory. Saving an empty mask removes the file instead of writing an
/// all-zero image; loading a missing file yields an all-zero mask.
#[derive(Debug, Clone)]
pub struct MaskDirectory {
    root: PathBuf,
    image_stem: String,
}

impl MaskDirectory {
    pub fn new(root: impl Into<PathBuf>, image_filename: &str) -> Self {
        let image_stem = Path::new(image_filename)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_filename.to_string());
        Self { root: root.into(), image_stem }
    }

    pub fn mask_path(&self, layer_name: &str) -> PathBuf {
        self.root
            .join(format!("{}.mask_{}.png", self.image_stem, layer_name))
    }
}

impl MaskPersistence for MaskDirectory {
    fn save_mask(&self, layer_name: &str, mask: &GrayImage) -> Result<()> {
        let path = self.mask_path(layer_name);
        if mask.pixels().all(|p| p[0] == BACKGROUND) {
            if path.is_file() {
                debug!(?path, "mask is empty, removing stale file");
                fs::remove_file(&path)?;
            }
            return Ok(());
        }
        mask.save(&path)?;
        Ok(())
    }

    fn load_mask(&self, layer_name: &str, width: u32, height: u32) -> Result<GrayImage> {
        let path = self.mask_path(layer_name);
        if !path.is_file() {
            return Ok(GrayImage::new(width, height));
        }
        let mask = image::open(&path)?.to_luma8();
        if mask.dimensions() != (width, height) {
            let (found_width, found_height) = mask.dimensions();
            return Err(CoreError::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                found_width,
                found_height,
            });
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn directory() -> (tempfile::TempDir, MaskDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let masks = MaskDirectory::new(dir.path(), "frame_0042.png");
        (dir, masks)
    }

    #[test]
    fn nonempty_mask_round_trips() {
        let (_dir, masks) = directory();
        let mut mask = GrayImage::new(8, 6);
        mask.put_pixel(3, 2, Luma([255]));
        masks.save_mask("leaves", &mask).unwrap();

        let loaded = masks.load_mask("leaves", 8, 6).unwrap();
        assert_eq!(loaded.as_raw(), mask.as_raw());
    }

    #[test]
    fn missing_file_loads_as_all_background() {
        let (_dir, masks) = directory();
        let loaded = masks.load_mask("stems", 5, 5).unwrap();
        assert!(loaded.pixels().all(|p| p[0] == BACKGROUND));
    }

    #[test]
    fn saving_an_empty_mask_removes_the_file() {
        let (_dir, masks) = directory();
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([255]));
        masks.save_mask("leaves", &mask).unwrap();
        assert!(masks.mask_path("leaves").is_file());

        masks.save_mask("leaves", &GrayImage::new(4, 4)).unwrap();
        assert!(!masks.mask_path("leaves").is_file());
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let (_dir, masks) = directory();
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, Luma([255]));
        masks.save_mask("leaves", &mask).unwrap();
        assert!(matches!(
            masks.load_mask("leaves", 9, 9),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }
}
