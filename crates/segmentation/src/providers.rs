//! Seams to the external collaborators: the image source and the learned
//! model. The engine never retries or caches behind these traits; failures
//! surface to the caller as resource errors.

use std::path::Path;

use image::{GrayImage, RgbImage};

use crate::error::Result;

/// Supplies the read-only pixel buffer for an image identifier.
pub trait ImageProvider: Send + Sync {
    fn load_image(&self, identifier: &str) -> Result<RgbImage>;
}

/// A loaded model ready for inference. `infer` returns a raw per-pixel
/// score mask (0..=255) for the requested output channel, at the image's
/// dimensions.
pub trait ModelHandle: Send + Sync {
    fn infer(&self, image: &RgbImage, channel: usize) -> Result<GrayImage>;
}

/// Loads models from a path into inference handles.
pub trait ModelProvider: Send + Sync {
    fn load_model(&self, path: &Path) -> Result<Box<dyn ModelHandle>>;
}
