use std::sync::atomic::{AtomicBool, Ordering};

use image::{GrayImage, RgbImage};

use crate::error::{Result, SegmentationError};
use crate::providers::ModelHandle;

/// Scores at or above this level count as foreground, the midpoint of the
/// raw 0..=255 score range.
pub const SCORE_THRESHOLD: u8 = 128;

/// Run model inference over the chosen output channel and threshold the raw
/// score mask into a binary proposal.
pub fn model_automask(
    model: &dyn ModelHandle,
    image: &RgbImage,
    channel: usize,
    cancel: &AtomicBool,
) -> Result<GrayImage> {
    let raw = model.infer(image, channel)?;
    if cancel.load(Ordering::Relaxed) {
        return Err(SegmentationError::Cancelled);
    }
    if raw.dimensions() != image.dimensions() {
        return Err(SegmentationError::Inference(format!(
            "model returned a {}x{} mask for a {}x{} image",
            raw.width(),
            raw.height(),
            image.width(),
            image.height()
        )));
    }

    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in raw.enumerate_pixels() {
        if pixel[0] >= SCORE_THRESHOLD {
            mask.put_pixel(x, y, image::Luma([255]));
        }
    }
    Ok(mask)
}
