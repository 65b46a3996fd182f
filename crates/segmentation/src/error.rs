use thiserror::Error;

use crate::segmenter::SegmenterState;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("operation not allowed in the {state} state")]
    Precondition { state: SegmenterState },

    #[error("input does not fit the algorithm's current state")]
    InvalidInput,

    #[error("selection rectangle has zero area")]
    InvalidRegion,

    #[error("cluster count must be at least 1")]
    InvalidClusterCount,

    #[error("image {0:?} not found")]
    ImageNotFound(String),

    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("a segmentation run is already in flight")]
    AlreadyRunning,

    #[error("segmentation run was cancelled")]
    Cancelled,

    #[error("session lock was poisoned by a panicked writer")]
    LockPoisoned,

    #[error(transparent)]
    Core(#[from] annotate_core::CoreError),
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
