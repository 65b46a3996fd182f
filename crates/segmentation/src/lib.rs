//! # Segmentation - Mask Proposal Pipeline
//!
//! Pluggable segmentation algorithms that propose masks for the annotation
//! engine: LAB and HSV thresholding, rectangle-seeded GrabCut, seeded
//! k-means clustering, and learned-model inference behind provider traits.
//!
//! Each algorithm is a small state machine ([`Segmenter`]) fed its inputs
//! step by step; [`SegmentationRunner`] executes a ready machine off the
//! interactive path, single-flight and cancellable, and the confirmed
//! result is unioned into a layer through the ordinary command stack.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use annotate_common::Rect;
//! use segmentation::{SegmentContext, Segmenter};
//!
//! let image = image::open("plant.png")?.to_rgb8();
//! let mut grab = Segmenter::grab_cut();
//! grab.set_rect(Rect::new(40, 30, 200, 160))?;
//!
//! let cancel = AtomicBool::new(false);
//! let result = grab.run(&SegmentContext::new(&image, &cancel))?;
//! assert!(result.mask.dimensions() == image.dimensions());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod algorithms;
pub mod color;
pub mod error;
pub mod kmeans;
pub mod providers;
pub mod runner;
pub mod segmenter;

// Re-exports for convenience
pub use algorithms::AlgorithmKind;
pub use error::{Result, SegmentationError};
pub use providers::{ImageProvider, ModelHandle, ModelProvider};
pub use runner::{run_and_merge, RunningSegmentation, SegmentationRunner, SharedSession};
pub use segmenter::{SegmentContext, SegmentationResult, Segmenter, SegmenterState};
