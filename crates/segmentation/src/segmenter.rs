//! Per-algorithm state machines. The states model the multi-step input flow
//! (rectangle, seeds, cluster count, model, channel) without reference to
//! any presentation layer: inputs are fed in, `run` is gated on reaching
//! `Ready`, and a computed machine must be explicitly reset before reuse.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use annotate_common::{Point, Rect};
use annotate_core::SelectionState;
use image::{GrayImage, RgbImage};
use strum::Display;
use tracing::info;

use crate::algorithms::{
    bright_automask, cluster_mask, grab_cut, lab_automask, model_automask, AlgorithmKind,
};
use crate::error::{Result, SegmentationError};
use crate::providers::{ModelHandle, ModelProvider};

/// Observable state of a segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SegmenterState {
    AwaitRect,
    AwaitSeed,
    AwaitClusterCount,
    AwaitModel,
    AwaitChannel,
    Ready,
    Computed,
}

/// A proposed mask plus the algorithm that produced it. Merging it into a
/// layer is a separate, explicitly confirmed step.
pub struct SegmentationResult {
    pub algorithm: AlgorithmKind,
    pub mask: GrayImage,
}

/// Everything an algorithm needs at run time: the image and the cooperative
/// cancellation flag.
pub struct SegmentContext<'a> {
    pub image: &'a RgbImage,
    pub cancel: &'a AtomicBool,
}

impl<'a> SegmentContext<'a> {
    pub fn new(image: &'a RgbImage, cancel: &'a AtomicBool) -> Self {
        Self { image, cancel }
    }
}

/// The closed set of algorithm state machines with a uniform feed/run/reset
/// surface.
pub enum Segmenter {
    LabThreshold { rects: Vec<Rect>, computed: bool },
    BrightThreshold { computed: bool },
    GrabCut { rect: Option<Rect>, computed: bool },
    Clustering {
        rect: Option<Rect>,
        seeds: Vec<Point>,
        clusters: Option<usize>,
        computed: bool,
    },
    LearnedModel {
        model: Option<Box<dyn ModelHandle>>,
        channel: Option<usize>,
        computed: bool,
    },
}

impl Segmenter {
    pub fn lab() -> Self {
        Segmenter::LabThreshold { rects: Vec::new(), computed: false }
    }

    pub fn bright() -> Self {
        Segmenter::BrightThreshold { computed: false }
    }

    pub fn grab_cut() -> Self {
        Segmenter::GrabCut { rect: None, computed: false }
    }

    pub fn clustering() -> Self {
        Segmenter::Clustering {
            rect: None,
            seeds: Vec::new(),
            clusters: None,
            computed: false,
        }
    }

    pub fn learned() -> Self {
        Segmenter::LearnedModel { model: None, channel: None, computed: false }
    }

    pub fn kind(&self) -> AlgorithmKind {
        match self {
            Segmenter::LabThreshold { .. } => AlgorithmKind::LabThreshold,
            Segmenter::BrightThreshold { .. } => AlgorithmKind::BrightThreshold,
            Segmenter::GrabCut { .. } => AlgorithmKind::GrabCut,
            Segmenter::Clustering { .. } => AlgorithmKind::Clustering,
            Segmenter::LearnedModel { .. } => AlgorithmKind::LearnedModel,
        }
    }

    pub fn state(&self) -> SegmenterState {
        match self {
            Segmenter::LabThreshold { computed, .. }
            | Segmenter::BrightThreshold { computed } => {
                if *computed { SegmenterState::Computed } else { SegmenterState::Ready }
            }
            Segmenter::GrabCut { rect, computed } => {
                if *computed {
                    SegmenterState::Computed
                } else if rect.is_none() {
                    SegmenterState::AwaitRect
                } else {
                    SegmenterState::Ready
                }
            }
            Segmenter::Clustering { rect, seeds, clusters, computed } => {
                if *computed {
                    SegmenterState::Computed
                } else if rect.is_none() {
                    SegmenterState::AwaitRect
                } else if seeds.is_empty() {
                    SegmenterState::AwaitSeed
                } else if clusters.is_none() {
                    SegmenterState::AwaitClusterCount
                } else {
                    SegmenterState::Ready
                }
            }
            Segmenter::LearnedModel { model, channel, computed } => {
                if *computed {
                    SegmenterState::Computed
                } else if model.is_none() {
                    SegmenterState::AwaitModel
                } else if channel.is_none() {
                    SegmenterState::AwaitChannel
                } else {
                    SegmenterState::Ready
                }
            }
        }
    }

    /// Feed a selection rectangle. LAB accumulates rectangles, GrabCut and
    /// Clustering take the one seed rectangle; the other algorithms take
    /// none. Zero-area rectangles are rejected outright.
    pub fn set_rect(&mut self, rect: Rect) -> Result<()> {
        self.ensure_not_computed()?;
        if rect.is_degenerate() {
            return Err(SegmentationError::InvalidRegion);
        }
        match self {
            Segmenter::LabThreshold { rects, .. } => {
                rects.push(rect);
                Ok(())
            }
            Segmenter::GrabCut { rect: slot, .. }
            | Segmenter::Clustering { rect: slot, .. } => {
                *slot = Some(rect);
                Ok(())
            }
            _ => Err(SegmentationError::InvalidInput),
        }
    }

    /// Feed seed points (Clustering only, after the rectangle).
    pub fn add_seeds(&mut self, points: &[Point]) -> Result<()> {
        self.ensure_not_computed()?;
        match self {
            Segmenter::Clustering { rect: Some(_), seeds, .. } => {
                seeds.extend_from_slice(points);
                Ok(())
            }
            Segmenter::Clustering { rect: None, .. } => {
                Err(SegmentationError::Precondition { state: SegmenterState::AwaitRect })
            }
            _ => Err(SegmentationError::InvalidInput),
        }
    }

    /// Feed the cluster count (Clustering only, after the seeds).
    pub fn set_cluster_count(&mut self, k: usize) -> Result<()> {
        self.ensure_not_computed()?;
        if k == 0 {
            return Err(SegmentationError::InvalidClusterCount);
        }
        match self {
            Segmenter::Clustering { seeds, clusters, .. } if !seeds.is_empty() => {
                *clusters = Some(k);
                Ok(())
            }
            Segmenter::Clustering { .. } => {
                Err(SegmentationError::Precondition { state: self.state() })
            }
            _ => Err(SegmentationError::InvalidInput),
        }
    }

    /// Load the model through the provider (LearnedModel only). A load
    /// failure propagates and leaves the machine awaiting a model.
    pub fn load_model(&mut self, provider: &dyn ModelProvider, path: &Path) -> Result<()> {
        self.ensure_not_computed()?;
        match self {
            Segmenter::LearnedModel { model, .. } => {
                let handle = provider.load_model(path)?;
                info!(?path, "model loaded");
                *model = Some(handle);
                Ok(())
            }
            _ => Err(SegmentationError::InvalidInput),
        }
    }

    /// Choose the model output channel (LearnedModel only, after the model).
    pub fn set_channel(&mut self, channel: usize) -> Result<()> {
        self.ensure_not_computed()?;
        match self {
            Segmenter::LearnedModel { model: Some(_), channel: slot, .. } => {
                *slot = Some(channel);
                Ok(())
            }
            Segmenter::LearnedModel { model: None, .. } => {
                Err(SegmentationError::Precondition { state: SegmenterState::AwaitModel })
            }
            _ => Err(SegmentationError::InvalidInput),
        }
    }

    /// Feed the session's pending selection state: LAB takes every stacked
    /// rectangle, GrabCut and Clustering the most recent one, Clustering
    /// additionally the seed points. Algorithms without region inputs take
    /// nothing.
    pub fn feed_selection(&mut self, selection: &SelectionState) -> Result<()> {
        match self.kind() {
            AlgorithmKind::LabThreshold => {
                for rect in selection.rects() {
                    self.set_rect(*rect)?;
                }
            }
            AlgorithmKind::GrabCut => {
                if let Some(rect) = selection.last_rect() {
                    self.set_rect(rect)?;
                }
            }
            AlgorithmKind::Clustering => {
                if let Some(rect) = selection.last_rect() {
                    self.set_rect(rect)?;
                }
                let seeds = selection.seeds();
                if !seeds.is_empty() {
                    self.add_seeds(&seeds)?;
                }
            }
            AlgorithmKind::BrightThreshold | AlgorithmKind::LearnedModel => {}
        }
        Ok(())
    }

    /// Run the algorithm. Fails with a precondition error unless the machine
    /// is `Ready`; on failure the machine keeps its pre-run state, on
    /// success it moves to `Computed` until reset.
    pub fn run(&mut self, ctx: &SegmentContext) -> Result<SegmentationResult> {
        if self.state() != SegmenterState::Ready {
            return Err(SegmentationError::Precondition { state: self.state() });
        }
        if ctx.cancel.load(Ordering::Relaxed) {
            return Err(SegmentationError::Cancelled);
        }

        let algorithm = self.kind();
        let mask = match self {
            Segmenter::LabThreshold { rects, .. } => lab_automask(ctx.image, rects),
            Segmenter::BrightThreshold { .. } => bright_automask(ctx.image),
            Segmenter::GrabCut { rect: Some(rect), .. } => {
                grab_cut(ctx.image, *rect, ctx.cancel)?
            }
            Segmenter::Clustering {
                rect: Some(rect),
                seeds,
                clusters: Some(k),
                ..
            } => cluster_mask(ctx.image, *rect, seeds, *k, ctx.cancel)?,
            Segmenter::LearnedModel {
                model: Some(model),
                channel: Some(channel),
                ..
            } => model_automask(model.as_ref(), ctx.image, *channel, ctx.cancel)?,
            _ => return Err(SegmentationError::Precondition { state: self.state() }),
        };
        if ctx.cancel.load(Ordering::Relaxed) {
            return Err(SegmentationError::Cancelled);
        }

        self.set_computed(true);
        info!(%algorithm, "segmentation run completed");
        Ok(SegmentationResult { algorithm, mask })
    }

    /// Clear the computed flag and the per-run geometry (rectangles, seeds,
    /// cluster count). A loaded model and its channel are kept: reloading is
    /// expensive and the reset target is the `Ready`-equivalent state.
    pub fn reset(&mut self) {
        match self {
            Segmenter::LabThreshold { rects, computed } => {
                rects.clear();
                *computed = false;
            }
            Segmenter::BrightThreshold { computed } => *computed = false,
            Segmenter::GrabCut { rect, computed } => {
                *rect = None;
                *computed = false;
            }
            Segmenter::Clustering { rect, seeds, clusters, computed } => {
                *rect = None;
                seeds.clear();
                *clusters = None;
                *computed = false;
            }
            Segmenter::LearnedModel { computed, .. } => *computed = false,
        }
    }

    fn ensure_not_computed(&self) -> Result<()> {
        if self.state() == SegmenterState::Computed {
            Err(SegmentationError::Precondition { state: SegmenterState::Computed })
        } else {
            Ok(())
        }
    }

    fn set_computed(&mut self, value: bool) {
        match self {
            Segmenter::LabThreshold { computed, .. }
            | Segmenter::BrightThreshold { computed }
            | Segmenter::GrabCut { computed, .. }
            | Segmenter::Clustering { computed, .. }
            | Segmenter::LearnedModel { computed, .. } => *computed = value,
        }
    }
}
