//! The segmentation algorithms themselves. Each is a pure function from an
//! image (plus region/seed/model inputs) to a proposed binary mask; the
//! state machines in [`crate::segmenter`] gate when they may run.

pub mod bright;
pub mod clustering;
pub mod grabcut;
pub mod lab;
pub mod learned;

pub use bright::bright_automask;
pub use clustering::cluster_mask;
pub use grabcut::grab_cut;
pub use lab::lab_automask;
pub use learned::model_automask;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// The closed set of segmentation algorithms. New algorithms are added by
/// extending this variant, not by open-ended subclassing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlgorithmKind {
    /// Otsu threshold over the LAB a* channel.
    LabThreshold,
    /// HSV in-range threshold for the bright green band.
    BrightThreshold,
    /// Rectangle-seeded iterative foreground extraction.
    GrabCut,
    /// Seeded k-means clustering inside a rectangle.
    Clustering,
    /// Inference with an externally loaded model.
    LearnedModel,
}
