//! Drawing primitives. Every primitive rasterizes against the current mask
//! and returns a sparse [`MaskDelta`](crate::delta::MaskDelta) instead of
//! mutating in place; the command stack applies the delta atomically.
//!
//! Geometric edge cases (out-of-bounds seeds, degenerate shapes) are
//! absorbed here as empty deltas, never surfaced as errors.

pub mod brush;
pub mod fill;
pub mod polygon;

pub use brush::{brush_stroke, polyline};
pub use fill::flood_fill;
pub use polygon::{close_hit, fill_polygon};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whether a primitive unions foreground into the mask or erases it back to
/// background.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BrushMode {
    Draw,
    Erase,
}
