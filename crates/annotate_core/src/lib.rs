//! # Annotate Core - Layered Mask Editing Engine
//!
//! Maintains a hierarchy of labeled layers per image, each holding a
//! pixel-aligned mask, and mutates those masks through a small set of
//! drawing and morphology primitives. Every primitive computes a sparse
//! delta against the current mask; the command stack applies deltas
//! atomically and guarantees exact, bit-for-bit undo.
//!
//! ## Core pieces
//!
//! - [`LayerTree`]: immutable label taxonomy built once from configuration
//! - [`MaskStore`]: one mask buffer per layer, sized to the active image
//! - [`draw`]: flood fill, brush/eraser, polyline, polygon primitives
//! - [`morph`]: island removal, closing, dilation, erosion
//! - [`CommandStack`]: bounded linear undo over sparse inverse patches
//! - [`AnnotationSession`]: the command surface presentation code calls
//!
//! ## Quick Start
//!
//! ```rust
//! use annotate_core::{AnnotationSession, BrushMode};
//! use annotate_common::{LayerConfig, Point};
//!
//! let config: LayerConfig =
//!     serde_json::from_str(r#"{"layers": {"leaves": {}}}"#).unwrap();
//! let mut session = AnnotationSession::new(&config)?;
//! session.load_image(64, 64);
//!
//! let leaves = session.resolve_layer("leaves")?;
//! session.brush(leaves, &[[10.0, 10.0], [20.0, 12.0]], 3)?;
//! session.flood_fill(leaves, Point::new(15, 11))?;
//! session.undo()?;
//! # Ok::<(), annotate_core::CoreError>(())
//! ```

pub mod command;
pub mod delta;
pub mod draw;
pub mod error;
pub mod io;
pub mod layers;
pub mod morph;
pub mod selection;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use command::{Command, CommandKind, CommandStack, LayerPatch, DEFAULT_UNDO_CAPACITY};
pub use delta::{DeltaCell, MaskDelta};
pub use draw::{brush_stroke, close_hit, fill_polygon, flood_fill, polyline, BrushMode};
pub use error::{CoreError, Result};
pub use io::{MaskDirectory, MaskPersistence};
pub use layers::{Layer, LayerId, LayerTree, SHORTCUT_SLOTS};
pub use morph::{IslandConnectivity, MorphOp};
pub use selection::SelectionState;
pub use session::{AnnotationSession, EditOperation, PolygonProgress, DEFAULT_CLOSE_RADIUS};
pub use store::{MaskStore, BACKGROUND, FOREGROUND};
