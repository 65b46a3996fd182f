use std::collections::VecDeque;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use crate::delta::MaskDelta;
use crate::error::{CoreError, Result};
use crate::layers::LayerId;
use crate::store::MaskStore;

/// Default bound on the undo history; pushing past it evicts the oldest
/// entry.
pub const DEFAULT_UNDO_CAPACITY: usize = 100;

/// What a recorded command did, with the parameters that drove it. The
/// algorithm-style kinds carry their parameter so the applied-algorithm
/// history can be reported back to the caller.
#[derive(
    Debug, Clone, PartialEq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, VariantNames, IntoStaticStr,
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    FloodFill,
    Brush,
    Eraser,
    Polyline,
    PolygonFill,
    PolygonErase,
    RemoveIslands { min_size: u32 },
    Closing { iterations: u8 },
    Dilation { iterations: u8 },
    Erosion { iterations: u8 },
    ClearMask,
    MoveMask,
    MergeSegmentation { algorithm: String },
}

impl CommandKind {
    /// Whether this kind belongs to the applied-algorithm history (the
    /// parameterized mask-processing steps, as opposed to hand drawing).
    pub fn is_algorithm(&self) -> bool {
        matches!(
            self,
            CommandKind::RemoveIslands { .. }
                | CommandKind::Closing { .. }
                | CommandKind::Dilation { .. }
                | CommandKind::Erosion { .. }
                | CommandKind::MergeSegmentation { .. }
        )
    }
}

/// The patch a command applies to one layer.
#[derive(Debug, Clone)]
pub struct LayerPatch {
    pub layer: LayerId,
    pub delta: MaskDelta,
}

/// One undoable mutation: the operation kind plus the sparse patch per
/// affected layer (one for ordinary edits, two for moves between layers).
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    pub patches: Vec<LayerPatch>,
    generation: u64,
}

/// Linear undo history. Commands are appended by `push` (which also applies
/// the forward patch) and removed only by `undo`; the stack is bounded and
/// evicts its oldest entry on overflow.
#[derive(Debug)]
pub struct CommandStack {
    entries: VecDeque<Command>,
    capacity: usize,
}

impl CommandStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the whole history. Called when masks are reallocated, there is
    /// nothing left the recorded patches could apply to.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Apply the command's patches to the store and record it. The patches
    /// are fully precomputed, and every cell is validated before the first
    /// write, so a failure leaves no partial state.
    pub fn push(
        &mut self,
        store: &mut MaskStore,
        kind: CommandKind,
        patches: Vec<LayerPatch>,
    ) -> Result<()> {
        for patch in &patches {
            store.mask(patch.layer)?;
        }
        for patch in &patches {
            store.apply(patch.layer, &patch.delta)?;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Command {
            kind,
            patches,
            generation: store.generation(),
        });
        Ok(())
    }

    /// Pop the most recent command and restore the old values of every cell
    /// it touched. Fails with `EmptyStack` when there is nothing to undo.
    pub fn undo(&mut self, store: &mut MaskStore) -> Result<CommandKind> {
        let command = self.entries.pop_back().ok_or(CoreError::EmptyStack)?;
        if command.generation != store.generation() {
            return Err(CoreError::StaleGeneration);
        }
        for patch in command.patches.iter().rev() {
            store.revert(patch.layer, &patch.delta)?;
        }
        Ok(command.kind)
    }

    /// The algorithm-kind commands currently on the stack, oldest first.
    pub fn algorithm_history(&self) -> Vec<&CommandKind> {
        self.entries
            .iter()
            .map(|command| &command.kind)
            .filter(|kind| kind.is_algorithm())
            .collect()
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_CAPACITY)
    }
}
