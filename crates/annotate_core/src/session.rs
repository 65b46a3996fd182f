use annotate_common::{Color, LayerConfig, Point, Rect};
use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info};

use crate::command::{CommandKind, CommandStack, LayerPatch, DEFAULT_UNDO_CAPACITY};
use crate::delta::MaskDelta;
use crate::draw::{self, BrushMode};
use crate::error::{CoreError, Result};
use crate::layers::{LayerId, LayerTree};
use crate::morph::{self, IslandConnectivity, MorphOp};
use crate::selection::SelectionState;
use crate::store::{MaskStore, BACKGROUND, FOREGROUND};

/// Default distance (in pixels) a click may land from the first vertex and
/// still close the polygon.
pub const DEFAULT_CLOSE_RADIUS: f32 = 10.0;

/// Outcome of a polygon click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonProgress {
    /// The click added a vertex; the count so far is returned.
    Accumulated(usize),
    /// The click landed within the close radius: the polygon was filled and
    /// recorded as a command.
    Closed,
}

/// The serializable command surface: one entry per drawing or processing
/// primitive plus undo. Layers are referenced by name, as presentation code
/// and script files know them.
#[derive(
    Debug, Clone, PartialEq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, VariantNames, IntoStaticStr,
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EditOperation {
    FloodFill { layer: String, x: u32, y: u32 },
    Brush { layer: String, path: Vec<[f32; 2]>, radius: u32 },
    Erase { layer: String, path: Vec<[f32; 2]>, radius: u32 },
    Polyline { layer: String, vertices: Vec<[f32; 2]>, thickness: u32 },
    FillPolygon { layer: String, vertices: Vec<[f32; 2]> },
    ErasePolygon { layer: String, vertices: Vec<[f32; 2]> },
    RemoveIslands {
        layer: String,
        min_size: u32,
        #[serde(default)]
        connectivity: IslandConnectivity,
    },
    Closing { layer: String, iterations: u8 },
    Dilate { layer: String, iterations: u8 },
    Erode { layer: String, iterations: u8 },
    ClearMask { layer: String },
    MoveMask { from: String, to: String },
    PushRect { x: u32, y: u32, width: u32, height: u32 },
    PopRect,
    StampSeeds { x: u32, y: u32, radius: u32 },
    ClearSelection,
    Certify { layer: String, certified: bool },
    HardExample { layer: String, hard_example: bool },
    Undo,
}

/// One annotation session: the layer taxonomy, the per-layer masks for the
/// active image, the undo history, and the transient selection state.
///
/// Every mask-affecting method computes its full patch first and then pushes
/// it through the command stack, so each call is atomic and exactly
/// undoable. Callers that mutate from several threads (the segmentation
/// merge in particular) must share the session behind a single mutex; the
/// session itself assumes one writer.
pub struct AnnotationSession {
    layers: LayerTree,
    store: MaskStore,
    commands: CommandStack,
    selection: SelectionState,
    polygon: Vec<[f32; 2]>,
    polygon_mode: BrushMode,
}

impl AnnotationSession {
    pub fn new(config: &LayerConfig) -> Result<Self> {
        Self::with_undo_capacity(config, DEFAULT_UNDO_CAPACITY)
    }

    pub fn with_undo_capacity(config: &LayerConfig, capacity: usize) -> Result<Self> {
        let layers = LayerTree::build(config)?;
        let store = MaskStore::new(layers.len());
        Ok(Self {
            layers,
            store,
            commands: CommandStack::new(capacity),
            selection: SelectionState::new(),
            polygon: Vec::new(),
            polygon_mode: BrushMode::Draw,
        })
    }

    pub fn layers(&self) -> &LayerTree {
        &self.layers
    }

    pub fn store(&self) -> &MaskStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn resolve_layer(&self, name: &str) -> Result<LayerId> {
        Ok(self.layers.resolve_name(name)?.id)
    }

    /// Switch to an image of the given dimensions: reallocates every mask
    /// zero-filled and drops the undo history and any pending selection or
    /// polygon state.
    pub fn load_image(&mut self, width: u32, height: u32) {
        info!(width, height, "allocating masks for image");
        self.store.allocate(width, height);
        self.commands.clear();
        self.selection.clear();
        self.polygon.clear();
    }

    /// Install an externally persisted mask for one layer, outside the undo
    /// history.
    pub fn install_mask(&mut self, layer: LayerId, mask: GrayImage) -> Result<()> {
        self.store.install(layer, mask)
    }

    pub fn flood_fill(&mut self, layer: LayerId, seed: Point) -> Result<()> {
        let delta = draw::flood_fill(&self.store, layer, seed, FOREGROUND)?;
        self.push_single(CommandKind::FloodFill, layer, delta)
    }

    pub fn brush(&mut self, layer: LayerId, path: &[[f32; 2]], radius: u32) -> Result<()> {
        let delta =
            draw::brush_stroke(&self.store, layer, path, radius, BrushMode::Draw, FOREGROUND)?;
        self.push_single(CommandKind::Brush, layer, delta)
    }

    pub fn erase(&mut self, layer: LayerId, path: &[[f32; 2]], radius: u32) -> Result<()> {
        let delta =
            draw::brush_stroke(&self.store, layer, path, radius, BrushMode::Erase, FOREGROUND)?;
        self.push_single(CommandKind::Eraser, layer, delta)
    }

    pub fn polyline(&mut self, layer: LayerId, vertices: &[[f32; 2]], thickness: u32) -> Result<()> {
        let delta = draw::polyline(
            &self.store, layer, vertices, thickness, BrushMode::Draw, FOREGROUND,
        )?;
        self.push_single(CommandKind::Polyline, layer, delta)
    }

    /// Fill a complete polygon outline in one call (the scripted form of the
    /// click-accumulating flow).
    pub fn fill_polygon(
        &mut self,
        layer: LayerId,
        vertices: &[[f32; 2]],
        mode: BrushMode,
    ) -> Result<()> {
        let delta = draw::fill_polygon(&self.store, layer, vertices, mode, FOREGROUND)?;
        let kind = match mode {
            BrushMode::Draw => CommandKind::PolygonFill,
            BrushMode::Erase => CommandKind::PolygonErase,
        };
        self.push_single(kind, layer, delta)
    }

    /// Accumulate one polygon vertex; a click within `close_radius` of the
    /// first vertex closes and fills the shape. Switching draw/erase mode
    /// mid-shape restarts the outline.
    pub fn polygon_click(
        &mut self,
        layer: LayerId,
        point: [f32; 2],
        mode: BrushMode,
        close_radius: f32,
    ) -> Result<PolygonProgress> {
        if mode != self.polygon_mode && !self.polygon.is_empty() {
            self.polygon.clear();
        }
        self.polygon_mode = mode;

        if !self.polygon.is_empty() && draw::close_hit(&self.polygon, point, close_radius) {
            let vertices = std::mem::take(&mut self.polygon);
            self.fill_polygon(layer, &vertices, mode)?;
            return Ok(PolygonProgress::Closed);
        }
        self.polygon.push(point);
        Ok(PolygonProgress::Accumulated(self.polygon.len()))
    }

    /// Drop the last accumulated polygon vertex.
    pub fn pop_polygon_vertex(&mut self) -> bool {
        self.polygon.pop().is_some()
    }

    /// Discard the accumulated polygon outline.
    pub fn cancel_polygon(&mut self) {
        self.polygon.clear();
    }

    pub fn polygon_vertices(&self) -> &[[f32; 2]] {
        &self.polygon
    }

    /// Run one morphological operator, restricted to the selection
    /// rectangles when any are present.
    pub fn morph(&mut self, layer: LayerId, op: &MorphOp) -> Result<()> {
        let delta = morph::apply(&self.store, layer, self.selection.rects(), op)?;
        let kind = match *op {
            MorphOp::RemoveIslands { min_size, .. } => CommandKind::RemoveIslands { min_size },
            MorphOp::Closing { iterations } => CommandKind::Closing { iterations },
            MorphOp::Dilate { iterations } => CommandKind::Dilation { iterations },
            MorphOp::Erode { iterations } => CommandKind::Erosion { iterations },
        };
        self.push_single(kind, layer, delta)
    }

    /// Clear the whole mask of one layer as a single undoable command.
    pub fn clear_mask(&mut self, layer: LayerId) -> Result<()> {
        let mask = self.store.mask(layer)?;
        let mut delta = MaskDelta::new();
        for (x, y, pixel) in mask.enumerate_pixels() {
            delta.push(x, y, pixel[0], BACKGROUND);
        }
        self.push_single(CommandKind::ClearMask, layer, delta)
    }

    /// Move the mask content inside the most recent selection rectangle from
    /// one layer onto another (unioned there), as a single undoable command.
    /// Consumes the rectangle stack.
    pub fn move_mask(&mut self, from: LayerId, to: LayerId) -> Result<()> {
        let rect = self.selection.last_rect().ok_or(CoreError::NoSelectionRect)?;
        let source = self.store.mask(from)?;
        let target = self.store.mask(to)?;

        let mut take = MaskDelta::new();
        let mut put = MaskDelta::new();
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                let value = source.get_pixel(x, y)[0];
                if value == BACKGROUND {
                    continue;
                }
                take.push(x, y, value, BACKGROUND);
                let existing = target.get_pixel(x, y)[0];
                if existing == BACKGROUND {
                    put.push(x, y, existing, value);
                }
            }
        }

        if take.is_empty() {
            debug!("move produced no change, nothing selected under the rectangle");
            return Ok(());
        }
        self.commands.push(
            &mut self.store,
            CommandKind::MoveMask,
            vec![
                LayerPatch { layer: from, delta: take },
                LayerPatch { layer: to, delta: put },
            ],
        )?;
        self.selection.clear_rects();
        Ok(())
    }

    /// Union a proposed segmentation mask into the target layer. This is the
    /// single entry point for algorithm results; the proposal becomes an
    /// ordinary command on the stack.
    pub fn merge_mask(
        &mut self,
        layer: LayerId,
        proposal: &GrayImage,
        algorithm: &str,
    ) -> Result<()> {
        let mask = self.store.mask(layer)?;
        if proposal.dimensions() != mask.dimensions() {
            let (found_width, found_height) = proposal.dimensions();
            return Err(CoreError::DimensionMismatch {
                expected_width: mask.width(),
                expected_height: mask.height(),
                found_width,
                found_height,
            });
        }

        let mut delta = MaskDelta::new();
        for (x, y, pixel) in proposal.enumerate_pixels() {
            if pixel[0] != BACKGROUND {
                let existing = mask.get_pixel(x, y)[0];
                if existing == BACKGROUND {
                    delta.push(x, y, existing, FOREGROUND);
                }
            }
        }
        info!(algorithm, changed = delta.len(), "merging segmentation result");
        self.push_single(
            CommandKind::MergeSegmentation { algorithm: algorithm.to_string() },
            layer,
            delta,
        )
    }

    /// Undo the most recent command. An empty stack is expected steady-state
    /// behavior and reports as `None` rather than an error.
    pub fn undo(&mut self) -> Result<Option<CommandKind>> {
        match self.commands.undo(&mut self.store) {
            Ok(kind) => Ok(Some(kind)),
            Err(CoreError::EmptyStack) => {
                debug!("undo requested with an empty history");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.commands.len()
    }

    pub fn algorithm_history(&self) -> Vec<&CommandKind> {
        self.commands.algorithm_history()
    }

    pub fn push_rect(&mut self, rect: Rect) {
        self.selection.push_rect(rect, self.store.width(), self.store.height());
    }

    pub fn pop_rect(&mut self) -> Option<Rect> {
        self.selection.pop_rect()
    }

    pub fn stamp_seeds(&mut self, center: Point, radius: u32) {
        self.selection
            .stamp_seeds(center, radius, self.store.width(), self.store.height());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_certified(&mut self, layer: LayerId, certified: bool) -> Result<()> {
        self.layers.set_certified(layer, certified)
    }

    pub fn set_hard_example(&mut self, layer: LayerId, hard_example: bool) -> Result<()> {
        self.layers.set_hard_example(layer, hard_example)
    }

    pub fn set_color(&mut self, layer: LayerId, color: Color) -> Result<()> {
        self.layers.set_color(layer, color)
    }

    /// Execute one scripted operation against the session.
    pub fn execute(&mut self, op: &EditOperation) -> Result<()> {
        match op {
            EditOperation::FloodFill { layer, x, y } => {
                let layer = self.resolve_layer(layer)?;
                self.flood_fill(layer, Point::new(*x, *y))
            }
            EditOperation::Brush { layer, path, radius } => {
                let layer = self.resolve_layer(layer)?;
                self.brush(layer, path, *radius)
            }
            EditOperation::Erase { layer, path, radius } => {
                let layer = self.resolve_layer(layer)?;
                self.erase(layer, path, *radius)
            }
            EditOperation::Polyline { layer, vertices, thickness } => {
                let layer = self.resolve_layer(layer)?;
                self.polyline(layer, vertices, *thickness)
            }
            EditOperation::FillPolygon { layer, vertices } => {
                let layer = self.resolve_layer(layer)?;
                self.fill_polygon(layer, vertices, BrushMode::Draw)
            }
            EditOperation::ErasePolygon { layer, vertices } => {
                let layer = self.resolve_layer(layer)?;
                self.fill_polygon(layer, vertices, BrushMode::Erase)
            }
            EditOperation::RemoveIslands { layer, min_size, connectivity } => {
                let layer = self.resolve_layer(layer)?;
                self.morph(
                    layer,
                    &MorphOp::RemoveIslands { min_size: *min_size, connectivity: *connectivity },
                )
            }
            EditOperation::Closing { layer, iterations } => {
                let layer = self.resolve_layer(layer)?;
                self.morph(layer, &MorphOp::Closing { iterations: *iterations })
            }
            EditOperation::Dilate { layer, iterations } => {
                let layer = self.resolve_layer(layer)?;
                self.morph(layer, &MorphOp::Dilate { iterations: *iterations })
            }
            EditOperation::Erode { layer, iterations } => {
                let layer = self.resolve_layer(layer)?;
                self.morph(layer, &MorphOp::Erode { iterations: *iterations })
            }
            EditOperation::ClearMask { layer } => {
                let layer = self.resolve_layer(layer)?;
                self.clear_mask(layer)
            }
            EditOperation::MoveMask { from, to } => {
                let from = self.resolve_layer(from)?;
                let to = self.resolve_layer(to)?;
                self.move_mask(from, to)
            }
            EditOperation::PushRect { x, y, width, height } => {
                self.push_rect(Rect::new(*x, *y, *width, *height));
                Ok(())
            }
            EditOperation::PopRect => {
                self.pop_rect();
                Ok(())
            }
            EditOperation::StampSeeds { x, y, radius } => {
                self.stamp_seeds(Point::new(*x, *y), *radius);
                Ok(())
            }
            EditOperation::ClearSelection => {
                self.clear_selection();
                Ok(())
            }
            EditOperation::Certify { layer, certified } => {
                let layer = self.resolve_layer(layer)?;
                self.set_certified(layer, *certified)
            }
            EditOperation::HardExample { layer, hard_example } => {
                let layer = self.resolve_layer(layer)?;
                self.set_hard_example(layer, *hard_example)
            }
            EditOperation::Undo => self.undo().map(|_| ()),
        }
    }

    fn push_single(&mut self, kind: CommandKind, layer: LayerId, delta: MaskDelta) -> Result<()> {
        if delta.is_empty() {
            debug!(%kind, "operation produced an empty delta, nothing recorded");
            return Ok(());
        }
        self.commands.push(&mut self.store, kind, vec![LayerPatch { layer, delta }])
    }
}
