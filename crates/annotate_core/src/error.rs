use thiserror::Error;

use crate::layers::LayerId;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("duplicate layer name {name:?} under {parent:?}")]
    DuplicateLayer { name: String, parent: Option<String> },

    #[error("layer configuration declares no layers")]
    EmptyLayerConfig,

    #[error("unknown layer id {0:?}")]
    LayerNotFound(LayerId),

    #[error("unknown layer name {0:?}")]
    LayerNameNotFound(String),

    #[error("coordinate ({x}, {y}) outside {width}x{height} mask")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    #[error("masks have not been allocated for an image")]
    NotAllocated,

    #[error("mask is {found_width}x{found_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("command was recorded against a previous mask allocation")]
    StaleGeneration,

    #[error("nothing to undo")]
    EmptyStack,

    #[error("no selection rectangle available")]
    NoSelectionRect,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
