//! # Annotate Common - Shared Types
//!
//! Foundational value types shared across the annotation engine: pixel
//! geometry (`Point`, `Rect`), layer colors, the ordered layer configuration
//! consumed by the layer tree, and certification records.
//!
//! ## Example
//!
//! ```rust
//! use annotate_common::{LayerConfig, Rect};
//!
//! let config: LayerConfig = serde_json::from_str(
//!     r#"{"layers": {"dog": {"corgi": {}, "pug": {}}, "cat": {}}}"#,
//! ).unwrap();
//! assert_eq!(config.layers.flatten().len(), 4);
//!
//! let rect = Rect::from_corners(10, 2, 4, 8);
//! assert_eq!((rect.x, rect.y, rect.width, rect.height), (4, 2, 6, 6));
//! ```

pub mod certification;
pub mod config;

pub use certification::{CertificationRecord, CERTIFICATION_SOURCE, CERTIFICATION_VERSION};
pub use config::{LayerConfig, LayerForest, LayerNode};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for shared-type operations
pub type Result<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("a color needs 3 (rgb) or 4 (rgb + texture) components, got {got}")]
    InvalidColor { got: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle. `width`/`height` may be zero; such a
/// rectangle is degenerate and covers no cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from two opposite corners in any order.
    pub fn from_corners(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Rectangle spanning a full `width` x `height` buffer.
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Clamp the rectangle to a `width` x `height` buffer. The result may be
    /// degenerate when the rectangle lies entirely outside the buffer.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.right().min(width) - x,
            height: self.bottom().min(height) - y,
        }
    }

    /// Grow the rectangle by `margin` on every side, clamped to a
    /// `width` x `height` buffer.
    pub fn expand(&self, margin: u32, width: u32, height: u32) -> Self {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        Self {
            x,
            y,
            width: (self.right() + margin).min(width) - x,
            height: (self.bottom() + margin).min(height) - y,
        }
    }
}

/// A layer display color: rgb plus an optional texture index used by
/// presentation code to tell layers sharing an rgb value apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub rgb: [u8; 3],
    pub texture: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { rgb: [r, g, b], texture: 0 }
    }

    pub fn with_texture(r: u8, g: u8, b: u8, texture: u8) -> Self {
        Self { rgb: [r, g, b], texture }
    }

    /// The built-in palette used when the configuration carries no colors:
    /// five base colors repeated across three texture indices.
    pub fn default_palette() -> Vec<Color> {
        const BASE: [[u8; 3]; 5] = [
            [26, 219, 210],
            [9, 33, 217],
            [131, 48, 255],
            [217, 13, 217],
            [242, 10, 10],
        ];
        (0..3u8)
            .flat_map(|texture| {
                BASE.iter()
                    .map(move |&[r, g, b]| Color::with_texture(r, g, b, texture))
            })
            .collect()
    }
}

impl TryFrom<Vec<u8>> for Color {
    type Error = CommonError;

    fn try_from(components: Vec<u8>) -> Result<Self> {
        match components.as_slice() {
            [r, g, b] => Ok(Color::new(*r, *g, *b)),
            [r, g, b, texture] => Ok(Color::with_texture(*r, *g, *b, *texture)),
            other => Err(CommonError::InvalidColor { got: other.len() }),
        }
    }
}

impl From<Color> for Vec<u8> {
    fn from(color: Color) -> Vec<u8> {
        vec![color.rgb[0], color.rgb[1], color.rgb[2], color.texture]
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Vec::<u8>::from(*self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let components = Vec::<u8>::deserialize(deserializer)?;
        Color::try_from(components).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_corners_normalizes_order() {
        let rect = Rect::from_corners(9, 7, 3, 2);
        assert_eq!(rect, Rect::new(3, 2, 6, 5));
    }

    #[test]
    fn rect_clamp_outside_is_degenerate() {
        let rect = Rect::new(100, 100, 10, 10).clamp_to(50, 50);
        assert!(rect.is_degenerate());
    }

    #[test]
    fn rect_expand_respects_bounds() {
        let rect = Rect::new(10, 10, 5, 5).expand(50, 64, 32);
        assert_eq!(rect, Rect::new(0, 0, 64, 32));
    }

    #[test]
    fn color_roundtrip_and_short_form() {
        let color: Color = serde_json::from_str("[26, 219, 210, 2]").unwrap();
        assert_eq!(color, Color::with_texture(26, 219, 210, 2));
        let short: Color = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(short, Color::new(1, 2, 3));
        assert!(serde_json::from_str::<Color>("[1, 2]").is_err());
    }

    #[test]
    fn default_palette_has_distinct_entries() {
        let palette = Color::default_palette();
        assert_eq!(palette.len(), 15);
        for pair in palette.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
