use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Color;

/// One node of the configured layer hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerNode {
    pub name: String,
    pub children: LayerForest,
}

impl LayerNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self { name: name.into(), children: LayerForest::default() }
    }

    pub fn with_children(name: impl Into<String>, children: Vec<LayerNode>) -> Self {
        Self { name: name.into(), children: LayerForest(children) }
    }
}

/// An ordered list of sibling layer nodes.
///
/// Serialized as a nested name-to-children mapping
/// (`{"dog": {"corgi": {}}, "cat": {}}`); the flat list form
/// (`["dog", "cat"]`) from older configurations is also accepted.
/// Declaration order is preserved, it drives traversal order, color
/// assignment, and shortcut slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerForest(pub Vec<LayerNode>);

impl LayerForest {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerNode> {
        self.0.iter()
    }

    /// All layer names in depth-first declaration order.
    pub fn flatten(&self) -> Vec<&str> {
        fn walk<'a>(forest: &'a LayerForest, out: &mut Vec<&'a str>) {
            for node in forest.iter() {
                out.push(&node.name);
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }
}

impl Serialize for LayerForest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for node in &self.0 {
            map.serialize_entry(&node.name, &node.children)?;
        }
        map.end()
    }
}

struct ForestVisitor;

impl<'de> Visitor<'de> for ForestVisitor {
    type Value = LayerForest;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a layer-name map or a list of layer names")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut nodes = Vec::new();
        while let Some((name, children)) = access.next_entry::<String, LayerForest>()? {
            nodes.push(LayerNode { name, children });
        }
        Ok(LayerForest(nodes))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut nodes = Vec::new();
        while let Some(name) = access.next_element::<String>()? {
            nodes.push(LayerNode::leaf(name));
        }
        Ok(LayerForest(nodes))
    }
}

impl<'de> Deserialize<'de> for LayerForest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ForestVisitor)
    }
}

/// Layer configuration consumed once at session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Nested layer hierarchy in declaration order.
    pub layers: LayerForest,

    /// One color per layer in traversal order. Empty means the built-in
    /// palette.
    #[serde(default)]
    pub colors: Vec<Color>,

    /// Optional per-layer help link URLs, parallel to traversal order.
    #[serde(default)]
    pub help_links: Vec<String>,

    /// Opaque prefix handed through to the storage collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_prefix: Option<String>,
}

impl LayerConfig {
    /// The palette to assign from: configured colors, or the default
    /// palette when none were configured.
    pub fn palette(&self) -> Vec<Color> {
        if self.colors.is_empty() {
            Color::default_palette()
        } else {
            self.colors.clone()
        }
    }
}
