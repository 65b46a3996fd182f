use std::collections::HashMap;

use annotate_common::{Color, LayerConfig, LayerForest};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, Result};

/// Number of external shortcut slots mapped onto the layer traversal order.
pub const SHORTCUT_SLOTS: u8 = 20;

/// Index-based layer identifier. Identifiers are assigned once at tree build
/// time and never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u32);

impl LayerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One labeled layer. The tree shape (parent/children/depth) is fixed at
/// build time; only the color and the certified/hard-example flags mutate.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub parent: Option<LayerId>,
    pub children: Vec<LayerId>,
    pub depth: u32,
    pub color: Color,
    pub certified: bool,
    pub hard_example: bool,
}

/// The hierarchical label taxonomy, stored as an array of records with
/// index-based parent/child links. The array order is the depth-first
/// declaration order from the configuration.
#[derive(Debug, Clone)]
pub struct LayerTree {
    layers: Vec<Layer>,
    by_name: HashMap<String, LayerId>,
}

impl LayerTree {
    /// Build the tree from configuration. Fails when sibling names collide
    /// or when a name is reused anywhere else in the hierarchy (layer names
    /// double as mask file identities, so they must be globally unique).
    pub fn build(config: &LayerConfig) -> Result<Self> {
        if config.layers.is_empty() {
            return Err(CoreError::EmptyLayerConfig);
        }

        let palette = config.palette();
        let mut tree = LayerTree { layers: Vec::new(), by_name: HashMap::new() };
        tree.add_forest(&config.layers, None, 0)?;

        if !config.colors.is_empty() && config.colors.len() < tree.layers.len() {
            warn!(
                layers = tree.layers.len(),
                colors = config.colors.len(),
                "fewer colors than layers, palette wraps around"
            );
        }
        for layer in &mut tree.layers {
            layer.color = palette[layer.id.index() % palette.len()];
        }

        Ok(tree)
    }

    fn add_forest(
        &mut self,
        forest: &LayerForest,
        parent: Option<LayerId>,
        depth: u32,
    ) -> Result<()> {
        for node in forest.iter() {
            if self.by_name.contains_key(&node.name) {
                return Err(CoreError::DuplicateLayer {
                    name: node.name.clone(),
                    parent: parent.map(|id| self.layers[id.index()].name.clone()),
                });
            }

            let id = LayerId(self.layers.len() as u32);
            self.layers.push(Layer {
                id,
                name: node.name.clone(),
                parent,
                children: Vec::new(),
                depth,
                color: Color::new(0, 0, 0),
                certified: false,
                hard_example: false,
            });
            self.by_name.insert(node.name.clone(), id);
            if let Some(parent) = parent {
                self.layers[parent.index()].children.push(id);
            }

            self.add_forest(&node.children, Some(id), depth + 1)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn resolve(&self, id: LayerId) -> Result<&Layer> {
        self.layers.get(id.index()).ok_or(CoreError::LayerNotFound(id))
    }

    pub fn resolve_name(&self, name: &str) -> Result<&Layer> {
        let id = self
            .by_name
            .get(name)
            .ok_or_else(|| CoreError::LayerNameNotFound(name.to_string()))?;
        Ok(&self.layers[id.index()])
    }

    /// Layers in depth-first declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|layer| layer.parent.is_none())
    }

    /// Map an external shortcut slot (1 through 20) to a layer.
    pub fn slot(&self, slot: u8) -> Option<LayerId> {
        if slot == 0 || slot > SHORTCUT_SLOTS {
            return None;
        }
        self.layers.get(slot as usize - 1).map(|layer| layer.id)
    }

    pub fn set_certified(&mut self, id: LayerId, certified: bool) -> Result<()> {
        self.layer_mut(id)?.certified = certified;
        Ok(())
    }

    pub fn set_hard_example(&mut self, id: LayerId, hard_example: bool) -> Result<()> {
        self.layer_mut(id)?.hard_example = hard_example;
        Ok(())
    }

    pub fn set_color(&mut self, id: LayerId, color: Color) -> Result<()> {
        self.layer_mut(id)?.color = color;
        Ok(())
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.layers.get_mut(id.index()).ok_or(CoreError::LayerNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> LayerConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn traversal_matches_declaration_order() {
        let tree = LayerTree::build(&config(
            r#"{"layers": {"dog": {"corgi": {}, "pitbull": {}, "pug": {}}, "cat": {}}}"#,
        ))
        .unwrap();

        let names: Vec<_> = tree.iter().map(|layer| layer.name.as_str()).collect();
        assert_eq!(names, vec!["dog", "corgi", "pitbull", "pug", "cat"]);

        let dog = tree.resolve_name("dog").unwrap();
        assert_eq!(dog.depth, 0);
        assert_eq!(dog.children.len(), 3);
        let corgi = tree.resolve_name("corgi").unwrap();
        assert_eq!(corgi.parent, Some(dog.id));
        assert_eq!(corgi.depth, 1);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = LayerTree::build(&config(
            r#"{"layers": {"dog": {"corgi": {}}, "corgi": {}}}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateLayer { ref name, .. } if name == "corgi"));
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = LayerTree::build(&config(r#"{"layers": {}}"#)).unwrap_err();
        assert!(matches!(err, CoreError::EmptyLayerConfig));
    }

    #[test]
    fn shortcut_slots_follow_traversal_order() {
        let tree = LayerTree::build(&config(
            r#"{"layers": {"a": {"b": {}}, "c": {}}}"#,
        ))
        .unwrap();
        assert_eq!(tree.slot(1), Some(LayerId(0)));
        assert_eq!(tree.slot(2), Some(LayerId(1)));
        assert_eq!(tree.slot(3), Some(LayerId(2)));
        assert_eq!(tree.slot(4), None);
        assert_eq!(tree.slot(0), None);
        assert_eq!(tree.slot(21), None);
    }

    #[test]
    fn flags_and_colors_mutate() {
        let mut tree = LayerTree::build(&config(r#"{"layers": {"a": {}}}"#)).unwrap();
        let id = tree.resolve_name("a").unwrap().id;
        tree.set_certified(id, true).unwrap();
        tree.set_hard_example(id, true).unwrap();
        tree.set_color(id, Color::new(1, 2, 3)).unwrap();
        let layer = tree.resolve(id).unwrap();
        assert!(layer.certified && layer.hard_example);
        assert_eq!(layer.color, Color::new(1, 2, 3));
        assert!(tree.set_certified(LayerId(9), true).is_err());
    }

    #[test]
    fn colors_assigned_in_traversal_order() {
        let tree = LayerTree::build(&config(
            r#"{"layers": {"a": {}, "b": {}}, "colors": [[1, 2, 3], [4, 5, 6]]}"#,
        ))
        .unwrap();
        assert_eq!(tree.resolve_name("a").unwrap().color, Color::new(1, 2, 3));
        assert_eq!(tree.resolve_name("b").unwrap().color, Color::new(4, 5, 6));
    }
}
