//! Placed components and the ordered layout that holds them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::ComponentType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Duplicate component id: {0}")]
    DuplicateId(String),
    #[error("Unknown component type: {0}")]
    UnknownType(String),
}

/// One component instance in a layout.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct PlacedComponent {
    /// Unique within a layout, stable across moves.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    /// Display label only.
    pub name: String,
}

impl PlacedComponent {
    /// Materialize a new component from the catalog with a fresh id.
    pub fn new(kind: ComponentType) -> Self {
        Self {
            id: format!("{}-{}", kind.tag(), Uuid::new_v4()),
            kind,
            name: kind.display_name().to_string(),
        }
    }

    /// Create with an explicit id (fixtures and imports).
    pub fn with_id(id: impl Into<String>, kind: ComponentType) -> Self {
        Self {
            id: id.into(),
            kind,
            name: kind.display_name().to_string(),
        }
    }
}

/// Ordered sequence of components, rendered top to bottom.
///
/// Component ids are unique at all times; every constructor that accepts
/// an arbitrary list checks this, including deserialization.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<PlacedComponent>", into = "Vec<PlacedComponent>")]
pub struct Layout {
    components: Vec<PlacedComponent>,
}

impl Layout {
    pub fn new(components: Vec<PlacedComponent>) -> Result<Self, LayoutError> {
        let mut seen = HashSet::with_capacity(components.len());
        for component in &components {
            if !seen.insert(component.id.as_str()) {
                return Err(LayoutError::DuplicateId(component.id.clone()));
            }
        }
        Ok(Self { components })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a list already known to have unique ids (permutations and
    /// filters of an existing layout).
    pub(crate) fn from_unique(components: Vec<PlacedComponent>) -> Self {
        debug_assert!(Layout::new(components.clone()).is_ok());
        Self { components }
    }

    /// Starter layout with one component of each kind.
    pub fn sample() -> Self {
        Self::from_unique(vec![
            PlacedComponent::with_id("hero-1", ComponentType::HeroBlock),
            PlacedComponent::with_id("two-col-1", ComponentType::TwoColumnRow),
            PlacedComponent::with_id("grid-1", ComponentType::ImageGrid),
        ])
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[PlacedComponent] {
        &self.components
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlacedComponent> {
        self.components.iter()
    }

    pub fn get(&self, index: usize) -> Option<&PlacedComponent> {
        self.components.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.id.as_str()).collect()
    }

    /// Copy of this layout with the component `id` filtered out.
    pub fn without(&self, id: &str) -> Layout {
        Layout::from_unique(
            self.components
                .iter()
                .filter(|c| c.id != id)
                .cloned()
                .collect(),
        )
    }

    pub fn into_vec(self) -> Vec<PlacedComponent> {
        self.components
    }
}

impl TryFrom<Vec<PlacedComponent>> for Layout {
    type Error = LayoutError;

    fn try_from(components: Vec<PlacedComponent>) -> Result<Self, Self::Error> {
        Layout::new(components)
    }
}

impl From<Layout> for Vec<PlacedComponent> {
    fn from(layout: Layout) -> Self {
        layout.components
    }
}

impl<'a> IntoIterator for &'a Layout {
    type Item = &'a PlacedComponent;
    type IntoIter = std::slice::Iter<'a, PlacedComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_component_identity() {
        let a = PlacedComponent::new(ComponentType::HeroBlock);
        let b = PlacedComponent::new(ComponentType::HeroBlock);
        assert!(a.id.starts_with("HeroBlock-"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, "Hero Block");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Layout::new(vec![
            PlacedComponent::with_id("a", ComponentType::HeroBlock),
            PlacedComponent::with_id("a", ComponentType::ImageGrid),
        ]);
        assert_eq!(result, Err(LayoutError::DuplicateId("a".to_string())));
    }

    #[test]
    fn test_deserialize_validates_ids() {
        let json = r#"[{"id":"x","type":"HeroBlock","name":"Hero Block"},
                       {"id":"x","type":"ImageGrid","name":"Grid"}]"#;
        assert!(serde_json::from_str::<Layout>(json).is_err());

        let json = r#"[{"id":"x","type":"HeroBlock","name":"Hero Block"}]"#;
        let layout: Layout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.ids(), vec!["x"]);
    }

    #[test]
    fn test_serializes_as_bare_array() {
        let layout = Layout::sample();
        let value = serde_json::to_value(&layout).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["type"], "HeroBlock");
        assert_eq!(value[2]["name"], "2x2 Image Grid");
    }

    #[test]
    fn test_without() {
        let layout = Layout::sample();
        let trimmed = layout.without("two-col-1");
        assert_eq!(trimmed.ids(), vec!["hero-1", "grid-1"]);
        assert_eq!(layout.without("missing"), layout);
    }
}
