//! Component catalog: the closed set of placeable component kinds.
//!
//! Each kind has a wire tag (the `type` field of a persisted component),
//! a display name shown in the editor, and a palette key used by drag
//! sources (`palette-hero`, `palette-twoColumn`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::layout::LayoutError;

/// Kind tag of a placed component. Immutable once a component exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    HeroBlock,
    TwoColumnRow,
    ImageGrid,
}

impl ComponentType {
    /// Every kind, in palette order.
    pub const ALL: [ComponentType; 3] = [
        ComponentType::HeroBlock,
        ComponentType::TwoColumnRow,
        ComponentType::ImageGrid,
    ];

    /// Wire tag, identical to the serialized form.
    pub fn tag(self) -> &'static str {
        match self {
            ComponentType::HeroBlock => "HeroBlock",
            ComponentType::TwoColumnRow => "TwoColumnRow",
            ComponentType::ImageGrid => "ImageGrid",
        }
    }

    /// Human-readable name used when materializing a new component.
    pub fn display_name(self) -> &'static str {
        match self {
            ComponentType::HeroBlock => "Hero Block",
            ComponentType::TwoColumnRow => "Two Column Row",
            ComponentType::ImageGrid => "2x2 Image Grid",
        }
    }

    pub fn palette_key(self) -> &'static str {
        match self {
            ComponentType::HeroBlock => "hero",
            ComponentType::TwoColumnRow => "twoColumn",
            ComponentType::ImageGrid => "imageGrid",
        }
    }

    pub fn from_palette_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.palette_key() == key)
    }

    /// Whether `tag` names a kind in the catalog.
    pub fn is_known_tag(tag: &str) -> bool {
        Self::ALL.iter().any(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ComponentType {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| LayoutError::UnknownType(s.to_string()))
    }
}
