//! Insert and move operations over a layout.
//!
//! All functions are pure: they take the current layout and return the
//! next one, leaving recording to [`History`](crate::history::History).
//! Move semantics follow drag-and-drop list libraries: the target index is
//! interpreted against the list with the moved element already removed.

use crate::catalog::ComponentType;
use crate::layout::{Layout, LayoutError, PlacedComponent};

/// Where a drag started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSource {
    /// A fresh component dragged out of the palette.
    Palette(ComponentType),
    /// An existing component at this layout index.
    Layout(usize),
}

/// A completed drag gesture. `destination` is `None` when the item was
/// dropped outside the layout area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropEvent {
    pub source: DropSource,
    pub destination: Option<usize>,
}

impl DropEvent {
    pub fn from_palette(kind: ComponentType, destination: usize) -> Self {
        Self {
            source: DropSource::Palette(kind),
            destination: Some(destination),
        }
    }

    pub fn within_layout(from: usize, to: usize) -> Self {
        Self {
            source: DropSource::Layout(from),
            destination: Some(to),
        }
    }

    /// Parse a palette draggable id such as `palette-hero`.
    pub fn palette_kind(draggable_id: &str) -> Option<ComponentType> {
        draggable_id
            .strip_prefix("palette-")
            .and_then(ComponentType::from_palette_key)
    }
}

/// Splice `component` in at `index`, clamped to `[0, len]`.
pub fn insert_at(
    current: &Layout,
    index: usize,
    component: PlacedComponent,
) -> Result<Layout, LayoutError> {
    if current.contains(&component.id) {
        return Err(LayoutError::DuplicateId(component.id));
    }
    let mut next = current.components().to_vec();
    let index = index.min(next.len());
    next.insert(index, component);
    Ok(Layout::from_unique(next))
}

/// Insert at the end of the layout ("click to add").
pub fn append(current: &Layout, component: PlacedComponent) -> Result<Layout, LayoutError> {
    insert_at(current, current.len(), component)
}

/// Remove the element at `from` and reinsert it at `to` in the reduced list.
///
/// An out-of-bounds `from` returns the layout unchanged; `to` is clamped.
pub fn move_at(current: &Layout, from: usize, to: usize) -> Layout {
    if from >= current.len() {
        return current.clone();
    }
    let mut next = current.components().to_vec();
    let moved = next.remove(from);
    let to = to.min(next.len());
    next.insert(to, moved);
    Layout::from_unique(next)
}

/// Resolve a drop gesture into the next layout, or `None` if it changes
/// nothing (dropped outside the layout, or moved from an invalid index).
pub fn apply_drop(current: &Layout, drop: &DropEvent) -> Result<Option<Layout>, LayoutError> {
    let Some(destination) = drop.destination else {
        return Ok(None);
    };
    match drop.source {
        DropSource::Palette(kind) => {
            insert_at(current, destination, PlacedComponent::new(kind)).map(Some)
        }
        DropSource::Layout(from) if from < current.len() => {
            Ok(Some(move_at(current, from, destination)))
        }
        DropSource::Layout(_) => Ok(None),
    }
}
