//! Undo/redo container around the current layout.
//!
//! `past` and `future` hold full snapshots rather than diffs. Layouts are
//! tens of entries, so a clone per step is cheap and keeps undo exact.

use std::collections::VecDeque;

use crate::catalog::ComponentType;
use crate::layout::{Layout, LayoutError, PlacedComponent};
use crate::reorder::{self, DropEvent};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    /// Previously-current layouts, oldest first.
    past: Vec<Layout>,
    current: Layout,
    /// Undone layouts, most recently undone first.
    future: VecDeque<Layout>,
}

impl History {
    /// Start from a baseline with nothing to undo.
    pub fn new(baseline: Layout) -> Self {
        Self {
            past: Vec::new(),
            current: baseline,
            future: VecDeque::new(),
        }
    }

    pub fn current(&self) -> &Layout {
        &self.current
    }

    pub fn past(&self) -> &[Layout] {
        &self.past
    }

    pub fn future(&self) -> &VecDeque<Layout> {
        &self.future
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Record `next` as the current layout. Discards the redo branch.
    pub fn set_layout(&mut self, next: Layout) {
        let previous = std::mem::replace(&mut self.current, next);
        self.past.push(previous);
        self.future.clear();
    }

    /// Record the current layout without `id`. Records a step even when
    /// `id` is absent.
    pub fn remove_component(&mut self, id: &str) {
        let next = self.current.without(id);
        self.set_layout(next);
    }

    /// Returns `false` (and changes nothing) when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let undone = std::mem::replace(&mut self.current, previous);
        self.future.push_front(undone);
        true
    }

    /// Returns `false` (and changes nothing) when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let previous = std::mem::replace(&mut self.current, next);
        self.past.push(previous);
        true
    }

    pub fn insert_at(&mut self, index: usize, component: PlacedComponent) -> Result<(), LayoutError> {
        let next = reorder::insert_at(&self.current, index, component)?;
        self.set_layout(next);
        Ok(())
    }

    /// Materialize a new component of `kind` at the end of the layout and
    /// return its id.
    pub fn append(&mut self, kind: ComponentType) -> Result<String, LayoutError> {
        let component = PlacedComponent::new(kind);
        let id = component.id.clone();
        let next = reorder::append(&self.current, component)?;
        self.set_layout(next);
        Ok(id)
    }

    /// Move one component. Returns `false` without recording anything if
    /// `from` is out of bounds or the order would not change.
    pub fn move_at(&mut self, from: usize, to: usize) -> bool {
        let next = reorder::move_at(&self.current, from, to);
        if next == self.current {
            return false;
        }
        self.set_layout(next);
        true
    }

    /// Apply a drag gesture. Returns whether a step was recorded.
    pub fn apply_drop(&mut self, drop: &DropEvent) -> Result<bool, LayoutError> {
        match reorder::apply_drop(&self.current, drop)? {
            Some(next) if next != self.current => {
                self.set_layout(next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(ids: &[&str]) -> Layout {
        Layout::new(
            ids.iter()
                .map(|id| PlacedComponent::with_id(*id, ComponentType::TwoColumnRow))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_set_layout_pushes_past() {
        let mut history = History::default();
        history.set_layout(layout(&["a"]));
        history.set_layout(layout(&["a", "b"]));
        assert_eq!(history.past().len(), 2);
        assert_eq!(history.current().ids(), vec!["a", "b"]);
        assert!(history.past()[0].is_empty());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let steps = [
            layout(&["a"]),
            layout(&["a", "b"]),
            layout(&["b", "a"]),
            layout(&["b"]),
        ];
        let mut history = History::default();
        let mut seen = vec![history.current().clone()];
        for step in &steps {
            history.set_layout(step.clone());
            seen.push(history.current().clone());
        }

        for n in 1..=steps.len() {
            let mut h = history.clone();
            for _ in 0..n {
                assert!(h.undo());
            }
            assert_eq!(h.current(), &seen[steps.len() - n]);
            for i in 0..n {
                assert!(h.redo());
                assert_eq!(h.current(), &seen[steps.len() - n + i + 1]);
            }
            assert_eq!(h, history);
        }
    }

    #[test]
    fn test_undo_redo_empty_are_noops() {
        let mut history = History::new(layout(&["a"]));
        let before = history.clone();
        assert!(!history.undo());
        assert!(!history.redo());
        assert_eq!(history, before);
    }

    #[test]
    fn test_mutation_discards_redo_branch() {
        let mut history = History::default();
        history.set_layout(layout(&["a"]));
        assert!(history.undo());
        assert!(history.can_redo());
        history.set_layout(layout(&["b"]));
        assert!(!history.can_redo());
        assert!(!history.redo());
        assert_eq!(history.current().ids(), vec!["b"]);
    }

    #[test]
    fn test_future_is_most_recent_first() {
        let mut history = History::default();
        history.set_layout(layout(&["a"]));
        history.set_layout(layout(&["a", "b"]));
        history.undo();
        history.undo();
        assert_eq!(history.future()[0].ids(), vec!["a"]);
        assert_eq!(history.future()[1].ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_component_records_even_when_absent() {
        let mut history = History::new(layout(&["a", "b"]));
        history.remove_component("a");
        assert_eq!(history.current().ids(), vec!["b"]);
        history.remove_component("zzz");
        assert_eq!(history.past().len(), 2);
        assert_eq!(history.current().ids(), vec!["b"]);
        assert!(history.undo());
        assert!(history.undo());
        assert_eq!(history.current().ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_clears_future() {
        let mut history = History::new(layout(&["a", "b"]));
        history.set_layout(layout(&["a"]));
        history.undo();
        history.remove_component("b");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_move_noop_records_nothing() {
        let mut history = History::new(layout(&["a", "b"]));
        assert!(!history.move_at(7, 0));
        assert!(!history.move_at(1, 1));
        assert!(!history.can_undo());
        assert!(history.move_at(0, 1));
        assert_eq!(history.current().ids(), vec!["b", "a"]);
    }

    #[test]
    fn test_append_and_insert() {
        let mut history = History::default();
        let id = history.append(ComponentType::ImageGrid).unwrap();
        assert!(id.starts_with("ImageGrid-"));
        history
            .insert_at(0, PlacedComponent::with_id("top", ComponentType::HeroBlock))
            .unwrap();
        assert_eq!(history.current().ids(), vec!["top", id.as_str()]);
        assert!(history
            .insert_at(1, PlacedComponent::with_id("top", ComponentType::HeroBlock))
            .is_err());
        assert_eq!(history.past().len(), 2);
    }

    #[test]
    fn test_append_goes_last_and_clears_future() {
        let mut history = History::new(layout(&["a", "b"]));
        history.remove_component("b");
        assert!(history.undo());
        assert!(history.can_redo());

        let id = history.append(ComponentType::TwoColumnRow).unwrap();
        assert_eq!(history.current().ids(), vec!["a", "b", id.as_str()]);
        assert_eq!(history.current().get(2).map(|c| c.kind), Some(ComponentType::TwoColumnRow));
        assert!(!history.can_redo());
        assert!(history.undo());
        assert_eq!(history.current(), &layout(&["a", "b"]));
    }
}
