//! # Selection Module
//!
//! Per-item `selected`/`filtered` state and the only code allowed to
//! change it.
//!
//! Every item satisfies `filtered => !selected` at all times. Operations
//! come in two families:
//! - **forced** ([`SelectionStateMachine::toggle`],
//!   [`SelectionStateMachine::mark_filtered`],
//!   [`SelectionStateMachine::reset_all`]) may clear `filtered`;
//! - **soft** ([`SelectionStateMachine::select_visible`],
//!   [`SelectionStateMachine::deselect_all`]) never touch `filtered` and
//!   never select a filtered item.

use crate::core::orchestrator::DetectionResult;
use crate::events::{Event, EventSender, SelectionEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inclusion state of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    pub selected: bool,
    pub filtered: bool,
}

impl Default for ItemState {
    /// New items start selected and unfiltered
    fn default() -> Self {
        Self {
            selected: true,
            filtered: false,
        }
    }
}

impl ItemState {
    fn toggled(self) -> Self {
        let selected = !self.selected;
        Self {
            selected,
            filtered: if selected { false } else { self.filtered },
        }
    }

    fn marked_filtered(self) -> Self {
        Self {
            selected: false,
            filtered: true,
        }
    }

    fn reset(self) -> Self {
        Self::default()
    }

    fn softly_selected(self) -> Self {
        if self.filtered {
            self
        } else {
            Self {
                selected: true,
                ..self
            }
        }
    }

    fn softly_deselected(self) -> Self {
        Self {
            selected: false,
            ..self
        }
    }

    pub fn holds_invariant(&self) -> bool {
        !(self.filtered && self.selected)
    }
}

/// Item counts shown next to the grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionStats {
    pub total: usize,
    pub selected: usize,
    pub filtered: usize,
}

/// Ordered map from item identity to [`ItemState`]
#[derive(Default)]
pub struct SelectionStateMachine {
    order: Vec<PathBuf>,
    states: HashMap<PathBuf, ItemState>,
    events: Option<EventSender>,
}

impl SelectionStateMachine {
    /// Track `paths` (already in catalog order), all selected.
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut machine = Self::default();
        machine.replace_items(paths);
        machine
    }

    /// Publish state changes to `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Discard all items and track a new set (a new catalog was loaded).
    pub fn replace_items(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.order.clear();
        self.states.clear();
        for path in paths {
            if self.states.insert(path.clone(), ItemState::default()).is_none() {
                self.order.push(path);
            }
        }
        self.publish_stats();
    }

    pub fn clear(&mut self) {
        self.replace_items(std::iter::empty());
    }

    pub fn state(&self, path: &Path) -> Option<ItemState> {
        self.states.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Items and their states in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, ItemState)> + '_ {
        self.order.iter().map(move |p| (p, self.states[p]))
    }

    /// Selected items in catalog order
    pub fn selected(&self) -> Vec<PathBuf> {
        self.iter()
            .filter(|(_, s)| s.selected)
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Filtered items in catalog order
    pub fn filtered(&self) -> Vec<PathBuf> {
        self.iter()
            .filter(|(_, s)| s.filtered)
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn stats(&self) -> SelectionStats {
        self.states.values().fold(
            SelectionStats {
                total: self.states.len(),
                ..Default::default()
            },
            |mut stats, s| {
                stats.selected += s.selected as usize;
                stats.filtered += s.filtered as usize;
                stats
            },
        )
    }

    fn transition(&mut self, path: &Path, step: fn(ItemState) -> ItemState) -> Option<ItemState> {
        let state = self.states.get_mut(path)?;
        let next = step(*state);
        if next != *state {
            *state = next;
            debug!(path = %path.display(), selected = next.selected, filtered = next.filtered, "Item state changed");
            if let Some(events) = &self.events {
                events.send(Event::Selection(SelectionEvent::StateChanged {
                    path: path.to_path_buf(),
                    state: next,
                }));
            }
        }
        Some(next)
    }

    fn transition_all(&mut self, step: fn(ItemState) -> ItemState) {
        let order = std::mem::take(&mut self.order);
        for path in &order {
            self.transition(path, step);
        }
        self.order = order;
        self.publish_stats();
    }

    fn publish_stats(&self) {
        if let Some(events) = &self.events {
            events.send(Event::Selection(SelectionEvent::StatsChanged(self.stats())));
        }
    }
}

/// Forced operations: explicit user intent or detector verdicts; these
/// may clear `filtered`.
impl SelectionStateMachine {
    /// Flip `selected`; selecting an item also un-filters it.
    pub fn toggle(&mut self, path: &Path) -> Option<ItemState> {
        let state = self.transition(path, ItemState::toggled);
        self.publish_stats();
        state
    }

    /// Filter an item, which also deselects it.
    pub fn mark_filtered(&mut self, path: &Path) -> Option<ItemState> {
        let state = self.transition(path, ItemState::marked_filtered);
        self.publish_stats();
        state
    }

    /// Select every item and clear every filter.
    pub fn reset_all(&mut self) {
        self.transition_all(ItemState::reset);
    }

    /// Filter every excluded identity that belongs to this selection.
    /// Unknown identities are ignored. Returns how many items were
    /// filtered.
    pub fn apply_exclusions(&mut self, result: &DetectionResult) -> usize {
        let applied = result
            .excluded
            .iter()
            .filter(|path| self.transition(path, ItemState::marked_filtered).is_some())
            .count();
        self.publish_stats();
        applied
    }
}

/// Soft operations: bulk convenience actions that respect filters.
impl SelectionStateMachine {
    /// Select every item that is not filtered.
    pub fn select_visible(&mut self) {
        self.transition_all(ItemState::softly_selected);
    }

    /// Deselect every item, leaving filters alone.
    pub fn deselect_all(&mut self) {
        self.transition_all(ItemState::softly_deselected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;

    fn paths(n: usize) -> Vec<PathBuf> {
        (1..=n).map(|i| PathBuf::from(format!("/s/{}.png", i))).collect()
    }

    fn p(i: usize) -> PathBuf {
        PathBuf::from(format!("/s/{}.png", i))
    }

    fn assert_invariant(machine: &SelectionStateMachine) {
        for (path, state) in machine.iter() {
            assert!(state.holds_invariant(), "{} is filtered and selected", path.display());
        }
    }

    #[test]
    fn new_items_start_selected() {
        let machine = SelectionStateMachine::new(paths(3));
        assert_eq!(machine.selected(), paths(3));
        assert_eq!(
            machine.stats(),
            SelectionStats {
                total: 3,
                selected: 3,
                filtered: 0
            }
        );
    }

    #[test]
    fn toggle_flips_selection() {
        let mut machine = SelectionStateMachine::new(paths(1));
        let state = machine.toggle(&p(1)).unwrap();
        assert!(!state.selected);
        let state = machine.toggle(&p(1)).unwrap();
        assert!(state.selected);
    }

    #[test]
    fn toggle_on_filtered_item_selects_and_unfilters() {
        let mut machine = SelectionStateMachine::new(paths(1));
        machine.mark_filtered(&p(1));

        let state = machine.toggle(&p(1)).unwrap();

        assert_eq!(
            state,
            ItemState {
                selected: true,
                filtered: false
            }
        );
    }

    #[test]
    fn mark_filtered_deselects() {
        let mut machine = SelectionStateMachine::new(paths(2));
        let state = machine.mark_filtered(&p(2)).unwrap();
        assert_eq!(
            state,
            ItemState {
                selected: false,
                filtered: true
            }
        );
        assert_eq!(machine.selected(), vec![p(1)]);
        assert_eq!(machine.filtered(), vec![p(2)]);
    }

    #[test]
    fn unknown_items_are_ignored() {
        let mut machine = SelectionStateMachine::new(paths(1));
        assert!(machine.toggle(Path::new("/elsewhere.png")).is_none());
        assert!(machine.mark_filtered(Path::new("/elsewhere.png")).is_none());
    }

    #[test]
    fn reset_all_selects_and_unfilters_everything() {
        let mut machine = SelectionStateMachine::new(paths(3));
        machine.mark_filtered(&p(1));
        machine.toggle(&p(2));

        machine.reset_all();

        for (_, state) in machine.iter() {
            assert_eq!(state, ItemState::default());
        }
    }

    #[test]
    fn select_visible_skips_filtered_items() {
        let mut machine = SelectionStateMachine::new(paths(3));
        machine.mark_filtered(&p(1));
        machine.deselect_all();

        machine.select_visible();

        assert_eq!(
            machine.state(&p(1)),
            Some(ItemState {
                selected: false,
                filtered: true
            })
        );
        assert_eq!(machine.selected(), vec![p(2), p(3)]);
    }

    #[test]
    fn deselect_all_keeps_filters() {
        let mut machine = SelectionStateMachine::new(paths(3));
        machine.mark_filtered(&p(3));

        machine.deselect_all();

        assert!(machine.selected().is_empty());
        assert_eq!(machine.filtered(), vec![p(3)]);
    }

    #[test]
    fn soft_operations_never_change_filtered() {
        let mut machine = SelectionStateMachine::new(paths(4));
        machine.mark_filtered(&p(2));
        machine.mark_filtered(&p(4));
        let before = machine.filtered();

        machine.select_visible();
        assert_eq!(machine.filtered(), before);
        machine.deselect_all();
        assert_eq!(machine.filtered(), before);
        machine.select_visible();
        assert_eq!(machine.filtered(), before);
    }

    #[test]
    fn invariant_holds_across_mixed_operations() {
        let mut machine = SelectionStateMachine::new(paths(5));
        // Deterministic pseudo-random walk over every operation
        let mut seed: u32 = 7;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let item = p((seed >> 16) as usize % 5 + 1);
            match (seed >> 8) % 5 {
                0 => {
                    machine.toggle(&item);
                }
                1 => {
                    machine.mark_filtered(&item);
                }
                2 => machine.reset_all(),
                3 => machine.select_visible(),
                _ => machine.deselect_all(),
            }
            assert_invariant(&machine);
        }
    }

    #[test]
    fn apply_exclusions_filters_known_items_only() {
        let mut machine = SelectionStateMachine::new(paths(3));
        let result = DetectionResult::from_excluded(vec![p(1), PathBuf::from("/other/9.png")]);

        let applied = machine.apply_exclusions(&result);

        assert_eq!(applied, 1);
        assert_eq!(machine.filtered(), vec![p(1)]);
    }

    #[test]
    fn changes_are_published_as_events() {
        let (sender, receiver) = EventChannel::new();
        let mut machine = SelectionStateMachine::new(paths(2)).with_events(sender);

        machine.mark_filtered(&p(1));
        // Already filtered: no StateChanged, only stats
        machine.mark_filtered(&p(1));

        let events: Vec<_> = std::iter::from_fn(|| receiver.try_recv()).collect();
        let changes = events
            .iter()
            .filter(|e| matches!(e, Event::Selection(SelectionEvent::StateChanged { .. })))
            .count();
        assert_eq!(changes, 1);
        assert!(matches!(
            events.last(),
            Some(Event::Selection(SelectionEvent::StatsChanged(SelectionStats {
                total: 2,
                selected: 1,
                filtered: 1
            })))
        ));
    }
}
