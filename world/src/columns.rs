//! Column state store and the derived surface-by-column map.

use std::collections::BTreeMap;

use catwalk_core::{Column, ColumnState, Row};

/// Ledger of committed column decisions.
///
/// The surface map mirrors the store's keys at all times; both are written by
/// [`ColumnStore::commit`] and pruned together.
#[derive(Debug, Default)]
pub(crate) struct ColumnStore {
    states: BTreeMap<Column, ColumnState>,
    surfaces: BTreeMap<Column, Option<Row>>,
}

impl ColumnStore {
    pub(crate) fn new() -> Self {
        Self {
            states: BTreeMap::new(),
            surfaces: BTreeMap::new(),
        }
    }

    pub(crate) fn commit(&mut self, column: Column, state: ColumnState) {
        let _ = self.states.insert(column, state);
        let _ = self.surfaces.insert(column, state.surface());
    }

    pub(crate) fn state(&self, column: Column) -> Option<ColumnState> {
        self.states.get(&column).copied()
    }

    pub(crate) fn surface(&self, column: Column) -> Option<Option<Row>> {
        self.surfaces.get(&column).copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Column, ColumnState)> + '_ {
        self.states.iter().map(|(column, state)| (*column, *state))
    }

    pub(crate) fn first(&self) -> Option<Column> {
        self.states.keys().next().copied()
    }

    pub(crate) fn last(&self) -> Option<Column> {
        self.states.keys().next_back().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    /// Drops every entry strictly behind `horizon`, returning how many were removed.
    pub(crate) fn prune_before(&mut self, horizon: Column) -> usize {
        let kept_states = self.states.split_off(&horizon);
        let kept_surfaces = self.surfaces.split_off(&horizon);
        let removed = std::mem::replace(&mut self.states, kept_states).len();
        self.surfaces = kept_surfaces;
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.states.clear();
        self.surfaces.clear();
    }
}
