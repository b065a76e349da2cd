//! Registry of decorations and collectibles attached to columns.

use std::collections::{BTreeMap, HashMap};

use catwalk_core::{Column, EngineHandle, PropKind, RecordError};

use crate::PropSnapshot;

/// Stores at most one prop of each kind per column and resolves props by handle.
#[derive(Debug, Default)]
pub(crate) struct PropRegistry {
    entries: BTreeMap<(Column, PropKind), EngineHandle>,
    by_handle: HashMap<EngineHandle, (Column, PropKind)>,
}

impl PropRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_handle: HashMap::new(),
        }
    }

    pub(crate) fn record(
        &mut self,
        column: Column,
        kind: PropKind,
        handle: EngineHandle,
    ) -> Result<(), RecordError> {
        if self.entries.contains_key(&(column, kind)) || self.by_handle.contains_key(&handle) {
            return Err(RecordError::Occupied);
        }
        let _ = self.entries.insert((column, kind), handle);
        let _ = self.by_handle.insert(handle, (column, kind));
        Ok(())
    }

    pub(crate) fn contains(&self, column: Column, kind: PropKind) -> bool {
        self.entries.contains_key(&(column, kind))
    }

    /// Removes the collectible owned by `handle`, returning its column.
    pub(crate) fn take_collectible(&mut self, handle: EngineHandle) -> Option<Column> {
        let (column, kind) = *self.by_handle.get(&handle)?;
        if kind != PropKind::Collectible {
            return None;
        }
        let _ = self.by_handle.remove(&handle);
        let _ = self.entries.remove(&(column, kind));
        Some(column)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = PropSnapshot> + '_ {
        self.entries
            .iter()
            .map(|(&(column, kind), &handle)| PropSnapshot {
                column,
                kind,
                handle,
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes and returns every prop whose column lies strictly behind `horizon`.
    pub(crate) fn retire_before(&mut self, horizon: Column) -> Vec<PropSnapshot> {
        let kept = self.entries.split_off(&(horizon, PropKind::Decoration));
        let retired = std::mem::replace(&mut self.entries, kept);
        self.collect_retired(retired)
    }

    /// Removes and returns every prop.
    pub(crate) fn drain(&mut self) -> Vec<PropSnapshot> {
        let retired = std::mem::take(&mut self.entries);
        self.collect_retired(retired)
    }

    fn collect_retired(
        &mut self,
        retired: BTreeMap<(Column, PropKind), EngineHandle>,
    ) -> Vec<PropSnapshot> {
        retired
            .into_iter()
            .map(|((column, kind), handle)| {
                let _ = self.by_handle.remove(&handle);
                PropSnapshot {
                    column,
                    kind,
                    handle,
                }
            })
            .collect()
    }
}
