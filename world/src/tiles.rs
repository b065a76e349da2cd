//! Occupancy index for solid tiles placed by the engine.

use std::collections::{btree_map::Entry, BTreeMap};

use catwalk_core::{Column, GridCell, RecordError, Row};

use crate::PlacedTile;

/// Index holding exactly one placed tile per occupied grid cell.
///
/// Entries are ordered by column first so everything behind a cleanup horizon
/// can be split off in one operation.
#[derive(Debug, Default)]
pub(crate) struct TileIndex {
    entries: BTreeMap<GridCell, PlacedTile>,
}

impl TileIndex {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts the tile unless its cell is already occupied.
    pub(crate) fn record(&mut self, tile: PlacedTile) -> Result<(), RecordError> {
        match self.entries.entry(tile.cell()) {
            Entry::Occupied(_) => Err(RecordError::Occupied),
            Entry::Vacant(slot) => {
                let _ = slot.insert(tile);
                Ok(())
            }
        }
    }

    pub(crate) fn get(&self, cell: GridCell) -> Option<&PlacedTile> {
        self.entries.get(&cell)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PlacedTile> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes and returns every tile whose column lies strictly behind `horizon`.
    pub(crate) fn retire_before(&mut self, horizon: Column) -> Vec<PlacedTile> {
        let kept = self.entries.split_off(&GridCell::new(horizon, Row::new(0)));
        let retired = std::mem::replace(&mut self.entries, kept);
        retired.into_values().collect()
    }

    /// Removes and returns every tile.
    pub(crate) fn drain(&mut self) -> Vec<PlacedTile> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}
