#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Catwalk.
//!
//! The world owns every piece of bookkeeping the generator relies on: the
//! column state store with its surface map, the occupancy index of placed
//! tiles, the prop registry and the collectible score. It never talks to the
//! engine; instead it reports retired handles through [`Event`] values so the
//! caller can release them in the same tick the index forgets them.

mod columns;
mod props;
mod tiles;

use catwalk_core::{
    Column, Command, EngineHandle, Event, GridCell, GridMetrics, PropKind, SpriteKey,
};

use self::{columns::ColumnStore, props::PropRegistry, tiles::TileIndex};

/// Solid tile the engine created at a grid cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedTile {
    cell: GridCell,
    variant: SpriteKey,
    handle: EngineHandle,
}

impl PlacedTile {
    /// Creates a placed tile record.
    #[must_use]
    pub fn new(cell: GridCell, variant: SpriteKey, handle: EngineHandle) -> Self {
        Self {
            cell,
            variant,
            handle,
        }
    }

    /// Cell occupied by the tile.
    #[must_use]
    pub const fn cell(&self) -> GridCell {
        self.cell
    }

    /// Variant the tile was created with.
    #[must_use]
    pub fn variant(&self) -> &SpriteKey {
        &self.variant
    }

    /// Engine handle owning the tile.
    #[must_use]
    pub const fn handle(&self) -> EngineHandle {
        self.handle
    }
}

/// Immutable representation of a recorded prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropSnapshot {
    /// Column the prop belongs to.
    pub column: Column,
    /// Kind of prop.
    pub kind: PropKind,
    /// Engine handle owning the prop.
    pub handle: EngineHandle,
}

/// Represents the authoritative Catwalk world state.
#[derive(Debug)]
pub struct World {
    metrics: GridMetrics,
    columns: ColumnStore,
    tiles: TileIndex,
    props: PropRegistry,
    score: u32,
}

impl World {
    /// Creates an empty world using the default grid metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metrics(GridMetrics::default())
    }

    /// Creates an empty world using the provided grid metrics.
    #[must_use]
    pub fn with_metrics(metrics: GridMetrics) -> Self {
        Self {
            metrics,
            columns: ColumnStore::new(),
            tiles: TileIndex::new(),
            props: PropRegistry::new(),
            score: 0,
        }
    }

    fn retire_everything(&mut self, out_events: &mut Vec<Event>) {
        for tile in self.tiles.drain() {
            out_events.push(Event::TileRetired {
                cell: tile.cell,
                handle: tile.handle,
            });
        }
        for prop in self.props.drain() {
            out_events.push(Event::PropRetired {
                column: prop.column,
                kind: prop.kind,
                handle: prop.handle,
            });
        }
        self.columns.clear();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { metrics } => {
            world.retire_everything(out_events);
            world.metrics = metrics;
            world.score = 0;
            out_events.push(Event::GridConfigured {
                max_row: metrics.max_row(),
            });
        }
        Command::CommitColumns { plan } => {
            if plan.is_empty() {
                return;
            }
            for (column, state) in plan.iter() {
                world.columns.commit(column, *state);
            }
            out_events.push(Event::ColumnsCommitted {
                start: plan.start(),
                end: plan.covered_end(),
            });
        }
        Command::RecordTile {
            cell,
            variant,
            handle,
        } => match world.tiles.record(PlacedTile::new(cell, variant, handle)) {
            Ok(()) => out_events.push(Event::TileRecorded { cell, handle }),
            Err(reason) => out_events.push(Event::TileRejected {
                cell,
                handle,
                reason,
            }),
        },
        Command::RecordProp {
            column,
            kind,
            handle,
        } => match world.props.record(column, kind, handle) {
            Ok(()) => out_events.push(Event::PropRecorded {
                column,
                kind,
                handle,
            }),
            Err(reason) => out_events.push(Event::PropRejected {
                column,
                kind,
                handle,
                reason,
            }),
        },
        Command::CollectCollectible { handle } => {
            if world.props.take_collectible(handle).is_some() {
                world.score = world.score.saturating_add(1);
                out_events.push(Event::CollectibleCollected {
                    handle,
                    score: world.score,
                });
            }
        }
        Command::PruneBehind { horizon } => {
            for tile in world.tiles.retire_before(horizon) {
                out_events.push(Event::TileRetired {
                    cell: tile.cell,
                    handle: tile.handle,
                });
            }
            for prop in world.props.retire_before(horizon) {
                out_events.push(Event::PropRetired {
                    column: prop.column,
                    kind: prop.kind,
                    handle: prop.handle,
                });
            }
            let removed = world.columns.prune_before(horizon);
            if removed > 0 {
                out_events.push(Event::ColumnsPruned { horizon, removed });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use catwalk_core::{Column, ColumnState, GridCell, GridMetrics, PropKind, Row};

    use super::{PlacedTile, PropSnapshot, World};

    /// Grid metrics the world was configured with.
    #[must_use]
    pub fn metrics(world: &World) -> GridMetrics {
        world.metrics
    }

    /// Committed state of the column, if it is live.
    #[must_use]
    pub fn column_state(world: &World, column: Column) -> Option<ColumnState> {
        world.columns.state(column)
    }

    /// Surface recorded for the column: `None` when unknown, `Some(None)` for a gap.
    #[must_use]
    pub fn surface_row(world: &World, column: Column) -> Option<Option<Row>> {
        world.columns.surface(column)
    }

    /// Surface of the column, falling back to the default ground row for gaps
    /// and columns that were never committed.
    #[must_use]
    pub fn surface_or_default(world: &World, column: Column) -> Row {
        world.metrics.clamp_row(world.columns.surface(column).flatten())
    }

    /// Iterates over live column states in ascending column order.
    pub fn column_states(world: &World) -> impl Iterator<Item = (Column, ColumnState)> + '_ {
        world.columns.iter()
    }

    /// Half-open range of live columns, or `None` when the store is empty.
    #[must_use]
    pub fn column_range(world: &World) -> Option<(Column, Column)> {
        let first = world.columns.first()?;
        let last = world.columns.last()?;
        Some((first, last.offset(1)))
    }

    /// Number of live column entries.
    #[must_use]
    pub fn column_count(world: &World) -> usize {
        world.columns.len()
    }

    /// Reports whether no solid tile occupies the cell.
    #[must_use]
    pub fn is_cell_free(world: &World, cell: GridCell) -> bool {
        world.tiles.get(cell).is_none()
    }

    /// Tile occupying the cell, if any.
    #[must_use]
    pub fn tile_at(world: &World, cell: GridCell) -> Option<&PlacedTile> {
        world.tiles.get(cell)
    }

    /// Iterates over placed tiles ordered by column, then row.
    pub fn tiles(world: &World) -> impl Iterator<Item = &PlacedTile> {
        world.tiles.iter()
    }

    /// Number of tiles in the occupancy index.
    #[must_use]
    pub fn tile_count(world: &World) -> usize {
        world.tiles.len()
    }

    /// Reports whether the column already carries a prop of the given kind.
    #[must_use]
    pub fn has_prop(world: &World, column: Column, kind: PropKind) -> bool {
        world.props.contains(column, kind)
    }

    /// Iterates over recorded props ordered by column.
    pub fn props(world: &World) -> impl Iterator<Item = PropSnapshot> + '_ {
        world.props.iter()
    }

    /// Number of recorded props.
    #[must_use]
    pub fn prop_count(world: &World) -> usize {
        world.props.len()
    }

    /// Collectibles picked up since the grid was configured.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catwalk_core::{ChunkPlan, ColumnState, RecordError, Row};

    fn cell(column: i32, row: u32) -> GridCell {
        GridCell::new(Column::new(column), Row::new(row))
    }

    fn record_tile(world: &mut World, cell: GridCell, handle: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::RecordTile {
                cell,
                variant: SpriteKey::new("tile-2"),
                handle: EngineHandle::new(handle),
            },
            &mut events,
        );
        events
    }

    #[test]
    fn commit_columns_writes_gaps_too() {
        let mut world = World::new();
        let mut events = Vec::new();
        let plan = ChunkPlan::with_states(
            Column::new(0),
            Column::new(3),
            [
                (Column::new(0), ColumnState::ground(Row::new(8))),
                (Column::new(1), ColumnState::gap()),
                (Column::new(2), ColumnState::ground(Row::new(8))),
            ],
        );

        apply(&mut world, Command::CommitColumns { plan }, &mut events);

        assert_eq!(
            events,
            vec![Event::ColumnsCommitted {
                start: Column::new(0),
                end: Column::new(3),
            }]
        );
        assert_eq!(query::surface_row(&world, Column::new(1)), Some(None));
        assert_eq!(query::column_count(&world), 3);
        assert_eq!(
            query::column_range(&world),
            Some((Column::new(0), Column::new(3)))
        );
    }

    #[test]
    fn surface_or_default_falls_back_to_ground_row() {
        let world = World::with_metrics(GridMetrics::new(100.0, 600.0).expect("metrics"));
        assert_eq!(query::surface_or_default(&world, Column::new(-1)), Row::new(5));
    }

    #[test]
    fn duplicate_tile_is_rejected_with_handle() {
        let mut world = World::new();
        let _ = record_tile(&mut world, cell(4, 6), 1);
        let events = record_tile(&mut world, cell(4, 6), 2);

        assert_eq!(
            events,
            vec![Event::TileRejected {
                cell: cell(4, 6),
                handle: EngineHandle::new(2),
                reason: RecordError::Occupied,
            }]
        );
        assert_eq!(query::tile_count(&world), 1);
        assert!(!query::is_cell_free(&world, cell(4, 6)));
    }

    #[test]
    fn collecting_increments_score_once() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RecordProp {
                column: Column::new(9),
                kind: PropKind::Collectible,
                handle: EngineHandle::new(77),
            },
            &mut events,
        );
        events.clear();

        for _ in 0..2 {
            apply(
                &mut world,
                Command::CollectCollectible {
                    handle: EngineHandle::new(77),
                },
                &mut events,
            );
        }

        assert_eq!(
            events,
            vec![Event::CollectibleCollected {
                handle: EngineHandle::new(77),
                score: 1,
            }]
        );
        assert_eq!(query::score(&world), 1);
        assert_eq!(query::prop_count(&world), 0);
    }

    #[test]
    fn prune_retires_tiles_props_and_columns_together() {
        let mut world = World::new();
        let mut events = Vec::new();
        let plan = ChunkPlan::with_states(
            Column::new(0),
            Column::new(6),
            (0..6).map(|column| (Column::new(column), ColumnState::ground(Row::new(8)))),
        );
        apply(&mut world, Command::CommitColumns { plan }, &mut events);
        for column in 0..6 {
            let _ = record_tile(&mut world, cell(column, 8), column as u64);
        }
        apply(
            &mut world,
            Command::RecordProp {
                column: Column::new(1),
                kind: PropKind::Decoration,
                handle: EngineHandle::new(100),
            },
            &mut events,
        );
        events.clear();

        apply(
            &mut world,
            Command::PruneBehind {
                horizon: Column::new(3),
            },
            &mut events,
        );

        let retired_tiles = events
            .iter()
            .filter(|event| matches!(event, Event::TileRetired { .. }))
            .count();
        assert_eq!(retired_tiles, 3);
        assert!(events.contains(&Event::PropRetired {
            column: Column::new(1),
            kind: PropKind::Decoration,
            handle: EngineHandle::new(100),
        }));
        assert!(events.contains(&Event::ColumnsPruned {
            horizon: Column::new(3),
            removed: 3,
        }));
        assert!(query::tiles(&world).all(|tile| tile.cell().column() >= Column::new(3)));
        assert_eq!(query::column_state(&world, Column::new(2)), None);
        assert!(query::is_cell_free(&world, cell(0, 8)));
    }

    #[test]
    fn configure_grid_retires_everything() {
        let mut world = World::new();
        let _ = record_tile(&mut world, cell(0, 3), 5);
        let mut events = Vec::new();
        let metrics = GridMetrics::new(74.9, 600.0).expect("metrics");

        apply(&mut world, Command::ConfigureGrid { metrics }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::TileRetired {
                    cell: cell(0, 3),
                    handle: EngineHandle::new(5),
                },
                Event::GridConfigured {
                    max_row: Row::new(7),
                },
            ]
        );
        assert_eq!(query::tile_count(&world), 0);
        assert_eq!(query::metrics(&world), metrics);
    }
}
