#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Catwalk level generator.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the pure generation systems, and the engine adapters. Systems read the
//! world through immutable queries and respond with [`Command`] values; the
//! world executes those commands via its `apply` entry point and broadcasts
//! [`Event`] values describing what changed, including engine handles that
//! have become eligible for destruction.

use std::{collections::BTreeMap, fmt};

use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Default tile edge length: 128-pixel source tiles scaled to a 600-unit-tall world.
pub const DEFAULT_TILE_SIZE: f32 = 128.0 * 600.0 / 1143.0;

/// Default height of the playable world in world units.
pub const DEFAULT_WORLD_HEIGHT: f32 = 600.0;

/// Index of a tile-width vertical slice of the world, increasing rightward.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Column(i32);

impl Column {
    /// Creates a new column index.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the column.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Returns the column offset by the provided signed amount.
    #[must_use]
    pub const fn offset(self, delta: i32) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a tile-height horizontal slice of the world, increasing downward.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Row(u32);

impl Row {
    /// Creates a new row index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the row.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Row directly above this one, or `None` when already at the top.
    #[must_use]
    pub const fn above(self) -> Option<Self> {
        match self.0.checked_sub(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Row directly below this one.
    #[must_use]
    pub const fn below(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a single grid cell expressed as column and row indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    column: Column,
    row: Row,
}

impl GridCell {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: Column, row: Row) -> Self {
        Self { column, row }
    }

    /// Column containing the cell.
    #[must_use]
    pub const fn column(&self) -> Column {
        self.column
    }

    /// Row containing the cell.
    #[must_use]
    pub const fn row(&self) -> Row {
        self.row
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.column, self.row)
    }
}

/// Reasons grid metrics may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum GridError {
    /// Tile size must be a finite, strictly positive number of world units.
    #[error("tile size must be finite and positive (received {tile_size})")]
    InvalidTileSize {
        /// Provided tile size that failed validation.
        tile_size: f32,
    },
    /// World height must be finite and fit at least one row of tiles.
    #[error("world height {world_height} cannot hold a row of {tile_size}-unit tiles")]
    InvalidWorldHeight {
        /// Provided world height that failed validation.
        world_height: f32,
        /// Tile size the height was validated against.
        tile_size: f32,
    },
}

/// Converts between world-space positions and integer grid indices.
///
/// The metrics also carry the deepest row the generator may use. It is derived
/// once from the world height as the row containing the centre of the bottom
/// tile slot, which doubles as the default ground row for columns that have no
/// recorded surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridMetrics {
    tile_size: f32,
    max_row: Row,
}

impl GridMetrics {
    /// Creates metrics for square tiles inside a world of the given height.
    pub fn new(tile_size: f32, world_height: f32) -> Result<Self, GridError> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(GridError::InvalidTileSize { tile_size });
        }
        if !world_height.is_finite() || world_height < tile_size {
            return Err(GridError::InvalidWorldHeight {
                world_height,
                tile_size,
            });
        }

        Ok(Self::from_validated(tile_size, world_height))
    }

    fn from_validated(tile_size: f32, world_height: f32) -> Self {
        let mut metrics = Self {
            tile_size,
            max_row: Row::new(0),
        };
        metrics.max_row = metrics.world_y_to_row(world_height - tile_size / 2.0);
        metrics
    }

    /// Side length of a single square tile expressed in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Deepest row the generator may place a surface on.
    #[must_use]
    pub const fn max_row(&self) -> Row {
        self.max_row
    }

    /// Column containing the provided world-space x coordinate.
    #[must_use]
    pub fn world_x_to_column(&self, x: f32) -> Column {
        Column::new((x / self.tile_size).floor() as i32)
    }

    /// Row containing the provided world-space y coordinate, saturating at row zero.
    #[must_use]
    pub fn world_y_to_row(&self, y: f32) -> Row {
        Row::new((y / self.tile_size).floor().max(0.0) as u32)
    }

    /// World-space x coordinate of the column's centre.
    #[must_use]
    pub fn column_to_world_x(&self, column: Column) -> f32 {
        column.get() as f32 * self.tile_size + self.tile_size / 2.0
    }

    /// World-space y coordinate of the row's centre.
    #[must_use]
    pub fn row_to_world_y(&self, row: Row) -> f32 {
        row.get() as f32 * self.tile_size + self.tile_size / 2.0
    }

    /// World-space x coordinate of the column's left edge.
    #[must_use]
    pub fn column_left_edge(&self, column: Column) -> f32 {
        column.get() as f32 * self.tile_size
    }

    /// World-space centre of the provided cell.
    #[must_use]
    pub fn cell_center(&self, cell: GridCell) -> Vec2 {
        Vec2::new(
            self.column_to_world_x(cell.column()),
            self.row_to_world_y(cell.row()),
        )
    }

    /// Midpoint of the cell's top edge, where walkable props rest.
    #[must_use]
    pub fn surface_top(&self, cell: GridCell) -> Vec2 {
        self.cell_center(cell) - Vec2::new(0.0, self.tile_size / 2.0)
    }

    /// Clamps a candidate surface row into `[0, max_row]`.
    ///
    /// Missing rows resolve to the default ground row.
    #[must_use]
    pub fn clamp_row(&self, row: Option<Row>) -> Row {
        match row {
            Some(row) => row.min(self.max_row),
            None => self.max_row,
        }
    }
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self::from_validated(DEFAULT_TILE_SIZE, DEFAULT_WORLD_HEIGHT)
    }
}

/// Informational tags attached to planned columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureTag {
    /// Walkable solid ground.
    Ground,
    /// Raised platform sharing ground placement rules.
    Platform,
    /// Column without ground that must be cleared airborne.
    Gap,
    /// Deep hole below the surrounding surface.
    Pit,
    /// Part of an ascending staircase.
    StairUp,
    /// Part of a descending staircase.
    StairDown,
}

impl FeatureTag {
    /// Every tag in declaration order.
    pub const ALL: [FeatureTag; 6] = [
        FeatureTag::Ground,
        FeatureTag::Platform,
        FeatureTag::Gap,
        FeatureTag::Pit,
        FeatureTag::StairUp,
        FeatureTag::StairDown,
    ];

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Compact set of [`FeatureTag`] values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeatureSet(u8);

impl FeatureSet {
    /// Set containing no tags.
    pub const EMPTY: Self = Self(0);

    /// Set containing exactly the provided tag.
    #[must_use]
    pub const fn of(tag: FeatureTag) -> Self {
        Self(tag.bit())
    }

    /// Returns a copy of the set with the tag added.
    #[must_use]
    pub const fn with(self, tag: FeatureTag) -> Self {
        Self(self.0 | tag.bit())
    }

    /// Reports whether the tag is present.
    #[must_use]
    pub const fn contains(self, tag: FeatureTag) -> bool {
        self.0 & tag.bit() != 0
    }

    /// Reports whether the set holds no tags.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the contained tags in declaration order.
    pub fn iter(self) -> impl Iterator<Item = FeatureTag> {
        FeatureTag::ALL
            .into_iter()
            .filter(move |tag| self.contains(*tag))
    }
}

impl FromIterator<FeatureTag> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureTag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl Serialize for FeatureSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for FeatureSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tags = Vec::<FeatureTag>::deserialize(deserializer)?;
        Ok(tags.into_iter().collect())
    }
}

/// Decision recorded for a single column: its walkable surface and tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnState {
    surface: Option<Row>,
    features: FeatureSet,
}

impl ColumnState {
    /// Creates a column state from explicit parts.
    #[must_use]
    pub const fn new(surface: Option<Row>, features: FeatureSet) -> Self {
        Self { surface, features }
    }

    /// Plain walkable ground whose top tile sits on `row`.
    #[must_use]
    pub const fn ground(row: Row) -> Self {
        Self::new(Some(row), FeatureSet::of(FeatureTag::Ground))
    }

    /// Column without ground.
    #[must_use]
    pub const fn gap() -> Self {
        Self::new(None, FeatureSet::of(FeatureTag::Gap))
    }

    /// Returns a copy of the state with the tag added.
    #[must_use]
    pub const fn with_feature(self, tag: FeatureTag) -> Self {
        Self::new(self.surface, self.features.with(tag))
    }

    /// Row of the walkable top tile, or `None` for a gap.
    #[must_use]
    pub const fn surface(&self) -> Option<Row> {
        self.surface
    }

    /// Tags attached to the column.
    #[must_use]
    pub const fn features(&self) -> FeatureSet {
        self.features
    }

    /// Reports whether the column has no walkable surface.
    #[must_use]
    pub const fn is_gap(&self) -> bool {
        self.surface.is_none()
    }
}

/// Candidate column decisions for a requested range, not yet committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    start: Column,
    end: Column,
    states: BTreeMap<Column, ColumnState>,
}

impl ChunkPlan {
    /// Creates an empty plan covering the half-open range `[start, end)`.
    #[must_use]
    pub fn new(start: Column, end: Column) -> Self {
        Self {
            start,
            end,
            states: BTreeMap::new(),
        }
    }

    /// Creates a plan pre-populated with the provided states.
    ///
    /// Columns outside `[start, end)` are ignored.
    #[must_use]
    pub fn with_states<I>(start: Column, end: Column, states: I) -> Self
    where
        I: IntoIterator<Item = (Column, ColumnState)>,
    {
        let mut plan = Self::new(start, end);
        for (column, state) in states {
            plan.insert(column, state);
        }
        plan
    }

    /// Records the state for a column, replacing any earlier decision.
    ///
    /// Columns outside the requested range are ignored.
    pub fn insert(&mut self, column: Column, state: ColumnState) {
        if column < self.start || column >= self.end {
            return;
        }
        let _ = self.states.insert(column, state);
    }

    /// First column of the requested range.
    #[must_use]
    pub const fn start(&self) -> Column {
        self.start
    }

    /// One past the last column of the requested range.
    #[must_use]
    pub const fn end(&self) -> Column {
        self.end
    }

    /// One past the last planned column; equals [`Self::start`] for an empty plan.
    #[must_use]
    pub fn covered_end(&self) -> Column {
        self.states
            .keys()
            .next_back()
            .map_or(self.start, |column| column.offset(1))
    }

    /// State planned for the column, if any.
    #[must_use]
    pub fn get(&self, column: Column) -> Option<&ColumnState> {
        self.states.get(&column)
    }

    /// Iterates over planned columns in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Column, &ColumnState)> {
        self.states.iter().map(|(column, state)| (*column, state))
    }

    /// Number of planned columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Reports whether no column has been planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Movement tolerances the generated terrain must respect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementLimits {
    /// Maximum rows the player can climb between neighbouring surfaces.
    pub max_up_step: u32,
    /// Maximum rows the player may drop between neighbouring surfaces.
    pub max_down_step: u32,
    /// Maximum run of gap columns the player can clear in one jump.
    pub max_gap: u32,
}

impl MovementLimits {
    /// Creates limits from explicit tolerances.
    #[must_use]
    pub const fn new(max_up_step: u32, max_down_step: u32, max_gap: u32) -> Self {
        Self {
            max_up_step,
            max_down_step,
            max_gap,
        }
    }

    /// Reports whether moving from one surface row to another is within tolerance.
    ///
    /// Rows grow downward, so a smaller destination row is a climb.
    #[must_use]
    pub fn allows_step(&self, from: Row, to: Row) -> bool {
        if to <= from {
            from.get() - to.get() <= self.max_up_step
        } else {
            to.get() - from.get() <= self.max_down_step
        }
    }
}

impl Default for MovementLimits {
    fn default() -> Self {
        Self::new(1, 2, 2)
    }
}

/// Opaque handle to an object owned by the host engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EngineHandle(u64);

impl EngineHandle {
    /// Creates a handle from its numeric representation.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Name of a texture or sprite variant understood by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpriteKey(String);

impl SpriteKey {
    /// Creates a sprite key from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of the sprite.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-solid objects attached to a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropKind {
    /// Purely visual sprite resting on the surface.
    Decoration,
    /// Pickup floating above the surface that increases the score.
    Collectible,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the grid metrics, dropping every recorded column, tile and prop.
    ConfigureGrid {
        /// Metrics describing tile size and row bounds.
        metrics: GridMetrics,
    },
    /// Commits a verified plan into the column store and surface map.
    CommitColumns {
        /// Plan whose columns become authoritative.
        plan: ChunkPlan,
    },
    /// Records a solid tile the engine placed at the provided cell.
    RecordTile {
        /// Cell occupied by the tile.
        cell: GridCell,
        /// Variant the tile was created with.
        variant: SpriteKey,
        /// Engine handle owning the tile.
        handle: EngineHandle,
    },
    /// Records a decoration or collectible the engine placed in a column.
    RecordProp {
        /// Column the prop belongs to.
        column: Column,
        /// Kind of prop placed.
        kind: PropKind,
        /// Engine handle owning the prop.
        handle: EngineHandle,
    },
    /// Reports that the player picked up a collectible.
    CollectCollectible {
        /// Handle of the collectible the engine detected an overlap with.
        handle: EngineHandle,
    },
    /// Retires every column, tile and prop strictly behind the horizon.
    PruneBehind {
        /// First column that survives the prune.
        horizon: Column,
    },
}

/// Reasons the world refused to record an engine object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordError {
    /// The cell or column already holds an object of that kind.
    Occupied,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that new grid metrics are active.
    GridConfigured {
        /// Deepest row available to the generator.
        max_row: Row,
    },
    /// Confirms that a plan's columns were committed.
    ColumnsCommitted {
        /// First committed column.
        start: Column,
        /// One past the last committed column.
        end: Column,
    },
    /// Confirms that a tile was added to the occupancy index.
    TileRecorded {
        /// Cell occupied by the tile.
        cell: GridCell,
        /// Engine handle owning the tile.
        handle: EngineHandle,
    },
    /// Reports that a tile could not be recorded; the handle must be released.
    TileRejected {
        /// Cell the tile was meant to occupy.
        cell: GridCell,
        /// Engine handle that is not tracked by the world.
        handle: EngineHandle,
        /// Reason the record was refused.
        reason: RecordError,
    },
    /// Confirms that a prop was added to the prop registry.
    PropRecorded {
        /// Column the prop belongs to.
        column: Column,
        /// Kind of prop recorded.
        kind: PropKind,
        /// Engine handle owning the prop.
        handle: EngineHandle,
    },
    /// Reports that a prop could not be recorded; the handle must be released.
    PropRejected {
        /// Column the prop was meant for.
        column: Column,
        /// Kind of prop requested.
        kind: PropKind,
        /// Engine handle that is not tracked by the world.
        handle: EngineHandle,
        /// Reason the record was refused.
        reason: RecordError,
    },
    /// Confirms that a collectible was picked up.
    CollectibleCollected {
        /// Handle of the collectible that must now be released.
        handle: EngineHandle,
        /// Score after the pickup.
        score: u32,
    },
    /// Reports that a tile left the occupancy index and must be destroyed.
    TileRetired {
        /// Cell the tile occupied.
        cell: GridCell,
        /// Engine handle to release.
        handle: EngineHandle,
    },
    /// Reports that a prop left the registry and must be destroyed.
    PropRetired {
        /// Column the prop belonged to.
        column: Column,
        /// Kind of prop retired.
        kind: PropKind,
        /// Engine handle to release.
        handle: EngineHandle,
    },
    /// Summarises a prune of the column store.
    ColumnsPruned {
        /// First column that survived the prune.
        horizon: Column,
        /// Number of column entries removed.
        removed: usize,
    },
}
