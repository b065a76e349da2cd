#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turns verified chunk plans into engine objects and world commands.
//!
//! The materializer reads the world but never mutates it. Every object it asks
//! the engine to create is reported through a [`Command`] so the world can
//! record the handle, and every planned column is committed through a single
//! [`Command::CommitColumns`]. Cells and prop slots that the world already
//! tracks are skipped, so re-materializing a plan creates nothing new.

use catwalk_core::{
    ChunkPlan, Column, Command, FeatureTag, GridCell, PropKind, SpriteKey,
};
use catwalk_engine::Engine;
use catwalk_system_tile_rules::{TileRules, DEFAULT_FALLBACK_TILE};
use catwalk_world::{query, World};
use glam::Vec2;
use rand::{
    distributions::{Bernoulli, Distribution},
    Rng,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for tile and prop placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializerConfig {
    /// Probability that a walkable column receives a decoration.
    pub decoration_chance: f64,
    /// Probability that a walkable column receives a collectible.
    pub collectible_chance: f64,
    /// Height above the surface top at which collectibles float, in world units.
    pub collectible_lift: f32,
    /// Number of `bone-N` decoration variants available.
    pub decoration_variants: u32,
    /// Tile variant used when tile rules have no better choice.
    pub fallback_tile: SpriteKey,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            decoration_chance: 0.25,
            collectible_chance: 0.15,
            collectible_lift: 50.0,
            decoration_variants: 4,
            fallback_tile: SpriteKey::new(DEFAULT_FALLBACK_TILE),
        }
    }
}

/// Errors raised while constructing a materializer.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MaterializerError {
    /// A placement probability lies outside `[0, 1]`.
    #[error("{name} must lie within [0, 1] (received {value})")]
    InvalidChance {
        /// Name of the offending setting.
        name: &'static str,
        /// Rejected probability.
        value: f64,
    },
}

/// Summary of a single materialization pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Solid tiles the engine created.
    pub tiles_placed: usize,
    /// Ground cells skipped because the world already tracks a tile there.
    pub tiles_skipped: usize,
    /// Ground cells left empty because the engine refused the placement.
    pub placement_failures: usize,
    /// Decorations created.
    pub decorations: usize,
    /// Collectibles created.
    pub collectibles: usize,
}

/// Materializes verified plans.
#[derive(Clone, Debug)]
pub struct Materializer {
    config: MaterializerConfig,
    start_zone_columns: u32,
    rules: TileRules,
    decoration: Bernoulli,
    collectible: Bernoulli,
}

impl Materializer {
    /// Creates a materializer that keeps the first `start_zone_columns` free of props.
    pub fn new(
        config: MaterializerConfig,
        start_zone_columns: u32,
        rules: TileRules,
    ) -> Result<Self, MaterializerError> {
        let decoration = chance("decoration_chance", config.decoration_chance)?;
        let collectible = chance("collectible_chance", config.collectible_chance)?;
        Ok(Self {
            config,
            start_zone_columns,
            rules,
            decoration,
            collectible,
        })
    }

    /// Creates engine objects for the plan and emits the matching world commands.
    pub fn materialize<E, R>(
        &self,
        plan: &ChunkPlan,
        world: &World,
        engine: &mut E,
        rng: &mut R,
        out_commands: &mut Vec<Command>,
    ) -> MaterializeReport
    where
        E: Engine + ?Sized,
        R: Rng + ?Sized,
    {
        let metrics = query::metrics(world);
        let mut report = MaterializeReport::default();
        let mut records = Vec::new();
        let mut previous: Option<(GridCell, SpriteKey)> = None;

        for (column, state) in plan.iter() {
            let Some(surface) = state.surface() else {
                continue;
            };
            let cell = GridCell::new(column, surface);

            if state.features().contains(FeatureTag::Ground) {
                if query::is_cell_free(world, cell) {
                    let left = left_neighbour(world, previous.as_ref(), cell);
                    let variant = self.rules.choose_tile(left.as_ref(), rng);
                    match engine.place_solid(metrics.cell_center(cell), &variant) {
                        Ok(handle) => {
                            report.tiles_placed += 1;
                            records.push(Command::RecordTile {
                                cell,
                                variant: variant.clone(),
                                handle,
                            });
                            previous = Some((cell, variant));
                        }
                        Err(error) => {
                            report.placement_failures += 1;
                            log::warn!("ground missing at cell {cell}: {error}");
                        }
                    }
                } else {
                    report.tiles_skipped += 1;
                }
            }

            if self.in_start_zone(column) {
                continue;
            }
            let top = metrics.surface_top(cell);

            if self.decoration.sample(rng) && !query::has_prop(world, column, PropKind::Decoration)
            {
                let variant = self.decoration_variant(rng);
                let handle = engine.place_decoration(top, &variant);
                report.decorations += 1;
                records.push(Command::RecordProp {
                    column,
                    kind: PropKind::Decoration,
                    handle,
                });
            }

            if self.collectible.sample(rng)
                && !query::has_prop(world, column, PropKind::Collectible)
            {
                let position = top - Vec2::new(0.0, self.config.collectible_lift);
                let handle = engine.spawn_collectible(position);
                report.collectibles += 1;
                records.push(Command::RecordProp {
                    column,
                    kind: PropKind::Collectible,
                    handle,
                });
            }
        }

        out_commands.push(Command::CommitColumns { plan: plan.clone() });
        out_commands.append(&mut records);
        report
    }

    fn in_start_zone(&self, column: Column) -> bool {
        i64::from(column.get()) < i64::from(self.start_zone_columns)
    }

    fn decoration_variant<R: Rng + ?Sized>(&self, rng: &mut R) -> SpriteKey {
        let index = rng.gen_range(1..=self.config.decoration_variants.max(1));
        SpriteKey::new(format!("bone-{index}"))
    }
}

fn chance(name: &'static str, value: f64) -> Result<Bernoulli, MaterializerError> {
    Bernoulli::new(value).map_err(|_| MaterializerError::InvalidChance { name, value })
}

/// Variant of the tile directly left of `cell`, from this pass or the world.
fn left_neighbour(
    world: &World,
    previous: Option<&(GridCell, SpriteKey)>,
    cell: GridCell,
) -> Option<SpriteKey> {
    let left = GridCell::new(cell.column().offset(-1), cell.row());
    match previous {
        Some((placed, variant)) if *placed == left => Some(variant.clone()),
        _ => query::tile_at(world, left).map(|tile| tile.variant().clone()),
    }
}
