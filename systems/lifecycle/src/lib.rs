#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Generate-ahead and cleanup driver for the endless level.
//!
//! Each tick the driver reads the player's position once, plans and verifies
//! at most one chunk ahead of the frontier, materializes it, and then prunes
//! everything behind the cleanup horizon. Every world mutation goes through
//! [`catwalk_world::apply`]; every handle the world stops tracking is released
//! through the engine before the tick returns.

mod config;

use catwalk_core::{ChunkPlan, Column, Command, EngineHandle, Event, GridMetrics, MovementLimits};
use catwalk_engine::Engine;
use catwalk_system_materializer::Materializer;
use catwalk_system_planner::Planner;
use catwalk_system_reachability::{verify, Reachability, ReachabilityConfig};
use catwalk_system_tile_rules::TileRules;
use catwalk_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use config::{
    CleanupPolicy, ConfigError, GeneratorConfig, GridConfig, LifecycleConfig, TileDataConfig,
};

/// Summary of what a bootstrap or tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Player position read at the start of the tick.
    pub player_x: f32,
    /// Range `[start, end)` requested for generation, if any.
    pub requested: Option<(Column, Column)>,
    /// Range `[start, covered_end)` committed to the world, if any.
    pub generated: Option<(Column, Column)>,
    /// Plan-and-verify attempts spent on the requested chunk.
    pub attempts: u32,
    /// Whether every attempt was rejected.
    pub gave_up: bool,
    /// Solid tiles created.
    pub tiles_placed: usize,
    /// Ground cells left empty because the engine refused the placement.
    pub placement_failures: usize,
    /// Decorations created.
    pub decorations: usize,
    /// Collectibles created.
    pub collectibles: usize,
    /// Cleanup horizon applied after generation.
    pub horizon: Option<Column>,
    /// Tiles destroyed by cleanup.
    pub tiles_retired: usize,
    /// Props destroyed by cleanup.
    pub props_retired: usize,
    /// Column entries removed by cleanup.
    pub columns_pruned: usize,
    /// Handles destroyed because the world refused to record them.
    pub rejected_handles: usize,
}

/// Drives generation and cleanup for a single world.
#[derive(Debug)]
pub struct Lifecycle {
    config: LifecycleConfig,
    metrics: GridMetrics,
    limits: MovementLimits,
    reachability: ReachabilityConfig,
    planner: Planner,
    materializer: Materializer,
    frontier: Column,
    max_column: Column,
    rng: ChaCha8Rng,
}

impl Lifecycle {
    /// Creates a driver from a validated configuration and tile rules.
    pub fn new(config: &GeneratorConfig, rules: TileRules) -> Result<Self, ConfigError> {
        config.validate()?;
        let metrics = config.metrics()?;
        let planner = Planner::new(config.planner, metrics, config.limits);
        let materializer = Materializer::new(
            config.materializer.clone(),
            config.planner.start_zone_columns,
            rules,
        )?;

        Ok(Self {
            config: config.lifecycle,
            metrics,
            limits: config.limits,
            reachability: config.reachability,
            planner,
            materializer,
            frontier: Column::new(0),
            max_column: metrics.world_x_to_column(config.lifecycle.max_world_width),
            rng: ChaCha8Rng::seed_from_u64(config.lifecycle.seed),
        })
    }

    /// Grid metrics the driver generates with.
    #[must_use]
    pub fn metrics(&self) -> GridMetrics {
        self.metrics
    }

    /// First column that has not been generated yet.
    #[must_use]
    pub fn frontier(&self) -> Column {
        self.frontier
    }

    /// World x coordinate of the frontier's left edge.
    #[must_use]
    pub fn frontier_x(&self) -> f32 {
        self.metrics.column_left_edge(self.frontier)
    }

    /// Configures the world's grid and generates the initial chunk.
    pub fn bootstrap<E: Engine + ?Sized>(&mut self, world: &mut World, engine: &mut E) -> TickReport {
        let mut report = TickReport {
            player_x: engine.player_x(),
            ..TickReport::default()
        };

        self.configure(world, engine, &mut report);

        let end = self
            .metrics
            .world_x_to_column(self.config.initial_chunk_width)
            .min(self.max_column);
        self.generate(world, engine, Column::new(0), end, &mut report);
        log::info!(
            "bootstrapped columns [0, {}) with {} tiles",
            self.frontier,
            report.tiles_placed
        );
        report
    }

    /// Runs generate-ahead followed by cleanup.
    pub fn tick<E: Engine + ?Sized>(&mut self, world: &mut World, engine: &mut E) -> TickReport {
        let player_x = engine.player_x();
        let mut report = TickReport {
            player_x,
            ..TickReport::default()
        };

        if query::metrics(world) != self.metrics {
            log::warn!("world grid does not match the generator's; reconfiguring from column 0");
            self.configure(world, engine, &mut report);
        }

        if player_x > self.frontier_x() - self.config.generation_distance
            && self.frontier < self.max_column
        {
            let start = self.frontier;
            let reach = self.frontier_x() + 2.0 * self.config.generation_distance;
            let end = self
                .metrics
                .world_x_to_column(reach)
                .max(start.offset(1))
                .min(self.max_column);
            self.generate(world, engine, start, end, &mut report);
        }

        self.cleanup(world, engine, player_x, &mut report);
        report
    }

    /// Records a collectible pickup and releases its handle, returning the new score.
    pub fn collect<E: Engine + ?Sized>(
        &self,
        world: &mut World,
        engine: &mut E,
        handle: EngineHandle,
    ) -> Option<u32> {
        let mut events = Vec::new();
        world::apply(world, Command::CollectCollectible { handle }, &mut events);
        let mut score = None;
        for event in events {
            if let Event::CollectibleCollected { handle, score: total } = event {
                engine.destroy(handle);
                score = Some(total);
            }
        }
        score
    }

    /// Resets the world to the driver's grid and restarts the frontier.
    fn configure<E: Engine + ?Sized>(
        &mut self,
        world: &mut World,
        engine: &mut E,
        report: &mut TickReport,
    ) {
        self.frontier = Column::new(0);
        submit(
            world,
            engine,
            vec![Command::ConfigureGrid {
                metrics: self.metrics,
            }],
            report,
        );
    }

    fn generate<E: Engine + ?Sized>(
        &mut self,
        world: &mut World,
        engine: &mut E,
        start: Column,
        end: Column,
        report: &mut TickReport,
    ) {
        if start >= end {
            return;
        }
        report.requested = Some((start, end));

        let Some(plan) = self.plan_verified(world, start, end, report) else {
            report.gave_up = true;
            log::warn!(
                "no traversable layout for columns [{start}, {end}) after {} attempts; retrying next tick",
                report.attempts
            );
            return;
        };

        let mut commands = Vec::new();
        let materialized =
            self.materializer
                .materialize(&plan, world, engine, &mut self.rng, &mut commands);
        report.tiles_placed += materialized.tiles_placed;
        report.placement_failures += materialized.placement_failures;
        report.decorations += materialized.decorations;
        report.collectibles += materialized.collectibles;
        submit(world, engine, commands, report);

        let covered = plan.covered_end();
        report.generated = Some((start, covered));
        self.frontier = covered;
        log::debug!(
            "generated columns [{start}, {covered}) after {} attempt(s)",
            report.attempts
        );
    }

    fn plan_verified(
        &mut self,
        world: &World,
        start: Column,
        end: Column,
        report: &mut TickReport,
    ) -> Option<ChunkPlan> {
        let previous = query::surface_row(world, start.offset(-1)).flatten();
        for _ in 0..self.config.max_chunk_attempts {
            report.attempts += 1;
            let plan = self
                .planner
                .generate_column_states(start, end, previous, &mut self.rng);
            match verify(&plan, &self.limits, &self.reachability) {
                Reachability::Reachable { .. } => return Some(plan),
                Reachability::Unreachable { reason } => {
                    log::debug!("rejected plan for [{start}, {end}): {reason:?}");
                }
            }
        }
        None
    }

    fn cleanup<E: Engine + ?Sized>(
        &mut self,
        world: &mut World,
        engine: &mut E,
        player_x: f32,
        report: &mut TickReport,
    ) {
        let horizon = match self.config.cleanup {
            CleanupPolicy::Distance(distance) => self.metrics.world_x_to_column(player_x - distance),
            CleanupPolicy::RetainColumns(columns) => {
                let Some((_, end)) = query::column_range(world) else {
                    return;
                };
                let retained = i32::try_from(columns).unwrap_or(i32::MAX);
                end.offset(-retained)
                    .min(self.metrics.world_x_to_column(player_x))
            }
        };
        report.horizon = Some(horizon);
        submit(world, engine, vec![Command::PruneBehind { horizon }], report);
    }
}

/// Applies commands and releases every handle the world reports as untracked.
fn submit<E: Engine + ?Sized>(
    world: &mut World,
    engine: &mut E,
    commands: Vec<Command>,
    report: &mut TickReport,
) {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }

    for event in events {
        match event {
            Event::TileRetired { handle, .. } => {
                engine.destroy(handle);
                report.tiles_retired += 1;
            }
            Event::PropRetired { handle, .. } => {
                engine.destroy(handle);
                report.props_retired += 1;
            }
            Event::TileRejected { handle, cell, .. } => {
                log::debug!("released duplicate tile at {cell}");
                engine.destroy(handle);
                report.rejected_handles += 1;
            }
            Event::PropRejected { handle, .. } => {
                engine.destroy(handle);
                report.rejected_handles += 1;
            }
            Event::ColumnsPruned { removed, .. } => report.columns_pruned += removed,
            Event::CollectibleCollected { handle, .. } => engine.destroy(handle),
            Event::GridConfigured { .. }
            | Event::ColumnsCommitted { .. }
            | Event::TileRecorded { .. }
            | Event::PropRecorded { .. } => {}
        }
    }
}
