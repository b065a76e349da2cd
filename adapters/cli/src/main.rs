#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the endless level generator headlessly.

mod render;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use catwalk_core::{Column, ColumnState};
use catwalk_engine::{HeadlessEngine, ObjectKind};
use catwalk_system_lifecycle::{GeneratorConfig, Lifecycle, TickReport};
use catwalk_system_tile_rules::TileRules;
use catwalk_world::{query, World};
use clap::Parser;
use serde::Serialize;

/// Runs the generator against a simulated player walking to the right.
#[derive(Debug, Parser)]
#[command(name = "catwalk", version, about)]
struct Cli {
    /// Number of ticks to simulate after the initial chunk.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Horizontal distance the player covers each tick, in world units.
    #[arg(long, default_value_t = 8.0)]
    speed: f32,
    /// Player x coordinate before the first tick.
    #[arg(long, default_value_t = 100.0)]
    start_x: f32,
    /// Overrides the seed from the configuration file.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML configuration file. Missing sections keep their defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Prints the live window as ASCII art after the run.
    #[arg(long)]
    ascii: bool,
    /// Writes the live column states as JSON to the given file.
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,
    /// Enables debug logging unless `RUST_LOG` says otherwise.
    #[arg(long, short)]
    verbose: bool,
}

/// Totals accumulated over every tick of a run.
#[derive(Clone, Copy, Debug, Default)]
struct RunTotals {
    ticks: u32,
    chunks: u32,
    give_ups: u32,
    tiles_placed: usize,
    placement_failures: usize,
    tiles_retired: usize,
    props_retired: usize,
}

impl RunTotals {
    fn absorb(&mut self, report: &TickReport) {
        if report.generated.is_some() {
            self.chunks += 1;
        }
        if report.gave_up {
            self.give_ups += 1;
        }
        self.tiles_placed += report.tiles_placed;
        self.placement_failures += report.placement_failures;
        self.tiles_retired += report.tiles_retired;
        self.props_retired += report.props_retired;
    }
}

#[derive(Serialize)]
struct ColumnDump {
    column: Column,
    #[serde(flatten)]
    state: ColumnState,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.lifecycle.seed = seed;
    }

    let rules = TileRules::load(
        config.materializer.fallback_tile.clone(),
        config.tiles.matrix.as_deref(),
        config.tiles.tile_map.as_deref(),
    );
    let mut driver = Lifecycle::new(&config, rules).context("invalid generator configuration")?;
    let mut world = World::new();
    let mut engine = HeadlessEngine::new(cli.start_x);
    let reach = driver.metrics().tile_size() / 2.0;

    let mut totals = RunTotals::default();
    totals.absorb(&driver.bootstrap(&mut world, &mut engine));
    for _ in 0..cli.ticks {
        engine.advance_player(cli.speed);
        totals.absorb(&driver.tick(&mut world, &mut engine));
        for handle in engine.collectibles_within(reach) {
            let _ = driver.collect(&mut world, &mut engine, handle);
        }
        totals.ticks += 1;
    }

    print_summary(&driver, &world, &engine, &totals);

    if cli.ascii {
        println!();
        print!("{}", render::render_ascii(&world));
    }

    if let Some(path) = cli.dump.as_deref() {
        write_dump(&world, path)?;
        log::info!("wrote column dump to {}", path.display());
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn print_summary(driver: &Lifecycle, world: &World, engine: &HeadlessEngine, totals: &RunTotals) {
    let stats = engine.stats();
    let window = query::column_range(world)
        .map(|(first, end)| format!("[{first}, {end})"))
        .unwrap_or_else(|| "empty".to_owned());

    println!("ticks:            {}", totals.ticks);
    println!("chunks generated: {}", totals.chunks);
    println!("give-ups:         {}", totals.give_ups);
    println!("frontier:         column {}", driver.frontier());
    println!("live window:      {window}");
    println!("columns live:     {}", query::column_count(world));
    println!("tiles live:       {}", query::tile_count(world));
    println!("props live:       {}", query::prop_count(world));
    println!("score:            {}", query::score(world));
    println!(
        "tiles placed:     {} ({} refused)",
        totals.tiles_placed, totals.placement_failures
    );
    println!(
        "retired:          {} tiles, {} props",
        totals.tiles_retired, totals.props_retired
    );
    let (mut solids, mut decorations, mut collectibles) = (0usize, 0usize, 0usize);
    for (_, object) in engine.objects() {
        match object.kind {
            ObjectKind::Solid { .. } => solids += 1,
            ObjectKind::Decoration { .. } => decorations += 1,
            ObjectKind::Collectible => collectibles += 1,
        }
    }
    println!(
        "engine objects:   {} live ({solids} solid, {decorations} decorations, {collectibles} collectibles)",
        engine.live_count()
    );
    println!(
        "engine calls:     {} created, {} destroyed, {} stale destroys",
        stats.created, stats.destroyed, stats.stale_destroys
    );
}

fn write_dump(world: &World, path: &Path) -> Result<()> {
    let columns: Vec<ColumnDump> = query::column_states(world)
        .map(|(column, state)| ColumnDump { column, state })
        .collect();
    let json = serde_json::to_string_pretty(&columns).context("failed to encode column dump")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
