use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use catwalk_core::{Column, SpriteKey};
use catwalk_engine::{Engine, HeadlessEngine};
use catwalk_system_lifecycle::{CleanupPolicy, GeneratorConfig, Lifecycle, TickReport};
use catwalk_system_tile_rules::TileRules;
use catwalk_world::{query, World};
use proptest::prelude::*;

struct Run {
    driver: Lifecycle,
    world: World,
    engine: HeadlessEngine,
    reports: Vec<TickReport>,
}

fn run(config: &GeneratorConfig, engine: HeadlessEngine, ticks: usize, speed: f32) -> Run {
    let mut driver = Lifecycle::new(config, TileRules::default()).expect("valid config");
    let mut world = World::new();
    let mut engine = engine;
    let mut reports = vec![driver.bootstrap(&mut world, &mut engine)];

    for _ in 0..ticks {
        engine.advance_player(speed);
        reports.push(driver.tick(&mut world, &mut engine));
    }

    Run {
        driver,
        world,
        engine,
        reports,
    }
}

fn fingerprint(world: &World) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (column, state) in query::column_states(world) {
        column.hash(&mut hasher);
        state.hash(&mut hasher);
    }
    for tile in query::tiles(world) {
        tile.cell().hash(&mut hasher);
        tile.variant().hash(&mut hasher);
        tile.handle().hash(&mut hasher);
    }
    for prop in query::props(world) {
        prop.column.hash(&mut hasher);
        prop.kind.hash(&mut hasher);
        prop.handle.hash(&mut hasher);
    }
    hasher.finish()
}

fn assert_no_leaks(run: &Run) {
    assert_no_leaks_in(&run.world, &run.engine);
}

fn assert_no_leaks_in(world: &World, engine: &HeadlessEngine) {
    assert_eq!(
        engine.live_count(),
        query::tile_count(world) + query::prop_count(world),
        "engine objects must match world records"
    );
}

#[test]
fn same_seed_replays_identically() {
    let config = GeneratorConfig::default();
    let first = run(&config, HeadlessEngine::new(0.0), 400, 9.0);
    let second = run(&config, HeadlessEngine::new(0.0), 400, 9.0);

    assert_eq!(fingerprint(&first.world), fingerprint(&second.world));
    assert_eq!(first.reports, second.reports);
    assert_eq!(first.driver.frontier(), second.driver.frontier());
}

#[test]
fn different_seeds_diverge() {
    let config = GeneratorConfig::default();
    let mut other = GeneratorConfig::default();
    other.lifecycle.seed = config.lifecycle.seed + 1;

    let first = run(&config, HeadlessEngine::new(0.0), 200, 9.0);
    let second = run(&other, HeadlessEngine::new(0.0), 200, 9.0);

    assert_ne!(fingerprint(&first.world), fingerprint(&second.world));
}

#[test]
fn live_columns_stay_bounded_while_running() {
    let config = GeneratorConfig::default();
    let result = run(&config, HeadlessEngine::new(0.0), 3_000, 12.0);

    let metrics = result.driver.metrics();
    let bound = ((600.0 + 3.0 * 400.0) / metrics.tile_size()).ceil() as usize + 2;
    assert!(query::column_count(&result.world) <= bound);
    assert!(result.driver.frontier_x() > 30_000.0);
    assert!(result.reports.iter().all(|report| !report.gave_up));
    assert_no_leaks(&result);
}

#[test]
fn committed_columns_are_contiguous() {
    let config = GeneratorConfig::default();
    let result = run(&config, HeadlessEngine::new(0.0), 500, 15.0);

    let columns: Vec<i32> = query::column_states(&result.world)
        .map(|(column, _)| column.get())
        .collect();
    for pair in columns.windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }
    assert_eq!(
        query::column_range(&result.world).map(|(_, end)| end),
        Some(result.driver.frontier())
    );
}

#[test]
fn retain_columns_policy_keeps_newest_columns() {
    let mut config = GeneratorConfig::default();
    config.lifecycle.cleanup = CleanupPolicy::RetainColumns(30);
    let result = run(&config, HeadlessEngine::new(0.0), 800, 10.0);

    assert!(query::column_count(&result.world) <= 30);
    let (first, _) = query::column_range(&result.world).expect("columns live");
    let player_column = result
        .driver
        .metrics()
        .world_x_to_column(result.engine.player_x());
    assert!(first <= player_column);
    assert_no_leaks(&result);
}

#[test]
fn missing_tile_texture_never_blocks_generation() {
    let config = GeneratorConfig::default();
    let engine = HeadlessEngine::new(0.0).with_missing_texture(SpriteKey::new("tile-2"));
    let result = run(&config, engine, 300, 10.0);

    assert_eq!(query::tile_count(&result.world), 0);
    assert!(result.reports.iter().any(|report| report.placement_failures > 0));
    assert!(result.driver.frontier() > Column::new(30));
    assert_no_leaks(&result);
}

#[test]
fn tick_on_unconfigured_world_adopts_generator_grid() {
    let mut config = GeneratorConfig::default();
    config.grid.tile_size = 100.0;
    let mut driver = Lifecycle::new(&config, TileRules::default()).expect("valid config");
    let mut world = World::new();
    let mut engine = HeadlessEngine::new(0.0);

    let report = driver.tick(&mut world, &mut engine);

    let metrics = driver.metrics();
    assert_eq!(query::metrics(&world), metrics);
    assert_eq!(
        report.generated.map(|(start, _)| start),
        Some(Column::new(0))
    );
    assert!(query::tile_count(&world) > 0);
    for tile in query::tiles(&world) {
        let object = engine.object(tile.handle()).expect("tile is live");
        assert_eq!(object.position, metrics.cell_center(tile.cell()));
        assert!(tile.cell().row() <= metrics.max_row());
    }
    assert_no_leaks_in(&world, &engine);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn nothing_survives_behind_the_horizon(
        seed in any::<u64>(),
        speeds in prop::collection::vec(0.0f32..40.0, 1..200),
    ) {
        let mut config = GeneratorConfig::default();
        config.lifecycle.seed = seed;
        let mut driver = Lifecycle::new(&config, TileRules::default()).expect("valid config");
        let mut world = World::new();
        let mut engine = HeadlessEngine::new(0.0);
        let _ = driver.bootstrap(&mut world, &mut engine);

        for speed in speeds {
            engine.advance_player(speed);
            let report = driver.tick(&mut world, &mut engine);
            let horizon = report.horizon.expect("distance policy always prunes");

            prop_assert!(query::tiles(&world).all(|tile| tile.cell().column() >= horizon));
            prop_assert!(query::props(&world).all(|prop| prop.column >= horizon));
            prop_assert!(query::column_states(&world).all(|(column, _)| column >= horizon));
            prop_assert_eq!(
                engine.live_count(),
                query::tile_count(&world) + query::prop_count(&world)
            );
        }
    }
}
