use catwalk_core::{Column, FeatureSet, FeatureTag, GridMetrics, MovementLimits, Row};
use catwalk_system_planner::{Planner, PlannerConfig};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn planner(tile_size: f32, limits: MovementLimits) -> Planner {
    let metrics = GridMetrics::new(tile_size, 600.0).expect("metrics");
    Planner::new(PlannerConfig::default(), metrics, limits)
}

#[test]
fn start_zone_is_flat_at_default_ground_row() {
    let planner = planner(74.9, MovementLimits::new(1, 2, 2));
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);

    let plan = planner.generate_column_states(Column::new(0), Column::new(20), None, &mut rng);

    for value in 0..5 {
        let state = plan.get(Column::new(value)).expect("start zone column planned");
        assert_eq!(state.surface(), Some(Row::new(7)));
        assert_eq!(state.features(), FeatureSet::of(FeatureTag::Ground));
    }
}

#[test]
fn planning_continues_from_previous_surface() {
    let planner = planner(100.0, MovementLimits::default());
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    let plan = planner.generate_column_states(
        Column::new(100),
        Column::new(101),
        Some(Row::new(2)),
        &mut rng,
    );

    let state = plan.get(Column::new(100)).expect("single column planned");
    assert_eq!(state.surface(), Some(Row::new(2)));
}

#[test]
fn same_seed_produces_same_plan() {
    let planner = planner(100.0, MovementLimits::default());
    let mut first = ChaCha8Rng::seed_from_u64(77);
    let mut second = ChaCha8Rng::seed_from_u64(77);

    let left = planner.generate_column_states(Column::new(5), Column::new(60), None, &mut first);
    let right = planner.generate_column_states(Column::new(5), Column::new(60), None, &mut second);

    assert_eq!(left, right);
}

proptest! {
    #[test]
    fn start_zone_never_holds_gaps(seed in any::<u64>(), end in 1i32..60) {
        let planner = planner(67.0, MovementLimits::default());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let plan = planner.generate_column_states(Column::new(0), Column::new(end), None, &mut rng);

        for (column, state) in plan.iter() {
            if column.get() < 5 {
                prop_assert!(!state.is_gap());
                prop_assert_eq!(state.features(), FeatureSet::of(FeatureTag::Ground));
            }
        }
    }

    #[test]
    fn planned_steps_and_gaps_stay_within_limits(
        seed in any::<u64>(),
        start in 0i32..500,
        width in 1i32..80,
        prev in proptest::option::of(0u32..12),
        max_gap in 0u32..3,
    ) {
        let limits = MovementLimits::new(1, 2, max_gap);
        let planner = planner(67.0, limits);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let plan = planner.generate_column_states(
            Column::new(start),
            Column::new(start + width),
            prev.map(Row::new),
            &mut rng,
        );

        let mut last_surface: Option<Row> = None;
        let mut gap_run = 0u32;
        for (_, state) in plan.iter() {
            match state.surface() {
                Some(surface) => {
                    if let Some(previous) = last_surface {
                        prop_assert!(limits.allows_step(previous, surface));
                    }
                    last_surface = Some(surface);
                    gap_run = 0;
                }
                None => {
                    gap_run += 1;
                    prop_assert!(gap_run <= max_gap);
                }
            }
        }
    }

    #[test]
    fn planned_steps_respect_varied_step_limits(
        seed in any::<u64>(),
        width in 1i32..80,
        prev in proptest::option::of(0u32..8),
        max_up in 0u32..3,
        max_down in 0u32..3,
    ) {
        let limits = MovementLimits::new(max_up, max_down, 2);
        let planner = planner(67.0, limits);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let plan = planner.generate_column_states(
            Column::new(0),
            Column::new(width),
            prev.map(Row::new),
            &mut rng,
        );

        let surfaces: Vec<Row> = plan.iter().filter_map(|(_, state)| state.surface()).collect();
        for pair in surfaces.windows(2) {
            prop_assert!(limits.allows_step(pair[0], pair[1]));
        }
        if max_up == 0 {
            prop_assert!(plan
                .iter()
                .all(|(_, state)| !state.features().contains(FeatureTag::StairUp)));
        }
        if max_down == 0 {
            prop_assert!(plan
                .iter()
                .all(|(_, state)| !state.features().contains(FeatureTag::StairDown)));
        }
    }
}
