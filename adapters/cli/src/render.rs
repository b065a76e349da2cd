//! ASCII rendering of the live window.

use std::fmt::Write as _;

use catwalk_core::{PropKind, Row};
use catwalk_world::{query, World};

const SOLID: char = '#';
const AIR: char = '.';
const COLLECTIBLE: char = 'o';
const GAP: char = '_';

/// Renders every live column from row zero down to the deepest row.
///
/// Ground fills from the surface to the bottom, gaps show `_` on the bottom
/// row, and a column holding a collectible shows `o` just above its surface.
pub(crate) fn render_ascii(world: &World) -> String {
    let max_row = query::metrics(world).max_row().get();
    let columns: Vec<_> = query::column_states(world).collect();
    let mut out = String::new();

    for row in 0..=max_row {
        for (column, state) in &columns {
            let glyph = match state.surface() {
                None if row == max_row => GAP,
                None => AIR,
                Some(surface) if row >= surface.get() => SOLID,
                Some(surface)
                    if row + 1 == surface.get()
                        && query::has_prop(world, *column, PropKind::Collectible) =>
                {
                    COLLECTIBLE
                }
                Some(_) => AIR,
            };
            out.push(glyph);
        }
        out.push('\n');
    }

    if let Some((first, end)) = query::column_range(world) {
        let _ = writeln!(out, "columns [{first}, {end}), bottom row {}", Row::new(max_row));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use catwalk_core::{ChunkPlan, Column, ColumnState, Command, EngineHandle, GridMetrics};
    use catwalk_world::apply;

    fn world_with(states: &[ColumnState]) -> World {
        let metrics = GridMetrics::new(100.0, 400.0).expect("metrics");
        let mut world = World::with_metrics(metrics);
        let end = i32::try_from(states.len()).expect("small plan");
        let plan = ChunkPlan::with_states(
            Column::new(0),
            Column::new(end),
            states
                .iter()
                .enumerate()
                .map(|(index, state)| (Column::new(index as i32), *state)),
        );
        let mut events = Vec::new();
        apply(&mut world, Command::CommitColumns { plan }, &mut events);
        world
    }

    #[test]
    fn draws_ground_gaps_and_collectibles() {
        let mut world = world_with(&[
            ColumnState::ground(Row::new(3)),
            ColumnState::ground(Row::new(2)),
            ColumnState::gap(),
            ColumnState::ground(Row::new(3)),
        ]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RecordProp {
                column: Column::new(1),
                kind: PropKind::Collectible,
                handle: EngineHandle::new(1),
            },
            &mut events,
        );

        let rendered = render_ascii(&world);
        let rows: Vec<&str> = rendered.lines().collect();

        assert_eq!(rows[0], "....");
        assert_eq!(rows[1], ".o..");
        assert_eq!(rows[2], ".#..");
        assert_eq!(rows[3], "##_#");
        assert_eq!(rows[4], "columns [0, 4), bottom row 3");
    }

    #[test]
    fn empty_world_renders_blank_rows() {
        let world = World::with_metrics(GridMetrics::new(100.0, 200.0).expect("metrics"));
        assert_eq!(render_ascii(&world), "\n\n");
    }
}
