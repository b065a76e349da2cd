#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Column pattern grammar and chunk planning.
//!
//! The planner turns a requested column range into a [`ChunkPlan`] by
//! stitching together small terrain patterns. It never touches the world:
//! callers supply the surface row that precedes the range and receive a
//! candidate plan that still has to pass reachability verification before it
//! can be committed.

use catwalk_core::{
    ChunkPlan, Column, ColumnState, FeatureTag, GridMetrics, MovementLimits, Row,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tunables that shape how chunks are planned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Columns at the start of the world that always use flat ground.
    pub start_zone_columns: u32,
    /// Random pattern picks attempted before falling back to flat ground.
    pub max_pattern_attempts: u32,
}

impl PlannerConfig {
    /// Reports whether the column lies inside the protected start zone.
    #[must_use]
    pub fn in_start_zone(&self, column: Column) -> bool {
        i64::from(column.get()) < i64::from(self.start_zone_columns)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            start_zone_columns: 5,
            max_pattern_attempts: 8,
        }
    }
}

/// Named terrain fragments the planner stitches together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Single column of ground at the previous height.
    Flat,
    /// Two ground columns climbing one row.
    StairsUp2,
    /// Two ground columns descending one row.
    StairsDown2,
    /// One gap column followed by a landing at the previous height.
    Gap1,
    /// Two gap columns followed by a landing at the previous height.
    Gap2,
}

impl Pattern {
    /// Every pattern in catalog order.
    pub const ALL: [Pattern; 5] = [
        Pattern::Flat,
        Pattern::StairsUp2,
        Pattern::StairsDown2,
        Pattern::Gap1,
        Pattern::Gap2,
    ];

    /// Stable identifier of the pattern.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Pattern::Flat => "flat",
            Pattern::StairsUp2 => "stairsUp2",
            Pattern::StairsDown2 => "stairsDown2",
            Pattern::Gap1 => "gap1",
            Pattern::Gap2 => "gap2",
        }
    }

    /// Number of consecutive columns the pattern emits.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Pattern::Flat => 1,
            Pattern::StairsUp2 | Pattern::StairsDown2 | Pattern::Gap1 => 2,
            Pattern::Gap2 => 3,
        }
    }

    /// Builds the pattern's columns starting at `start`.
    ///
    /// `prev_surface` is the surface row preceding the pattern; `None` resolves
    /// to the default ground row. Returns `None` when the pattern cannot be
    /// placed under the grid bounds or movement limits.
    #[must_use]
    pub fn build(
        self,
        prev_surface: Option<Row>,
        start: Column,
        metrics: &GridMetrics,
        limits: &MovementLimits,
    ) -> Option<Vec<(Column, ColumnState)>> {
        let base = metrics.clamp_row(prev_surface);
        match self {
            Pattern::Flat => Some(vec![(start, ColumnState::ground(base))]),
            Pattern::StairsUp2 => {
                if limits.max_up_step < 1 {
                    return None;
                }
                let upper = base.above()?;
                Some(vec![
                    (
                        start,
                        ColumnState::ground(base).with_feature(FeatureTag::StairUp),
                    ),
                    (
                        start.offset(1),
                        ColumnState::ground(upper).with_feature(FeatureTag::StairUp),
                    ),
                ])
            }
            Pattern::StairsDown2 => {
                let lower = base.below();
                if lower > metrics.max_row() || limits.max_down_step < 1 {
                    return None;
                }
                Some(vec![
                    (
                        start,
                        ColumnState::ground(base).with_feature(FeatureTag::StairDown),
                    ),
                    (
                        start.offset(1),
                        ColumnState::ground(lower).with_feature(FeatureTag::StairDown),
                    ),
                ])
            }
            Pattern::Gap1 => {
                if limits.max_gap < 1 {
                    return None;
                }
                Some(vec![
                    (start, ColumnState::gap()),
                    (start.offset(1), ColumnState::ground(base)),
                ])
            }
            Pattern::Gap2 => {
                if limits.max_gap < 2 {
                    return None;
                }
                Some(vec![
                    (start, ColumnState::gap()),
                    (start.offset(1), ColumnState::gap()),
                    (start.offset(2), ColumnState::ground(base)),
                ])
            }
        }
    }

    fn fits(self, start: Column, end: Column) -> bool {
        i64::from(start.get()) + i64::from(self.width()) <= i64::from(end.get())
    }
}

/// Pattern selected for a position together with the columns it produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternPick {
    /// Pattern that was selected.
    pub pattern: Pattern,
    /// Columns emitted by the pattern, in ascending order.
    pub columns: Vec<(Column, ColumnState)>,
}

/// Plans candidate column states for requested ranges.
#[derive(Clone, Debug)]
pub struct Planner {
    config: PlannerConfig,
    metrics: GridMetrics,
    limits: MovementLimits,
}

impl Planner {
    /// Creates a planner for the provided grid and movement limits.
    #[must_use]
    pub fn new(config: PlannerConfig, metrics: GridMetrics, limits: MovementLimits) -> Self {
        Self {
            config,
            metrics,
            limits,
        }
    }

    /// Picks a random pattern that fits inside `[start, end)`.
    ///
    /// Falls back to [`Pattern::Flat`] once every attempt produced an illegal
    /// build, and returns `None` when no pattern fits the remaining width.
    pub fn pick_pattern<R: Rng + ?Sized>(
        &self,
        prev_surface: Option<Row>,
        start: Column,
        end: Column,
        rng: &mut R,
    ) -> Option<PatternPick> {
        let available: Vec<Pattern> = Pattern::ALL
            .into_iter()
            .filter(|pattern| pattern.fits(start, end))
            .collect();
        if available.is_empty() {
            return None;
        }

        for _ in 0..self.config.max_pattern_attempts {
            let pattern = available[rng.gen_range(0..available.len())];
            if let Some(columns) = self.build(pattern, prev_surface, start) {
                return Some(PatternPick { pattern, columns });
            }
        }

        log::trace!("pattern attempts exhausted at column {start}, falling back to flat");
        if !available.contains(&Pattern::Flat) {
            return None;
        }
        self.build(Pattern::Flat, prev_surface, start)
            .map(|columns| PatternPick {
                pattern: Pattern::Flat,
                columns,
            })
    }

    /// Plans column states for `[start, end)` following `prev_surface`.
    ///
    /// Columns inside the start zone are always flat. Planning stops early,
    /// without error, once no pattern fits the remaining width.
    pub fn generate_column_states<R: Rng + ?Sized>(
        &self,
        start: Column,
        end: Column,
        prev_surface: Option<Row>,
        rng: &mut R,
    ) -> ChunkPlan {
        let mut plan = ChunkPlan::new(start, end);
        let mut previous = prev_surface;
        let mut column = start;

        while column < end {
            let picked = if self.config.in_start_zone(column) {
                self.build(Pattern::Flat, previous, column)
                    .map(|columns| PatternPick {
                        pattern: Pattern::Flat,
                        columns,
                    })
            } else {
                self.pick_pattern(previous, column, end, rng)
            };
            let Some(picked) = picked else {
                break;
            };

            for (planned, state) in picked.columns {
                if let Some(surface) = state.surface() {
                    previous = Some(surface);
                }
                plan.insert(planned, state);
            }
            column = column.offset(picked.pattern.width() as i32);
        }

        plan
    }

    fn build(
        &self,
        pattern: Pattern,
        prev_surface: Option<Row>,
        start: Column,
    ) -> Option<Vec<(Column, ColumnState)>> {
        pattern.build(prev_surface, start, &self.metrics, &self.limits)
    }
}
