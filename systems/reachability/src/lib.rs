#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first traversability check for planned chunks.
//!
//! The verifier is the sole acceptance authority for generated terrain. It
//! only trusts the column states of the plan itself: nodes are the walkable
//! columns of the requested range, edges are single steps or jumps across
//! contiguous gap columns, and both are bounded by [`MovementLimits`].

use std::collections::{BTreeSet, VecDeque};

use catwalk_core::{ChunkPlan, Column, FeatureTag, MovementLimits, Row};
use serde::{Deserialize, Serialize};

/// Tunables for the reachability check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    /// A chunk is accepted once a column within this many columns of the
    /// range end has been reached.
    pub exit_window: u32,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self { exit_window: 3 }
    }
}

/// Outcome of verifying a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reachability {
    /// The exit window can be reached from the entry column.
    Reachable {
        /// First walkable column of the range.
        entry: Column,
        /// Column inside the exit window that was reached first.
        exit: Column,
    },
    /// The plan must be rejected.
    Unreachable {
        /// Why the exit window could not be reached.
        reason: UnreachableReason,
    },
}

impl Reachability {
    /// Reports whether the plan was accepted.
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable { .. })
    }
}

/// Reasons a plan fails verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnreachableReason {
    /// The range holds no walkable column at all.
    NoEntry,
    /// The search ran out of edges before the exit window.
    Stranded {
        /// Right-most column the search visited.
        furthest: Column,
    },
}

/// Verifies that the plan's requested range can be traversed left to right.
#[must_use]
pub fn verify(
    plan: &ChunkPlan,
    limits: &MovementLimits,
    config: &ReachabilityConfig,
) -> Reachability {
    let start = plan.start();
    let end = plan.end();

    let Some(entry) = first_walkable(plan) else {
        return Reachability::Unreachable {
            reason: UnreachableReason::NoEntry,
        };
    };

    let exit_threshold = i64::from(end.get()) - i64::from(config.exit_window);
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    let _ = visited.insert(entry);
    queue.push_back(entry);

    while let Some(column) = queue.pop_front() {
        let Some(row) = surface(plan, column) else {
            continue;
        };

        if i64::from(column.get()) >= exit_threshold {
            return Reachability::Reachable { entry, exit: column };
        }

        for landing in landings(plan, column, row, limits) {
            if landing >= end || landing < start {
                continue;
            }
            if visited.insert(landing) {
                queue.push_back(landing);
            }
        }
    }

    let furthest = visited.iter().next_back().copied().unwrap_or(entry);
    Reachability::Unreachable {
        reason: UnreachableReason::Stranded { furthest },
    }
}

fn first_walkable(plan: &ChunkPlan) -> Option<Column> {
    plan.iter()
        .find(|(_, state)| !state.is_gap())
        .map(|(column, _)| column)
}

fn surface(plan: &ChunkPlan, column: Column) -> Option<Row> {
    plan.get(column).and_then(|state| state.surface())
}

fn is_gap_tagged(plan: &ChunkPlan, column: Column) -> bool {
    plan.get(column)
        .is_some_and(|state| state.features().contains(FeatureTag::Gap))
}

/// Columns reachable from `column` by one step or one jump.
fn landings(
    plan: &ChunkPlan,
    column: Column,
    row: Row,
    limits: &MovementLimits,
) -> Vec<Column> {
    let mut found = Vec::new();

    let neighbour = column.offset(1);
    if let Some(next_row) = surface(plan, neighbour) {
        if limits.allows_step(row, next_row) {
            found.push(neighbour);
        }
    }

    for span in 1..=limits.max_gap {
        let span = i32::try_from(span).unwrap_or(i32::MAX);
        if !is_gap_tagged(plan, column.offset(span)) {
            break;
        }
        let landing = column.offset(span + 1);
        if let Some(landing_row) = surface(plan, landing) {
            if limits.allows_step(row, landing_row) {
                found.push(landing);
            }
        }
    }

    found
}
