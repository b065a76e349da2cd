//! Aggregated generator configuration and its validation.

use std::path::PathBuf;

use catwalk_core::{GridError, GridMetrics, MovementLimits, DEFAULT_TILE_SIZE, DEFAULT_WORLD_HEIGHT};
use catwalk_system_materializer::{MaterializerConfig, MaterializerError};
use catwalk_system_planner::PlannerConfig;
use catwalk_system_reachability::ReachabilityConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tile size and world height used to derive [`GridMetrics`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of a square tile in world units.
    pub tile_size: f32,
    /// Height of the playable world in world units.
    pub world_height: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            world_height: DEFAULT_WORLD_HEIGHT,
        }
    }
}

/// Decides which columns fall behind the cleanup horizon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Prune everything further than this many world units behind the player.
    Distance(f32),
    /// Keep only the newest columns, never pruning the player's own column.
    RetainColumns(u32),
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        CleanupPolicy::Distance(600.0)
    }
}

/// Generate-ahead and cleanup tunables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// A chunk is requested once the player is this close to the frontier.
    pub generation_distance: f32,
    /// Cleanup horizon policy.
    pub cleanup: CleanupPolicy,
    /// Generation stops once the frontier reaches this x coordinate.
    pub max_world_width: f32,
    /// Width in world units of the chunk generated before the first tick.
    pub initial_chunk_width: f32,
    /// Plan-and-verify attempts per chunk before giving up for the tick.
    pub max_chunk_attempts: u32,
    /// Seed of the generator's random stream.
    pub seed: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            generation_distance: 400.0,
            cleanup: CleanupPolicy::default(),
            max_world_width: 100_000.0,
            initial_chunk_width: 1_600.0,
            max_chunk_attempts: 3,
            seed: 0x00ca_7a1c,
        }
    }
}

/// Locations of the optional tile data files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileDataConfig {
    /// Compatibility matrix JSON.
    pub matrix: Option<PathBuf>,
    /// Tile categorization map JSON.
    pub tile_map: Option<PathBuf>,
}

/// Complete generator configuration. Every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Grid geometry.
    pub grid: GridConfig,
    /// Movement tolerances the terrain must respect.
    pub limits: MovementLimits,
    /// Chunk planning tunables.
    pub planner: PlannerConfig,
    /// Reachability tunables.
    pub reachability: ReachabilityConfig,
    /// Tile and prop placement tunables.
    pub materializer: MaterializerConfig,
    /// Generate-ahead and cleanup tunables.
    pub lifecycle: LifecycleConfig,
    /// Optional tile data files.
    pub tiles: TileDataConfig,
}

/// Reasons a configuration is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Grid geometry is invalid.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// A placement setting is invalid.
    #[error(transparent)]
    Materializer(#[from] MaterializerError),
    /// A distance must be finite and strictly positive.
    #[error("{name} must be finite and positive (received {value})")]
    NonPositiveDistance {
        /// Name of the offending setting.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// A probability lies outside `[0, 1]`.
    #[error("{name} must lie within [0, 1] (received {value})")]
    InvalidChance {
        /// Name of the offending setting.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A count that bounds a loop or window must be at least one.
    #[error("{name} must be at least 1")]
    Zero {
        /// Name of the offending setting.
        name: &'static str,
    },
}

impl GeneratorConfig {
    /// Checks every setting, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let _ = self.metrics()?;

        let lifecycle = &self.lifecycle;
        positive("generation_distance", lifecycle.generation_distance)?;
        positive("max_world_width", lifecycle.max_world_width)?;
        positive("initial_chunk_width", lifecycle.initial_chunk_width)?;
        match lifecycle.cleanup {
            CleanupPolicy::Distance(distance) => positive("cleanup.distance", distance)?,
            CleanupPolicy::RetainColumns(columns) => nonzero("cleanup.retain_columns", columns)?,
        }
        nonzero("max_chunk_attempts", lifecycle.max_chunk_attempts)?;
        nonzero("max_pattern_attempts", self.planner.max_pattern_attempts)?;
        nonzero("exit_window", self.reachability.exit_window)?;

        let materializer = &self.materializer;
        probability("decoration_chance", materializer.decoration_chance)?;
        probability("collectible_chance", materializer.collectible_chance)?;
        nonzero("decoration_variants", materializer.decoration_variants)?;
        if !materializer.collectible_lift.is_finite() {
            return Err(ConfigError::NonPositiveDistance {
                name: "collectible_lift",
                value: materializer.collectible_lift,
            });
        }
        Ok(())
    }

    /// Grid metrics derived from the grid section.
    pub fn metrics(&self) -> Result<GridMetrics, ConfigError> {
        Ok(GridMetrics::new(self.grid.tile_size, self.grid.world_height)?)
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveDistance { name, value })
    }
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidChance { name, value })
    }
}

fn nonzero(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { name })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(GeneratorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GeneratorConfig = toml::from_str(
            r#"
            [limits]
            max_gap = 1

            [lifecycle]
            seed = 42
            cleanup = { retain_columns = 40 }
            "#,
        )
        .expect("config parses");

        assert_eq!(config.limits, MovementLimits::new(1, 2, 1));
        assert_eq!(config.lifecycle.seed, 42);
        assert_eq!(config.lifecycle.cleanup, CleanupPolicy::RetainColumns(40));
        assert_eq!(config.lifecycle.generation_distance, 400.0);
        assert_eq!(config.planner.start_zone_columns, 5);
        assert_eq!(config.materializer.fallback_tile.as_str(), "tile-2");
    }

    #[test]
    fn distance_cleanup_accepts_integer_toml() {
        let config: GeneratorConfig = toml::from_str("[lifecycle]\ncleanup = { distance = 900 }\n")
            .expect("config parses");
        assert_eq!(config.lifecycle.cleanup, CleanupPolicy::Distance(900.0));
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let mut config = GeneratorConfig::default();
        config.materializer.collectible_chance = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChance {
                name: "collectible_chance",
                ..
            })
        ));

        let mut config = GeneratorConfig::default();
        config.reachability.exit_window = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                name: "exit_window"
            })
        );

        let mut config = GeneratorConfig::default();
        config.lifecycle.cleanup = CleanupPolicy::Distance(f32::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveDistance {
                name: "cleanup.distance",
                ..
            })
        ));

        let mut config = GeneratorConfig::default();
        config.grid.tile_size = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Grid(_))));
    }
}
