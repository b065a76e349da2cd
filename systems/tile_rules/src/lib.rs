#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cosmetic tile selection driven by optional edge-compatibility data.
//!
//! Tile rules never influence traversability. When no compatibility matrix or
//! tile map is available every lookup yields [`Compatibility::Unknown`] and
//! tile selection degrades to the configured fallback variant.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use catwalk_core::SpriteKey;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Variant used whenever no better tile can be selected.
pub const DEFAULT_FALLBACK_TILE: &str = "tile-2";

const DECORATION_CATEGORY: &str = "Background/Decoration";
const EDGE_CATEGORY: &str = "Edges";
const TOP_SUBCATEGORY: &str = "top";

/// Side of a tile that touches a neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Neighbour to the right.
    Right,
    /// Neighbour to the left.
    Left,
    /// Neighbour above.
    Top,
    /// Neighbour below.
    Bottom,
}

/// Result of a compatibility lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compatibility {
    /// The data declares the edges compatible.
    Compatible,
    /// The data declares the edges incompatible.
    Incompatible,
    /// No data covers the pair.
    Unknown,
}

impl Compatibility {
    /// Reports whether the pair may be placed side by side; unknown pairs are allowed.
    #[must_use]
    pub const fn allows(self) -> bool {
        !matches!(self, Compatibility::Incompatible)
    }
}

/// Edge entry of the compatibility matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeRule {
    /// Plain boolean verdict.
    Flag(bool),
    /// Scored verdict produced by the edge analyzer.
    Detailed(EdgeDetail),
}

/// Scored edge verdict.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeDetail {
    /// Explicit verdict; a missing verdict counts as compatible.
    #[serde(default)]
    pub compatible: Option<bool>,
    /// Similarity score reported by the analyzer.
    #[serde(default)]
    pub score: Option<f32>,
}

impl EdgeRule {
    fn verdict(&self) -> Compatibility {
        let compatible = match self {
            EdgeRule::Flag(flag) => *flag,
            EdgeRule::Detailed(detail) => detail.compatible != Some(false),
        };
        if compatible {
            Compatibility::Compatible
        } else {
            Compatibility::Incompatible
        }
    }
}

/// Per-direction edge entries between an ordered pair of tiles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeRules {
    /// First tile's right edge against the second tile's left edge.
    pub right: Option<EdgeRule>,
    /// First tile's left edge against the second tile's right edge.
    pub left: Option<EdgeRule>,
    /// First tile's top edge against the second tile's bottom edge.
    pub top: Option<EdgeRule>,
    /// First tile's bottom edge against the second tile's top edge.
    pub bottom: Option<EdgeRule>,
}

impl EdgeRules {
    fn get(&self, direction: Direction) -> Option<&EdgeRule> {
        match direction {
            Direction::Right => self.right.as_ref(),
            Direction::Left => self.left.as_ref(),
            Direction::Top => self.top.as_ref(),
            Direction::Bottom => self.bottom.as_ref(),
        }
    }
}

/// Pre-computed compatibility verdicts keyed by tile, then neighbour.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatibilityMatrix {
    entries: BTreeMap<SpriteKey, BTreeMap<SpriteKey, EdgeRules>>,
}

impl CompatibilityMatrix {
    /// Parses a matrix from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Looks up the verdict for `tile`'s `direction` edge against `other`.
    #[must_use]
    pub fn compatibility(
        &self,
        tile: &SpriteKey,
        direction: Direction,
        other: &SpriteKey,
    ) -> Compatibility {
        self.entries
            .get(tile)
            .and_then(|row| row.get(other))
            .and_then(|rules| rules.get(direction))
            .map_or(Compatibility::Unknown, EdgeRule::verdict)
    }

    /// Neighbours explicitly declared compatible on the given side of `tile`.
    #[must_use]
    pub fn compatible_tiles(&self, tile: &SpriteKey, direction: Direction) -> Vec<&SpriteKey> {
        let Some(row) = self.entries.get(tile) else {
            return Vec::new();
        };
        row.iter()
            .filter(|(_, rules)| {
                rules
                    .get(direction)
                    .is_some_and(|rule| rule.verdict() == Compatibility::Compatible)
            })
            .map(|(other, _)| other)
            .collect()
    }

    /// Tiles that have a row in the matrix.
    pub fn tiles(&self) -> impl Iterator<Item = &SpriteKey> {
        self.entries.keys()
    }
}

/// Categorization of a single tile texture.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    /// Broad category such as `Edges` or `Solid Ground`.
    #[serde(default)]
    pub category: Option<String>,
    /// Refinement such as `top` for edge tiles.
    #[serde(default)]
    pub subcategory: Option<String>,
}

impl TileInfo {
    fn is_decoration(&self) -> bool {
        self.category.as_deref() == Some(DECORATION_CATEGORY)
    }

    fn is_top_edge(&self) -> bool {
        self.category.as_deref() == Some(EDGE_CATEGORY)
            && self.subcategory.as_deref() == Some(TOP_SUBCATEGORY)
    }
}

/// Tile categorization map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    /// Categorization keyed by tile variant.
    #[serde(default)]
    pub tiles: BTreeMap<SpriteKey, TileInfo>,
}

impl TileMap {
    /// Parses a tile map from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Failures while loading tile data.
#[derive(Debug, Error)]
pub enum TileRulesError {
    /// The data file could not be read.
    #[error("failed to read tile data from {}", .path.display())]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The data file is not valid JSON of the expected shape.
    #[error("malformed tile data in {}", .path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and parses a compatibility matrix file.
pub fn read_matrix(path: &Path) -> Result<CompatibilityMatrix, TileRulesError> {
    let contents = read(path)?;
    CompatibilityMatrix::from_json(&contents).map_err(|source| TileRulesError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and parses a tile categorization map file.
pub fn read_tile_map(path: &Path) -> Result<TileMap, TileRulesError> {
    let contents = read(path)?;
    TileMap::from_json(&contents).map_err(|source| TileRulesError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String, TileRulesError> {
    fs::read_to_string(path).map_err(|source| TileRulesError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Chooses tile variants for solid cells.
#[derive(Clone, Debug)]
pub struct TileRules {
    fallback: SpriteKey,
    matrix: Option<CompatibilityMatrix>,
    tile_map: Option<TileMap>,
}

impl TileRules {
    /// Creates rules without data that always select `fallback`.
    #[must_use]
    pub fn new(fallback: SpriteKey) -> Self {
        Self {
            fallback,
            matrix: None,
            tile_map: None,
        }
    }

    /// Loads the optional data files, degrading to the fallback on failure.
    #[must_use]
    pub fn load(
        fallback: SpriteKey,
        matrix_path: Option<&Path>,
        tile_map_path: Option<&Path>,
    ) -> Self {
        let mut rules = Self::new(fallback);
        if let Some(path) = matrix_path {
            match read_matrix(path) {
                Ok(matrix) => {
                    log::info!("loaded tile compatibility matrix from {}", path.display());
                    rules.matrix = Some(matrix);
                }
                Err(error) => log::warn!("{error}; tiles fall back to {}", rules.fallback),
            }
        }
        if let Some(path) = tile_map_path {
            match read_tile_map(path) {
                Ok(map) => {
                    log::info!("loaded tile categorization map from {}", path.display());
                    rules.tile_map = Some(map);
                }
                Err(error) => log::warn!("{error}; tile categories are ignored"),
            }
        }
        rules
    }

    /// Attaches a compatibility matrix.
    #[must_use]
    pub fn with_matrix(mut self, matrix: CompatibilityMatrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Attaches a tile categorization map.
    #[must_use]
    pub fn with_tile_map(mut self, tile_map: TileMap) -> Self {
        self.tile_map = Some(tile_map);
        self
    }

    /// Compatibility of `tile`'s `direction` edge against `other`.
    #[must_use]
    pub fn compatibility(
        &self,
        tile: &SpriteKey,
        direction: Direction,
        other: &SpriteKey,
    ) -> Compatibility {
        self.matrix
            .as_ref()
            .map_or(Compatibility::Unknown, |matrix| {
                matrix.compatibility(tile, direction, other)
            })
    }

    /// Selects a surface tile variant given the tile to its left, if any.
    ///
    /// Candidates come from the matrix (or the tile map when no matrix is
    /// loaded), excluding decoration textures. Top-edge tiles are preferred
    /// when the map identifies any. Tiles the matrix declares compatible with
    /// the left neighbour's right edge win over undeclared ones; without such
    /// declarations only explicitly incompatible candidates are dropped.
    pub fn choose_tile<R: Rng + ?Sized>(&self, left: Option<&SpriteKey>, rng: &mut R) -> SpriteKey {
        let mut candidates = self.candidates();
        if candidates.is_empty() {
            return self.fallback.clone();
        }

        if let Some(map) = &self.tile_map {
            let is_top = |key: &SpriteKey| map.tiles.get(key).is_some_and(TileInfo::is_top_edge);
            if candidates.iter().any(|key| is_top(*key)) {
                candidates.retain(|key| is_top(*key));
            }
        }

        if let Some(left) = left {
            let declared = self
                .matrix
                .as_ref()
                .map(|matrix| matrix.compatible_tiles(left, Direction::Right))
                .unwrap_or_default();
            if candidates.iter().any(|key| declared.contains(key)) {
                candidates.retain(|key| declared.contains(key));
            } else {
                candidates.retain(|key| self.compatibility(left, Direction::Right, key).allows());
            }
        }

        if candidates.is_empty() {
            return self.fallback.clone();
        }
        candidates[rng.gen_range(0..candidates.len())].clone()
    }

    fn candidates(&self) -> Vec<&SpriteKey> {
        let is_decoration = |key: &SpriteKey| {
            self.tile_map
                .as_ref()
                .and_then(|map| map.tiles.get(key))
                .is_some_and(TileInfo::is_decoration)
        };

        match (&self.matrix, &self.tile_map) {
            (Some(matrix), _) => matrix.tiles().filter(|key| !is_decoration(*key)).collect(),
            (None, Some(map)) => map.tiles.keys().filter(|key| !is_decoration(*key)).collect(),
            (None, None) => Vec::new(),
        }
    }
}

impl Default for TileRules {
    fn default() -> Self {
        Self::new(SpriteKey::new(DEFAULT_FALLBACK_TILE))
    }
}
