#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Engine contract for Catwalk adapters and a headless in-memory engine.
//!
//! The generator never owns sprites, physics bodies or textures. It asks the
//! host engine to create objects, keeps the returned [`EngineHandle`] values in
//! the world, and hands them back for destruction once they fall behind the
//! cleanup horizon.

use std::collections::{BTreeMap, BTreeSet};

use catwalk_core::{EngineHandle, SpriteKey};
use glam::Vec2;
use thiserror::Error;

/// Failures reported when the engine cannot create a solid tile.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The requested texture is not loaded.
    #[error("tile texture {variant} does not exist")]
    MissingTexture {
        /// Variant that was requested.
        variant: SpriteKey,
    },
}

/// Services the generator requires from the host engine.
pub trait Engine {
    /// Creates a solid, collidable tile centred on `position`.
    fn place_solid(
        &mut self,
        position: Vec2,
        variant: &SpriteKey,
    ) -> Result<EngineHandle, EngineError>;

    /// Creates a non-colliding decoration anchored at `position`.
    fn place_decoration(&mut self, position: Vec2, variant: &SpriteKey) -> EngineHandle;

    /// Creates a collectible centred on `position`.
    fn spawn_collectible(&mut self, position: Vec2) -> EngineHandle;

    /// Releases the object owned by `handle`.
    fn destroy(&mut self, handle: EngineHandle);

    /// Current horizontal position of the player in world units.
    fn player_x(&self) -> f32;
}

/// Kind of object held by the headless engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Collidable tile.
    Solid {
        /// Texture the tile uses.
        variant: SpriteKey,
    },
    /// Visual-only decoration.
    Decoration {
        /// Texture the decoration uses.
        variant: SpriteKey,
    },
    /// Pickup.
    Collectible,
}

/// Object tracked by the headless engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineObject {
    /// Kind of object.
    pub kind: ObjectKind,
    /// Anchor position in world units.
    pub position: Vec2,
}

/// Running totals of engine calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Objects successfully created.
    pub created: u64,
    /// Objects destroyed.
    pub destroyed: u64,
    /// Solid placements refused.
    pub failed_placements: u64,
    /// Destroy calls for handles that were not live.
    pub stale_destroys: u64,
}

/// Engine that keeps every object in memory and moves the player on demand.
#[derive(Clone, Debug, Default)]
pub struct HeadlessEngine {
    next_handle: u64,
    objects: BTreeMap<EngineHandle, EngineObject>,
    missing_textures: BTreeSet<SpriteKey>,
    player_x: f32,
    stats: EngineStats,
}

impl HeadlessEngine {
    /// Creates an empty engine with the player at `player_x`.
    #[must_use]
    pub fn new(player_x: f32) -> Self {
        Self {
            player_x,
            ..Self::default()
        }
    }

    /// Marks a texture as unavailable so solid placements using it fail.
    #[must_use]
    pub fn with_missing_texture(mut self, variant: SpriteKey) -> Self {
        let _ = self.missing_textures.insert(variant);
        self
    }

    /// Teleports the player.
    pub fn set_player_x(&mut self, x: f32) {
        self.player_x = x;
    }

    /// Moves the player horizontally by `dx` world units.
    pub fn advance_player(&mut self, dx: f32) {
        self.player_x += dx;
    }

    /// Object owned by `handle`, if it is live.
    #[must_use]
    pub fn object(&self, handle: EngineHandle) -> Option<&EngineObject> {
        self.objects.get(&handle)
    }

    /// Iterates over live objects in creation order.
    pub fn objects(&self) -> impl Iterator<Item = (EngineHandle, &EngineObject)> {
        self.objects.iter().map(|(handle, object)| (*handle, object))
    }

    /// Number of live objects.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.objects.len()
    }

    /// Running totals of engine calls.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Live collectibles whose horizontal distance to the player is within `reach`.
    #[must_use]
    pub fn collectibles_within(&self, reach: f32) -> Vec<EngineHandle> {
        self.objects
            .iter()
            .filter(|(_, object)| {
                object.kind == ObjectKind::Collectible
                    && (object.position.x - self.player_x).abs() <= reach
            })
            .map(|(handle, _)| *handle)
            .collect()
    }

    fn insert(&mut self, kind: ObjectKind, position: Vec2) -> EngineHandle {
        self.next_handle += 1;
        let handle = EngineHandle::new(self.next_handle);
        let _ = self.objects.insert(handle, EngineObject { kind, position });
        self.stats.created += 1;
        handle
    }
}

impl Engine for HeadlessEngine {
    fn place_solid(
        &mut self,
        position: Vec2,
        variant: &SpriteKey,
    ) -> Result<EngineHandle, EngineError> {
        if self.missing_textures.contains(variant) {
            self.stats.failed_placements += 1;
            return Err(EngineError::MissingTexture {
                variant: variant.clone(),
            });
        }
        Ok(self.insert(
            ObjectKind::Solid {
                variant: variant.clone(),
            },
            position,
        ))
    }

    fn place_decoration(&mut self, position: Vec2, variant: &SpriteKey) -> EngineHandle {
        self.insert(
            ObjectKind::Decoration {
                variant: variant.clone(),
            },
            position,
        )
    }

    fn spawn_collectible(&mut self, position: Vec2) -> EngineHandle {
        self.insert(ObjectKind::Collectible, position)
    }

    fn destroy(&mut self, handle: EngineHandle) {
        if self.objects.remove(&handle).is_some() {
            self.stats.destroyed += 1;
        } else {
            self.stats.stale_destroys += 1;
            log::debug!("ignored destroy for unknown handle {}", handle.get());
        }
    }

    fn player_x(&self) -> f32 {
        self.player_x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_destroyable() {
        let mut engine = HeadlessEngine::new(0.0);
        let solid = engine
            .place_solid(Vec2::new(10.0, 20.0), &SpriteKey::new("tile-2"))
            .expect("texture exists");
        let bone = engine.place_decoration(Vec2::ZERO, &SpriteKey::new("bone-1"));
        assert_ne!(solid, bone);
        assert_eq!(engine.live_count(), 2);

        engine.destroy(solid);
        engine.destroy(solid);

        assert_eq!(engine.live_count(), 1);
        let live: Vec<_> = engine
            .objects()
            .map(|(handle, object)| (handle, object.kind.clone()))
            .collect();
        assert_eq!(
            live,
            vec![(
                bone,
                ObjectKind::Decoration {
                    variant: SpriteKey::new("bone-1")
                }
            )]
        );
        assert_eq!(
            engine.stats(),
            EngineStats {
                created: 2,
                destroyed: 1,
                failed_placements: 0,
                stale_destroys: 1,
            }
        );
    }

    #[test]
    fn missing_texture_fails_placement() {
        let mut engine = HeadlessEngine::new(0.0).with_missing_texture(SpriteKey::new("tile-2"));
        let result = engine.place_solid(Vec2::ZERO, &SpriteKey::new("tile-2"));
        assert_eq!(
            result,
            Err(EngineError::MissingTexture {
                variant: SpriteKey::new("tile-2")
            })
        );
        assert_eq!(engine.live_count(), 0);
    }

    #[test]
    fn collectibles_within_reach_follow_player() {
        let mut engine = HeadlessEngine::new(0.0);
        let near = engine.spawn_collectible(Vec2::new(30.0, 100.0));
        let _far = engine.spawn_collectible(Vec2::new(300.0, 100.0));

        assert_eq!(engine.collectibles_within(40.0), vec![near]);
        engine.advance_player(270.0);
        assert_eq!(engine.collectibles_within(40.0).len(), 1);
        assert_ne!(engine.collectibles_within(40.0), vec![near]);
    }
}
