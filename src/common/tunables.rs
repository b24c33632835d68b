//! Engine-wide tunable constants (`SPEC_FULL.md` §2 "Config").
//!
//! A single `Resource` keeping runtime-adjustable numbers in one place rather than
//! scattered as magic numbers through the systems that use them.

use bevy::prelude::*;

/// Collision-world query defaults and kinematic-resolution constants that aren't derived
/// per-entity from a `KinematicResolutionConfig`.
#[derive(Resource, Debug, Clone)]
pub struct Tunables {
    /// Length unit avian2d's solver is configured with (`PhysicsPlugins::with_length_unit`).
    pub pixels_per_meter: f32,
    /// Minimum separation a kinematic correction leaves between a mover and what it hit;
    /// prevents correction/cast churn from landing exactly on the surface and
    /// re-triggering a cast next tick.
    pub skin_width: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self { pixels_per_meter: 20.0, skin_width: 0.01 }
    }
}
