//! Kinematic Physics Bridge (`spec.md` §4.C): collision groups/masks, kinematic resolution
//! config, motion-state sync, and the per-tick bridge itself, layered over avian2d.

pub mod bridge;
pub mod collision_component;
pub mod collision_group;
pub mod kinematic;
pub mod motion_state;

pub use collision_component::{
    CollisionComponentBuilder, CollisionComponentError, CollisionProfile, Kinematic, KinematicMass,
};
pub use collision_group::{CollisionConfig, CollisionGroup, EntityType};
pub use kinematic::{CastMethod, KinematicCastAnchor, KinematicResolutionConfig, SizePolicy};
pub use motion_state::{MotionState, MotionSyncMode};

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::registry;

pub fn plugin(app: &mut App) {
    // Re-run propagation right before forwarding to the collision world: `PostUpdate`
    // (where `registry::plugin` otherwise runs it for gameplay/script consumers) falls
    // after `FixedPostUpdate` in Bevy's default frame order, one tick too late for a
    // transform edited this same tick to reach `forward_transform_changes` below. Cheap to
    // repeat; the dirty bits make a clean call a no-op.
    app.add_systems(
        FixedPreUpdate,
        (registry::propagate_transforms_system, motion_state::forward_transform_changes)
            .chain()
            .before(PhysicsSystems::StepSimulation),
    );
    app.add_systems(
        FixedPostUpdate,
        motion_state::retrieve_engine_writes.after(PhysicsSystems::StepSimulation),
    );
    bridge::plugin(app);
}
