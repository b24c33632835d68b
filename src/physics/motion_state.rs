//! Motion-state duality (`spec.md` §9 "Motion-state duality"): an entity's world matrix
//! is authored either by gameplay code (script-driven movement, the common case) or by the
//! collision world itself (ragdoll-style bodies the solver integrates). `MotionState`
//! records which direction the per-tick sync runs in, so the bridge doesn't fight the
//! solver over who owns position.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::collision_component::Kinematic;
use crate::registry::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionSyncMode {
    /// Gameplay/script code writes `Transform`; the bridge forwards it to the collision
    /// world every tick (`spec.md` §4.C step 1). This is the default for kinematic movers.
    #[default]
    WriteToEngine,
    /// The collision world integrates the body; the bridge copies its resulting pose back
    /// onto `Transform` every tick (`spec.md` §4.C step 3).
    ReadFromEngine,
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MotionState {
    pub mode: MotionSyncMode,
}

/// `spec.md` §4.C step 1: for every entity whose transform changed since the last tick,
/// push the new world matrix to the collision world unless it's in `ReadFromEngine` mode.
///
/// Leaves the event flag set: `resolve_kinematic_casts` (`FixedPostUpdate`, after the
/// solver step) still needs to see "changed this tick" to decide which movers to cast for,
/// and is the one that clears it once the whole step-4/step-5 pipeline is done with it.
pub fn forward_transform_changes(
    mut query: Query<(&mut Transform, &mut Position, &mut Rotation, Option<&MotionState>)>,
) {
    for (mut transform, mut position, mut rotation, motion_state) in &mut query {
        if !transform.event_flag() {
            continue;
        }

        if matches!(motion_state.map(|m| m.mode), Some(MotionSyncMode::ReadFromEngine)) {
            continue;
        }

        let world = transform.world_matrix();
        let (_, rotation_quat, translation) = world.to_scale_rotation_translation();

        position.0 = translation.truncate();
        *rotation = Rotation::radians(rotation_quat.to_euler(bevy::math::EulerRot::XYZ).2);
    }
}

/// `spec.md` §4.C step 3: for `ReadFromEngine` bodies, copy the collision world's resulting
/// matrix back onto `Transform`.
pub fn retrieve_engine_writes(
    mut query: Query<(&mut Transform, &Position, &Rotation, &MotionState), Without<Kinematic>>,
) {
    for (mut transform, position, rotation, motion_state) in &mut query {
        if motion_state.mode != MotionSyncMode::ReadFromEngine {
            continue;
        }

        let parent_world = bevy::math::Mat4::IDENTITY;
        let world = bevy::math::Mat4::from_rotation_translation(
            Quat::from_rotation_z(rotation.as_radians()),
            position.0.extend(0.0),
        );

        transform.set_from_world_matrix(parent_world, world);
        transform.clear_event_flag();
    }
}
