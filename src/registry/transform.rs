//! Local/world transform component with explicit dirty-bit caching
//! (`spec.md` §3 "Transform component").
//!
//! Deliberately not `bevy::prelude::Transform`: the `{M, W, IW, EventFlag}`
//! dirty-bitset and the requirement that invalidating `W` transitively invalidates every
//! descendant's `W` are not expressible with Bevy's built-in `GlobalTransform`
//! propagation, which always recomputes unconditionally from `Changed<Transform>`.

use bevy::math::{Mat3, Mat4, Quat, Vec3};
use bevy::prelude::*;
use bitflags::bitflags;

use super::relationship::Relationship;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// Local matrix needs to be rebuilt from translation/scale/basis.
        const LOCAL = 1 << 0;
        /// World matrix needs to be rebuilt from parent.world * local.
        const WORLD = 1 << 1;
        /// Inverse-world matrix needs to be rebuilt from world.
        const INVERSE_WORLD = 1 << 2;
        /// Set on any change the physics bridge should observe; cleared by the bridge.
        const EVENT = 1 << 3;
    }
}

/// Local translation/scale/orientation plus cached local/world/inverse-world matrices.
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    translation: Vec3,
    scale: Vec3,
    basis: Mat3,

    local: Mat4,
    world: Mat4,
    inverse_world: Mat4,

    dirty: DirtyFlags,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            basis: Mat3::IDENTITY,
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            inverse_world: Mat4::IDENTITY,
            dirty: DirtyFlags::LOCAL | DirtyFlags::WORLD | DirtyFlags::INVERSE_WORLD | DirtyFlags::EVENT,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn basis(&self) -> Mat3 {
        self.basis
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.mark_changed();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.set_translation(self.translation + delta);
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.mark_changed();
    }

    pub fn set_orientation(&mut self, rotation: Quat) {
        self.basis = Mat3::from_quat(rotation);
        self.mark_changed();
    }

    fn mark_changed(&mut self) {
        self.dirty |= DirtyFlags::LOCAL | DirtyFlags::WORLD | DirtyFlags::INVERSE_WORLD | DirtyFlags::EVENT;
    }

    /// True if a change was made since this flag was last cleared by the bridge.
    pub fn event_flag(&self) -> bool {
        self.dirty.contains(DirtyFlags::EVENT)
    }

    pub fn clear_event_flag(&mut self) {
        self.dirty.remove(DirtyFlags::EVENT);
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.local
    }

    pub fn inverse_world_matrix(&mut self) -> Mat4 {
        if self.dirty.contains(DirtyFlags::INVERSE_WORLD) {
            self.inverse_world = self.world.inverse();
            self.dirty.remove(DirtyFlags::INVERSE_WORLD);
        }
        self.inverse_world
    }

    pub fn world_position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    /// Sets translation/scale/basis directly from a world matrix, without going through
    /// `set_translation`/`set_scale`/`set_orientation` — used by `rebase_preserving_world`
    /// when reparenting, and by the motion-state write-back from the collision world.
    pub fn set_from_world_matrix(&mut self, parent_world: Mat4, world: Mat4) {
        let local = parent_world.inverse() * world;
        let (scale, rotation, translation) = local.to_scale_rotation_translation();

        self.translation = translation;
        self.scale = scale;
        self.basis = Mat3::from_quat(rotation);
        self.mark_changed();
    }

    fn rebuild_local_if_dirty(&mut self) {
        if self.dirty.contains(DirtyFlags::LOCAL) {
            self.local = Mat4::from_scale_rotation_translation(
                self.scale,
                Quat::from_mat3(&self.basis),
                self.translation,
            );
            self.dirty.remove(DirtyFlags::LOCAL);
        }
    }
}

/// Walks the relationship tree from roots downward, rebuilding local matrices as needed
/// and recomputing world matrices for any entity whose `W` flag is set *or* whose parent
/// just recomputed its world matrix this tick (`spec.md` invariant: "invalidating `W` on
/// an entity transitively invalidates `W` on all descendants").
pub fn propagate_world_transforms(world: &mut World) {
    let roots: Vec<Entity> = {
        let mut query = world.query::<(Entity, &Transform)>();
        query
            .iter(world)
            .filter(|(e, _)| {
                world
                    .get::<Relationship>(*e)
                    .map(|r| r.parent.is_none())
                    .unwrap_or(true)
            })
            .map(|(e, _)| e)
            .collect()
    };

    for root in roots {
        propagate_from(world, root, Mat4::IDENTITY, false);
    }
}

fn propagate_from(world: &mut World, entity: Entity, parent_world: Mat4, parent_was_dirty: bool) {
    let children: Vec<Entity> = super::relationship::children(world, entity);

    let Some(mut transform) = world.get_mut::<Transform>(entity) else {
        for child in children {
            propagate_from(world, child, parent_world, parent_was_dirty);
        }
        return;
    };

    transform.rebuild_local_if_dirty();

    let self_dirty = parent_was_dirty || transform.dirty.contains(DirtyFlags::WORLD);

    if self_dirty {
        transform.world = parent_world * transform.local;
        transform.dirty.insert(DirtyFlags::INVERSE_WORLD);
        transform.dirty.remove(DirtyFlags::WORLD);
    }

    let this_world = transform.world;

    for child in children {
        propagate_from(world, child, this_world, self_dirty);
    }
}
