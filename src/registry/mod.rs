//! Registry Façade (`spec.md` §4.B): typed component access, relationship graph, and
//! transform propagation layered over a plain `bevy::ecs::World`.

pub mod facade;
pub mod relationship;
pub mod transform;

pub use facade::{destroy_entity, emplace, get, get_or_emplace, patch, remove, set_parent, try_get};
pub use relationship::Relationship;
pub use transform::Transform;

use bevy::prelude::*;

/// Runs relationship-graph-aware transform propagation once per frame, after gameplay
/// systems have had a chance to move things and before the physics bridge reads world
/// matrices (`spec.md` §4.C step 1).
pub fn propagate_transforms_system(world: &mut World) {
    transform::propagate_world_transforms(world);
}

pub fn plugin(app: &mut App) {
    app.add_systems(PostUpdate, propagate_transforms_system);
}
