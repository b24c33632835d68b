//! Registry façade (`spec.md` §4.B): typed component access plus patch/destroy
//! notifications and relationship mutation, all routed through the [`EventBus`].
//!
//! A thin wrapper, not a second source of truth — every method operates directly on the
//! `&mut World` it's given and immediately re-emits the corresponding event synchronously,
//! keeping gameplay-facing helpers as free functions over `&mut World` rather than a
//! long-lived handle type.

use bevy::prelude::*;

use crate::event_bus::events::{OnComponentAdd, OnComponentChange, OnEntityDestroyed, OnParentChanged};
use crate::event_bus::EventBus;

use super::relationship::{self, Relationship};
use super::transform::Transform;

/// Reads `T` off `entity`, panicking if absent. Use [`try_get`] at call sites that expect
/// the component may be missing.
pub fn get<T: Component>(world: &World, entity: Entity) -> &T {
    world
        .get::<T>(entity)
        .unwrap_or_else(|| panic!("entity {entity:?} has no {}", std::any::type_name::<T>()))
}

pub fn try_get<T: Component>(world: &World, entity: Entity) -> Option<&T> {
    world.get::<T>(entity)
}

/// Inserts `T` if absent, then returns a mutable reference to it. Emits
/// `OnComponentAdd<T>` the first time `T` appears on `entity`.
pub fn get_or_emplace<T: Component + Default>(world: &mut World, entity: Entity) -> Mut<'_, T> {
    if !world.entity(entity).contains::<T>() {
        emplace(world, entity, T::default());
    }
    world.get_mut::<T>(entity).expect("just emplaced")
}

/// Inserts or overwrites `T` on `entity`, emitting `OnComponentAdd<T>` synchronously.
pub fn emplace<T: Component>(world: &mut World, entity: Entity, value: T) {
    world.entity_mut(entity).insert(value);

    if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
        bus.event(OnComponentAdd::<T>::new(entity));
    }
}

/// Applies `mutator` to `entity`'s `T`, then emits `OnComponentChange<T>` synchronously.
/// No-op if `T` is absent.
pub fn patch<T: Component>(world: &mut World, entity: Entity, mutator: impl FnOnce(&mut T)) {
    let Some(mut component) = world.get_mut::<T>(entity) else { return };
    mutator(&mut component);

    if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
        bus.event(OnComponentChange::<T>::new(entity));
    }
}

pub fn remove<T: Component>(world: &mut World, entity: Entity) {
    world.entity_mut(entity).remove::<T>();
}

/// Re-parents `entity` under `parent`. Returns `None` (and does nothing) on either
/// tie-break `spec.md` §4.B/§7 call out:
/// - `entity == parent` — the null-or-self no-op (since `Entity` has no null value in
///   this realization, the "either is null" half of the original rule is unreachable
///   here; see `SPEC_FULL.md` §9 open question 2's sibling note on null encoding);
/// - `parent` is a descendant of `entity` — cyclic parenting is refused outright
///   (`spec.md` §7 "Cyclic parenting... the registry façade refuses and returns null").
///
/// Returns `Some(())` on success.
pub fn set_parent(world: &mut World, entity: Entity, parent: Entity) -> Option<()> {
    if entity == parent {
        return None;
    }

    if relationship::is_ancestor_of(world, entity, parent) {
        tracing::debug!(?entity, ?parent, "set_parent refused: would create a cycle");
        return None;
    }

    let previous_parent = world.get::<Relationship>(entity).and_then(|r| r.parent);

    let parent_world = world
        .get_mut::<Transform>(parent)
        .map(|t| t.world_matrix())
        .unwrap_or(bevy::math::Mat4::IDENTITY);

    let world_pose = world.get::<Transform>(entity).map(|t| t.world_matrix());

    relationship::remove_from_current_parent(world, entity);
    relationship::append_child(world, parent, entity);

    if let (Some(world_pose), Some(mut transform)) = (world_pose, world.get_mut::<Transform>(entity)) {
        transform.set_from_world_matrix(parent_world, world_pose);
    }

    if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
        bus.event(OnParentChanged { entity, previous_parent, new_parent: Some(parent) });
    }

    Some(())
}

/// Destroys `entity`. If `destroy_orphans`, every descendant is destroyed recursively;
/// otherwise each direct child is re-parented to `entity`'s own parent (or made a root, if
/// `entity` had none) before `entity` itself is despawned.
pub fn destroy_entity(world: &mut World, entity: Entity, destroy_orphans: bool) {
    let grandparent = world.get::<Relationship>(entity).and_then(|r| r.parent);
    let children = relationship::children(world, entity);

    if destroy_orphans {
        for child in children {
            destroy_entity(world, child, true);
        }
    } else {
        for child in children {
            match grandparent {
                Some(grandparent) => set_parent(world, child, grandparent),
                None => {
                    relationship::remove_from_current_parent(world, child);
                }
            }
        }
    }

    relationship::remove_from_current_parent(world, entity);

    if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
        bus.unsubscribe_owner(crate::event_bus::SubscriberOwner::Entity(entity));
    }

    world.despawn(entity);

    if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
        bus.event(OnEntityDestroyed { entity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Vec3;

    #[derive(Component, Debug, Default, PartialEq)]
    struct Health(i32);

    fn setup() -> World {
        let mut world = World::new();
        world.init_resource::<EventBus>();
        world
    }

    #[test]
    fn emplace_inserts_and_emits_component_add() {
        let mut world = setup();
        let e = world.spawn_empty().id();

        let added = std::sync::Arc::new(std::sync::Mutex::new(false));
        {
            let added = added.clone();
            world
                .get_resource_mut::<EventBus>()
                .unwrap()
                .subscribe::<OnComponentAdd<Health>, _>(None, move |_| *added.lock().unwrap() = true);
        }

        emplace(&mut world, e, Health(10));

        assert_eq!(world.get::<Health>(e), Some(&Health(10)));
        assert!(*added.lock().unwrap());
    }

    #[test]
    fn patch_mutates_and_emits_component_change() {
        let mut world = setup();
        let e = world.spawn(Health(5)).id();

        let changed = std::sync::Arc::new(std::sync::Mutex::new(false));
        {
            let changed = changed.clone();
            world
                .get_resource_mut::<EventBus>()
                .unwrap()
                .subscribe::<OnComponentChange<Health>, _>(None, move |_| *changed.lock().unwrap() = true);
        }

        patch::<Health>(&mut world, e, |h| h.0 += 1);

        assert_eq!(world.get::<Health>(e), Some(&Health(6)));
        assert!(*changed.lock().unwrap());
    }

    #[test]
    fn set_parent_is_a_no_op_when_entity_equals_parent() {
        let mut world = setup();
        let e = world.spawn((Relationship::default(), Transform::default())).id();
        set_parent(&mut world, e, e);
        assert_eq!(world.get::<Relationship>(e).unwrap().parent, None);
    }

    #[test]
    fn set_parent_preserves_world_position() {
        let mut world = setup();
        let parent = world.spawn((Relationship::default(), Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)))).id();
        let child = world.spawn((Relationship::default(), Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)))).id();

        super::super::transform::propagate_world_transforms(&mut world);
        let child_world_before = world.get::<Transform>(child).unwrap().world_position();

        set_parent(&mut world, child, parent);
        super::super::transform::propagate_world_transforms(&mut world);

        let child_world_after = world.get::<Transform>(child).unwrap().world_position();
        assert_eq!(child_world_before, child_world_after);
        assert_eq!(world.get::<Relationship>(parent).unwrap().child_count, 1);
    }

    #[test]
    fn set_parent_refuses_cyclic_parenting() {
        let mut world = setup();
        let a = world.spawn((Relationship::default(), Transform::default())).id();
        let b = world.spawn((Relationship::default(), Transform::default())).id();
        set_parent(&mut world, b, a);

        assert_eq!(set_parent(&mut world, a, b), None);
        assert_eq!(world.get::<Relationship>(a).unwrap().parent, None);
    }

    #[test]
    fn destroy_entity_with_destroy_orphans_removes_descendants() {
        let mut world = setup();
        let parent = world.spawn(Relationship::default()).id();
        let child = world.spawn(Relationship::default()).id();
        relationship::append_child(&mut world, parent, child);

        destroy_entity(&mut world, parent, true);

        assert!(world.get_entity(parent).is_err());
        assert!(world.get_entity(child).is_err());
    }

    #[test]
    fn destroy_entity_without_destroy_orphans_reparents_children_to_grandparent() {
        let mut world = setup();
        let grandparent = world.spawn(Relationship::default()).id();
        let parent = world.spawn(Relationship::default()).id();
        let child = world.spawn(Relationship::default()).id();
        relationship::append_child(&mut world, grandparent, parent);
        relationship::append_child(&mut world, parent, child);

        destroy_entity(&mut world, parent, false);

        assert!(world.get_entity(parent).is_err());
        assert_eq!(world.get::<Relationship>(child).unwrap().parent, Some(grandparent));
        assert_eq!(world.get::<Relationship>(grandparent).unwrap().child_count, 1);
    }
}
