//! Concrete event payloads dispatched through the [`EventBus`](super::EventBus).
//!
//! Registry-lifecycle events are generic over the changed component type, matching
//! `spec.md` §3's "one event type per observed component type" shape. Collision events
//! are concrete structs; the bridge projects avian2d's own contact data onto them rather
//! than exposing avian2d types across the event-bus boundary.

use std::marker::PhantomData;

use bevy::prelude::*;

/// Fired after `T` is first added to `entity` (`spec.md` §3 "Registry component events").
#[derive(Debug, Clone, Copy)]
pub struct OnComponentAdd<T> {
    pub entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<T> OnComponentAdd<T> {
    pub fn new(entity: Entity) -> Self {
        Self { entity, _marker: PhantomData }
    }
}

/// Fired after `patch` mutates an existing `T` on `entity`.
#[derive(Debug, Clone, Copy)]
pub struct OnComponentChange<T> {
    pub entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<T> OnComponentChange<T> {
    pub fn new(entity: Entity) -> Self {
        Self { entity, _marker: PhantomData }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OnEntityCreated {
    pub entity: Entity,
}

/// Fired once an entity and all of its destroy-time side effects (orphan handling,
/// subscription teardown) have been fully applied (`spec.md` §4.B "destroy_entity").
#[derive(Debug, Clone, Copy)]
pub struct OnEntityDestroyed {
    pub entity: Entity,
}

#[derive(Debug, Clone, Copy)]
pub struct OnParentChanged {
    pub entity: Entity,
    pub previous_parent: Option<Entity>,
    pub new_parent: Option<Entity>,
}

/// Two collision objects' bounding volumes overlap, prior to solid/interaction
/// classification (`spec.md` §4.C step 3).
#[derive(Debug, Clone, Copy)]
pub struct OnAabbOverlap {
    pub a: Entity,
    pub b: Entity,
    pub contact_count: u32,
}

/// `a`'s kinematic cast landed on `b` this tick (`spec.md` §4.C step 5 "Contact step").
/// `impact_velocity` is `new_pos − old_pos` for `a`; `penetration` is the vector by which
/// `a`'s intended travel already carried it past the contact point before correction.
#[derive(Debug, Clone, Copy)]
pub struct OnSurfaceContact {
    pub a: Entity,
    pub b: Entity,
    pub impact_velocity: Vec2,
    pub penetration: Vec2,
}

/// `a` and `b` are geometrically intersecting and neither is solid to the other, but both
/// have `resolve_intersections` set — the bridge has pushed them apart by the averaged
/// correction (`spec.md` §4.C "correction step").
#[derive(Debug, Clone, Copy)]
pub struct OnIntersection {
    pub a: Entity,
    pub b: Entity,
    pub correction: Vec2,
}

/// `a` overlaps `b` on `a`'s interaction mask only (no solid contact, no resolution) —
/// the zone/trigger path (`spec.md` §4.C step 3, GLOSSARY "interaction").
#[derive(Debug, Clone, Copy)]
pub struct OnInteractionIntersection {
    pub a: Entity,
    pub b: Entity,
}

/// `child`'s motion this tick was attributed, at least in part, to standing on/against
/// `influencer` (`spec.md` §4.C "influence step").
#[derive(Debug, Clone, Copy)]
pub struct OnKinematicInfluence {
    pub influencer: Entity,
    pub child: Entity,
    pub delta: Vec2,
}

/// `entity`'s position was adjusted by the kinematic cast/correction passes this tick.
#[derive(Debug, Clone, Copy)]
pub struct OnKinematicAdjustment {
    pub entity: Entity,
    pub delta: Vec2,
}

/// Generic projection of any of the above onto a single shape for predicate filters that
/// don't care which specific collision event fired (`spec.md` §9 "event-bus type
/// erasure").
#[derive(Debug, Clone, Copy)]
pub struct OnCollision {
    pub a: Entity,
    pub b: Entity,
    pub kind: CollisionEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventKind {
    AabbOverlap,
    SurfaceContact,
    Intersection,
    InteractionIntersection,
}

/// An `EntityThread`'s root fiber ran to completion (`spec.md` §4.E).
#[derive(Debug, Clone, Copy)]
pub struct OnThreadComplete {
    pub entity: Entity,
    pub thread_id: u64,
}
