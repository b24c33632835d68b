//! End-to-end scenario: two kinematic boxes configured to resolve intersections (not solid
//! contact) overlap by 0.3 along Y after a transform edit. One tick of the bridge must push
//! the mover out by exactly that overlap and report it on `OnIntersection`.

mod common;

use std::sync::{Arc, Mutex};

use avian2d::prelude::*;
use bevy::prelude::*;

use kinescript::event_bus::events::OnIntersection;
use kinescript::event_bus::EventBus;
use kinescript::physics::{CollisionProfile, Kinematic, KinematicMass, KinematicResolutionConfig};
use kinescript::registry::Transform;

#[test]
fn overlapping_intersection_resolving_boxes_are_corrected_by_the_overlap() {
    let mut app = common::app_headless();

    let profile = CollisionProfile::new(
        kinescript::physics::CollisionGroup::ACTOR,
        kinescript::physics::CollisionGroup::ACTOR,
        kinescript::physics::CollisionGroup::NONE,
    );
    let config = KinematicResolutionConfig { resolve_intersections: true, ..Default::default() };

    let world = app.world_mut();

    // `a` sits above `b`, overlapping by 0.3 in Y given 1x1 boxes centered at y=0.0 and
    // y=0.7 (half-extent 0.5 each => touching would be at y=1.0; 0.3 less than that is the
    // configured overlap).
    let b = world
        .spawn((
            Transform::from_translation(Vec3::new(0.0, 0.0, 0.0)),
            Position::default(),
            Rotation::default(),
            RigidBody::Kinematic,
            Sensor,
            Collider::rectangle(1.0, 1.0),
            profile,
            KinematicMass::default(),
        ))
        .id();

    let a = world
        .spawn((
            Transform::from_translation(Vec3::new(0.0, 0.7, 0.0)),
            Position::default(),
            Rotation::default(),
            RigidBody::Kinematic,
            Sensor,
            Collider::rectangle(1.0, 1.0),
            profile,
            KinematicMass::default(),
            Kinematic,
            config,
        ))
        .id();

    let corrections = Arc::new(Mutex::new(Vec::<f32>::new()));
    {
        let corrections = corrections.clone();
        world
            .resource_mut::<EventBus>()
            .subscribe::<OnIntersection, _>(None, move |e| corrections.lock().unwrap().push(e.correction.y));
    }

    // Deterministic, schedule-driven physics + bridge tick, rather than relying on
    // accumulated real time.
    world.run_schedule(FixedPreUpdate);
    world.run_schedule(FixedPostUpdate);
    world.run_schedule(FixedPreUpdate);
    world.run_schedule(FixedPostUpdate);

    let a_y = world.get::<Transform>(a).unwrap().translation().y;
    let b_y = world.get::<Transform>(b).unwrap().translation().y;

    assert!((b_y - 0.0).abs() < 1e-4, "the non-resolving box never moves");
    assert!(a_y > 0.7, "the resolving box must be pushed further away from the overlap");
    assert!(
        *corrections.lock().unwrap().iter().any(|c| (c - 0.3).abs() < 0.05),
        "OnIntersection.correction.y should be approximately the 0.3 overlap, got {:?}",
        corrections.lock().unwrap()
    );
}
