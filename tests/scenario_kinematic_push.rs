//! End-to-end scenario: entity A (mass=1, is_influencer) casts +X into entity B (mass=2,
//! accepts_influence) along a surface whose normal is (-1,0,0). B must advance by the
//! mass-weighted share of A's intended movement; A must be corrected back to exactly touch
//! B's (now-shifted) surface; and exactly one each of `OnSurfaceContact`,
//! `OnKinematicInfluence`, `OnKinematicAdjustment` must fire (`spec.md` §8 scenario 3).

mod common;

use std::sync::{Arc, Mutex};

use avian2d::prelude::*;
use bevy::prelude::*;

use kinescript::common::tunables::Tunables;
use kinescript::event_bus::events::{OnKinematicAdjustment, OnKinematicInfluence, OnSurfaceContact};
use kinescript::event_bus::EventBus;
use kinescript::physics::{
    CastMethod, CollisionGroup, CollisionProfile, Kinematic, KinematicMass, KinematicResolutionConfig,
};
use kinescript::registry::Transform;

#[test]
fn kinematic_mover_pushes_a_lighter_target_and_is_corrected_to_its_moved_surface() {
    let mut app = common::app_headless();

    let profile_a = CollisionProfile::new(CollisionGroup::ACTOR, CollisionGroup::ACTOR, CollisionGroup::NONE);
    let profile_b = CollisionProfile::new(CollisionGroup::OBJECT, CollisionGroup::OBJECT, CollisionGroup::NONE);

    let mover_config = KinematicResolutionConfig {
        cast_method: CastMethod::RayCast,
        is_influencer: true,
        resolve_intersections: true,
        ..Default::default()
    };
    let target_config = KinematicResolutionConfig { accepts_influence: true, ..Default::default() };

    let world = app.world_mut();

    // B's near face sits at x=1.5 (center 2.0, half-extent 0.5) — within the 2-unit cast A
    // is about to sweep, so A's raycast lands on it before it's even done translating.
    let b = world
        .spawn((
            Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)),
            Position::default(),
            Rotation::default(),
            RigidBody::Kinematic,
            Collider::rectangle(1.0, 1.0),
            profile_b,
            KinematicMass(Some(2.0)),
            target_config,
        ))
        .id();

    let a = world
        .spawn((
            Transform::from_translation(Vec3::ZERO),
            Position::default(),
            Rotation::default(),
            RigidBody::Kinematic,
            Collider::rectangle(1.0, 1.0),
            profile_a,
            KinematicMass(Some(1.0)),
            Kinematic,
            mover_config,
        ))
        .id();

    let surface_contacts = Arc::new(Mutex::new(Vec::<(Vec2, Vec2)>::new()));
    let influences = Arc::new(Mutex::new(Vec::<Vec2>::new()));
    let adjustments = Arc::new(Mutex::new(Vec::<Vec2>::new()));
    let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    {
        let (surface_contacts, order) = (surface_contacts.clone(), order.clone());
        world.resource_mut::<EventBus>().subscribe::<OnSurfaceContact, _>(None, move |e| {
            surface_contacts.lock().unwrap().push((e.impact_velocity, e.penetration));
            order.lock().unwrap().push("contact");
        });
    }
    {
        let (influences, order) = (influences.clone(), order.clone());
        world.resource_mut::<EventBus>().subscribe::<OnKinematicInfluence, _>(None, move |e| {
            influences.lock().unwrap().push(e.delta);
            order.lock().unwrap().push("influence");
        });
    }
    {
        let (adjustments, order) = (adjustments.clone(), order.clone());
        world.resource_mut::<EventBus>().subscribe::<OnKinematicAdjustment, _>(None, move |e| {
            adjustments.lock().unwrap().push(e.delta);
            order.lock().unwrap().push("adjustment");
        });
    }

    // First tick: both transforms are freshly spawned (dirty-by-construction), so this pass
    // only seeds each mover's `KinematicCastAnchor` at its starting position and performs no
    // cast yet (`spec.md` §4.C step 5 "for each kinematic entity whose transform changed
    // this tick" — the very first sighting has no prior position to sweep from).
    world.run_schedule(FixedPreUpdate);
    world.run_schedule(FixedPostUpdate);
    assert!(surface_contacts.lock().unwrap().is_empty(), "no cast on the seeding tick");

    // A moves +X by 2 units "into" B.
    world.get_mut::<Transform>(a).unwrap().translate(Vec3::new(2.0, 0.0, 0.0));

    world.run_schedule(FixedPreUpdate);
    world.run_schedule(FixedPostUpdate);

    let skin_width = app.world().resource::<Tunables>().skin_width;

    // Influence: distance(2.0) * min(mass_a/mass_b, 1.0) = 2.0 * 0.5 = 1.0 along +X.
    assert_eq!(influences.lock().unwrap().len(), 1, "exactly one OnKinematicInfluence");
    assert!(
        (influences.lock().unwrap()[0] - Vec2::new(1.0, 0.0)).length() < 1e-4,
        "B must advance by exactly +X * (1/2) * 2 = +1, got {:?}",
        influences.lock().unwrap()[0],
    );

    let b_x = app.world().get::<Transform>(b).unwrap().translation().x;
    assert!((b_x - 3.0).abs() < 1e-4, "B's position must advance by exactly +1, got x={b_x}");

    assert_eq!(adjustments.lock().unwrap().len(), 1, "exactly one OnKinematicAdjustment");
    assert_eq!(surface_contacts.lock().unwrap().len(), 1, "exactly one OnSurfaceContact");

    // A is corrected so its leading edge sits `skin_width` short of B's (now-shifted)
    // near face: B's face started at x=1.5 and moved by the same +1 influence as B's
    // center, landing at x=2.5; A's half-extent is 0.5, so A's center should land at
    // x = 2.5 - 0.5 - skin_width.
    let a_x = app.world().get::<Transform>(a).unwrap().translation().x;
    let expected_a_x = 2.5 - 0.5 - skin_width;
    assert!(
        (a_x - expected_a_x).abs() < 1e-3,
        "A must be corrected to exactly touch B's moved surface: expected x~{expected_a_x}, got {a_x}",
    );

    // The bridge's algorithm (`spec.md` §4.C step 5) fixes influence before correction
    // before the always-on contact emission; that per-tick processing order is what this
    // implementation treats as authoritative over the scenario's own prose ordering of the
    // three event *names* (`DESIGN.md` "kinematic push event ordering").
    assert_eq!(*order.lock().unwrap(), vec!["influence", "adjustment", "contact"]);
}
