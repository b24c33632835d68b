//! Kinematic physics bridge (`spec.md` §4.C): walks avian2d's contact manifolds each tick,
//! projects them onto the semantic collision events, and resolves kinematic casts against
//! the relationship graph.

use avian2d::prelude::*;
use bevy::math::Vec2;
use bevy::prelude::*;

use crate::common::tunables::Tunables;
use crate::event_bus::events::{
    CollisionEventKind, OnAabbOverlap, OnCollision, OnInteractionIntersection, OnIntersection,
    OnKinematicAdjustment, OnKinematicInfluence, OnSurfaceContact,
};
use crate::event_bus::EventBus;
use crate::registry::relationship;
use crate::registry::Transform;

use super::collision_component::{CollisionProfile, Kinematic, KinematicMass};
use super::kinematic::{CastMethod, KinematicCastAnchor, KinematicResolutionConfig, SizePolicy};

/// One averaged manifold between `a` and `b`, from `a`'s point of view.
struct AveragedManifold {
    contact_count: u32,
    normal: Vec2,
    correction: Vec2,
}

fn average_manifold(contacts: &ContactPair) -> Option<AveragedManifold> {
    let mut count = 0u32;
    let mut normal_sum = Vec2::ZERO;
    let mut correction_sum = Vec2::ZERO;

    for manifold in &contacts.manifolds {
        for point in &manifold.points {
            count += 1;
            normal_sum += manifold.normal;
            correction_sum += -manifold.normal * point.penetration.min(0.0);
        }
    }

    if count == 0 {
        return None;
    }

    Some(AveragedManifold {
        contact_count: count,
        normal: normal_sum / count as f32,
        correction: correction_sum / count as f32,
    })
}

/// `spec.md` §4.C step 4: classify every current contact pair and emit the semantic
/// overlap/intersection/interaction events.
pub fn walk_contact_manifolds(
    collisions: Res<Collisions>,
    mut profiles: Query<(
        &CollisionProfile,
        Option<&Kinematic>,
        Option<&KinematicResolutionConfig>,
        &mut Transform,
    )>,
    mut bus: ResMut<EventBus>,
) {
    for contacts in collisions.iter() {
        let (a, b) = (contacts.collider1, contacts.collider2);

        let Ok([(profile_a, kinematic_a, config_a, _), (profile_b, _, _, _)]) = profiles.get_many_mut([a, b]) else {
            continue;
        };

        let averaged = average_manifold(contacts);
        let contact_count = averaged.as_ref().map(|m| m.contact_count).unwrap_or(0);

        bus.event(OnAabbOverlap { a, b, contact_count });

        let Some(averaged) = averaged else { continue };

        if kinematic_a.is_none() {
            continue;
        }

        if profile_b.group.intersects(profile_a.interaction_mask) {
            bus.event(OnInteractionIntersection { a, b });
            bus.event(OnCollision { a, b, kind: CollisionEventKind::InteractionIntersection });
        }

        if !profile_b.group.intersects(profile_a.solid_mask) {
            continue;
        }

        if !config_a.map(|c| c.resolve_intersections).unwrap_or(false) {
            continue;
        }

        let Ok((_, _, _, mut transform_a)) = profiles.get_mut(a) else { continue };

        transform_a.translate(averaged.correction.extend(0.0));
        bus.event(OnIntersection { a, b, correction: averaged.correction });
        bus.event(OnCollision { a, b, kind: CollisionEventKind::Intersection });
    }
}

/// Half the mover's "reach" along `normal`, used by the correction formula below — how far
/// its own bulk extends past its transform origin in the direction it's pushing back.
/// `SizePolicy::Explicit` bypasses the collider read entirely; the other variants derive it
/// from the collider's local AABB (`spec.md` §3 "Collision component" `SizePolicy`).
fn cast_half_extent(collider: &Collider, policy: SizePolicy, normal: Vec2) -> f32 {
    let Some(half_extents) = (match policy {
        SizePolicy::Explicit(value) => return value,
        _ => Some(collider.shape().compute_local_aabb().half_extents()),
    }) else {
        return 0.0;
    };

    let half = Vec2::new(half_extents.x, half_extents.y);

    match policy {
        SizePolicy::Aabb => half.x * normal.x.abs() + half.y * normal.y.abs(),
        SizePolicy::Sphere => half.x.max(half.y),
        SizePolicy::InnerSphere => half.x.min(half.y),
        SizePolicy::Explicit(_) => unreachable!("handled above"),
    }
}

/// `spec.md` §4.C step 5: for every kinematic entity whose transform changed this tick,
/// cast along the movement and resolve influence/correction/contact against whatever it
/// hit, gated by the relationship tree between mover and target.
pub fn resolve_kinematic_casts(
    mut commands: Commands,
    spatial_query: SpatialQuery,
    tunables: Res<Tunables>,
    mut movers: Query<(
        Entity,
        &mut Transform,
        &KinematicResolutionConfig,
        &KinematicMass,
        &Collider,
        Option<&mut KinematicCastAnchor>,
    ), With<Kinematic>>,
    mut targets: Query<(&mut Transform, &KinematicResolutionConfig, &KinematicMass), Without<Kinematic>>,
    world: &World,
    mut bus: ResMut<EventBus>,
) {
    for (mover_entity, mut mover_transform, mover_config, mover_mass, collider, anchor) in &mut movers {
        if mover_config.disabled() || !mover_transform.event_flag() {
            continue;
        }

        let destination = mover_transform.world_position().truncate();

        let Some(mut anchor) = anchor else {
            // First tick this mover is seen: no prior position to cast from yet.
            commands.entity(mover_entity).insert(KinematicCastAnchor(destination));
            mover_transform.clear_event_flag();
            continue;
        };

        let previous = anchor.0;
        anchor.0 = destination;

        let intended_movement = destination - previous;
        let distance = intended_movement.length();

        // A zero-length cast is detected here, before any query dispatch, rather than
        // handed to `SpatialQuery` (`spec.md` §7 "Collision query with empty or zero-length
        // ray").
        if distance <= f32::EPSILON {
            mover_transform.clear_event_flag();
            continue;
        }

        let direction = intended_movement / distance;
        let Ok(cast_dir) = Dir2::new(direction) else {
            mover_transform.clear_event_flag();
            continue;
        };

        let hit = match mover_config.cast_method {
            CastMethod::None => None,
            CastMethod::RayCast => spatial_query
                .cast_ray(previous, cast_dir, distance, true, &SpatialQueryFilter::default())
                .map(|hit| (hit.entity, hit.distance)),
            CastMethod::ConvexCast => spatial_query
                .cast_shape(
                    collider,
                    previous,
                    0.0,
                    cast_dir,
                    &ShapeCastConfig::from_max_distance(distance),
                    &SpatialQueryFilter::default(),
                )
                .map(|hit| (hit.entity, hit.distance)),
        };

        let Some((hit_entity, hit_distance)) = hit else {
            mover_transform.clear_event_flag();
            continue;
        };

        let mover_is_descendant_of_hit = relationship::is_ancestor_of(world, hit_entity, mover_entity);
        let hit_is_descendant_of_mover = relationship::is_ancestor_of(world, mover_entity, hit_entity);

        if hit_is_descendant_of_mover && !mover_config.can_influence_children {
            mover_transform.clear_event_flag();
            continue;
        }
        if mover_is_descendant_of_hit && !mover_config.can_be_influenced_by_children {
            mover_transform.clear_event_flag();
            continue;
        }

        let Ok((mut hit_transform, hit_config, hit_mass)) = targets.get_mut(hit_entity) else {
            mover_transform.clear_event_flag();
            continue;
        };

        let normal = -direction;

        let mut influence = Vec2::ZERO;
        let mut skip_correction = false;

        if mover_config.is_influencer && hit_config.accepts_influence {
            if hit_mass.is_infinite() {
                influence = intended_movement;
                skip_correction = true;
            } else {
                let ratio = (mover_mass.value() / hit_mass.value()).min(1.0);
                influence = direction * (distance * ratio);
            }
        }

        if influence != Vec2::ZERO {
            hit_transform.translate(influence.extend(0.0));
            bus.event(OnKinematicInfluence { influencer: mover_entity, child: hit_entity, delta: influence });
        }

        // Vector by which the mover's intended travel already carries it past the contact
        // point, along `direction` (`spec.md` §4.C step 5 "penetration as vector").
        let overshoot = (distance - hit_distance).max(0.0);
        let penetration = direction * overshoot;

        let mut adjustment = Vec2::ZERO;

        if !skip_correction {
            // `normal * half_extent - penetration + influence`: the mover's own half-extent
            // pulls it back to the contact surface, the overshoot it already carried past
            // that surface is subtracted back off, and any influence absorbed by the target
            // (which moved the surface itself) is credited back so the mover still ends up
            // exactly touching it rather than stopping short.
            let half_extent = cast_half_extent(collider, mover_config.size_policy, normal) + tunables.skin_width;
            adjustment = normal * half_extent - penetration + influence;
            mover_transform.translate(adjustment.extend(0.0));
            bus.event(OnKinematicAdjustment { entity: mover_entity, delta: adjustment });
        }

        let new_pos = mover_transform.world_position().truncate();
        bus.event(OnSurfaceContact {
            a: mover_entity,
            b: hit_entity,
            impact_velocity: new_pos - previous,
            penetration,
        });
        bus.event(OnCollision { a: mover_entity, b: hit_entity, kind: CollisionEventKind::SurfaceContact });

        mover_transform.clear_event_flag();
        anchor.0 = mover_transform.world_position().truncate();
    }
}

pub fn plugin(app: &mut App) {
    app.add_systems(
        FixedPostUpdate,
        (walk_contact_manifolds, resolve_kinematic_casts).chain().after(PhysicsSystems::StepSimulation),
    );
}
