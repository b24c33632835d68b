//! Per-entity kinematic resolution configuration (`spec.md` §4.C/§3 "Collision component").

use bevy::prelude::*;

/// How a kinematic entity casts against the world to detect penetration before it's
/// resolved. `None` skips casting entirely for that entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CastMethod {
    #[default]
    None,
    RayCast,
    ConvexCast,
}

/// How the cast's "reach" (half-extent used in the correction formula) is derived from
/// the entity's collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizePolicy {
    Aabb,
    Sphere,
    InnerSphere,
    Explicit(f32),
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self::Aabb
    }
}

/// Per-entity kinematic resolution policy, attached alongside a collision component.
#[derive(Component, Debug, Clone, Copy)]
pub struct KinematicResolutionConfig {
    pub cast_method: CastMethod,
    pub size_policy: SizePolicy,

    /// This entity can push other kinematic entities it moves into.
    pub is_influencer: bool,
    /// This entity can be pushed by influencers that move into it.
    pub accepts_influence: bool,
    /// Resolve (correct out of) non-solid intersections, not just solid penetrations.
    pub resolve_intersections: bool,
    /// An influencer may push entities that are its descendants in the relationship tree.
    pub can_influence_children: bool,
    /// An influencer may push entities that are its ancestors in the relationship tree.
    pub can_be_influenced_by_children: bool,
}

impl Default for KinematicResolutionConfig {
    fn default() -> Self {
        Self {
            cast_method: CastMethod::None,
            size_policy: SizePolicy::Aabb,
            is_influencer: false,
            accepts_influence: false,
            resolve_intersections: false,
            can_influence_children: true,
            can_be_influenced_by_children: true,
        }
    }
}

impl KinematicResolutionConfig {
    pub fn disabled(&self) -> bool {
        matches!(self.cast_method, CastMethod::None)
    }
}

/// The mover's world position as of the end of the previous resolution pass, so the bridge
/// can reconstruct the actual movement vector a cast should be swept along instead of a
/// single-point snapshot (`spec.md` §4.C step 5 "cast along the movement").
///
/// Lazily inserted the first tick a kinematic entity is seen; that tick has no prior
/// position to cast from, so it seeds the anchor and skips casting.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct KinematicCastAnchor(pub Vec2);
