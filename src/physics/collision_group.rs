//! Collision groups, solid/interaction masks, and the `EntityType -> CollisionConfig`
//! lookup table.
//!
//! Groups are single bits; solid/interaction masks are unions of groups. "Solid" and
//! "interaction" are deliberately not mutually exclusive — see `spec.md` GLOSSARY.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CollisionGroup: u32 {
        const STATIC_GEOMETRY  = 1 << 1;
        const DYNAMIC_GEOMETRY = 1 << 2;
        const ACTOR            = 1 << 3;
        const OBJECT           = 1 << 4;
        const BONE             = 1 << 5;
        const ZONE             = 1 << 6;
        const PARTICLE         = 1 << 7;
        const PROJECTILE       = 1 << 8;
    }
}

impl CollisionGroup {
    /// Matches everything, including bits this lattice doesn't name. Used as the
    /// default "no restriction" mask (mirrors the original engine's `All = UINT32_MAX`).
    pub const ALL: Self = Self::from_bits_retain(u32::MAX);
    pub const NONE: Self = Self::empty();

    pub const META: Self = Self::ZONE;
    pub const ALL_GEOMETRY: Self = Self::STATIC_GEOMETRY.union(Self::DYNAMIC_GEOMETRY);

    pub const GEOMETRY_SOLIDS: Self = Self::ALL.difference(Self::META);
    pub const OBJECT_SOLIDS: Self = Self::ALL_GEOMETRY.union(Self::ACTOR).union(Self::OBJECT);
    pub const BONE_SOLIDS: Self = Self::OBJECT_SOLIDS;
    pub const ACTOR_SOLIDS: Self = Self::OBJECT_SOLIDS;
    pub const PROJECTILE_SOLIDS: Self =
        Self::OBJECT_SOLIDS.union(Self::PROJECTILE).union(Self::BONE);

    pub const PLAYER_INTERACTIONS: Self = Self::ALL;
    pub const OBJECT_INTERACTIONS: Self =
        Self::ACTOR.union(Self::OBJECT).union(Self::ZONE).union(Self::ALL_GEOMETRY);
    pub const COLLECTABLE_INTERACTIONS: Self = Self::ACTOR.union(Self::ZONE);
    pub const ENEMY_INTERACTIONS: Self = Self::OBJECT_INTERACTIONS;
    pub const HIT_DETECTION_INTERACTIONS: Self =
        Self::OBJECT_SOLIDS.union(Self::ZONE).union(Self::BONE);

    #[inline]
    pub fn intersects_mask(self, mask: Self) -> bool {
        self.intersects(mask)
    }
}

/// Gameplay classification an entity is spawned with; resolves to a `CollisionConfig`
/// through the table below. Anything not covered by the match defaults to `None` on all
/// three fields, per `spec.md` §4.C ("anything not in the table defaults to `None`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Default,
    Geometry,
    Platform,
    Crusher,
    Bone,
    Object,
    Camera,
    Player,
    Enemy,
    FriendlyActor,
    Collectable,
    Particle,
    Projectile,
    WaterZone,
    KillZone,
    DamageZone,
    EventTrigger,
    Generator,
}

/// Closed resolution of group/solid-mask/interaction-mask from an `EntityType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionConfig {
    pub group: CollisionGroup,
    pub solid_mask: CollisionGroup,
    pub interaction_mask: CollisionGroup,
}

impl CollisionConfig {
    pub const NONE: Self = Self {
        group: CollisionGroup::NONE,
        solid_mask: CollisionGroup::NONE,
        interaction_mask: CollisionGroup::NONE,
    };

    pub fn resolve_collision_group(ty: EntityType) -> CollisionGroup {
        use CollisionGroup as G;
        match ty {
            EntityType::Geometry => G::STATIC_GEOMETRY,
            EntityType::Platform | EntityType::Crusher => G::DYNAMIC_GEOMETRY,
            EntityType::Bone => G::BONE,
            EntityType::Object => G::OBJECT,
            EntityType::Player | EntityType::Enemy | EntityType::FriendlyActor | EntityType::Camera => G::ACTOR,
            EntityType::Collectable => G::OBJECT,
            EntityType::Particle => G::PARTICLE,
            EntityType::WaterZone
            | EntityType::KillZone
            | EntityType::DamageZone
            | EntityType::EventTrigger => G::ZONE,
            EntityType::Projectile => G::PROJECTILE,
            EntityType::Default | EntityType::Generator => G::NONE,
        }
    }

    pub fn resolve_solid_mask(ty: EntityType) -> CollisionGroup {
        use CollisionGroup as G;
        match ty {
            EntityType::Geometry | EntityType::Platform | EntityType::Crusher => {
                G::GEOMETRY_SOLIDS
            }
            EntityType::Bone => G::BONE_SOLIDS,
            EntityType::Object | EntityType::Camera => G::OBJECT_SOLIDS,
            EntityType::Player | EntityType::Enemy | EntityType::FriendlyActor => G::ACTOR_SOLIDS,
            EntityType::Collectable | EntityType::Particle | EntityType::Generator => {
                G::ALL_GEOMETRY
            }
            EntityType::Projectile => G::PROJECTILE_SOLIDS,
            EntityType::WaterZone
            | EntityType::KillZone
            | EntityType::DamageZone
            | EntityType::EventTrigger
            | EntityType::Default => G::NONE,
        }
    }

    pub fn resolve_interaction_mask(ty: EntityType) -> CollisionGroup {
        use CollisionGroup as G;
        match ty {
            EntityType::Geometry | EntityType::Bone | EntityType::Generator | EntityType::Default => {
                G::NONE
            }
            EntityType::Platform | EntityType::Object | EntityType::Camera => {
                G::OBJECT_INTERACTIONS
            }
            EntityType::Crusher => G::ACTOR | G::OBJECT | G::ALL_GEOMETRY,
            EntityType::Player => G::PLAYER_INTERACTIONS,
            EntityType::Enemy => G::ENEMY_INTERACTIONS,
            EntityType::FriendlyActor => G::OBJECT_INTERACTIONS,
            EntityType::Collectable => G::COLLECTABLE_INTERACTIONS,
            EntityType::Particle => G::ALL_GEOMETRY,
            EntityType::Projectile => G::HIT_DETECTION_INTERACTIONS,
            EntityType::EventTrigger => G::ACTOR,
            EntityType::WaterZone | EntityType::KillZone | EntityType::DamageZone => G::ALL,
        }
    }

    pub fn from_entity_type(ty: EntityType) -> Self {
        Self {
            group: Self::resolve_collision_group(ty),
            solid_mask: Self::resolve_solid_mask(ty),
            interaction_mask: Self::resolve_interaction_mask(ty),
        }
    }

    pub fn enabled(&self) -> bool {
        !(self.group.is_empty() && self.solid_mask.is_empty() && self.interaction_mask.is_empty())
    }
}
