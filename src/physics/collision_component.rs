//! Collision component data (`spec.md` §3 "Collision component").
//!
//! The collision *shape* and *collision object* are avian2d's own `Collider`/`RigidBody`;
//! this module only adds the group/mask/mass/kinematic-policy data the bridge needs on
//! top of them, plus the conversion into avian2d's `CollisionLayers`.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::collision_group::CollisionGroup;

/// Group membership plus solid/interaction masks for one entity.
///
/// Solid and interaction masks are not mutually exclusive — a pair of entities can be
/// both solid-colliding and interaction-observing at once (`spec.md` GLOSSARY).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionProfile {
    pub group: CollisionGroup,
    pub solid_mask: CollisionGroup,
    pub interaction_mask: CollisionGroup,
}

impl CollisionProfile {
    pub fn new(group: CollisionGroup, solid_mask: CollisionGroup, interaction_mask: CollisionGroup) -> Self {
        Self { group, solid_mask, interaction_mask }
    }

    /// `group ∩ StaticGeometry ⇒ not kinematic` (`spec.md` §3 invariant).
    pub fn is_static_geometry(&self) -> bool {
        self.group.contains(CollisionGroup::STATIC_GEOMETRY)
    }

    /// The union of both masks is what avian2d's narrow phase needs to let contacts
    /// through at all; the bridge then re-derives solid vs. interaction itself from the
    /// stored masks rather than relying on avian2d to make that distinction.
    pub fn combined_filter(&self) -> CollisionGroup {
        self.solid_mask | self.interaction_mask
    }

    pub fn to_collision_layers(&self) -> CollisionLayers {
        CollisionLayers::new(LayerMask(self.group.bits()), LayerMask(self.combined_filter().bits()))
    }
}

/// Mass used for influence weighting (`spec.md` §4.C "influence step"). `None` defaults
/// to `1.0`; `Some(0.0)` is the "infinite mass" sentinel used by the influence formula.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct KinematicMass(pub Option<f32>);

impl KinematicMass {
    pub fn value(&self) -> f32 {
        self.0.unwrap_or(1.0)
    }

    pub fn is_infinite(&self) -> bool {
        self.0 == Some(0.0)
    }
}

/// Marker: this entity participates in kinematic resolution at all (has a collision
/// object with the kinematic flag set, per the §3 invariant "kinematic ⇒ has
/// collision-object flag set").
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Kinematic;

/// Violations of `spec.md` §3's collision-component invariants, caught at construction
/// time rather than left to silently misbehave at tick time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CollisionComponentError {
    /// "group ∩ StaticGeometry ⇒ not kinematic".
    #[error("entity in the StaticGeometry group cannot also be kinematic")]
    StaticGeometryCannotBeKinematic,
}

/// Builds the bundle of components one entity's collision setup requires, enforcing the
/// invariants `spec.md` §3 states for the "Collision component" as a whole rather than
/// leaving them to be violated piecemeal by inserting each component separately.
pub struct CollisionComponentBuilder {
    profile: CollisionProfile,
    kinematic_config: Option<super::kinematic::KinematicResolutionConfig>,
    mass: Option<f32>,
}

impl CollisionComponentBuilder {
    pub fn new(profile: CollisionProfile) -> Self {
        Self { profile, kinematic_config: None, mass: None }
    }

    pub fn kinematic(mut self, config: super::kinematic::KinematicResolutionConfig) -> Self {
        self.kinematic_config = Some(config);
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Validates and produces the component bundle. `Kinematic` is only present in the
    /// returned tuple if a kinematic config was supplied.
    pub fn build(
        self,
    ) -> Result<(CollisionProfile, KinematicMass, Option<(Kinematic, super::kinematic::KinematicResolutionConfig)>), CollisionComponentError>
    {
        if self.kinematic_config.is_some() && self.profile.is_static_geometry() {
            return Err(CollisionComponentError::StaticGeometryCannotBeKinematic);
        }

        let kinematic = self.kinematic_config.map(|config| (Kinematic, config));
        Ok((self.profile, KinematicMass(self.mass), kinematic))
    }
}
