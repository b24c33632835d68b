//! A cooperative, event-driven scripting and entity-state runtime layered over
//! `bevy::ecs` and `avian2d`: a type-keyed event bus, a registry façade around `World`, a
//! kinematic physics bridge, a stackful-coroutine-flavored script fiber runtime, and the
//! per-entity thread scheduler tying them together.
//!
//! Host applications add [`CorePlugin`] to their `bevy::app::App`; integration tests in
//! `tests/` do the same against a headless `App` (`common::test_utils`).

pub mod common;
pub mod entity_state;
pub mod event_bus;
pub mod physics;
pub mod registry;
pub mod script;

use avian2d::prelude::*;
use bevy::prelude::*;

use common::tunables::Tunables;

/// Composes every core plugin in the order the control-flow model requires: event-bus
/// drain, kinematic physics bridge, thread-scheduler tick, transform propagation — mapped
/// onto `PreUpdate → FixedPreUpdate → FixedPostUpdate → Update → PostUpdate` the way each
/// plugin's own `plugin(app)` schedules its systems.
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        let tunables = Tunables::default();

        app.add_plugins(PhysicsPlugins::default().with_length_unit(tunables.pixels_per_meter));
        app.insert_resource(Gravity::ZERO);
        app.insert_resource(tunables);

        app.add_plugins(common::clock::plugin);
        app.add_plugins(event_bus::plugin);
        app.add_plugins(registry::plugin);
        app.add_plugins(physics::plugin);
        app.add_plugins(entity_state::plugin);
    }
}
