//! Integration test harness.
//!
//! Keep integration tests headless: `MinimalPlugins` provides the core ECS runtime
//! (time, schedules, task pools) and `kinescript::CorePlugin` installs the event bus,
//! registry, physics bridge, and entity-state scheduler on top of it.

use bevy::prelude::*;

pub fn app_headless() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(kinescript::CorePlugin);
    app
}
