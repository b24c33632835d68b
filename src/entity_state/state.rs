//! `EntityState` (`spec.md` §3 "EntityState"): a named collection of thread-entry
//! templates, plus the command that requests a transition between states.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::prelude::*;

use super::thread::SharedOutbox;
use crate::script::fiber::Fiber;

/// A spawnable script entry point bound to one `thread_id` within a state.
#[derive(Clone)]
pub struct ThreadTemplate {
    pub thread_id: u64,
    pub factory: Arc<dyn Fn(Entity, Option<&'static str>, Option<&'static str>, SharedOutbox) -> Fiber + Send + Sync>,
}

/// Named collection of thread-entry templates (`spec.md` §3 "EntityState").
#[derive(Clone, Default)]
pub struct EntityState {
    pub name: &'static str,
    pub templates: Vec<ThreadTemplate>,
}

impl EntityState {
    pub fn new(name: &'static str) -> Self {
        Self { name, templates: Vec::new() }
    }

    pub fn with_thread(mut self, template: ThreadTemplate) -> Self {
        self.templates.push(template);
        self
    }
}

/// Registry of every named `EntityState` a script bootstrap may request by name.
#[derive(Resource, Default)]
pub struct EntityStateTable {
    states: HashMap<&'static str, EntityState>,
}

impl EntityStateTable {
    pub fn register(&mut self, state: EntityState) {
        self.states.insert(state.name, state);
    }

    pub fn get(&self, name: &str) -> Option<&EntityState> {
        self.states.get(name)
    }

    /// All registered states, for the `thread_id`-only lookup `EntityThreadSpawnCommand`
    /// needs (`spec.md` §4.E "look up or template a new fiber for `thread_id`").
    pub fn all(&self) -> impl Iterator<Item = &EntityState> {
        self.states.values()
    }

    pub fn find_template(&self, thread_id: u64) -> Option<&ThreadTemplate> {
        self.all().find_map(|s| s.templates.iter().find(|t| t.thread_id == thread_id))
    }
}

/// The state-hash an entity currently has bound threads for; `None` means no state has
/// ever been applied to this entity.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurrentEntityState(pub Option<&'static str>);

/// `StateChangeCommand{entity, new_state}` (`spec.md` §4.E): terminate threads bound to the
/// current state, transition, then spawn the new state's templates.
#[derive(Debug, Clone, Copy)]
pub struct StateChangeCommand {
    pub entity: Entity,
    pub new_state: &'static str,
}
