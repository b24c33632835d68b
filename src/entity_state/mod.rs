//! Entity-State & Thread Scheduler (`spec.md` §4.E): owns every entity's running
//! threads, dispatches ticks and bus events to them, and enacts the declarative commands
//! a resumed script queues (`ScriptCommand`) or that outside code queues (`SpawnQueue`).
//!
//! The event bus has no `World` access, so it cannot resume a fiber itself when an event
//! it's holding matches a thread's wait. Instead every event the bus ever dispatches is
//! mirrored, via [`EventBus::subscribe_any`], into an [`EventLog`] this module owns; an
//! exclusive system drains that log and performs the actual dispatch against `&mut World`
//! (`spec.md` §4.E "event dispatch (invoked by the bus drain loop)").

pub mod bootstrap;
pub mod commands;
pub mod state;
pub mod thread;

pub use commands::{EntityThreadFiberSpawnCommand, EntityThreadSpawnCommand, SpawnFlags};
pub use state::{CurrentEntityState, EntityState, EntityStateTable, StateChangeCommand, ThreadTemplate};
pub use thread::{EntityThread, EntityThreads};

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bevy::prelude::*;

use crate::common::clock::Clock;
use crate::event_bus::events::OnThreadComplete;
use crate::event_bus::EventBus;
use crate::registry::Relationship;
use crate::script::control_flow::ControlFlowToken;
use crate::script::script::ScriptCommand;

/// Every event the bus dispatches, mirrored here so the scheduler can match it against
/// suspended threads without the bus needing `World` access.
#[derive(Resource, Clone, Default)]
pub struct EventLog(Arc<Mutex<VecDeque<(TypeId, Arc<dyn Any + Send + Sync>)>>>);

impl EventLog {
    fn push(&self, type_id: TypeId, event: Arc<dyn Any + Send + Sync>) {
        self.0.lock().unwrap().push_back((type_id, event));
    }

    fn pop(&self) -> Option<(TypeId, Arc<dyn Any + Send + Sync>)> {
        self.0.lock().unwrap().pop_front()
    }
}

/// Spawn/state-change requests queued by gameplay code outside of a running script
/// (`spec.md` §4.E "Spawn operations"). Scripts themselves queue the equivalent through
/// their own per-entity [`ScriptCommand`] outbox, applied inline as part of dispatch.
#[derive(Resource, Default)]
pub struct SpawnQueue {
    threads: Vec<EntityThreadSpawnCommand>,
    fibers: Vec<EntityThreadFiberSpawnCommand>,
    state_changes: Vec<StateChangeCommand>,
}

impl SpawnQueue {
    pub fn spawn_thread(&mut self, cmd: EntityThreadSpawnCommand) {
        self.threads.push(cmd);
    }

    pub fn spawn_fiber(&mut self, cmd: EntityThreadFiberSpawnCommand) {
        self.fibers.push(cmd);
    }

    pub fn change_state(&mut self, cmd: StateChangeCommand) {
        self.state_changes.push(cmd);
    }
}

/// Registers the bus mirror, resources, and the dispatch systems with `app`.
pub fn plugin(app: &mut App) {
    app.init_resource::<EntityStateTable>();
    app.init_resource::<SpawnQueue>();

    let log = EventLog::default();
    {
        let log = log.clone();
        let mut bus = app.world_mut().get_resource_or_init::<EventBus>();
        bus.subscribe_any(move |type_id, event| log.push(type_id, event.clone()));
    }
    app.insert_resource(log);

    // `apply_spawn_queue_system` runs before this frame's event-bus drain so a
    // `StateChangeCommand` queued by gameplay code takes effect — terminating threads
    // bound to the old state — before any event queued in the same frame can reach them
    // (`spec.md` §8 scenario 2: "thread terminates without receiving the pending `OnHit`
    // even if one is queued in the same drain cycle"). `EventBusPlugin` registers its own
    // `update_system` in `PreUpdate`; ordering against it here (rather than re-adding it)
    // keeps `EventBusPlugin` usable standalone.
    app.add_systems(PreUpdate, apply_spawn_queue_system.before(crate::event_bus::update_system));
    app.add_systems(PreUpdate, drain_event_log_system.after(crate::event_bus::update_system));
    app.add_systems(Update, (tick_dispatch_system, drain_event_log_system).chain());
}

/// Drains every event mirrored into [`EventLog`] since it was last drained, dispatching
/// each to every thread currently awaiting that event's type, or awaiting any event at all
/// (`spec.md` §4.E).
pub fn drain_event_log_system(world: &mut World) {
    loop {
        let Some((type_id, event)) = world.resource::<EventLog>().pop() else { break };
        dispatch_event_to_threads(world, type_id, event);
    }
}

fn dispatch_event_to_threads(world: &mut World, type_id: TypeId, event: Arc<dyn Any + Send + Sync>) {
    let entities: Vec<Entity> = {
        let mut query = world.query::<(Entity, &EntityThreads)>();
        query.iter(world).map(|(e, _)| e).collect()
    };

    for entity in entities {
        // Descending so a termination triggered by an earlier index in this same batch
        // never shifts the indices still left to process.
        let mut matching: Vec<usize> = {
            let Some(threads) = world.get::<EntityThreads>(entity) else { continue };
            threads
                .iter()
                .enumerate()
                .filter(|(_, t)| {
                    matches!(t.wake_hint(), crate::script::fiber::WakeHint::EventType(t) if t == type_id)
                        || matches!(t.wake_hint(), crate::script::fiber::WakeHint::AnyEvent)
                })
                .map(|(i, _)| i)
                .collect()
        };
        matching.sort_unstable_by(|a, b| b.cmp(a));

        let Some(outbox) = world.get::<EntityThreads>(entity).map(|t| t.outbox()) else { continue };

        for index in matching {
            let now = world.resource::<Clock>().now();
            refresh_thread_context(world, entity);

            let finished = {
                let Some(mut threads) = world.get_mut::<EntityThreads>(entity) else { continue };
                let Some(thread) = threads.iter_mut().nth(index) else { continue };
                thread.deliver(type_id, event.clone());
                thread.resume(now)
            };

            if let Some(token) = finished {
                finish_thread_by_index(world, entity, index, token);
            }

            apply_outbox(world, entity, &outbox);
        }
    }
}

/// Refreshes a thread's cached self/parent/children before it's resumed
/// (`spec.md` §6 "convenience accessors for self, player targeting, parent/child
/// navigation").
fn refresh_thread_context(world: &mut World, entity: Entity) {
    let (parent, children) = match world.get::<Relationship>(entity) {
        Some(rel) => (rel.parent, crate::registry::relationship::children(world, entity)),
        None => (None, Vec::new()),
    };

    let Some(threads) = world.get::<EntityThreads>(entity) else { return };
    for thread in threads.iter() {
        let mut shared = thread.shared().lock().unwrap();
        shared.parent = parent;
        shared.children = children.clone();
    }
}

/// Removes a finished thread and emits `OnThreadComplete` for it. `Restart` rebuilds the
/// thread's fiber from its template in place instead of removing it.
fn finish_thread_by_index(world: &mut World, entity: Entity, index: usize, token: ControlFlowToken) {
    if token == ControlFlowToken::Restart {
        let outbox = world.get::<EntityThreads>(entity).map(|t| t.outbox());
        if let (Some(mut threads), Some(outbox)) = (world.get_mut::<EntityThreads>(entity), outbox) {
            if let Some(thread) = threads.iter_mut().nth(index) {
                if thread.restart(entity, outbox) {
                    return;
                }
            }
        }
    }

    let removed = {
        let Some(mut threads) = world.get_mut::<EntityThreads>(entity) else { return };
        if index >= threads.iter().count() {
            return;
        }
        threads.remove(index)
    };

    if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
        bus.event(OnThreadComplete { entity, thread_id: removed.thread_id });
    }
}

/// Applies every `ScriptCommand` a thread's resume queued, in order.
fn apply_outbox(world: &mut World, entity: Entity, outbox: &thread::SharedOutbox) {
    let commands: Vec<ScriptCommand> = std::mem::take(&mut *outbox.lock().unwrap());

    for command in commands {
        match command {
            ScriptCommand::Patch(mutator) => mutator(world),
            ScriptCommand::ChangeState { entity, new_state } => perform_state_change(world, entity, new_state),
            ScriptCommand::Emit(event) => {
                if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
                    bus.event_dyn(event);
                }
            }
            ScriptCommand::SpawnChildScript { parent, thread_name, fiber } => {
                spawn_detached_child(world, parent, thread_name, fiber);
            }
        }
    }

    let _ = entity;
}

fn spawn_detached_child(world: &mut World, parent: Entity, thread_name: &'static str, fiber: crate::script::fiber::Fiber) {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    thread_name.hash(&mut hasher);
    let thread_id = hasher.finish();

    let Some(mut threads) = world.get_mut::<EntityThreads>(parent) else { return };
    let local_instance = threads.next_local_instance();
    threads.push(EntityThread::new(thread_id, local_instance, None, fiber, None));
}

/// `StateChangeCommand` (`spec.md` §4.E "State transitions"): terminate threads bound to
/// the current state, transition, then spawn the threads templated by the new state.
pub fn perform_state_change(world: &mut World, entity: Entity, new_state: &'static str) {
    let previous_state = world.get::<CurrentEntityState>(entity).and_then(|s| s.0);

    let terminated: Vec<EntityThread> = match (previous_state, world.get_mut::<EntityThreads>(entity)) {
        (Some(old), Some(mut threads)) => threads.retain_bound_to(old),
        _ => Vec::new(),
    };

    for thread in &terminated {
        if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
            bus.event(OnThreadComplete { entity, thread_id: thread.thread_id });
        }
    }

    if world.get::<CurrentEntityState>(entity).is_some() {
        world.get_mut::<CurrentEntityState>(entity).unwrap().0 = Some(new_state);
    } else {
        world.entity_mut(entity).insert(CurrentEntityState(Some(new_state)));
    }

    let templates: Vec<ThreadTemplate> = {
        let table = world.resource::<EntityStateTable>();
        table.get(new_state).map(|s| s.templates.clone()).unwrap_or_default()
    };

    if templates.is_empty() {
        return;
    }

    if !world.entity(entity).contains::<EntityThreads>() {
        world.entity_mut(entity).insert(EntityThreads::default());
    }

    let outbox = world.get::<EntityThreads>(entity).unwrap().outbox();

    for template in templates {
        let local_instance = {
            let mut threads = world.get_mut::<EntityThreads>(entity).unwrap();
            threads.next_local_instance()
        };
        let fiber = (template.factory)(entity, Some(new_state), previous_state, outbox.clone());
        let thread = EntityThread::new(template.thread_id, local_instance, Some(new_state), fiber, Some(template.clone()));
        world.get_mut::<EntityThreads>(entity).unwrap().push(thread);
    }
}

/// `EntityThreadSpawnCommand` (`spec.md` §4.E "Spawn operations"): look up or template a
/// new fiber for `thread_id`, attach it to `target`, bind it to `state_binding` if
/// provided.
pub fn apply_thread_spawn_command(world: &mut World, cmd: EntityThreadSpawnCommand) {
    let Some(template) = world.resource::<EntityStateTable>().find_template(cmd.thread_id).cloned() else { return };

    if !world.entity(cmd.target).contains::<EntityThreads>() {
        world.entity_mut(cmd.target).insert(EntityThreads::default());
    }

    if cmd.restart_existing {
        let existing = world.get::<EntityThreads>(cmd.target).and_then(|t| t.find_by_id(cmd.thread_id));
        if let Some(index) = existing {
            let removed = world.get_mut::<EntityThreads>(cmd.target).unwrap().remove(index);
            if let Some(mut bus) = world.get_resource_mut::<EventBus>() {
                bus.event(OnThreadComplete { entity: cmd.target, thread_id: removed.thread_id });
            }
        }
    }

    let outbox = world.get::<EntityThreads>(cmd.target).unwrap().outbox();
    let previous_state = world.get::<CurrentEntityState>(cmd.target).and_then(|s| s.0);
    let local_instance = world.get_mut::<EntityThreads>(cmd.target).unwrap().next_local_instance();
    let fiber = (template.factory)(cmd.target, cmd.state_binding, previous_state, outbox);
    let thread = EntityThread::new(template.thread_id, local_instance, cmd.state_binding, fiber, Some(template));
    world.get_mut::<EntityThreads>(cmd.target).unwrap().push(thread);
}

/// `EntityThreadFiberSpawnCommand`: adopt an already-constructed fiber.
pub fn apply_fiber_spawn_command(world: &mut World, cmd: EntityThreadFiberSpawnCommand) {
    if !world.entity(cmd.target).contains::<EntityThreads>() {
        world.entity_mut(cmd.target).insert(EntityThreads::default());
    }

    let state_binding = if cmd.flags.contains(SpawnFlags::DETACHED) { None } else { cmd.source_state_binding };
    let local_instance = world.get_mut::<EntityThreads>(cmd.target).unwrap().next_local_instance();
    let thread = EntityThread::new(cmd.script_handle, local_instance, state_binding, cmd.fiber, None);
    world.get_mut::<EntityThreads>(cmd.target).unwrap().push(thread);
}

fn apply_spawn_queue_system(world: &mut World) {
    let (state_changes, threads, fibers) = {
        let mut queue = world.resource_mut::<SpawnQueue>();
        (
            std::mem::take(&mut queue.state_changes),
            std::mem::take(&mut queue.threads),
            std::mem::take(&mut queue.fibers),
        )
    };

    for cmd in state_changes {
        perform_state_change(world, cmd.entity, cmd.new_state);
    }
    for cmd in threads {
        apply_thread_spawn_command(world, cmd);
    }
    for cmd in fibers {
        apply_fiber_spawn_command(world, cmd);
    }
}

/// Scheduler tick dispatch (`spec.md` §4.E "Tick dispatch"): resume every thread in
/// deterministic insertion order, applying whatever its outbox queued immediately after.
pub fn tick_dispatch_system(world: &mut World) {
    let _span = tracing::info_span!("entity_state_tick_dispatch").entered();

    let entities: Vec<Entity> = {
        let mut query = world.query::<(Entity, &EntityThreads)>();
        query.iter(world).map(|(e, _)| e).collect()
    };

    let now = world.resource::<Clock>().now();

    for entity in entities {
        refresh_thread_context(world, entity);

        let thread_count = world.get::<EntityThreads>(entity).map(|t| t.iter().count()).unwrap_or(0);
        let mut finished: Vec<(usize, ControlFlowToken)> = Vec::new();

        // Resume every thread by its original index first; removals are deferred to
        // after this loop (highest index first) so they never shift an index we still
        // need to resume in this same pass.
        for index in 0..thread_count {
            let Some(mut threads) = world.get_mut::<EntityThreads>(entity) else { break };
            let Some(thread) = threads.iter_mut().nth(index) else { continue };
            if let Some(token) = thread.resume(now) {
                finished.push((index, token));
            }
        }

        let outbox = world.get::<EntityThreads>(entity).map(|t| t.outbox());

        // Apply terminations highest-index-first so earlier indices stay valid.
        for (index, token) in finished.into_iter().rev() {
            finish_thread_by_index(world, entity, index, token);
        }

        if let Some(outbox) = outbox {
            apply_outbox(world, entity, &outbox);
        }
    }
}
