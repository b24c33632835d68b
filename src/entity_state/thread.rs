//! `EntityThread` (`spec.md` §3, §4.E): one running fiber bound to an entity, plus
//! whatever state it's templated from.

use std::sync::{Arc, Mutex};
use std::task::Poll;

use bevy::prelude::*;

use crate::common::clock::ClockInstant;
use crate::script::control_flow::ControlFlowToken;
use crate::script::fiber::Fiber;

use super::state::ThreadTemplate;

/// Outbox shared by every fiber spawned for one entity's thread table; drained by the
/// scheduler right after each resume that populated it.
pub type SharedOutbox = Arc<Mutex<Vec<crate::script::script::ScriptCommand>>>;

/// One running (or just-completed) script instance.
pub struct EntityThread {
    pub thread_id: u64,
    pub local_instance: u32,
    pub state_binding: Option<&'static str>,
    fiber: Fiber,
    template: Option<ThreadTemplate>,
}

impl EntityThread {
    pub fn new(
        thread_id: u64,
        local_instance: u32,
        state_binding: Option<&'static str>,
        fiber: Fiber,
        template: Option<ThreadTemplate>,
    ) -> Self {
        Self { thread_id, local_instance, state_binding, fiber, template }
    }

    /// Drives the underlying fiber once. `Some(token)` means the thread finished this
    /// resume (`Complete`/`Restart`, or — defensively — any other token an entry point
    /// explicitly returned); `None` means it's still suspended.
    pub fn resume(&mut self, now: ClockInstant) -> Option<ControlFlowToken> {
        match self.fiber.poll_once(now) {
            Poll::Ready(token) => Some(token),
            Poll::Pending => None,
        }
    }

    pub fn deliver(&self, type_id: std::any::TypeId, event: Arc<dyn std::any::Any + Send + Sync>) {
        self.fiber.deliver(type_id, event);
    }

    pub fn wake(&self) {
        self.fiber.wake();
    }

    pub fn wake_hint(&self) -> crate::script::fiber::WakeHint {
        self.fiber.wake_hint()
    }

    /// Shared state backing this thread's fiber, so the scheduler can refresh
    /// self/parent/children before each resume (`spec.md` §6 "convenience accessors for
    /// self, player targeting, parent/child navigation").
    pub fn shared(&self) -> &Arc<Mutex<crate::script::fiber::FiberShared>> {
        &self.fiber.shared
    }

    /// Rebuilds this thread's fiber from its original template (`ControlFlowToken::Restart`,
    /// `SPEC_FULL.md` §9 open question 3). No-op if this thread was adopted from an
    /// already-constructed fiber with no template (`EntityThreadFiberSpawnCommand`).
    pub fn restart(&mut self, entity: Entity, outbox: SharedOutbox) -> bool {
        let Some(template) = &self.template else { return false };
        self.fiber = (template.factory)(entity, self.state_binding, None, outbox);
        true
    }
}

/// Per-entity collection of running threads, in insertion order (`spec.md` §4.E "deterministic
/// (insertion) order").
#[derive(Component, Default)]
pub struct EntityThreads {
    threads: Vec<EntityThread>,
    next_local_instance: u32,
    outbox: SharedOutbox,
}

impl EntityThreads {
    pub fn outbox(&self) -> SharedOutbox {
        self.outbox.clone()
    }

    pub fn next_local_instance(&mut self) -> u32 {
        let id = self.next_local_instance;
        self.next_local_instance += 1;
        id
    }

    pub fn push(&mut self, thread: EntityThread) {
        self.threads.push(thread);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityThread> {
        self.threads.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityThread> {
        self.threads.iter_mut()
    }

    pub fn find_by_id(&self, thread_id: u64) -> Option<usize> {
        self.threads.iter().position(|t| t.thread_id == thread_id)
    }

    pub fn remove(&mut self, index: usize) -> EntityThread {
        self.threads.remove(index)
    }

    pub fn retain_bound_to(&mut self, state: &str) -> Vec<EntityThread> {
        let mut terminated = Vec::new();
        let mut i = 0;
        while i < self.threads.len() {
            if self.threads[i].state_binding == Some(state) {
                terminated.push(self.threads.remove(i));
            } else {
                i += 1;
            }
        }
        terminated
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
