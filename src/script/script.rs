//! `Script`/`ScriptContext` (`spec.md` §3 "Script"): the authoring surface a script body
//! sees, and the declarative commands it queues for the scheduler to enact against the
//! world (`spec.md` §4.D "EntityInstruction").
//!
//! World access never crosses an `.await` point: a script reads cached self/parent/child
//! ids off the fiber's shared state (refreshed by the scheduler before each resume) and
//! writes through `ScriptCommand`s the scheduler drains synchronously right after the
//! resume that produced them.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bevy::prelude::{Entity, World};

use super::awaiter::{
    AnyEventAwaiter, ConditionalEventAwaiter, EventAwaiter, NextUpdateAwaiter, PauseAwaiter, SleepAwaiter,
    UntilWakeAwaiter,
};
use super::fiber::{Fiber, FiberShared};

/// A declarative instruction queued by a script body, enacted by the scheduler against
/// `&mut World` immediately after the resume that produced it.
pub enum ScriptCommand {
    Patch(Box<dyn FnOnce(&mut World) + Send>),
    ChangeState { entity: Entity, new_state: &'static str },
    SpawnChildScript { parent: Entity, thread_name: &'static str, fiber: Fiber },
    Emit(Box<dyn Any + Send + Sync>),
}

/// The authoring handle passed into a script's async body.
#[derive(Clone)]
pub struct ScriptContext {
    shared: Arc<Mutex<FiberShared>>,
    outbox: Arc<Mutex<Vec<ScriptCommand>>>,
}

impl ScriptContext {
    pub fn new(shared: Arc<Mutex<FiberShared>>, outbox: Arc<Mutex<Vec<ScriptCommand>>>) -> Self {
        Self { shared, outbox }
    }

    pub fn entity(&self) -> Entity {
        self.shared.lock().unwrap().entity
    }

    pub fn parent(&self) -> Option<Entity> {
        self.shared.lock().unwrap().parent
    }

    pub fn children(&self) -> Vec<Entity> {
        self.shared.lock().unwrap().children.clone()
    }

    /// `ControlFlowToken::NextUpdate`.
    pub fn next_update(&self) -> NextUpdateAwaiter {
        NextUpdateAwaiter::new(self.shared.clone())
    }

    /// `ControlFlowToken::UntilWake`.
    pub fn until_wake(&self) -> UntilWakeAwaiter {
        UntilWakeAwaiter::new(self.shared.clone())
    }

    /// `EventYieldRequest{type_id}`.
    pub fn event<T: Any + Send + Sync + Clone>(&self) -> EventAwaiter<T> {
        EventAwaiter::new(self.shared.clone())
    }

    /// `EventYieldRequest{type_id: None}`: wake on the next event of *any* type, delivered
    /// still type-erased (`spec.md` §4.E "pending-event-type is T or 'any' (zero)").
    pub fn until_any_event(&self) -> AnyEventAwaiter {
        AnyEventAwaiter::new(self.shared.clone())
    }

    /// `ConditionalYieldRequest` over an event: wake only when `predicate(&event)` holds.
    pub fn wait_for<T, F>(&self, predicate: F) -> ConditionalEventAwaiter<T, F>
    where
        T: Any + Send + Sync + Clone,
        F: FnMut(&T) -> bool,
    {
        ConditionalEventAwaiter::new(self.shared.clone(), predicate)
    }

    /// `ConditionalYieldRequest` over a pure arity-0 pause predicate.
    pub fn wait_until<F: FnMut() -> bool>(&self, predicate: F) -> PauseAwaiter<F> {
        PauseAwaiter::new(self.shared.clone(), predicate)
    }

    /// `Duration` yield, relative to now.
    pub fn sleep(&self, duration: Duration) -> SleepAwaiter {
        SleepAwaiter::new(self.shared.clone(), duration)
    }

    /// `EntityStateHash`: request a state change on the executing entity. The scheduler
    /// validates and terminates the current thread if it was bound to the old state
    /// (`spec.md` §4.D).
    pub fn change_state(&self, new_state: &'static str) {
        self.outbox.lock().unwrap().push(ScriptCommand::ChangeState { entity: self.entity(), new_state });
    }

    /// Queues a mutation against the registry, applied right after this resume.
    pub fn patch(&self, mutator: impl FnOnce(&mut World) + Send + 'static) {
        self.outbox.lock().unwrap().push(ScriptCommand::Patch(Box::new(mutator)));
    }

    /// Queues an event for synchronous dispatch through the bus right after this resume.
    pub fn emit(&self, event: impl Any + Send + Sync) {
        self.outbox.lock().unwrap().push(ScriptCommand::Emit(Box::new(event)));
    }

    /// Spawns `fiber` as a child script on the same entity — used for the "child script
    /// inheritance" pattern (`spec.md` §8 scenario 6): the child keeps running
    /// independently of whatever happens to the thread that spawned it.
    pub fn spawn_child_script(&self, thread_name: &'static str, fiber: Fiber) {
        self.outbox.lock().unwrap().push(ScriptCommand::SpawnChildScript {
            parent: self.entity(),
            thread_name,
            fiber,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::control_flow::ControlFlowToken;
    use std::task::Poll;

    fn make_fiber<F, Fut>(entity: Entity, body: F) -> (Fiber, Arc<Mutex<Vec<ScriptCommand>>>)
    where
        F: FnOnce(ScriptContext) -> Fut,
        Fut: std::future::Future<Output = ControlFlowToken> + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(FiberShared::new(entity)));
        let outbox = Arc::new(Mutex::new(Vec::new()));
        let ctx = ScriptContext::new(shared.clone(), outbox.clone());
        (Fiber::new(shared, Box::pin(body(ctx))), outbox)
    }

    #[test]
    fn script_body_suspends_on_next_update_then_completes() {
        let (mut fiber, _outbox) = make_fiber(Entity::PLACEHOLDER, |ctx| async move {
            ctx.next_update().await;
            ControlFlowToken::Complete
        });

        assert_eq!(fiber.poll_once(crate::common::clock::ClockInstant::ZERO), Poll::Pending);
        assert_eq!(fiber.poll_once(crate::common::clock::ClockInstant::ZERO), Poll::Ready(ControlFlowToken::Complete));
    }

    #[test]
    fn change_state_queues_a_command() {
        let (mut fiber, outbox) = make_fiber(Entity::PLACEHOLDER, |ctx| async move {
            ctx.change_state("run");
            ControlFlowToken::Complete
        });

        fiber.poll_once(crate::common::clock::ClockInstant::ZERO);
        assert_eq!(outbox.lock().unwrap().len(), 1);
    }
}
