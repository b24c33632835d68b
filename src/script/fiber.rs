//! The fiber itself (`spec.md` §3 "Fiber", §9 "Coroutine control flow").
//!
//! Rust has no native stackful coroutine; `spec.md`'s own design note says the mechanism
//! is free as long as the observable contract holds. Here a fiber is a boxed `Future`
//! driven by one `poll` call per scheduling opportunity (a tick dispatch or an event
//! dispatch), with a small piece of state — [`FiberShared`] — shared between the future
//! and the scheduler via `Arc<Mutex<_>>` so the scheduler can deposit a captured event or
//! an explicit wake before polling, and read back what the fiber is now waiting on.

use std::any::{Any, TypeId};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use bevy::prelude::Entity;

use crate::common::clock::ClockInstant;

use super::control_flow::ControlFlowToken;

/// What a suspended fiber is currently waiting on, as last reported by its innermost
/// awaiter. Read by the scheduler to decide which threads to attempt on event dispatch
/// without polling every suspended thread for every event (`spec.md` §4.E "event
/// dispatch").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeHint {
    /// Nothing registered yet; resume unconditionally on the next tick.
    NextUpdate,
    /// Waiting on an explicit `wake()` call.
    Wake,
    /// Waiting on an event of this type.
    EventType(TypeId),
    /// Waiting on any event at all, regardless of type (`spec.md` §4.E "pending-event-type
    /// is T or 'any' (zero)").
    AnyEvent,
    /// Waiting on the clock (a `Timer`/`Duration` yield).
    Timer,
}

/// State shared between a fiber's awaiters and whatever drives `poll` on it.
pub struct FiberShared {
    pub wake_hint: WakeHint,
    /// The event that woke this fiber, kept behind `Arc` (not `Box`) because the same
    /// delivered event may be handed to several threads awaiting the same type in one
    /// dispatch pass (`spec.md` §4.E "event dispatch").
    pub captured_event: Option<(TypeId, Arc<dyn Any + Send + Sync>)>,
    pub woken: bool,
    pub now: ClockInstant,
    pub entity: Entity,
    pub parent: Option<Entity>,
    pub children: Vec<Entity>,
}

impl FiberShared {
    pub fn new(entity: Entity) -> Self {
        Self {
            wake_hint: WakeHint::NextUpdate,
            captured_event: None,
            woken: false,
            now: ClockInstant::ZERO,
            entity,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Deposits `event`, to be picked up by whichever awaiter is registered for its type.
    pub fn deliver(&mut self, type_id: TypeId, event: Arc<dyn Any + Send + Sync>) {
        self.captured_event = Some((type_id, event));
    }

    pub fn wake(&mut self) {
        self.woken = true;
    }
}

/// A running script instance: a boxed future plus the state shared with its awaiters.
///
/// `Output = ControlFlowToken` only at the top level — a script's entry-point async
/// function returns its terminal token (`Complete` on ordinary fall-through, or `Restart`
/// if explicitly requested); everything in between is internal suspension via ordinary
/// `.await`, not part of this type.
pub struct Fiber {
    future: Pin<Box<dyn Future<Output = ControlFlowToken> + Send>>,
    pub shared: Arc<Mutex<FiberShared>>,
}

impl Fiber {
    pub fn new(
        shared: Arc<Mutex<FiberShared>>,
        future: Pin<Box<dyn Future<Output = ControlFlowToken> + Send>>,
    ) -> Self {
        Self { future, shared }
    }

    /// Drives the fiber forward exactly once. `now` is stamped onto the shared state
    /// before polling so timer-based awaiters see a fresh reading.
    pub fn poll_once(&mut self, now: ClockInstant) -> Poll<ControlFlowToken> {
        self.shared.lock().unwrap().now = now;

        let waker = Waker::noop();
        let mut cx = Context::from_waker(waker);
        self.future.as_mut().poll(&mut cx)
    }

    pub fn wake_hint(&self) -> WakeHint {
        self.shared.lock().unwrap().wake_hint
    }

    pub fn deliver(&self, type_id: TypeId, event: Arc<dyn Any + Send + Sync>) {
        self.shared.lock().unwrap().deliver(type_id, event);
    }

    pub fn wake(&self) {
        self.shared.lock().unwrap().wake();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_fiber(entity: Entity) -> Fiber {
        let shared = Arc::new(Mutex::new(FiberShared::new(entity)));
        Fiber::new(shared, Box::pin(async { ControlFlowToken::Complete }))
    }

    #[test]
    fn a_future_that_completes_immediately_resolves_on_first_poll() {
        let mut fiber = noop_fiber(Entity::PLACEHOLDER);
        assert_eq!(fiber.poll_once(ClockInstant::ZERO), Poll::Ready(ControlFlowToken::Complete));
    }
}
