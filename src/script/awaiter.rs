//! Awaiter adapters (`spec.md` §4.D "Awaiter adapters"): each yield-vocabulary construct
//! is realized here as a small `Future` over the fiber's [`FiberShared`], so script bodies
//! write `ctx.wait_for::<OnHit>().await` instead of manually yielding request values.

use std::any::{Any, TypeId};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use super::fiber::{FiberShared, WakeHint};

/// `ControlFlowToken::NextUpdate`: Pending exactly once, Ready on the following poll.
pub struct NextUpdateAwaiter {
    shared: Arc<Mutex<FiberShared>>,
    polled: bool,
}

impl NextUpdateAwaiter {
    pub fn new(shared: Arc<Mutex<FiberShared>>) -> Self {
        Self { shared, polled: false }
    }
}

impl Future for NextUpdateAwaiter {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if !this.polled {
            this.polled = true;
            this.shared.lock().unwrap().wake_hint = WakeHint::NextUpdate;
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}

/// `ControlFlowToken::UntilWake`: suspends until `FiberShared::wake` is called.
pub struct UntilWakeAwaiter {
    shared: Arc<Mutex<FiberShared>>,
}

impl UntilWakeAwaiter {
    pub fn new(shared: Arc<Mutex<FiberShared>>) -> Self {
        Self { shared }
    }
}

impl Future for UntilWakeAwaiter {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let mut shared = self.shared.lock().unwrap();
        if shared.woken {
            shared.woken = false;
            Poll::Ready(())
        } else {
            shared.wake_hint = WakeHint::Wake;
            Poll::Pending
        }
    }
}

/// `EventYieldRequest{type_id}`: suspends until the bus delivers an event of type `T`.
pub struct EventAwaiter<T> {
    shared: Arc<Mutex<FiberShared>>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync + Clone> EventAwaiter<T> {
    pub fn new(shared: Arc<Mutex<FiberShared>>) -> Self {
        Self { shared, _marker: std::marker::PhantomData }
    }
}

impl<T: Any + Send + Sync + Clone> Future for EventAwaiter<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
        let mut shared = self.shared.lock().unwrap();
        let wanted = TypeId::of::<T>();

        if let Some((type_id, arc)) = &shared.captured_event {
            if *type_id == wanted {
                if let Some(event) = arc.downcast_ref::<T>().cloned() {
                    shared.captured_event = None;
                    return Poll::Ready(event);
                }
            }
        }

        shared.wake_hint = WakeHint::EventType(wanted);
        Poll::Pending
    }
}

/// `EventYieldRequest{type_id: None}` (`until_any_event`): suspends until the bus delivers
/// an event of *any* type, without narrowing to one beforehand. The type is only known once
/// something actually arrives, so the output is the raw, still-erased event.
pub struct AnyEventAwaiter {
    shared: Arc<Mutex<FiberShared>>,
}

impl AnyEventAwaiter {
    pub fn new(shared: Arc<Mutex<FiberShared>>) -> Self {
        Self { shared }
    }
}

impl Future for AnyEventAwaiter {
    type Output = (TypeId, Arc<dyn Any + Send + Sync>);

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.lock().unwrap();

        if let Some(captured) = shared.captured_event.take() {
            return Poll::Ready(captured);
        }

        shared.wake_hint = WakeHint::AnyEvent;
        Poll::Pending
    }
}

/// `ConditionalYieldRequest{underlying, predicate}`: wraps an event awaiter with a
/// predicate evaluated against the delivered event; rejected events are discarded and the
/// awaiter re-registers interest rather than surfacing them.
pub struct ConditionalEventAwaiter<T, F> {
    inner: EventAwaiter<T>,
    predicate: F,
}

impl<T, F> ConditionalEventAwaiter<T, F>
where
    T: Any + Send + Sync + Clone,
    F: FnMut(&T) -> bool,
{
    pub fn new(shared: Arc<Mutex<FiberShared>>, predicate: F) -> Self {
        Self { inner: EventAwaiter::new(shared), predicate }
    }
}

impl<T, F> Future for ConditionalEventAwaiter<T, F>
where
    T: Any + Send + Sync + Clone,
    F: FnMut(&T) -> bool,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll(cx) {
                Poll::Ready(event) => {
                    if (this.predicate)(&event) {
                        return Poll::Ready(event);
                    }
                    // Rejected: inner already cleared its captured slot and will go
                    // Pending (and re-register) on the next iteration.
                    continue;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Arity-0 pause predicate (`ctx.wait_until`): re-evaluated with no event every tick until
/// it returns true.
pub struct PauseAwaiter<F> {
    shared: Arc<Mutex<FiberShared>>,
    predicate: F,
}

impl<F: FnMut() -> bool> PauseAwaiter<F> {
    pub fn new(shared: Arc<Mutex<FiberShared>>, predicate: F) -> Self {
        Self { shared, predicate }
    }
}

impl<F: FnMut() -> bool> Future for PauseAwaiter<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if (this.predicate)() {
            Poll::Ready(())
        } else {
            this.shared.lock().unwrap().wake_hint = WakeHint::NextUpdate;
            Poll::Pending
        }
    }
}

/// `Timer` / `Duration` yield: suspends until `duration` has elapsed on the fiber's clock.
pub struct SleepAwaiter {
    shared: Arc<Mutex<FiberShared>>,
    duration: Duration,
    deadline: Option<crate::common::clock::ClockInstant>,
}

impl SleepAwaiter {
    pub fn new(shared: Arc<Mutex<FiberShared>>, duration: Duration) -> Self {
        Self { shared, duration, deadline: None }
    }
}

impl Future for SleepAwaiter {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let mut shared = this.shared.lock().unwrap();
        let now = shared.now;

        let duration = this.duration;
        let deadline = *this.deadline.get_or_insert_with(|| now.checked_add(duration));

        if now >= deadline {
            Poll::Ready(())
        } else {
            shared.wake_hint = WakeHint::Timer;
            Poll::Pending
        }
    }
}
