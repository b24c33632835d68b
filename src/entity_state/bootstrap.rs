//! Variadic script bootstrap (`spec.md` §9 "Script call-operator overloading / variadic
//! bootstrap"): the original engine resolves, at compile time, the largest prefix of a
//! canonical argument list a script's entry point accepts. Of that list — `(self,
//! registry, entity, context, service, system_manager, world, delta, current_state,
//! prev_state)` — only `entity`, `current_state`, and `prev_state` are meaningful once
//! world access is pushed out of the fiber and behind [`ScriptContext`]'s command queue
//! (`SPEC_FULL.md` §4.D realization note); the rest are already available through the
//! context itself. Rather than runtime arity inspection (unavailable in Rust without
//! macros), overload resolution is done the way Bevy resolves `IntoSystem` impls: a
//! marker-typed trait implemented once per accepted arity.

use std::future::Future;
use std::sync::{Arc, Mutex};

use bevy::prelude::Entity;

use super::state::ThreadTemplate;
use crate::script::control_flow::ControlFlowToken;
use crate::script::fiber::{Fiber, FiberShared};
use crate::script::script::ScriptContext;

/// Normalizes a script entry point of any accepted arity into the canonical
/// `Fn(Entity, Option<&'static str>, Option<&'static str>) -> Fiber` factory form stored on
/// a [`ThreadTemplate`].
pub trait IntoScriptFactory<Marker> {
    fn into_factory(self) -> Arc<dyn Fn(Entity, Option<&'static str>, Option<&'static str>, super::thread::SharedOutbox) -> Fiber + Send + Sync>;
}

pub struct ContextOnly;
pub struct ContextAndCurrentState;
pub struct ContextAndBothStates;

impl<F, Fut> IntoScriptFactory<ContextOnly> for F
where
    F: Fn(ScriptContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ControlFlowToken> + Send + 'static,
{
    fn into_factory(
        self,
    ) -> Arc<dyn Fn(Entity, Option<&'static str>, Option<&'static str>, super::thread::SharedOutbox) -> Fiber + Send + Sync>
    {
        Arc::new(move |entity, _current, _prev, outbox| {
            let shared = Arc::new(Mutex::new(FiberShared::new(entity)));
            let ctx = ScriptContext::new(shared.clone(), outbox);
            Fiber::new(shared, Box::pin((self)(ctx)))
        })
    }
}

impl<F, Fut> IntoScriptFactory<ContextAndCurrentState> for F
where
    F: Fn(ScriptContext, Option<&'static str>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ControlFlowToken> + Send + 'static,
{
    fn into_factory(
        self,
    ) -> Arc<dyn Fn(Entity, Option<&'static str>, Option<&'static str>, super::thread::SharedOutbox) -> Fiber + Send + Sync>
    {
        Arc::new(move |entity, current, _prev, outbox| {
            let shared = Arc::new(Mutex::new(FiberShared::new(entity)));
            let ctx = ScriptContext::new(shared.clone(), outbox);
            Fiber::new(shared, Box::pin((self)(ctx, current)))
        })
    }
}

impl<F, Fut> IntoScriptFactory<ContextAndBothStates> for F
where
    F: Fn(ScriptContext, Option<&'static str>, Option<&'static str>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ControlFlowToken> + Send + 'static,
{
    fn into_factory(
        self,
    ) -> Arc<dyn Fn(Entity, Option<&'static str>, Option<&'static str>, super::thread::SharedOutbox) -> Fiber + Send + Sync>
    {
        Arc::new(move |entity, current, prev, outbox| {
            let shared = Arc::new(Mutex::new(FiberShared::new(entity)));
            let ctx = ScriptContext::new(shared.clone(), outbox);
            Fiber::new(shared, Box::pin((self)(ctx, current, prev)))
        })
    }
}

/// Builds a [`ThreadTemplate`] from any script entry point accepted by
/// [`IntoScriptFactory`].
pub fn thread_template<Marker>(thread_id: u64, entry_point: impl IntoScriptFactory<Marker>) -> ThreadTemplate {
    ThreadTemplate { thread_id, factory: entry_point.into_factory() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn context_only_entry_point_builds_a_template() {
        let outbox: super::super::thread::SharedOutbox = Arc::new(StdMutex::new(Vec::new()));
        let template = thread_template(1, |ctx: ScriptContext| async move {
            let _ = ctx.entity();
            ControlFlowToken::Complete
        });

        let _fiber = (template.factory)(Entity::PLACEHOLDER, None, None, outbox);
        assert_eq!(template.thread_id, 1);
    }
}
