//! End-to-end scenario: a script suspended on `ctx.until_any_event()` must wake on the very
//! next event the bus dispatches, whatever its type, rather than only on one the script
//! named ahead of time (`spec.md` §4.E "threads whose pending-event-type is T or 'any'
//! (zero)").

mod common;

use std::any::TypeId;
use std::sync::{Arc, Mutex};

use kinescript::entity_state::bootstrap::thread_template;
use kinescript::entity_state::{drain_event_log_system, perform_state_change, tick_dispatch_system, EntityState, EntityStateTable};
use kinescript::event_bus::EventBus;
use kinescript::script::control_flow::ControlFlowToken;
use kinescript::script::script::ScriptContext;

#[derive(Debug, Clone, Copy)]
struct OnUnrelatedTick;

#[derive(Debug, Clone, Copy)]
struct OnAlarm {
    level: u32,
}

#[test]
fn until_any_event_wakes_on_the_first_event_of_any_type() {
    let mut app = common::app_headless();
    let world = app.world_mut();

    let woken_with: Arc<Mutex<Option<TypeId>>> = Arc::new(Mutex::new(None));
    let woken_with_script = woken_with.clone();

    let state = EntityState::new("listening").with_thread(thread_template(1, move |ctx: ScriptContext| {
        let woken_with = woken_with_script.clone();
        async move {
            let (type_id, _event) = ctx.until_any_event().await;
            *woken_with.lock().unwrap() = Some(type_id);
            ControlFlowToken::Complete
        }
    }));

    world.resource_mut::<EntityStateTable>().register(state);

    let entity = world.spawn_empty().id();
    perform_state_change(world, entity, "listening");

    // Drives the thread to its `until_any_event` await, where it registers the wildcard
    // wake hint.
    tick_dispatch_system(world);
    assert!(woken_with.lock().unwrap().is_none(), "not woken until something is actually dispatched");

    world.resource_mut::<EventBus>().event(OnAlarm { level: 9 });
    drain_event_log_system(world);

    assert_eq!(*woken_with.lock().unwrap(), Some(TypeId::of::<OnAlarm>()), "wakes on the first event of any type");

    // A second event after the thread already completed must not panic or re-dispatch to a
    // thread that no longer exists.
    world.resource_mut::<EventBus>().event(OnUnrelatedTick);
    drain_event_log_system(world);
}
