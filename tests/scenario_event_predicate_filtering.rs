//! End-to-end scenario: a script awaits `OnHit` filtered by `damage > 5`. A low-damage hit
//! must be silently discarded by the predicate (and not observed by any other listener);
//! only the qualifying hit resumes the fiber, exactly once.

mod common;

use std::sync::{Arc, Mutex};

use kinescript::entity_state::bootstrap::thread_template;
use kinescript::entity_state::{
    drain_event_log_system, perform_state_change, tick_dispatch_system, EntityState, EntityStateTable,
};
use kinescript::event_bus::EventBus;
use kinescript::script::control_flow::ControlFlowToken;
use kinescript::script::script::ScriptContext;

#[derive(Debug, Clone, Copy)]
struct OnHit {
    damage: u32,
}

#[test]
fn predicate_filtered_event_wait_discards_non_matching_events_and_resumes_once() {
    let mut app = common::app_headless();
    let world = app.world_mut();

    let captured = Arc::new(Mutex::new(Vec::<u32>::new()));
    let captured_for_script = captured.clone();

    let state = EntityState::new("armed").with_thread(thread_template(1, move |ctx: ScriptContext| {
        let captured = captured_for_script.clone();
        async move {
            let hit = ctx.wait_for::<OnHit, _>(|hit| hit.damage > 5).await;
            captured.lock().unwrap().push(hit.damage);
            ControlFlowToken::Complete
        }
    }));

    world.resource_mut::<EntityStateTable>().register(state);

    let entity = world.spawn_empty().id();
    perform_state_change(world, entity, "armed");

    // The thread's first resume carries it to its `wait_for` await, where it registers
    // interest in `OnHit`; until then its wake hint is the generic "next update" default
    // and event dispatch wouldn't route anything to it.
    tick_dispatch_system(world);

    // A second, unrelated listener observes every `OnHit` the bus dispatches, to confirm the
    // rejected low-damage event isn't silently swallowed by the predicate machinery — it
    // still reaches ordinary bus subscribers, only the fiber's own wait rejects it.
    let seen_by_bus = Arc::new(Mutex::new(Vec::<u32>::new()));
    {
        let seen_by_bus = seen_by_bus.clone();
        world.resource_mut::<EventBus>().subscribe::<OnHit, _>(None, move |hit| seen_by_bus.lock().unwrap().push(hit.damage));
    }

    world.resource_mut::<EventBus>().event(OnHit { damage: 3 });
    drain_event_log_system(world);
    assert!(captured.lock().unwrap().is_empty(), "damage=3 must not satisfy the predicate");

    world.resource_mut::<EventBus>().event(OnHit { damage: 7 });
    drain_event_log_system(world);

    assert_eq!(*captured.lock().unwrap(), vec![7], "fiber resumes exactly once, with the qualifying event");
    assert_eq!(*seen_by_bus.lock().unwrap(), vec![3, 7], "the rejected event still reached ordinary bus subscribers");
}
