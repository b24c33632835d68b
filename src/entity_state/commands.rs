//! Thread spawn commands (`spec.md` §4.E "Spawn operations").

use bevy::prelude::*;
use bitflags::bitflags;

use crate::script::fiber::Fiber;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct SpawnFlags: u8 {
        /// Not bound to any `EntityState`; surviving a state change that would otherwise
        /// terminate it (used for child scripts spawned via `spawn_child_script`,
        /// `spec.md` §8 scenario 6).
        const DETACHED = 1 << 0;
    }
}

/// Look up or template a new fiber for `thread_id`, attach it to `target`, bind it to
/// `state_binding` if provided. If `restart_existing` and a same-id thread already exists
/// on `target`, it is terminated first.
#[derive(Clone, Copy)]
pub struct EntityThreadSpawnCommand {
    pub target: Entity,
    pub thread_id: u64,
    pub restart_existing: bool,
    pub state_binding: Option<&'static str>,
}

/// Adopt an already-constructed fiber — used for embedded/child scripts generated inline
/// rather than looked up from an `EntityState` template.
pub struct EntityThreadFiberSpawnCommand {
    pub target: Entity,
    pub fiber: Fiber,
    pub source_state_binding: Option<&'static str>,
    pub source_thread_name: Option<&'static str>,
    pub new_thread_name: &'static str,
    pub flags: SpawnFlags,
    pub script_handle: u64,
}
