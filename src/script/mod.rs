//! Script Fiber Runtime (`spec.md` §4.D): the yield vocabulary, its awaiter realizations,
//! and the `Script`/`ScriptContext` authoring surface built on top of them.

pub mod awaiter;
pub mod control_flow;
pub mod fiber;
pub mod script;
pub mod timer;

pub use control_flow::ControlFlowToken;
pub use fiber::{Fiber, FiberShared, WakeHint};
pub use script::{ScriptCommand, ScriptContext};
pub use timer::{Timer, TimerState};
