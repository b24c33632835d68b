//! `ControlFlowToken` (`spec.md` §3, §4.D yield vocabulary).

/// The only values a fiber's top-level future may resolve to. Everything else a script
/// awaits (events, timers, conditional waits) is modeled as an ordinary `Future` that
/// resolves to its *payload*, not to a `ControlFlowToken` — the token only appears when
/// the fiber itself finishes or explicitly asks to be rescheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlowToken {
    /// Resume next tick, unconditionally.
    NextUpdate,
    /// Suspend until the scheduler explicitly wakes this thread.
    UntilWake,
    /// Fiber is done; thread terminates.
    Complete,
    /// Destroy the fiber's future and re-invoke the script entry point from scratch
    /// (`SPEC_FULL.md` §9 open question 3).
    Restart,
}
