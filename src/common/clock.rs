//! Monotonic clock abstraction for timers and fiber durations.
//!
//! The bridge and scheduler read `Time<Fixed>` for their per-tick delta; timers and
//! `Duration`-yields read wall time through this resource so tests can drive both
//! independently of Bevy's own fixed/virtual time resources.

use std::time::Duration;

use bevy::prelude::*;

/// Monotonic point in time, counted from the moment the clock resource was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockInstant(Duration);

impl ClockInstant {
    pub const ZERO: Self = Self(Duration::ZERO);

    pub fn checked_add(self, d: Duration) -> Self {
        Self(self.0 + d)
    }

    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Engine-wide monotonic clock, advanced once per `Update` from `Time<Real>`.
///
/// Exists so timers don't depend on Bevy's `Time<Virtual>` speed (hitstop/slowmo would
/// otherwise desync in-fiber timeouts from wall-clock expectations).
#[derive(Resource, Debug, Clone, Copy)]
pub struct Clock {
    now: ClockInstant,
}

impl Default for Clock {
    fn default() -> Self {
        Self { now: ClockInstant::ZERO }
    }
}

impl Clock {
    pub fn now(&self) -> ClockInstant {
        self.now
    }

    pub fn advance(&mut self, delta: Duration) {
        self.now = self.now.checked_add(delta);
    }
}

pub fn advance_clock(time: Res<Time<Real>>, mut clock: ResMut<Clock>) {
    clock.advance(time.delta());
}

pub fn plugin(app: &mut App) {
    app.init_resource::<Clock>();
    app.add_systems(First, advance_clock);
}
