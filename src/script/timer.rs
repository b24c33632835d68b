//! `Timer` (`spec.md` §3 "Timer"): a pausable countdown used both directly by script
//! authors (`ctx.wait_for_timer`) and internally by `Duration` yields.

use std::time::Duration;

use crate::common::clock::ClockInstant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

/// Counts down from `duration`. `Stopped` timers are never finished; `start` arms the
/// timer against the clock reading at the moment it's called, so pausing and resuming
/// preserve remaining time rather than restarting it.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    state: TimerState,
    duration: Duration,
    remaining: Duration,
    last_tick: Option<ClockInstant>,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self { state: TimerState::Stopped, duration, remaining: duration, last_tick: None }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn start(&mut self, now: ClockInstant) {
        self.remaining = self.duration;
        self.state = TimerState::Running;
        self.last_tick = Some(now);
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
        }
    }

    pub fn resume(&mut self, now: ClockInstant) {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
            self.last_tick = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
        self.remaining = self.duration;
        self.last_tick = None;
    }

    /// Advances the timer against the current clock reading. No-op unless `Running`.
    pub fn tick(&mut self, now: ClockInstant) {
        if self.state != TimerState::Running {
            return;
        }

        let last = self.last_tick.unwrap_or(now);
        let elapsed = now.saturating_duration_since(last);
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.last_tick = Some(now);
    }

    pub fn is_finished(&self) -> bool {
        self.state == TimerState::Running && self.remaining.is_zero()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_finishes_once_elapsed_duration_reached() {
        let mut timer = Timer::new(Duration::from_secs(1));
        timer.start(ClockInstant::ZERO);
        assert!(!timer.is_finished());

        timer.tick(ClockInstant::ZERO.checked_add(Duration::from_millis(1500)));
        assert!(timer.is_finished());
    }

    #[test]
    fn paused_timer_does_not_advance() {
        let mut timer = Timer::new(Duration::from_secs(1));
        timer.start(ClockInstant::ZERO);
        timer.tick(ClockInstant::ZERO.checked_add(Duration::from_millis(500)));
        timer.pause();

        timer.tick(ClockInstant::ZERO.checked_add(Duration::from_secs(10)));
        assert!(!timer.is_finished());
        assert_eq!(timer.remaining(), Duration::from_millis(500));
    }

    #[test]
    fn stopped_timer_is_never_finished() {
        let timer = Timer::new(Duration::ZERO);
        assert!(!timer.is_finished());
        assert_eq!(timer.state(), TimerState::Stopped);
    }
}
