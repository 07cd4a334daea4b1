//! Fixed-tick clock: turn/second conversions and a free-running timer.
//!
//! The simulation steps at a fixed 20 turns per second regardless of
//! how fast the surrounding engine renders. The original game let turn
//! rate fluctuate with FPS; with real delta times available we pin the
//! logical rate and convert at the boundary.

use std::time::Instant;

/// Logical simulation rate, in turns per second.
pub const GAME_TURNS_PER_SECOND: f32 = 20.0;

/// Duration of a single turn, in seconds.
pub const TURN_SECONDS: f32 = 1.0 / GAME_TURNS_PER_SECOND;

/// Convert elapsed wall-clock seconds into (fractional) turns.
pub fn seconds_to_turns(seconds: f32) -> f32 {
    seconds * GAME_TURNS_PER_SECOND
}

/// Convert a turn count back into seconds.
pub fn turns_to_seconds(turns: f32) -> f32 {
    turns / GAME_TURNS_PER_SECOND
}

/// Free-running stopwatch over a monotonic clock.
///
/// Supports both "peek" reads (delta since the last restart, leaving
/// the timer running) and "reset" reads (read and restart atomically).
/// Repeated reset calls within the same instant yield values trending
/// to zero; `Instant` is monotonic so deltas are never negative.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Restart the timer at the current instant without reading it.
    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    /// Microseconds since the last restart. Non-destructive.
    pub fn delta_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Milliseconds since the last restart. Non-destructive.
    pub fn delta_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Seconds since the last restart (microsecond precision). Non-destructive.
    pub fn delta_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Nanoseconds since the last restart, restarting the timer.
    pub fn delta_nanos_reset(&mut self) -> u64 {
        let now = Instant::now();
        let delta = now.duration_since(self.start).as_nanos() as u64;
        self.start = now;
        delta
    }

    /// Microseconds since the last restart, restarting the timer.
    pub fn delta_micros_reset(&mut self) -> u64 {
        let now = Instant::now();
        let delta = now.duration_since(self.start).as_micros() as u64;
        self.start = now;
        delta
    }

    /// Milliseconds since the last restart, restarting the timer.
    pub fn delta_millis_reset(&mut self) -> u64 {
        let now = Instant::now();
        let delta = now.duration_since(self.start).as_millis() as u64;
        self.start = now;
        delta
    }

    /// Seconds since the last restart (nanosecond precision), restarting the timer.
    pub fn delta_seconds_reset(&mut self) -> f64 {
        let now = Instant::now();
        let delta = now.duration_since(self.start).as_secs_f64();
        self.start = now;
        delta
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
