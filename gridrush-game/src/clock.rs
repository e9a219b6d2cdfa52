//! Single authoritative simulated clock.
//!
//! Everything time-based in the core (deadlines, release times, the total
//! game duration) compares against this clock; no component keeps its own
//! notion of elapsed time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative simulated time for one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    sim_time: f64,
    #[serde(default = "default_time_scale")]
    time_scale: f64,
    #[serde(default)]
    max_duration: Option<f64>,
    #[serde(default = "default_running")]
    running: bool,
    /// Absolute calendar time of the map's opening instant.
    #[serde(default)]
    map_start: Option<DateTime<Utc>>,
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_running() -> bool {
    true
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            sim_time: 0.0,
            time_scale: 1.0,
            max_duration: None,
            running: true,
            map_start: None,
        }
    }
}

impl GameClock {
    /// Create a clock bounded by `max_duration` simulated seconds.
    #[must_use]
    pub fn bounded(max_duration: f64, map_start: Option<DateTime<Utc>>) -> Self {
        Self {
            max_duration: (max_duration > 0.0).then_some(max_duration),
            map_start,
            ..Self::default()
        }
    }

    /// Advance simulated time by `dt` wall seconds. No-op while stopped or
    /// for non-finite/negative deltas.
    pub fn advance(&mut self, dt: f64) {
        if !self.running || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.sim_time += dt * self.time_scale;
    }

    /// Current simulated time, clamped into `[0, max_duration]`.
    #[must_use]
    pub fn now(&self) -> f64 {
        let t = self.sim_time.max(0.0);
        match self.max_duration {
            Some(max) => t.min(max),
            None => t,
        }
    }

    /// Seconds left before the game duration elapses, or infinity when
    /// unbounded. Never negative.
    #[must_use]
    pub fn time_remaining(&self) -> f64 {
        match self.max_duration {
            Some(max) => (max - self.now()).max(0.0),
            None => f64::INFINITY,
        }
    }

    /// Whether the bounded duration has fully elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.max_duration.is_some() && self.time_remaining() <= 0.0
    }

    /// Absolute calendar timestamp: map start plus elapsed simulated time.
    /// `None` when the map feed carried no start time.
    #[must_use]
    pub fn map_timestamp(&self) -> Option<DateTime<Utc>> {
        let millis = (self.now() * 1000.0).round();
        if !millis.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let offset = Duration::milliseconds(millis as i64);
        self.map_start.map(|start| start + offset)
    }

    /// Jump the clock to an absolute elapsed value. This is the supported
    /// contract for resume/fast-forward; callers never rebind `advance`.
    pub fn set_elapsed(&mut self, seconds: f64) {
        if seconds.is_finite() {
            self.sim_time = seconds.max(0.0);
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn max_duration(&self) -> Option<f64> {
        self.max_duration
    }

    #[must_use]
    pub const fn map_start(&self) -> Option<DateTime<Utc>> {
        self.map_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_noop_while_stopped() {
        let mut clock = GameClock::default();
        clock.stop();
        clock.advance(5.0);
        assert!(clock.now().abs() < f64::EPSILON);
        clock.resume();
        clock.advance(5.0);
        assert!((clock.now() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn now_clamps_to_max_duration() {
        let mut clock = GameClock::bounded(900.0, None);
        clock.advance(1000.0);
        assert!((clock.now() - 900.0).abs() < f64::EPSILON);
        assert!(clock.time_remaining().abs() < f64::EPSILON);
        assert!(clock.is_expired());
    }

    #[test]
    fn unbounded_clock_never_expires() {
        let mut clock = GameClock::default();
        clock.advance(1.0e9);
        assert!(clock.time_remaining().is_infinite());
        assert!(!clock.is_expired());
    }

    #[test]
    fn set_elapsed_rejects_garbage() {
        let mut clock = GameClock::default();
        clock.set_elapsed(120.0);
        assert!((clock.now() - 120.0).abs() < f64::EPSILON);
        clock.set_elapsed(f64::NAN);
        assert!((clock.now() - 120.0).abs() < f64::EPSILON);
        clock.set_elapsed(-5.0);
        assert!(clock.now().abs() < f64::EPSILON);
    }

    #[test]
    fn map_timestamp_offsets_from_start() {
        let start = DateTime::parse_from_rfc3339("2024-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut clock = GameClock::bounded(3600.0, Some(start));
        clock.advance(90.0);
        let stamp = clock.map_timestamp().unwrap();
        assert_eq!((stamp - start).num_seconds(), 90);
    }
}
