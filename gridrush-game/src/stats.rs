//! Player stamina and reputation economy.
//!
//! Stamina is spent per completed cell (never per render frame) and
//! recovers while the courier stands idle. Reputation moves through a fixed
//! delta table on delivery/cancel/loss events, with a consecutive-streak
//! bonus and a one-time mitigation for the first late delivery of a
//! high-reputation session.

use serde::{Deserialize, Serialize};

use crate::constants::{
    EARLY_WINDOW_FRACTION, LATE_MAJOR_MAX_SECONDS, LATE_MINOR_MAX_SECONDS, PAYMENT_MULT_BASE,
    PAYMENT_MULT_BONUS, RECOVER_AMOUNT, RECOVER_INTERVAL_SECONDS, REP_DELTA_CANCEL,
    REP_DELTA_EARLY, REP_DELTA_LATE_MAJOR, REP_DELTA_LATE_MINOR, REP_DELTA_LATE_SEVERE,
    REP_DELTA_LOSE_PACKAGE, REP_DELTA_ON_TIME, REPUTATION_BONUS_THRESHOLD,
    REPUTATION_GAME_OVER_BELOW, REPUTATION_MAX, REPUTATION_MITIGATION_FLOOR, REPUTATION_START,
    SPEED_MULT_EXHAUSTED, SPEED_MULT_NORMAL, SPEED_MULT_TIRED, STAMINA_EXHAUSTED_THRESHOLD,
    STAMINA_MAX, STAMINA_TIRED_THRESHOLD, STREAK_BONUS_COUNT, STREAK_BONUS_DELTA,
    WEIGHT_FREE_ALLOWANCE, WEIGHT_PENALTY_PER_UNIT,
};

/// Named stamina band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaminaBand {
    Normal,
    Tired,
    Exhausted,
}

/// Reputation-relevant event, as classified by the game manager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReputationEvent {
    DeliveryOnTime,
    /// Delivered with at least 20% of the job's total window to spare.
    DeliveryEarly,
    DeliveryLate {
        seconds_late: f64,
    },
    CancelOrder,
    LosePackage,
}

/// Courier stamina/reputation state. Owned by the game manager and mutated
/// only through these operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    stamina: f64,
    reputation: i32,
    #[serde(default)]
    consecutive_on_time: u32,
    /// True until the session's first late delivery has been scored.
    #[serde(default = "default_true")]
    first_late_pending: bool,
    /// Idle seconds accumulated toward the next recovery point.
    #[serde(default)]
    idle_accum: f64,
}

const fn default_true() -> bool {
    true
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            stamina: STAMINA_MAX,
            reputation: REPUTATION_START,
            consecutive_on_time: 0,
            first_late_pending: true,
            idle_accum: 0.0,
        }
    }
}

impl PlayerStats {
    #[must_use]
    pub const fn stamina(&self) -> f64 {
        self.stamina
    }

    #[must_use]
    pub const fn reputation(&self) -> i32 {
        self.reputation
    }

    #[must_use]
    pub const fn consecutive_on_time(&self) -> u32 {
        self.consecutive_on_time
    }

    #[must_use]
    pub const fn first_late_pending(&self) -> bool {
        self.first_late_pending
    }

    /// Clamped setter, used by snapshot restore and tests.
    pub fn set_stamina(&mut self, value: f64) {
        self.stamina = if value.is_finite() {
            value.clamp(0.0, STAMINA_MAX)
        } else {
            0.0
        };
    }

    /// Clamped setter, used by snapshot restore and tests.
    pub fn set_reputation(&mut self, value: i32) {
        self.reputation = value.clamp(0, REPUTATION_MAX);
    }

    pub(crate) fn restore_bookkeeping(&mut self, consecutive: u32, first_late_pending: bool) {
        self.consecutive_on_time = consecutive;
        self.first_late_pending = first_late_pending;
    }

    #[must_use]
    pub fn band(&self) -> StaminaBand {
        if self.stamina < STAMINA_EXHAUSTED_THRESHOLD {
            StaminaBand::Exhausted
        } else if self.stamina <= STAMINA_TIRED_THRESHOLD {
            StaminaBand::Tired
        } else {
            StaminaBand::Normal
        }
    }

    #[must_use]
    pub fn speed_multiplier(&self) -> f64 {
        match self.band() {
            StaminaBand::Normal => SPEED_MULT_NORMAL,
            StaminaBand::Tired => SPEED_MULT_TIRED,
            StaminaBand::Exhausted => SPEED_MULT_EXHAUSTED,
        }
    }

    #[must_use]
    pub fn can_move(&self) -> bool {
        self.stamina > 0.0
    }

    /// Spend stamina for one completed cell. Weight over the free allowance
    /// costs extra; weather adds a flat penalty. Refused outright at zero
    /// stamina.
    pub fn consume(&mut self, base_cost: f64, weight: f64, weather_penalty: f64) -> bool {
        if self.stamina <= 0.0 {
            return false;
        }
        let weight_penalty =
            (WEIGHT_PENALTY_PER_UNIT * (weight - WEIGHT_FREE_ALLOWANCE)).max(0.0);
        let total = base_cost + weight_penalty + weather_penalty;
        self.stamina = (self.stamina - total).max(0.0);
        self.idle_accum = 0.0;
        true
    }

    /// Accumulate idle time toward recovery: +1 stamina per full interval,
    /// capped at the maximum.
    pub fn accumulate_idle(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.idle_accum += dt;
        while self.idle_accum >= RECOVER_INTERVAL_SECONDS {
            self.idle_accum -= RECOVER_INTERVAL_SECONDS;
            self.stamina = (self.stamina + RECOVER_AMOUNT).min(STAMINA_MAX);
        }
    }

    /// Movement or any active input interrupts rest; partial idle credit is
    /// forfeited immediately.
    pub fn interrupt_rest(&mut self) {
        self.idle_accum = 0.0;
    }

    /// Apply a reputation event and return the delta that was applied
    /// (before clamping), so callers can surface it.
    pub fn update_reputation(&mut self, event: ReputationEvent) -> i32 {
        let mut delta = match event {
            ReputationEvent::DeliveryOnTime => {
                self.consecutive_on_time += 1;
                REP_DELTA_ON_TIME
            }
            ReputationEvent::DeliveryEarly => {
                self.consecutive_on_time += 1;
                REP_DELTA_EARLY
            }
            ReputationEvent::DeliveryLate { seconds_late } => {
                self.consecutive_on_time = 0;
                self.mitigated_late_delta(seconds_late)
            }
            ReputationEvent::CancelOrder => {
                self.consecutive_on_time = 0;
                REP_DELTA_CANCEL
            }
            ReputationEvent::LosePackage => {
                self.consecutive_on_time = 0;
                REP_DELTA_LOSE_PACKAGE
            }
        };

        if self.consecutive_on_time >= STREAK_BONUS_COUNT {
            delta += STREAK_BONUS_DELTA;
            self.consecutive_on_time = 0;
        }

        self.reputation = (self.reputation + delta).clamp(0, REPUTATION_MAX);
        delta
    }

    fn mitigated_late_delta(&mut self, seconds_late: f64) -> i32 {
        let tier = if seconds_late <= LATE_MINOR_MAX_SECONDS {
            REP_DELTA_LATE_MINOR
        } else if seconds_late <= LATE_MAJOR_MAX_SECONDS {
            REP_DELTA_LATE_MAJOR
        } else {
            REP_DELTA_LATE_SEVERE
        };
        if self.first_late_pending {
            self.first_late_pending = false;
            if self.reputation >= REPUTATION_MITIGATION_FLOOR {
                // Integer division truncates toward zero: -5 becomes -2.
                return tier / 2;
            }
        }
        tier
    }

    #[must_use]
    pub fn payment_multiplier(&self) -> f64 {
        if self.reputation >= REPUTATION_BONUS_THRESHOLD {
            PAYMENT_MULT_BONUS
        } else {
            PAYMENT_MULT_BASE
        }
    }

    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.reputation < REPUTATION_GAME_OVER_BELOW
    }
}

/// Fraction of a job's delivery window that must remain for the delivery to
/// count as early.
#[must_use]
pub fn is_early_delivery(release_time: f64, deadline: f64, delivered_at: f64) -> bool {
    let window = deadline - release_time;
    if window <= 0.0 {
        return false;
    }
    let spare = deadline - delivered_at;
    spare / window >= EARLY_WINDOW_FRACTION
}
