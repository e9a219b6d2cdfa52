//! Centralized balance and tuning constants for Gridrush game logic.
//!
//! These values define the deterministic math for the core simulation.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

// Logging keys -------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "GRIDRUSH_DEBUG_LOGS";
pub(crate) const LOG_OFFER_SURFACED: &str = "log.offer.surfaced";
pub(crate) const LOG_OFFER_EXPIRED: &str = "log.offer.expired";
pub(crate) const LOG_JOB_ACCEPTED: &str = "log.job.accepted";
pub(crate) const LOG_JOB_REJECTED: &str = "log.job.rejected";
pub(crate) const LOG_JOB_CANCELLED: &str = "log.job.cancelled";
pub(crate) const LOG_PACKAGE_LOST: &str = "log.package.lost";
pub(crate) const LOG_PICKUP: &str = "log.pickup";
pub(crate) const LOG_PICKUP_OVERWEIGHT: &str = "log.pickup.overweight";
pub(crate) const LOG_DELIVERY_ON_TIME: &str = "log.delivery.on-time";
pub(crate) const LOG_DELIVERY_EARLY: &str = "log.delivery.early";
pub(crate) const LOG_DELIVERY_LATE: &str = "log.delivery.late";
pub(crate) const LOG_MOVE_BLOCKED: &str = "log.move.blocked";
pub(crate) const LOG_GAME_WON: &str = "log.game.won";
pub(crate) const LOG_GAME_LOST_REPUTATION: &str = "log.game.lost.reputation";
pub(crate) const LOG_GAME_LOST_TIME: &str = "log.game.lost.time";
pub(crate) const LOG_UNDO_APPLIED: &str = "log.undo.applied";

// Stamina tuning -----------------------------------------------------------
pub(crate) const STAMINA_MAX: f64 = 100.0;
pub(crate) const STAMINA_TIRED_THRESHOLD: f64 = 30.0;
pub(crate) const STAMINA_EXHAUSTED_THRESHOLD: f64 = 10.0;
pub(crate) const SPEED_MULT_NORMAL: f64 = 1.0;
pub(crate) const SPEED_MULT_TIRED: f64 = 0.8;
pub(crate) const SPEED_MULT_EXHAUSTED: f64 = 0.0;
pub(crate) const MOVE_BASE_COST: f64 = 0.5;
pub(crate) const WEIGHT_FREE_ALLOWANCE: f64 = 3.0;
pub(crate) const WEIGHT_PENALTY_PER_UNIT: f64 = 0.2;
pub(crate) const RECOVER_INTERVAL_SECONDS: f64 = 1.0;
pub(crate) const RECOVER_AMOUNT: f64 = 1.0;

// Reputation tuning --------------------------------------------------------
pub(crate) const REPUTATION_MAX: i32 = 100;
pub(crate) const REPUTATION_START: i32 = 70;
pub(crate) const REPUTATION_GAME_OVER_BELOW: i32 = 20;
pub(crate) const REPUTATION_MITIGATION_FLOOR: i32 = 85;
pub(crate) const REPUTATION_BONUS_THRESHOLD: i32 = 90;
pub(crate) const REP_DELTA_ON_TIME: i32 = 3;
pub(crate) const REP_DELTA_EARLY: i32 = 5;
pub(crate) const REP_DELTA_LATE_MINOR: i32 = -2;
pub(crate) const REP_DELTA_LATE_MAJOR: i32 = -5;
pub(crate) const REP_DELTA_LATE_SEVERE: i32 = -10;
pub(crate) const REP_DELTA_CANCEL: i32 = -4;
pub(crate) const REP_DELTA_LOSE_PACKAGE: i32 = -6;
pub(crate) const LATE_MINOR_MAX_SECONDS: f64 = 30.0;
pub(crate) const LATE_MAJOR_MAX_SECONDS: f64 = 120.0;
pub(crate) const EARLY_WINDOW_FRACTION: f64 = 0.20;
pub(crate) const STREAK_BONUS_COUNT: u32 = 3;
pub(crate) const STREAK_BONUS_DELTA: i32 = 2;
pub(crate) const PAYMENT_MULT_BONUS: f64 = 1.05;
pub(crate) const PAYMENT_MULT_BASE: f64 = 1.0;
pub(crate) const LATE_TIME_BONUS: f64 = 0.5;

// Inventory tuning ---------------------------------------------------------
pub(crate) const INVENTORY_MAX_WEIGHT: f64 = 10.0;

// Offer tuning -------------------------------------------------------------
pub(crate) const OFFER_COOLDOWN_SECONDS: f64 = 5.0;
pub(crate) const PICKUP_REACH_CELLS: i64 = 1;

// Undo tuning --------------------------------------------------------------
pub(crate) const UNDO_DEFAULT_DEPTH: usize = 40;
