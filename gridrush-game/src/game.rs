//! Game manager: per-tick orchestration and the pickup/delivery state
//! machine.
//!
//! Tick ordering is fixed: clock first, then offer surfacing, then
//! movement/stamina effects, then weather. Anything reading `now()`
//! mid-tick therefore sees the tick's final time. Win/lose is evaluated
//! once per tick with the reputation loss checked before time-based
//! outcomes.

use smallvec::SmallVec;
use std::collections::HashSet;
use std::rc::Rc;

use crate::clock::GameClock;
use crate::constants::{
    LATE_TIME_BONUS, LOG_DELIVERY_EARLY, LOG_DELIVERY_LATE, LOG_DELIVERY_ON_TIME,
    LOG_GAME_LOST_REPUTATION, LOG_GAME_LOST_TIME, LOG_GAME_WON, LOG_JOB_ACCEPTED,
    LOG_JOB_CANCELLED, LOG_JOB_REJECTED, LOG_MOVE_BLOCKED, LOG_OFFER_EXPIRED, LOG_OFFER_SURFACED,
    LOG_PACKAGE_LOST, LOG_PICKUP, LOG_PICKUP_OVERWEIGHT, LOG_UNDO_APPLIED, MOVE_BASE_COST,
    OFFER_COOLDOWN_SECONDS, PICKUP_REACH_CELLS,
};
use crate::data::WorldData;
use crate::grid::Coord;
use crate::inventory::Inventory;
use crate::rngs::RngBundle;
use crate::scheduler::JobScheduler;
use crate::stats::{PlayerStats, ReputationEvent, is_early_delivery};
use crate::undo::{GameSnapshot, UndoStack};
use crate::weather::{WeatherConfig, WeatherEngine, WeatherReport};

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(crate::constants::DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}

/// Terminal result of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Won,
    LostReputation,
    LostTime,
}

/// Tag describing something that happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickTag {
    OfferSurfaced,
    OfferExpired,
    MoveBlocked,
    GameEnded,
}

/// Maximum tag capacity stored inline without additional allocations.
pub type TickTagSet = SmallVec<[TickTag; 4]>;

/// Per-tick report so the UI layer never has to diff state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub tags: TickTagSet,
    pub cells_paid_for: u32,
    pub outcome: Option<GameOutcome>,
}

/// External movement/input effects for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Grid cells the courier finished traversing during this tick.
    pub cells_completed: u32,
    /// Position after this tick's movement, when it changed.
    pub move_to: Option<Coord>,
    /// Whether the player was actively issuing input (suppresses rest even
    /// without movement).
    pub input_active: bool,
}

/// Result of a pickup attempt at a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickupReport {
    pub picked: Vec<String>,
    /// Jobs in reach that were refused because they would overload the bag.
    pub refused_overweight: Vec<String>,
}

impl PickupReport {
    #[must_use]
    pub fn any_picked(&self) -> bool {
        !self.picked.is_empty()
    }
}

/// One paid delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub job_id: String,
    pub pay: f64,
    pub seconds_late: f64,
    pub reputation_delta: i32,
}

/// Central orchestrator owning every simulation subsystem.
#[derive(Debug)]
pub struct GameManager {
    clock: GameClock,
    scheduler: JobScheduler,
    stats: PlayerStats,
    inventory: Inventory,
    weather: WeatherEngine,
    rngs: Rc<RngBundle>,
    position: Coord,
    money: f64,
    goal: f64,
    paid_jobs: HashSet<String>,
    current_offer: Option<String>,
    offer_cooldown_until: f64,
    outcome: Option<GameOutcome>,
    undo_stack: UndoStack,
    seed: u64,
    pub logs: Vec<String>,
}

impl GameManager {
    /// Empty session with default config, mainly for tests and tools.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            clock: GameClock::default(),
            scheduler: JobScheduler::new(),
            stats: PlayerStats::default(),
            inventory: Inventory::default(),
            weather: WeatherEngine::default(),
            rngs: Rc::new(RngBundle::from_user_seed(seed)),
            position: Coord::default(),
            money: 0.0,
            goal: 0.0,
            paid_jobs: HashSet::new(),
            current_offer: None,
            offer_cooldown_until: 0.0,
            outcome: None,
            undo_stack: UndoStack::new(),
            seed,
            logs: Vec::new(),
        }
    }

    /// Build a session from the three feed payloads.
    #[must_use]
    pub fn from_world(world: &WorldData, seed: u64) -> Self {
        let mut manager = Self::new(seed);
        let map_start = world.map.parsed_start();
        manager.clock = GameClock::bounded(world.map.max_time, map_start);
        manager.goal = world.map.goal.max(0.0);
        for raw in &world.jobs {
            let _ = manager.scheduler.add_raw(raw, map_start);
        }
        manager.weather = WeatherEngine::new(WeatherConfig::from_data(&world.weather));
        manager.weather.load_bursts(&world.weather);
        manager
    }

    // --- read surface for the excluded UI layer -------------------------

    #[must_use]
    pub const fn clock(&self) -> &GameClock {
        &self.clock
    }

    #[must_use]
    pub const fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[must_use]
    pub const fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn weather_report(&self) -> WeatherReport {
        self.weather.report()
    }

    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    #[must_use]
    pub const fn money(&self) -> f64 {
        self.money
    }

    #[must_use]
    pub const fn goal(&self) -> f64 {
        self.goal
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    #[must_use]
    pub fn current_offer(&self) -> Option<&str> {
        self.current_offer.as_deref()
    }

    // --- per-tick update ------------------------------------------------

    /// Advance the whole simulation by `dt` seconds of external time.
    pub fn tick(&mut self, dt: f64, input: TickInput) -> TickOutcome {
        let mut out = TickOutcome::default();
        if self.outcome.is_some() {
            out.outcome = self.outcome;
            return out;
        }

        self.clock.advance(dt);
        let now = self.clock.now();

        self.expire_shown_offer(now, &mut out.tags);
        self.surface_offer(now, &mut out.tags);
        self.apply_movement(dt, input, &mut out);
        {
            let mut rng = self.rngs.weather();
            self.weather.update(dt, &mut *rng);
        }
        self.evaluate_outcome(&mut out.tags);
        out.outcome = self.outcome;
        out
    }

    fn expire_shown_offer(&mut self, now: f64, tags: &mut TickTagSet) {
        let Some(id) = self.current_offer.clone() else {
            return;
        };
        let stale = match self.scheduler.get(&id) {
            Some(job) => job.is_terminal() || job.accepted || job.is_past_deadline(now),
            None => true,
        };
        if !stale {
            return;
        }
        if self
            .scheduler
            .get(&id)
            .is_some_and(|job| job.is_past_deadline(now))
        {
            self.scheduler.reject(&id);
            self.logs.push(String::from(LOG_OFFER_EXPIRED));
            tags.push(TickTag::OfferExpired);
        }
        self.current_offer = None;
        self.offer_cooldown_until = now + OFFER_COOLDOWN_SECONDS;
    }

    fn surface_offer(&mut self, now: f64, tags: &mut TickTagSet) {
        if self.current_offer.is_some() || now < self.offer_cooldown_until {
            return;
        }
        loop {
            let Some((id, expired)) = self
                .scheduler
                .peek_next_offer(now)
                .map(|job| (job.id.clone(), job.is_past_deadline(now)))
            else {
                return;
            };
            if expired {
                // Never present a job after its own deadline.
                self.scheduler.reject(&id);
                self.logs.push(String::from(LOG_OFFER_EXPIRED));
                tags.push(TickTag::OfferExpired);
                continue;
            }
            self.scheduler.set_offered(&id);
            if debug_log_enabled() {
                println!("Offer surfaced | job:{id} at t={now:.1}");
            }
            self.current_offer = Some(id);
            self.logs.push(String::from(LOG_OFFER_SURFACED));
            tags.push(TickTag::OfferSurfaced);
            return;
        }
    }

    fn apply_movement(&mut self, dt: f64, input: TickInput, out: &mut TickOutcome) {
        if input.cells_completed == 0 {
            if input.input_active {
                self.stats.interrupt_rest();
            } else {
                self.stats.accumulate_idle(dt);
            }
            return;
        }
        let penalty = self.weather.stamina_penalty();
        for _ in 0..input.cells_completed {
            if !self
                .stats
                .consume(MOVE_BASE_COST, self.inventory.current_weight(), penalty)
            {
                self.logs.push(String::from(LOG_MOVE_BLOCKED));
                out.tags.push(TickTag::MoveBlocked);
                break;
            }
            out.cells_paid_for += 1;
        }
        if out.cells_paid_for > 0
            && let Some(dest) = input.move_to
        {
            self.position = dest;
        }
    }

    fn evaluate_outcome(&mut self, tags: &mut TickTagSet) {
        if self.outcome.is_some() {
            return;
        }
        // Reputation loss outranks the time-based outcomes.
        let outcome = if self.stats.is_game_over() {
            self.logs.push(String::from(LOG_GAME_LOST_REPUTATION));
            Some(GameOutcome::LostReputation)
        } else if self.money >= self.goal && self.goal > 0.0 && self.clock.time_remaining() > 0.0 {
            self.logs.push(String::from(LOG_GAME_WON));
            Some(GameOutcome::Won)
        } else if self.clock.is_expired() {
            self.logs.push(String::from(LOG_GAME_LOST_TIME));
            Some(GameOutcome::LostTime)
        } else {
            None
        };
        if let Some(outcome) = outcome {
            self.outcome = Some(outcome);
            self.clock.stop();
            tags.push(TickTag::GameEnded);
        }
    }

    // --- synchronous player actions -------------------------------------

    /// Accept a job by id. Idempotent for already-accepted jobs; refused
    /// for terminal ones.
    pub fn accept_job(&mut self, id: &str) -> bool {
        if !self.scheduler.accept(id) {
            return false;
        }
        if self.current_offer.as_deref() == Some(id) {
            self.current_offer = None;
            self.offer_cooldown_until = self.clock.now() + OFFER_COOLDOWN_SECONDS;
        }
        self.logs.push(String::from(LOG_JOB_ACCEPTED));
        true
    }

    /// Decline a job offer.
    pub fn reject_job(&mut self, id: &str) -> bool {
        let was_accepted = self.scheduler.get(id).is_some_and(|job| job.accepted);
        if was_accepted || !self.scheduler.reject(id) {
            return false;
        }
        if self.current_offer.as_deref() == Some(id) {
            self.current_offer = None;
            self.offer_cooldown_until = self.clock.now() + OFFER_COOLDOWN_SECONDS;
        }
        self.logs.push(String::from(LOG_JOB_REJECTED));
        true
    }

    /// Cancel an accepted, not-yet-completed job. Costs reputation; a
    /// picked-up package goes back off the bag.
    pub fn cancel_job(&mut self, id: &str) -> bool {
        let cancellable = self
            .scheduler
            .get(id)
            .is_some_and(|job| job.accepted && !job.completed);
        if !cancellable || !self.scheduler.reject(id) {
            return false;
        }
        self.inventory.remove(id);
        self.stats.update_reputation(ReputationEvent::CancelOrder);
        self.logs.push(String::from(LOG_JOB_CANCELLED));
        true
    }

    /// Record a lost package: the job is gone and reputation takes the
    /// heavier hit.
    pub fn lose_package(&mut self, id: &str) -> bool {
        let carried = self.inventory.remove(id).is_some();
        if !carried {
            return false;
        }
        self.scheduler.reject(id);
        self.stats.update_reputation(ReputationEvent::LosePackage);
        self.logs.push(String::from(LOG_PACKAGE_LOST));
        true
    }

    /// Try to pick up every accepted job whose pickup cell is at `at` or
    /// Manhattan-adjacent. Jobs that would overload the bag are refused
    /// and reported.
    pub fn try_pickup_at(&mut self, at: Coord) -> PickupReport {
        let mut report = PickupReport::default();
        let candidates: Vec<String> = self
            .scheduler
            .active_jobs()
            .iter()
            .filter(|job| !job.picked_up && job.pickup.within_reach(at, PICKUP_REACH_CELLS))
            .map(|job| job.id.clone())
            .collect();
        for id in candidates {
            let Some(job) = self.scheduler.get(&id) else {
                continue;
            };
            if !self.inventory.can_add(job) {
                self.logs.push(String::from(LOG_PICKUP_OVERWEIGHT));
                report.refused_overweight.push(id);
                continue;
            }
            let carried = job.clone();
            let Some(job) = self.scheduler.get_mut(&id) else {
                continue;
            };
            if !job.mark_picked_up() {
                continue;
            }
            // add() re-checks capacity; a refusal here would leave the job
            // un-picked, so roll the flag back.
            if self.inventory.add(carried) {
                self.logs.push(String::from(LOG_PICKUP));
                report.picked.push(id);
            } else {
                job_unpick(self.scheduler.get_mut(&id));
            }
        }
        report
    }

    /// Deliver every carried job whose dropoff is at `at` or
    /// Manhattan-adjacent. Each job is paid at most once.
    pub fn try_deliver_at(&mut self, at: Coord) -> Vec<Delivery> {
        let now = self.clock.now();
        let due: Vec<String> = self
            .inventory
            .contents()
            .iter()
            .filter(|job| job.dropoff.within_reach(at, PICKUP_REACH_CELLS))
            .map(|job| job.id.clone())
            .collect();
        let mut deliveries = Vec::new();
        for id in due {
            let Some(job) = self.scheduler.get_mut(&id) else {
                continue;
            };
            if !job.mark_completed() {
                continue;
            }
            let payout = job.payout;
            let release_time = job.release_time;
            let deadline = job.deadline;
            self.inventory.remove(&id);

            if !self.paid_jobs.insert(id.clone()) {
                continue;
            }
            let seconds_late = deadline.map_or(0.0, |d| (now - d).max(0.0));
            let late = seconds_late > 0.0;
            let time_bonus = if late { LATE_TIME_BONUS } else { 1.0 };
            let pay = payout * self.stats.payment_multiplier() * time_bonus;
            self.money += pay;

            let (event, log_key) = if late {
                (
                    ReputationEvent::DeliveryLate { seconds_late },
                    LOG_DELIVERY_LATE,
                )
            } else if deadline
                .is_some_and(|d| is_early_delivery(release_time, d, now))
            {
                (ReputationEvent::DeliveryEarly, LOG_DELIVERY_EARLY)
            } else {
                (ReputationEvent::DeliveryOnTime, LOG_DELIVERY_ON_TIME)
            };
            let reputation_delta = self.stats.update_reputation(event);
            self.logs.push(String::from(log_key));
            if debug_log_enabled() {
                println!("Delivered | job:{id} pay:{pay:.2} late:{seconds_late:.0}s");
            }
            deliveries.push(Delivery {
                job_id: id,
                pay,
                seconds_late,
                reputation_delta,
            });
        }
        deliveries
    }

    // --- weather pass-throughs ------------------------------------------

    /// Force the weather, bypassing the Markov matrix. Exposed for tests
    /// and for resuming a saved session's frozen weather.
    pub fn force_weather(
        &mut self,
        kind: crate::weather::WeatherKind,
        intensity: Option<f64>,
        save_history: bool,
    ) {
        self.weather.force_state(kind, intensity, save_history);
    }

    /// Revert the most recent weather transition.
    pub fn undo_weather(&mut self) -> bool {
        self.weather.undo()
    }

    // --- snapshots ------------------------------------------------------

    /// Deep-copy the serializable subset of state for undo/persistence.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            position: self.position,
            money: self.money,
            stamina: self.stats.stamina(),
            reputation: self.stats.reputation(),
            consecutive_on_time: self.stats.consecutive_on_time(),
            first_late_pending: self.stats.first_late_pending(),
            inventory: self.inventory.contents().to_vec(),
            sim_time: self.clock.now(),
            weather: self.weather.clone(),
        }
    }

    /// Restore every field a snapshot captures, weather history and
    /// prequeue included.
    pub fn restore(&mut self, snapshot: GameSnapshot) {
        self.position = snapshot.position;
        self.money = snapshot.money;
        self.stats.set_stamina(snapshot.stamina);
        self.stats.set_reputation(snapshot.reputation);
        self.stats
            .restore_bookkeeping(snapshot.consecutive_on_time, snapshot.first_late_pending);
        self.inventory.replace_contents(snapshot.inventory);
        self.clock.set_elapsed(snapshot.sim_time);
        self.weather = snapshot.weather;
    }

    /// Save an undo point. Called by the input layer before a reversible
    /// action step, never from within `tick`.
    pub fn save_undo_state(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.save_state(snapshot);
    }

    /// Pop and apply the most recent undo point.
    pub fn undo_last(&mut self) -> bool {
        match self.undo_stack.undo() {
            Ok(snapshot) => {
                self.restore(snapshot);
                self.logs.push(String::from(LOG_UNDO_APPLIED));
                true
            }
            Err(_) => false,
        }
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}

fn job_unpick(job: Option<&mut crate::job::Job>) {
    if let Some(job) = job {
        job.picked_up = false;
        job.dropoff_visible = false;
    }
}
