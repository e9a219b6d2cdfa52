//! Delivery job entity and its lifecycle invariants.

use serde::{Deserialize, Serialize};

use crate::grid::Coord;

/// Derived lifecycle phase, computed from the flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Not yet offered or decided.
    Pending,
    /// Currently shown to the player as an offer.
    Offered,
    /// Accepted, awaiting pickup.
    Accepted,
    /// On board, awaiting dropoff.
    PickedUp,
    /// Delivered. Terminal.
    Completed,
    /// Declined, cancelled, or expired. Terminal.
    Rejected,
}

impl JobPhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

/// A delivery task flowing through the scheduler and game manager.
///
/// Flag invariants, maintained by the guarded `mark_*` mutators:
/// at most one of `accepted`/`rejected`; `picked_up` implies `accepted`;
/// `completed` implies `picked_up`. Terminal jobs never re-enter
/// scheduling but are retained for history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub pickup: Coord,
    pub dropoff: Coord,
    #[serde(default)]
    pub payout: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub priority: i32,
    /// Seconds from game start before which the job does not exist for
    /// scheduling purposes.
    #[serde(default)]
    pub release_time: f64,
    /// Seconds from game start; `None` means no deadline.
    #[serde(default)]
    pub deadline: Option<f64>,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default)]
    pub picked_up: bool,
    #[serde(default)]
    pub completed: bool,
    /// Whether the offer is currently shown to the player.
    #[serde(default)]
    pub visible_pickup: bool,
    #[serde(default)]
    pub dropoff_visible: bool,
}

impl Job {
    #[must_use]
    pub fn new(id: impl Into<String>, pickup: Coord, dropoff: Coord) -> Self {
        Self {
            id: id.into(),
            pickup,
            dropoff,
            payout: 0.0,
            weight: 0.0,
            priority: 0,
            release_time: 0.0,
            deadline: None,
            accepted: false,
            rejected: false,
            picked_up: false,
            completed: false,
            visible_pickup: false,
            dropoff_visible: false,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> JobPhase {
        if self.completed {
            JobPhase::Completed
        } else if self.rejected {
            JobPhase::Rejected
        } else if self.picked_up {
            JobPhase::PickedUp
        } else if self.accepted {
            JobPhase::Accepted
        } else if self.visible_pickup {
            JobPhase::Offered
        } else {
            JobPhase::Pending
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.completed || self.rejected
    }

    /// Whether the job may appear in scheduling queries at `now`.
    #[must_use]
    pub fn is_eligible(&self, now: f64) -> bool {
        !self.accepted && !self.rejected && !self.completed && self.release_time <= now
    }

    /// Whether the deadline has passed at `now`. Jobs without a deadline
    /// never expire.
    #[must_use]
    pub fn is_past_deadline(&self, now: f64) -> bool {
        self.deadline.is_some_and(|d| now > d)
    }

    /// Accept the job. Idempotent when already accepted; refused from
    /// terminal states.
    pub fn mark_accepted(&mut self) -> bool {
        if self.rejected || self.completed {
            return false;
        }
        self.accepted = true;
        self.visible_pickup = false;
        true
    }

    /// Reject the job. Valid from any non-terminal state.
    pub fn mark_rejected(&mut self) -> bool {
        if self.completed || self.rejected {
            return false;
        }
        self.rejected = true;
        self.accepted = false;
        self.visible_pickup = false;
        self.dropoff_visible = false;
        true
    }

    /// Move an accepted job on board.
    pub fn mark_picked_up(&mut self) -> bool {
        if !self.accepted || self.picked_up || self.is_terminal() {
            return false;
        }
        self.picked_up = true;
        self.dropoff_visible = true;
        true
    }

    /// Complete a picked-up job.
    pub fn mark_completed(&mut self) -> bool {
        if !self.picked_up || self.is_terminal() {
            return false;
        }
        self.completed = true;
        self.dropoff_visible = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new("j1", Coord::new(1, 1), Coord::new(3, 3))
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut j = job();
        assert_eq!(j.phase(), JobPhase::Pending);
        assert!(j.mark_accepted());
        assert!(j.mark_picked_up());
        assert!(j.mark_completed());
        assert_eq!(j.phase(), JobPhase::Completed);
        assert!(j.phase().is_terminal());
    }

    #[test]
    fn accept_is_idempotent_but_refused_after_reject() {
        let mut j = job();
        assert!(j.mark_accepted());
        assert!(j.mark_accepted());
        let mut k = job();
        assert!(k.mark_rejected());
        assert!(!k.mark_accepted());
        assert!(!k.mark_rejected());
    }

    #[test]
    fn pickup_requires_acceptance_and_completion_requires_pickup() {
        let mut j = job();
        assert!(!j.mark_picked_up());
        assert!(!j.mark_completed());
        j.mark_accepted();
        assert!(!j.mark_completed());
        j.mark_picked_up();
        assert!(j.dropoff_visible);
        assert!(j.mark_completed());
        assert!(!j.dropoff_visible);
    }

    #[test]
    fn eligibility_honors_release_and_terminal_flags() {
        let mut j = job();
        j.release_time = 30.0;
        assert!(!j.is_eligible(10.0));
        assert!(j.is_eligible(30.0));
        j.mark_rejected();
        assert!(!j.is_eligible(60.0));
    }

    #[test]
    fn deadline_checks() {
        let mut j = job();
        assert!(!j.is_past_deadline(1.0e9));
        j.deadline = Some(100.0);
        assert!(!j.is_past_deadline(100.0));
        assert!(j.is_past_deadline(100.1));
    }
}
