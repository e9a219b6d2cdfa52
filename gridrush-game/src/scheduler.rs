//! Job scheduler: creation, validation, and the eligibility index.
//!
//! Jobs are retained forever for history; terminal jobs simply drop out of
//! active queries. The eligibility index is an ordered set keyed by
//! (priority descending, release time ascending, insertion sequence), so
//! equal-priority ties resolve deterministically and peeking never has to
//! pop anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::data::RawJob;
use crate::job::Job;

/// Ordering key for the eligibility index.
///
/// Higher priority sorts first; within a priority, earlier release time,
/// then earlier insertion. `seq` is unique per job, which makes the order
/// total without consulting the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderKey {
    priority: i32,
    release_time: f64,
    seq: u64,
    id: String,
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.release_time.total_cmp(&other.release_time))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Priority scheduler over the full job history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobScheduler {
    jobs: HashMap<String, Job>,
    order: BTreeSet<OrderKey>,
    seqs: HashMap<String, u64>,
    next_seq: u64,
}

impl JobScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs ever seen, terminal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Normalize and insert one raw feed record. Returns the stored job, or
    /// `None` when the record carried no usable id.
    pub fn add_raw(&mut self, raw: &RawJob, map_start: Option<DateTime<Utc>>) -> Option<&Job> {
        let job = raw.normalize(map_start)?;
        Some(self.upsert(job))
    }

    /// Insert a job, or update the mutable fields of an existing id in
    /// place. Re-arrival of the same id is an update, not a duplicate;
    /// lifecycle flags of the stored job are preserved.
    pub fn upsert(&mut self, incoming: Job) -> &Job {
        let id = incoming.id.clone();
        if let Some(existing) = self.jobs.get_mut(&id) {
            let reindex = existing.priority != incoming.priority
                || existing.release_time.total_cmp(&incoming.release_time) != Ordering::Equal;
            existing.pickup = incoming.pickup;
            existing.dropoff = incoming.dropoff;
            existing.payout = incoming.payout;
            existing.weight = incoming.weight;
            existing.priority = incoming.priority;
            existing.release_time = incoming.release_time;
            existing.deadline = incoming.deadline;
            if reindex && !existing.is_terminal() && !existing.accepted {
                let key = Self::key_for(existing, self.seqs[&id]);
                self.reindex(&id, key);
            }
        } else {
            let seq = self.next_seq;
            self.next_seq += 1;
            if !incoming.is_terminal() && !incoming.accepted {
                self.order.insert(Self::key_for(&incoming, seq));
            }
            self.seqs.insert(id.clone(), seq);
            self.jobs.insert(id.clone(), incoming);
        }
        &self.jobs[&id]
    }

    fn key_for(job: &Job, seq: u64) -> OrderKey {
        OrderKey {
            priority: job.priority,
            release_time: job.release_time,
            seq,
            id: job.id.clone(),
        }
    }

    fn reindex(&mut self, id: &str, fresh: OrderKey) {
        self.order.retain(|key| key.id != id);
        self.order.insert(fresh);
    }

    fn unindex(&mut self, id: &str) {
        self.order.retain(|key| key.id != id);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    /// Snapshot of every job regardless of state. Cloned, so callers cannot
    /// corrupt internal bookkeeping.
    #[must_use]
    pub fn all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    /// Jobs eligible for offering at `now`, in scheduler priority order.
    #[must_use]
    pub fn eligible_jobs(&self, now: f64) -> Vec<&Job> {
        self.order
            .iter()
            .filter_map(|key| self.jobs.get(&key.id))
            .filter(|job| job.is_eligible(now))
            .collect()
    }

    /// The highest-priority eligible job not currently shown as an offer.
    ///
    /// Non-destructive and idempotent: plain iteration over the ordered
    /// index, nothing is popped or reinserted.
    #[must_use]
    pub fn peek_next_offer(&self, now: f64) -> Option<&Job> {
        self.order
            .iter()
            .filter_map(|key| self.jobs.get(&key.id))
            .find(|job| job.is_eligible(now) && !job.visible_pickup)
    }

    /// Mark a job as the currently shown offer.
    pub fn set_offered(&mut self, id: &str) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.is_terminal() && !job.accepted => {
                job.visible_pickup = true;
                true
            }
            _ => false,
        }
    }

    /// Accept a job. Idempotent when already accepted; refuses terminal
    /// jobs and unknown ids.
    pub fn accept(&mut self, id: &str) -> bool {
        let Some(job) = self.jobs.get_mut(id) else {
            return false;
        };
        if job.accepted {
            return true;
        }
        if !job.mark_accepted() {
            return false;
        }
        self.unindex(id);
        true
    }

    /// Reject a job. Valid from any non-terminal state.
    pub fn reject(&mut self, id: &str) -> bool {
        let Some(job) = self.jobs.get_mut(id) else {
            return false;
        };
        if !job.mark_rejected() {
            return false;
        }
        self.unindex(id);
        true
    }

    /// Accepted jobs that have not completed yet.
    #[must_use]
    pub fn active_jobs(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .values()
            .filter(|job| job.accepted && !job.completed)
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Coord;

    fn job(id: &str, priority: i32, release: f64) -> Job {
        let mut j = Job::new(id, Coord::new(0, 0), Coord::new(1, 1));
        j.priority = priority;
        j.release_time = release;
        j
    }

    #[test]
    fn ordering_is_priority_then_release_then_insertion() {
        let mut sched = JobScheduler::new();
        sched.upsert(job("low", 1, 0.0));
        sched.upsert(job("urgent-late", 5, 10.0));
        sched.upsert(job("urgent-early", 5, 2.0));
        sched.upsert(job("tie-b", 3, 4.0));
        sched.upsert(job("tie-a", 3, 4.0));

        let ids: Vec<&str> = sched
            .eligible_jobs(100.0)
            .iter()
            .map(|j| j.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["urgent-early", "urgent-late", "tie-b", "tie-a", "low"],
            "equal (priority, release) ties break by insertion order"
        );
    }

    #[test]
    fn eligible_jobs_respects_release_time() {
        let mut sched = JobScheduler::new();
        sched.upsert(job("now", 1, 0.0));
        sched.upsert(job("later", 9, 50.0));
        let ids: Vec<&str> = sched
            .eligible_jobs(10.0)
            .iter()
            .map(|j| j.id.as_str())
            .collect();
        assert_eq!(ids, vec!["now"]);
        let ids: Vec<&str> = sched
            .eligible_jobs(50.0)
            .iter()
            .map(|j| j.id.as_str())
            .collect();
        assert_eq!(ids, vec!["later", "now"]);
    }

    #[test]
    fn upsert_same_id_updates_in_place() {
        let mut sched = JobScheduler::new();
        sched.upsert(job("X", 1, 0.0));
        let mut update = job("X", 7, 3.0);
        update.payout = 250.0;
        sched.upsert(update);

        assert_eq!(sched.len(), 1);
        let stored = sched.get("X").unwrap();
        assert_eq!(stored.priority, 7);
        assert!((stored.payout - 250.0).abs() < f64::EPSILON);
        // Reindexed under the new priority.
        assert_eq!(sched.peek_next_offer(10.0).unwrap().id, "X");
    }

    #[test]
    fn upsert_does_not_clobber_lifecycle_flags() {
        let mut sched = JobScheduler::new();
        sched.upsert(job("X", 1, 0.0));
        assert!(sched.accept("X"));
        sched.upsert(job("X", 9, 0.0));
        assert!(sched.get("X").unwrap().accepted);
        assert!(sched.eligible_jobs(10.0).is_empty());
    }

    #[test]
    fn peek_is_idempotent_and_skips_visible_offers() {
        let mut sched = JobScheduler::new();
        sched.upsert(job("a", 5, 0.0));
        sched.upsert(job("b", 3, 0.0));

        let first = sched.peek_next_offer(0.0).map(|j| j.id.clone());
        let second = sched.peek_next_offer(0.0).map(|j| j.id.clone());
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("a"));
        let before: Vec<String> = sched
            .eligible_jobs(0.0)
            .iter()
            .map(|j| j.id.clone())
            .collect();
        let after: Vec<String> = sched
            .eligible_jobs(0.0)
            .iter()
            .map(|j| j.id.clone())
            .collect();
        assert_eq!(before, after);

        assert!(sched.set_offered("a"));
        assert_eq!(sched.peek_next_offer(0.0).unwrap().id, "b");
    }

    #[test]
    fn accept_and_reject_transitions() {
        let mut sched = JobScheduler::new();
        sched.upsert(job("a", 1, 0.0));
        assert!(sched.accept("a"));
        assert!(sched.accept("a"), "accept is idempotent");
        assert!(!sched.accept("missing"));

        sched.upsert(job("b", 1, 0.0));
        assert!(sched.reject("b"));
        assert!(!sched.accept("b"), "rejected jobs cannot be accepted");
        assert!(!sched.reject("b"), "reject of terminal job is refused");

        let active: Vec<&str> = sched.active_jobs().iter().map(|j| j.id.as_str()).collect();
        assert_eq!(active, vec!["a"]);
    }

    #[test]
    fn all_returns_detached_snapshot() {
        let mut sched = JobScheduler::new();
        sched.upsert(job("a", 1, 0.0));
        let mut snapshot = sched.all();
        snapshot[0].rejected = true;
        assert!(!sched.get("a").unwrap().rejected);
    }
}
