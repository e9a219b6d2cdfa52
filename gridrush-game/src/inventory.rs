//! Bounded carry inventory.
//!
//! The weight total is recomputed from the contents after every mutation,
//! never incrementally adjusted, so the `current_weight == Σ weight`
//! invariant holds even against erroneous double-adds upstream.

use serde::{Deserialize, Serialize};

use crate::constants::INVENTORY_MAX_WEIGHT;
use crate::job::Job;

/// Ordered collection of jobs physically on board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    contents: Vec<Job>,
    current_weight: f64,
    max_weight: f64,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(INVENTORY_MAX_WEIGHT)
    }
}

impl Inventory {
    #[must_use]
    pub fn with_capacity(max_weight: f64) -> Self {
        Self {
            contents: Vec::new(),
            current_weight: 0.0,
            max_weight: max_weight.max(0.0),
        }
    }

    #[must_use]
    pub fn contents(&self) -> &[Job] {
        &self.contents
    }

    #[must_use]
    pub const fn current_weight(&self) -> f64 {
        self.current_weight
    }

    #[must_use]
    pub const fn max_weight(&self) -> f64 {
        self.max_weight
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    #[must_use]
    pub fn contains(&self, job_id: &str) -> bool {
        self.contents.iter().any(|job| job.id == job_id)
    }

    /// Whether the job would fit without exceeding capacity.
    #[must_use]
    pub fn can_add(&self, job: &Job) -> bool {
        self.current_weight + job.weight <= self.max_weight
    }

    /// Append the job if it fits. The capacity check runs again here so the
    /// operation is safe without a prior `can_add` call.
    pub fn add(&mut self, job: Job) -> bool {
        if !self.can_add(&job) {
            return false;
        }
        self.contents.push(job);
        self.recompute_weight();
        true
    }

    /// Remove the matching job, returning it when present.
    pub fn remove(&mut self, job_id: &str) -> Option<Job> {
        let index = self.contents.iter().position(|job| job.id == job_id)?;
        let removed = self.contents.remove(index);
        self.recompute_weight();
        Some(removed)
    }

    pub(crate) fn replace_contents(&mut self, contents: Vec<Job>) {
        self.contents = contents;
        self.recompute_weight();
    }

    fn recompute_weight(&mut self) {
        self.current_weight = self.contents.iter().map(|job| job.weight).sum();
    }
}
