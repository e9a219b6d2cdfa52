//! Reversible action snapshots.
//!
//! The input layer (not the tick loop) saves a snapshot before each
//! player-visible action step and pops one to undo. Snapshots are deep
//! copies of the serializable subset of game state, so restoring one cannot
//! alias live structures.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::constants::UNDO_DEFAULT_DEPTH;
use crate::grid::Coord;
use crate::job::Job;
use crate::weather::WeatherEngine;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UndoError {
    #[error("no snapshot available to undo")]
    NotAvailable,
}

/// Deep-copied subset of game state covering one reversible action step.
///
/// The weather engine is captured whole, so its history stack and prequeue
/// restore with it, not just the headline condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub position: Coord,
    pub money: f64,
    pub stamina: f64,
    pub reputation: i32,
    pub consecutive_on_time: u32,
    pub first_late_pending: bool,
    pub inventory: Vec<Job>,
    pub sim_time: f64,
    pub weather: WeatherEngine,
}

/// Bounded-depth stack of snapshots. The oldest entry is evicted when the
/// stack would exceed its depth; the newest is always pushable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoStack {
    snapshots: VecDeque<GameSnapshot>,
    #[serde(default = "default_undo_depth")]
    max_depth: usize,
}

const fn default_undo_depth() -> usize {
    UNDO_DEFAULT_DEPTH
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    #[must_use]
    pub fn new() -> Self {
        Self::with_depth(UNDO_DEFAULT_DEPTH)
    }

    #[must_use]
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Push a snapshot, evicting the oldest entry at capacity.
    pub fn save_state(&mut self, snapshot: GameSnapshot) {
        if self.snapshots.len() >= self.max_depth {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Pop the most recent snapshot.
    ///
    /// # Errors
    ///
    /// Returns `UndoError::NotAvailable` when the stack is empty.
    pub fn undo(&mut self) -> Result<GameSnapshot, UndoError> {
        self.snapshots.pop_back().ok_or(UndoError::NotAvailable)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(money: f64) -> GameSnapshot {
        GameSnapshot {
            position: Coord::new(0, 0),
            money,
            stamina: 100.0,
            reputation: 70,
            consecutive_on_time: 0,
            first_late_pending: true,
            inventory: Vec::new(),
            sim_time: 0.0,
            weather: WeatherEngine::default(),
        }
    }

    #[test]
    fn undo_is_lifo() {
        let mut stack = UndoStack::new();
        stack.save_state(snapshot(1.0));
        stack.save_state(snapshot(2.0));
        assert!((stack.undo().unwrap().money - 2.0).abs() < f64::EPSILON);
        assert!((stack.undo().unwrap().money - 1.0).abs() < f64::EPSILON);
        assert_eq!(stack.undo(), Err(UndoError::NotAvailable));
    }

    #[test]
    fn depth_evicts_oldest_only() {
        let mut stack = UndoStack::with_depth(3);
        for i in 0..5 {
            stack.save_state(snapshot(f64::from(i)));
        }
        assert_eq!(stack.len(), 3);
        assert!((stack.undo().unwrap().money - 4.0).abs() < f64::EPSILON);
        assert!((stack.undo().unwrap().money - 3.0).abs() < f64::EPSILON);
        assert!((stack.undo().unwrap().money - 2.0).abs() < f64::EPSILON);
        assert!(stack.is_empty());
    }
}
