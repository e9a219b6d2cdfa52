//! Gridrush Game Engine
//!
//! Platform-agnostic core logic for the Gridrush courier simulation.
//! This crate provides the full job/economy/weather simulation without UI
//! or platform-specific dependencies.

pub mod clock;
pub(crate) mod constants;
pub mod data;
pub mod game;
pub mod grid;
pub mod inventory;
pub mod job;
pub mod numbers;
pub mod rngs;
pub mod scheduler;
pub mod stats;
pub mod undo;
pub mod weather;

// Re-export commonly used types
pub use clock::GameClock;
pub use data::{BurstDef, MapData, RawJob, WeatherData, WorldData};
pub use game::{
    Delivery, GameManager, GameOutcome, PickupReport, TickInput, TickOutcome, TickTag, TickTagSet,
};
pub use grid::Coord;
pub use inventory::Inventory;
pub use job::{Job, JobPhase};
pub use rngs::{CountingRng, RngBundle};
pub use scheduler::JobScheduler;
pub use stats::{PlayerStats, ReputationEvent, StaminaBand, is_early_delivery};
pub use undo::{GameSnapshot, UndoError, UndoStack};
pub use weather::{
    QueuedWeather, WeatherConfig, WeatherConfigError, WeatherEngine, WeatherKind, WeatherReport,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the combined map/jobs/weather payload from the
    /// platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the world data cannot be loaded.
    fn load_world_data(&self) -> Result<WorldData, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_game(&self, save_name: &str, snapshot: &GameSnapshot) -> Result<(), Self::Error>;

    /// Load a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<GameSnapshot>, Self::Error>;

    /// Delete a saved snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Main game engine for managing game instances
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Create a new session with the specified seed
    ///
    /// # Errors
    ///
    /// Returns an error if the world data cannot be loaded.
    pub fn create_game(&self, seed: u64) -> Result<GameManager, L::Error> {
        let world = self.data_loader.load_world_data()?;
        Ok(GameManager::from_world(&world, seed))
    }

    /// Save a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    pub fn save_game(&self, save_name: &str, manager: &GameManager) -> Result<(), S::Error> {
        self.storage.save_game(save_name, &manager.snapshot())
    }

    /// Load a saved snapshot into a freshly-built session
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot or world data cannot be loaded.
    pub fn load_game(&self, save_name: &str, seed: u64) -> Result<Option<GameManager>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(snapshot) = self.storage.load_game(save_name).map_err(Into::into)? else {
            return Ok(None);
        };
        // Rehydrate the schedule from fresh data, then overlay the snapshot.
        let world = self.data_loader.load_world_data().map_err(Into::into)?;
        let mut manager = GameManager::from_world(&world, seed);
        manager.restore(snapshot);
        Ok(Some(manager))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_world_data(&self) -> Result<WorldData, Self::Error> {
            let map = MapData::from_json(r#"{"max_time": 900, "goal": 500}"#);
            Ok(WorldData {
                map,
                jobs: Vec::new(),
                weather: WeatherData::default(),
            })
        }

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            let parsed = serde_json::from_str("{}")
                .or_else(|_| serde_json::from_str("null"))
                .unwrap();
            Ok(parsed)
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, GameSnapshot>>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn save_game(&self, save_name: &str, snapshot: &GameSnapshot) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(save_name.to_string(), snapshot.clone());
            Ok(())
        }

        fn load_game(&self, save_name: &str) -> Result<Option<GameSnapshot>, Self::Error> {
            Ok(self.saves.borrow().get(save_name).cloned())
        }

        fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_session() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut manager = engine.create_game(0xABCD).unwrap();
        assert!((manager.goal() - 500.0).abs() < f64::EPSILON);

        manager.tick(
            12.5,
            TickInput {
                cells_completed: 4,
                move_to: Some(Coord::new(4, 0)),
                input_active: true,
            },
        );
        engine.save_game("slot1", &manager).unwrap();

        let restored = engine.load_game("slot1", 0xABCD).unwrap().unwrap();
        assert_eq!(restored.position(), Coord::new(4, 0));
        assert!((restored.clock().now() - 12.5).abs() < 1.0e-9);
        assert!((restored.stats().stamina() - manager.stats().stamina()).abs() < 1.0e-9);
    }

    #[test]
    fn load_game_with_missing_slot_is_none() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        assert!(engine.load_game("nope", 1).unwrap().is_none());
    }
}
