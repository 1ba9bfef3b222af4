//! The shared game state store.

use std::sync::{Mutex, MutexGuard};

use super::snapshot::{Entity, GameStateSnapshot, StateUpdate};

/// Single shared snapshot, written by the capture thread and read by the
/// decision loop.
///
/// Every method takes the lock for its whole read-modify-write, so readers
/// never observe a half-applied update.
#[derive(Debug, Default)]
pub struct GameStateStore {
    inner: Mutex<GameStateSnapshot>,
}

impl GameStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GameStateSnapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn update(&self, update: StateUpdate) {
        let mut state = self.lock();
        state.apply(update);
        tracing::info!(
            "Game state updated: round {}, gold {}, health {}, level {}",
            state.round,
            state.gold,
            state.health,
            state.level
        );
    }

    /// Clears everything, including the timestamp.
    pub fn reset(&self) {
        *self.lock() = GameStateSnapshot::default();
    }

    pub fn snapshot(&self) -> GameStateSnapshot {
        self.lock().clone()
    }

    pub fn summary(&self) -> String {
        self.lock().summary()
    }

    /// Exact-name lookup in the latest champion list.
    pub fn find_champion(&self, name: &str) -> Option<Entity> {
        self.lock().champions.iter().find(|c| c.name == name).cloned()
    }

    /// Exact-name lookup in the latest item list.
    pub fn find_item(&self, name: &str) -> Option<Entity> {
        self.lock().items.iter().find(|i| i.name == name).cloned()
    }
}
