//! Game state: detected entities and the shared snapshot store.

pub mod snapshot;
pub mod store;

pub use snapshot::{Entity, GameStateSnapshot, StateUpdate};
pub use store::GameStateStore;
