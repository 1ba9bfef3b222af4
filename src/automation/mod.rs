//! The automation core.
//!
//! This module provides:
//! - Configuration loading
//! - Input injection and the Action Dispatcher
//! - Cooperative cancellation
//! - The Orchestrator lifecycle and control loop

pub mod actions;
pub mod cancel;
pub mod config;
pub mod input;
pub mod runner;
pub mod state;

pub use config::AgentConfig;
pub use input::InputDriver;
pub use runner::{Collaborators, Orchestrator};
pub use state::LifecycleState;
