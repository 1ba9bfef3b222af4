//! Calibration of the screen rectangle the agent operates against.
//!
//! The user drags and resizes a rectangle over the store, then confirms it.
//! The round-indicator area is derived from the confirmed rectangle.

pub mod region;
pub mod state;

pub use region::{Corner, RegionCalibrator};
pub use state::{CalibrationEvent, CalibrationState};
