//! Screen capture for the calibrated rectangle.
//!
//! This module provides:
//! - The `ScreenCapturer` contract and the `Frame` it produces
//! - The GDI-backed capturer (`screen`)
//! - The interval-paced capture loop (`capture_loop`)
//! - Optional frame archival (`archive`)

pub mod archive;
pub mod capture_loop;
pub mod screen;

pub use capture_loop::run_capture_loop;

use anyhow::Result;
use chrono::{DateTime, Local};
use image::RgbaImage;

use crate::geometry::Rect;

/// One captured screen region.
///
/// Owned by the cycle that captured it and only ever read afterwards.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixels of the captured rectangle
    pub image: RgbaImage,
    /// Screen position of the image's top-left pixel
    pub origin: (i32, i32),
    /// Wall-clock capture time
    pub captured_at: DateTime<Local>,
}

impl Frame {
    pub fn new(image: RgbaImage, origin: (i32, i32)) -> Self {
        Self {
            image,
            origin,
            captured_at: Local::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Screen-capture collaborator.
pub trait ScreenCapturer: Send + Sync {
    /// Captures `rect` in absolute screen coordinates.
    fn capture(&self, rect: Rect) -> Result<Frame>;
}
