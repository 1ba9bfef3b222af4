//! Text recognition and the State Extractor built on it.

pub mod detect;
pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::TesseractRecognizer;
pub use extract::StateExtractor;

use anyhow::Result;
use image::RgbaImage;

/// Text-recognition collaborator.
pub trait TextRecognizer: Send + Sync {
    /// Returns the recognized text, or an empty string when nothing is
    /// confidently readable.
    fn recognize(&self, img: &RgbaImage) -> Result<String>;
}
