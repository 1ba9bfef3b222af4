//! Saves captured frames as per-slot PNGs for later inspection.

use anyhow::{Context, Result};
use image::imageops;
use std::path::{Path, PathBuf};

use super::Frame;

/// Splits `frame` horizontally into `slots` equal shop slots and saves each
/// one under `dir` as `screenshot_<unix-ts>_<i>.png`.
///
/// The last slot absorbs the remainder when the width does not divide
/// evenly. Returns the written paths.
pub fn archive_frame(frame: &Frame, slots: u32, dir: &Path) -> Result<Vec<PathBuf>> {
    let slots = slots.clamp(1, frame.width().max(1));
    let slot_width = frame.width() / slots;
    let timestamp = frame.captured_at.timestamp();

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut paths = Vec::with_capacity(slots as usize);
    for i in 0..slots {
        let x = i * slot_width;
        let width = if i + 1 == slots {
            frame.width() - x
        } else {
            slot_width
        };
        let slot = imageops::crop_imm(&frame.image, x, 0, width, frame.height()).to_image();
        let path = dir.join(format!("screenshot_{}_{}.png", timestamp, i));
        slot.save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        paths.push(path);
    }

    tracing::debug!("Archived frame into {} slots", paths.len());
    Ok(paths)
}
