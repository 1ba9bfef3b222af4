//! Locating the Tesseract executable and its trained data.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::automation::config::OcrConfig;

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];

/// Per-user install directory: `<data_local_dir>/tft-autopilot/tesseract/`
pub fn get_user_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tft-autopilot")
        .join("tesseract")
}

/// Directories searched for a bundled or installed Tesseract, in order.
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![crate::paths::get_bundled_tesseract_dir(), get_user_tesseract_dir()];
    dirs.extend(COMMON_INSTALL_DIRS.iter().map(PathBuf::from));
    dirs
}

/// Finds the Tesseract executable.
///
/// Order: configured path, bundled next to the exe, per-user data dir,
/// common install locations, then `tesseract` on PATH.
pub fn find_tesseract_executable(config: &OcrConfig) -> Result<PathBuf> {
    if let Some(path) = &config.tesseract_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
        tracing::warn!("Configured tesseract_path {} does not exist", p.display());
    }

    for dir in candidate_dirs() {
        let exe = dir.join(TESSERACT_EXE);
        if exe.exists() {
            return Ok(exe);
        }
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR, add it to PATH, or set ocr.tesseract_path"
    ))
}

fn has_language(dir: &Path, language: &str) -> bool {
    dir.join(format!("{}.traineddata", language)).exists()
}

/// Finds a tessdata directory containing `<language>.traineddata`.
///
/// `None` lets Tesseract fall back to its compiled-in location.
pub fn find_tessdata_dir(config: &OcrConfig) -> Option<PathBuf> {
    if let Some(dir) = &config.tessdata_dir {
        return Some(PathBuf::from(dir));
    }

    let mut candidates: Vec<PathBuf> = candidate_dirs().into_iter().map(|d| d.join("tessdata")).collect();
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates
        .into_iter()
        .find(|dir| has_language(dir, &config.language))
}
