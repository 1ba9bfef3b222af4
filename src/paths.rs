//! Locations the agent reads from and writes to.
//!
//! Everything lives next to the executable so the tool can run from an
//! unpacked folder without installation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.json";

/// Directory containing the executable, falling back to the working directory.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn exe_relative(name: &str) -> PathBuf {
    get_exe_dir().join(name)
}

/// `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    exe_relative("logs")
}

/// `<exe_dir>/screenshots/`, where archived shop slots go
pub fn get_screenshots_dir() -> PathBuf {
    exe_relative("screenshots")
}

/// `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    exe_relative(CONFIG_FILE_NAME)
}

/// `<exe_dir>/tesseract/`, for a Tesseract shipped alongside the binary
pub fn get_bundled_tesseract_dir() -> PathBuf {
    exe_relative("tesseract")
}

/// Picks the config file: an explicit command-line path wins over the
/// default next to the executable.
pub fn resolve_config_path(arg: Option<OsString>) -> PathBuf {
    arg.filter(|a| !a.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path)
}

/// Creates the output directories. Call once at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    for dir in [get_logs_dir(), get_screenshots_dir()] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_prefers_argument() {
        assert_eq!(
            resolve_config_path(Some(OsString::from("custom.json"))),
            PathBuf::from("custom.json")
        );
        assert_eq!(resolve_config_path(None), get_config_path());
        assert_eq!(resolve_config_path(Some(OsString::new())), get_config_path());
    }

    #[test]
    fn test_dirs_are_exe_relative() {
        assert!(get_logs_dir().starts_with(get_exe_dir()));
        assert!(get_config_path().ends_with(CONFIG_FILE_NAME));
    }
}
