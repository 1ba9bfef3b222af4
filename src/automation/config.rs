//! Configuration types for the agent.
//!
//! Loads settings from config.json at startup. Every section falls back to
//! defaults field by field, so a partial config file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::geometry::Rect;

/// A rectangle in relative coordinates (0.0 to 1.0).
/// Used for sub-regions of a captured frame that scale with the frame size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl RelativeRect {
    /// The whole frame.
    pub const FULL: RelativeRect = RelativeRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
}

impl Default for RelativeRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// An absolute screen position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

/// How a fixed game control is operated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionBinding {
    /// Click an absolute screen position.
    Click(ScreenPoint),
    /// Press and release a keyboard key.
    Key(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture cadence in milliseconds
    pub interval_ms: u64,
    /// Save every frame's shop slots under the screenshots directory
    pub archive_frames: bool,
    /// Number of equal-width slots a frame is split into when archiving
    pub archive_slots: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            archive_frames: false,
            archive_slots: 5,
        }
    }
}

/// Placement of the round-indicator area relative to the store rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundAreaOffset {
    /// Distance above the store's top edge, in store heights
    pub offset_ratio: f32,
    /// Height of the round area, in store heights
    pub height_ratio: f32,
}

impl Default for RoundAreaOffset {
    fn default() -> Self {
        Self {
            offset_ratio: 6.0,
            height_ratio: 0.3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Rectangle shown when the overlay opens
    pub initial_rect: Rect,
    /// Hit radius of the corner handles in pixels
    pub handle_radius: i32,
    /// Minimum interval between applied motion updates during a gesture
    pub motion_throttle_ms: u64,
    /// Minimum width and height of a reported rectangle
    pub min_size: u32,
    pub round_area: RoundAreaOffset,
    /// Poll interval while waiting for the user to confirm
    pub confirm_poll_ms: u64,
    /// Give up waiting for confirmation after this long (None = wait forever)
    pub confirm_timeout_secs: Option<u64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            initial_rect: Rect::from_corners(200, 150, 400, 350),
            handle_radius: 8,
            motion_throttle_ms: 16,
            min_size: 1,
            round_area: RoundAreaOffset::default(),
            confirm_poll_ms: 500,
            confirm_timeout_secs: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Part of the store frame searched for champion cards
    pub champion_region: RelativeRect,
    /// Part of the store frame searched for items (None = no item detection)
    pub item_region: Option<RelativeRect>,
    /// Minimum foreground pixel count of a champion candidate
    pub min_champion_area: u32,
    /// Minimum foreground pixel count of an item candidate
    pub min_item_area: u32,
    /// Gaussian blur sigma applied before thresholding
    pub blur_sigma: f32,
    /// Recognize the round-indicator area and use it as the analysis text
    pub read_round_area: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            champion_region: RelativeRect::FULL,
            item_region: None,
            min_champion_area: 1000,
            min_item_area: 500,
            blur_sigma: 1.1,
            read_round_area: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Explicit path to the tesseract executable
    pub tesseract_path: Option<String>,
    /// Explicit tessdata directory
    pub tessdata_dir: Option<String>,
    /// Tesseract language code
    pub language: String,
    /// Tesseract page segmentation mode
    pub psm: u32,
    /// Words below this confidence (0-100) are dropped
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            language: "chi_sim".to_string(),
            psm: 6,
            min_confidence: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Full endpoint URL of an Ollama-style `POST /api/generate`
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Request budget; a timed-out request counts as no decision
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434/api/generate".to_string(),
            model: "qwen2.5:7b".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Champions to buy, in order of preference
    pub priority_champions: Vec<String>,
    /// Items to equip, in order of preference
    pub priority_items: Vec<String>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            priority_champions: ["金克丝", "蔚", "凯特琳", "维克兹", "卡西奥佩娅"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            priority_items: ["无尽之刃", "饮血剑", "狂徒铠甲", "鬼索的狂暴之刃", "朔极之矛"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Settle delay after every primitive action
    pub action_delay_ms: u64,
    /// Duration of each cursor movement
    pub mouse_move_ms: u64,
    /// Hold time between key press and release
    pub key_delay_ms: u64,
    /// Drop point for selling a champion
    pub sell_point: ScreenPoint,
    pub refresh_shop: ActionBinding,
    pub upgrade_level: ActionBinding,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            action_delay_ms: 200,
            mouse_move_ms: 200,
            key_delay_ms: 100,
            sell_point: ScreenPoint { x: 1850, y: 550 },
            refresh_shop: ActionBinding::Click(ScreenPoint { x: 1625, y: 625 }),
            upgrade_level: ActionBinding::Click(ScreenPoint { x: 1825, y: 325 }),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Pause between decide/act cycles
    pub decision_interval_ms: u64,
    /// How long stop() waits for the capture thread
    pub join_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            decision_interval_ms: 500,
            join_timeout_ms: 5000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete agent configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub capture: CaptureConfig,
    pub calibration: CalibrationConfig,
    pub detection: DetectionConfig,
    pub ocr: OcrConfig,
    pub generator: GeneratorConfig,
    pub strategy: StrategyConfig,
    pub actions: ActionConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Loads configuration from `path`, or returns defaults.
    ///
    /// A missing or malformed file is not an error: the problem is logged
    /// and the defaults are used.
    pub fn load(path: &Path) -> AgentConfig {
        tracing::info!("Looking for config at: {}", path.display());

        if !path.exists() {
            tracing::info!("config.json not found. Using default config.");
            return AgentConfig::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    AgentConfig::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                AgentConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "capture": { "interval_ms": 250 },
                "actions": { "refresh_shop": { "key": "d" } },
                "strategy": { "priority_items": ["无尽之刃"] }
            }"#,
        )
        .unwrap();

        let config = AgentConfig::load(&path);
        assert_eq!(config.capture.interval_ms, 250);
        assert_eq!(config.capture.archive_slots, 5);
        assert_eq!(config.actions.refresh_shop, ActionBinding::Key("d".to_string()));
        assert_eq!(
            config.actions.upgrade_level,
            ActionBinding::Click(ScreenPoint { x: 1825, y: 325 })
        );
        assert_eq!(config.strategy.priority_items, vec!["无尽之刃".to_string()]);
        assert_eq!(config.strategy.priority_champions.len(), 5);
    }

    #[test]
    fn test_missing_or_malformed_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let missing = AgentConfig::load(&dir.path().join("nope.json"));
        assert_eq!(missing.runtime.decision_interval_ms, 500);

        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let malformed = AgentConfig::load(&path);
        assert_eq!(malformed.generator.max_tokens, 512);
    }
}
