//! Snapshot records and the stat parser for the free-text analysis.

use chrono::{DateTime, Local};
use regex::Regex;

/// A champion card or item detected in one frame.
///
/// No identity carries over between frames; each cycle's list replaces the
/// previous one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    /// Absolute screen position of the top-left corner
    pub position: (i32, i32),
    /// Width and height in pixels
    pub size: (u32, u32),
}

impl Entity {
    pub fn new(name: impl Into<String>, position: (i32, i32), size: (u32, u32)) -> Self {
        Self {
            name: name.into(),
            position,
            size,
        }
    }

    /// Click point: position plus half the size.
    pub fn center(&self) -> (i32, i32) {
        (
            self.position.0 + (self.size.0 / 2) as i32,
            self.position.1 + (self.size.1 / 2) as i32,
        )
    }
}

/// What one extraction contributes to the store.
#[derive(Clone, Debug, Default)]
pub struct StateUpdate {
    pub champions: Vec<Entity>,
    pub items: Vec<Entity>,
    /// New analysis text; `None` keeps the previous text
    pub analysis: Option<String>,
    /// Observation time; `None` stamps the update with the current time
    pub timestamp: Option<DateTime<Local>>,
}

/// Current belief about the game.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameStateSnapshot {
    pub champions: Vec<Entity>,
    pub items: Vec<Entity>,
    pub analysis: String,
    /// Unset until the first update
    pub timestamp: Option<DateTime<Local>>,
    pub round: u32,
    pub gold: u32,
    pub health: u32,
    pub level: u32,
}

/// Keyword for each numeric stat.
const ROUND_KEYWORD: &str = "回合";
const GOLD_KEYWORD: &str = "金币";
const HEALTH_KEYWORD: &str = "生命值";
const LEVEL_KEYWORD: &str = "等级";

/// Longest analysis prefix included in the summary.
const SUMMARY_ANALYSIS_CHARS: usize = 100;

impl GameStateSnapshot {
    /// Applies an update: lists are replaced, stats re-derived from the
    /// analysis text. A stat whose keyword is absent keeps its value.
    pub fn apply(&mut self, update: StateUpdate) {
        self.champions = update.champions;
        self.items = update.items;
        if let Some(analysis) = update.analysis {
            self.analysis = analysis;
        }
        self.timestamp = Some(update.timestamp.unwrap_or_else(Local::now));

        if let Some(v) = parse_stat(&self.analysis, ROUND_KEYWORD) {
            self.round = v;
        }
        if let Some(v) = parse_stat(&self.analysis, GOLD_KEYWORD) {
            self.gold = v;
        }
        if let Some(v) = parse_stat(&self.analysis, HEALTH_KEYWORD) {
            self.health = v;
        }
        if let Some(v) = parse_stat(&self.analysis, LEVEL_KEYWORD) {
            self.level = v;
        }
    }

    pub fn champion_names(&self) -> Vec<&str> {
        self.champions.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }

    /// Human-readable summary used in logs and in the decision prompt.
    pub fn summary(&self) -> String {
        let analysis: String = self.analysis.chars().take(SUMMARY_ANALYSIS_CHARS).collect();
        format!(
            "回合: {}, 金币: {}, 生命值: {}, 等级: {}\n检测到的英雄: {:?}\n检测到的物品: {:?}\n分析结果: {}...",
            self.round,
            self.gold,
            self.health,
            self.level,
            self.champion_names(),
            self.item_names(),
            analysis
        )
    }
}

/// Finds `keyword` immediately followed by digits and returns the number.
///
/// The first occurrence that is followed by digits wins.
pub fn parse_stat(text: &str, keyword: &str) -> Option<u32> {
    let pattern = format!(r"{}(\d+)", regex::escape(keyword));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
