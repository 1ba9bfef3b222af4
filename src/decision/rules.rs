//! Keyword rules that parse generated text into a [`Decision`].
//!
//! Each rule looks at one trimmed line and returns a partial decision.
//! The parser runs every rule on every line and folds the partials in line
//! order, so a later line overrides an earlier one for the same field.

use super::{Decision, EquipItem};

const BUY_MARKERS: &[&str] = &["购买英雄", "购买"];
const SELL_MARKERS: &[&str] = &["出售英雄", "出售"];
const UPGRADE_CHAMPION_MARKERS: &[&str] = &["升级英雄"];
const EQUIP_MARKERS: &[&str] = &["装备物品", "装备"];
const REFRESH_MARKERS: &[&str] = &["刷新商店"];
const UPGRADE_LEVEL_MARKERS: &[&str] = &["升级等级"];
const ADVISORY_MARKERS: &[&str] = &["建议", "应该", "需要"];

/// Names a rule may match against.
#[derive(Clone, Copy, Debug)]
pub struct ParseContext<'a> {
    pub priority_champions: &'a [String],
    pub priority_items: &'a [String],
    /// Champions in the latest snapshot, in detection order
    pub observed_champions: &'a [String],
}

pub type Rule = fn(&str, &ParseContext<'_>) -> Decision;

/// All rules, applied in this order to each line.
pub const RULES: &[Rule] = &[
    buy_rule,
    sell_rule,
    upgrade_champion_rule,
    equip_rule,
    refresh_rule,
    upgrade_level_rule,
    advisory_rule,
];

fn has_marker(line: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| line.contains(m))
}

fn first_in_line(line: &str, names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|name| !name.is_empty() && line.contains(name.as_str()))
        .cloned()
}

pub fn buy_rule(line: &str, ctx: &ParseContext<'_>) -> Decision {
    if !has_marker(line, BUY_MARKERS) {
        return Decision::default();
    }
    Decision {
        buy_champion: first_in_line(line, ctx.priority_champions),
        ..Default::default()
    }
}

pub fn sell_rule(line: &str, ctx: &ParseContext<'_>) -> Decision {
    if !has_marker(line, SELL_MARKERS) {
        return Decision::default();
    }
    Decision {
        sell_champion: first_in_line(line, ctx.observed_champions),
        ..Default::default()
    }
}

pub fn upgrade_champion_rule(line: &str, ctx: &ParseContext<'_>) -> Decision {
    if !has_marker(line, UPGRADE_CHAMPION_MARKERS) {
        return Decision::default();
    }
    Decision {
        upgrade_champion: first_in_line(line, ctx.observed_champions),
        ..Default::default()
    }
}

/// Item first (priority order), then the first observed champion on the
/// same line. No champion means no equip.
pub fn equip_rule(line: &str, ctx: &ParseContext<'_>) -> Decision {
    if !has_marker(line, EQUIP_MARKERS) {
        return Decision::default();
    }
    let equip_item = first_in_line(line, ctx.priority_items).and_then(|item| {
        first_in_line(line, ctx.observed_champions).map(|champion| EquipItem { champion, item })
    });
    Decision {
        equip_item,
        ..Default::default()
    }
}

pub fn refresh_rule(line: &str, _ctx: &ParseContext<'_>) -> Decision {
    Decision {
        refresh_shop: has_marker(line, REFRESH_MARKERS),
        ..Default::default()
    }
}

pub fn upgrade_level_rule(line: &str, _ctx: &ParseContext<'_>) -> Decision {
    Decision {
        upgrade_level: has_marker(line, UPGRADE_LEVEL_MARKERS),
        ..Default::default()
    }
}

pub fn advisory_rule(line: &str, _ctx: &ParseContext<'_>) -> Decision {
    let mut decision = Decision::default();
    if has_marker(line, ADVISORY_MARKERS) {
        decision.other_suggestions.push(line.to_string());
    }
    decision
}

/// Parses the full generator reply. Never fails; unrecognized text yields
/// the default decision.
pub fn parse_decision(text: &str, ctx: &ParseContext<'_>) -> Decision {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(|line| RULES.iter().map(move |rule| rule(line, ctx)))
        .fold(Decision::default(), Decision::merge)
}
