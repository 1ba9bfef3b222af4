//! Strategic decisions: prompt rendering, the text generator, and the
//! keyword parser that turns generated text into a [`Decision`].

pub mod engine;
pub mod generator;
pub mod prompt;
pub mod rules;

pub use engine::DecisionEngine;
pub use generator::{OllamaGenerator, TextGenerator};

/// Item-to-champion pairing for an equip action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquipItem {
    pub champion: String,
    pub item: String,
}

/// One cycle's action plan, consumed once by the dispatcher.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decision {
    pub buy_champion: Option<String>,
    pub sell_champion: Option<String>,
    pub upgrade_champion: Option<String>,
    pub equip_item: Option<EquipItem>,
    pub refresh_shop: bool,
    pub upgrade_level: bool,
    /// Advisory lines, logged but never executed
    pub other_suggestions: Vec<String>,
}

impl Decision {
    /// True if there is nothing for the dispatcher to do.
    pub fn is_empty(&self) -> bool {
        self.buy_champion.is_none()
            && self.sell_champion.is_none()
            && self.upgrade_champion.is_none()
            && self.equip_item.is_none()
            && !self.refresh_shop
            && !self.upgrade_level
            && self.other_suggestions.is_empty()
    }

    /// Folds a later partial decision into this one.
    ///
    /// Fields set by `later` overwrite; flags accumulate; suggestions append.
    pub fn merge(mut self, later: Decision) -> Decision {
        if later.buy_champion.is_some() {
            self.buy_champion = later.buy_champion;
        }
        if later.sell_champion.is_some() {
            self.sell_champion = later.sell_champion;
        }
        if later.upgrade_champion.is_some() {
            self.upgrade_champion = later.upgrade_champion;
        }
        if later.equip_item.is_some() {
            self.equip_item = later.equip_item;
        }
        self.refresh_shop |= later.refresh_shop;
        self.upgrade_level |= later.upgrade_level;
        self.other_suggestions.extend(later.other_suggestions);
        self
    }
}
