//! Action Dispatcher: turns a [`Decision`] into positioned input.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::automation::config::{ActionBinding, ActionConfig};
use crate::automation::input::InputDriver;
use crate::decision::{Decision, EquipItem};
use crate::game::GameStateStore;

/// Why one decision field could not be carried out.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The named entity is not in the latest snapshot.
    #[error("target not observed: {name}")]
    MissingTarget { name: String },
    /// The input driver failed.
    #[error("input failed: {0:#}")]
    Input(#[from] anyhow::Error),
}

/// Holds the left button down; releases it on drop unless released
/// explicitly.
struct Engagement<'a> {
    input: &'a dyn InputDriver,
    released: bool,
}

impl<'a> Engagement<'a> {
    fn press(input: &'a dyn InputDriver) -> anyhow::Result<Self> {
        input.press()?;
        Ok(Self {
            input,
            released: false,
        })
    }

    fn release(mut self) -> anyhow::Result<()> {
        self.released = true;
        self.input.release()
    }
}

impl Drop for Engagement<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.input.release() {
                tracing::error!("Failed to release mouse button: {:#}", e);
            }
        }
    }
}

pub struct ActionDispatcher {
    input: Arc<dyn InputDriver>,
    config: ActionConfig,
}

impl ActionDispatcher {
    pub fn new(input: Arc<dyn InputDriver>, config: ActionConfig) -> Self {
        Self { input, config }
    }

    fn settle(&self) {
        thread::sleep(Duration::from_millis(self.config.action_delay_ms));
    }

    fn move_duration(&self) -> Duration {
        Duration::from_millis(self.config.mouse_move_ms)
    }

    fn click_at(&self, (x, y): (i32, i32)) -> Result<(), ActionError> {
        self.input.move_to(x, y, self.move_duration())?;
        self.input.click()?;
        self.settle();
        tracing::debug!("Clicked ({}, {})", x, y);
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<(), ActionError> {
        self.input.key_press(key)?;
        self.settle();
        tracing::debug!("Pressed key {}", key);
        Ok(())
    }

    /// Move to `from`, press, move to the destination, release.
    ///
    /// The destination is resolved after the press; if that or any later
    /// step fails the button is still released.
    fn drag<F>(&self, from: (i32, i32), destination: F) -> Result<(), ActionError>
    where
        F: FnOnce() -> Result<(i32, i32), ActionError>,
    {
        self.input.move_to(from.0, from.1, self.move_duration())?;
        let engagement = Engagement::press(self.input.as_ref())?;
        self.settle();

        let to = destination()?;
        self.input.move_to(to.0, to.1, self.move_duration())?;
        engagement.release()?;
        self.settle();
        tracing::debug!("Dragged ({}, {}) -> ({}, {})", from.0, from.1, to.0, to.1);
        Ok(())
    }

    fn champion_center(store: &GameStateStore, name: &str) -> Result<(i32, i32), ActionError> {
        store
            .find_champion(name)
            .map(|c| c.center())
            .ok_or_else(|| ActionError::MissingTarget {
                name: name.to_string(),
            })
    }

    fn item_center(store: &GameStateStore, name: &str) -> Result<(i32, i32), ActionError> {
        store
            .find_item(name)
            .map(|i| i.center())
            .ok_or_else(|| ActionError::MissingTarget {
                name: name.to_string(),
            })
    }

    pub fn buy_champion(&self, name: &str, store: &GameStateStore) -> Result<(), ActionError> {
        self.click_at(Self::champion_center(store, name)?)
    }

    pub fn upgrade_champion(&self, name: &str, store: &GameStateStore) -> Result<(), ActionError> {
        self.click_at(Self::champion_center(store, name)?)
    }

    pub fn sell_champion(&self, name: &str, store: &GameStateStore) -> Result<(), ActionError> {
        let from = Self::champion_center(store, name)?;
        let sell_point = self.config.sell_point;
        self.drag(from, || Ok((sell_point.x, sell_point.y)))
    }

    pub fn equip_item(&self, equip: &EquipItem, store: &GameStateStore) -> Result<(), ActionError> {
        let from = Self::item_center(store, &equip.item)?;
        self.drag(from, || Self::champion_center(store, &equip.champion))
    }

    pub fn perform(&self, binding: &ActionBinding) -> Result<(), ActionError> {
        match binding {
            ActionBinding::Click(point) => self.click_at((point.x, point.y)),
            ActionBinding::Key(key) => self.press_key(key),
        }
    }

    /// Executes every field of `decision` independently.
    ///
    /// Returns true only if every attempted field succeeded. An empty
    /// decision counts as a failure.
    pub fn execute(&self, decision: &Decision, store: &GameStateStore) -> bool {
        if decision.is_empty() {
            tracing::warn!("No decision to execute");
            return false;
        }

        let mut success = true;
        let mut record = |what: &str, result: Result<(), ActionError>| match result {
            Ok(()) => tracing::info!("{}: done", what),
            Err(ActionError::MissingTarget { name }) => {
                success = false;
                tracing::warn!("{}: {} not found", what, name);
            }
            Err(e) => {
                success = false;
                tracing::error!("{}: {}", what, e);
            }
        };

        if let Some(name) = &decision.buy_champion {
            record(&format!("Buy {}", name), self.buy_champion(name, store));
        }
        if let Some(name) = &decision.sell_champion {
            record(&format!("Sell {}", name), self.sell_champion(name, store));
        }
        if let Some(name) = &decision.upgrade_champion {
            record(&format!("Upgrade {}", name), self.upgrade_champion(name, store));
        }
        if let Some(equip) = &decision.equip_item {
            record(
                &format!("Equip {} on {}", equip.item, equip.champion),
                self.equip_item(equip, store),
            );
        }
        if decision.refresh_shop {
            record("Refresh shop", self.perform(&self.config.refresh_shop));
        }
        if decision.upgrade_level {
            record("Upgrade level", self.perform(&self.config.upgrade_level));
        }
        for suggestion in &decision.other_suggestions {
            tracing::info!("Suggestion: {}", suggestion);
        }

        success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::ScreenPoint;
    use crate::game::{Entity, StateUpdate};
    use anyhow::{anyhow, Result};
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Move(i32, i32),
        Click,
        Press,
        Release,
        Key(String),
    }

    /// Records every call; fails the `fail_move`-th move (1-based) if set.
    #[derive(Default)]
    struct RecordingInput {
        events: Mutex<Vec<Event>>,
        fail_move: Option<usize>,
    }

    impl RecordingInput {
        fn failing_move(n: usize) -> Arc<Self> {
            Arc::new(Self {
                fail_move: Some(n),
                ..Default::default()
            })
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl InputDriver for RecordingInput {
        fn move_to(&self, x: i32, y: i32, _duration: Duration) -> Result<()> {
            let mut events = self.events.lock().unwrap();
            let moves = events.iter().filter(|e| matches!(e, Event::Move(..))).count();
            if self.fail_move == Some(moves + 1) {
                return Err(anyhow!("cursor stuck"));
            }
            events.push(Event::Move(x, y));
            Ok(())
        }
        fn click(&self) -> Result<()> {
            self.events.lock().unwrap().push(Event::Click);
            Ok(())
        }
        fn double_click(&self) -> Result<()> {
            self.click()?;
            self.click()
        }
        fn press(&self) -> Result<()> {
            self.events.lock().unwrap().push(Event::Press);
            Ok(())
        }
        fn release(&self) -> Result<()> {
            self.events.lock().unwrap().push(Event::Release);
            Ok(())
        }
        fn key_press(&self, key: &str) -> Result<()> {
            self.events.lock().unwrap().push(Event::Key(key.to_string()));
            Ok(())
        }
    }

    fn fast_config() -> ActionConfig {
        ActionConfig {
            action_delay_ms: 0,
            mouse_move_ms: 0,
            ..Default::default()
        }
    }

    fn store() -> GameStateStore {
        let store = GameStateStore::new();
        store.update(StateUpdate {
            champions: vec![
                Entity::new("亚索", (100, 100), (40, 60)),
                Entity::new("盖伦", (200, 100), (40, 60)),
            ],
            items: vec![Entity::new("无尽之刃", (50, 400), (20, 20))],
            ..Default::default()
        });
        store
    }

    fn assert_balanced(events: &[Event]) {
        let presses = events.iter().filter(|e| **e == Event::Press).count();
        let releases = events.iter().filter(|e| **e == Event::Release).count();
        assert_eq!(presses, releases, "unbalanced: {:?}", events);
    }

    #[test]
    fn test_buy_clicks_center() {
        let input = Arc::new(RecordingInput::default());
        let dispatcher = ActionDispatcher::new(input.clone(), fast_config());
        let decision = Decision {
            buy_champion: Some("亚索".to_string()),
            ..Default::default()
        };
        assert!(dispatcher.execute(&decision, &store()));
        assert_eq!(input.events(), vec![Event::Move(120, 130), Event::Click]);
    }

    #[test]
    fn test_sell_drags_to_sell_point() {
        let input = Arc::new(RecordingInput::default());
        let dispatcher = ActionDispatcher::new(input.clone(), fast_config());
        dispatcher.sell_champion("盖伦", &store()).unwrap();
        assert_eq!(
            input.events(),
            vec![
                Event::Move(220, 130),
                Event::Press,
                Event::Move(1850, 550),
                Event::Release
            ]
        );
    }

    #[test]
    fn test_missing_destination_still_releases() {
        let input = Arc::new(RecordingInput::default());
        let dispatcher = ActionDispatcher::new(input.clone(), fast_config());
        let equip = EquipItem {
            champion: "金克丝".to_string(),
            item: "无尽之刃".to_string(),
        };
        let err = dispatcher.equip_item(&equip, &store()).unwrap_err();
        assert!(matches!(err, ActionError::MissingTarget { ref name } if name == "金克丝"));
        assert_eq!(
            input.events(),
            vec![Event::Move(60, 410), Event::Press, Event::Release]
        );
    }

    #[test]
    fn test_failed_move_after_press_still_releases() {
        // Second move is the move to the destination.
        let input = RecordingInput::failing_move(2);
        let dispatcher = ActionDispatcher::new(input.clone(), fast_config());
        let err = dispatcher.sell_champion("亚索", &store()).unwrap_err();
        assert!(matches!(err, ActionError::Input(_)));
        let events = input.events();
        assert_eq!(events.last(), Some(&Event::Release));
        assert_balanced(&events);
    }

    #[test]
    fn test_missing_source_sends_nothing() {
        let input = Arc::new(RecordingInput::default());
        let dispatcher = ActionDispatcher::new(input.clone(), fast_config());
        let equip = EquipItem {
            champion: "亚索".to_string(),
            item: "饮血剑".to_string(),
        };
        assert!(dispatcher.equip_item(&equip, &store()).is_err());
        assert!(input.events().is_empty());
    }

    #[test]
    fn test_failed_field_does_not_stop_siblings() {
        let input = Arc::new(RecordingInput::default());
        let config = ActionConfig {
            refresh_shop: ActionBinding::Key("d".to_string()),
            upgrade_level: ActionBinding::Click(ScreenPoint { x: 5, y: 6 }),
            ..fast_config()
        };
        let dispatcher = ActionDispatcher::new(input.clone(), config);
        let decision = Decision {
            buy_champion: Some("金克丝".to_string()),
            sell_champion: Some("盖伦".to_string()),
            refresh_shop: true,
            upgrade_level: true,
            other_suggestions: vec!["建议存钱".to_string()],
            ..Default::default()
        };

        assert!(!dispatcher.execute(&decision, &store()));
        let events = input.events();
        assert_eq!(
            events,
            vec![
                Event::Move(220, 130),
                Event::Press,
                Event::Move(1850, 550),
                Event::Release,
                Event::Key("d".to_string()),
                Event::Move(5, 6),
                Event::Click,
            ]
        );
        assert_balanced(&events);
    }

    #[test]
    fn test_empty_decision_is_failure() {
        let input = Arc::new(RecordingInput::default());
        let dispatcher = ActionDispatcher::new(input.clone(), fast_config());
        assert!(!dispatcher.execute(&Decision::default(), &store()));
        assert!(input.events().is_empty());
    }

    #[test]
    fn test_settle_delay_after_each_action() {
        let input = Arc::new(RecordingInput::default());
        let config = ActionConfig {
            action_delay_ms: 30,
            mouse_move_ms: 0,
            ..Default::default()
        };
        let dispatcher = ActionDispatcher::new(input, config);
        let decision = Decision {
            buy_champion: Some("亚索".to_string()),
            upgrade_champion: Some("盖伦".to_string()),
            ..Default::default()
        };
        let started = Instant::now();
        assert!(dispatcher.execute(&decision, &store()));
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
