//! Decision Engine: state in, decision out.

use std::sync::Arc;

use crate::automation::config::{GeneratorConfig, StrategyConfig};
use crate::game::GameStateStore;

use super::generator::TextGenerator;
use super::prompt::render_prompt;
use super::rules::{parse_decision, ParseContext};
use super::Decision;

pub struct DecisionEngine {
    generator: Arc<dyn TextGenerator>,
    strategy: StrategyConfig,
    max_tokens: u32,
    temperature: f32,
}

impl DecisionEngine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        strategy: StrategyConfig,
        generator_config: &GeneratorConfig,
    ) -> Self {
        Self {
            generator,
            strategy,
            max_tokens: generator_config.max_tokens,
            temperature: generator_config.temperature,
        }
    }

    /// Asks the generator for advice on the current state and parses it.
    ///
    /// Returns `None` when there is no state yet or the generator is
    /// unavailable or silent.
    pub fn make_decision(&self, store: &GameStateStore) -> Option<Decision> {
        let snapshot = store.snapshot();
        let Some(prompt) = render_prompt(&snapshot, &self.strategy) else {
            tracing::warn!("No game state recorded yet, skipping decision");
            return None;
        };
        tracing::debug!("Deciding on state:\n{}", snapshot.summary());

        let reply = match self.generator.generate(&prompt, self.max_tokens, self.temperature) {
            Ok(Some(reply)) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                tracing::warn!("Generator returned no text");
                return None;
            }
            Err(e) => {
                tracing::error!("Generator failed: {:#}", e);
                return None;
            }
        };
        tracing::info!("Generator reply:\n{}", reply);

        let observed: Vec<String> = snapshot.champions.iter().map(|c| c.name.clone()).collect();
        let ctx = ParseContext {
            priority_champions: &self.strategy.priority_champions,
            priority_items: &self.strategy.priority_items,
            observed_champions: &observed,
        };
        Some(parse_decision(&reply, &ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Entity, StateUpdate};
    use anyhow::{anyhow, Result};
    use std::sync::Mutex;

    enum Reply {
        Text(&'static str),
        Silent,
        Fail,
    }

    struct ScriptedGenerator {
        reply: Reply,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, prompt: &str, max_tokens: u32, _temperature: f32) -> Result<Option<String>> {
            assert_eq!(max_tokens, 512);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Reply::Text(t) => Ok(Some(t.to_string())),
                Reply::Silent => Ok(None),
                Reply::Fail => Err(anyhow!("timed out")),
            }
        }
    }

    fn engine(generator: Arc<ScriptedGenerator>) -> DecisionEngine {
        let strategy = StrategyConfig {
            priority_champions: vec!["亚索".to_string()],
            priority_items: vec!["无尽之刃".to_string()],
        };
        DecisionEngine::new(generator, strategy, &GeneratorConfig::default())
    }

    fn populated_store() -> GameStateStore {
        let store = GameStateStore::new();
        store.update(StateUpdate {
            champions: vec![
                Entity::new("亚索", (0, 0), (10, 10)),
                Entity::new("盖伦", (20, 0), (10, 10)),
            ],
            analysis: Some("回合3".to_string()),
            ..Default::default()
        });
        store
    }

    #[test]
    fn test_no_state_no_decision() {
        let generator = ScriptedGenerator::new(Reply::Text("刷新商店"));
        let engine = engine(generator.clone());
        assert!(engine.make_decision(&GameStateStore::new()).is_none());
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parses_reply_against_observed() {
        let generator = ScriptedGenerator::new(Reply::Text("出售英雄：盖伦\n给亚索装备无尽之刃"));
        let engine = engine(generator.clone());
        let decision = engine.make_decision(&populated_store()).unwrap();
        assert_eq!(decision.sell_champion.as_deref(), Some("盖伦"));
        assert_eq!(decision.equip_item.unwrap().champion, "亚索");
        assert!(generator.prompts.lock().unwrap()[0].contains("回合: 3"));
    }

    #[test]
    fn test_generator_failure_is_no_decision() {
        let store = populated_store();
        assert!(engine(ScriptedGenerator::new(Reply::Silent)).make_decision(&store).is_none());
        assert!(engine(ScriptedGenerator::new(Reply::Fail)).make_decision(&store).is_none());
        assert!(engine(ScriptedGenerator::new(Reply::Text(" \n\t "))).make_decision(&store).is_none());
    }
}
