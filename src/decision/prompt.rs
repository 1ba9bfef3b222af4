//! Renders the game state into the generator prompt.

use crate::automation::config::StrategyConfig;
use crate::game::GameStateSnapshot;

/// Builds the decision prompt for `snapshot`.
///
/// Returns `None` if the snapshot has never been updated.
pub fn render_prompt(snapshot: &GameStateSnapshot, strategy: &StrategyConfig) -> Option<String> {
    snapshot.timestamp?;

    let mut prompt = String::new();
    prompt.push_str("你是一个云顶之弈游戏专家，请根据以下游戏状态信息，提供最佳决策建议:\n");
    prompt.push_str(&snapshot.summary());
    prompt.push_str("\n\n请考虑以下优先事项:\n");
    prompt.push_str(&format!("1. 优先选择英雄: {:?}\n", strategy.priority_champions));
    prompt.push_str(&format!("2. 优先选择物品: {:?}\n\n", strategy.priority_items));
    prompt.push_str("请提供具体的决策建议，包括但不限于:\n");
    for question in [
        "是否购买英雄，如果是，购买哪个英雄",
        "是否出售英雄，如果是，出售哪个英雄",
        "是否升级英雄，如果是，升级哪个英雄",
        "是否装备物品，如果是，给谁装备什么物品",
        "是否刷新商店",
        "是否升级等级",
        "其他战术建议",
    ] {
        prompt.push_str("- ");
        prompt.push_str(question);
        prompt.push('\n');
    }
    prompt.push_str("请以简洁明了的方式提供建议，避免冗长的解释。");
    Some(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::StateUpdate;

    #[test]
    fn test_no_prompt_before_first_update() {
        let snapshot = GameStateSnapshot::default();
        assert!(render_prompt(&snapshot, &StrategyConfig::default()).is_none());
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let mut snapshot = GameStateSnapshot::default();
        snapshot.apply(StateUpdate {
            analysis: Some("回合3，金币20".to_string()),
            ..Default::default()
        });
        let strategy = StrategyConfig::default();

        let a = render_prompt(&snapshot, &strategy).unwrap();
        let b = render_prompt(&snapshot, &strategy).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("回合: 3, 金币: 20"));
        assert!(a.contains("\"金克丝\""));
        assert!(a.contains("\"无尽之刃\""));
    }
}
