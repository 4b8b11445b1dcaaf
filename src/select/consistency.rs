//! 一致性策略（默认）
//!
//! 按字面动作串 `Type[arg]` 分组取多数组，并列时取先出现的组；
//! 组内优先返回 thought 非空的候选。

use crate::action::CandidateAction;
use crate::vote::majority;

pub fn select(candidates: &[CandidateAction]) -> Option<CandidateAction> {
    let strings: Vec<String> = candidates.iter().map(|c| c.action_string()).collect();
    let (winner, _) = majority(&strings)?;
    let group: Vec<&CandidateAction> = candidates
        .iter()
        .filter(|c| c.action_string() == winner)
        .collect();
    group
        .iter()
        .find(|c| !c.thought.is_empty())
        .or_else(|| group.first())
        .map(|c| (*c).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;

    #[test]
    fn test_plurality_action_string_wins() {
        let candidates = vec![
            CandidateAction::new("a", ActionType::Calculate, "1+1"),
            CandidateAction::new("b", ActionType::Retrieve, "rows"),
            CandidateAction::new("c", ActionType::Retrieve, "rows"),
        ];
        let winner = select(&candidates).unwrap();
        assert_eq!(winner.action_string(), "Retrieve[rows]");
        assert_eq!(winner.thought, "b");
    }

    #[test]
    fn test_tie_prefers_first_seen_group() {
        let candidates = vec![
            CandidateAction::new("a", ActionType::Calculate, "1+1"),
            CandidateAction::new("b", ActionType::Retrieve, "rows"),
        ];
        let winner = select(&candidates).unwrap();
        assert_eq!(winner.action_string(), "Calculate[1+1]");
    }

    #[test]
    fn test_prefers_non_empty_thought_within_group() {
        let candidates = vec![
            CandidateAction::new("", ActionType::Retrieve, "rows"),
            CandidateAction::new("solid reasoning", ActionType::Retrieve, "rows"),
        ];
        assert_eq!(select(&candidates).unwrap().thought, "solid reasoning");
    }

    #[test]
    fn test_empty_input() {
        assert!(select(&[]).is_none());
    }
}
