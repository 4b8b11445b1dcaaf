//! 评审策略
//!
//! 把全部候选拼成对比提示再调用一次 Oracle，解析 1 起始的整数选择；
//! 解析失败、越界、Oracle 出错或仅有单个候选时返回 None，
//! 由调用方回退到一致性策略。

use std::sync::OnceLock;

use regex::Regex;

use crate::action::CandidateAction;
use crate::oracle::DecisionOracle;
use crate::prompt;
use crate::select::SelectionContext;

fn choice_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"The best (?:path|result) is (\d+)").expect("static choice regex")
    })
}

/// 从评审输出中解析 1 起始的选择，越界视为解析失败
pub fn parse_choice(output: &str, num_choices: usize) -> Option<usize> {
    let picked = choice_regex()
        .captures(output)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .or_else(|| output.trim().split_whitespace().next()?.parse::<usize>().ok())?;
    (picked >= 1 && picked <= num_choices).then_some(picked)
}

pub async fn select(
    oracle: &dyn DecisionOracle,
    candidates: &[CandidateAction],
    ctx: &SelectionContext<'_>,
) -> Option<CandidateAction> {
    if candidates.len() < 2 {
        return None;
    }
    let paths: Vec<String> = candidates
        .iter()
        .map(|c| format!("{} {}", c.thought, c.action_string()))
        .collect();
    let prompt = prompt::judge_prompt(ctx.question, ctx.table_text, ctx.scratchpad, &paths);

    let output = match oracle.complete(&prompt).await {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(error = %e, "judge oracle call failed; falling back");
            return None;
        }
    };
    let choice = parse_choice(&output, candidates.len())?;
    Some(candidates[choice - 1].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use crate::oracle::MockOracle;

    fn ctx() -> SelectionContext<'static> {
        SelectionContext {
            step_index: 3,
            has_tool_success: true,
            question: "q?",
            table_text: "| A |\n",
            scratchpad: "",
        }
    }

    fn candidates() -> Vec<CandidateAction> {
        vec![
            CandidateAction::new("a", ActionType::Retrieve, "x"),
            CandidateAction::new("b", ActionType::Calculate, "1+1"),
            CandidateAction::new("c", ActionType::Finish, "2"),
        ]
    }

    #[test]
    fn test_parse_choice_variants() {
        assert_eq!(parse_choice("The best path is 2.", 3), Some(2));
        assert_eq!(parse_choice("The best result is 3", 3), Some(3));
        assert_eq!(parse_choice("1", 3), Some(1));
        assert_eq!(parse_choice("The best path is 7", 3), None);
        assert_eq!(parse_choice("no idea", 3), None);
    }

    #[tokio::test]
    async fn test_judge_picks_indicated_candidate() {
        let oracle = MockOracle::new();
        oracle.push_text("Reasoning... The best path is 2.");
        let winner = select(&oracle, &candidates(), &ctx()).await.unwrap();
        assert_eq!(winner.thought, "b");
    }

    #[tokio::test]
    async fn test_judge_parse_failure_returns_none() {
        let oracle = MockOracle::new();
        oracle.push_text("I cannot decide.");
        assert!(select(&oracle, &candidates(), &ctx()).await.is_none());
    }

    #[tokio::test]
    async fn test_single_candidate_returns_none() {
        let oracle = MockOracle::new();
        let one = vec![CandidateAction::new("a", ActionType::Retrieve, "x")];
        assert!(select(&oracle, &one, &ctx()).await.is_none());
    }
}
