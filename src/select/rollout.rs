//! 启发式评分策略
//!
//! 以参数具体程度与动作类型适配度打分：数据收集型动作
//! （Retrieve / Operate）优于会话中途的 Finish。并列时取先出现者；
//! 无法评分时由调用方回退到一致性策略。

use crate::action::{ActionType, CandidateAction};

fn type_weight(action_type: ActionType) -> f64 {
    match action_type {
        ActionType::Retrieve | ActionType::Operate => 2.0,
        ActionType::Calculate => 1.5,
        ActionType::Search => 1.0,
        ActionType::Finish => 0.25,
    }
}

/// 参数具体程度：词数越多越具体，封顶 10 词
fn specificity(argument: &str) -> f64 {
    argument.split_whitespace().count().min(10) as f64 / 10.0
}

pub fn score(candidate: &CandidateAction) -> f64 {
    type_weight(candidate.action_type) + specificity(&candidate.argument)
}

pub fn select(candidates: &[CandidateAction]) -> Option<CandidateAction> {
    let mut best: Option<(&CandidateAction, f64)> = None;
    for c in candidates {
        let s = score(c);
        if best.map_or(true, |(_, bs)| s > bs) {
            best = Some((c, s));
        }
    }
    best.map(|(c, _)| c.clone())
}
