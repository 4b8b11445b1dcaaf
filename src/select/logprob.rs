//! 对数概率策略
//!
//! 取平均对数概率最高的候选；缺省分数视为 −∞，仅作最后选择。
//! 并列时取先出现者。

use crate::action::CandidateAction;

pub fn select(candidates: &[CandidateAction]) -> Option<CandidateAction> {
    let mut best: Option<(&CandidateAction, f64)> = None;
    for c in candidates {
        let score = c.log_prob.unwrap_or(f64::NEG_INFINITY);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((c, score));
        }
    }
    best.map(|(c, _)| c.clone())
}
