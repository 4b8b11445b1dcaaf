//! 组合策略
//!
//! 独立运行其余四种策略，对四张选票取多数。选票按固定优先级
//! 顺序收集（Consistency、Judge、LogProb、Rollout），配合先见平局
//! 的多数投票，平局时即按该优先级裁决。

use crate::action::CandidateAction;
use crate::oracle::DecisionOracle;
use crate::select::{consistency, judge, logprob, rollout, SelectionContext};
use crate::vote::majority;

pub async fn select(
    oracle: &dyn DecisionOracle,
    candidates: &[CandidateAction],
    ctx: &SelectionContext<'_>,
) -> Option<CandidateAction> {
    let mut votes: Vec<String> = Vec::with_capacity(4);
    if let Some(c) = consistency::select(candidates) {
        votes.push(c.action_string());
    }
    if let Some(c) = judge::select(oracle, candidates, ctx).await {
        votes.push(c.action_string());
    }
    if let Some(c) = logprob::select(candidates) {
        votes.push(c.action_string());
    }
    if let Some(c) = rollout::select(candidates) {
        votes.push(c.action_string());
    }

    let (winner, count) = majority(&votes)?;
    tracing::debug!(votes = votes.len(), count, winner = %winner, "combined vote");
    candidates
        .iter()
        .find(|c| c.action_string() == winner)
        .cloned()
}
