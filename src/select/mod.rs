//! 动作选择（奖励策略）
//!
//! 消费 N 个候选并按可插拔策略返回一个胜者；选择是纯读取，
//! 唯一的例外是 Judge / Combined 需要再调用一次 Oracle 做对比。
//! 步 1 / 步 2 的 Finish 结构过滤也在这里完成：
//! - 步 1 一律过滤 Finish；过滤后池子为空则替补一个合成 Retrieve
//! - 步 2 在转写中尚无成功工具结果时过滤 Finish

pub mod combined;
pub mod consistency;
pub mod judge;
pub mod logprob;
pub mod rollout;

use std::str::FromStr;
use std::sync::Arc;

use crate::action::{ActionType, CandidateAction};
use crate::core::SessionError;
use crate::oracle::DecisionOracle;

/// 五种可互换的奖励策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewardPolicy {
    #[default]
    Consistency,
    Judge,
    LogProb,
    Rollout,
    Combined,
}

impl RewardPolicy {
    /// LogProb / Combined 需要采样时返回对数概率
    pub fn needs_logprobs(&self) -> bool {
        matches!(self, RewardPolicy::LogProb | RewardPolicy::Combined)
    }
}

impl FromStr for RewardPolicy {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consistency" => Ok(RewardPolicy::Consistency),
            "judge" | "llm" => Ok(RewardPolicy::Judge),
            "logp" | "logprob" => Ok(RewardPolicy::LogProb),
            "rollout" => Ok(RewardPolicy::Rollout),
            "combined" => Ok(RewardPolicy::Combined),
            other => Err(SessionError::ConfigError(format!(
                "unknown reward policy: {other}"
            ))),
        }
    }
}

/// 选择时的会话只读视图
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub step_index: usize,
    /// 转写中是否已有成功的工具结果
    pub has_tool_success: bool,
    pub question: &'a str,
    pub table_text: &'a str,
    pub scratchpad: &'a str,
}

pub struct ActionSelector {
    policy: RewardPolicy,
    oracle: Arc<dyn DecisionOracle>,
}

impl ActionSelector {
    pub fn new(policy: RewardPolicy, oracle: Arc<dyn DecisionOracle>) -> Self {
        Self { policy, oracle }
    }

    pub fn policy(&self) -> RewardPolicy {
        self.policy
    }

    /// 结构过滤 + 策略选择；仅在候选列表为空时失败
    pub async fn select(
        &self,
        candidates: Vec<CandidateAction>,
        ctx: &SelectionContext<'_>,
    ) -> Result<CandidateAction, SessionError> {
        if candidates.is_empty() {
            return Err(SessionError::EmptyCandidates);
        }

        let mut pool = structural_filter(candidates, ctx);
        if pool.is_empty() {
            tracing::debug!(
                step = ctx.step_index,
                "all candidates filtered; substituting synthetic Retrieve"
            );
            pool.push(CandidateAction::synthetic_retrieve(ctx.question));
        }

        let winner = match self.policy {
            RewardPolicy::Consistency => consistency::select(&pool),
            RewardPolicy::Judge => match judge::select(self.oracle.as_ref(), &pool, ctx).await {
                Some(c) => Some(c),
                None => consistency::select(&pool),
            },
            RewardPolicy::LogProb => logprob::select(&pool),
            RewardPolicy::Rollout => {
                rollout::select(&pool).or_else(|| consistency::select(&pool))
            }
            RewardPolicy::Combined => {
                match combined::select(self.oracle.as_ref(), &pool, ctx).await {
                    Some(c) => Some(c),
                    None => consistency::select(&pool),
                }
            }
        };
        winner.ok_or(SessionError::EmptyCandidates)
    }
}

/// 步 1 过滤全部 Finish；步 2 在尚无成功工具结果时过滤 Finish
fn structural_filter(
    candidates: Vec<CandidateAction>,
    ctx: &SelectionContext<'_>,
) -> Vec<CandidateAction> {
    let filter_finish = match ctx.step_index {
        1 => true,
        2 => !ctx.has_tool_success,
        _ => false,
    };
    if !filter_finish {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| c.action_type != ActionType::Finish)
        .collect()
}
