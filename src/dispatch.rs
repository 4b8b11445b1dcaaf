//! 工具派发与共识投票
//!
//! 对选中的动作发起 K 次独立尝试（并发执行、单次超时），把成功结果与
//! 规划采样中 Oracle 预测的 Observation 合并进同一个投票袋（混合投票，
//! 两类证据等权），取先见多数作为本回合观察。全部尝试失败时给出合成
//! 失败观察——回合仍然完成，不会让会话停机。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::time::timeout;

use crate::action::ActionType;
use crate::core::Metrics;
use crate::table::TableSnapshot;
use crate::tools::ToolSet;
use crate::vote::majority;

/// 一次派发的结果
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub observation: String,
    /// 胜出观察对应的新快照（变换动作成功时）
    pub new_snapshot: Option<TableSnapshot>,
    /// 胜出观察是否来自一次成功的工具尝试
    pub tool_succeeded: bool,
    /// 本回合是否有任意一次工具尝试成功（与胜者来源无关）
    pub attempt_succeeded: bool,
}

pub struct ToolDispatcher {
    tools: ToolSet,
    /// 冗余因子 K
    attempts: usize,
    attempt_timeout: Duration,
    /// 长表模式或代码即观察模式下关闭
    hybrid_voting: bool,
    metrics: Arc<Metrics>,
}

impl ToolDispatcher {
    pub fn new(
        tools: ToolSet,
        attempts: usize,
        attempt_timeout: Duration,
        hybrid_voting: bool,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            tools,
            attempts: attempts.max(1),
            attempt_timeout,
            hybrid_voting,
            metrics,
        }
    }

    /// 多表启发：Retrieve 参数涉及多个已知表的词汇或含连接词，
    /// 且存在 ≥2 个不同来源的快照时，改派 Operate
    /// （Retrieve 的执行器不负责跨表连接）。
    pub fn effective_action(
        &self,
        action_type: ActionType,
        argument: &str,
        tables: &[TableSnapshot],
    ) -> ActionType {
        if action_type != ActionType::Retrieve {
            return action_type;
        }
        let distinct: std::collections::HashSet<&str> =
            tables.iter().map(|t| t.provenance()).collect();
        if distinct.len() < 2 {
            return action_type;
        }

        let arg = argument.to_lowercase();
        let connector = ["join", "combine", "merge", "both", "and"]
            .iter()
            .any(|w| arg.split_whitespace().any(|token| token == *w));
        let tables_referenced = tables
            .iter()
            .filter(|t| {
                t.columns().iter().any(|c| {
                    let c = c.to_lowercase();
                    c.len() > 2 && arg.contains(&c)
                }) || arg.contains(&t.provenance().to_lowercase())
            })
            .count();

        if tables_referenced >= 2 || connector {
            tracing::debug!(argument, "multi-table retrieve re-routed to Operate");
            ActionType::Operate
        } else {
            action_type
        }
    }

    /// 派发动作：K 次冗余尝试 + 混合投票
    pub async fn dispatch(
        &self,
        action_type: ActionType,
        argument: &str,
        snapshot: &TableSnapshot,
        predicted_observations: &[String],
    ) -> DispatchOutcome {
        let start = Instant::now();
        let Some(executor) = self.tools.executor_for(action_type) else {
            // Finish 不应到达这里；给出合成观察而不是中止
            return DispatchOutcome {
                observation: format!("No tool is mapped to {action_type}."),
                new_snapshot: None,
                tool_succeeded: false,
                attempt_succeeded: false,
            };
        };

        let attempts = join_all((0..self.attempts).map(|_| {
            let executor = executor.clone();
            async move {
                timeout(self.attempt_timeout, executor.execute(argument, snapshot)).await
            }
        }))
        .await;

        // 成功且非空的结果进入投票袋；失败与超时静默剔除
        let mut successes: Vec<(String, Option<TableSnapshot>)> = Vec::new();
        for attempt in attempts {
            match attempt {
                Ok(result) if result.succeeded && !result.result_text.is_empty() => {
                    self.metrics.record_tool_attempt(true);
                    successes.push((result.result_text, result.result_table));
                }
                Ok(_) => self.metrics.record_tool_attempt(false),
                Err(_) => self.metrics.record_tool_attempt(false),
            }
        }

        let mut bag: Vec<String> = successes.iter().map(|(text, _)| text.clone()).collect();
        if self.hybrid_voting {
            bag.extend(
                predicted_observations
                    .iter()
                    .filter(|o| !o.is_empty())
                    .cloned(),
            );
        }

        let attempt_succeeded = !successes.is_empty();
        let outcome = match majority(&bag) {
            Some((winner, _)) => {
                let new_snapshot = successes
                    .iter()
                    .find(|(text, _)| *text == winner)
                    .and_then(|(_, table)| table.clone());
                let tool_succeeded = successes.iter().any(|(text, _)| *text == winner);
                DispatchOutcome {
                    observation: winner,
                    new_snapshot,
                    tool_succeeded,
                    attempt_succeeded,
                }
            }
            None => DispatchOutcome {
                observation: format!(
                    "All {} tool attempts failed for {action_type}[{argument}]; \
                     no observation available.",
                    self.attempts
                ),
                new_snapshot: None,
                tool_succeeded: false,
                attempt_succeeded,
            },
        };

        let audit = serde_json::json!({
            "event": "dispatch_audit",
            "action": action_type.as_str(),
            "attempts": self.attempts,
            "succeeded": successes.len(),
            "hybrid": self.hybrid_voting,
            "winner_from_tool": outcome.tool_succeeded,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "dispatch");

        outcome
    }
}
