//! 终止决策
//!
//! 每回合末尾按严格优先级裁决：完成 > 错误停机 > 步数上限 > 继续。
//! 计数器只在"继续"分支里递增——Finish 回合与停机回合不再计步。
//! 上限在递增之前以 >= 判定，max_steps = 3 即最多执行到第 3 回合。

use crate::session::SessionState;

/// 本回合的执行结果，由会话传给裁决
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// 回合正常完成（观察已写入 scratchpad）
    Completed,
    /// 回合失败（无候选或解析失败），只消耗真实步数
    Failed,
    /// 选中了 Finish 动作
    Finish(String),
}

/// 一次裁决的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// 会话以给定答案完成
    Finished(String),
    /// 会话停机（上限或错误）
    Halted(String),
    /// 继续下一回合
    Continue,
}

#[derive(Debug, Clone, Copy)]
pub struct TerminationPolicy {
    pub max_steps: usize,
    pub max_actual_steps: usize,
}

impl TerminationPolicy {
    pub fn new(max_steps: usize, max_actual_steps: usize) -> Self {
        Self {
            max_steps,
            max_actual_steps,
        }
    }

    /// 裁决并维护计数器：
    /// - Finish：直接完成，不递增
    /// - 完成回合：两个计数器都递增
    /// - 失败回合：只递增 actual_step_index
    pub fn decide(&self, state: &mut SessionState, outcome: &RoundOutcome) -> Verdict {
        if let RoundOutcome::Finish(answer) = outcome {
            return Verdict::Finished(answer.clone());
        }

        if let Some(reason) = state.pending_error.take() {
            return Verdict::Halted(reason);
        }

        if state.step_index >= self.max_steps {
            return Verdict::Halted(format!("reached max_steps ({})", self.max_steps));
        }
        if state.actual_step_index >= self.max_actual_steps {
            return Verdict::Halted(format!(
                "reached max_actual_steps ({})",
                self.max_actual_steps
            ));
        }

        match outcome {
            RoundOutcome::Failed => {
                state.actual_step_index += 1;
            }
            _ => {
                state.step_index += 1;
                state.actual_step_index += 1;
            }
        }
        Verdict::Continue
    }
}
