//! 会话状态机
//!
//! 每个问题一个会话，持有转写、步数计数器与快照栈，按
//! 采样 → 选择 → 派发 → 裁决 的回合循环推进，结束后交给聚合器
//! 提取最终答案。取消只在回合边界检查，进行中的回合总是跑完。
//!
//! 计数器约定：step_index 只计完成回合（转写长度 = step_index − 1），
//! actual_step_index 计所有回合（含失败）。两者都从 1 起。

pub mod aggregate;
pub mod termination;

pub use aggregate::{AnswerAggregator, AnswerSource, FinalAnswer, UNANSWERED};
pub use termination::{RoundOutcome, TerminationPolicy, Verdict};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::action::{harvest_finish_answers, parse_candidates, ActionType};
use crate::config::SessionSection;
use crate::core::{Metrics, MetricsSnapshot, SessionError};
use crate::dispatch::ToolDispatcher;
use crate::oracle::{DecisionOracle, OracleSample};
use crate::prompt::plan_prompt;
use crate::question::Question;
use crate::select::{ActionSelector, RewardPolicy, SelectionContext};
use crate::table::TableSnapshot;
use crate::tools::ToolSet;
use crate::vote::majority;

/// 长表模式下提示词中的最大行数
const LONG_TABLE_ROW_CAP: usize = 30;

/// 转写中的一条完成回合记录
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub step_index: usize,
    pub thought: String,
    /// 字面动作串 `Type[arg]`
    pub action: String,
    pub observation: String,
    pub tool_succeeded: bool,
}

/// 会话可变状态；由终止策略维护计数器
#[derive(Debug, Default)]
pub struct SessionState {
    pub step_index: usize,
    pub actual_step_index: usize,
    /// 待裁决的致命错误（下一次裁决时停机）
    pub pending_error: Option<String>,
    /// 会话内显式选中的 Finish 答案
    pub final_answer: Option<String>,
    /// 第 1 回合采样中收集的初步答案（小写）
    pub preliminary_answers: Vec<String>,
    /// 转写中是否已有成功的工具结果
    pub has_tool_success: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            step_index: 1,
            actual_step_index: 1,
            ..Self::default()
        }
    }
}

/// 一个回合对调用方的报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// 回合完成，继续
    Continued,
    /// 回合失败但未停机，继续
    Skipped,
    /// 会话以给定答案完成
    Finished { answer: String },
    /// 会话停机
    Halted { reason: String },
}

/// 会话终态
#[derive(Debug, Clone)]
pub struct FinalResult {
    pub answer: FinalAnswer,
    pub transcript: Vec<TranscriptEntry>,
    pub preliminary_answers: Vec<String>,
    /// 停机原因；正常完成时为 None
    pub halted: Option<String>,
}

pub struct Session {
    id: Uuid,
    question: Question,
    config: SessionSection,
    state: SessionState,
    transcript: Vec<TranscriptEntry>,
    /// 快照栈：栈底是问题的首个表，工具产出的新快照入栈；永不为空
    snapshots: Vec<TableSnapshot>,
    oracle: Arc<dyn DecisionOracle>,
    selector: ActionSelector,
    dispatcher: ToolDispatcher,
    termination: TerminationPolicy,
    aggregator: AnswerAggregator,
    cancel: CancellationToken,
    metrics: Arc<Metrics>,
}

impl Session {
    /// 创建会话：校验问题与配置。指标由调用方持有，
    /// 同一 Metrics 可跨会话累计，清零时机由调用方决定
    pub fn create(
        question: Question,
        config: SessionSection,
        oracle: Arc<dyn DecisionOracle>,
        tools: ToolSet,
        metrics: Arc<Metrics>,
    ) -> Result<Self, SessionError> {
        if question.tables.is_empty() {
            return Err(SessionError::StructuralHalt(
                "question has no tables".to_string(),
            ));
        }
        if config.plan_sample == 0 || config.code_sample == 0 {
            return Err(SessionError::ConfigError(
                "plan_sample and code_sample must be at least 1".to_string(),
            ));
        }
        if config.max_steps == 0 || config.max_actual_steps == 0 {
            return Err(SessionError::ConfigError(
                "step caps must be at least 1".to_string(),
            ));
        }
        if !(config.answer_agreement > 0.0 && config.answer_agreement <= 1.0) {
            return Err(SessionError::ConfigError(
                "answer_agreement must be in (0, 1]".to_string(),
            ));
        }
        let policy: RewardPolicy = config.reward_policy.parse()?;

        // 长表模式与代码即观察模式都关闭混合投票
        let hybrid = !(config.long_table_mode || config.code_as_observation);
        let dispatcher = ToolDispatcher::new(
            tools,
            config.code_sample,
            Duration::from_secs(config.tool_timeout_secs),
            hybrid,
            metrics.clone(),
        );
        let selector = ActionSelector::new(policy, oracle.clone());
        let aggregator = AnswerAggregator::new(
            oracle.clone(),
            config.plan_sample,
            config.use_preliminary_answer,
        );
        let termination = TerminationPolicy::new(config.max_steps, config.max_actual_steps);
        let snapshots = vec![question.tables[0].clone()];

        Ok(Self {
            id: Uuid::new_v4(),
            question,
            config,
            state: SessionState::new(),
            transcript: Vec::new(),
            snapshots,
            oracle,
            selector,
            dispatcher,
            termination,
            aggregator,
            cancel: CancellationToken::new(),
            metrics,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 回合边界取消用；进行中的回合不会被打断
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 渲染转写为提示词用 scratchpad
    fn scratchpad(&self) -> String {
        let mut out = String::new();
        for e in &self.transcript {
            out.push_str(&format!(
                "Thought {n}: {}\nAction {n}: {}\nObservation {n}: {}\n",
                e.thought,
                e.action,
                e.observation,
                n = e.step_index
            ));
        }
        out
    }

    /// 提示词中的表格文本；长表模式下截断行数
    fn table_text(&self) -> String {
        let cap = self.config.long_table_mode.then_some(LONG_TABLE_ROW_CAP);
        self.question
            .tables
            .iter()
            .map(|t| t.linearize(cap))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 规划采样；空批与出错同等对待，重试一次后才升级为停机
    async fn sample_with_retry(&self, prompt: &str) -> Result<Vec<OracleSample>, SessionError> {
        match self.oracle.sample(prompt, self.config.plan_sample).await {
            Ok(samples) if !samples.is_empty() => return Ok(samples),
            Ok(_) => {
                tracing::warn!(session = %self.id, "empty sample batch; retrying once");
            }
            Err(first) => {
                tracing::warn!(session = %self.id, error = %first, "plan sampling failed; retrying once");
            }
        }
        match self.oracle.sample(prompt, self.config.plan_sample).await {
            Ok(samples) if !samples.is_empty() => Ok(samples),
            Ok(_) => Err(SessionError::OracleUnavailable(
                "empty sample batch".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    /// 执行一个回合并裁决
    pub async fn step(&mut self) -> StepOutcome {
        let step = self.state.step_index;
        let table_text = self.table_text();
        let scratchpad = self.scratchpad();
        let prompt = plan_prompt(
            &self.question.text,
            &table_text,
            self.question.context.as_deref(),
            &scratchpad,
            step,
        );

        let samples = match self.sample_with_retry(&prompt).await {
            Ok(samples) => samples,
            Err(e) => {
                self.state.pending_error = Some(e.to_string());
                return self.conclude(RoundOutcome::Failed);
            }
        };

        // 第 1 回合：收集初步答案，必要时以共识直接定案
        if step == 1 && self.state.preliminary_answers.is_empty() {
            self.state.preliminary_answers = harvest_finish_answers(&samples);
            if self.config.use_preliminary_answer {
                if let Some(answer) = self.preliminary_consensus(samples.len()) {
                    self.state.final_answer = Some(answer.clone());
                    return self.conclude(RoundOutcome::Finish(answer));
                }
            }
        }

        let candidates = parse_candidates(&samples, step);
        if candidates.is_empty() {
            tracing::warn!(session = %self.id, step, "no parseable candidates this round");
            return self.conclude(RoundOutcome::Failed);
        }

        let ctx = SelectionContext {
            step_index: step,
            has_tool_success: self.state.has_tool_success,
            question: &self.question.text,
            table_text: &table_text,
            scratchpad: &scratchpad,
        };
        // 本回合所有候选的预测观察都参与混合投票，不限于胜者同组
        let predicted: Vec<String> = candidates
            .iter()
            .filter_map(|c| c.predicted_observation.clone())
            .collect();
        let winner = match self.selector.select(candidates, &ctx).await {
            Ok(winner) => winner,
            Err(e) => {
                tracing::warn!(session = %self.id, step, error = %e, "selection failed");
                return self.conclude(RoundOutcome::Failed);
            }
        };

        if winner.action_type == ActionType::Finish {
            self.state.final_answer = Some(winner.argument.clone());
            return self.conclude(RoundOutcome::Finish(winner.argument));
        }

        let Some(current) = self.snapshots.last().cloned() else {
            self.state.pending_error = Some("snapshot stack is empty".to_string());
            return self.conclude(RoundOutcome::Failed);
        };
        let effective = self.dispatcher.effective_action(
            winner.action_type,
            &winner.argument,
            &self.question.tables,
        );
        let outcome = self
            .dispatcher
            .dispatch(effective, &winner.argument, &current, &predicted)
            .await;

        if let Some(snapshot) = outcome.new_snapshot {
            self.snapshots.push(snapshot);
        }
        // 步 2 的 Finish 过滤看"有无成功的工具尝试"，与胜者来源无关
        if outcome.attempt_succeeded {
            self.state.has_tool_success = true;
        }
        self.transcript.push(TranscriptEntry {
            step_index: step,
            thought: winner.thought,
            action: format!("{effective}[{}]", winner.argument),
            observation: outcome.observation,
            tool_succeeded: outcome.tool_succeeded,
        });

        self.conclude(RoundOutcome::Completed)
    }

    /// 第 1 回合初步答案共识：多数票占比达到阈值即定案
    fn preliminary_consensus(&self, sample_count: usize) -> Option<String> {
        let (answer, count) = majority(&self.state.preliminary_answers)?;
        if answer.is_empty() {
            return None;
        }
        let threshold = self.config.answer_agreement * sample_count as f64;
        (count as f64 >= threshold).then_some(answer)
    }

    fn conclude(&mut self, round: RoundOutcome) -> StepOutcome {
        match self.termination.decide(&mut self.state, &round) {
            Verdict::Finished(answer) => StepOutcome::Finished { answer },
            Verdict::Halted(reason) => {
                tracing::info!(session = %self.id, reason = %reason, "session halted");
                StepOutcome::Halted { reason }
            }
            Verdict::Continue => match round {
                RoundOutcome::Failed => StepOutcome::Skipped,
                _ => StepOutcome::Continued,
            },
        }
    }

    /// 跑完整个会话并聚合最终答案
    pub async fn run(&mut self) -> FinalResult {
        let halted = loop {
            if self.cancel.is_cancelled() {
                break Some(format!(
                    "cancelled before round {}",
                    self.state.actual_step_index
                ));
            }
            match self.step().await {
                StepOutcome::Continued | StepOutcome::Skipped => continue,
                StepOutcome::Finished { .. } => break None,
                StepOutcome::Halted { reason } => break Some(reason),
            }
        };

        let answer = self
            .aggregator
            .aggregate(
                self.state.final_answer.as_deref(),
                &self.state.preliminary_answers,
                &self.transcript,
                &self.question.text,
                &self.table_text(),
                self.question.context.as_deref(),
            )
            .await;

        tracing::info!(
            session = %self.id,
            answer = %answer.text,
            confidence = answer.confidence,
            steps = self.transcript.len(),
            halted = halted.as_deref().unwrap_or("-"),
            "session finished"
        );

        FinalResult {
            answer,
            transcript: self.transcript.clone(),
            preliminary_answers: self.state.preliminary_answers.clone(),
            halted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;

    fn medals_question() -> Question {
        Question::new(
            "how many gold medals were won in Athens?",
            vec![TableSnapshot::from_raw(
                "medals",
                &[
                    vec!["Year".into(), "Host".into(), "Gold".into()],
                    vec!["2000".into(), "Sydney".into(), "16".into()],
                    vec!["2004".into(), "Athens".into(), "17".into()],
                ],
            )],
        )
    }

    fn small_config() -> SessionSection {
        SessionSection {
            plan_sample: 2,
            code_sample: 2,
            max_steps: 6,
            max_actual_steps: 6,
            ..SessionSection::default()
        }
    }

    fn session_with(oracle: MockOracle, config: SessionSection) -> Session {
        Session::create(
            medals_question(),
            config,
            Arc::new(oracle),
            ToolSet::reference_set(),
            Arc::new(Metrics::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_then_finish_happy_path() {
        let oracle = MockOracle::new();
        oracle.push_samples(&[
            "Thought 1: I need the Athens row.\nAction 1: Retrieve[the row for Athens]",
            "Thought 1: I need the Athens row.\nAction 1: Retrieve[the row for Athens]",
        ]);
        oracle.push_samples(&[
            "Thought 2: The gold count is 17.\nAction 2: Finish[17]",
            "Thought 2: The gold count is 17.\nAction 2: Finish[17]",
        ]);

        let mut session = session_with(oracle, small_config());
        let result = session.run().await;

        assert_eq!(result.answer.text, "17");
        assert_eq!(result.answer.confidence, 1.0);
        assert!(result.halted.is_none());
        assert_eq!(result.transcript.len(), 1);
        assert!(result.transcript[0].observation.contains("Athens"));
        assert!(result.transcript[0].tool_succeeded);
    }

    #[tokio::test]
    async fn test_empty_sample_batch_is_retried() {
        // 空批与出错同等对待：重试一次成功后回合照常推进
        let oracle = MockOracle::new();
        oracle.push_samples(&[]);
        oracle.push_samples(&[
            "Thought 1: I need the Athens row.\nAction 1: Retrieve[the row for Athens]",
            "Thought 1: I need the Athens row.\nAction 1: Retrieve[the row for Athens]",
        ]);
        oracle.push_samples(&[
            "Thought 2: The gold count is 17.\nAction 2: Finish[17]",
            "Thought 2: The gold count is 17.\nAction 2: Finish[17]",
        ]);

        let mut session = session_with(oracle, small_config());
        let result = session.run().await;

        assert!(result.halted.is_none());
        assert_eq!(result.answer.text, "17");
        assert_eq!(result.transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_halted_session_ignores_disabled_preliminary_answers() {
        // 未启用初步答案的停机会话：收集到的初步答案不得短路
        // 直答兜底
        let oracle = MockOracle::new();
        oracle.push_samples(&[
            "Thought 1: done.\nAction 1: Finish[42]",
            "Thought 1: done.\nAction 1: Finish[42]",
        ]);
        // 直答兜底采样
        oracle.push_samples(&["Answer: 17", "Answer: 17"]);

        let mut config = small_config();
        config.max_steps = 1;
        config.max_actual_steps = 1;
        let mut session = session_with(oracle, config);
        let result = session.run().await;

        assert!(result.halted.is_some());
        assert_eq!(result.preliminary_answers, vec!["42", "42"]);
        assert_eq!(result.answer.text, "17");
        assert_eq!(result.answer.source, AnswerSource::Direct);
    }

    #[tokio::test]
    async fn test_oracle_exhaustion_halts_with_sentinel() {
        // 两次采样（首次 + 重试）都失败 → 停机；直答兜底也失败 → 哨兵
        let mut session = session_with(MockOracle::new(), small_config());
        let result = session.run().await;

        assert!(result.halted.is_some());
        assert_eq!(result.answer.text, UNANSWERED);
        assert_eq!(result.answer.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_cancellation_checked_at_round_boundary() {
        let session_oracle = MockOracle::new();
        let mut session = session_with(session_oracle, small_config());
        session.cancellation_token().cancel();
        let result = session.run().await;

        let halted = result.halted.unwrap();
        assert!(halted.contains("cancelled"));
        assert!(result.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_preliminary_consensus_finishes_early() {
        let oracle = MockOracle::new();
        oracle.push_samples(&[
            "Thought 1: easy.\nAction 1: Finish[17]",
            "Thought 1: clear.\nAction 1: Finish[17]",
        ]);

        let mut config = small_config();
        config.use_preliminary_answer = true;
        config.answer_agreement = 1.0;
        let mut session = session_with(oracle, config);
        let result = session.run().await;

        assert_eq!(result.answer.text, "17");
        assert!(result.halted.is_none());
        assert!(result.transcript.is_empty());
        assert_eq!(result.preliminary_answers, vec!["17", "17"]);
    }

    #[test]
    fn test_create_rejects_empty_tables_and_bad_config() {
        let no_tables = Question::new("q?", vec![]);
        let err = Session::create(
            no_tables,
            small_config(),
            Arc::new(MockOracle::new()),
            ToolSet::reference_set(),
            Arc::new(Metrics::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SessionError::StructuralHalt(_)));

        let mut config = small_config();
        config.reward_policy = "banana".to_string();
        let err = Session::create(
            medals_question(),
            config,
            Arc::new(MockOracle::new()),
            ToolSet::reference_set(),
            Arc::new(Metrics::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SessionError::ConfigError(_)));

        let mut config = small_config();
        config.plan_sample = 0;
        let err = Session::create(
            medals_question(),
            config,
            Arc::new(MockOracle::new()),
            ToolSet::reference_set(),
            Arc::new(Metrics::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SessionError::ConfigError(_)));
    }
}
