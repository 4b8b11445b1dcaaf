//! 最终答案聚合
//!
//! 会话结束后沿固定优先链提取答案：显式 Finish > 初步答案多数
//! （仅在启用时）> 轨迹回扫 > 直接问答兜底 > 哨兵。聚合永不报错——
//! 任何失败都落到置信度为 0 的哨兵答案上。

use std::sync::Arc;

use crate::action::{parse_action, ActionType};
use crate::oracle::DecisionOracle;
use crate::prompt::direct_prompt;
use crate::session::TranscriptEntry;
use crate::vote::majority;

/// 兜底哨兵答案
pub const UNANSWERED: &str = "unable to determine answer";

/// 答案来源，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// 会话内显式选中的 Finish
    Finish,
    /// 第 1 步采样中的初步答案多数
    Preliminary,
    /// 轨迹回扫到的 Finish 动作
    Transcript,
    /// 直接问答兜底
    Direct,
    /// 哨兵
    Sentinel,
}

#[derive(Debug, Clone)]
pub struct FinalAnswer {
    pub text: String,
    pub confidence: f64,
    pub source: AnswerSource,
}

pub struct AnswerAggregator {
    oracle: Arc<dyn DecisionOracle>,
    /// 直接问答兜底的采样数
    sample_n: usize,
    /// 初步答案分支开关；关闭时收集到的初步答案不参与聚合
    use_preliminary: bool,
}

impl AnswerAggregator {
    pub fn new(oracle: Arc<dyn DecisionOracle>, sample_n: usize, use_preliminary: bool) -> Self {
        Self {
            oracle,
            sample_n: sample_n.max(1),
            use_preliminary,
        }
    }

    pub async fn aggregate(
        &self,
        final_answer: Option<&str>,
        preliminary_answers: &[String],
        transcript: &[TranscriptEntry],
        question: &str,
        table_text: &str,
        context: Option<&str>,
    ) -> FinalAnswer {
        if let Some(answer) = final_answer {
            if !answer.is_empty() {
                return FinalAnswer {
                    text: answer.to_string(),
                    confidence: 1.0,
                    source: AnswerSource::Finish,
                };
            }
        }

        if self.use_preliminary {
            if let Some((answer, count)) = majority(preliminary_answers) {
                if !answer.is_empty() {
                    return FinalAnswer {
                        text: answer,
                        confidence: count as f64 / preliminary_answers.len() as f64,
                        source: AnswerSource::Preliminary,
                    };
                }
            }
        }

        // 回扫轨迹：最晚的 Finish 动作优先
        for entry in transcript.iter().rev() {
            if let Some((ActionType::Finish, argument)) = parse_action(&entry.action) {
                if !argument.is_empty() {
                    return FinalAnswer {
                        text: argument,
                        confidence: 0.5,
                        source: AnswerSource::Transcript,
                    };
                }
            }
        }

        if let Some(answer) = self.direct_fallback(question, table_text, context).await {
            return FinalAnswer {
                text: answer.0,
                confidence: answer.1,
                source: AnswerSource::Direct,
            };
        }

        FinalAnswer {
            text: UNANSWERED.to_string(),
            confidence: 0.0,
            source: AnswerSource::Sentinel,
        }
    }

    /// 绕开动作循环直接向 Oracle 提问，对答案多数投票
    async fn direct_fallback(
        &self,
        question: &str,
        table_text: &str,
        context: Option<&str>,
    ) -> Option<(String, f64)> {
        let prompt = direct_prompt(question, table_text, context);
        let samples = match self.oracle.sample(&prompt, self.sample_n).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(error = %e, "direct answer fallback failed");
                return None;
            }
        };

        let answers: Vec<String> = samples
            .iter()
            .filter_map(|s| {
                // 取最后一个冒号之后的文本作为答案
                s.text
                    .rsplit(':')
                    .next()
                    .map(|a| a.trim().to_lowercase())
                    .filter(|a| !a.is_empty())
            })
            .collect();

        let total = answers.len();
        majority(&answers).map(|(answer, count)| (answer, count as f64 / total as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;

    fn entry(step: usize, action: &str, observation: &str) -> TranscriptEntry {
        TranscriptEntry {
            step_index: step,
            thought: "t".into(),
            action: action.into(),
            observation: observation.into(),
            tool_succeeded: true,
        }
    }

    fn aggregator(oracle: MockOracle) -> AnswerAggregator {
        AnswerAggregator::new(Arc::new(oracle), 3, true)
    }

    #[tokio::test]
    async fn test_explicit_finish_wins() {
        let a = aggregator(MockOracle::new());
        let result = a
            .aggregate(Some("17"), &["3".into()], &[], "q", "| A |\n", None)
            .await;
        assert_eq!(result.text, "17");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.source, AnswerSource::Finish);
    }

    #[tokio::test]
    async fn test_preliminary_majority() {
        let a = aggregator(MockOracle::new());
        let prelim = vec!["17".to_string(), "17".to_string(), "16".to_string()];
        let result = a.aggregate(None, &prelim, &[], "q", "| A |\n", None).await;
        assert_eq!(result.text, "17");
        assert!((result.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.source, AnswerSource::Preliminary);
    }

    #[tokio::test]
    async fn test_disabled_preliminary_branch_is_skipped() {
        // 未启用初步答案时，收集到的初步答案不得短路后续分支
        let oracle = MockOracle::new();
        oracle.push_samples(&["Answer: 17", "Answer: 17"]);
        let a = AnswerAggregator::new(Arc::new(oracle), 2, false);
        let prelim = vec!["42".to_string(), "42".to_string()];
        let result = a.aggregate(None, &prelim, &[], "q", "| A |\n", None).await;
        assert_eq!(result.text, "17");
        assert_eq!(result.source, AnswerSource::Direct);
    }

    #[tokio::test]
    async fn test_transcript_scan_prefers_latest_finish() {
        let a = aggregator(MockOracle::new());
        let transcript = vec![
            entry(1, "Finish[early]", "obs"),
            entry(2, "Retrieve[rows]", "obs"),
            entry(3, "Finish[late]", "obs"),
        ];
        let result = a
            .aggregate(None, &[], &transcript, "q", "| A |\n", None)
            .await;
        assert_eq!(result.text, "late");
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.source, AnswerSource::Transcript);
    }

    #[tokio::test]
    async fn test_direct_fallback_votes_over_samples() {
        let oracle = MockOracle::new();
        oracle.push_samples(&["Answer: 17", "Answer: 17", "Answer: 16"]);
        let a = aggregator(oracle);
        let result = a.aggregate(None, &[], &[], "q", "| A |\n", None).await;
        assert_eq!(result.text, "17");
        assert_eq!(result.source, AnswerSource::Direct);
    }

    #[tokio::test]
    async fn test_sentinel_when_everything_fails() {
        // MockOracle 未被喂样本，直接兜底也失败
        let a = aggregator(MockOracle::new());
        let result = a.aggregate(None, &[], &[], "q", "| A |\n", None).await;
        assert_eq!(result.text, UNANSWERED);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source, AnswerSource::Sentinel);
    }
}
