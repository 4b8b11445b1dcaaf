//! 决策 Oracle 抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 DecisionOracle：
//! sample（n 路独立采样，可带对数概率）与 complete（单次补全，
//! 供 Judge 对比与直答兜底使用）。Oracle 被视为黑盒随机服务。

pub mod mock;
pub mod openai;

pub use mock::MockOracle;
pub use openai::OpenAiOracle;

use async_trait::async_trait;

use crate::core::SessionError;

/// 一次采样结果：文本与可选平均对数概率
#[derive(Debug, Clone)]
pub struct OracleSample {
    pub text: String,
    pub log_prob: Option<f64>,
}

impl OracleSample {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            log_prob: None,
        }
    }

    pub fn scored(text: impl Into<String>, log_prob: f64) -> Self {
        Self {
            text: text.into(),
            log_prob: Some(log_prob),
        }
    }
}

/// 决策 Oracle：n 路独立采样与单次补全
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// n 路独立采样（回合内可并行，顺序无关）
    async fn sample(&self, prompt: &str, n: usize) -> Result<Vec<OracleSample>, SessionError>;

    /// 单次补全（Judge 对比、直答兜底）
    async fn complete(&self, prompt: &str) -> Result<String, SessionError> {
        let mut samples = self.sample(prompt, 1).await?;
        samples
            .pop()
            .map(|s| s.text)
            .ok_or_else(|| SessionError::OracleUnavailable("empty completion".to_string()))
    }
}
