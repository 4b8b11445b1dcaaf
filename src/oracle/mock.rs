//! Mock Oracle（测试用，无需 API）
//!
//! 预置响应队列：每次 sample 弹出一组样本，complete 弹出一组并取首条。
//! 队列耗尽时返回 OracleUnavailable，可以用来构造「Oracle 耗尽」停机场景。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::SessionError;
use crate::oracle::{DecisionOracle, OracleSample};

#[derive(Debug, Default)]
pub struct MockOracle {
    responses: Mutex<VecDeque<Vec<OracleSample>>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一轮采样响应
    pub fn push_samples(&self, texts: &[&str]) {
        let batch = texts.iter().map(|t| OracleSample::text(*t)).collect();
        self.push_batch(batch);
    }

    /// 追加一轮带对数概率的采样响应
    pub fn push_scored(&self, samples: &[(&str, f64)]) {
        let batch = samples
            .iter()
            .map(|(t, p)| OracleSample::scored(*t, *p))
            .collect();
        self.push_batch(batch);
    }

    /// 追加一条单次补全响应
    pub fn push_text(&self, text: &str) {
        self.push_samples(&[text]);
    }

    fn push_batch(&self, batch: Vec<OracleSample>) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(batch);
        }
    }
}

#[async_trait]
impl DecisionOracle for MockOracle {
    async fn sample(&self, _prompt: &str, _n: usize) -> Result<Vec<OracleSample>, SessionError> {
        let mut q = self
            .responses
            .lock()
            .map_err(|_| SessionError::OracleUnavailable("mock oracle poisoned".to_string()))?;
        q.pop_front()
            .ok_or_else(|| SessionError::OracleUnavailable("mock oracle exhausted".to_string()))
    }
}
