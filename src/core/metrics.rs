//! 进程内指标上下文
//!
//! 以显式引用传入 Oracle 与派发器，取代模块级可变计数；
//! 同一实例可跨会话累计，清零时机由持有方决定。

use std::sync::atomic::{AtomicU64, Ordering};

/// 累计计数：Oracle 调用、token 用量、工具尝试
#[derive(Debug, Default)]
pub struct Metrics {
    oracle_calls: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    tool_attempts: AtomicU64,
    tool_failures: AtomicU64,
}

/// 某一时刻的指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub oracle_calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub tool_attempts: u64,
    pub tool_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_oracle_call(&self) {
        self.oracle_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tokens(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
    }

    pub fn record_tool_attempt(&self, succeeded: bool) {
        self.tool_attempts.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.tool_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 全部计数清零
    pub fn reset(&self) {
        self.oracle_calls.store(0, Ordering::Relaxed);
        self.prompt_tokens.store(0, Ordering::Relaxed);
        self.completion_tokens.store(0, Ordering::Relaxed);
        self.tool_attempts.store(0, Ordering::Relaxed);
        self.tool_failures.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            oracle_calls: self.oracle_calls.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            tool_attempts: self.tool_attempts.load(Ordering::Relaxed),
            tool_failures: self.tool_failures.load(Ordering::Relaxed),
        }
    }
}
