//! 会话错误类型
//!
//! 错误分层：Oracle 不可用视为零候选，重试一次后升级为结构性停机；
//! 单次工具失败仅从投票袋剔除；解析失败在进入选择器前丢弃候选；
//! 只有 StructuralHalt / Cancelled 会成为会话终态，且停机会话仍由
//! 聚合器尽力给出答案，绝不向外抛异常。

use thiserror::Error;

/// 会话运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum SessionError {
    /// Oracle 网络错误或超时；重试一次后仍失败则停机
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// 单次工具尝试失败（静默剔除，不中止回合）
    #[error("Tool attempt failed: {0}")]
    ToolAttemptFailed(String),

    /// 候选不符合 `ActionType[argument]` 文本约定
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// 结构性停机：无表可用、配置不一致、不变量被破坏等
    #[error("Structural halt: {0}")]
    StructuralHalt(String),

    /// 外部取消（仅在回合之间检查）
    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    ConfigError(String),

    /// 候选列表为空时无法选择
    #[error("No candidates to select from")]
    EmptyCandidates,
}
