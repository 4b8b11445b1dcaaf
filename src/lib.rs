//! Tabact - 表格问答自一致性智能体核心
//!
//! 对同一推理步采样 N 个候选动作、对选中动作做 K 次冗余工具执行，
//! 以先见多数共识取代单次推理，降低 Oracle 在多步符号任务
//! （查找、连接、算术）上的方差。
//!
//! 模块划分：
//! - **action**: 候选动作与 `ActionType[argument]` 文本约定解析
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分层与进程内指标上下文
//! - **dispatch**: 工具派发、混合投票与多表改派启发
//! - **oracle**: 决策 Oracle 抽象与实现（OpenAI 兼容 / Mock）
//! - **prompt**: 规划 / 评审 / 直答提示词拼装（胶水层）
//! - **select**: 动作选择器与五种奖励策略
//! - **session**: 会话状态机、终止策略与答案聚合
//! - **table**: 表格快照与线性化
//! - **tools**: 工具执行契约、派发表与参考实现

pub mod action;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod observability;
pub mod oracle;
pub mod prompt;
pub mod question;
pub mod scoring;
pub mod select;
pub mod session;
pub mod table;
pub mod tools;
pub mod vote;

pub use question::Question;
pub use session::{FinalResult, Session, StepOutcome};
pub use table::TableSnapshot;
