//! 核心层：错误分层与指标上下文

pub mod error;
pub mod metrics;

pub use error::SessionError;
pub use metrics::{Metrics, MetricsSnapshot};
