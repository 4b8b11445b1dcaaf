//! 未配置的检索工具
//!
//! 文档检索属外部协作方；默认组合里 Search 动作温和失败，
//! 失败会被冗余投票当作普通的尝试失败吸收，不会中止回合。

use async_trait::async_trait;

use crate::table::TableSnapshot;
use crate::tools::{ToolAttemptResult, ToolExecutor};

#[derive(Debug, Default)]
pub struct UnconfiguredSearchTool;

#[async_trait]
impl ToolExecutor for UnconfiguredSearchTool {
    fn name(&self) -> &str {
        "search"
    }

    async fn execute(&self, _argument: &str, _snapshot: &TableSnapshot) -> ToolAttemptResult {
        ToolAttemptResult::failure("search backend not configured")
    }
}
