//! 工具执行契约与派发表
//!
//! 每类动作对应一个 ToolExecutor；ToolSet 以封闭的 ActionType 做穷尽匹配，
//! 新增动作类型即新增一个编译期检查的匹配分支。执行器必须可被 K 次并发
//! 调用同一快照，且不得原地修改快照——每次尝试产出独立结果。

pub mod calc;
pub mod retrieve;
pub mod search;

pub use calc::CalculatorTool;
pub use retrieve::RowFilterTool;
pub use search::UnconfiguredSearchTool;

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::ActionType;
use crate::table::TableSnapshot;

/// 单次工具尝试结果；K 次尝试相互独立、顺序无关
#[derive(Debug, Clone)]
pub struct ToolAttemptResult {
    pub succeeded: bool,
    pub result_text: String,
    /// 变换动作成功时产出的新快照
    pub result_table: Option<TableSnapshot>,
    pub error: Option<String>,
}

impl ToolAttemptResult {
    pub fn ok(result_text: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            result_text: result_text.into(),
            result_table: None,
            error: None,
        }
    }

    pub fn ok_with_table(result_text: impl Into<String>, table: TableSnapshot) -> Self {
        Self {
            succeeded: true,
            result_text: result_text.into(),
            result_table: Some(table),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            result_text: String::new(),
            result_table: None,
            error: Some(error.into()),
        }
    }
}

/// 工具执行器：给定参数与快照返回一次尝试结果；沙箱纪律由实现方自理
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, argument: &str, snapshot: &TableSnapshot) -> ToolAttemptResult;
}

/// 动作类型到执行器的派发表
pub struct ToolSet {
    retrieve: Arc<dyn ToolExecutor>,
    calculate: Arc<dyn ToolExecutor>,
    operate: Arc<dyn ToolExecutor>,
    search: Arc<dyn ToolExecutor>,
}

impl ToolSet {
    pub fn new(
        retrieve: Arc<dyn ToolExecutor>,
        calculate: Arc<dyn ToolExecutor>,
        operate: Arc<dyn ToolExecutor>,
        search: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            retrieve,
            calculate,
            operate,
            search,
        }
    }

    /// Finish 不经过工具派发，返回 None
    pub fn executor_for(&self, action_type: ActionType) -> Option<&Arc<dyn ToolExecutor>> {
        match action_type {
            ActionType::Retrieve => Some(&self.retrieve),
            ActionType::Calculate => Some(&self.calculate),
            ActionType::Operate => Some(&self.operate),
            ActionType::Search => Some(&self.search),
            ActionType::Finish => None,
        }
    }

    /// 参考实现组合：行过滤 Retrieve、算术 Calculate / Operate、未配置的 Search。
    /// 生产部署以各自的执行器替换。
    pub fn reference_set() -> Self {
        let calc = Arc::new(CalculatorTool::new());
        Self::new(
            Arc::new(RowFilterTool::new()),
            calc.clone(),
            calc,
            Arc::new(UnconfiguredSearchTool),
        )
    }
}
