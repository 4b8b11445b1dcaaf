//! 行过滤检索工具（参考实现）
//!
//! 对应 Retrieve 动作：按指令中的关键词过滤快照行，返回线性化子表与
//! 新快照。不修改输入快照。

use std::collections::HashSet;
use std::sync::OnceLock;

use async_trait::async_trait;

use crate::table::TableSnapshot;
use crate::tools::{ToolAttemptResult, ToolExecutor};

fn stopwords() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        [
            "the", "and", "for", "with", "where", "rows", "row", "columns", "column", "table",
            "from", "that", "are", "was", "all", "get", "find", "retrieve", "extract", "show",
            "which", "whose", "relevant",
        ]
        .into_iter()
        .collect()
    })
}

/// 指令中的显著关键词：长度 > 2 且非停用词
fn keywords(instruction: &str) -> Vec<String> {
    instruction
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2 && !stopwords().contains(w))
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
}

#[derive(Debug, Default)]
pub struct RowFilterTool;

impl RowFilterTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolExecutor for RowFilterTool {
    fn name(&self) -> &str {
        "row_filter"
    }

    async fn execute(&self, argument: &str, snapshot: &TableSnapshot) -> ToolAttemptResult {
        let terms = keywords(argument);
        if terms.is_empty() {
            return ToolAttemptResult::failure("no usable keywords in instruction");
        }

        let matched: Vec<Vec<String>> = snapshot
            .rows()
            .iter()
            .filter(|row| {
                row.iter()
                    .any(|cell| terms.iter().any(|t| cell.to_lowercase().contains(t)))
            })
            .cloned()
            .collect();

        if matched.is_empty() {
            return ToolAttemptResult::failure("no rows matched the instruction");
        }

        let sub_table = TableSnapshot::new(
            format!("{} (filtered)", snapshot.provenance()),
            snapshot.columns().to_vec(),
            matched,
        )
        .with_handle(snapshot.handle().clone());
        ToolAttemptResult::ok_with_table(sub_table.linearize(None).trim().to_string(), sub_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TableSnapshot {
        TableSnapshot::from_raw(
            "medals",
            &[
                vec!["Year".into(), "Host".into(), "Gold".into()],
                vec!["2000".into(), "Sydney".into(), "16".into()],
                vec!["2004".into(), "Athens".into(), "17".into()],
            ],
        )
    }

    #[tokio::test]
    async fn test_filters_matching_rows() {
        let tool = RowFilterTool::new();
        let r = tool.execute("rows where Host is Athens", &snapshot()).await;
        assert!(r.succeeded);
        assert!(r.result_text.contains("Athens"));
        assert!(!r.result_text.contains("Sydney"));
        assert_eq!(r.result_table.unwrap().rows().len(), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_failure() {
        let tool = RowFilterTool::new();
        let r = tool.execute("rows where Host is Beijing", &snapshot()).await;
        assert!(!r.succeeded);
    }

    #[tokio::test]
    async fn test_input_snapshot_untouched() {
        let tool = RowFilterTool::new();
        let snap = snapshot();
        let _ = tool.execute("Athens", &snap).await;
        assert_eq!(snap.rows().len(), 2);
    }
}
