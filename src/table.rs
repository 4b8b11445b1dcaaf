//! 表格快照
//!
//! 去重后的有序列名 + 行元组 + 工具协作方专用的不透明查询句柄。
//! 快照只追加：每次成功的变换动作产生新快照压入会话的快照栈，
//! 旧快照保持可达、永不删除。

use serde::{Deserialize, Serialize};

/// 不透明查询句柄（本核心不解释其内容，归工具协作方所有）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHandle(pub String);

/// 不可变表格快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    handle: QueryHandle,
    /// 来源标签（多表题目中区分不同表）
    provenance: String,
}

impl TableSnapshot {
    /// 从列名与行构造快照；列名冲突时去重，空表头单元格补 `column {i}`
    pub fn new(
        provenance: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        let columns = dedup_columns(
            columns
                .into_iter()
                .enumerate()
                .map(|(i, c)| clean_cell(&c, i, true))
                .collect(),
        );
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .enumerate()
                    .map(|(i, c)| clean_cell(&c, i, false))
                    .collect()
            })
            .collect();
        Self {
            columns,
            rows,
            handle: QueryHandle::default(),
            provenance: provenance.into(),
        }
    }

    /// 首行作表头的原始二维表
    pub fn from_raw(provenance: impl Into<String>, raw: &[Vec<String>]) -> Self {
        let (header, body) = match raw.split_first() {
            Some((h, b)) => (h.clone(), b.to_vec()),
            None => (Vec::new(), Vec::new()),
        };
        Self::new(provenance, header, body)
    }

    pub fn with_handle(mut self, handle: QueryHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn handle(&self) -> &QueryHandle {
        &self.handle
    }

    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    pub fn cell_count(&self) -> usize {
        self.rows.len() * self.columns.len().max(1)
    }

    /// 线性化为 Markdown 竖线表；num_rows 截断时追加剩余行数提示
    pub fn linearize(&self, num_rows: Option<usize>) -> String {
        let mut out = String::new();
        out.push_str("| ");
        out.push_str(&self.columns.join(" | "));
        out.push_str(" |\n");

        let shown = num_rows.unwrap_or(self.rows.len()).min(self.rows.len());
        for row in &self.rows[..shown] {
            out.push_str("| ");
            out.push_str(&row.join(" | "));
            out.push_str(" |\n");
        }
        let remaining = self.rows.len() - shown;
        if remaining > 0 {
            out.push_str(&format!(
                "[...remaining {remaining} rows not shown due to large table size...]\n"
            ));
        }
        out
    }
}

fn clean_cell(cell: &str, idx: usize, header: bool) -> String {
    let cell = cell.replace("\\n", " ").replace('\n', " ");
    if header && cell.trim().is_empty() {
        format!("column {}", idx + 1)
    } else {
        cell
    }
}

/// 重复列名按出现次序追加 `_{序号}` 后缀，保证选择与投票可复现
fn dedup_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    columns
        .into_iter()
        .map(|c| {
            let count = seen.entry(c.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                c
            } else {
                format!("{}_{}", c, count)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableSnapshot {
        TableSnapshot::from_raw(
            "medals",
            &[
                vec!["Year".into(), "Host".into(), "Gold".into()],
                vec!["2000".into(), "Sydney".into(), "16".into()],
                vec!["2004".into(), "Athens".into(), "17".into()],
                vec!["2008".into(), "Beijing".into(), "21".into()],
            ],
        )
    }

    #[test]
    fn test_dedup_repeated_columns() {
        let t = TableSnapshot::new(
            "t",
            vec!["Score".into(), "Score".into(), "Score".into()],
            vec![],
        );
        assert_eq!(t.columns(), &["Score", "Score_2", "Score_3"]);
    }

    #[test]
    fn test_empty_header_cell_gets_placeholder() {
        let t = TableSnapshot::new("t", vec!["".into(), "Name".into()], vec![]);
        assert_eq!(t.columns()[0], "column 1");
    }

    #[test]
    fn test_linearize_full() {
        let text = sample().linearize(None);
        assert!(text.starts_with("| Year | Host | Gold |\n"));
        assert!(text.contains("| 2008 | Beijing | 21 |"));
        assert!(!text.contains("remaining"));
    }

    #[test]
    fn test_linearize_capped_appends_remainder_note() {
        let text = sample().linearize(Some(1));
        assert!(text.contains("| 2000 | Sydney | 16 |"));
        assert!(!text.contains("Athens"));
        assert!(text.contains("remaining 2 rows"));
    }

    #[test]
    fn test_newlines_in_cells_are_flattened() {
        let t = TableSnapshot::new(
            "t",
            vec!["A".into()],
            vec![vec!["line1\nline2".into()]],
        );
        assert_eq!(t.rows()[0][0], "line1 line2");
    }
}
