//! 问题定义

use serde::{Deserialize, Serialize};

use crate::table::TableSnapshot;

/// 不可变问题：题面、一个或多个表快照、可选上下文、可选评分键（核心不使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub tables: Vec<TableSnapshot>,
    pub context: Option<String>,
    pub key: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>, tables: Vec<TableSnapshot>) -> Self {
        Self {
            text: text.into(),
            tables,
            context: None,
            key: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}
