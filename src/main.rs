//! Tabact - 表格问答批量运行入口
//!
//! 用法：`tabact <dataset.jsonl> [config.toml]`
//!
//! 数据集为 JSONL，每行一个试验：question / statement、table_text
//! （首行为表头的二维数组）、可选 text 上下文与 answer 评分键。
//! 逐行创建会话运行，最后汇总 Correct / Incorrect / Halted 与指标。

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use tabact::config::load_config;
use tabact::core::Metrics;
use tabact::oracle::OpenAiOracle;
use tabact::scoring::exact_match;
use tabact::select::RewardPolicy;
use tabact::session::Session;
use tabact::tools::ToolSet;
use tabact::{Question, TableSnapshot};

/// 数据集一行；question / statement 二选一
#[derive(Debug, Deserialize)]
struct DatasetRow {
    question: Option<String>,
    statement: Option<String>,
    table_text: Vec<Vec<String>>,
    text: Option<String>,
    answer: Option<String>,
}

impl DatasetRow {
    fn into_question(self) -> Option<Question> {
        let text = self.question.or(self.statement)?;
        let table = TableSnapshot::from_raw("table", &self.table_text);
        let mut question = Question::new(text, vec![table]);
        if let Some(context) = self.text {
            question = question.with_context(context);
        }
        if let Some(key) = self.answer {
            question = question.with_key(key);
        }
        Some(question)
    }
}

fn read_dataset(path: &PathBuf) -> anyhow::Result<Vec<Question>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open dataset {}", path.display()))?;
    let mut questions = Vec::new();
    for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: DatasetRow = serde_json::from_str(&line)
            .with_context(|| format!("bad dataset row at line {}", lineno + 1))?;
        match row.into_question() {
            Some(q) => questions.push(q),
            None => tracing::warn!(line = lineno + 1, "row has no question; skipped"),
        }
    }
    Ok(questions)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tabact::observability::init();

    let mut args = std::env::args().skip(1);
    let dataset_path = PathBuf::from(
        args.next()
            .context("usage: tabact <dataset.jsonl> [config.toml]")?,
    );
    let config_path = args.next().map(PathBuf::from);

    let config = load_config(config_path).context("failed to load config")?;
    let policy: RewardPolicy = config
        .session
        .reward_policy
        .parse()
        .context("bad reward_policy in config")?;

    let metrics = Arc::new(Metrics::new());
    let oracle = Arc::new(
        OpenAiOracle::new(
            config.oracle.base_url.as_deref(),
            &config.oracle.model,
            None,
            metrics.clone(),
        )
        .with_temperature(config.oracle.temperature)
        .with_timeout(std::time::Duration::from_secs(
            config.oracle.request_timeout_secs,
        ))
        .with_logprobs(policy.needs_logprobs()),
    );

    let questions = read_dataset(&dataset_path)?;
    tracing::info!(trials = questions.len(), "dataset loaded");

    let mut correct = 0usize;
    let mut incorrect = 0usize;
    let mut halted = 0usize;

    for (i, question) in questions.into_iter().enumerate() {
        let key = question.key.clone();
        let mut session = Session::create(
            question,
            config.session.clone(),
            oracle.clone(),
            ToolSet::reference_set(),
            metrics.clone(),
        )
        .context("failed to create session")?;

        let result = session.run().await;
        let verdict = match (&key, &result.halted) {
            (_, Some(reason)) => {
                halted += 1;
                format!("Halted ({reason})")
            }
            (Some(key), None) => {
                if exact_match(&result.answer.text, key) {
                    correct += 1;
                    "Correct".to_string()
                } else {
                    incorrect += 1;
                    "Incorrect".to_string()
                }
            }
            (None, None) => "Unscored".to_string(),
        };
        println!(
            "trial {}: answer = {:?} (confidence {:.2}) — {}",
            i + 1,
            result.answer.text,
            result.answer.confidence,
            verdict
        );
    }

    let snapshot = metrics.snapshot();
    println!("Correct: {correct}  Incorrect: {incorrect}  Halted: {halted}");
    println!(
        "oracle calls: {}  prompt tokens: {}  completion tokens: {}  tool attempts: {} ({} failed)",
        snapshot.oracle_calls,
        snapshot.prompt_tokens,
        snapshot.completion_tokens,
        snapshot.tool_attempts,
        snapshot.tool_failures,
    );

    Ok(())
}
