//! 候选动作与文本约定解析
//!
//! Oracle 输出遵循固定文本约定 `ActionType[argument]`，
//! ActionType ∈ {Retrieve, Calculate, Operate, Search, Finish}；
//! 不可解析的候选在进入选择器前即被丢弃。动作类型是封闭枚举，
//! 新增动作即新增一个编译期检查的匹配分支。

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::oracle::OracleSample;

/// 动作类型（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// 从当前表中抽取子表
    Retrieve,
    /// 算术求值
    Calculate,
    /// 表变换（过滤、连接、聚合）
    Operate,
    /// 文档检索
    Search,
    /// 提交最终答案
    Finish,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        ActionType::Retrieve,
        ActionType::Calculate,
        ActionType::Operate,
        ActionType::Search,
        ActionType::Finish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Retrieve => "Retrieve",
            ActionType::Calculate => "Calculate",
            ActionType::Operate => "Operate",
            ActionType::Search => "Search",
            ActionType::Finish => "Finish",
        }
    }

    /// 数据收集型动作（非 Finish）
    pub fn is_data_gathering(&self) -> bool {
        !matches!(self, ActionType::Finish)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Retrieve" => Ok(ActionType::Retrieve),
            "Calculate" => Ok(ActionType::Calculate),
            "Operate" => Ok(ActionType::Operate),
            "Search" => Ok(ActionType::Search),
            "Finish" => Ok(ActionType::Finish),
            _ => Err(()),
        }
    }
}

/// 一个采样得到的候选动作；产生后不可变，选择是纯读取
#[derive(Debug, Clone)]
pub struct CandidateAction {
    pub thought: String,
    pub action_type: ActionType,
    pub argument: String,
    /// 采样的平均对数概率（LogProb 策略用；缺省视为 −∞）
    pub log_prob: Option<f64>,
    /// 规划采样中 Oracle 自己预测的 Observation（混合投票用）
    pub predicted_observation: Option<String>,
    /// 原始采样文本
    pub raw: String,
}

impl CandidateAction {
    pub fn new(
        thought: impl Into<String>,
        action_type: ActionType,
        argument: impl Into<String>,
    ) -> Self {
        let thought = thought.into();
        let argument = argument.into();
        let raw = format!("{thought}\n{action_type}[{argument}]");
        Self {
            thought,
            action_type,
            argument,
            log_prob: None,
            predicted_observation: None,
            raw,
        }
    }

    pub fn with_log_prob(mut self, log_prob: f64) -> Self {
        self.log_prob = Some(log_prob);
        self
    }

    /// 字面动作串 `Type[arg]`；一致性策略按它分组
    pub fn action_string(&self) -> String {
        format!("{}[{}]", self.action_type, self.argument)
    }

    /// 合成「收集数据」候选：步 1 过滤 Finish 后池子为空时的替补
    pub fn synthetic_retrieve(question: &str) -> Self {
        Self::new(
            "I should gather the relevant rows from the table before answering.",
            ActionType::Retrieve,
            format!("the rows and columns relevant to: {question}"),
        )
    }
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(Retrieve|Calculate|Operate|Search|Finish)\[([^\]]+)\]")
            .expect("static action regex")
    })
}

/// 从一段文本中解析第一个 `Type[arg]`
pub fn parse_action(text: &str) -> Option<(ActionType, String)> {
    let caps = action_regex().captures(text)?;
    let action_type = ActionType::from_str(&caps[1]).ok()?;
    Some((action_type, caps[2].trim().to_string()))
}

fn labeled_line<'a>(lines: &[&'a str], label: &str) -> Option<(usize, &'a str)> {
    lines
        .iter()
        .enumerate()
        .find(|(_, line)| line.contains(label))
        .map(|(i, line)| (i, *line))
}

fn strip_label(line: &str, label: &str) -> String {
    match line.find(label) {
        Some(idx) => line[idx + label.len()..].trim().to_string(),
        None => line.trim().to_string(),
    }
}

/// 从一条采样文本中提取第 `step` 步的候选
/// （`Thought {n}:` / `Action {n}:` 行，及可选的 `Observation {n}:` 段）
pub fn extract_candidate(
    sample: &str,
    step: usize,
    log_prob: Option<f64>,
) -> Option<CandidateAction> {
    let lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    let thought_label = format!("Thought {step}:");
    let action_label = format!("Action {step}:");
    let obs_label = format!("Observation {step}:");
    let next_thought_label = format!("Thought {}:", step + 1);

    let (_, thought_line) = labeled_line(&lines, &thought_label)?;
    let (_, action_line) = labeled_line(&lines, &action_label)?;
    let (action_type, argument) = parse_action(action_line)?;

    let predicted_observation = labeled_line(&lines, &obs_label).map(|(start, _)| {
        let end = labeled_line(&lines, &next_thought_label)
            .map(|(i, _)| i)
            .unwrap_or(lines.len());
        let mut chunk: Vec<String> = lines[start..end].iter().map(|l| l.to_string()).collect();
        chunk[0] = strip_label(&chunk[0], &obs_label);
        chunk.join("\n").trim().to_string()
    });

    Some(CandidateAction {
        thought: strip_label(thought_line, &thought_label),
        action_type,
        argument,
        log_prob,
        predicted_observation: predicted_observation.filter(|o| !o.is_empty()),
        raw: sample.to_string(),
    })
}

/// 批量解析采样；不可解析项丢弃
pub fn parse_candidates(samples: &[OracleSample], step: usize) -> Vec<CandidateAction> {
    let total = samples.len();
    let candidates: Vec<CandidateAction> = samples
        .iter()
        .filter_map(|s| extract_candidate(&s.text, step, s.log_prob))
        .collect();
    if candidates.len() < total {
        tracing::debug!(
            dropped = total - candidates.len(),
            total,
            step,
            "unparseable candidates dropped"
        );
    }
    candidates
}

/// 收集各采样中 `Finish[...]` 的参数（小写），作为初步答案
pub fn harvest_finish_answers(samples: &[OracleSample]) -> Vec<String> {
    samples
        .iter()
        .filter_map(|s| {
            s.text.lines().find(|l| l.contains("Finish")).and_then(|l| {
                parse_action(l).and_then(|(t, arg)| {
                    (t == ActionType::Finish).then(|| arg.to_lowercase())
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_basic() {
        let (t, arg) = parse_action("Action 1: Retrieve[rows where Year is 2004]").unwrap();
        assert_eq!(t, ActionType::Retrieve);
        assert_eq!(arg, "rows where Year is 2004");
    }

    #[test]
    fn test_parse_action_rejects_unknown_type() {
        assert!(parse_action("Action 1: Inspect[the table]").is_none());
        assert!(parse_action("no action here").is_none());
    }

    #[test]
    fn test_extract_candidate_with_predicted_observation() {
        let sample = "Thought 2: I need the gold medal count.\n\
                      Action 2: Retrieve[rows where Host is Athens]\n\
                      Observation 2: | Year | Host | Gold |\n| 2004 | Athens | 17 |\n\
                      Thought 3: Now I can finish.";
        let c = extract_candidate(sample, 2, Some(-1.5)).unwrap();
        assert_eq!(c.thought, "I need the gold medal count.");
        assert_eq!(c.action_type, ActionType::Retrieve);
        assert_eq!(c.log_prob, Some(-1.5));
        let obs = c.predicted_observation.unwrap();
        assert!(obs.contains("Athens"));
        assert!(!obs.contains("Thought 3"));
    }

    #[test]
    fn test_extract_candidate_wrong_step_is_dropped() {
        let sample = "Thought 1: think.\nAction 1: Calculate[1+1]";
        assert!(extract_candidate(sample, 2, None).is_none());
    }

    #[test]
    fn test_harvest_finish_answers_lowercases() {
        let samples = vec![
            OracleSample::text("Thought 1: easy.\nAction 1: Finish[Beijing]"),
            OracleSample::text("Thought 1: hmm.\nAction 1: Retrieve[gold medals]"),
            OracleSample::text("Thought 1: sure.\nAction 1: Finish[BEIJING]"),
        ];
        assert_eq!(harvest_finish_answers(&samples), vec!["beijing", "beijing"]);
    }

    #[test]
    fn test_action_string_round_trip() {
        let c = CandidateAction::new("t", ActionType::Operate, "join the two tables on Year");
        assert_eq!(c.action_string(), "Operate[join the two tables on Year]");
    }
}
