//! 答案归一化与精确匹配
//!
//! 仅供批量运行时的试验汇总使用；核心循环不依赖评分。

use std::sync::OnceLock;

use regex::Regex;

fn article_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(a|an|the)\b").expect("static article regex"))
}

/// 小写、去标点、去冠词、压缩空白
pub fn normalize_answer(s: &str) -> String {
    let lower = s.to_lowercase();
    let no_punct: String = lower
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let no_articles = article_regex().replace_all(&no_punct, " ");
    no_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn exact_match(answer: &str, key: &str) -> bool {
    normalize_answer(answer) == normalize_answer(key)
}
