//! 先见平局的多数投票
//!
//! 工具结果、Oracle 预测观察与各策略选票都走同一个共识原语：
//! 并列时取先出现者，保证确定性。

use std::collections::HashMap;
use std::hash::Hash;

/// 返回出现次数最多的条目及其计数；并列时取先出现者，空输入返回 None
pub fn majority<T: Eq + Hash + Clone>(items: &[T]) -> Option<(T, usize)> {
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    let mut best: Option<(&T, usize)> = None;
    for item in items {
        let count = counts[item];
        // 严格大于：先出现者在并列时保持胜出
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((item, count));
        }
    }
    best.map(|(item, count)| (item.clone(), count))
}
