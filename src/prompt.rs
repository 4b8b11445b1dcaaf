//! 提示词拼装（胶水层）
//!
//! 模板措辞不构成契约；生产部署可替换为各自任务的模板与少样本示例。
//! 唯一的硬约定是动作文本格式 `ActionType[argument]` 与
//! `Thought n:` / `Action n:` / `Observation n:` 的行标签。

/// 规划提示：采样下一步的 Thought / Action（可附带预测的 Observation）
pub fn plan_prompt(
    question: &str,
    table_text: &str,
    context: Option<&str>,
    scratchpad: &str,
    step: usize,
) -> String {
    let context_block = match context {
        Some(c) if !c.is_empty() => format!("Context: {c}\n"),
        _ => String::new(),
    };
    format!(
        "Solve a question answering task over a table with interleaving Thought, Action and \
         Observation steps. Action must be one of:\n\
         Retrieve[instruction]: extract the relevant sub-table.\n\
         Calculate[expression]: evaluate an arithmetic expression.\n\
         Operate[instruction]: transform the table (filter, join, aggregate).\n\
         Search[entity]: look up background knowledge.\n\
         Finish[answer]: submit the final answer.\n\n\
         Table:\n{table_text}\n{context_block}Question: {question}\n{scratchpad}\
         Continue from Thought {step}: and write the label before each line."
    )
}

/// 评审提示：对比多条候选推理路径，要求以 `The best path is N` 结尾
pub fn judge_prompt(
    question: &str,
    table_text: &str,
    scratchpad: &str,
    paths: &[String],
) -> String {
    let mut out = format!(
        "Given a question over a table and several candidate reasoning paths for the next step, \
         decide which path is the most promising.\n\
         Question: {question}\nTable:\n{table_text}\nPast reasoning:\n{scratchpad}\n"
    );
    for (i, path) in paths.iter().enumerate() {
        out.push_str(&format!("current reasoning path {}: {}\n", i + 1, path));
    }
    out.push_str("Conclude with exactly one line: The best path is N.");
    out
}

/// 直答提示：绕过步进循环，直接给出 `Answer: ...`
pub fn direct_prompt(question: &str, table_text: &str, context: Option<&str>) -> String {
    let context_block = match context {
        Some(c) if !c.is_empty() => format!("Context: {c}\n"),
        _ => String::new(),
    };
    format!(
        "Answer the question based on the table. Reply with a single line ending in \
         `Answer: <answer>`.\n\
         Table:\n{table_text}\n{context_block}Question: {question}"
    )
}
