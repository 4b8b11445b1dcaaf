//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TABACT__*` 覆盖
//! （双下划线表示嵌套，如 `TABACT__SESSION__PLAN_SAMPLE=10`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub oracle: OracleSection,
}

/// [session] 段：采样宽度、冗余因子、步数上限与共识选项
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// 每回合规划采样数（N）
    pub plan_sample: usize,
    /// 每次工具派发的冗余尝试数（K）
    pub code_sample: usize,
    /// 有效步数上限（仅计成功回合）
    pub max_steps: usize,
    /// 总回合数上限（含失败回合）
    pub max_actual_steps: usize,
    /// 动作选择策略：consistency / judge / logp / rollout / combined
    pub reward_policy: String,
    /// 长表模式：提示词中截断表格行，且关闭混合投票
    pub long_table_mode: bool,
    /// 仅以工具结果为观察（关闭混合投票）
    pub code_as_observation: bool,
    /// 是否允许第一回合的初步答案共识直接定案
    pub use_preliminary_answer: bool,
    /// 初步答案共识阈值（占候选总数的比例）
    pub answer_agreement: f64,
    /// 单次工具尝试超时（秒）
    pub tool_timeout_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            plan_sample: 5,
            code_sample: 5,
            max_steps: 6,
            max_actual_steps: 6,
            reward_policy: "consistency".to_string(),
            long_table_mode: false,
            code_as_observation: false,
            use_preliminary_answer: false,
            answer_agreement: 1.0,
            tool_timeout_secs: 30,
        }
    }
}

/// [oracle] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.6,
            request_timeout_secs: 60,
        }
    }
}

/// 从 config 目录加载配置，环境变量 TABACT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TABACT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TABACT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
