//! OpenAI 兼容 Oracle 后端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；
//! 单请求 n 路采样，可选返回 logprobs；token 用量与调用次数记入 Metrics；
//! 每次请求施加超时，超时与网络错误统一映射为 OracleUnavailable。

use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::core::{Metrics, SessionError};
use crate::oracle::{DecisionOracle, OracleSample};

pub struct OpenAiOracle {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    timeout: Duration,
    logprobs: bool,
    metrics: Arc<Metrics>,
}

impl OpenAiOracle {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: 0.6,
            timeout: Duration::from_secs(60),
            logprobs: false,
            metrics,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// LogProb / Combined 策略需要时开启
    pub fn with_logprobs(mut self, logprobs: bool) -> Self {
        self.logprobs = logprobs;
        self
    }

    fn user_message(prompt: &str) -> ChatCompletionRequestMessage {
        ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .unwrap(),
        )
    }
}

#[async_trait]
impl DecisionOracle for OpenAiOracle {
    async fn sample(&self, prompt: &str, n: usize) -> Result<Vec<OracleSample>, SessionError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![Self::user_message(prompt)])
            .n(n.min(u8::MAX as usize) as u8)
            .temperature(self.temperature)
            .logprobs(self.logprobs)
            .build()
            .map_err(|e| SessionError::OracleUnavailable(e.to_string()))?;

        let response = timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| SessionError::OracleUnavailable("request timeout".to_string()))?
            .map_err(|e| SessionError::OracleUnavailable(e.to_string()))?;

        self.metrics.record_oracle_call();
        if let Some(usage) = &response.usage {
            self.metrics
                .add_tokens(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        Ok(response
            .choices
            .into_iter()
            .map(|choice| {
                let log_prob = choice
                    .logprobs
                    .as_ref()
                    .and_then(|l| l.content.as_ref())
                    .filter(|tokens| !tokens.is_empty())
                    .map(|tokens| {
                        tokens.iter().map(|t| f64::from(t.logprob)).sum::<f64>()
                            / tokens.len() as f64
                    });
                OracleSample {
                    text: choice.message.content.unwrap_or_default(),
                    log_prob,
                }
            })
            .collect())
    }
}
