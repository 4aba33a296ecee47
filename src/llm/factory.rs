//! 按配置选择推理后端（Mock / OpenAI 兼容 / DeepSeek）
//!
//! DeepSeek 提供与 OpenAI 完全兼容的 API 接口，复用 OpenAiClient，仅替换 base_url 与模型名。

use std::sync::Arc;

use crate::config::LlmSection;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 根据 [llm] 段与环境变量创建客户端；缺少 API Key 时退回 Mock，保证离线可运行
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    match provider.as_str() {
        "deepseek" => {
            let Some(key) = std::env::var("DEEPSEEK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            else {
                tracing::warn!("DEEPSEEK_API_KEY not set, using Mock LLM");
                return Arc::new(MockLlmClient);
            };
            let model = cfg.model.clone().unwrap_or_else(|| DEEPSEEK_CHAT.to_string());
            let base = cfg.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
            tracing::info!("Using DeepSeek LLM ({})", model);
            Arc::new(OpenAiClient::new(Some(base), &model, Some(key.as_str())))
        }
        "openai" => {
            let Ok(key) = std::env::var("OPENAI_API_KEY") else {
                tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
                return Arc::new(MockLlmClient);
            };
            let model = cfg.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            tracing::info!("Using OpenAI LLM ({})", model);
            Arc::new(OpenAiClient::new(
                cfg.base_url.as_deref(),
                &model,
                Some(key.as_str()),
            ))
        }
        "mock" => Arc::new(MockLlmClient),
        other => {
            tracing::warn!("Unknown LLM provider '{}', using Mock LLM", other);
            Arc::new(MockLlmClient)
        }
    }
}
