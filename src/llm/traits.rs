//! 推理能力抽象
//!
//! 规划与综合只依赖 LlmClient：prompt 进、文本出。所有后端（OpenAI 兼容 / DeepSeek / Mock）实现该 trait，
//! 调用方对其输出不做信任假设，控制流只使用经过结构校验的结果。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 推理后端错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Reasoning backend unreachable: {0}")]
    Unavailable(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Empty response")]
    EmptyResponse,
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 带超时的完成调用：超时视为推理不可用，空白回复视为 EmptyResponse
pub async fn complete_with_timeout(
    llm: &dyn LlmClient,
    messages: &[Message],
    timeout: Duration,
) -> Result<String, LlmError> {
    let text = tokio::time::timeout(timeout, llm.complete(messages))
        .await
        .map_err(|_| LlmError::Timeout(timeout))??;
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}
