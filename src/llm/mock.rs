//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! - MockLlmClient：识别规划 / 综合请求，分别返回一步直接回答计划与回显式综合，便于本地跑通整条链路。
//! - FnLlmClient：由闭包决定回复，测试中用于脚本化推理能力（含失败注入）。

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::agent::{PLAN_REQUEST_TAG, SYNTHESIS_REQUEST_TAG};
use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};
use crate::tools::DIRECT_ANSWER_TOOL;

/// Mock 客户端：确定性回复
#[derive(Debug, Default)]
pub struct MockLlmClient;

fn last_user(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

fn is_request(messages: &[Message], tag: &str) -> bool {
    messages
        .iter()
        .any(|m| m.role == Role::System && m.content.starts_with(tag))
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let user = last_user(messages);

        if is_request(messages, PLAN_REQUEST_TAG) {
            let goal = user
                .lines()
                .find_map(|l| l.strip_prefix("Goal: "))
                .unwrap_or(user)
                .trim();
            let proposal = serde_json::json!({
                "success_criteria": ["An answer addressing the goal is produced"],
                "reasoning": [
                    {"category": "goal_analysis", "rationale": format!("Mock analysis of: {goal}"), "confidence": 0.5}
                ],
                "steps": [
                    {"id": "answer", "tool": DIRECT_ANSWER_TOOL, "input": {"goal": goal}}
                ],
                "confidence": 0.5,
                "risks": ["mock reasoner: output is not model generated"]
            });
            return Ok(proposal.to_string());
        }

        if is_request(messages, SYNTHESIS_REQUEST_TAG) {
            return Ok(format!("Mock synthesis:\n{user}"));
        }

        Ok(format!("Mock answer: {user}"))
    }
}

type ReplyFn = dyn Fn(&[Message]) -> Result<String, LlmError> + Send + Sync;

/// 闭包驱动的客户端：记录调用次数
pub struct FnLlmClient {
    reply: Box<ReplyFn>,
    calls: AtomicUsize,
}

impl FnLlmClient {
    pub fn new(reply: impl Fn(&[Message]) -> Result<String, LlmError> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
        }
    }

    /// 始终不可用的推理后端
    pub fn unavailable() -> Self {
        Self::new(|_| Err(LlmError::Unavailable("offline".to_string())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FnLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(messages)
    }
}

/// 判断一组消息是否为规划请求（供 FnLlmClient 闭包分流使用）
pub fn is_plan_request(messages: &[Message]) -> bool {
    is_request(messages, PLAN_REQUEST_TAG)
}

/// 判断一组消息是否为综合请求
pub fn is_synthesis_request(messages: &[Message]) -> bool {
    is_request(messages, SYNTHESIS_REQUEST_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_plan_request_returns_json() {
        let messages = vec![
            Message::system(format!("{PLAN_REQUEST_TAG} plan please")),
            Message::user("Goal: write a haiku\nTools: ..."),
        ];
        let out = MockLlmClient.complete(&messages).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["steps"][0]["tool"], DIRECT_ANSWER_TOOL);
        assert_eq!(value["steps"][0]["input"]["goal"], "write a haiku");
    }

    #[tokio::test]
    async fn test_mock_plain_request_echoes() {
        let out = MockLlmClient
            .complete(&[Message::user("hello")])
            .await
            .unwrap();
        assert_eq!(out, "Mock answer: hello");
    }

    #[tokio::test]
    async fn test_fn_client_counts_calls() {
        let client = FnLlmClient::unavailable();
        assert!(client.complete(&[]).await.is_err());
        assert!(client.complete(&[]).await.is_err());
        assert_eq!(client.calls(), 2);
    }
}
