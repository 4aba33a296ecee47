//! 直接回答工具：把目标交给推理能力直接作答
//!
//! 兜底计划的单步就是调用它；Agent 在注册表缺少同名工具时自动注册。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{complete_with_timeout, LlmClient};
use crate::memory::Message;
use crate::tools::Tool;

pub const DIRECT_ANSWER_TOOL: &str = "direct_answer";

pub struct DirectAnswerTool {
    llm: Arc<dyn LlmClient>,
    instructions: String,
    request_timeout: Duration,
}

impl DirectAnswerTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            instructions: "Answer the goal directly and concisely.".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// 角色说明会作为 system prompt 附加
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

#[async_trait]
impl Tool for DirectAnswerTool {
    fn name(&self) -> &str {
        DIRECT_ANSWER_TOOL
    }

    fn description(&self) -> &str {
        "Answer the goal directly with the reasoning model. Args: {\"goal\": \"...\", \"context\": \"optional\"}"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "goal": {"type": "string"},
                "context": {"type": "string"}
            },
            "required": ["goal"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let goal = args
            .get("goal")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing 'goal'".to_string())?;
        let mut user = goal.to_string();
        if let Some(context) = args.get("context").and_then(|v| v.as_str()) {
            user.push_str("\n\nContext:\n");
            user.push_str(context);
        }
        let messages = vec![Message::system(self.instructions.clone()), Message::user(user)];
        let answer = complete_with_timeout(self.llm.as_ref(), &messages, self.request_timeout)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Value::String(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_direct_answer_uses_llm() {
        let tool = DirectAnswerTool::new(Arc::new(MockLlmClient));
        let out = tool.execute(json!({"goal": "what is 2+2"})).await.unwrap();
        assert!(out.as_str().unwrap().contains("what is 2+2"));
    }

    #[tokio::test]
    async fn test_direct_answer_missing_goal() {
        let tool = DirectAnswerTool::new(Arc::new(MockLlmClient));
        assert!(tool.execute(json!({})).await.is_err());
    }
}
