//! Synthesizer：把 Ledger 中成功步骤的输出交给推理能力组织成最终答复
//!
//! 失败与跳过的步骤不进入 prompt，只保留在元数据中；推理失败时返回确定性的兜底文本（原样列出成功输出）。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::agent::profile::AgentProfile;
use crate::core::EngineError;
use crate::llm::{complete_with_timeout, LlmClient};
use crate::memory::Message;
use crate::workflow::{Ledger, StepId, StepOutcome, StepStatus};

/// 综合请求的 system prompt 前缀
pub const SYNTHESIS_REQUEST_TAG: &str = "[synthesis-request]";

/// 综合结果
#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    pub text: String,
    /// 进入综合的成功步骤
    pub used_steps: Vec<StepId>,
    /// 被排除的步骤及其状态
    pub excluded: Vec<(StepId, StepStatus)>,
    /// 是否使用了确定性兜底文本
    pub fallback: bool,
    pub error: Option<String>,
}

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    profile: AgentProfile,
    request_timeout: Duration,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, profile: AgentProfile, request_timeout: Duration) -> Self {
        Self {
            llm,
            profile,
            request_timeout,
        }
    }

    /// 综合最终文本；从不失败
    pub async fn synthesize(&self, goal: &str, ledger: &Ledger, cancel: &CancellationToken) -> Synthesis {
        let succeeded = ledger.succeeded();
        let used_steps: Vec<StepId> = succeeded.iter().map(|o| o.step_id.clone()).collect();
        let excluded: Vec<(StepId, StepStatus)> = ledger
            .outcomes()
            .filter(|o| !o.is_success())
            .map(|o| (o.step_id.clone(), o.status))
            .collect();

        if succeeded.is_empty() {
            tracing::warn!(role = %self.profile.role, "no succeeded steps, using fallback synthesis");
            return Synthesis {
                text: fallback_text(goal, ledger),
                used_steps,
                excluded,
                fallback: true,
                error: None,
            };
        }

        let messages = self.synthesis_messages(goal, &succeeded);
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            res = complete_with_timeout(self.llm.as_ref(), &messages, self.request_timeout) => {
                res.map_err(EngineError::from)
            }
        };

        match reply {
            Ok(text) => Synthesis {
                text: text.trim().to_string(),
                used_steps,
                excluded,
                fallback: false,
                error: None,
            },
            Err(e) => {
                tracing::warn!(role = %self.profile.role, error = %e, "synthesis failed, using fallback text");
                Synthesis {
                    text: fallback_text(goal, ledger),
                    used_steps,
                    excluded,
                    fallback: true,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn synthesis_messages(&self, goal: &str, succeeded: &[&StepOutcome]) -> Vec<Message> {
        let system = format!(
            "{SYNTHESIS_REQUEST_TAG} {}\nCompose the final answer to the goal using only the step results provided. \
             Summarize key findings as numbered points where it helps.",
            self.profile.preamble()
        );
        let mut user = format!("Goal: {goal}\n\nStep results:\n");
        for outcome in succeeded {
            user.push_str(&render_outcome(outcome));
        }
        vec![Message::system(system), Message::user(user)]
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_outcome(outcome: &StepOutcome) -> String {
    let output = outcome.output.as_ref().map(render_value).unwrap_or_default();
    format!("[{}] ({}):\n{}\n\n", outcome.step_id, outcome.tool, output)
}

/// 确定性兜底文本：原样列出成功输出，并说明被排除的步骤
pub fn fallback_text(goal: &str, ledger: &Ledger) -> String {
    let succeeded = ledger.succeeded();
    let mut text = if succeeded.is_empty() {
        format!("No step succeeded for goal: {goal}\n")
    } else {
        let mut s = format!("Partial results for goal: {goal}\n\n");
        for outcome in &succeeded {
            s.push_str(&render_outcome(outcome));
        }
        s
    };

    let excluded: Vec<String> = ledger
        .outcomes()
        .filter(|o| !o.is_success())
        .map(|o| {
            let status = match o.status {
                StepStatus::Failed => "failed",
                StepStatus::Skipped => "skipped",
                StepStatus::Succeeded => "succeeded",
            };
            match &o.error {
                Some(e) => format!("- {} ({}): {}: {}", o.step_id, o.tool, status, e),
                None => format!("- {} ({}): {}", o.step_id, o.tool, status),
            }
        })
        .collect();
    if !excluded.is_empty() {
        text.push_str("\nExcluded steps:\n");
        text.push_str(&excluded.join("\n"));
        text.push('\n');
    }
    if let Some(reason) = ledger.structural_error() {
        text.push_str(&format!("\nPlan could not be executed: {reason}\n"));
    }
    text.trim_end().to_string()
}
