//! 运行过程事件：用于实时展示规划、步骤执行、综合与协调进度
//!
//! 发送端是可选的 UnboundedSender；没有接收方时发送失败被忽略，不影响执行。

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::workflow::StepStatus;

/// 单条进度事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 计划已生成（degraded 表示走了兜底或缺失置信度）
    PlanCreated {
        role: String,
        plan_id: String,
        steps: usize,
        confidence: f64,
        degraded: bool,
    },
    StepStarted { step_id: String, tool: String },
    /// 步骤失败，等待 delay_ms 后第 attempt 次尝试
    StepRetrying {
        step_id: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    StepFinished {
        step_id: String,
        status: StepStatus,
        attempts: u32,
        duration_ms: u64,
    },
    SynthesisFinished { role: String, fallback: bool },
    AgentFinished {
        role: String,
        success: bool,
        confidence: f64,
        duration_ms: u64,
    },
    /// 协调层进度：第 completed / total 个 Agent 结束
    CoordinationProgress {
        topology: String,
        completed: usize,
        total: usize,
    },
}

/// 事件发送端
pub type EventSender = UnboundedSender<AgentEvent>;

/// 发送事件；接收方已关闭时静默丢弃
pub(crate) fn emit(events: Option<&EventSender>, event: AgentEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
