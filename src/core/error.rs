//! 引擎错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 EngineError 决定 Retry / Fallback / Abort。
//! 步骤级错误在 WorkflowExecutor 边界内记录到 Ledger，不会向上抛出。

use thiserror::Error;

use crate::llm::LlmError;

/// 引擎运行过程中可能出现的错误（校验、工具、超时、推理能力不可用等）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 计划或工具输入不合法：从不重试，总是触发降级
    #[error("Validation error: {0}")]
    Validation(String),

    /// 工具自身报告失败：按步骤策略重试
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    /// 工具超时：与 ToolExecution 同等对待
    #[error("Tool timeout: {tool} after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    /// 外部推理能力不可达或返回了无法解析的结构
    #[error("Reasoning unavailable: {0}")]
    ReasoningUnavailable(String),

    #[error("Cyclic dependency detected at step '{0}'")]
    CyclicPlan(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),
}

impl EngineError {
    /// 是否为计划结构错误（环、引用不存在的步骤等），需要上报给 Coordinator
    pub fn is_structural(&self) -> bool {
        matches!(self, EngineError::CyclicPlan(_))
    }
}

impl From<LlmError> for EngineError {
    fn from(err: LlmError) -> Self {
        EngineError::ReasoningUnavailable(err.to_string())
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 在重试预算内再次执行
    Retry,
    /// 放弃当前路径，走降级（重新生成计划 / 兜底计划 / 兜底综合）
    Fallback,
    /// 终止当前单元（取消、配置错误）
    Abort,
}
