//! 错误恢复引擎
//!
//! 根据 EngineError 类型返回 RecoveryAction，供执行器决定是重试、降级还是终止。

use crate::core::{EngineError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作（重试 / 降级 / 终止）
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &EngineError) -> RecoveryAction {
        match err {
            EngineError::ToolExecution(_) | EngineError::Timeout { .. } => RecoveryAction::Retry,
            EngineError::Validation(_)
            | EngineError::ReasoningUnavailable(_)
            | EngineError::CyclicPlan(_) => RecoveryAction::Fallback,
            EngineError::Cancelled | EngineError::Config(_) => RecoveryAction::Abort,
        }
    }

    /// 在剩余重试预算下是否应再试一次
    pub fn should_retry(&self, err: &EngineError, retries_used: u32, max_retries: u32) -> bool {
        self.handle(err) == RecoveryAction::Retry && retries_used < max_retries
    }
}
