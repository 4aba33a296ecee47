//! 工具执行器
//!
//! 持有共享的 ToolRegistry，invoke(tool_name, args, timeout, cancel) 先按 schema 校验输入，
//! 再在超时内执行；超时、取消或失败时转为 EngineError（Timeout / Cancelled / ToolExecution）。
//! 每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::EngineError;
use crate::tools::{Tool, ToolRegistry};

/// 一次工具调用的结果与耗时
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub result: Result<Value, EngineError>,
    pub duration: Duration,
}

/// 工具执行器：对每次调用施加超时与取消，并将结果映射为 EngineError
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// 执行指定工具。输入不满足 schema 时不会调用工具；超时或取消时直接丢弃执行中的 future
    pub async fn invoke(
        &self,
        tool_name: &str,
        args: Value,
        limit: Duration,
        cancel: &CancellationToken,
    ) -> ToolInvocation {
        let start = Instant::now();
        let preview = args_preview(&args);

        let result = match self.lookup(tool_name, &args) {
            Err(e) => Err(e),
            Ok(tool) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(EngineError::Cancelled),
                    res = timeout(limit, tool.execute(args)) => match res {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) => Err(EngineError::ToolExecution(e)),
                        Err(_) => Err(EngineError::Timeout {
                            tool: tool_name.to_string(),
                            timeout_ms: limit.as_millis() as u64,
                        }),
                    },
                }
            }
        };

        let duration = start.elapsed();
        let outcome = match &result {
            Ok(_) => "ok",
            Err(EngineError::Timeout { .. }) => "timeout",
            Err(EngineError::Cancelled) => "cancelled",
            Err(EngineError::Validation(_)) => "invalid",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": duration.as_millis() as u64,
            "args_preview": preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        ToolInvocation { result, duration }
    }

    fn lookup(&self, tool_name: &str, args: &Value) -> Result<Arc<dyn Tool>, EngineError> {
        self.registry.validate_input(tool_name, args)?;
        self.registry
            .get(tool_name)
            .ok_or_else(|| EngineError::Validation(format!("unknown tool '{tool_name}'")))
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;
    use async_trait::async_trait;
    use serde_json::json;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps"
        }
        async fn execute(&self, _args: Value) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        registry.register(SlowTool).unwrap();
        ToolExecutor::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_invoke_ok() {
        let inv = executor()
            .invoke("echo", json!({"text": "hi"}), Duration::from_secs(1), &CancellationToken::new())
            .await;
        assert_eq!(inv.result.unwrap(), json!("hi"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_validation_error() {
        let inv = executor()
            .invoke("echo", json!({}), Duration::from_secs(1), &CancellationToken::new())
            .await;
        assert!(matches!(inv.result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let inv = executor()
            .invoke("slow", json!({}), Duration::from_millis(20), &CancellationToken::new())
            .await;
        assert!(matches!(inv.result, Err(EngineError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_cancel_mid_flight() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            child.cancel();
        });
        let inv = executor()
            .invoke("slow", json!({}), Duration::from_secs(10), &token)
            .await;
        assert_eq!(inv.result.unwrap_err(), EngineError::Cancelled);
        assert!(inv.duration < Duration::from_secs(5));
    }
}
