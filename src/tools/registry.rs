//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! 注册完成后注册表以 Arc 只读共享给所有并发执行，名称唯一且注册后不可变。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::EngineError;
use crate::tools::schema::validate_value_against_schema;

/// 工具描述：名称、说明、声明的输入 schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// 工具 trait：名称、描述（供推理能力理解）、参数 schema、异步执行（输入输出均为 JSON）
///
/// 执行必须可以在任意 await 点被安全丢弃（调用方超时或取消时会直接 drop future）；
/// 工具不被假定为幂等，执行器不会对重试去重。
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认接受任意对象
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具已存在时返回 Validation 错误
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), EngineError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), EngineError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(EngineError::Validation("tool name must not be empty".to_string()));
        }
        if self.tools.contains_key(&name) {
            return Err(EngineError::Validation(format!(
                "tool '{name}' is already registered"
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 按名称排序，保证 prompt 内容稳定
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// 校验工具存在且输入满足其声明的 schema
    pub fn validate_input(&self, name: &str, input: &Value) -> Result<(), EngineError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| EngineError::Validation(format!("unknown tool '{name}'")))?;
        validate_value_against_schema(input, &tool.parameters_schema(), "$").map_err(|reason| {
            EngineError::Validation(format!("input for tool '{name}' rejected: {reason}"))
        })
    }

    /// 生成供 prompt 使用的工具清单 JSON
    pub fn to_schema_json(&self) -> String {
        serde_json::to_string_pretty(&self.specs()).unwrap_or_else(|_| "[]".to_string())
    }
}
