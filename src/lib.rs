//! Colony - 多智能体工作流编排引擎
//!
//! 模块划分：
//! - **agent**: Planner、Synthesizer、推理记录、角色配置、进度事件与单 Agent 运行
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **coordinator**: 多 Agent 协调（顺序 / 并行 / 协作）
//! - **core**: 错误类型、恢复策略、并发调度与退避
//! - **llm**: 推理能力抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 消息格式与可选的记忆存储
//! - **observability**: tracing 初始化
//! - **tools**: 工具 trait、注册表、schema 校验与执行器
//! - **workflow**: 计划、依赖图与工作流执行引擎

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;
pub mod workflow;

pub use agent::{Agent, AgentResult};
pub use coordinator::{AgentCoordinator, CoordinationResult, Topology};
pub use core::EngineError;
