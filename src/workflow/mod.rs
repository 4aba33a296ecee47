//! 工作流：计划数据模型、依赖图、计划构建与执行

pub mod builder;
pub mod engine;
pub mod graph;
pub mod types;

pub use builder::{PlanBuilder, DEGRADED_CONFIDENCE};
pub use engine::WorkflowExecutor;
pub use graph::{Frontier, WorkflowGraph};
pub use types::*;
