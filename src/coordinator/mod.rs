//! 多 Agent 协调：顺序、并行、协作三种拓扑

pub mod engine;
pub mod types;

pub use engine::{AgentCoordinator, CoordinatorConfig};
pub use types::{CoordinationEntry, CoordinationResult, Topology};
