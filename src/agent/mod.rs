//! Agent 层：推理记录、规划、综合、角色配置、进度事件与单 Agent 运行

pub mod events;
pub mod planner;
pub mod profile;
pub mod runner;
pub mod scoring;
pub mod synthesizer;
pub mod thought;

pub use events::{AgentEvent, EventSender};
pub use planner::{
    parse_proposal, PlanProposal, Planner, PlannerConfig, PlanningConstraints, PLAN_REQUEST_TAG,
};
pub use profile::AgentProfile;
pub use runner::{Agent, AgentResult};
pub use scoring::{extract_key_points, mean_confidence, output_confidence};
pub use synthesizer::{fallback_text, Synthesis, Synthesizer, SYNTHESIS_REQUEST_TAG};
pub use thought::{ReasoningKind, ThoughtLog, ThoughtRecord};
