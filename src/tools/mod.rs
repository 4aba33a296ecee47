pub mod direct_answer;
pub mod echo;
pub mod executor;
pub mod registry;
pub mod schema;

pub use direct_answer::{DirectAnswerTool, DIRECT_ANSWER_TOOL};
pub use echo::EchoTool;
pub use executor::{ToolExecutor, ToolInvocation};
pub use registry::{Tool, ToolRegistry, ToolSpec};
pub use schema::{json_schema_for, validate_value_against_schema};
