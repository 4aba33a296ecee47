//! LLM 层：推理能力抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod factory;
pub mod mock;
pub mod openai;
pub mod traits;

pub use factory::{create_llm_from_config, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::{is_plan_request, is_synthesis_request, FnLlmClient, MockLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{complete_with_timeout, LlmClient, LlmError};
