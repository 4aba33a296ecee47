//! 记忆层：推理消息格式与可选的记忆存储

pub mod message;
pub mod store;

pub use message::{Message, Role};
pub use store::{InMemoryStore, MemoryEntry, MemoryStore, NoopMemory};
