//! 核心层：错误与恢复、并发调度

pub mod error;
pub mod recovery;
pub mod task_scheduler;

pub use error::{EngineError, RecoveryAction};
pub use recovery::RecoveryEngine;
pub use task_scheduler::{BackoffPolicy, TaskScheduler};
