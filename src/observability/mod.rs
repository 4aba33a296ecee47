//! 可观测性：tracing 订阅器初始化（仅由二进制入口调用）

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认 info 级别，可用 RUST_LOG 覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
