//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `COLONY__*` 覆盖（双下划线表示嵌套，如 `COLONY__LLM__PROVIDER=openai`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::agent::{AgentProfile, PlannerConfig, PlanningConstraints};
use crate::coordinator::CoordinatorConfig;
use crate::core::{BackoffPolicy, TaskScheduler};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub planner: PlannerSection,
    pub executor: ExecutorSection,
    pub coordinator: CoordinatorSection,
    pub memory: MemorySection,
    /// [[agents]]：为空时使用默认三角色
    pub agents: Vec<AgentProfile>,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：mock / openai / deepseek；缺少 API Key 时退回 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "mock".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次推理请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [planner] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    /// 提议生成总次数（首次 + 重试）
    pub max_proposal_attempts: u32,
    pub max_steps: usize,
    pub default_step_timeout_secs: u64,
    /// 提议中单步超时的上限（秒）
    pub max_step_timeout_secs: u64,
    pub default_max_retries: u32,
    /// 提议中单步重试次数的上限
    pub max_retries_cap: u32,
    /// 注入 prompt 的记忆条数
    pub memory_limit: usize,
    pub fallback_tool: Option<String>,
    pub fallback_confidence: f64,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            max_proposal_attempts: 2,
            max_steps: 8,
            default_step_timeout_secs: 30,
            max_step_timeout_secs: 300,
            default_max_retries: 2,
            max_retries_cap: 5,
            memory_limit: 3,
            fallback_tool: None,
            fallback_confidence: 0.3,
        }
    }
}

/// [executor] 段：并发上限与指数退避
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub max_concurrency: usize,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 5000,
        }
    }
}

/// [coordinator] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorSection {
    pub collaborative_rounds: usize,
    /// 单个 Agent 运行上限（秒）
    pub agent_timeout_secs: u64,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            collaborative_rounds: 3,
            agent_timeout_secs: 300,
        }
    }
}

/// [memory] 段：进程内记忆（仅用于丰富规划上下文）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeouts.request.max(1))
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_proposal_attempts: self.planner.max_proposal_attempts.max(1),
            memory_limit: self.planner.memory_limit,
            fallback_tool: self.planner.fallback_tool.clone(),
            request_timeout: self.request_timeout(),
            max_retries_cap: self.planner.max_retries_cap,
            fallback_confidence: self.planner.fallback_confidence.clamp(0.0, 1.0),
        }
    }

    pub fn planning_constraints(&self) -> PlanningConstraints {
        PlanningConstraints {
            max_steps: self.planner.max_steps.max(1),
            default_step_timeout: Duration::from_secs(self.planner.default_step_timeout_secs.max(1)),
            max_step_timeout: Duration::from_secs(self.planner.max_step_timeout_secs.max(1)),
            default_max_retries: self.planner.default_max_retries,
        }
    }

    /// 共享的调度器：所有 Agent 共用同一并发许可
    pub fn scheduler(&self) -> TaskScheduler {
        TaskScheduler::new(self.executor.max_concurrency).with_backoff(BackoffPolicy::new(
            Duration::from_millis(self.executor.retry_base_delay_ms),
            Duration::from_millis(self.executor.retry_max_delay_ms),
        ))
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            collaborative_rounds: self.coordinator.collaborative_rounds.max(1),
            agent_timeout: Duration::from_secs(self.coordinator.agent_timeout_secs.max(1)),
        }
    }

    pub fn agent_profiles(&self) -> Vec<AgentProfile> {
        if self.agents.is_empty() {
            AgentProfile::defaults()
        } else {
            self.agents.clone()
        }
    }
}

/// 从 config 目录加载配置，环境变量 COLONY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 COLONY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, ignoring");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("COLONY")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 加载失败时退回默认配置
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    match load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.planner_config().max_proposal_attempts, 2);
        assert_eq!(cfg.scheduler().max_concurrent(), 3);
        assert_eq!(cfg.coordinator_config().collaborative_rounds, 3);
        assert_eq!(cfg.agent_profiles().len(), 3);
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[llm]
provider = "openai"
model = "gpt-4o"

[planner]
max_proposal_attempts = 4
fallback_tool = "search"
max_step_timeout_secs = 90
max_retries_cap = 1
fallback_confidence = 0.2

[executor]
max_concurrency = 7

[coordinator]
collaborative_rounds = 5

[[agents]]
role = "drafter"
instructions = "write"

[[agents]]
role = "critic"
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cfg.planner.max_proposal_attempts, 4);
        assert_eq!(cfg.planner.fallback_tool.as_deref(), Some("search"));
        assert_eq!(cfg.planning_constraints().max_step_timeout, Duration::from_secs(90));
        assert_eq!(cfg.planner_config().max_retries_cap, 1);
        assert_eq!(cfg.planner_config().fallback_confidence, 0.2);
        assert_eq!(cfg.scheduler().max_concurrent(), 7);
        assert_eq!(cfg.coordinator_config().collaborative_rounds, 5);
        let roles: Vec<String> = cfg.agent_profiles().into_iter().map(|p| p.role).collect();
        assert_eq!(roles, vec!["drafter", "critic"]);
    }
}
