//! Agent：Planner -> WorkflowExecutor -> Synthesizer 三段式，针对单个目标产出 AgentResult

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::agent::events::{emit, AgentEvent, EventSender};
use crate::agent::planner::{Planner, PlannerConfig, PlanningConstraints};
use crate::agent::profile::AgentProfile;
use crate::agent::scoring::{extract_key_points, output_confidence};
use crate::agent::synthesizer::Synthesizer;
use crate::core::TaskScheduler;
use crate::llm::LlmClient;
use crate::memory::{MemoryEntry, MemoryStore, NoopMemory};
use crate::tools::ToolRegistry;
use crate::workflow::{Ledger, Plan, StepStatus, WorkflowExecutor};

/// 兜底综合时的置信度上限
pub const FALLBACK_SYNTHESIS_CONFIDENCE_CAP: f64 = 0.5;

/// 单个 Agent 的运行结果，产出后不再修改
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub role: String,
    pub goal: String,
    pub plan: Option<Plan>,
    pub ledger: Ledger,
    pub text: String,
    pub confidence: f64,
    pub key_points: Vec<String>,
    pub duration: Duration,
    pub success: bool,
    pub synthesis_fallback: bool,
    pub error: Option<String>,
}

impl AgentResult {
    /// 未能运行完成（超时、取消）时的结果，附带说明文本
    pub fn failed(role: &str, goal: &str, reason: impl Into<String>, duration: Duration) -> Self {
        let reason = reason.into();
        Self {
            role: role.to_string(),
            goal: goal.to_string(),
            plan: None,
            ledger: Ledger::new("none", Vec::new()),
            text: format!("Agent '{role}' produced no result: {reason}"),
            confidence: 0.0,
            key_points: Vec::new(),
            duration,
            success: false,
            synthesis_fallback: true,
            error: Some(reason),
        }
    }
}

pub struct Agent {
    profile: AgentProfile,
    llm: Arc<dyn LlmClient>,
    planner: Planner,
    executor: WorkflowExecutor,
    synthesizer: Synthesizer,
    memory: Arc<dyn MemoryStore>,
    constraints: PlanningConstraints,
}

impl Agent {
    /// 注册表中缺少 direct_answer 时自动补上，保证兜底计划可执行
    pub fn new(
        profile: AgentProfile,
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        scheduler: TaskScheduler,
        planner_config: PlannerConfig,
    ) -> Self {
        let request_timeout = planner_config.request_timeout;
        let planner = Planner::new(llm.clone(), profile.clone(), planner_config);
        let registry = planner.with_direct_answer(registry);
        Self {
            planner,
            executor: WorkflowExecutor::new(registry, scheduler),
            synthesizer: Synthesizer::new(llm.clone(), profile.clone(), request_timeout),
            llm,
            memory: Arc::new(NoopMemory),
            constraints: PlanningConstraints::default(),
            profile,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.planner = self.planner.with_memory(memory.clone());
        self.memory = memory;
        self
    }

    pub fn with_constraints(mut self, constraints: PlanningConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn role(&self) -> &str {
        &self.profile.role
    }

    /// 规划、执行、综合；总是返回结果，失败时 success = false 并附说明
    pub async fn run(&self, goal: &str, cancel: &CancellationToken, events: Option<&EventSender>) -> AgentResult {
        let start = Instant::now();
        let role = self.profile.role.clone();
        tracing::info!(role = %role, goal = %preview(goal, 120), "agent started");

        let plan = match self
            .planner
            .create_plan(goal, self.executor.registry(), &self.constraints, cancel)
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(role = %role, error = %e, "planning failed without a fallback");
                let result = AgentResult::failed(&role, goal, e.to_string(), start.elapsed());
                emit(
                    events,
                    AgentEvent::AgentFinished {
                        role,
                        success: false,
                        confidence: 0.0,
                        duration_ms: result.duration.as_millis() as u64,
                    },
                );
                return result;
            }
        };
        emit(
            events,
            AgentEvent::PlanCreated {
                role: role.clone(),
                plan_id: plan.id().to_string(),
                steps: plan.steps().len(),
                confidence: plan.confidence(),
                degraded: plan.is_degraded(),
            },
        );

        let ledger = self.executor.execute(&plan, cancel, events).await;
        let synthesis = self.synthesizer.synthesize(goal, &ledger, cancel).await;
        emit(
            events,
            AgentEvent::SynthesisFinished {
                role: role.clone(),
                fallback: synthesis.fallback,
            },
        );

        let key_points = extract_key_points(&synthesis.text);
        let output_conf = output_confidence(&synthesis.text, key_points.len());
        let mut confidence = ledger.success_ratio() * (plan.confidence() + output_conf) / 2.0;
        if synthesis.fallback {
            confidence = confidence.min(FALLBACK_SYNTHESIS_CONFIDENCE_CAP);
        }

        let success = ledger.is_success() && !ledger.is_cancelled();
        let error = if let Some(reason) = ledger.structural_error() {
            Some(reason.to_string())
        } else if ledger.is_cancelled() {
            Some("cancelled".to_string())
        } else if !success {
            Some(format!(
                "no step succeeded ({} failed, {} skipped)",
                ledger.count(StepStatus::Failed),
                ledger.count(StepStatus::Skipped)
            ))
        } else {
            None
        };

        if self.memory.enabled() {
            let summary = synthesis.text.lines().next().unwrap_or_default();
            self.memory.store(MemoryEntry::new(
                role.clone(),
                format!(
                    "goal: {} | success: {success} | {}",
                    preview(goal, 160),
                    preview(summary, 200)
                ),
            ));
        }

        let duration = start.elapsed();
        let (prompt_tokens, completion_tokens, total_tokens) = self.llm.token_usage();
        tracing::info!(
            role = %role,
            success,
            confidence,
            duration_ms = duration.as_millis() as u64,
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "agent finished"
        );
        emit(
            events,
            AgentEvent::AgentFinished {
                role: role.clone(),
                success,
                confidence,
                duration_ms: duration.as_millis() as u64,
            },
        );

        AgentResult {
            role,
            goal: goal.to_string(),
            plan: Some(plan),
            ledger,
            text: synthesis.text,
            confidence,
            key_points,
            duration,
            success,
            synthesis_fallback: synthesis.fallback,
            error,
        }
    }
}

/// 按字符截断，用于日志与记忆摘要
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
