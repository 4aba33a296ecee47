//! AgentCoordinator：按拓扑组合多个 Agent
//!
//! - Sequential：依次运行，后一个 Agent 的目标 = 原始任务 + 前一个的综合输出
//! - Parallel：每个 Agent 在独立任务中运行，子目标按角色改写；失败互相隔离，全部结束后合并
//! - Collaborative：固定轮数，第 r 轮由第 (r-1) mod N 个 Agent 执行；首轮起草、中间轮评审、末轮修订
//!
//! 每个 Agent 受 agent_timeout 约束；协调层从不抛错，总是返回带说明文本的 CoordinationResult。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::agent::events::{emit, AgentEvent, EventSender};
use crate::agent::{mean_confidence, Agent, AgentResult};
use crate::coordinator::types::{CoordinationEntry, CoordinationResult, Topology};

/// 协调参数
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// 协作拓扑的轮数
    pub collaborative_rounds: usize,
    /// 单个 Agent 运行上限
    pub agent_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            collaborative_rounds: 3,
            agent_timeout: Duration::from_secs(300),
        }
    }
}

pub struct AgentCoordinator {
    agents: Vec<Arc<Agent>>,
    config: CoordinatorConfig,
    events: Option<EventSender>,
}

impl AgentCoordinator {
    pub fn new(agents: Vec<Agent>, config: CoordinatorConfig) -> Self {
        Self {
            agents: agents.into_iter().map(Arc::new).collect(),
            config,
            events: None,
        }
    }

    /// 接收运行过程事件
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn roles(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.role()).collect()
    }

    pub async fn run(&self, goal: &str, topology: Topology, cancel: &CancellationToken) -> CoordinationResult {
        let start = Instant::now();
        tracing::info!(%topology, agents = self.agents.len(), "coordination started");

        if self.agents.is_empty() {
            tracing::warn!("coordination requested with no agents");
            return self.finish(topology, Vec::new(), "No agents are configured; nothing was run.".to_string(), cancel, start);
        }

        let (entries, final_text) = match topology {
            Topology::Sequential => self.run_sequential(goal, cancel).await,
            Topology::Parallel => self.run_parallel(goal, cancel).await,
            Topology::Collaborative => self.run_collaborative(goal, cancel).await,
        };
        self.finish(topology, entries, final_text, cancel, start)
    }

    fn finish(
        &self,
        topology: Topology,
        entries: Vec<CoordinationEntry>,
        final_text: String,
        cancel: &CancellationToken,
        start: Instant,
    ) -> CoordinationResult {
        let success = entries.iter().any(|e| e.result.success);
        let confidences: Vec<f64> = entries.iter().map(|e| e.result.confidence).collect();
        let confidence = mean_confidence(&confidences);
        let duration = start.elapsed();
        tracing::info!(
            %topology,
            success,
            confidence,
            entries = entries.len(),
            duration_ms = duration.as_millis() as u64,
            "coordination finished"
        );
        CoordinationResult {
            topology,
            entries,
            final_text,
            success,
            confidence,
            cancelled: cancel.is_cancelled(),
            duration,
        }
    }

    async fn run_sequential(&self, task: &str, cancel: &CancellationToken) -> (Vec<CoordinationEntry>, String) {
        let total = self.agents.len();
        let mut entries: Vec<CoordinationEntry> = Vec::with_capacity(total);

        for (idx, agent) in self.agents.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(remaining = total - idx, "sequential coordination cancelled");
                break;
            }
            let goal = match entries.last() {
                None => task.to_string(),
                Some(prev) => format!(
                    "{task}\n\nPrevious result from '{}':\n{}",
                    prev.role, prev.result.text
                ),
            };
            let result = self.run_agent(agent, &goal, cancel).await;
            entries.push(CoordinationEntry {
                round: idx + 1,
                role: agent.role().to_string(),
                result,
            });
            self.progress(Topology::Sequential, entries.len(), total);
        }

        let final_text = entries
            .iter()
            .rev()
            .find(|e| e.result.success)
            .map(|e| e.result.text.clone())
            .unwrap_or_else(|| explain_failure(&entries, cancel));
        (entries, final_text)
    }

    async fn run_parallel(&self, task: &str, cancel: &CancellationToken) -> (Vec<CoordinationEntry>, String) {
        let total = self.agents.len();
        let scope = cancel.child_token();
        // 协调 future 被丢弃时停止仍在运行的 Agent
        let _guard = scope.clone().drop_guard();

        let mut pending = FuturesUnordered::new();
        for (idx, agent) in self.agents.iter().enumerate() {
            let role = agent.role().to_string();
            let goal = parallel_goal(task, agent);
            let agent = Arc::clone(agent);
            let agent_goal = goal.clone();
            let token = scope.child_token();
            let events = self.events.clone();
            let limit = self.config.agent_timeout;
            let handle = tokio::spawn(async move {
                run_with_timeout(&agent, &agent_goal, &token, events.as_ref(), limit).await
            });
            pending.push(async move { (idx, role, goal, handle.await) });
        }

        let mut slots: Vec<Option<CoordinationEntry>> = (0..total).map(|_| None).collect();
        let mut completed = 0;
        while let Some((idx, role, goal, joined)) = pending.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(role = %role, error = %e, "agent task aborted");
                    AgentResult::failed(&role, &goal, format!("agent task aborted: {e}"), Duration::ZERO)
                }
            };
            completed += 1;
            self.progress(Topology::Parallel, completed, total);
            slots[idx] = Some(CoordinationEntry {
                round: 1,
                role,
                result,
            });
        }

        let entries: Vec<CoordinationEntry> = slots.into_iter().flatten().collect();
        let final_text = merge_parallel(&entries, cancel);
        (entries, final_text)
    }

    async fn run_collaborative(&self, task: &str, cancel: &CancellationToken) -> (Vec<CoordinationEntry>, String) {
        let rounds = self.config.collaborative_rounds.max(1);
        let mut entries: Vec<CoordinationEntry> = Vec::with_capacity(rounds);
        let mut draft: Option<String> = None;
        let mut critiques: Vec<String> = Vec::new();

        for round in 1..=rounds {
            if cancel.is_cancelled() {
                tracing::warn!(round, "collaborative coordination cancelled");
                break;
            }
            let agent = &self.agents[(round - 1) % self.agents.len()];
            let stage = RoundStage::for_round(round, rounds);
            let goal = collaborative_goal(task, stage, draft.as_deref(), &critiques);
            tracing::info!(round, role = %agent.role(), stage = ?stage, "collaborative round");

            let result = self.run_agent(agent, &goal, cancel).await;
            if result.success {
                match stage {
                    RoundStage::Draft | RoundStage::Revise => draft = Some(result.text.clone()),
                    RoundStage::Critique => critiques.push(result.text.clone()),
                }
            }
            entries.push(CoordinationEntry {
                round,
                role: agent.role().to_string(),
                result,
            });
            self.progress(Topology::Collaborative, round, rounds);
        }

        let final_text = draft.unwrap_or_else(|| explain_failure(&entries, cancel));
        (entries, final_text)
    }

    async fn run_agent(&self, agent: &Agent, goal: &str, cancel: &CancellationToken) -> AgentResult {
        run_with_timeout(agent, goal, cancel, self.events.as_ref(), self.config.agent_timeout).await
    }

    fn progress(&self, topology: Topology, completed: usize, total: usize) {
        emit(
            self.events.as_ref(),
            AgentEvent::CoordinationProgress {
                topology: topology.to_string(),
                completed,
                total,
            },
        );
    }
}

async fn run_with_timeout(
    agent: &Agent,
    goal: &str,
    cancel: &CancellationToken,
    events: Option<&EventSender>,
    limit: Duration,
) -> AgentResult {
    let start = Instant::now();
    match tokio::time::timeout(limit, agent.run(goal, cancel, events)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(role = %agent.role(), timeout_secs = limit.as_secs(), "agent timed out");
            AgentResult::failed(
                agent.role(),
                goal,
                format!("timed out after {}s", limit.as_secs_f64()),
                start.elapsed(),
            )
        }
    }
}

/// 协作轮次的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundStage {
    Draft,
    Critique,
    Revise,
}

impl RoundStage {
    fn for_round(round: usize, rounds: usize) -> Self {
        if round == 1 {
            RoundStage::Draft
        } else if round == rounds {
            RoundStage::Revise
        } else {
            RoundStage::Critique
        }
    }
}

fn collaborative_goal(task: &str, stage: RoundStage, draft: Option<&str>, critiques: &[String]) -> String {
    let draft = draft.unwrap_or("(no draft was produced yet)");
    match stage {
        RoundStage::Draft => format!("{task}\n\nProduce a first draft."),
        RoundStage::Critique => format!(
            "{task}\n\nCritique the draft below. List concrete problems and improvements as numbered points.\n\nDraft:\n{draft}"
        ),
        RoundStage::Revise if critiques.is_empty() => {
            format!("{task}\n\nRevise and improve the draft below.\n\nDraft:\n{draft}")
        }
        RoundStage::Revise => format!(
            "{task}\n\nRevise the draft below using the critique.\n\nDraft:\n{draft}\n\nCritique:\n{}",
            critiques.join("\n\n")
        ),
    }
}

fn parallel_goal(task: &str, agent: &Agent) -> String {
    let profile = agent.profile();
    if profile.description.trim().is_empty() {
        format!("{task}\n\nAddress this from the perspective of the '{}' role.", profile.role)
    } else {
        format!(
            "{task}\n\nAddress this from the perspective of the '{}' role: {}",
            profile.role,
            profile.description.trim()
        )
    }
}

fn merge_parallel(entries: &[CoordinationEntry], cancel: &CancellationToken) -> String {
    if !entries.iter().any(|e| e.result.success) {
        return explain_failure(entries, cancel);
    }
    entries
        .iter()
        .map(|e| {
            if e.result.success {
                format!("## {}\n{}", e.role, e.result.text)
            } else {
                format!(
                    "## {} (failed)\n{}",
                    e.role,
                    e.result.error.as_deref().unwrap_or("no result")
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn explain_failure(entries: &[CoordinationEntry], cancel: &CancellationToken) -> String {
    let mut text = if cancel.is_cancelled() {
        "Coordination was cancelled before any agent succeeded.".to_string()
    } else {
        "No agent succeeded.".to_string()
    };
    for e in entries {
        text.push_str(&format!(
            "\n- round {} '{}': {}",
            e.round,
            e.role,
            e.result.error.as_deref().unwrap_or("failed")
        ));
    }
    text
}
