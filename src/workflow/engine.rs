//! 工作流执行引擎
//!
//! 反复计算就绪前沿，把所有就绪步骤并发派发（受 TaskScheduler 的并发许可约束），
//! 每个步骤在自身超时内执行并按策略重试；Ledger 只在本循环中写入。
//! 步骤级错误全部记录在 Ledger 中，不会抛出；取消时丢弃运行中的步骤并把未结束步骤记为 Skipped。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::agent::events::{emit, AgentEvent, EventSender};
use crate::core::{EngineError, RecoveryEngine, TaskScheduler};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::*;

type StepFuture = Pin<Box<dyn Future<Output = StepOutcome> + Send>>;
/// 运行中的步骤向执行循环报告状态迁移（Running / FailedRetrying）
type ProgressSender = UnboundedSender<(StepId, StepState)>;

/// 执行循环独占的步骤状态表，只接受合法迁移
#[derive(Debug)]
struct StateTable {
    states: HashMap<StepId, StepState>,
}

impl StateTable {
    fn new(steps: &[PlanStep]) -> Self {
        Self {
            states: steps.iter().map(|s| (s.id.clone(), StepState::Pending)).collect(),
        }
    }

    /// 非法迁移（如终态之后迟到的进度）被忽略
    fn advance(&mut self, id: &str, next: StepState) -> bool {
        match self.states.get_mut(id) {
            Some(state) if state.can_advance_to(next) => {
                *state = next;
                true
            }
            Some(state) => {
                tracing::debug!(step_id = %id, from = ?state, to = ?next, "state transition ignored");
                false
            }
            None => false,
        }
    }

    fn as_map(&self) -> &HashMap<StepId, StepState> {
        &self.states
    }
}

/// 工作流执行器：每次 execute 拥有一份独立的 Ledger，可被多个运行共享
#[derive(Clone)]
pub struct WorkflowExecutor {
    tools: ToolExecutor,
    scheduler: TaskScheduler,
    recovery: RecoveryEngine,
}

impl WorkflowExecutor {
    pub fn new(registry: Arc<ToolRegistry>, scheduler: TaskScheduler) -> Self {
        Self {
            tools: ToolExecutor::new(registry),
            scheduler,
            recovery: RecoveryEngine::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.tools.registry()
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// 执行计划直到所有步骤进入终态（或被取消），返回完整 Ledger
    pub async fn execute(
        &self,
        plan: &Plan,
        cancel: &CancellationToken,
        events: Option<&EventSender>,
    ) -> Ledger {
        let order: Vec<StepId> = plan.steps().iter().map(|s| s.id.clone()).collect();

        // Plan 定稿时已校验，这里复核以防结构错误进入调度
        let graph = match WorkflowGraph::build(plan.steps()) {
            Ok(graph) => graph,
            Err(e) => {
                tracing::error!(plan_id = %plan.id(), error = %e, "plan graph invalid, nothing executed");
                return Ledger::structural_failure(plan.id(), order, e.to_string());
            }
        };

        let mut ledger = Ledger::new(plan.id(), order.clone());
        let mut states = StateTable::new(plan.steps());
        let mut running: FuturesUnordered<StepFuture> = FuturesUnordered::new();
        let (progress_tx, mut progress_rx) = unbounded_channel::<(StepId, StepState)>();

        tracing::info!(plan_id = %plan.id(), steps = plan.steps().len(), "workflow started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let frontier = graph.frontier(states.as_map());

            if !frontier.blocked.is_empty() {
                for (step_id, failed_dep) in frontier.blocked {
                    let Some(step) = plan.step(&step_id) else { continue };
                    let reason = format!("dependency '{failed_dep}' did not succeed");
                    tracing::info!(step_id = %step_id, reason = %reason, "step skipped");
                    self.finish(&mut ledger, &mut states, StepOutcome::skipped(step, reason), events);
                }
                // 跳过可能级联，重新计算前沿
                continue;
            }

            for step_id in frontier.ready {
                let Some(step) = plan.step(&step_id) else { continue };
                states.advance(&step_id, StepState::Ready);
                running.push(Box::pin(run_step(
                    step.clone(),
                    self.tools.clone(),
                    self.scheduler.clone(),
                    self.recovery,
                    cancel.clone(),
                    events.cloned(),
                    progress_tx.clone(),
                )));
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some((step_id, state)) = progress_rx.recv() => {
                    states.advance(&step_id, state);
                }
                next = running.next() => {
                    if let Some(outcome) = next {
                        self.finish(&mut ledger, &mut states, outcome, events);
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            // 丢弃运行中的 future 即取消对应的工具调用
            drop(running);
            ledger.mark_cancelled();
            // 按拓扑序写入，保证依赖的结果先于下游写入
            let remaining = graph.topological_order().unwrap_or(order);
            for step_id in remaining {
                let Some(step) = plan.step(&step_id) else { continue };
                if !ledger.contains(&step.id) {
                    self.finish(&mut ledger, &mut states, StepOutcome::skipped(step, "cancelled"), events);
                }
            }
            tracing::warn!(plan_id = %plan.id(), "workflow cancelled");
        }

        tracing::info!(
            plan_id = %plan.id(),
            succeeded = ledger.count(StepStatus::Succeeded),
            failed = ledger.count(StepStatus::Failed),
            skipped = ledger.count(StepStatus::Skipped),
            "workflow finished"
        );
        ledger
    }

    fn finish(
        &self,
        ledger: &mut Ledger,
        states: &mut StateTable,
        outcome: StepOutcome,
        events: Option<&EventSender>,
    ) {
        states.advance(&outcome.step_id, outcome.status.into());
        emit(
            events,
            AgentEvent::StepFinished {
                step_id: outcome.step_id.clone(),
                status: outcome.status,
                attempts: outcome.attempts,
                duration_ms: outcome.duration.as_millis() as u64,
            },
        );
        if !ledger.record(outcome) {
            tracing::warn!("duplicate step outcome ignored");
        }
    }
}

/// 单步执行：获取并发许可后在超时内调用工具，失败时按恢复策略退避重试
async fn run_step(
    step: PlanStep,
    tools: ToolExecutor,
    scheduler: TaskScheduler,
    recovery: RecoveryEngine,
    cancel: CancellationToken,
    events: Option<EventSender>,
    progress: ProgressSender,
) -> StepOutcome {
    let start = Instant::now();

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return StepOutcome::skipped(&step, "cancelled"),
        permit = scheduler.acquire_step() => permit,
    };
    let _permit = match permit {
        Ok(p) => p,
        Err(e) => return StepOutcome::failed(&step, e.to_string(), 0, start.elapsed()),
    };

    tracing::info!(step_id = %step.id, tool = %step.tool, "step started");
    emit(
        events.as_ref(),
        AgentEvent::StepStarted {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
        },
    );

    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        let _ = progress.send((step.id.clone(), StepState::Running));
        let invocation = tools
            .invoke(&step.tool, step.input.clone(), step.timeout, &cancel)
            .await;

        let err = match invocation.result {
            Ok(output) => {
                tracing::info!(step_id = %step.id, attempts, "step succeeded");
                return StepOutcome::succeeded(&step, output, attempts, start.elapsed());
            }
            Err(EngineError::Cancelled) => return StepOutcome::skipped(&step, "cancelled"),
            Err(err) => err,
        };

        let retries_used = attempts - 1;
        if !recovery.should_retry(&err, retries_used, step.max_retries) {
            tracing::warn!(
                step_id = %step.id,
                attempts,
                error = %err,
                action = ?recovery.handle(&err),
                "step failed"
            );
            return StepOutcome::failed(&step, err.to_string(), attempts, start.elapsed());
        }

        let _ = progress.send((step.id.clone(), StepState::FailedRetrying));
        let delay = scheduler.backoff().delay_for(retries_used);
        tracing::warn!(
            step_id = %step.id,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "step failed, retrying"
        );
        emit(
            events.as_ref(),
            AgentEvent::StepRetrying {
                step_id: step.id.clone(),
                attempt: attempts + 1,
                delay_ms: delay.as_millis() as u64,
                error: err.to_string(),
            },
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return StepOutcome::skipped(&step, "cancelled"),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
