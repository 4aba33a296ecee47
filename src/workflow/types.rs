//! 工作流类型定义
//!
//! 计划（Plan）、计划步骤（PlanStep）、步骤状态与执行结果（StepOutcome / Ledger）

use std::collections::HashMap;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::thought::ThoughtRecord;

pub type PlanId = String;
pub type StepId = String;

/// 默认单步超时
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);
/// 默认重试次数（首次执行之外）
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// 依赖失败时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// 任一依赖未成功则跳过本步骤
    #[default]
    Block,
    /// 依赖全部结束即可执行，不论成败
    Proceed,
}

/// 计划中的一步：一次工具调用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub id: StepId,
    pub tool: String,
    pub input: Value,
    pub depends_on: Vec<StepId>,
    pub timeout: Duration,
    /// 首次执行之外最多重试的次数
    pub max_retries: u32,
    pub on_dependency_failure: DependencyPolicy,
}

impl PlanStep {
    pub fn new(id: impl Into<StepId>, tool: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            input,
            depends_on: Vec::new(),
            timeout: DEFAULT_STEP_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            on_dependency_failure: DependencyPolicy::Block,
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepId>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn proceed_on_failure(mut self) -> Self {
        self.on_dependency_failure = DependencyPolicy::Proceed;
        self
    }
}

/// 已定稿的计划：只能由 PlanBuilder 生成，执行期间只读
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub(crate) id: PlanId,
    pub(crate) goal: String,
    pub(crate) success_criteria: Vec<String>,
    pub(crate) thoughts: Vec<ThoughtRecord>,
    pub(crate) steps: Vec<PlanStep>,
    pub(crate) confidence: f64,
    pub(crate) risks: Vec<String>,
    pub(crate) degraded: bool,
}

impl Plan {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn success_criteria(&self) -> &[String] {
        &self.success_criteria
    }

    pub fn thoughts(&self) -> &[ThoughtRecord] {
        &self.thoughts
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn risks(&self) -> &[String] {
        &self.risks
    }

    /// 是否为降级计划（兜底计划或提议缺少置信度）
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// 执行期间的步骤状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    /// 等待依赖
    Pending,
    /// 依赖已满足，已派发
    Ready,
    Running,
    Succeeded,
    /// 失败，等待重试
    FailedRetrying,
    FailedTerminal,
    /// 依赖失败或运行被取消
    Skipped,
}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepState::Succeeded | StepState::FailedTerminal | StepState::Skipped
        )
    }

    /// 合法迁移：Pending -> Ready -> Running -> FailedRetrying -> Running ...；
    /// 任意非终态都可直接进入终态，终态不再变化
    pub fn can_advance_to(self, next: StepState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next.is_terminal() {
            return true;
        }
        matches!(
            (self, next),
            (StepState::Pending, StepState::Ready)
                | (StepState::Ready, StepState::Running)
                | (StepState::Running, StepState::FailedRetrying)
                | (StepState::FailedRetrying, StepState::Running)
        )
    }
}

/// 写入 Ledger 的最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl From<StepStatus> for StepState {
    fn from(status: StepStatus) -> Self {
        match status {
            StepStatus::Succeeded => StepState::Succeeded,
            StepStatus::Failed => StepState::FailedTerminal,
            StepStatus::Skipped => StepState::Skipped,
        }
    }
}

/// 单步最终结果：每步只写入一次
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step_id: StepId,
    pub tool: String,
    pub status: StepStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub duration: Duration,
    /// 实际执行次数（跳过的步骤为 0）
    pub attempts: u32,
}

impl StepOutcome {
    pub fn succeeded(step: &PlanStep, output: Value, attempts: u32, duration: Duration) -> Self {
        Self {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
            status: StepStatus::Succeeded,
            output: Some(output),
            error: None,
            duration,
            attempts,
        }
    }

    pub fn failed(step: &PlanStep, error: impl Into<String>, attempts: u32, duration: Duration) -> Self {
        Self {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
            status: StepStatus::Failed,
            output: None,
            error: Some(error.into()),
            duration,
            attempts,
        }
    }

    pub fn skipped(step: &PlanStep, reason: impl Into<String>) -> Self {
        Self {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
            status: StepStatus::Skipped,
            output: None,
            error: Some(reason.into()),
            duration: Duration::ZERO,
            attempts: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}

/// 一次计划执行的完整记录
#[derive(Debug, Clone, Serialize)]
pub struct Ledger {
    plan_id: PlanId,
    /// 计划中的步骤顺序
    step_order: Vec<StepId>,
    outcomes: HashMap<StepId, StepOutcome>,
    /// 结果写入顺序
    completion_order: Vec<StepId>,
    cancelled: bool,
    structural_error: Option<String>,
}

impl Ledger {
    pub fn new(plan_id: impl Into<PlanId>, step_order: Vec<StepId>) -> Self {
        Self {
            plan_id: plan_id.into(),
            step_order,
            outcomes: HashMap::new(),
            completion_order: Vec::new(),
            cancelled: false,
            structural_error: None,
        }
    }

    /// 计划结构错误（例如执行前复核发现环）时的空记录
    pub fn structural_failure(plan_id: impl Into<PlanId>, step_order: Vec<StepId>, reason: impl Into<String>) -> Self {
        let mut ledger = Self::new(plan_id, step_order);
        ledger.structural_error = Some(reason.into());
        ledger
    }

    /// 写入一步结果；同一步骤已有结果时忽略并返回 false
    pub fn record(&mut self, outcome: StepOutcome) -> bool {
        if self.outcomes.contains_key(&outcome.step_id) {
            return false;
        }
        self.completion_order.push(outcome.step_id.clone());
        self.outcomes.insert(outcome.step_id.clone(), outcome);
        true
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn get(&self, step_id: &str) -> Option<&StepOutcome> {
        self.outcomes.get(step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.outcomes.contains_key(step_id)
    }

    /// 按计划顺序遍历已有结果
    pub fn outcomes(&self) -> impl Iterator<Item = &StepOutcome> {
        self.step_order.iter().filter_map(|id| self.outcomes.get(id))
    }

    pub fn completion_order(&self) -> &[StepId] {
        &self.completion_order
    }

    pub fn succeeded(&self) -> Vec<&StepOutcome> {
        self.outcomes().filter(|o| o.is_success()).collect()
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.outcomes.values().filter(|o| o.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.step_order.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn structural_error(&self) -> Option<&str> {
        self.structural_error.as_deref()
    }

    /// 至少一步成功且没有结构错误
    pub fn is_success(&self) -> bool {
        self.structural_error.is_none() && self.count(StepStatus::Succeeded) > 0
    }

    /// 每一步都成功
    pub fn is_full_success(&self) -> bool {
        self.structural_error.is_none()
            && !self.step_order.is_empty()
            && self.count(StepStatus::Succeeded) == self.step_order.len()
    }

    /// 成功步骤占比；没有步骤时为 0
    pub fn success_ratio(&self) -> f64 {
        if self.step_order.is_empty() {
            return 0.0;
        }
        self.count(StepStatus::Succeeded) as f64 / self.step_order.len() as f64
    }
}
