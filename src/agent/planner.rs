//! Planner：把目标交给推理能力生成结构化计划
//!
//! 推理能力必须返回一份 JSON 文档（可包在一个 ```json 代码块中），按 PlanProposal 反序列化，
//! 再经 PlanBuilder 校验工具、输入 schema 与依赖图。解析或校验失败时带着错误原因重新生成，
//! 用完尝试次数后退化为单步兜底计划。规划失败从不向调用方抛错。

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::agent::profile::AgentProfile;
use crate::agent::thought::{ReasoningKind, ThoughtLog};
use crate::core::{EngineError, RecoveryAction, RecoveryEngine};
use crate::llm::{complete_with_timeout, LlmClient};
use crate::memory::{MemoryEntry, MemoryStore, Message, NoopMemory};
use crate::tools::{json_schema_for, DirectAnswerTool, ToolRegistry, DIRECT_ANSWER_TOOL};
use crate::workflow::{DependencyPolicy, Plan, PlanBuilder, PlanStep, DEFAULT_MAX_RETRIES, DEFAULT_STEP_TIMEOUT};

/// 规划请求的 system prompt 前缀
pub const PLAN_REQUEST_TAG: &str = "[plan-request]";

/// 推理能力返回的计划提议
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PlanProposal {
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub reasoning: Vec<ProposedThought>,
    pub steps: Vec<ProposedStep>,
    /// [0, 1]；缺失时视为降级规划
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProposedThought {
    pub category: ReasoningKind,
    pub rationale: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProposedStep {
    pub id: String,
    pub tool: String,
    /// 必须满足工具的 input_schema
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub on_dependency_failure: DependencyPolicy,
}

/// 单次规划的约束
#[derive(Debug, Clone)]
pub struct PlanningConstraints {
    pub max_steps: usize,
    pub default_step_timeout: Duration,
    /// 提议中单步超时的上限
    pub max_step_timeout: Duration,
    pub default_max_retries: u32,
}

impl Default for PlanningConstraints {
    fn default() -> Self {
        Self {
            max_steps: 8,
            default_step_timeout: DEFAULT_STEP_TIMEOUT,
            max_step_timeout: Duration::from_secs(300),
            default_max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Planner 策略参数
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// 提议生成总次数（首次 + 重试）
    pub max_proposal_attempts: u32,
    /// 注入 prompt 的记忆条数
    pub memory_limit: usize,
    /// 兜底计划优先使用的工具；需接受 {"goal": ...}
    pub fallback_tool: Option<String>,
    /// 单次推理请求超时
    pub request_timeout: Duration,
    /// 单步重试次数上限，提议给出的值会被截断到这里
    pub max_retries_cap: u32,
    /// 兜底计划的置信度
    pub fallback_confidence: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_proposal_attempts: 2,
            memory_limit: 3,
            fallback_tool: None,
            request_timeout: Duration::from_secs(60),
            max_retries_cap: 5,
            fallback_confidence: 0.3,
        }
    }
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    profile: AgentProfile,
    memory: Arc<dyn MemoryStore>,
    config: PlannerConfig,
    recovery: RecoveryEngine,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, profile: AgentProfile, config: PlannerConfig) -> Self {
        Self {
            llm,
            profile,
            memory: Arc::new(NoopMemory),
            config,
            recovery: RecoveryEngine::new(),
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = memory;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// 注册表缺少 direct_answer 时补上一个由本 Planner 的推理能力驱动的实例
    pub fn with_direct_answer(&self, registry: Arc<ToolRegistry>) -> Arc<ToolRegistry> {
        if registry.contains(DIRECT_ANSWER_TOOL) {
            return registry;
        }
        let mut extended = (*registry).clone();
        let tool = DirectAnswerTool::new(self.llm.clone())
            .with_instructions(self.profile.preamble())
            .with_timeout(self.config.request_timeout);
        if let Err(e) = extended.register(tool) {
            tracing::warn!(error = %e, "could not register direct_answer tool");
        }
        Arc::new(extended)
    }

    /// 生成计划；提议失败时退化为兜底计划。
    ///
    /// 只有注册表里没有任何工具接受 {"goal"} 输入、兜底计划也无法成立时才返回错误。
    pub async fn create_plan(
        &self,
        goal: &str,
        registry: &ToolRegistry,
        constraints: &PlanningConstraints,
        cancel: &CancellationToken,
    ) -> Result<Plan, EngineError> {
        let mut log = ThoughtLog::new();
        let memories = self.recall(goal);
        let mut feedback: Option<String> = None;
        let mut last_error = EngineError::ReasoningUnavailable("no proposal attempted".to_string());

        for attempt in 1..=self.config.max_proposal_attempts.max(1) {
            let messages = self.plan_messages(goal, registry, constraints, &memories, feedback.as_deref());
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(EngineError::Cancelled),
                res = complete_with_timeout(self.llm.as_ref(), &messages, self.config.request_timeout) => {
                    res.map_err(EngineError::from)
                }
            };

            let result = reply
                .and_then(|text| parse_proposal(&text))
                .and_then(|proposal| self.finalize(goal, proposal, registry, constraints, &log));

            match result {
                Ok(plan) => {
                    tracing::info!(
                        role = %self.profile.role,
                        plan_id = %plan.id(),
                        steps = plan.steps().len(),
                        confidence = plan.confidence(),
                        attempt,
                        "plan created"
                    );
                    return Ok(plan);
                }
                Err(e) => {
                    tracing::warn!(role = %self.profile.role, attempt, error = %e, "plan proposal rejected");
                    log.record(
                        ReasoningKind::Reflection,
                        format!("proposal attempt {attempt} rejected: {e}"),
                        0.2,
                    );
                    let action = self.recovery.handle(&e);
                    feedback = Some(e.to_string());
                    last_error = e;
                    if action == RecoveryAction::Abort {
                        break;
                    }
                }
            }
        }

        self.fallback_plan(goal, registry, constraints, log, &last_error)
    }

    fn recall(&self, goal: &str) -> Vec<MemoryEntry> {
        if !self.memory.enabled() || self.config.memory_limit == 0 {
            return Vec::new();
        }
        self.memory
            .retrieve_relevant(goal, Some(&self.profile.role), self.config.memory_limit)
    }

    fn plan_messages(
        &self,
        goal: &str,
        registry: &ToolRegistry,
        constraints: &PlanningConstraints,
        memories: &[MemoryEntry],
        feedback: Option<&str>,
    ) -> Vec<Message> {
        let system = format!(
            "{PLAN_REQUEST_TAG} {preamble}\n\n\
             Decompose the goal into tool steps. Respond with exactly one JSON document matching this schema and nothing else:\n\
             {schema}\n\n\
             Rules:\n\
             - Use only the available tools; each step input must satisfy that tool's input_schema.\n\
             - depends_on lists step ids of the same plan; the steps must form an acyclic graph.\n\
             - Use at most {max_steps} steps.\n\
             - reasoning categories: goal_analysis, strategy, tool_selection, synthesis, reflection.",
            preamble = self.profile.preamble(),
            schema = json_schema_for::<PlanProposal>(),
            max_steps = constraints.max_steps,
        );

        let mut user = format!("Goal: {goal}\n\nAvailable tools:\n{}\n", registry.to_schema_json());
        if !memories.is_empty() {
            user.push_str("\nRelevant memory:\n");
            for m in memories {
                user.push_str(&format!("- {}\n", m.content));
            }
        }
        if let Some(reason) = feedback {
            user.push_str(&format!(
                "\nYour previous proposal was rejected: {reason}\nReturn a corrected proposal.\n"
            ));
        }
        vec![Message::system(system), Message::user(user)]
    }

    /// 提议 -> 计划：检查步数，填充默认超时与重试，交给 PlanBuilder 校验
    fn finalize(
        &self,
        goal: &str,
        proposal: PlanProposal,
        registry: &ToolRegistry,
        constraints: &PlanningConstraints,
        log: &ThoughtLog,
    ) -> Result<Plan, EngineError> {
        if proposal.steps.is_empty() {
            return Err(EngineError::Validation("proposal has no steps".to_string()));
        }
        if proposal.steps.len() > constraints.max_steps {
            return Err(EngineError::Validation(format!(
                "proposal has {} steps, limit is {}",
                proposal.steps.len(),
                constraints.max_steps
            )));
        }

        let mut thoughts = log.clone();
        for t in &proposal.reasoning {
            thoughts.record(t.category, t.rationale.clone(), t.confidence.unwrap_or(0.5));
        }
        let tools: Vec<&str> = proposal.steps.iter().map(|s| s.tool.as_str()).collect();
        thoughts.record(
            ReasoningKind::ToolSelection,
            format!("selected tools: {}", tools.join(", ")),
            proposal.confidence.unwrap_or(0.5),
        );

        let steps = proposal
            .steps
            .into_iter()
            .map(|s| {
                let timeout = s
                    .timeout_secs
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .unwrap_or(constraints.default_step_timeout)
                    .min(constraints.max_step_timeout);
                let input = if s.input.is_null() { json!({}) } else { s.input };
                let mut step = PlanStep::new(s.id, s.tool, input)
                    .depends_on(s.depends_on)
                    .with_timeout(timeout)
                    .with_max_retries(
                        s.max_retries
                            .unwrap_or(constraints.default_max_retries)
                            .min(self.config.max_retries_cap),
                    );
                step.on_dependency_failure = s.on_dependency_failure;
                step
            })
            .collect();

        let mut builder = PlanBuilder::new(goal)
            .success_criteria(proposal.success_criteria)
            .thoughts(thoughts.into_records())
            .steps(steps)
            .risks(proposal.risks);
        if let Some(c) = proposal.confidence {
            builder = builder.confidence(c);
        }
        builder.build_for(registry)
    }

    /// 兜底计划：单步 {"goal"} 调用，工具依次取 fallback_tool、direct_answer、其余接受该输入的已注册工具
    fn fallback_plan(
        &self,
        goal: &str,
        registry: &ToolRegistry,
        constraints: &PlanningConstraints,
        mut log: ThoughtLog,
        reason: &EngineError,
    ) -> Result<Plan, EngineError> {
        let input = json!({ "goal": goal });
        let tool = self
            .fallback_tool_for(registry, &input)
            .ok_or_else(|| {
                tracing::error!(role = %self.profile.role, reason = %reason, "no tool can serve a fallback plan");
                EngineError::Validation(format!(
                    "planning failed ({reason}) and no registered tool accepts a goal input"
                ))
            })?;
        let confidence = self.config.fallback_confidence;
        log.record(
            ReasoningKind::Reflection,
            format!("planning degraded to a single '{tool}' step: {reason}"),
            confidence,
        );
        tracing::warn!(role = %self.profile.role, tool = %tool, reason = %reason, "using fallback plan");

        let step = PlanStep::new("fallback", tool, input)
            .with_timeout(constraints.default_step_timeout.min(constraints.max_step_timeout))
            .with_max_retries(constraints.default_max_retries.min(self.config.max_retries_cap));
        PlanBuilder::new(goal)
            .success_criterion("A direct answer to the goal is produced")
            .thoughts(log.into_records())
            .step(step)
            .confidence(confidence)
            .risk(format!("degraded planning: {reason}"))
            .degraded(true)
            .build_for(registry)
    }

    fn fallback_tool_for(&self, registry: &ToolRegistry, input: &Value) -> Option<String> {
        let preferred = self
            .config
            .fallback_tool
            .iter()
            .cloned()
            .chain(std::iter::once(DIRECT_ANSWER_TOOL.to_string()));
        preferred
            .chain(registry.specs().into_iter().map(|spec| spec.name))
            .find(|name| registry.validate_input(name, input).is_ok())
    }
}

/// 严格解析：整段文本（可去掉一层 ``` 代码块）必须是一份 JSON 文档
pub fn parse_proposal(text: &str) -> Result<PlanProposal, EngineError> {
    let body = strip_fence(text.trim());
    serde_json::from_str(body)
        .map_err(|e| EngineError::ReasoningUnavailable(format!("proposal is not a valid plan document: {e}")))
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // 去掉语言标记（```json）
    match rest.split_once('\n') {
        Some((lang, body)) if !lang.trim_start().starts_with('{') => body.trim(),
        _ => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{is_plan_request, FnLlmClient, LlmError, MockLlmClient};
    use crate::memory::InMemoryStore;
    use crate::tools::EchoTool;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        registry
            .register(DirectAnswerTool::new(Arc::new(MockLlmClient)))
            .unwrap();
        registry
    }

    fn planner(llm: FnLlmClient) -> (Planner, Arc<FnLlmClient>) {
        let llm = Arc::new(llm);
        let planner = Planner::new(llm.clone(), AgentProfile::new("tester"), PlannerConfig::default());
        (planner, llm)
    }

    async fn plan_with(planner: &Planner, goal: &str) -> Plan {
        planner
            .create_plan(goal, &registry(), &PlanningConstraints::default(), &CancellationToken::new())
            .await
            .unwrap()
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        let doc = r#"{"steps":[{"id":"a","tool":"echo","input":{"text":"x"}}]}"#;
        assert_eq!(parse_proposal(doc).unwrap().steps.len(), 1);
        let fenced = format!("```json\n{doc}\n```");
        assert_eq!(parse_proposal(&fenced).unwrap().steps[0].id, "a");
    }

    #[test]
    fn test_parse_rejects_prose_around_json() {
        let text = r#"Sure! Here is the plan: {"steps":[]} hope it helps"#;
        assert!(matches!(
            parse_proposal(text),
            Err(EngineError::ReasoningUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_valid_proposal_is_used() {
        let (planner, llm) = planner(FnLlmClient::new(|_| {
            Ok(json!({
                "success_criteria": ["echoed"],
                "reasoning": [{"category": "strategy", "rationale": "two echoes", "confidence": 0.9}],
                "steps": [
                    {"id": "a", "tool": "echo", "input": {"text": "one"}},
                    {"id": "b", "tool": "echo", "input": {"text": "two"}, "depends_on": ["a"], "max_retries": 99}
                ],
                "confidence": 0.8,
                "risks": ["none"]
            })
            .to_string())
        }));
        let plan = plan_with(&planner, "echo twice").await;
        assert_eq!(llm.calls(), 1);
        assert!(!plan.is_degraded());
        assert_eq!(plan.confidence(), 0.8);
        assert_eq!(plan.steps().len(), 2);
        assert_eq!(plan.step("b").unwrap().max_retries, PlannerConfig::default().max_retries_cap);
        assert_eq!(plan.risks(), &["none".to_string()]);
        assert!(plan.thoughts().iter().any(|t| t.category == ReasoningKind::Strategy));
    }

    #[tokio::test]
    async fn test_missing_confidence_is_conservative() {
        let (planner, _) = planner(FnLlmClient::new(|_| {
            Ok(r#"{"steps":[{"id":"a","tool":"echo","input":{"text":"x"}}]}"#.to_string())
        }));
        let plan = plan_with(&planner, "echo").await;
        assert!(plan.confidence() <= 0.6);
        assert!(plan.is_degraded());
    }

    #[tokio::test]
    async fn test_regenerates_after_cycle_with_feedback() {
        let (planner, llm) = planner(FnLlmClient::new(|messages| {
            let user = &messages[1].content;
            if user.contains("previous proposal was rejected") {
                Ok(r#"{"steps":[{"id":"a","tool":"echo","input":{"text":"x"}}],"confidence":0.7}"#.to_string())
            } else {
                Ok(r#"{"steps":[
                    {"id":"a","tool":"echo","input":{"text":"x"},"depends_on":["b"]},
                    {"id":"b","tool":"echo","input":{"text":"y"},"depends_on":["a"]}
                ]}"#
                .to_string())
            }
        }));
        let plan = plan_with(&planner, "loop").await;
        assert_eq!(llm.calls(), 2);
        assert!(!plan.is_degraded());
        assert!(plan.thoughts().iter().any(|t| t.rationale.contains("attempt 1 rejected")));
    }

    #[tokio::test]
    async fn test_unknown_tool_then_fallback() {
        let (planner, llm) = planner(FnLlmClient::new(|_| {
            Ok(r#"{"steps":[{"id":"a","tool":"teleport","input":{}}],"confidence":0.9}"#.to_string())
        }));
        let plan = plan_with(&planner, "go to mars").await;
        assert_eq!(llm.calls(), 2);
        assert!(plan.is_degraded());
        assert_eq!(plan.confidence(), PlannerConfig::default().fallback_confidence);
        assert_eq!(plan.steps().len(), 1);
        assert_eq!(plan.steps()[0].tool, DIRECT_ANSWER_TOOL);
        assert_eq!(plan.steps()[0].input, json!({"goal": "go to mars"}));
        let last = plan.thoughts().last().unwrap();
        assert_eq!(last.category, ReasoningKind::Reflection);
        assert!(last.rationale.contains("degraded"));
    }

    #[tokio::test]
    async fn test_reasoner_unavailable_falls_back() {
        let (planner, _) = planner(FnLlmClient::unavailable());
        let plan = plan_with(&planner, "anything").await;
        assert!(plan.is_degraded());
        assert!(plan.risks()[0].contains("Reasoning unavailable"));
    }

    #[tokio::test]
    async fn test_fallback_tool_used_when_schema_accepts_goal() {
        let mut registry = registry();
        struct Lookup;
        #[async_trait::async_trait]
        impl crate::tools::Tool for Lookup {
            fn name(&self) -> &str {
                "lookup"
            }
            fn description(&self) -> &str {
                "look up a goal"
            }
            async fn execute(&self, args: Value) -> Result<Value, String> {
                Ok(args)
            }
        }
        registry.register(Lookup).unwrap();
        let config = PlannerConfig {
            fallback_tool: Some("lookup".to_string()),
            ..PlannerConfig::default()
        };
        let planner = Planner::new(Arc::new(FnLlmClient::unavailable()), AgentProfile::default(), config);
        let plan = planner
            .create_plan("x", &registry, &PlanningConstraints::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plan.steps()[0].tool, "lookup");
    }

    #[tokio::test]
    async fn test_memory_and_profile_in_prompt() {
        let memory = Arc::new(InMemoryStore::default());
        memory.store(MemoryEntry::new("tester", "solar panels were cheaper in 2023"));
        let llm = Arc::new(FnLlmClient::new(|messages| {
            assert!(is_plan_request(messages));
            assert!(messages[0].content.contains("'tester'"));
            assert!(messages[1].content.contains("solar panels were cheaper"));
            Err(LlmError::EmptyResponse)
        }));
        let planner = Planner::new(llm.clone(), AgentProfile::new("tester"), PlannerConfig::default())
            .with_memory(memory);
        let plan = planner
            .create_plan("price of solar panels", &registry(), &PlanningConstraints::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(plan.is_degraded());
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_planning_falls_back_without_retry() {
        let (planner, llm) = planner(FnLlmClient::unavailable());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let plan = planner
            .create_plan("x", &registry(), &PlanningConstraints::default(), &cancel)
            .await
            .unwrap();
        assert!(plan.is_degraded());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_proposed_timeout_is_capped() {
        let (planner, _) = planner(FnLlmClient::new(|_| {
            Ok(json!({
                "steps": [
                    {"id": "a", "tool": "echo", "input": {"text": "x"}, "timeout_secs": 864000},
                    {"id": "b", "tool": "echo", "input": {"text": "y"}, "timeout_secs": 5}
                ],
                "confidence": 0.7
            })
            .to_string())
        }));
        let constraints = PlanningConstraints {
            max_step_timeout: Duration::from_secs(120),
            ..PlanningConstraints::default()
        };
        let plan = planner
            .create_plan("slow", &registry(), &constraints, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plan.step("a").unwrap().timeout, Duration::from_secs(120));
        assert_eq!(plan.step("b").unwrap().timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_configured_caps_and_fallback_confidence() {
        let config = PlannerConfig {
            max_retries_cap: 1,
            fallback_confidence: 0.1,
            ..PlannerConfig::default()
        };
        let planner = Planner::new(Arc::new(FnLlmClient::unavailable()), AgentProfile::default(), config);
        let constraints = PlanningConstraints {
            default_max_retries: 4,
            ..PlanningConstraints::default()
        };
        let plan = planner
            .create_plan("x", &registry(), &constraints, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plan.confidence(), 0.1);
        assert_eq!(plan.steps()[0].max_retries, 1);
    }

    #[tokio::test]
    async fn test_fallback_uses_registered_goal_tool_without_direct_answer() {
        struct Ask;
        #[async_trait::async_trait]
        impl crate::tools::Tool for Ask {
            fn name(&self) -> &str {
                "ask"
            }
            fn description(&self) -> &str {
                "answer a goal"
            }
            fn parameters_schema(&self) -> Value {
                json!({"type": "object", "properties": {"goal": {"type": "string"}}, "required": ["goal"]})
            }
            async fn execute(&self, args: Value) -> Result<Value, String> {
                Ok(args)
            }
        }
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        registry.register(Ask).unwrap();
        let (planner, _) = planner(FnLlmClient::unavailable());
        let plan = planner
            .create_plan("x", &registry, &PlanningConstraints::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plan.steps()[0].tool, "ask");
        assert!(plan.steps().iter().all(|s| registry.contains(&s.tool)));
    }

    #[tokio::test]
    async fn test_no_goal_tool_is_structural_error() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let (planner, _) = planner(FnLlmClient::unavailable());
        let err = planner
            .create_plan("x", &registry, &PlanningConstraints::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("goal input"));
    }

    #[tokio::test]
    async fn test_with_direct_answer_makes_fallback_runnable() {
        let mut bare = ToolRegistry::new();
        bare.register(EchoTool).unwrap();
        let (planner, _) = planner(FnLlmClient::unavailable());
        let registry = planner.with_direct_answer(Arc::new(bare));
        assert!(registry.contains(DIRECT_ANSWER_TOOL));
        let plan = planner
            .create_plan("x", &registry, &PlanningConstraints::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plan.steps()[0].tool, DIRECT_ANSWER_TOOL);
        assert!(Arc::ptr_eq(&planner.with_direct_answer(registry.clone()), &registry));
    }
}
