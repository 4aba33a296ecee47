//! 计划构建器
//!
//! 提供流畅的 API 组装计划；build 时校验依赖图，build_for 额外校验工具是否注册及输入 schema。
//! Plan 只能经由这里定稿。

use crate::agent::thought::ThoughtRecord;
use crate::core::EngineError;
use crate::tools::ToolRegistry;
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::*;

/// 提议未给出置信度时使用的保守值
pub const DEGRADED_CONFIDENCE: f64 = 0.5;

/// 计划构建器
pub struct PlanBuilder {
    goal: String,
    success_criteria: Vec<String>,
    thoughts: Vec<ThoughtRecord>,
    steps: Vec<PlanStep>,
    confidence: Option<f64>,
    risks: Vec<String>,
    degraded: bool,
}

impl PlanBuilder {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            success_criteria: Vec::new(),
            thoughts: Vec::new(),
            steps: Vec::new(),
            confidence: None,
            risks: Vec::new(),
            degraded: false,
        }
    }

    pub fn success_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.success_criteria.push(criterion.into());
        self
    }

    pub fn success_criteria(mut self, criteria: Vec<String>) -> Self {
        self.success_criteria.extend(criteria);
        self
    }

    pub fn thoughts(mut self, thoughts: Vec<ThoughtRecord>) -> Self {
        self.thoughts = thoughts;
        self
    }

    /// 添加步骤
    pub fn step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: Vec<PlanStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn risk(mut self, risk: impl Into<String>) -> Self {
        self.risks.push(risk.into());
        self
    }

    pub fn risks(mut self, risks: Vec<String>) -> Self {
        self.risks.extend(risks);
        self
    }

    pub fn degraded(mut self, degraded: bool) -> Self {
        self.degraded = degraded;
        self
    }

    /// 校验依赖图并定稿
    pub fn build(self) -> Result<Plan, EngineError> {
        if self.goal.trim().is_empty() {
            return Err(EngineError::Validation("plan goal must not be empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(EngineError::Validation("plan has no steps".to_string()));
        }
        WorkflowGraph::build(&self.steps)?;

        // 缺失置信度视为降级规划
        let (confidence, degraded) = match self.confidence {
            Some(c) if c.is_finite() => (c.clamp(0.0, 1.0), self.degraded),
            _ => (DEGRADED_CONFIDENCE, true),
        };

        Ok(Plan {
            id: format!("plan_{}", uuid::Uuid::new_v4()),
            goal: self.goal,
            success_criteria: self.success_criteria,
            thoughts: self.thoughts,
            steps: self.steps,
            confidence,
            risks: self.risks,
            degraded,
        })
    }

    /// 在 build 之前校验每一步的工具已注册且输入满足其 schema
    pub fn build_for(self, registry: &ToolRegistry) -> Result<Plan, EngineError> {
        for step in &self.steps {
            if !registry.contains(&step.tool) {
                return Err(EngineError::Validation(format!(
                    "step '{}' references unknown tool '{}'",
                    step.id, step.tool
                )));
            }
            registry.validate_input(&step.tool, &step.input)?;
        }
        self.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;
    use serde_json::json;

    fn echo(id: &str) -> PlanStep {
        PlanStep::new(id, "echo", json!({"text": id}))
    }

    #[test]
    fn test_build_valid_plan() {
        let plan = PlanBuilder::new("greet")
            .success_criterion("says hi")
            .step(echo("a"))
            .step(echo("b").depends_on(["a"]))
            .confidence(0.9)
            .risk("none")
            .build()
            .unwrap();
        assert!(plan.id().starts_with("plan_"));
        assert_eq!(plan.steps().len(), 2);
        assert_eq!(plan.confidence(), 0.9);
        assert!(!plan.is_degraded());
    }

    #[test]
    fn test_missing_confidence_is_degraded() {
        let plan = PlanBuilder::new("greet").step(echo("a")).build().unwrap();
        assert!(plan.confidence() <= 0.6);
        assert!(plan.is_degraded());
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(PlanBuilder::new("greet").build().is_err());
    }

    #[test]
    fn test_cyclic_plan_rejected() {
        let err = PlanBuilder::new("loop")
            .step(echo("a").depends_on(["b"]))
            .step(echo("b").depends_on(["a"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::CyclicPlan(_)));
    }

    #[test]
    fn test_build_for_checks_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let err = PlanBuilder::new("g")
            .step(PlanStep::new("a", "search", json!({})))
            .build_for(&registry)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = PlanBuilder::new("g")
            .step(PlanStep::new("a", "echo", json!({"text": 1})))
            .build_for(&registry)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        assert!(PlanBuilder::new("g").step(echo("a")).build_for(&registry).is_ok());
    }
}
