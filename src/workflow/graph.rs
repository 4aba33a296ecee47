//! 工作流依赖图
//!
//! 使用邻接表和入度表校验 DAG（Kahn 拓扑排序），并按当前步骤状态计算就绪前沿。

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::EngineError;
use crate::workflow::types::*;

/// 某一时刻的调度前沿
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Frontier {
    /// 依赖已满足，可以派发
    pub ready: Vec<StepId>,
    /// 依赖已全部结束但存在失败，且策略不允许继续：应记为 Skipped
    pub blocked: Vec<(StepId, StepId)>,
}

/// 工作流依赖图
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    /// 邻接表：步骤 ID -> 依赖该步骤的步骤列表
    pub adjacency: HashMap<StepId, Vec<StepId>>,
    /// 入度表：步骤 ID -> 依赖数
    pub in_degree: HashMap<StepId, usize>,
    order: Vec<StepId>,
    dependencies: HashMap<StepId, (Vec<StepId>, DependencyPolicy)>,
}

impl WorkflowGraph {
    /// 构建并校验依赖图：空 ID、重复 ID、未知依赖、自依赖为 Validation 错误，环为 CyclicPlan
    pub fn build(steps: &[PlanStep]) -> Result<Self, EngineError> {
        let mut adjacency: HashMap<StepId, Vec<StepId>> = HashMap::new();
        let mut in_degree: HashMap<StepId, usize> = HashMap::new();
        let mut dependencies = HashMap::new();
        let mut order = Vec::with_capacity(steps.len());

        for step in steps {
            if step.id.trim().is_empty() {
                return Err(EngineError::Validation("step id must not be empty".to_string()));
            }
            if in_degree.insert(step.id.clone(), 0).is_some() {
                return Err(EngineError::Validation(format!("duplicate step id '{}'", step.id)));
            }
            adjacency.insert(step.id.clone(), Vec::new());
            order.push(step.id.clone());
        }

        for step in steps {
            let mut seen = HashSet::new();
            for dep in &step.depends_on {
                if dep == &step.id {
                    return Err(EngineError::CyclicPlan(step.id.clone()));
                }
                if !in_degree.contains_key(dep) {
                    return Err(EngineError::Validation(format!(
                        "step '{}' depends on unknown step '{}'",
                        step.id, dep
                    )));
                }
                if !seen.insert(dep.clone()) {
                    continue;
                }
                adjacency.entry(dep.clone()).or_default().push(step.id.clone());
                *in_degree.entry(step.id.clone()).or_insert(0) += 1;
            }
            dependencies.insert(
                step.id.clone(),
                (seen_in_order(&step.depends_on), step.on_dependency_failure),
            );
        }

        let graph = Self {
            adjacency,
            in_degree,
            order,
            dependencies,
        };
        graph.topological_order()?;
        Ok(graph)
    }

    /// 拓扑序；存在环时返回 CyclicPlan（携带计划顺序中第一个处于环上的步骤）
    pub fn topological_order(&self) -> Result<Vec<StepId>, EngineError> {
        let mut degree = self.in_degree.clone();
        let mut queue: VecDeque<&StepId> = self
            .order
            .iter()
            .filter(|id| degree.get(*id) == Some(&0))
            .collect();
        let mut sorted = Vec::with_capacity(self.order.len());

        while let Some(id) = queue.pop_front() {
            sorted.push(id.clone());
            for dependent in self.adjacency.get(id).into_iter().flatten() {
                if let Some(d) = degree.get_mut(dependent) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if sorted.len() == self.order.len() {
            return Ok(sorted);
        }
        let cyclic = self
            .order
            .iter()
            .find(|id| degree.get(*id).copied().unwrap_or(0) > 0)
            .cloned()
            .unwrap_or_default();
        Err(EngineError::CyclicPlan(cyclic))
    }

    /// 按计划顺序计算就绪前沿。只考察 Pending 步骤：
    /// 依赖全部成功则就绪；依赖全部结束但有失败时，Proceed 策略就绪，Block 策略被阻塞
    pub fn frontier(&self, states: &HashMap<StepId, StepState>) -> Frontier {
        let mut frontier = Frontier::default();
        for id in &self.order {
            if states.get(id) != Some(&StepState::Pending) {
                continue;
            }
            let Some((deps, policy)) = self.dependencies.get(id) else {
                continue;
            };
            let dep_states: Vec<(&StepId, StepState)> = deps
                .iter()
                .map(|d| (d, states.get(d).copied().unwrap_or(StepState::Pending)))
                .collect();
            if dep_states.iter().any(|(_, s)| !s.is_terminal()) {
                continue;
            }
            match dep_states.iter().find(|(_, s)| *s != StepState::Succeeded) {
                None => frontier.ready.push(id.clone()),
                Some(_) if *policy == DependencyPolicy::Proceed => frontier.ready.push(id.clone()),
                Some((failed, _)) => frontier.blocked.push((id.clone(), (*failed).clone())),
            }
        }
        frontier
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn seen_in_order(deps: &[StepId]) -> Vec<StepId> {
    let mut seen = HashSet::new();
    deps.iter().filter(|d| seen.insert(d.as_str())).cloned().collect()
}
