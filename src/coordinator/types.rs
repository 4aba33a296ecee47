//! 协调层类型：拓扑、协调记录与结果

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::AgentResult;
use crate::core::EngineError;

/// 多 Agent 组合策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// 依次运行，后一个 Agent 的目标包含前一个的综合输出
    Sequential,
    /// 并发运行，失败互相隔离
    Parallel,
    /// 固定轮数的起草 / 评审 / 修订
    Collaborative,
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Sequential => "sequential",
            Topology::Parallel => "parallel",
            Topology::Collaborative => "collaborative",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Topology::Sequential),
            "parallel" | "par" => Ok(Topology::Parallel),
            "collaborative" | "collab" => Ok(Topology::Collaborative),
            other => Err(EngineError::Config(format!("unknown topology '{other}'"))),
        }
    }
}

/// 协调记录中的一条：第几轮、哪个角色、结果
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationEntry {
    /// 从 1 开始
    pub round: usize,
    pub role: String,
    pub result: AgentResult,
}

/// 一次协调运行的结果，产出后不再修改
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationResult {
    pub topology: Topology,
    /// 按运行（或角色）顺序排列
    pub entries: Vec<CoordinationEntry>,
    pub final_text: String,
    /// 至少一个 Agent 成功
    pub success: bool,
    /// 各 Agent 置信度的均值
    pub confidence: f64,
    pub cancelled: bool,
    pub duration: Duration,
}

impl CoordinationResult {
    /// 角色 -> 结果；同一角色出现多次时取最后一次
    pub fn results_by_role(&self) -> HashMap<&str, &AgentResult> {
        self.entries
            .iter()
            .map(|e| (e.role.as_str(), &e.result))
            .collect()
    }

    pub fn results(&self) -> impl Iterator<Item = &AgentResult> {
        self.entries.iter().map(|e| &e.result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_parse_and_display() {
        assert_eq!("Parallel".parse::<Topology>().unwrap(), Topology::Parallel);
        assert_eq!("collab".parse::<Topology>().unwrap(), Topology::Collaborative);
        assert!("mesh".parse::<Topology>().is_err());
        assert_eq!(Topology::Sequential.to_string(), "sequential");
    }

    #[test]
    fn test_results_by_role_keeps_last() {
        let first = AgentResult::failed("writer", "g", "first", Duration::ZERO);
        let second = AgentResult::failed("writer", "g", "second", Duration::ZERO);
        let result = CoordinationResult {
            topology: Topology::Collaborative,
            entries: vec![
                CoordinationEntry { round: 1, role: "writer".into(), result: first },
                CoordinationEntry { round: 2, role: "writer".into(), result: second },
            ],
            final_text: String::new(),
            success: false,
            confidence: 0.0,
            cancelled: false,
            duration: Duration::ZERO,
        };
        let by_role = result.results_by_role();
        assert_eq!(by_role.len(), 1);
        assert_eq!(by_role["writer"].error.as_deref(), Some("second"));
    }
}
