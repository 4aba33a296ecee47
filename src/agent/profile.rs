//! Agent 角色配置：角色名、职责描述、行为指令
//!
//! 纯配置结构，注入到 Planner / Synthesizer 的 prompt 中。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
}

impl AgentProfile {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            description: String::new(),
            instructions: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// 默认三角色：研究、分析、撰写
    pub fn defaults() -> Vec<AgentProfile> {
        vec![
            AgentProfile::new("researcher")
                .with_description("Gathers facts and evidence relevant to the goal.")
                .with_instructions("Prefer concrete, verifiable findings. List sources of uncertainty."),
            AgentProfile::new("analyst")
                .with_description("Evaluates findings, weighs risks and opportunities.")
                .with_instructions("Structure the analysis as numbered key points with a short rationale each."),
            AgentProfile::new("writer")
                .with_description("Turns analysis into a clear final answer.")
                .with_instructions("Be concise. Address the original goal directly."),
        ]
    }

    /// prompt 中的角色段落
    pub fn preamble(&self) -> String {
        let mut s = format!("You are the '{}' agent.", self.role);
        if !self.description.trim().is_empty() {
            s.push(' ');
            s.push_str(self.description.trim());
        }
        if !self.instructions.trim().is_empty() {
            s.push_str("\nInstructions: ");
            s.push_str(self.instructions.trim());
        }
        s
    }
}

impl Default for AgentProfile {
    fn default() -> Self {
        AgentProfile::new("assistant")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_includes_role_and_instructions() {
        let p = AgentProfile::new("critic").with_instructions("Find flaws.");
        let pre = p.preamble();
        assert!(pre.contains("'critic'"));
        assert!(pre.contains("Find flaws."));
    }

    #[test]
    fn test_defaults_have_three_roles() {
        let roles: Vec<String> = AgentProfile::defaults().into_iter().map(|p| p.role).collect();
        assert_eq!(roles, vec!["researcher", "analyst", "writer"]);
    }
}
