//! 推理记录：规划与执行过程中的思考轨迹
//!
//! ThoughtLog 只允许追加，序号从 1 递增；一次运行一份，不跨运行共享。

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 推理类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningKind {
    GoalAnalysis,
    Strategy,
    ToolSelection,
    Synthesis,
    Reflection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtRecord {
    pub seq: u32,
    pub rationale: String,
    pub category: ReasoningKind,
    /// [0, 1]
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// 追加式推理日志
#[derive(Debug, Clone, Default)]
pub struct ThoughtLog {
    records: Vec<ThoughtRecord>,
}

impl ThoughtLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录，返回其序号；置信度被钳制到 [0, 1]
    pub fn record(&mut self, category: ReasoningKind, rationale: impl Into<String>, confidence: f64) -> u32 {
        let seq = self.records.len() as u32 + 1;
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.records.push(ThoughtRecord {
            seq,
            rationale: rationale.into(),
            category,
            confidence,
            created_at: Utc::now(),
        });
        seq
    }

    pub fn records(&self) -> &[ThoughtRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ThoughtRecord> {
        self.records
    }
}
