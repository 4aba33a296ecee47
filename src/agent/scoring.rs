//! 输出评估：要点提取与置信度启发式

use std::sync::OnceLock;

use regex::Regex;

/// 最多提取的要点数
pub const MAX_KEY_POINTS: usize = 5;

static NUMBERED_RE: OnceLock<Option<Regex>> = OnceLock::new();
static BULLET_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn numbered_re() -> Option<&'static Regex> {
    NUMBERED_RE
        .get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s+(\S[^\n]*)$").ok())
        .as_ref()
}

fn bullet_re() -> Option<&'static Regex> {
    BULLET_RE
        .get_or_init(|| Regex::new(r"(?m)^\s*[-•*]\s+(\S[^\n]*)$").ok())
        .as_ref()
}

/// 提取要点：先取编号行（至多 5 条），再取项目符号行（至多 3 条），合计不超过 5 条
pub fn extract_key_points(text: &str) -> Vec<String> {
    let capture = |re: Option<&Regex>, limit: usize| -> Vec<String> {
        re.map(|re| {
            re.captures_iter(text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
    };
    let mut points = capture(numbered_re(), MAX_KEY_POINTS);
    points.extend(capture(bullet_re(), 3));
    points.truncate(MAX_KEY_POINTS);
    points
}

/// 输出置信度：基础 0.5；JSON 对象 +0.2；超过 200 词 +0.2；至少 3 个要点 +0.1；上限 1.0
pub fn output_confidence(text: &str, key_points: usize) -> f64 {
    let mut score: f64 = 0.5;
    if serde_json::from_str::<serde_json::Value>(text.trim())
        .map(|v| v.is_object())
        .unwrap_or(false)
    {
        score += 0.2;
    }
    if text.split_whitespace().count() > 200 {
        score += 0.2;
    }
    if key_points >= 3 {
        score += 0.1;
    }
    score.min(1.0)
}

/// 多个置信度的均值；为空时为 0
pub fn mean_confidence(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
