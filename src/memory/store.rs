//! 可选的记忆存储：只用于丰富 Planner 的上下文
//!
//! 支持 store(entry) 与 retrieve_relevant(query, role, limit)；InMemoryStore 按关键词重叠检索，
//! NoopMemory 表示未接入存储（无记忆模式）。存储缺失或失效不会影响规划。

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一条记忆：由哪个角色写入、内容、时间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// 记忆存储 trait
pub trait MemoryStore: Send + Sync {
    fn store(&self, entry: MemoryEntry);

    /// 按查询检索最相关的 limit 条；role 为 Some 时只返回该角色写入的条目
    fn retrieve_relevant(&self, query: &str, role: Option<&str>, limit: usize) -> Vec<MemoryEntry>;

    /// 是否启用（Noop 实现返回 false）
    fn enabled(&self) -> bool {
        true
    }
}

/// 空实现：未启用记忆时使用
#[derive(Clone, Default)]
pub struct NoopMemory;

impl MemoryStore for NoopMemory {
    fn store(&self, _entry: MemoryEntry) {}

    fn retrieve_relevant(&self, _query: &str, _role: Option<&str>, _limit: usize) -> Vec<MemoryEntry> {
        Vec::new()
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// 将文本切分为小写词集合，用于简单相似度（词重叠数）
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 1)
        .collect()
}

/// 内存实现：按关键词重叠检索，超过容量时丢弃最旧条目
#[derive(Clone)]
pub struct InMemoryStore {
    entries: Arc<RwLock<Vec<(MemoryEntry, HashSet<String>)>>>,
    max_entries: usize,
}

impl InMemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemoryStore for InMemoryStore {
    fn store(&self, entry: MemoryEntry) {
        if entry.content.trim().is_empty() {
            return;
        }
        let tokens = tokenize_lower(&entry.content);
        // 锁中毒时放弃写入：记忆是可选的增强
        let Ok(mut entries) = self.entries.write() else {
            tracing::warn!("memory store lock poisoned, dropping entry");
            return;
        };
        entries.push((entry, tokens));
        let n = entries.len();
        if n > self.max_entries {
            entries.drain(0..n - self.max_entries);
        }
    }

    fn retrieve_relevant(&self, query: &str, role: Option<&str>, limit: usize) -> Vec<MemoryEntry> {
        let query_tokens = tokenize_lower(query);
        if query_tokens.is_empty() || limit == 0 {
            return Vec::new();
        }
        let Ok(entries) = self.entries.read() else {
            return Vec::new();
        };
        let mut scored: Vec<(usize, &MemoryEntry)> = entries
            .iter()
            .filter(|(entry, _)| role.map_or(true, |r| entry.role == r))
            .map(|(entry, tokens)| (query_tokens.intersection(tokens).count(), entry))
            .filter(|(score, _)| *score > 0)
            .collect();
        // 同分时较新的优先
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.created_at.cmp(&a.1.created_at)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieve_by_overlap() {
        let store = InMemoryStore::default();
        store.store(MemoryEntry::new("researcher", "market size of electric bikes"));
        store.store(MemoryEntry::new("researcher", "weather in Paris"));
        let hits = store.retrieve_relevant("electric bikes market", None, 5);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("electric"));
    }

    #[test]
    fn test_retrieve_filters_role() {
        let store = InMemoryStore::default();
        store.store(MemoryEntry::new("writer", "draft about rust async"));
        store.store(MemoryEntry::new("critic", "rust async draft too long"));
        let hits = store.retrieve_relevant("rust async", Some("critic"), 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].role, "critic");
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let store = InMemoryStore::new(2);
        store.store(MemoryEntry::new("a", "first entry"));
        store.store(MemoryEntry::new("a", "second entry"));
        store.store(MemoryEntry::new("a", "third entry"));
        assert_eq!(store.len(), 2);
        assert!(store.retrieve_relevant("first", None, 5).is_empty());
    }

    #[test]
    fn test_noop_is_disabled() {
        let noop = NoopMemory;
        noop.store(MemoryEntry::new("a", "anything"));
        assert!(!noop.enabled());
        assert!(noop.retrieve_relevant("anything", None, 3).is_empty());
    }
}
