//! In-memory agent memory store.
//!
//! Short-term memory is a bounded ring (default 10 entries). When an
//! append pushes it over the cap, consolidation runs synchronously:
//! every short-term item with importance above the threshold is copied
//! to long-term storage (re-tagged long-term) and short-term is
//! truncated to its most recent entries. Long-term memory is
//! append-only and never trimmed.
//!
//! Relevance search scores every stored item by token overlap with the
//! query. The scorer is a replaceable strategy so an embedding-based
//! scorer can slot in later, but the token-overlap behavior is the
//! contract the rest of the system tests against.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

/// Kind of memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Recent working context, subject to consolidation.
    ShortTerm,
    /// Consolidated or directly stored durable memory.
    LongTerm,
    /// A record of an action the agent took.
    Episodic,
    /// Distilled knowledge, usually from reflection.
    Semantic,
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShortTerm => write!(f, "short_term"),
            Self::LongTerm => write!(f, "long_term"),
            Self::Episodic => write!(f, "episodic"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

/// A single memory entry, owned exclusively by the agent that made it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique entry id.
    pub id: Uuid,
    /// Kind of entry.
    pub kind: MemoryKind,
    /// The content text.
    pub content: String,
    /// Open metadata map.
    pub metadata: Map<String, Value>,
    /// Importance in [0, 1]; clamped on construction.
    pub importance: f64,
    /// When this entry was created.
    pub created_at: DateTime<Utc>,
}

impl MemoryItem {
    /// Create a new memory entry with clamped importance.
    pub fn new(kind: MemoryKind, content: impl Into<String>, importance: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            metadata: Map::new(),
            importance: importance.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Short-term capacity; appends beyond this trigger consolidation.
    pub max_short_term: usize,
    /// Importance strictly above this is promoted to long-term.
    pub consolidation_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_short_term: 10,
            consolidation_threshold: 0.7,
        }
    }
}

/// Scoring strategy for relevance search.
pub trait RelevanceScorer: Send + Sync {
    /// Score a stored content string against a query, in [0, 1].
    fn score(&self, query: &str, content: &str) -> f64;
}

/// Fraction of query tokens present in the content, case-insensitive.
///
/// A stand-in for embedding similarity; the exact behavior is load
/// bearing for relevance ordering and is covered by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlap;

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

impl RelevanceScorer for TokenOverlap {
    fn score(&self, query: &str, content: &str) -> f64 {
        let query_tokens = tokens(query);
        if query_tokens.is_empty() {
            return 0.0;
        }
        let content_tokens = tokens(content);
        let hits = query_tokens
            .iter()
            .filter(|t| content_tokens.contains(*t))
            .count();
        hits as f64 / query_tokens.len() as f64
    }
}

/// The per-agent memory store.
pub struct MemoryStore {
    config: MemoryConfig,
    short_term: Vec<MemoryItem>,
    long_term: Vec<MemoryItem>,
    scorer: Box<dyn RelevanceScorer>,
}

impl MemoryStore {
    /// Create a store with the default config and token-overlap scorer.
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// Create a store with an explicit config.
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            config,
            short_term: Vec::new(),
            long_term: Vec::new(),
            scorer: Box::new(TokenOverlap),
        }
    }

    /// Replace the relevance scorer.
    pub fn with_scorer(mut self, scorer: Box<dyn RelevanceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Append a memory entry.
    ///
    /// Short-term entries go to the ring and may trigger synchronous
    /// consolidation before this returns; every other kind lands
    /// directly in long-term storage.
    pub fn add(&mut self, item: MemoryItem) {
        match item.kind {
            MemoryKind::ShortTerm => {
                self.short_term.push(item);
                if self.short_term.len() > self.config.max_short_term {
                    self.consolidate();
                }
            }
            _ => self.long_term.push(item),
        }
    }

    /// Promote high-importance short-term items and trim the ring.
    fn consolidate(&mut self) {
        let promoted: Vec<MemoryItem> = self
            .short_term
            .iter()
            .filter(|m| m.importance > self.config.consolidation_threshold)
            .cloned()
            .map(|mut m| {
                m.kind = MemoryKind::LongTerm;
                m
            })
            .collect();

        debug!(
            promoted = promoted.len(),
            short_term = self.short_term.len(),
            "consolidating short-term memory"
        );
        self.long_term.extend(promoted);

        // Trim, not clear: keep the most recent entries.
        let keep_from = self.short_term.len().saturating_sub(self.config.max_short_term);
        self.short_term.drain(..keep_from);
    }

    /// The `limit` most relevant entries across short ∪ long term.
    ///
    /// Sorted by descending score; ties keep encounter order
    /// (short-term first, each store in insertion order).
    pub fn relevant(&self, query: &str, limit: usize) -> Vec<MemoryItem> {
        let mut scored: Vec<(f64, &MemoryItem)> = self
            .short_term
            .iter()
            .chain(self.long_term.iter())
            .map(|m| (self.scorer.score(query, &m.content), m))
            .collect();

        // Stable sort preserves encounter order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(limit).map(|(_, m)| m.clone()).collect()
    }

    /// Drop every short-term entry. Long-term is untouched.
    pub fn clear_short_term(&mut self) {
        self.short_term.clear();
    }

    /// All entries, short-term first.
    pub fn all(&self) -> Vec<MemoryItem> {
        self.short_term
            .iter()
            .chain(self.long_term.iter())
            .cloned()
            .collect()
    }

    /// Current short-term entries in insertion order.
    pub fn short_term(&self) -> &[MemoryItem] {
        &self.short_term
    }

    /// Long-term entries in insertion order.
    pub fn long_term(&self) -> &[MemoryItem] {
        &self.long_term
    }

    /// The active configuration.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
