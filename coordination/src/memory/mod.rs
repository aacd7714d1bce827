//! Per-agent memory: a bounded short-term ring plus an unbounded
//! long-term store, with importance-driven consolidation and
//! token-overlap relevance search.

mod store;

pub use store::{
    MemoryConfig, MemoryItem, MemoryKind, MemoryStore, RelevanceScorer, TokenOverlap,
};
