// src/aggregate/types.rs
use crate::error::ProviderError;
use crate::item::Item;

/// A search source. Concrete implementations (board APIs, scrapers) live
/// outside this crate; tests script their own.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Run one search and return up to `count` raw items.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<Item>, ProviderError>;

    /// Stable source name, used in logs, reports and `Item::source`.
    fn name(&self) -> &str;

    /// Shape check applied before an item enters the pipeline.
    fn validate(&self, item: &Item) -> bool {
        !item.id.trim().is_empty() && !item.title.trim().is_empty() && !item.link.trim().is_empty()
    }
}

/// Per-source outcome of one aggregation round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTally {
    pub source: String,
    /// Raw items the provider returned.
    pub fetched: usize,
    /// Items that passed the provider's validate hook.
    pub accepted: usize,
}

/// Items plus per-source accounting, so callers can report which sources
/// failed without parsing logs.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub items: Vec<Item>,
    pub tallies: Vec<SourceTally>,
    /// Providers that errored this round, with reasons.
    pub failed: Vec<(String, String)>,
}
