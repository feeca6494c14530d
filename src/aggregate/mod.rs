// src/aggregate/mod.rs
pub mod types;

pub use types::{Provider, SearchReport, SourceTally};

use std::collections::HashSet;

use metrics::{counter, gauge};

use crate::blocklist::Blocklist;
use crate::config::{DedupConfig, DedupMethod, ProviderConfig};
use crate::error::AggregationError;
use crate::fingerprint::{content_similarity, Fingerprint};
use crate::item::Item;

struct Registered {
    provider: Box<dyn Provider>,
    settings: ProviderConfig,
    /// Registration order, breaks priority ties.
    index: usize,
}

/// Merges results from every registered provider into one bounded,
/// deduplicated, blocklist-filtered list. Read-only beyond provider calls.
pub struct Aggregator {
    providers: Vec<Registered>,
    dedup: DedupConfig,
}

impl Aggregator {
    pub fn new(dedup: DedupConfig) -> Self {
        Self {
            providers: Vec::new(),
            dedup,
        }
    }

    pub fn register(&mut self, provider: Box<dyn Provider>, settings: ProviderConfig) {
        let index = self.providers.len();
        self.providers.push(Registered {
            provider,
            settings,
            index,
        });
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Run one search round and return up to `count` items.
    pub async fn search(
        &self,
        query: &str,
        count: usize,
        blocklist: &Blocklist,
    ) -> Result<Vec<Item>, AggregationError> {
        Ok(self.search_report(query, count, blocklist).await?.items)
    }

    /// Like [`search`](Self::search), with per-source accounting attached.
    ///
    /// Providers run sequentially in priority order (lower first,
    /// registration order breaks ties). One failing provider is logged and
    /// skipped; the round fails only when every queried provider failed.
    pub async fn search_report(
        &self,
        query: &str,
        count: usize,
        blocklist: &Blocklist,
    ) -> Result<SearchReport, AggregationError> {
        crate::metrics::describe_metrics();

        let mut active: Vec<&Registered> = self
            .providers
            .iter()
            .filter(|r| r.settings.enabled)
            .collect();
        active.sort_by_key(|r| (r.settings.priority, r.index));

        if active.is_empty() {
            tracing::warn!("no enabled providers registered");
            return Ok(SearchReport {
                items: Vec::new(),
                tallies: Vec::new(),
                failed: Vec::new(),
            });
        }

        let mut merged: Vec<Item> = Vec::new();
        let mut tallies: Vec<SourceTally> = Vec::new();
        let mut failed: Vec<(String, String)> = Vec::new();

        for entry in &active {
            let name = entry.provider.name().to_string();
            let want = count.min(entry.settings.max_results);
            match entry.provider.search(query, want).await {
                Ok(batch) => {
                    let fetched = batch.len();
                    counter!("aggregate_items_total").increment(fetched as u64);
                    let mut accepted = 0usize;
                    for mut item in batch {
                        if !entry.provider.validate(&item) {
                            tracing::debug!(provider = %name, id = %item.id, "item failed validation");
                            counter!("aggregate_invalid_total").increment(1);
                            continue;
                        }
                        if item.source.is_empty() {
                            item.source = name.clone();
                        }
                        merged.push(item);
                        accepted += 1;
                    }
                    tallies.push(SourceTally {
                        source: name,
                        fetched,
                        accepted,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, provider = %name, "provider search failed");
                    counter!("aggregate_provider_errors_total").increment(1);
                    failed.push((name, e.message));
                }
            }
        }

        // No partial result can stand in for a round where nothing answered.
        if tallies.is_empty() {
            return Err(AggregationError { failures: failed });
        }

        let items = if self.dedup.enabled {
            let before = merged.len();
            let kept = dedup_items(merged, self.dedup.method, self.dedup.similarity_threshold);
            counter!("aggregate_dedup_total").increment((before - kept.len()) as u64);
            kept
        } else {
            merged
        };

        let mut items = apply_blocklist(items, blocklist);
        items.truncate(count);

        counter!("aggregate_kept_total").increment(items.len() as u64);
        gauge!("aggregate_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        Ok(SearchReport {
            items,
            tallies,
            failed,
        })
    }
}

/// Collapse duplicates, first-seen wins. The exact pass always runs
/// (normalized URL, content hash for linkless items); the fuzzy pass only
/// under the `content` method.
fn dedup_items(items: Vec<Item>, method: DedupMethod, similarity_threshold: f64) -> Vec<Item> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<Item> = Vec::with_capacity(items.len());

    for item in items {
        let key = Fingerprint::of(&item);
        if !seen.insert(key.as_str().to_string()) {
            continue;
        }
        if method == DedupMethod::Content
            && kept
                .iter()
                .any(|k| content_similarity(k, &item) >= similarity_threshold)
        {
            continue;
        }
        kept.push(item);
    }
    kept
}

fn apply_blocklist(items: Vec<Item>, blocklist: &Blocklist) -> Vec<Item> {
    if blocklist.is_empty() {
        return items;
    }
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if let Some(rule) = blocklist.matched_rule(&item) {
            tracing::debug!(
                source = %item.source,
                kind = ?rule.kind,
                value = %rule.value,
                "item blocked"
            );
            counter!("aggregate_blocked_total").increment(1);
            continue;
        }
        kept.push(item);
    }
    kept
}
