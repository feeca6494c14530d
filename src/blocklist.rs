// src/blocklist.rs
// Rules that exclude items from search results. Matching is pure and
// case-insensitive: a rule value is a substring of the field its kind
// inspects.

use serde::{Deserialize, Serialize};

use crate::item::Item;

/// Which part of an item a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Matches against the item link.
    Site,
    /// Matches against the "company" field, falling back to the source name.
    Employer,
    /// Matches against title or description.
    Keyword,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRule {
    pub kind: BlockKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BlockRule {
    pub fn new(kind: BlockKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            reason: None,
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        let needle = self.value.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        match self.kind {
            BlockKind::Site => item.link.to_lowercase().contains(&needle),
            BlockKind::Employer => {
                item.field_str("company")
                    .map(|c| c.to_lowercase().contains(&needle))
                    .unwrap_or(false)
                    || item.source.to_lowercase().contains(&needle)
            }
            BlockKind::Keyword => {
                item.title.to_lowercase().contains(&needle)
                    || item.description.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Ordered rule set. The first matching rule is reported so logs can say
/// why an item was dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blocklist {
    rules: Vec<BlockRule>,
}

impl Blocklist {
    pub fn new(rules: Vec<BlockRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn matched_rule(&self, item: &Item) -> Option<&BlockRule> {
        self.rules.iter().find(|r| r.matches(item))
    }

    pub fn is_blocked(&self, item: &Item) -> bool {
        self.matched_rule(item).is_some()
    }
}
