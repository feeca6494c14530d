// src/fingerprint.rs
// Stable identity for leads. The fingerprint is the tracker's primary key
// and the aggregator's exact-dedup key: same fingerprint, same real-world
// entity.

use std::fmt;

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::item::{normalize_text, normalize_url, Item};

/// Hex-encoded sha256 over an item's canonical identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive from the normalized URL when the item has a link, otherwise
    /// from the normalized `title|description` content.
    pub fn of(item: &Item) -> Self {
        let link = item.link.trim();
        if !link.is_empty() {
            Self(hex_sha256(&normalize_url(link)))
        } else {
            let content = format!(
                "{}|{}",
                normalize_text(&item.title).to_lowercase(),
                normalize_text(&item.description).to_lowercase()
            );
            Self(hex_sha256(&content))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_sha256(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Similarity in [0, 1] between two items' visible content, for fuzzy dedup.
/// Normalized Levenshtein over lowercased, cleaned title + description.
pub fn content_similarity(a: &Item, b: &Item) -> f64 {
    normalized_levenshtein(&comparison_key(a), &comparison_key(b))
}

fn comparison_key(item: &Item) -> String {
    normalize_text(&format!("{} {}", item.title, item.description)).to_lowercase()
}
