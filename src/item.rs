// src/item.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One candidate lead returned by a search provider. Ephemeral: items live
/// for the duration of a search round; the tracker keeps its own snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Provider-assigned id. Not trusted as globally unique.
    pub id: String,
    pub title: String,
    pub link: String,
    /// Free-text body. Used by keyword blocking and content fingerprints.
    #[serde(default)]
    pub description: String,
    /// Name of the provider that produced the item.
    #[serde(default)]
    pub source: String,
    /// Provider-specific extras, e.g. "company" or "location".
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            link: link.into(),
            description: description.into(),
            source: String::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// String view of an extra field, if present and a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}

/// Query parameters that carry tracking state, not identity.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "gclid",
    "fbclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "ref",
    "referrer",
    "src",
];

/// Normalize text for comparison keys: decode HTML entities, strip tags,
/// fold smart quotes, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Canonicalize a URL so tracking noise does not defeat dedup.
///
/// Rules: force https, lowercase host, drop the fragment, drop tracking
/// query params, sort the rest, no trailing slash on non-root paths.
/// Strings without a scheme are returned trimmed, unchanged otherwise.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };

    let scheme = &url[..scheme_end];
    let scheme = if scheme.eq_ignore_ascii_case("http") {
        "https".to_string()
    } else {
        scheme.to_ascii_lowercase()
    };

    // Fragment never participates in identity.
    let rest = &url[scheme_end + 3..];
    let rest = match rest.find('#') {
        Some(pos) => &rest[..pos],
        None => rest,
    };

    // The authority ends at the first '/' or '?': a query can follow the
    // host directly, with no path in between.
    let authority_end = match (rest.find('/'), rest.find('?')) {
        (Some(slash), Some(question)) => slash.min(question),
        (Some(slash), None) => slash,
        (None, Some(question)) => question,
        (None, None) => rest.len(),
    };
    let host = rest[..authority_end].to_lowercase();
    let path_query = &rest[authority_end..];

    let (path, query) = match path_query.find('?') {
        Some(pos) => (&path_query[..pos], Some(&path_query[pos + 1..])),
        None => (path_query, None),
    };

    let path = if path.is_empty() {
        "/"
    } else if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    };

    match query.and_then(clean_query) {
        Some(q) => format!("{scheme}://{host}{path}?{q}"),
        None => format!("{scheme}://{host}{path}"),
    }
}

/// Drop tracking params, sort the rest. None when nothing survives.
fn clean_query(raw: &str) -> Option<String> {
    let mut pairs: Vec<(String, &str)> = raw
        .split('&')
        .filter_map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            if key.is_empty() {
                return None;
            }
            let key = key.to_lowercase();
            if TRACKING_PARAMS.contains(&key.as_str()) {
                return None;
            }
            Some((key, value))
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort();
    Some(
        pairs
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Senior&nbsp;Rust</b>   Engineer\n(remote) ";
        assert_eq!(normalize_text(s), "Senior Rust Engineer (remote)");
    }

    #[test]
    fn normalize_url_canonical_form() {
        assert_eq!(
            normalize_url("http://Jobs.Example.COM/listing/42/?utm_source=x&id=9#apply"),
            "https://jobs.example.com/listing/42?id=9"
        );
    }

    #[test]
    fn normalize_url_sorts_query() {
        assert_eq!(
            normalize_url("https://example.com/p?b=2&a=1"),
            normalize_url("https://example.com/p?a=1&b=2")
        );
    }

    #[test]
    fn normalize_url_keeps_root_slash() {
        assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
        assert_eq!(normalize_url("https://example.com"), "https://example.com/");
    }

    #[test]
    fn normalize_url_query_without_path() {
        assert_eq!(
            normalize_url("https://example.com?b=2&a=1"),
            "https://example.com/?a=1&b=2"
        );
        assert_eq!(
            normalize_url("https://example.com?b=2&a=1"),
            normalize_url("https://example.com/?b=2&a=1")
        );
        assert_eq!(
            normalize_url("https://Example.com?utm_source=feed"),
            "https://example.com/"
        );
    }

    #[test]
    fn normalize_url_without_scheme_is_left_alone() {
        assert_eq!(normalize_url("  not a url  "), "not a url");
    }

    #[test]
    fn field_str_reads_string_extras() {
        let item = Item::new("1", "t", "https://x.com/a", "d").with_field("company", "Acme");
        assert_eq!(item.field_str("company"), Some("Acme"));
        assert_eq!(item.field_str("missing"), None);
    }
}
