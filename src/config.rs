// src/config.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::blocklist::BlockRule;

const ENV_PATH: &str = "LEAD_SCOUT_CONFIG_PATH";

/// Recognized configuration. Every section has built-in defaults, so a
/// partial file (or no file at all) still yields a working config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub evaluation: EvaluationConfig,
    pub deduplication: DedupConfig,
    pub llm: LlmConfig,
    pub rate_limiting: RateLimitConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
    pub blocked_entities: Vec<BlockRule>,
    pub providers: BTreeMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Caller-side cutoff for "worth tracking".
    pub score_threshold: f64,
    pub batch_size: usize,
    /// Free-text criteria handed to scoring backends.
    pub criteria: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            batch_size: 10,
            criteria: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMethod {
    /// Exact keys only: normalized URL, content hash for linkless items.
    Url,
    /// Exact keys plus fuzzy title+description similarity.
    Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub enabled: bool,
    pub method: DedupMethod,
    pub similarity_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method: DedupMethod::Url,
            similarity_threshold: 0.85,
        }
    }
}

/// Scoring backend preferences. `max_tokens` and `temperature` are passed
/// through to concrete backend constructors; the evaluator itself only
/// consumes the chain order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub default_provider: String,
    pub fallback_chain: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: "openai".to_string(),
            fallback_chain: vec![
                "openai".to_string(),
                "anthropic".to_string(),
                "gemini".to_string(),
                "ollama".to_string(),
            ],
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub calls_per_second: u32,
    pub retry_attempts: u32,
    pub retry_delay_seconds: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            calls_per_second: 2,
            retry_attempts: 3,
            retry_delay_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub storage_path: PathBuf,
    pub auto_backup: bool,
    pub backup_interval_hours: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data/tracked_leads.json"),
            auto_backup: false,
            backup_interval_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub max_results: usize,
    /// Lower numbers run first and win dedup ties.
    pub priority: i32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results: 25,
            priority: 100,
        }
    }
}

impl Config {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $LEAD_SCOUT_CONFIG_PATH
    /// 2) config/lead_scout.toml
    /// 3) config/lead_scout.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("LEAD_SCOUT_CONFIG_PATH points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/lead_scout.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/lead_scout.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<Config> {
    // JSON configs start with an object; everything else smells like TOML.
    let try_toml_first = hint_ext == "toml" || !s.trim_start().starts_with('{');
    if try_toml_first {
        if let Ok(cfg) = toml::from_str(s) {
            return Ok(cfg);
        }
    }
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }
    if !try_toml_first {
        if let Ok(cfg) = toml::from_str(s) {
            return Ok(cfg);
        }
    }
    Err(anyhow!("unsupported config format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::BlockKind;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.evaluation.score_threshold, 0.7);
        assert_eq!(cfg.evaluation.batch_size, 10);
        assert!(cfg.deduplication.enabled);
        assert_eq!(cfg.deduplication.method, DedupMethod::Url);
        assert_eq!(cfg.deduplication.similarity_threshold, 0.85);
        assert_eq!(cfg.rate_limiting.calls_per_second, 2);
        assert_eq!(cfg.rate_limiting.retry_attempts, 3);
        assert_eq!(cfg.llm.fallback_chain.first().map(String::as_str), Some("openai"));
        assert_eq!(cfg.tracking.storage_path, PathBuf::from("data/tracked_leads.json"));
        assert!(!cfg.tracking.auto_backup);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn partial_toml_merges_over_defaults() {
        let toml = r#"
            [deduplication]
            method = "content"
            similarity_threshold = 0.9

            [[blocked_entities]]
            kind = "site"
            value = "spam.com"

            [providers.boardfeed]
            priority = 1
            max_results = 5
        "#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.deduplication.method, DedupMethod::Content);
        assert_eq!(cfg.deduplication.similarity_threshold, 0.9);
        // untouched sections keep defaults
        assert_eq!(cfg.evaluation.batch_size, 10);
        assert_eq!(cfg.blocked_entities.len(), 1);
        assert_eq!(cfg.blocked_entities[0].kind, BlockKind::Site);
        let p = cfg.providers.get("boardfeed").unwrap();
        assert_eq!(p.priority, 1);
        assert_eq!(p.max_results, 5);
        assert!(p.enabled);
    }

    #[test]
    fn json_config_parses() {
        let json = r#"{
            "rate_limiting": {"enabled": false, "calls_per_second": 9},
            "llm": {"fallback_chain": ["scripted"]}
        }"#;
        let cfg = parse_config(json, "json").unwrap();
        assert!(!cfg.rate_limiting.enabled);
        assert_eq!(cfg.rate_limiting.calls_per_second, 9);
        assert_eq!(cfg.llm.fallback_chain, vec!["scripted".to_string()]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_config(":::", "toml").is_err());
    }
}
