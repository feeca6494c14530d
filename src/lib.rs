// src/lib.rs
// Public library surface: a search-match-evaluate pipeline for leads from
// unreliable sources. Providers and scoring backends are consumed traits;
// this crate owns the coordination, dedup, fallback and persistence logic.

pub mod aggregate;
pub mod blocklist;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod fingerprint;
pub mod item;
pub mod logging;
pub mod metrics;
pub mod throttle;
pub mod track;

// ---- Re-exports for stable public API ----
pub use aggregate::{Aggregator, Provider, SearchReport, SourceTally};
pub use blocklist::{BlockKind, BlockRule, Blocklist};
pub use config::Config;
pub use error::{
    AggregationError, BackendError, EvaluationParseError, PersistenceError, ProviderError,
    TrackError,
};
pub use evaluate::{EvaluationResult, Evaluator, ScoreBackend, ScriptedBackend, StaticBackend};
pub use fingerprint::Fingerprint;
pub use item::Item;
pub use throttle::{RateGate, RetryPolicy};
pub use track::{ExportFormat, Status, StatusChange, TrackedRecord, Tracker};
