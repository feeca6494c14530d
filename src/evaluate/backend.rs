// src/evaluate/backend.rs
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::BackendError;
use crate::item::Item;

/// An AI scoring backend. Returns the raw response text for one chunk;
/// parsing happens in the evaluator. Concrete vendor clients live outside
/// this crate.
#[async_trait::async_trait]
pub trait ScoreBackend: Send + Sync {
    async fn score_batch(&self, items: &[Item], criteria: &str) -> Result<String, BackendError>;

    /// Stable name, used in results, logs and the fallback chain config.
    fn name(&self) -> &str;
}

/// Backend double driven by a queue of canned responses. Each call pops
/// the next response; an exhausted queue fails. Records batch sizes so
/// tests can assert chunking.
pub struct ScriptedBackend {
    name: String,
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    batches: Mutex<Vec<usize>>,
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self, raw: impl Into<String>) {
        self.script
            .lock()
            .expect("poisoned script")
            .push_back(Ok(raw.into()));
    }

    pub fn push_err(&self, err: BackendError) {
        self.script
            .lock()
            .expect("poisoned script")
            .push_back(Err(err));
    }

    /// Batch sizes received so far, in call order.
    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().expect("poisoned batches").clone()
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().expect("poisoned batches").len()
    }
}

#[async_trait::async_trait]
impl ScoreBackend for ScriptedBackend {
    async fn score_batch(&self, items: &[Item], _criteria: &str) -> Result<String, BackendError> {
        self.batches
            .lock()
            .expect("poisoned batches")
            .push(items.len());
        self.script
            .lock()
            .expect("poisoned script")
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Other("script exhausted".to_string())))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Offline backend: every item gets the same fixed score. Useful as the
/// last link of a chain when no vendor credentials are configured.
pub struct StaticBackend {
    score: f64,
}

impl StaticBackend {
    pub fn new(score: f64) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
        }
    }
}

#[async_trait::async_trait]
impl ScoreBackend for StaticBackend {
    async fn score_batch(&self, items: &[Item], _criteria: &str) -> Result<String, BackendError> {
        let scores = vec![self.score; items.len()];
        Ok(serde_json::to_string(&scores).unwrap_or_else(|_| "[]".to_string()))
    }

    fn name(&self) -> &str {
        "static"
    }
}
