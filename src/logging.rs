// src/logging.rs
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber once. RUST_LOG wins over the
/// configured level. Loads `.env` first so backend credentials and
/// LEAD_SCOUT_CONFIG_PATH are visible in local runs. Safe to call more
/// than once; later calls are no-ops.
pub fn init(default_level: &str) {
    let level = default_level.to_string();
    INIT.get_or_init(move || {
        let _ = dotenvy::dotenv();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        // try_init so an embedding application's subscriber wins.
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Init from the `[logging]` config section.
pub fn init_from_config(cfg: &LoggingConfig) {
    init(&cfg.level);
}
