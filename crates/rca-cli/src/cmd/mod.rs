pub mod analyze;
pub mod config;
pub mod data;
pub mod incident;
pub mod init;
pub mod rules;

use anyhow::Context;
use rca_core::config::Config;
use rca_core::store::SqliteStore;
use std::path::Path;

/// Config plus an open store: what every store-touching command needs.
pub fn open_store(root: &Path) -> anyhow::Result<(Config, SqliteStore)> {
    let config = Config::load(root).context("failed to load config")?;
    let path = config.store_path(root);
    let store = SqliteStore::open(&path, config.store.query_timeout())
        .with_context(|| format!("failed to open incident store at {}", path.display()))?;
    Ok((config, store))
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
