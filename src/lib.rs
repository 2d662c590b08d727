//! Restock Monitor - product availability tracking
//!
//! Periodically checks tracked product pages, records each product's stock
//! status and emails the owner when an item comes back in stock.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod test_utils;

use std::sync::Arc;

use anyhow::Context;

use crate::application::{RunnerSettings, StockCheckRunner};
use crate::infrastructure::{
    AppConfig, AvailabilityParser, DatabaseConnection, EmailNotifier, HttpPageFetcher, SqliteProductStore,
};

/// Wire the production adapters for one check cycle
pub fn build_runner(config: &AppConfig, database: &DatabaseConnection) -> anyhow::Result<StockCheckRunner> {
    let store = Arc::new(SqliteProductStore::new(database.pool().clone()));
    let fetcher = HttpPageFetcher::from_fetcher_config(&config.fetcher).context("Failed to build HTTP client")?;
    let notifier = EmailNotifier::new(config.notifier.clone(), store.clone())
        .context("Failed to build email notifier")?;
    let parser = AvailabilityParser::with_selector(&config.extractor.availability_selector)
        .context("Invalid availability selector")?;

    Ok(StockCheckRunner::new(store, Arc::new(fetcher), Arc::new(notifier), parser)
        .with_settings(RunnerSettings::from_config(&config.runner, &config.fetcher)))
}
