//! Infrastructure layer for the database, HTTP, parsing and email integrations
//!
//! Every adapter here implements one of the domain ports so the runner can
//! be wired against real services or the fakes in `test_utils`.

pub mod availability_parser;
pub mod config;
pub mod database_connection;
pub mod email_notifier;
pub mod http_client;
pub mod logging;
pub mod parsing_error;
pub mod product_repository;

// Re-export commonly used items
pub use availability_parser::AvailabilityParser;
pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use email_notifier::EmailNotifier;
pub use http_client::{HttpClientConfig, HttpPageFetcher};
pub use parsing_error::{ParsingError, ParsingResult};
pub use product_repository::SqliteProductStore;
