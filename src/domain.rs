//! Domain module - stock-check entities, rules and collaborator interfaces
//!
//! Everything in here is free of I/O; adapters live in `infrastructure`.

pub mod errors;
pub mod notification;
pub mod product;
pub mod repositories;
pub mod services;
pub mod status_classifier;
pub mod transition;

// Re-export commonly used items
pub use errors::{BatchError, DeliveryError, FailureKind, FetchError, StoreError, UserLookupError};
pub use notification::RestockEmail;
pub use product::{StockStatus, TrackedProduct};
pub use repositories::{ProductStore, UserDirectory};
pub use services::{Notifier, PageFetcher};
pub use status_classifier::StatusClassifier;
pub use transition::TransitionDecision;
