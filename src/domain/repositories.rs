//! Repository interfaces consumed by the stock-check engine
//!
//! The concrete storage lives outside the engine; these traits are the only
//! surface it needs.

use async_trait::async_trait;

use crate::domain::errors::{StoreError, UserLookupError};
use crate::domain::product::{StockStatus, TrackedProduct};

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Every tracked product regardless of owner
    async fn list_all(&self) -> Result<Vec<TrackedProduct>, StoreError>;

    /// Overwrite the `current_status` of a single product
    async fn update_status(&self, product_id: &str, status: StockStatus) -> Result<(), StoreError>;
}

/// Identity lookup used to address restock emails
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when the user exists but has no address on file
    async fn find_email(&self, user_id: &str) -> Result<Option<String>, UserLookupError>;
}
