//! Error taxonomy for one stock-check cycle
//!
//! Every error here except [`BatchError`] is scoped to a single product and
//! ends up as a [`FailureKind`] in the batch report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page could not be downloaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid product URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Product store read or write failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("product {product_id} no longer exists")]
    NotFound { product_id: String },

    #[error("product store unavailable: {0}")]
    Backend(String),
}

/// Owner of a product could not be turned into an email address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserLookupError {
    #[error("user {user_id} not found")]
    NotFound { user_id: String },

    #[error("user {user_id} has no email address")]
    NoEmail { user_id: String },

    #[error("user directory unavailable: {0}")]
    Backend(String),
}

/// Email provider did not accept the message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("email provider rejected the message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("email provider unreachable: {0}")]
    Transport(String),

    #[error("email provider timed out")]
    Timeout,
}

/// The only condition that fails a whole invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("could not load tracked products: {0}")]
    ProductListUnavailable(#[from] StoreError),
}

/// Per-product failure category recorded in the batch report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    StoreUpdate,
    UserLookup,
    Delivery,
    Timeout,
    Cancelled,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::StoreUpdate => "store_update",
            Self::UserLookup => "user_lookup",
            Self::Delivery => "delivery",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&FetchError> for FailureKind {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::Timeout { .. } => Self::Timeout,
            _ => Self::Fetch,
        }
    }
}

impl From<&DeliveryError> for FailureKind {
    fn from(error: &DeliveryError) -> Self {
        match error {
            DeliveryError::Timeout => Self::Timeout,
            _ => Self::Delivery,
        }
    }
}

impl From<&StoreError> for FailureKind {
    fn from(_: &StoreError) -> Self {
        Self::StoreUpdate
    }
}

impl From<&UserLookupError> for FailureKind {
    fn from(_: &UserLookupError) -> Self {
        Self::UserLookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let timeout = FetchError::Timeout { url: "https://a.example".into() };
        let refused = FetchError::Request { url: "https://a.example".into(), message: "refused".into() };
        assert_eq!(FailureKind::from(&timeout), FailureKind::Timeout);
        assert_eq!(FailureKind::from(&refused), FailureKind::Fetch);
        assert_eq!(FailureKind::from(&DeliveryError::Timeout), FailureKind::Timeout);
        assert_eq!(FailureKind::from(&DeliveryError::Transport("dns".into())), FailureKind::Delivery);
        assert_eq!(FailureKind::from(&StoreError::Backend("locked".into())), FailureKind::StoreUpdate);
    }

    #[test]
    fn test_batch_error_wraps_store_error() {
        let error = BatchError::from(StoreError::Backend("disk I/O error".into()));
        assert_eq!(error.to_string(), "could not load tracked products: product store unavailable: disk I/O error");
    }
}
