//! Tracked product entity and its availability status
//!
//! A tracked product is owned by the web surface that creates it; the
//! stock-check engine only reads the snapshot and rewrites `current_status`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of availability states a product page can be classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    /// Fallback when no rule recognized the page's availability text
    CheckManually,
}

impl StockStatus {
    pub const ALL: [Self; 3] = [Self::InStock, Self::OutOfStock, Self::CheckManually];

    /// Display string as persisted in the `products.current_status` column
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::OutOfStock => "Out of Stock",
            Self::CheckManually => "Check Manually",
        }
    }

    /// Read a persisted status value.
    ///
    /// Anything that is not one of the known statuses (NULL, or the
    /// `"Monitoring"` placeholder written on creation) counts as unset.
    pub fn from_stored(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStockStatus(pub String);

impl fmt::Display for UnknownStockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stock status: {:?}", self.0)
    }
}

impl std::error::Error for UnknownStockStatus {}

impl FromStr for StockStatus {
    type Err = UnknownStockStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', " ");
        match normalized.as_str() {
            "in stock" => Ok(Self::InStock),
            "out of stock" => Ok(Self::OutOfStock),
            "check manually" => Ok(Self::CheckManually),
            _ => Err(UnknownStockStatus(s.to_string())),
        }
    }
}

/// A user-owned record pairing a monitored URL with its last-known status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProduct {
    pub id: String,
    /// Display name entered by the owner, may be missing
    pub name: Option<String>,
    pub url: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "currentStatus")]
    pub current_status: Option<StockStatus>,
}

impl TrackedProduct {
    pub fn new(id: impl Into<String>, url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            url: url.into(),
            user_id: user_id.into(),
            current_status: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: StockStatus) -> Self {
        self.current_status = Some(status);
        self
    }

    /// Name used in logs and emails; falls back to the URL when unnamed
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.url)
    }
}
