//! Per-product outcomes and the summary handed back to the trigger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::FailureKind;
use crate::domain::product::{StockStatus, TrackedProduct};

pub const NO_PRODUCTS_MESSAGE: &str = "No products to check.";
pub const COMPLETED_MESSAGE: &str = "Stock check complete.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ProductOutcome {
    Unchanged,
    Updated,
    UpdatedAndNotified,
    Skipped(FailureKind),
}

impl fmt::Display for ProductOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("unchanged"),
            Self::Updated => f.write_str("updated"),
            Self::UpdatedAndNotified => f.write_str("updated+notified"),
            Self::Skipped(kind) => write!(f, "skipped: {kind}"),
        }
    }
}

/// What happened to one product during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReport {
    pub product_id: String,
    pub product_name: String,
    pub previous_status: Option<StockStatus>,
    /// Classified status, `None` if the page was never classified
    pub observed_status: Option<StockStatus>,
    pub outcome: ProductOutcome,
    /// Set when the status was persisted but the owner could not be emailed
    pub notification_failure: Option<FailureKind>,
    pub error: Option<String>,
}

impl ProductReport {
    pub fn new(product: &TrackedProduct, observed_status: Option<StockStatus>, outcome: ProductOutcome) -> Self {
        Self {
            product_id: product.id.clone(),
            product_name: product.display_name().to_string(),
            previous_status: product.current_status,
            observed_status,
            outcome,
            notification_failure: None,
            error: None,
        }
    }

    pub fn skipped(
        product: &TrackedProduct,
        observed_status: Option<StockStatus>,
        kind: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(product, observed_status, ProductOutcome::Skipped(kind))
        }
    }

    /// Status written, notification not delivered
    pub fn updated_without_notification(
        product: &TrackedProduct,
        observed_status: StockStatus,
        kind: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            notification_failure: Some(kind),
            error: Some(error.into()),
            ..Self::new(product, Some(observed_status), ProductOutcome::Updated)
        }
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, ProductOutcome::Skipped(_)) || self.notification_failure.is_some()
    }

    pub const fn was_updated(&self) -> bool {
        matches!(self.outcome, ProductOutcome::Updated | ProductOutcome::UpdatedAndNotified)
    }
}

/// Counts reported back to whoever triggered the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub checked: usize,
    pub updated: usize,
    pub notified: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub const fn message(&self) -> &'static str {
        if self.total == 0 { NO_PRODUCTS_MESSAGE } else { COMPLETED_MESSAGE }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked={} updated={} notified={} failed={}",
            self.message(),
            self.checked,
            self.updated,
            self.notified,
            self.failed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In snapshot order
    pub products: Vec<ProductReport>,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        self.products.iter().fold(
            BatchSummary {
                total: self.products.len(),
                ..BatchSummary::default()
            },
            |mut summary, report| {
                if report.observed_status.is_some() {
                    summary.checked += 1;
                }
                if report.was_updated() {
                    summary.updated += 1;
                }
                if report.outcome == ProductOutcome::UpdatedAndNotified {
                    summary.notified += 1;
                }
                if report.is_failure() {
                    summary.failed += 1;
                }
                summary
            },
        )
    }

    pub fn product(&self, product_id: &str) -> Option<&ProductReport> {
        self.products.iter().find(|report| report.product_id == product_id)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProductReport> {
        self.products.iter().filter(|report| report.is_failure())
    }
}

/// JSON body returned to the trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStockResponse {
    pub message: String,
    pub run_id: Uuid,
    #[serde(flatten)]
    pub summary: BatchSummary,
}

impl From<&BatchReport> for CheckStockResponse {
    fn from(report: &BatchReport) -> Self {
        let summary = report.summary();
        Self {
            message: summary.message().to_string(),
            run_id: report.run_id,
            summary,
        }
    }
}
