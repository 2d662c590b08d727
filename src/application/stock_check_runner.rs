//! One stock-check cycle over every tracked product
//!
//! Products are processed independently by a bounded pool. Whatever goes
//! wrong for one product is recorded in its [`ProductReport`] and the batch
//! carries on; only failing to load the product list aborts the run.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::application::batch_report::{BatchReport, ProductOutcome, ProductReport};
use crate::domain::errors::{BatchError, FailureKind, StoreError};
use crate::domain::product::{StockStatus, TrackedProduct};
use crate::domain::repositories::ProductStore;
use crate::domain::services::{Notifier, PageFetcher};
use crate::domain::status_classifier::StatusClassifier;
use crate::domain::transition::TransitionDecision;
use crate::infrastructure::availability_parser::AvailabilityParser;
use crate::infrastructure::config::{FetcherConfig, RunnerConfig};

/// Slack on top of the HTTP client's own timeout before the runner gives up
const FETCH_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    pub max_concurrency: usize,
    /// Bound for each store and notifier call
    pub operation_timeout: Duration,
    /// Bound for a page download
    pub fetch_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default(), &FetcherConfig::default())
    }
}

impl RunnerSettings {
    pub fn from_config(runner: &RunnerConfig, fetcher: &FetcherConfig) -> Self {
        Self {
            max_concurrency: runner.max_concurrency.max(1),
            operation_timeout: Duration::from_secs(runner.operation_timeout_seconds),
            fetch_timeout: Duration::from_secs(fetcher.timeout_seconds) + FETCH_TIMEOUT_GRACE,
        }
    }
}

/// Failure of a single step, already categorized for the report
#[derive(Debug)]
struct StepFailure {
    kind: FailureKind,
    message: String,
}

pub struct StockCheckRunner {
    store: Arc<dyn ProductStore>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    parser: AvailabilityParser,
    classifier: StatusClassifier,
    settings: RunnerSettings,
}

impl StockCheckRunner {
    pub fn new(
        store: Arc<dyn ProductStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
        parser: AvailabilityParser,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            parser,
            classifier: StatusClassifier::new(),
            settings: RunnerSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
        self.settings = RunnerSettings {
            max_concurrency: settings.max_concurrency.max(1),
            ..settings
        };
        self
    }

    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Run one check cycle to completion
    pub async fn run(&self) -> Result<BatchReport, BatchError> {
        self.run_with_cancellation(CancellationToken::new()).await
    }

    /// Run one check cycle; products still pending when `cancel` fires are
    /// reported as skipped. Status updates already written stay written.
    pub async fn run_with_cancellation(&self, cancel: CancellationToken) -> Result<BatchReport, BatchError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "🚀 Stock check started");

        let products = match self.load_snapshot().await {
            Ok(products) => products,
            Err(e) => {
                error!(%run_id, "❌ Could not load tracked products: {}", e);
                return Err(BatchError::from(e));
            }
        };

        if products.is_empty() {
            info!(%run_id, "No products to check.");
        } else {
            info!(%run_id, "Checking {} products (concurrency {})", products.len(), self.settings.max_concurrency);
        }

        let reports: Vec<ProductReport> = stream::iter(products)
            .map(|product| {
                let cancel = cancel.clone();
                async move { self.check_product_cancellable(run_id, &product, &cancel).await }
            })
            .buffered(self.settings.max_concurrency)
            .collect()
            .await;

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            products: reports,
        };
        info!(%run_id, "🏁 {}", report.summary());
        Ok(report)
    }

    async fn load_snapshot(&self) -> Result<Vec<TrackedProduct>, StoreError> {
        tokio::time::timeout(self.settings.operation_timeout, self.store.list_all())
            .await
            .map_err(|_| {
                StoreError::Backend(format!(
                    "listing products timed out after {}s",
                    self.settings.operation_timeout.as_secs()
                ))
            })?
    }

    async fn check_product_cancellable(
        &self,
        run_id: Uuid,
        product: &TrackedProduct,
        cancel: &CancellationToken,
    ) -> ProductReport {
        if cancel.is_cancelled() {
            return ProductReport::skipped(product, None, FailureKind::Cancelled, "run cancelled before start");
        }

        let span = info_span!("product", %run_id, product_id = %product.id);
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(product_id = %product.id, "Run cancelled while checking product");
                ProductReport::skipped(product, None, FailureKind::Cancelled, "run cancelled")
            }
            report = self.check_product(product).instrument(span) => report,
        }
    }

    /// fetch → extract → classify → detect → persist → notify
    pub async fn check_product(&self, product: &TrackedProduct) -> ProductReport {
        info!("Checking product: {}", product.display_name());

        let fetch = self.fetcher.fetch_page(&product.url);
        let html = match guarded(self.settings.fetch_timeout, "page fetch", fetch).await {
            Ok(html) => html,
            Err(failure) => {
                warn!("  Error checking product {}: {}", product.display_name(), failure.message);
                return ProductReport::skipped(product, None, failure.kind, failure.message);
            }
        };

        let fragment = self.parser.extract(&html);
        let new_status = self.classifier.classify(&fragment);
        debug!("  Found stock text: {:?} -> {}", fragment, new_status);

        let decision = TransitionDecision::detect(product.current_status, new_status);
        if !decision.changed {
            info!("  Status unchanged ({})", new_status);
            return ProductReport::new(product, Some(new_status), ProductOutcome::Unchanged);
        }

        let update = self.store.update_status(&product.id, new_status);
        if let Err(failure) = guarded(self.settings.operation_timeout, "status update", update).await {
            warn!("  Failed to persist status {} for {}: {}", new_status, product.id, failure.message);
            return ProductReport::skipped(product, Some(new_status), failure.kind, failure.message);
        }
        info!("  Status changed to: {} (was {})", new_status, status_label(product.current_status));

        if !decision.should_notify {
            return ProductReport::new(product, Some(new_status), ProductOutcome::Updated);
        }

        match self.notify_owner(product).await {
            Ok(()) => ProductReport::new(product, Some(new_status), ProductOutcome::UpdatedAndNotified),
            Err(failure) => {
                warn!("  Restock notification failed for {}: {}", product.id, failure.message);
                ProductReport::updated_without_notification(product, new_status, failure.kind, failure.message)
            }
        }
    }

    async fn notify_owner(&self, product: &TrackedProduct) -> Result<(), StepFailure> {
        let limit = self.settings.operation_timeout;
        let email = guarded(limit, "user lookup", self.notifier.resolve_email(&product.user_id)).await?;

        let delivery = self
            .notifier
            .send_restock_email(&email, product.display_name(), &product.url);
        guarded(limit, "email delivery", delivery).await
    }
}

async fn guarded<T, E, F>(limit: Duration, operation: &str, future: F) -> Result<T, StepFailure>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
    for<'e> FailureKind: From<&'e E>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StepFailure {
            kind: FailureKind::from(&e),
            message: e.to_string(),
        }),
        Err(_) => Err(StepFailure {
            kind: FailureKind::Timeout,
            message: format!("{operation} timed out after {}s", limit.as_secs()),
        }),
    }
}

fn status_label(status: Option<StockStatus>) -> &'static str {
    status.map_or("unset", StockStatus::as_str)
}
