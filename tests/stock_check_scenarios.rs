//! End-to-end check cycles against an in-memory SQLite store
use std::sync::Arc;
use std::time::Duration;

use restock_monitor::application::{ProductOutcome, RunnerSettings, StockCheckRunner};
use restock_monitor::domain::{FailureKind, FetchError, StockStatus, TrackedProduct};
use restock_monitor::infrastructure::{AvailabilityParser, SqliteProductStore};
use restock_monitor::test_utils::{RecordingNotifier, StubPageFetcher, TestDatabase};

const OWNER: &str = "user-42";
const OWNER_EMAIL: &str = "shopper@example.com";

struct Harness {
    db: TestDatabase,
    store: Arc<SqliteProductStore>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    async fn new(products: &[TrackedProduct]) -> Self {
        let db = TestDatabase::new().await.unwrap();
        let store = Arc::new(SqliteProductStore::new(db.pool()));
        store.upsert_user(OWNER, Some(OWNER_EMAIL)).await.unwrap();
        for product in products {
            store.upsert_product(product).await.unwrap();
        }
        Self {
            db,
            store,
            notifier: Arc::new(RecordingNotifier::default().with_user(OWNER, OWNER_EMAIL)),
        }
    }

    fn runner(&self, fetcher: StubPageFetcher) -> StockCheckRunner {
        StockCheckRunner::new(
            self.store.clone(),
            Arc::new(fetcher),
            self.notifier.clone(),
            AvailabilityParser::new().unwrap(),
        )
        .with_settings(RunnerSettings {
            max_concurrency: 3,
            operation_timeout: Duration::from_secs(2),
            fetch_timeout: Duration::from_millis(300),
        })
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        self.db.connection.pool()
    }

    async fn stored(&self, id: &str) -> Option<String> {
        self.store.stored_status(id).await.unwrap()
    }
}

fn tracked(id: &str, status: Option<StockStatus>) -> TrackedProduct {
    let product = TrackedProduct::new(id, page(id), OWNER).with_name(format!("Product {id}"));
    match status {
        Some(status) => product.with_status(status),
        None => product,
    }
}

fn page(id: &str) -> String {
    format!("https://shop.example/dp/{id}")
}

#[tokio::test]
async fn restock_is_persisted_and_emailed() {
    let harness = Harness::new(&[tracked("a", Some(StockStatus::OutOfStock))]).await;
    let fetcher = StubPageFetcher::default().with_availability(&page("a"), "In Stock. Add to Cart");

    let report = harness.runner(fetcher).run().await.unwrap();

    assert_eq!(report.products[0].outcome, ProductOutcome::UpdatedAndNotified);
    assert_eq!(harness.stored("a").await.as_deref(), Some("In Stock"));
    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, OWNER_EMAIL);
    assert_eq!(sent[0].product_name, "Product a");
    assert_eq!(sent[0].product_url, page("a"));
}

#[tokio::test]
async fn going_out_of_stock_is_persisted_silently() {
    let harness = Harness::new(&[tracked("a", Some(StockStatus::InStock))]).await;
    let fetcher = StubPageFetcher::default().with_availability(&page("a"), "Currently unavailable.");

    let report = harness.runner(fetcher).run().await.unwrap();

    assert_eq!(report.products[0].outcome, ProductOutcome::Updated);
    assert_eq!(harness.stored("a").await.as_deref(), Some("Out of Stock"));
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn unchanged_status_is_left_alone() {
    let harness = Harness::new(&[tracked("a", Some(StockStatus::InStock))]).await;
    let fetcher = StubPageFetcher::default().with_availability(&page("a"), "In stock now!");

    let report = harness.runner(fetcher).run().await.unwrap();
    let summary = report.summary();

    assert_eq!(report.products[0].outcome, ProductOutcome::Unchanged);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.notified, 0);
    assert_eq!(harness.stored("a").await.as_deref(), Some("In Stock"));
}

#[tokio::test]
async fn one_slow_page_does_not_hold_up_the_batch() {
    let harness = Harness::new(&[
        tracked("a", Some(StockStatus::OutOfStock)),
        tracked("b", Some(StockStatus::OutOfStock)),
        tracked("c", None),
    ])
    .await;
    let fetcher = StubPageFetcher::default()
        .with_availability(&page("a"), "In Stock")
        .with_hang(&page("b"))
        .with_availability(&page("c"), "Currently unavailable");

    let report = harness.runner(fetcher).run().await.unwrap();
    let summary = report.summary();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(report.product("b").unwrap().outcome, ProductOutcome::Skipped(FailureKind::Timeout));
    assert_eq!(harness.stored("a").await.as_deref(), Some("In Stock"));
    assert_eq!(harness.stored("b").await.as_deref(), Some("Out of Stock"));
    assert_eq!(harness.stored("c").await.as_deref(), Some("Out of Stock"));
}

#[tokio::test]
async fn fetch_error_is_isolated_to_its_product() {
    let harness = Harness::new(&[
        tracked("a", Some(StockStatus::OutOfStock)),
        tracked("b", Some(StockStatus::OutOfStock)),
    ])
    .await;
    let fetcher = StubPageFetcher::default()
        .with_error(
            &page("a"),
            FetchError::Request {
                url: page("a"),
                message: "connection reset by peer".to_string(),
            },
        )
        .with_availability(&page("b"), "Add to Cart");

    let report = harness.runner(fetcher).run().await.unwrap();

    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.product("b").unwrap().outcome, ProductOutcome::UpdatedAndNotified);
    assert_eq!(harness.notifier.sent().len(), 1);
}

#[tokio::test]
async fn monitoring_placeholder_counts_as_first_observation() {
    let harness = Harness::new(&[]).await;
    sqlx::query("INSERT INTO products (id, name, url, user_id, current_status) VALUES (?, ?, ?, ?, 'Monitoring')")
        .bind("legacy")
        .bind("Legacy row")
        .bind(page("legacy"))
        .bind(OWNER)
        .execute(harness.pool())
        .await
        .unwrap();
    let fetcher = StubPageFetcher::default().with_availability(&page("legacy"), "In Stock");

    let report = harness.runner(fetcher).run().await.unwrap();

    assert_eq!(report.products[0].previous_status, None);
    assert_eq!(report.products[0].outcome, ProductOutcome::UpdatedAndNotified);
    assert_eq!(harness.notifier.sent().len(), 1);
    assert_eq!(harness.notifier.attempts(), 1);
    assert_eq!(harness.stored("legacy").await.as_deref(), Some("In Stock"));
}

#[tokio::test]
async fn second_cycle_does_not_renotify() {
    let harness = Harness::new(&[tracked("a", Some(StockStatus::OutOfStock))]).await;

    let first = harness
        .runner(StubPageFetcher::default().with_availability(&page("a"), "In Stock"))
        .run()
        .await
        .unwrap();
    let second = harness
        .runner(StubPageFetcher::default().with_availability(&page("a"), "In Stock"))
        .run()
        .await
        .unwrap();

    assert_eq!(first.summary().notified, 1);
    assert_eq!(second.products[0].outcome, ProductOutcome::Unchanged);
    assert_eq!(harness.notifier.sent().len(), 1);
}
