//! Test utilities for the stock-check engine
//!
//! In-memory stand-ins for every collaborator of a check cycle plus an
//! isolated SQLite database, so unit and integration tests never touch the
//! network or a shared file.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::errors::{DeliveryError, FetchError, StoreError, UserLookupError};
use crate::domain::product::{StockStatus, TrackedProduct};
use crate::domain::repositories::{ProductStore, UserDirectory};
use crate::domain::services::{Notifier, PageFetcher};
use crate::infrastructure::DatabaseConnection;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Minimal product page with the given availability text
pub fn availability_page(text: &str) -> String {
    format!(
        r#"<html><head><title>Product</title></head><body>
            <div id="centerCol">
              <div id="availability" class="a-section"><span class="a-size-medium">{text}</span></div>
            </div>
        </body></html>"#
    )
}

/// Fresh in-memory database with the schema applied
pub struct TestDatabase {
    pub connection: DatabaseConnection,
}

impl TestDatabase {
    pub async fn new() -> Result<Self> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        db.migrate().await?;
        Ok(Self { connection: db })
    }

    pub fn pool(&self) -> sqlx::Pool<sqlx::Sqlite> {
        self.connection.pool().clone()
    }
}

#[derive(Debug, Clone)]
enum StubResponse {
    Page(String),
    Fail(FetchError),
    /// Never completes; exercises timeouts and cancellation
    Hang,
}

/// [`PageFetcher`] serving canned pages per URL
#[derive(Debug, Default)]
pub struct StubPageFetcher {
    responses: HashMap<String, StubResponse>,
    requested: Mutex<Vec<String>>,
}

impl StubPageFetcher {
    #[must_use]
    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.responses.insert(url.to_string(), StubResponse::Page(html.into()));
        self
    }

    #[must_use]
    pub fn with_availability(self, url: &str, text: &str) -> Self {
        self.with_page(url, availability_page(text))
    }

    #[must_use]
    pub fn with_error(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), StubResponse::Fail(error));
        self
    }

    #[must_use]
    pub fn with_hang(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), StubResponse::Hang);
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl PageFetcher for StubPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        lock(&self.requested).push(url.to_string());
        match self.responses.get(url).cloned() {
            Some(StubResponse::Page(html)) => Ok(html),
            Some(StubResponse::Fail(error)) => Err(error),
            Some(StubResponse::Hang) => std::future::pending().await,
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// [`ProductStore`] over a vector, recording every status write
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: Mutex<Vec<TrackedProduct>>,
    updates: Mutex<Vec<(String, StockStatus)>>,
    failing_updates: HashSet<String>,
    list_unavailable: bool,
}

impl InMemoryProductStore {
    pub fn new(products: Vec<TrackedProduct>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    /// `update_status` for this id fails with a backend error
    #[must_use]
    pub fn failing_update_for(mut self, product_id: &str) -> Self {
        self.failing_updates.insert(product_id.to_string());
        self
    }

    #[must_use]
    pub const fn with_list_unavailable(mut self) -> Self {
        self.list_unavailable = true;
        self
    }

    pub fn updates(&self) -> Vec<(String, StockStatus)> {
        lock(&self.updates).clone()
    }

    pub fn status_of(&self, product_id: &str) -> Option<StockStatus> {
        lock(&self.products)
            .iter()
            .find(|p| p.id == product_id)
            .and_then(|p| p.current_status)
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn list_all(&self) -> Result<Vec<TrackedProduct>, StoreError> {
        if self.list_unavailable {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        Ok(lock(&self.products).clone())
    }

    async fn update_status(&self, product_id: &str, status: StockStatus) -> Result<(), StoreError> {
        lock(&self.updates).push((product_id.to_string(), status));

        if self.failing_updates.contains(product_id) {
            return Err(StoreError::Backend("database is locked".to_string()));
        }

        let mut products = lock(&self.products);
        let product = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| StoreError::NotFound {
                product_id: product_id.to_string(),
            })?;
        product.current_status = Some(status);
        Ok(())
    }
}

/// [`UserDirectory`] backed by a fixed map
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: HashMap<String, Option<String>>,
}

impl StaticUserDirectory {
    #[must_use]
    pub fn with_user(mut self, user_id: &str, email: Option<&str>) -> Self {
        self.users.insert(user_id.to_string(), email.map(str::to_string));
        self
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_email(&self, user_id: &str) -> Result<Option<String>, UserLookupError> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| UserLookupError::NotFound {
                user_id: user_id.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub email: String,
    pub product_name: String,
    pub product_url: String,
}

/// [`Notifier`] that records deliveries instead of sending them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    directory: StaticUserDirectory,
    sent: Mutex<Vec<SentEmail>>,
    attempts: Mutex<usize>,
    delivery_failure: Option<DeliveryError>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn with_user(mut self, user_id: &str, email: &str) -> Self {
        self.directory = self.directory.with_user(user_id, Some(email));
        self
    }

    /// Every send fails with `error`
    #[must_use]
    pub fn failing_with(mut self, error: DeliveryError) -> Self {
        self.delivery_failure = Some(error);
        self
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        lock(&self.sent).clone()
    }

    pub fn attempts(&self) -> usize {
        *lock(&self.attempts)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn resolve_email(&self, user_id: &str) -> Result<String, UserLookupError> {
        self.directory
            .find_email(user_id)
            .await?
            .ok_or_else(|| UserLookupError::NoEmail {
                user_id: user_id.to_string(),
            })
    }

    async fn send_restock_email(
        &self,
        email: &str,
        product_name: &str,
        product_url: &str,
    ) -> Result<(), DeliveryError> {
        *lock(&self.attempts) += 1;
        if let Some(error) = &self.delivery_failure {
            return Err(error.clone());
        }
        lock(&self.sent).push(SentEmail {
            email: email.to_string(),
            product_name: product_name.to_string(),
            product_url: product_url.to_string(),
        });
        Ok(())
    }
}
