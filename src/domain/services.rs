//! 재고 확인 엔진이 사용하는 외부 서비스 트레이트 정의
//!
//! Page download and owner notification are the two side-effecting
//! collaborators of a check cycle.

use async_trait::async_trait;

use crate::domain::errors::{DeliveryError, FetchError, UserLookupError};

/// Downloads a product page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Single GET without retries; returns the body of a 2xx response
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Tells a product's owner that it is back in stock
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn resolve_email(&self, user_id: &str) -> Result<String, UserLookupError>;

    async fn send_restock_email(
        &self,
        email: &str,
        product_name: &str,
        product_url: &str,
    ) -> Result<(), DeliveryError>;
}
