//! SQLite-backed product store and user directory
//!
//! Reads the whole `products` table for each check cycle and writes back
//! only the `current_status` column of one row at a time.

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::{StoreError, UserLookupError};
use crate::domain::product::{StockStatus, TrackedProduct};
use crate::domain::repositories::{ProductStore, UserDirectory};

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        Self::Backend(error.to_string())
    }
}

#[derive(Clone)]
pub struct SqliteProductStore {
    pool: Arc<SqlitePool>,
}

impl SqliteProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Insert or replace a product row; used by tooling and tests
    pub async fn upsert_product(&self, product: &TrackedProduct) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO products (id, name, url, user_id, current_status)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.url)
        .bind(&product.user_id)
        .bind(product.current_status.map(StockStatus::as_str))
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a user row; used by tooling and tests
    pub async fn upsert_user(&self, user_id: &str, email: Option<&str>) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO users (id, email) VALUES (?, ?)")
            .bind(user_id)
            .bind(email)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    /// Raw `current_status` column, for inspecting what the engine wrote
    pub async fn stored_status(&self, product_id: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT current_status FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&*self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                product_id: product_id.to_string(),
            })?;
        Ok(row.try_get("current_status")?)
    }
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn list_all(&self) -> Result<Vec<TrackedProduct>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, url, user_id, current_status
            FROM products
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&*self.pool)
        .await?;

        let products = rows
            .into_iter()
            .map(|row| {
                let stored_status: Option<String> = row.try_get("current_status")?;
                Ok(TrackedProduct {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    url: row.try_get("url")?,
                    user_id: row.try_get("user_id")?,
                    current_status: StockStatus::from_stored(stored_status.as_deref()),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        debug!("Loaded {} tracked products", products.len());
        Ok(products)
    }

    async fn update_status(&self, product_id: &str, status: StockStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET current_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(product_id)
            .execute(&*self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                product_id: product_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteProductStore {
    async fn find_email(&self, user_id: &str) -> Result<Option<String>, UserLookupError> {
        let row = sqlx::query("SELECT email FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| UserLookupError::Backend(e.to_string()))?
            .ok_or_else(|| UserLookupError::NotFound {
                user_id: user_id.to_string(),
            })?;

        let email: Option<String> = row
            .try_get("email")
            .map_err(|e| UserLookupError::Backend(e.to_string()))?;
        Ok(email.filter(|e| !e.trim().is_empty()))
    }
}
