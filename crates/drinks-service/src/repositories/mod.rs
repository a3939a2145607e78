//! Drink storage.
//!
//! Handlers reach storage only through the [`DrinkStore`] trait. Two
//! implementations exist: [`PgDrinkStore`] for Postgres and
//! [`InMemoryDrinkStore`] for running without a database.
//!
//! Both keep the recipe as encoded text and decode it on the way out, so a
//! corrupt stored recipe surfaces as `StoreError::Database` rather than as
//! raw text.

mod memory;
mod postgres;

pub use memory::InMemoryDrinkStore;
pub use postgres::PgDrinkStore;

use crate::models::{Drink, DrinkChanges, DrinkId, NewDrink};
use crate::observability::metrics::record_store_operation;
use async_trait::async_trait;
use std::time::Instant;
use thiserror::Error;

/// Errors returned by a [`DrinkStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Drink {0} not found")]
    NotFound(DrinkId),

    /// The write was refused: validation or a constraint such as a duplicate title.
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Storage failure: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let constraint_violation = err.as_database_error().is_some_and(|db| {
            db.is_unique_violation() || db.is_check_violation() || db.is_foreign_key_violation()
        });

        if constraint_violation {
            StoreError::Rejected(err.to_string())
        } else {
            StoreError::Database(err.to_string())
        }
    }
}

/// CRUD access to the drink catalog.
///
/// Every mutation affects a single drink and is atomic.
#[async_trait]
pub trait DrinkStore: Send + Sync {
    /// All drinks, in ascending id order.
    async fn list_all(&self) -> Result<Vec<Drink>, StoreError>;

    /// Whether a drink with this id exists.
    async fn exists(&self, id: DrinkId) -> Result<bool, StoreError>;

    /// Insert a drink and return it with its assigned id.
    async fn create(&self, new: NewDrink) -> Result<Drink, StoreError>;

    /// Overwrite the fields present in `changes`.
    ///
    /// Returns `StoreError::NotFound` before looking at `changes` if `id`
    /// does not exist.
    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Drink, StoreError>;

    /// Remove a drink and return its id.
    async fn delete(&self, id: DrinkId) -> Result<DrinkId, StoreError>;

    /// Cheap connectivity probe.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Remove every drink, restart id assignment and insert the demo drink.
    async fn reset(&self) -> Result<(), StoreError>;
}

/// Record the outcome and latency of a store call.
fn observe<T>(operation: &'static str, started: Instant, result: &Result<T, StoreError>) {
    let status = match result {
        Ok(_) => "success",
        Err(StoreError::NotFound(_)) => "not_found",
        Err(StoreError::Rejected(_)) => "rejected",
        Err(StoreError::Database(_)) => "error",
    };

    if let Err(StoreError::Database(err)) = result {
        tracing::error!(target: "drinks.repositories", operation, error = %err, "Store operation failed");
    }

    record_store_operation(operation, status, started.elapsed());
}
