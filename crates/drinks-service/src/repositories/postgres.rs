//! Postgres drink store.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Updates lock the target row, so concurrent PATCHes to one drink serialize

use super::{observe, DrinkStore, StoreError};
use crate::models::{Drink, DrinkChanges, DrinkId, NewDrink, Recipe, DEMO_DRINK_TITLE};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Instant;
use tracing::instrument;

/// Row of the `drinks` table.
#[derive(Debug, sqlx::FromRow)]
struct DrinkRow {
    id: i32,
    title: String,
    recipe: String,
}

impl DrinkRow {
    fn into_drink(self) -> Result<Drink, StoreError> {
        let id = DrinkId(self.id);
        let recipe = Recipe::decode(&self.recipe).map_err(|e| {
            StoreError::Database(format!("Stored recipe for drink {id} is corrupt: {e}"))
        })?;

        Ok(Drink {
            id,
            title: self.title,
            recipe,
        })
    }
}

fn encode_recipe(recipe: &Recipe) -> Result<String, StoreError> {
    recipe
        .encode()
        .map_err(|e| StoreError::Rejected(format!("Recipe could not be encoded: {e}")))
}

/// Drink store on a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgDrinkStore {
    pool: PgPool,
}

impl PgDrinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl DrinkStore for PgDrinkStore {
    #[instrument(skip_all)]
    async fn list_all(&self) -> Result<Vec<Drink>, StoreError> {
        let started = Instant::now();
        let result: Result<Vec<Drink>, StoreError> = async {
            let rows: Vec<DrinkRow> =
                sqlx::query_as("SELECT id, title, recipe FROM drinks ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?;

            rows.into_iter().map(DrinkRow::into_drink).collect()
        }
        .await;
        observe("list_all", started, &result);
        result
    }

    #[instrument(skip_all)]
    async fn create(&self, new: NewDrink) -> Result<Drink, StoreError> {
        let started = Instant::now();
        let result: Result<Drink, StoreError> = async {
            new.validate()
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
            let recipe = encode_recipe(&new.recipe)?;

            let row: DrinkRow = sqlx::query_as(
                r#"
                INSERT INTO drinks (title, recipe)
                VALUES ($1, $2)
                RETURNING id, title, recipe
                "#,
            )
            .bind(&new.title)
            .bind(&recipe)
            .fetch_one(&self.pool)
            .await?;

            let drink = row.into_drink()?;
            tracing::debug!(target: "drinks.repositories", drink_id = %drink.id, "Drink created");
            Ok(drink)
        }
        .await;
        observe("create", started, &result);
        result
    }

    #[instrument(skip_all, fields(drink_id = %id))]
    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Drink, StoreError> {
        let started = Instant::now();
        let result: Result<Drink, StoreError> = async {
            let mut tx = self.pool.begin().await?;

            let row: Option<DrinkRow> =
                sqlx::query_as("SELECT id, title, recipe FROM drinks WHERE id = $1 FOR UPDATE")
                    .bind(id.0)
                    .fetch_optional(&mut *tx)
                    .await?;

            let current = row.ok_or(StoreError::NotFound(id))?.into_drink()?;
            let updated = changes
                .apply(&current)
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
            let recipe = encode_recipe(&updated.recipe)?;

            sqlx::query("UPDATE drinks SET title = $2, recipe = $3 WHERE id = $1")
                .bind(id.0)
                .bind(&updated.title)
                .bind(&recipe)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::debug!(target: "drinks.repositories", drink_id = %id, "Drink updated");
            Ok(updated)
        }
        .await;
        observe("update", started, &result);
        result
    }

    #[instrument(skip_all, fields(drink_id = %id))]
    async fn delete(&self, id: DrinkId) -> Result<DrinkId, StoreError> {
        let started = Instant::now();
        let result: Result<DrinkId, StoreError> = async {
            let deleted: Option<i32> =
                sqlx::query_scalar("DELETE FROM drinks WHERE id = $1 RETURNING id")
                    .bind(id.0)
                    .fetch_optional(&self.pool)
                    .await?;

            match deleted {
                Some(deleted) => {
                    tracing::debug!(target: "drinks.repositories", drink_id = %id, "Drink deleted");
                    Ok(DrinkId(deleted))
                }
                None => Err(StoreError::NotFound(id)),
            }
        }
        .await;
        observe("delete", started, &result);
        result
    }

    #[instrument(skip_all, fields(drink_id = %id))]
    async fn exists(&self, id: DrinkId) -> Result<bool, StoreError> {
        let started = Instant::now();
        let result: Result<bool, StoreError> =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM drinks WHERE id = $1)")
                .bind(id.0)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from);
        observe("exists", started, &result);
        result
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn reset(&self) -> Result<(), StoreError> {
        let started = Instant::now();
        let result: Result<(), StoreError> = async {
            let recipe = encode_recipe(&Recipe::demo())?;
            let mut tx = self.pool.begin().await?;

            sqlx::query("TRUNCATE drinks RESTART IDENTITY")
                .execute(&mut *tx)
                .await?;

            sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
                .bind(DEMO_DRINK_TITLE)
                .bind(&recipe)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!(target: "drinks.repositories", "Drink store reset to demo contents");
            Ok(())
        }
        .await;
        observe("reset", started, &result);
        result
    }
}
