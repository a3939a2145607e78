//! In-process drink store.
//!
//! Used when no `DATABASE_URL` is configured and by the test harness. Mirrors
//! the Postgres table: ids are assigned from a counter starting at 1, titles
//! are unique, and recipes are held as encoded text.

use super::{observe, DrinkStore, StoreError};
use crate::models::{Drink, DrinkChanges, DrinkId, NewDrink, Recipe, DEMO_DRINK_TITLE};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::instrument;

/// Row as kept in memory.
#[derive(Debug, Clone)]
struct StoredDrink {
    title: String,
    recipe: String,
}

impl StoredDrink {
    fn load(&self, id: DrinkId) -> Result<Drink, StoreError> {
        let recipe = Recipe::decode(&self.recipe).map_err(|e| {
            StoreError::Database(format!("Stored recipe for drink {id} is corrupt: {e}"))
        })?;

        Ok(Drink {
            id,
            title: self.title.clone(),
            recipe,
        })
    }
}

#[derive(Debug)]
struct Inner {
    next_id: i32,
    drinks: BTreeMap<DrinkId, StoredDrink>,
}

impl Inner {
    fn title_taken(&self, title: &str, except: Option<DrinkId>) -> bool {
        self.drinks
            .iter()
            .any(|(id, drink)| Some(*id) != except && drink.title == title)
    }

    fn allocate_id(&mut self) -> Result<DrinkId, StoreError> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::Database("Drink id space exhausted".to_string()))?;
        Ok(DrinkId(id))
    }
}

/// Drink store backed by a `BTreeMap` behind a tokio `RwLock`.
#[derive(Debug)]
pub struct InMemoryDrinkStore {
    inner: RwLock<Inner>,
}

impl Default for InMemoryDrinkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDrinkStore {
    /// Empty store; the first drink gets id 1.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                drinks: BTreeMap::new(),
            }),
        }
    }

    #[cfg(test)]
    #[allow(clippy::expect_used)]
    async fn insert_raw(&self, title: &str, recipe: &str) -> DrinkId {
        let mut inner = self.inner.write().await;
        let id = inner.allocate_id().expect("id space");
        inner.drinks.insert(
            id,
            StoredDrink {
                title: title.to_string(),
                recipe: recipe.to_string(),
            },
        );
        id
    }
}

fn encode_recipe(recipe: &Recipe) -> Result<String, StoreError> {
    recipe
        .encode()
        .map_err(|e| StoreError::Rejected(format!("Recipe could not be encoded: {e}")))
}

#[async_trait]
impl DrinkStore for InMemoryDrinkStore {
    #[instrument(skip_all)]
    async fn list_all(&self) -> Result<Vec<Drink>, StoreError> {
        let started = Instant::now();
        let result = {
            let inner = self.inner.read().await;
            inner
                .drinks
                .iter()
                .map(|(id, drink)| drink.load(*id))
                .collect::<Result<Vec<_>, _>>()
        };
        observe("list_all", started, &result);
        result
    }

    #[instrument(skip_all, fields(drink_id = %id))]
    async fn exists(&self, id: DrinkId) -> Result<bool, StoreError> {
        let started = Instant::now();
        let result = Ok(self.inner.read().await.drinks.contains_key(&id));
        observe("exists", started, &result);
        result
    }

    #[instrument(skip_all)]
    async fn create(&self, new: NewDrink) -> Result<Drink, StoreError> {
        let started = Instant::now();
        let result: Result<Drink, StoreError> = async {
            new.validate()
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
            let recipe = encode_recipe(&new.recipe)?;

            let mut inner = self.inner.write().await;
            if inner.title_taken(&new.title, None) {
                return Err(StoreError::Rejected(format!(
                    "A drink titled '{}' already exists",
                    new.title
                )));
            }

            let id = inner.allocate_id()?;
            inner.drinks.insert(
                id,
                StoredDrink {
                    title: new.title.clone(),
                    recipe,
                },
            );

            tracing::debug!(target: "drinks.repositories", drink_id = %id, "Drink created");
            Ok(Drink {
                id,
                title: new.title,
                recipe: new.recipe,
            })
        }
        .await;
        observe("create", started, &result);
        result
    }

    #[instrument(skip_all, fields(drink_id = %id))]
    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Drink, StoreError> {
        let started = Instant::now();
        let result: Result<Drink, StoreError> = async {
            let mut inner = self.inner.write().await;
            let current = inner
                .drinks
                .get(&id)
                .ok_or(StoreError::NotFound(id))?
                .load(id)?;

            let updated = changes
                .apply(&current)
                .map_err(|e| StoreError::Rejected(e.to_string()))?;

            if inner.title_taken(&updated.title, Some(id)) {
                return Err(StoreError::Rejected(format!(
                    "A drink titled '{}' already exists",
                    updated.title
                )));
            }

            let recipe = encode_recipe(&updated.recipe)?;
            inner.drinks.insert(
                id,
                StoredDrink {
                    title: updated.title.clone(),
                    recipe,
                },
            );

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
        let result = match self.inner.write().await.drinks.remove(&id) {
            Some(_) => {
                tracing::debug!(target: "drinks.repositories", drink_id = %id, "Drink deleted");
                Ok(id)
            }
            None => Err(StoreError::NotFound(id)),
        };
        observe("delete", started, &result);
        result
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    #[instrument(skip_all)]
    async fn reset(&self) -> Result<(), StoreError> {
        let started = Instant::now();
        let result: Result<(), StoreError> = async {
            let recipe = encode_recipe(&Recipe::demo())?;

            let mut inner = self.inner.write().await;
            inner.drinks.clear();
            inner.next_id = 1;

            let id = inner.allocate_id()?;
            inner.drinks.insert(
                id,
                StoredDrink {
                    title: DEMO_DRINK_TITLE.to_string(),
                    recipe,
                },
            );

            tracing::info!(target: "drinks.repositories", "Drink store reset to demo contents");
            Ok(())
        }
        .await;
        observe("reset", started, &result);
        result
    }
}
