//! Postgres drink store tests.
//!
//! Each test gets a fresh database from `sqlx::test`; run with
//! `DATABASE_URL` set and `--ignored`.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use drinks_service::models::{DrinkChanges, DrinkId, Ingredient, NewDrink, Recipe};
use drinks_service::repositories::{DrinkStore, PgDrinkStore, StoreError};
use sqlx::PgPool;

fn water() -> NewDrink {
    NewDrink {
        title: "Water".to_string(),
        recipe: Recipe(vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }]),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_list(pool: PgPool) {
    let store = PgDrinkStore::new(pool);

    let created = store.create(water()).await.unwrap();
    let listed = store.list_all().await.unwrap();

    assert_eq!(listed, vec![created]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_title_is_rejected(pool: PgPool) {
    let store = PgDrinkStore::new(pool);
    store.create(water()).await.unwrap();

    let result = store.create(water()).await;

    assert!(matches!(result, Err(StoreError::Rejected(_))));
    assert_eq!(store.list_all().await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_partial_update_keeps_recipe(pool: PgPool) {
    let store = PgDrinkStore::new(pool);
    let created = store.create(water()).await.unwrap();

    let updated = store
        .update(
            created.id,
            DrinkChanges {
                title: Some("Water2".to_string()),
                recipe: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "Water2");
    assert_eq!(updated.recipe, created.recipe);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_update_missing_is_not_found(pool: PgPool) {
    let store = PgDrinkStore::new(pool);

    let result = store.update(DrinkId(404), DrinkChanges::default()).await;

    assert!(matches!(result, Err(StoreError::NotFound(DrinkId(404)))));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_then_delete_again(pool: PgPool) {
    let store = PgDrinkStore::new(pool);
    let created = store.create(water()).await.unwrap();

    assert_eq!(store.delete(created.id).await.unwrap(), created.id);
    assert!(matches!(
        store.delete(created.id).await,
        Err(StoreError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_reset_seeds_demo_drink(pool: PgPool) {
    let store = PgDrinkStore::new(pool);
    store.create(water()).await.unwrap();

    store.reset().await.unwrap();
    let listed = store.list_all().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, DrinkId(1));
    assert_eq!(listed[0].recipe, Recipe::demo());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_health_check(pool: PgPool) {
    let store = PgDrinkStore::new(pool);

    store.health_check().await.unwrap();
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_exists(pool: PgPool) {
    let store = PgDrinkStore::new(pool);
    let created = store.create(water()).await.unwrap();

    assert!(store.exists(created.id).await.unwrap());
    assert!(!store.exists(DrinkId(404)).await.unwrap());
}
