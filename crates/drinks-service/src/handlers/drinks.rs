//! Drink catalog handlers.
//!
//! Each protected handler runs the same sequence: verify the bearer token
//! (via the [`AuthClaims`] extractor), check the operation's permission,
//! call the store, then render a projection.

use crate::auth::{authorize, AuthClaims, Permission};
use crate::errors::DrinksError;
use crate::models::{DeleteResponse, Drink, DrinkChanges, DrinkId, DrinksResponse, NewDrink};
use crate::repositories::StoreError;
use crate::routes::AppState;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::request::Parts,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// A path id that is not an integer means the route does not exist.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for DrinkId {
    type Rejection = DrinksError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!(target: "drinks.handlers.drinks", error = %e, "Drink id is not an integer");
                DrinksError::NotFound(format!("route {}", parts.uri.path()))
            })?;
        Ok(DrinkId(id))
    }
}

/// Turn a JSON body rejection into the service's error envelope.
///
/// Malformed JSON and a missing JSON content type are 400; well-formed JSON
/// of the wrong shape is 422.
fn decode_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, DrinksError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::JsonDataError(e)) => {
            tracing::debug!(target: "drinks.handlers.drinks", error = %e, "Request body has the wrong shape");
            Err(DrinksError::Unprocessable(e.body_text()))
        }
        Err(e) => {
            tracing::debug!(target: "drinks.handlers.drinks", error = %e, "Request body is not JSON");
            Err(DrinksError::BadRequest(
                "Request body must be a JSON document".to_string(),
            ))
        }
    }
}

/// Store failures on the read path.
fn read_failure(err: StoreError) -> DrinksError {
    DrinksError::Database(err.to_string())
}

/// Store failures on the write path. `NotFound` keeps its own status; every
/// other failure is reported as a generic 422.
fn write_failure(err: StoreError) -> DrinksError {
    match err {
        StoreError::NotFound(id) => DrinksError::NotFound(format!("drink {id}")),
        StoreError::Rejected(reason) | StoreError::Database(reason) => {
            DrinksError::Unprocessable(reason)
        }
    }
}

/// Handler for GET /drinks
///
/// Public. Returns the short projection, which never includes `parts`.
#[instrument(skip_all, name = "drinks.handlers.list")]
pub async fn list_drinks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse>, DrinksError> {
    let drinks = state.store.list_all().await.map_err(read_failure)?;

    Ok(Json(DrinksResponse::new(
        drinks.iter().map(Drink::short).collect(),
    )))
}

/// Handler for GET /drinks-detail
///
/// Requires `get:drinks-detail`. Returns the long projection.
#[instrument(skip_all, name = "drinks.handlers.list_detail")]
pub async fn list_drinks_detail(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
) -> Result<Json<DrinksResponse>, DrinksError> {
    authorize(&claims, Permission::GetDrinksDetail)?;

    let drinks = state.store.list_all().await.map_err(read_failure)?;

    Ok(Json(DrinksResponse::new(
        drinks.iter().map(Drink::long).collect(),
    )))
}

/// Handler for POST /drinks
///
/// Requires `post:drinks`.
///
/// # Request Body
///
/// ```json
/// {"title": "Water", "recipe": [{"name": "water", "color": "blue", "parts": 1}]}
/// ```
///
/// # Response
///
/// - 200 with `{success: true, drinks: [<created, long>]}`
/// - 400 if the body is not JSON
/// - 401 if the token is missing, invalid or lacks the permission
/// - 422 if the drink cannot be stored (empty or duplicate title, wrong shape)
#[instrument(skip_all, name = "drinks.handlers.create")]
pub async fn create_drink(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    payload: Result<Json<NewDrink>, JsonRejection>,
) -> Result<Json<DrinksResponse>, DrinksError> {
    authorize(&claims, Permission::PostDrinks)?;
    let new = decode_body(payload)?;

    let drink = state.store.create(new).await.map_err(write_failure)?;

    tracing::info!(target: "drinks.handlers.drinks", drink_id = %drink.id, "Drink created");
    Ok(Json(DrinksResponse::new(vec![drink.long()])))
}

/// Handler for PATCH /drinks/{id}
///
/// Requires `patch:drinks`. Fields absent from the body keep their value.
///
/// # Response
///
/// - 200 with `{success: true, drinks: [<updated, long>]}`
/// - 400 if the body is not JSON and the drink exists
/// - 401 if the token is missing, invalid or lacks the permission
/// - 404 if no drink has this id, checked before the body
/// - 422 if the changes cannot be stored
#[instrument(skip_all, name = "drinks.handlers.update", fields(drink_id = %id))]
pub async fn update_drink(
    id: DrinkId,
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    payload: Result<Json<DrinkChanges>, JsonRejection>,
) -> Result<Json<DrinksResponse>, DrinksError> {
    authorize(&claims, Permission::PatchDrinks)?;

    // A missing drink is 404 whatever the body looks like.
    let changes = match decode_body(payload) {
        Ok(changes) => changes,
        Err(err) => {
            if !state.store.exists(id).await.map_err(read_failure)? {
                return Err(DrinksError::NotFound(format!("drink {id}")));
            }
            return Err(err);
        }
    };

    let drink = state
        .store
        .update(id, changes)
        .await
        .map_err(write_failure)?;

    tracing::info!(target: "drinks.handlers.drinks", drink_id = %drink.id, "Drink updated");
    Ok(Json(DrinksResponse::new(vec![drink.long()])))
}

/// Handler for DELETE /drinks/{id}
///
/// Requires `delete:drinks`. Returns `{success: true, delete: id}`; a second
/// delete of the same id is 404.
#[instrument(skip_all, name = "drinks.handlers.delete", fields(drink_id = %id))]
pub async fn delete_drink(
    id: DrinkId,
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
) -> Result<Json<DeleteResponse>, DrinksError> {
    authorize(&claims, Permission::DeleteDrinks)?;

    let deleted = state.store.delete(id).await.map_err(write_failure)?;

    tracing::info!(target: "drinks.handlers.drinks", drink_id = %deleted, "Drink deleted");
    Ok(Json(DeleteResponse::new(deleted)))
}
