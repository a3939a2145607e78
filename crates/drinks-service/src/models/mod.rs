//! Drinks service models.
//!
//! Contains the drink entity, its two read projections, request bodies and
//! response envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned drink identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrinkId(pub i32);

impl fmt::Display for DrinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One recipe entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    /// Quantity. Hidden from the public projection.
    pub parts: u32,
}

/// Ingredient without its quantity, as shown to unauthenticated callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientSummary {
    pub name: String,
    pub color: String,
}

/// Ordered list of ingredients.
///
/// Kept as structured data everywhere except the storage boundary, where it
/// is encoded to JSON text with [`Recipe::encode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipe(pub Vec<Ingredient>);

impl Recipe {
    /// Encode for storage.
    ///
    /// # Errors
    ///
    /// Only fails if serde_json cannot serialize, which plain strings and
    /// integers never trigger.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Decode a stored recipe.
    ///
    /// # Errors
    ///
    /// Returns the serde error if `text` is not a JSON array of ingredients.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Recipe)
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.0
    }

    /// The recipe shipped as the demo drink after a store reset.
    pub fn demo() -> Self {
        Recipe(vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }])
    }
}

/// Title of the demo drink inserted by a store reset.
pub const DEMO_DRINK_TITLE: &str = "water";

/// A stored drink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: DrinkId,
    pub title: String,
    pub recipe: Recipe,
}

impl Drink {
    /// Public projection: ingredient quantities are dropped.
    pub fn short(&self) -> DrinkView {
        DrinkView::Short(ShortDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .ingredients()
                .iter()
                .map(|i| IngredientSummary {
                    name: i.name.clone(),
                    color: i.color.clone(),
                })
                .collect(),
        })
    }

    /// Full projection, including quantities.
    pub fn long(&self) -> DrinkView {
        DrinkView::Long(LongDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortDrink {
    pub id: DrinkId,
    pub title: String,
    pub recipe: Vec<IngredientSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongDrink {
    pub id: DrinkId,
    pub title: String,
    pub recipe: Recipe,
}

/// A drink rendered through one of its projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DrinkView {
    Short(ShortDrink),
    Long(LongDrink),
}

/// Reasons a drink cannot be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrinkValidationError {
    EmptyTitle,
}

impl fmt::Display for DrinkValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrinkValidationError::EmptyTitle => f.write_str("title must not be empty"),
        }
    }
}

/// Body of `POST /drinks`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewDrink {
    pub title: String,
    #[serde(default)]
    pub recipe: Recipe,
}

impl NewDrink {
    pub fn validate(&self) -> Result<(), DrinkValidationError> {
        validate_title(&self.title)
    }
}

/// Body of `PATCH /drinks/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DrinkChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipe: Option<Recipe>,
}

impl DrinkChanges {
    /// Apply these changes to `drink`, keeping its id.
    pub fn apply(self, drink: &Drink) -> Result<Drink, DrinkValidationError> {
        let title = match self.title {
            Some(title) => {
                validate_title(&title)?;
                title
            }
            None => drink.title.clone(),
        };

        Ok(Drink {
            id: drink.id,
            title,
            recipe: self.recipe.unwrap_or_else(|| drink.recipe.clone()),
        })
    }
}

fn validate_title(title: &str) -> Result<(), DrinkValidationError> {
    if title.trim().is_empty() {
        return Err(DrinkValidationError::EmptyTitle);
    }
    Ok(())
}

/// `{success: true, drinks: [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct DrinksResponse {
    pub success: bool,
    pub drinks: Vec<DrinkView>,
}

impl DrinksResponse {
    pub fn new(drinks: Vec<DrinkView>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// `{success: true, delete: id}`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: DrinkId,
}

impl DeleteResponse {
    pub fn new(id: DrinkId) -> Self {
        Self {
            success: true,
            delete: id,
        }
    }
}

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("healthy" or "unhealthy").
    pub status: String,

    /// Drink store connectivity ("healthy" or "unhealthy").
    pub store: String,
}
