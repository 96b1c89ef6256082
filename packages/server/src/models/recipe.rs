use serde::{Deserialize, Serialize};

use super::catalog::TagResponse;
use super::shared::{bool_flag, validate_length, validate_unique_ids};
use super::user::UserResponse;
use crate::error::AppError;

/// One ingredient line of a recipe write payload.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub struct IngredientAmount {
    /// Ingredient ID.
    #[schema(example = 3)]
    pub id: i32,
    /// Quantity in the ingredient's measurement unit (>= 1).
    #[schema(example = 200)]
    pub amount: i32,
}

/// Request body for creating a recipe. The author is always the requester.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    /// Tag IDs.
    #[serde(default)]
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
    #[schema(example = "Pancakes")]
    pub name: String,
    /// Base64 data URI, e.g. `data:image/png;base64,iVBOR...`.
    pub image: String,
    #[schema(example = "Mix everything and fry.")]
    pub text: String,
    /// Cooking time in minutes (>= 1).
    #[schema(example = 20)]
    pub cooking_time: i32,
}

/// Request body for partially updating a recipe.
///
/// `tags` and `ingredients`, when present, replace the whole set.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateRecipeRequest {
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

pub fn validate_create_recipe(payload: &CreateRecipeRequest) -> Result<(), AppError> {
    validate_name(&payload.name)?;
    validate_text(&payload.text)?;
    validate_cooking_time(payload.cooking_time)?;
    validate_ingredients(&payload.ingredients)?;
    validate_unique_ids(&payload.tags, "tag")
}

pub fn validate_update_recipe(payload: &UpdateRecipeRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_name(name)?;
    }
    if let Some(ref text) = payload.text {
        validate_text(text)?;
    }
    if let Some(cooking_time) = payload.cooking_time {
        validate_cooking_time(cooking_time)?;
    }
    if let Some(ref ingredients) = payload.ingredients {
        validate_ingredients(ingredients)?;
    }
    if let Some(ref tags) = payload.tags {
        validate_unique_ids(tags, "tag")?;
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), AppError> {
    validate_length(name, "Name", 1, 200)
}

fn validate_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("Text must not be empty".into()));
    }
    Ok(())
}

fn validate_cooking_time(cooking_time: i32) -> Result<(), AppError> {
    if cooking_time < 1 {
        return Err(AppError::Validation(
            "Cooking time must be at least 1 minute".into(),
        ));
    }
    Ok(())
}

/// Ingredient list must be non-empty, with positive amounts and no repeated ingredient.
pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), AppError> {
    if ingredients.is_empty() {
        return Err(AppError::Validation(
            "A recipe needs at least one ingredient".into(),
        ));
    }
    if let Some(bad) = ingredients.iter().find(|i| i.amount < 1) {
        return Err(AppError::Validation(format!(
            "Amount of ingredient {} must be at least 1",
            bad.id
        )));
    }
    let ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
    validate_unique_ids(&ids, "ingredient")
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, Clone, Debug, utoipa::ToSchema)]
pub struct RecipeIngredientResponse {
    /// Ingredient ID.
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "flour")]
    pub name: String,
    #[schema(example = "g")]
    pub measurement_unit: String,
    #[schema(example = 200)]
    pub amount: i32,
}

/// Full recipe representation.
#[derive(Serialize, Debug, utoipa::ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Image URL.
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact recipe representation used by favorites, cart and subscriptions.
#[derive(Serialize, Clone, Debug, utoipa::ToSchema)]
pub struct RecipeShortResponse {
    pub id: i32,
    pub name: String,
    /// Image URL.
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeListQuery {
    /// Page number, 1-based.
    pub page: Option<u64>,
    /// Items per page.
    pub limit: Option<u64>,
    /// Tag slugs; a recipe matches if it has any of them. Repeatable.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Author user ID.
    pub author: Option<i32>,
    /// `1` to only list the requester's favorites.
    #[serde(default, deserialize_with = "bool_flag")]
    #[param(value_type = Option<String>)]
    pub is_favorited: Option<bool>,
    /// `1` to only list recipes in the requester's shopping cart.
    #[serde(default, deserialize_with = "bool_flag")]
    #[param(value_type = Option<String>)]
    pub is_in_shopping_cart: Option<bool>,
}
