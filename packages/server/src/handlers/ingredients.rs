use axum::{
    Json,
    extract::{Path, Query, State},
};
use sea_orm::sea_query::LikeExpr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::ingredient;
use crate::error::{AppError, ErrorBody};
use crate::models::catalog::{IngredientResponse, IngredientSearchQuery};
use crate::models::shared::escape_like;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/ingredients",
    tag = "Ingredients",
    operation_id = "listIngredients",
    summary = "Search ingredients by name prefix",
    description = "Returns ingredients whose name starts with `name` (case-sensitive), ordered by name. Without `name`, returns every ingredient. Not paginated.",
    params(IngredientSearchQuery),
    responses(
        (status = 200, description = "Matching ingredients", body = Vec<IngredientResponse>),
    ),
)]
#[instrument(skip(state, query), fields(name = ?query.name))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientSearchQuery>,
) -> Result<Json<Vec<IngredientResponse>>, AppError> {
    let mut select = ingredient::Entity::find();

    if let Some(ref name) = query.name {
        let prefix = escape_like(name);
        if !prefix.is_empty() {
            select = select.filter(
                ingredient::Column::Name.like(LikeExpr::new(format!("{prefix}%")).escape('\\')),
            );
        }
    }

    let ingredients = select
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(
        ingredients.into_iter().map(IngredientResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/ingredients/{id}",
    tag = "Ingredients",
    operation_id = "getIngredient",
    summary = "Get an ingredient",
    params(("id" = i32, Path, description = "Ingredient ID")),
    responses(
        (status = 200, description = "Ingredient", body = IngredientResponse),
        (status = 404, description = "Ingredient not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(ingredient_id = id))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = ingredient::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient not found".into()))?;
    Ok(Json(ingredient.into()))
}
