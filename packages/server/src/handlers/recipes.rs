use axum::{
    Json,
    extract::{DefaultBodyLimit, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::Query;
use sea_orm::*;
use tracing::{info, instrument};

use crate::config::MediaConfig;
use crate::entity::{
    favorite, ingredient_recipe, recipe, recipe_tag, shopping_cart, tag,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::media::decode_data_uri;
use crate::models::recipe::*;
use crate::models::shared::{PageQuery, Paginated, Pagination, page_offset};
use crate::state::AppState;
use crate::utils::recipe::{
    find_recipe, find_recipe_for_update, recipe_response, recipe_responses, replace_ingredients,
    replace_tags,
};
use crate::utils::recipe_list::{RecipeList, ToggleAction, toggle_recipe_list};
use crate::utils::shopping_list::{
    SHOPPING_LIST_FILENAME, aggregate_shopping_cart, render_shopping_list,
};

/// Body limit for recipe writes: the largest image, base64-inflated, plus room
/// for the rest of the payload.
pub fn recipe_body_limit(media: &MediaConfig) -> DefaultBodyLimit {
    let image = usize::try_from(media.max_image_bytes).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(image.saturating_mul(4) / 3 + 64 * 1024)
}

/// Decode the data URI and store the image, returning its stored name.
async fn store_image(state: &AppState, data_uri: &str) -> Result<String, AppError> {
    let image = decode_data_uri(data_uri, state.config.media.max_image_bytes)?;
    let name = state.images.put(&image).await?;
    Ok(name.to_string())
}

#[utoipa::path(
    get,
    path = "/recipes",
    tag = "Recipes",
    operation_id = "listRecipes",
    summary = "List recipes with filters",
    description = "Returns recipes newest first. `tags` may repeat and matches recipes having any of the slugs. `is_favorited` and `is_in_shopping_cart` only apply when true and the request is authenticated.",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Page of recipes", body = Paginated<RecipeResponse>),
        (status = 400, description = "Malformed query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_recipes(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Paginated<RecipeResponse>>, AppError> {
    let (page, per_page) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config.pagination);
    let viewer = auth_user.map(|u| u.user_id);

    let mut select = recipe::Entity::find();

    if !query.tags.is_empty() {
        let tagged = recipe_tag::Entity::find()
            .select_only()
            .column(recipe_tag::Column::RecipeId)
            .inner_join(tag::Entity)
            .filter(tag::Column::Slug.is_in(query.tags.clone()))
            .into_query();
        select = select.filter(recipe::Column::Id.in_subquery(tagged));
    }

    if let Some(author) = query.author {
        select = select.filter(recipe::Column::AuthorId.eq(author));
    }

    if let Some(viewer) = viewer {
        if query.is_favorited == Some(true) {
            let favorites = favorite::Entity::find()
                .select_only()
                .column(favorite::Column::RecipeId)
                .filter(favorite::Column::UserId.eq(viewer))
                .into_query();
            select = select.filter(recipe::Column::Id.in_subquery(favorites));
        }
        if query.is_in_shopping_cart == Some(true) {
            let cart = shopping_cart::Entity::find()
                .select_only()
                .column(shopping_cart::Column::RecipeId)
                .filter(shopping_cart::Column::UserId.eq(viewer))
                .into_query();
            select = select.filter(recipe::Column::Id.in_subquery(cart));
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let recipes = select
        .order_by_desc(recipe::Column::Id)
        .offset(Some(page_offset(page, per_page)?))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let data = recipe_responses(&state.db, &state.config.media, viewer, recipes).await?;

    Ok(Json(Paginated {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/recipes/{id}",
    tag = "Recipes",
    operation_id = "getRecipe",
    summary = "Get a recipe",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe", body = RecipeResponse),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(recipe_id = id))]
pub async fn get_recipe(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RecipeResponse>, AppError> {
    let recipe = find_recipe(&state.db, id).await?;
    let response = recipe_response(
        &state.db,
        &state.config.media,
        auth_user.map(|u| u.user_id),
        recipe,
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/recipes",
    tag = "Recipes",
    operation_id = "createRecipe",
    summary = "Create a recipe",
    description = "Creates a recipe authored by the current user. The recipe row, its tags and its ingredient lines are written in one transaction.",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Ingredient not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_recipe(&payload)?;
    let image = store_image(&state, &payload.image).await?;

    let txn = state.db.begin().await?;

    let model = recipe::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        image: Set(image),
        text: Set(payload.text),
        cooking_time: Set(payload.cooking_time),
        author_id: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_tags(&txn, model.id, &payload.tags).await?;
    replace_ingredients(&txn, model.id, &payload.ingredients).await?;

    let response =
        recipe_response(&txn, &state.config.media, Some(auth_user.user_id), model).await?;
    txn.commit().await?;

    info!(recipe_id = response.id, "Recipe created");
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    patch,
    path = "/recipes/{id}",
    tag = "Recipes",
    operation_id = "updateRecipe",
    summary = "Update a recipe",
    description = "Partially updates a recipe. Only the author may update it. `tags` and `ingredients`, when present, replace the whole set.",
    params(("id" = i32, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe or ingredient not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, recipe_id = id))]
pub async fn update_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_recipe_for_update(&txn, id).await?;
    auth_user.require_author(existing.author_id)?;
    validate_update_recipe(&payload)?;

    let image = match payload.image {
        Some(ref data_uri) => Some(store_image(&state, data_uri).await?),
        None => None,
    };

    let mut active: recipe::ActiveModel = existing.clone().into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(text) = payload.text {
        active.text = Set(text);
    }
    if let Some(cooking_time) = payload.cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    if let Some(image) = image {
        active.image = Set(image);
    }
    let model = if active.is_changed() {
        active.update(&txn).await?
    } else {
        existing
    };

    if let Some(ref tags) = payload.tags {
        replace_tags(&txn, id, tags).await?;
    }
    if let Some(ref ingredients) = payload.ingredients {
        replace_ingredients(&txn, id, ingredients).await?;
    }

    let response =
        recipe_response(&txn, &state.config.media, Some(auth_user.user_id), model).await?;
    txn.commit().await?;

    info!("Recipe updated");
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/recipes/{id}",
    tag = "Recipes",
    operation_id = "deleteRecipe",
    summary = "Delete a recipe",
    description = "Deletes a recipe together with its tag links, ingredient lines, favorites and shopping cart entries. Only the author may delete it.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, recipe_id = id))]
pub async fn delete_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_recipe_for_update(&txn, id).await?;
    auth_user.require_author(existing.author_id)?;

    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    ingredient_recipe::Entity::delete_many()
        .filter(ingredient_recipe::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    favorite::Entity::delete_many()
        .filter(favorite::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    shopping_cart::Entity::delete_many()
        .filter(shopping_cart::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    recipe::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    info!("Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_list(
    state: &AppState,
    list: RecipeList,
    user_id: i32,
    recipe_id: i32,
) -> Result<(StatusCode, Json<RecipeShortResponse>), AppError> {
    let short = toggle_recipe_list(
        &state.db,
        &state.config.media,
        list,
        ToggleAction::Add,
        user_id,
        recipe_id,
    )
    .await?
    .ok_or_else(|| AppError::Internal("Toggle add returned no recipe".into()))?;
    Ok((StatusCode::CREATED, Json(short)))
}

async fn remove_from_list(
    state: &AppState,
    list: RecipeList,
    user_id: i32,
    recipe_id: i32,
) -> Result<StatusCode, AppError> {
    toggle_recipe_list(
        &state.db,
        &state.config.media,
        list,
        ToggleAction::Remove,
        user_id,
        recipe_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/recipes/{id}/favorite",
    tag = "Favorites",
    operation_id = "addFavorite",
    summary = "Add a recipe to favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = RecipeShortResponse),
        (status = 400, description = "Already in favorites (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, recipe_id = id))]
pub async fn add_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    add_to_list(&state, RecipeList::Favorites, auth_user.user_id, id).await
}

#[utoipa::path(
    delete,
    path = "/recipes/{id}/favorite",
    tag = "Favorites",
    operation_id = "removeFavorite",
    summary = "Remove a recipe from favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Not in favorites (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, recipe_id = id))]
pub async fn remove_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_from_list(&state, RecipeList::Favorites, auth_user.user_id, id).await
}

#[utoipa::path(
    post,
    path = "/recipes/{id}/shopping_cart",
    tag = "Shopping Cart",
    operation_id = "addToShoppingCart",
    summary = "Add a recipe to the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = RecipeShortResponse),
        (status = 400, description = "Already in the cart (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, recipe_id = id))]
pub async fn add_to_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    add_to_list(&state, RecipeList::ShoppingCart, auth_user.user_id, id).await
}

#[utoipa::path(
    delete,
    path = "/recipes/{id}/shopping_cart",
    tag = "Shopping Cart",
    operation_id = "removeFromShoppingCart",
    summary = "Remove a recipe from the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Not in the cart (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, recipe_id = id))]
pub async fn remove_from_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_from_list(&state, RecipeList::ShoppingCart, auth_user.user_id, id).await
}

#[utoipa::path(
    get,
    path = "/recipes/download_shopping_cart",
    tag = "Shopping Cart",
    operation_id = "downloadShoppingCart",
    summary = "Download the aggregated shopping list",
    description = "Sums ingredient amounts over every recipe in the cart, grouped by name and measurement unit, and returns a numbered plain-text list as an attachment.",
    responses(
        (status = 200, description = "Shopping list", content_type = "text/plain", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items = aggregate_shopping_cart(&state.db, auth_user.user_id).await?;
    let body = render_shopping_list(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
            ),
        ],
        body,
    ))
}
