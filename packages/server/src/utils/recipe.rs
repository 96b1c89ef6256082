//! Recipe lookups, association replacement and response assembly.

use std::collections::{HashMap, HashSet};

use sea_orm::*;

use crate::config::MediaConfig;
use crate::entity::{
    favorite, ingredient, ingredient_recipe, recipe, recipe_tag, shopping_cart, tag, user,
};
use crate::error::AppError;
use crate::models::catalog::TagResponse;
use crate::models::recipe::{
    IngredientAmount, RecipeIngredientResponse, RecipeResponse, RecipeShortResponse,
};
use crate::models::user::UserResponse;
use crate::utils::subscription::followed_among;

pub async fn find_recipe<C: ConnectionTrait>(db: &C, id: i32) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

pub async fn find_recipe_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<recipe::Model, AppError> {
    use sea_orm::sea_query::LockType;
    recipe::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

pub fn short_response(recipe: &recipe::Model, media: &MediaConfig) -> RecipeShortResponse {
    RecipeShortResponse {
        id: recipe.id,
        name: recipe.name.clone(),
        image: media.image_url(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

/// Replace the recipe's tag set with `tag_ids`.
pub async fn replace_tags(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    tag_ids: &[i32],
) -> Result<(), AppError> {
    if !tag_ids.is_empty() {
        let existing: HashSet<i32> = tag::Entity::find()
            .select_only()
            .column(tag::Column::Id)
            .filter(tag::Column::Id.is_in(tag_ids.to_vec()))
            .into_tuple::<i32>()
            .all(txn)
            .await?
            .into_iter()
            .collect();
        if let Some(missing) = tag_ids.iter().find(|id| !existing.contains(id)) {
            return Err(AppError::Validation(format!("Tag {missing} does not exist")));
        }
    }

    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let rows = tag_ids.iter().map(|&tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    });
    recipe_tag::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

/// Clear the recipe's ingredient lines and rebuild them in submission order.
pub async fn replace_ingredients(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    ingredients: &[IngredientAmount],
) -> Result<(), AppError> {
    let ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
    let existing: HashSet<i32> = ingredient::Entity::find()
        .select_only()
        .column(ingredient::Column::Id)
        .filter(ingredient::Column::Id.is_in(ids.clone()))
        .into_tuple::<i32>()
        .all(txn)
        .await?
        .into_iter()
        .collect();
    if let Some(missing) = ids.iter().find(|id| !existing.contains(id)) {
        return Err(AppError::NotFound(format!("Ingredient {missing} not found")));
    }

    ingredient_recipe::Entity::delete_many()
        .filter(ingredient_recipe::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let rows = ingredients.iter().map(|line| ingredient_recipe::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(line.id),
        amount: Set(line.amount),
        ..Default::default()
    });
    ingredient_recipe::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

/// Recipe IDs among `recipe_ids` that are in the viewer's favorites.
async fn favorited_among<C: ConnectionTrait>(
    db: &C,
    viewer: i32,
    recipe_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    let ids = favorite::Entity::find()
        .select_only()
        .column(favorite::Column::RecipeId)
        .filter(favorite::Column::UserId.eq(viewer))
        .filter(favorite::Column::RecipeId.is_in(recipe_ids.to_vec()))
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Recipe IDs among `recipe_ids` that are in the viewer's shopping cart.
async fn carted_among<C: ConnectionTrait>(
    db: &C,
    viewer: i32,
    recipe_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    let ids = shopping_cart::Entity::find()
        .select_only()
        .column(shopping_cart::Column::RecipeId)
        .filter(shopping_cart::Column::UserId.eq(viewer))
        .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.to_vec()))
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Build full representations for a batch of recipes, preserving their order.
///
/// Uses a fixed number of queries regardless of batch size.
pub async fn recipe_responses<C: ConnectionTrait>(
    db: &C,
    media: &MediaConfig,
    viewer: Option<i32>,
    recipes: Vec<recipe::Model>,
) -> Result<Vec<RecipeResponse>, AppError> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags_by_recipe: HashMap<i32, Vec<TagResponse>> = HashMap::new();
    let tag_rows = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(tag::Entity)
        .order_by_asc(recipe_tag::Column::TagId)
        .all(db)
        .await?;
    for (link, tag) in tag_rows {
        if let Some(tag) = tag {
            tags_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(tag.into());
        }
    }

    let mut ingredients_by_recipe: HashMap<i32, Vec<RecipeIngredientResponse>> = HashMap::new();
    let ingredient_rows = ingredient_recipe::Entity::find()
        .filter(ingredient_recipe::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(ingredient::Entity)
        .order_by_asc(ingredient_recipe::Column::Id)
        .all(db)
        .await?;
    for (line, ingredient) in ingredient_rows {
        if let Some(ingredient) = ingredient {
            ingredients_by_recipe
                .entry(line.recipe_id)
                .or_default()
                .push(RecipeIngredientResponse {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: line.amount,
                });
        }
    }

    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let (favorited, carted, followed) = match viewer {
        Some(viewer) => (
            favorited_among(db, viewer, &recipe_ids).await?,
            carted_among(db, viewer, &recipe_ids).await?,
            followed_among(db, viewer, &author_ids).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                AppError::Internal(format!(
                    "Author {} of recipe {} is missing",
                    recipe.author_id, recipe.id
                ))
            })?;
            Ok(RecipeResponse {
                id: recipe.id,
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                author: UserResponse::new(author, followed.contains(&recipe.author_id)),
                ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: carted.contains(&recipe.id),
                name: recipe.name,
                image: media.image_url(&recipe.image),
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

/// Build the full representation of a single recipe.
pub async fn recipe_response<C: ConnectionTrait>(
    db: &C,
    media: &MediaConfig,
    viewer: Option<i32>,
    recipe: recipe::Model,
) -> Result<RecipeResponse, AppError> {
    recipe_responses(db, media, viewer, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Recipe response was not built".into()))
}
