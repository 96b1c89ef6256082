//! Per-user recipe lists (favorites and shopping cart) share one toggle routine.

use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::config::MediaConfig;
use crate::entity::{favorite, shopping_cart};
use crate::error::AppError;
use crate::models::recipe::RecipeShortResponse;
use crate::utils::recipe::{find_recipe, short_response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Add,
    Remove,
}

/// Client-facing messages for the two invalid toggle states.
#[derive(Debug, Clone, Copy)]
pub struct ListMessages {
    pub already_added: &'static str,
    pub not_present: &'static str,
}

impl RecipeList {
    fn messages(self) -> ListMessages {
        match self {
            RecipeList::Favorites => ListMessages {
                already_added: "Recipe is already in favorites",
                not_present: "Recipe is not in favorites",
            },
            RecipeList::ShoppingCart => ListMessages {
                already_added: "Recipe is already in the shopping cart",
                not_present: "Recipe is not in the shopping cart",
            },
        }
    }

    async fn contains<C: ConnectionTrait>(
        self,
        db: &C,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool, DbErr> {
        let found = match self {
            RecipeList::Favorites => favorite::Entity::find_by_id((user_id, recipe_id))
                .one(db)
                .await?
                .is_some(),
            RecipeList::ShoppingCart => shopping_cart::Entity::find_by_id((user_id, recipe_id))
                .one(db)
                .await?
                .is_some(),
        };
        Ok(found)
    }

    async fn insert<C: ConnectionTrait>(
        self,
        db: &C,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<(), DbErr> {
        let now = Utc::now();
        match self {
            RecipeList::Favorites => {
                favorite::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                    created_at: Set(now),
                }
                .insert(db)
                .await?;
            }
            RecipeList::ShoppingCart => {
                shopping_cart::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                    created_at: Set(now),
                }
                .insert(db)
                .await?;
            }
        }
        Ok(())
    }

    /// Returns the number of rows removed.
    async fn remove<C: ConnectionTrait>(
        self,
        db: &C,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<u64, DbErr> {
        let result = match self {
            RecipeList::Favorites => {
                favorite::Entity::delete_by_id((user_id, recipe_id))
                    .exec(db)
                    .await?
            }
            RecipeList::ShoppingCart => {
                shopping_cart::Entity::delete_by_id((user_id, recipe_id))
                    .exec(db)
                    .await?
            }
        };
        Ok(result.rows_affected)
    }
}

/// Add a recipe to or remove it from one of the user's lists.
///
/// Returns the short representation on add and `None` on remove.
pub async fn toggle_recipe_list(
    db: &DatabaseConnection,
    media: &MediaConfig,
    list: RecipeList,
    action: ToggleAction,
    user_id: i32,
    recipe_id: i32,
) -> Result<Option<RecipeShortResponse>, AppError> {
    let recipe = find_recipe(db, recipe_id).await?;
    let messages = list.messages();

    match action {
        ToggleAction::Add => {
            if list.contains(db, user_id, recipe_id).await? {
                return Err(AppError::InvalidState(messages.already_added.into()));
            }
            // A concurrent insert of the same pair trips the primary key.
            if let Err(e) = list.insert(db, user_id, recipe_id).await {
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        AppError::InvalidState(messages.already_added.into())
                    }
                    _ => e.into(),
                });
            }
            info!(?list, user_id, recipe_id, "Recipe added to list");
            Ok(Some(short_response(&recipe, media)))
        }
        ToggleAction::Remove => {
            if list.remove(db, user_id, recipe_id).await? == 0 {
                return Err(AppError::InvalidState(messages.not_present.into()));
            }
            info!(?list, user_id, recipe_id, "Recipe removed from list");
            Ok(None)
        }
    }
}
