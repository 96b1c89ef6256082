use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;

use crate::config::MediaConfig;
use crate::entity::{follow, recipe, user};
use crate::error::AppError;
use crate::models::user::{SubscriptionResponse, UserResponse};
use crate::utils::recipe::short_response;

/// Author IDs among `author_ids` that `viewer` follows.
pub async fn followed_among<C: ConnectionTrait>(
    db: &C,
    viewer: i32,
    author_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let ids = follow::Entity::find()
        .select_only()
        .column(follow::Column::AuthorId)
        .filter(follow::Column::UserId.eq(viewer))
        .filter(follow::Column::AuthorId.is_in(author_ids.to_vec()))
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

pub async fn is_following<C: ConnectionTrait>(
    db: &C,
    viewer: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    Ok(follow::Entity::find_by_id((viewer, author_id))
        .one(db)
        .await?
        .is_some())
}

/// Build subscription representations for `authors` as seen by `viewer`.
///
/// Each author carries their newest recipes, capped at `recipes_limit` when
/// given, and the uncapped total.
pub async fn subscription_responses<C: ConnectionTrait>(
    db: &C,
    media: &MediaConfig,
    viewer: i32,
    authors: Vec<user::Model>,
    recipes_limit: Option<u64>,
) -> Result<Vec<SubscriptionResponse>, AppError> {
    if authors.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids: Vec<i32> = authors.iter().map(|a| a.id).collect();
    let followed = followed_among(db, viewer, &author_ids).await?;

    let counts: HashMap<i32, u64> = recipe::Entity::find()
        .select_only()
        .column(recipe::Column::AuthorId)
        .column_as(
            Expr::expr(Func::count(Expr::col(recipe::Column::Id))),
            "recipes_count",
        )
        .filter(recipe::Column::AuthorId.is_in(author_ids.clone()))
        .group_by(recipe::Column::AuthorId)
        .into_tuple::<(i32, i64)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(author_id, count)| (author_id, std::cmp::Ord::max(count, 0) as u64))
        .collect();

    let mut responses = Vec::with_capacity(authors.len());
    for author in authors {
        let mut query = recipe::Entity::find()
            .filter(recipe::Column::AuthorId.eq(author.id))
            .order_by_desc(recipe::Column::Id);
        if let Some(limit) = recipes_limit {
            query = query.limit(limit);
        }
        let recipes = query
            .all(db)
            .await?
            .iter()
            .map(|r| short_response(r, media))
            .collect();

        let recipes_count = counts.get(&author.id).copied().unwrap_or(0);
        let is_subscribed = followed.contains(&author.id);
        responses.push(SubscriptionResponse {
            user: UserResponse::new(author, is_subscribed),
            recipes,
            recipes_count,
        });
    }
    Ok(responses)
}
