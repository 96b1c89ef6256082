use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{follow, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{PageQuery, Paginated, Pagination, page_offset, validate_password};
use crate::models::user::{
    RecipesLimitQuery, RegisterRequest, RegisterResponse, SetPasswordRequest,
    SubscriptionQuery, SubscriptionResponse, UserResponse, validate_register_request,
};
use crate::state::AppState;
use crate::utils::hash;
use crate::utils::subscription::{followed_among, is_following, subscription_responses};

async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    operation_id = "registerUser",
    summary = "Register a new account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email or username taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let email = payload.email.trim().to_string();
    let username = payload.username.trim().to_string();

    let taken = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(&email))
                .add(user::Column::Username.eq(&username)),
        )
        .one(&state.db)
        .await?;
    if let Some(existing) = taken {
        let field = if existing.email == email {
            "email"
        } else {
            "username"
        };
        return Err(AppError::Conflict(format!(
            "A user with this {field} already exists"
        )));
    }

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        email: Set(email),
        username: Set(username),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        password: Set(hash),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::Conflict("A user with this email or username already exists".into())
        }
        _ => AppError::from(e),
    })?;

    info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(RegisterResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users", body = Paginated<UserResponse>),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    let (page, per_page) = query.resolve(&state.config.pagination);

    let select = user::Entity::find().order_by_asc(user::Column::Id);
    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let users = select
        .offset(Some(page_offset(page, per_page)?))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let followed = match auth_user {
        Some(ref viewer) => {
            let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
            followed_among(&state.db, viewer.user_id, &ids).await?
        }
        None => Default::default(),
    };

    let data = users
        .into_iter()
        .map(|u| {
            let subscribed = followed.contains(&u.id);
            UserResponse::new(u, subscribed)
        })
        .collect();

    Ok(Json(Paginated {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user profile",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(user_id = id))]
pub async fn get_user(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state.db, id).await?;
    let subscribed = match auth_user {
        Some(viewer) => is_following(&state.db, viewer.user_id, id).await?,
        None => false,
    };
    Ok(Json(UserResponse::new(user, subscribed)))
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    operation_id = "getCurrentUser",
    summary = "Get the current user's profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;
    Ok(Json(UserResponse::new(user, false)))
}

#[utoipa::path(
    post,
    path = "/users/set_password",
    tag = "Users",
    operation_id = "setPassword",
    summary = "Change the current user's password",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or invalid new password (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn set_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    validate_password(&payload.new_password)?;

    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let is_valid = hash::verify_password(&payload.current_password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::Validation("Current password is incorrect".into()));
    }

    let hash = hash::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut active: user::ActiveModel = user.into();
    active.password = Set(hash);
    active.update(&state.db).await?;

    info!("Password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/subscriptions",
    tag = "Subscriptions",
    operation_id = "listSubscriptions",
    summary = "List followed authors",
    description = "Returns the authors the current user follows, each with their newest recipes (capped by `recipes_limit`) and total recipe count.",
    params(SubscriptionQuery),
    responses(
        (status = 200, description = "Page of followed authors", body = Paginated<SubscriptionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn subscriptions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<Paginated<SubscriptionResponse>>, AppError> {
    let (page, per_page) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config.pagination);

    let followed_ids = follow::Entity::find()
        .select_only()
        .column(follow::Column::AuthorId)
        .filter(follow::Column::UserId.eq(auth_user.user_id))
        .into_query();

    let select = user::Entity::find()
        .filter(user::Column::Id.in_subquery(followed_ids))
        .order_by_asc(user::Column::Id);
    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let authors = select
        .offset(Some(page_offset(page, per_page)?))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let data = subscription_responses(
        &state.db,
        &state.config.media,
        auth_user.user_id,
        authors,
        query.recipes_limit,
    )
    .await?;

    Ok(Json(Paginated {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{id}/subscribe",
    tag = "Subscriptions",
    operation_id = "subscribe",
    summary = "Follow an author",
    params(
        ("id" = i32, Path, description = "Author's user ID"),
        RecipesLimitQuery,
    ),
    responses(
        (status = 201, description = "Now following", body = SubscriptionResponse),
        (status = 400, description = "Self-follow (VALIDATION_ERROR) or already following (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id, author_id = id))]
pub async fn subscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let author = find_user(&state.db, id).await?;
    if author.id == auth_user.user_id {
        return Err(AppError::Validation("You cannot follow yourself".into()));
    }
    if is_following(&state.db, auth_user.user_id, id).await? {
        return Err(AppError::InvalidState("You already follow this user".into()));
    }

    let row = follow::ActiveModel {
        user_id: Set(auth_user.user_id),
        author_id: Set(id),
        created_at: Set(chrono::Utc::now()),
    };
    row.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::InvalidState("You already follow this user".into())
        }
        _ => AppError::from(e),
    })?;
    info!("Subscribed");

    let response = subscription_responses(
        &state.db,
        &state.config.media,
        auth_user.user_id,
        vec![author],
        query.recipes_limit,
    )
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal("Subscription response was not built".into()))?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/subscribe",
    tag = "Subscriptions",
    operation_id = "unsubscribe",
    summary = "Unfollow an author",
    params(("id" = i32, Path, description = "Author's user ID")),
    responses(
        (status = 204, description = "No longer following"),
        (status = 400, description = "Self-unfollow (VALIDATION_ERROR) or not following (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, author_id = id))]
pub async fn unsubscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    find_user(&state.db, id).await?;
    if id == auth_user.user_id {
        return Err(AppError::Validation("You cannot unfollow yourself".into()));
    }

    let result = follow::Entity::delete_by_id((auth_user.user_id, id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::InvalidState("You do not follow this user".into()));
    }

    info!("Unsubscribed");
    Ok(StatusCode::NO_CONTENT)
}
