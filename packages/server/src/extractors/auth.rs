use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization` header.
///
/// Both `Bearer <token>` and `Token <token>` are accepted. Take `AuthUser`
/// to require authentication, or `Option<AuthUser>` for endpoints that are
/// readable anonymously.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
}

impl AuthUser {
    /// Returns `Err(PermissionDenied)` unless the user is `author_id`.
    pub fn require_author(&self, author_id: i32) -> Result<(), AppError> {
        if self.user_id == author_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

fn decode_header(value: &str, secret: &str) -> Result<AuthUser, AppError> {
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .map(str::trim)
        .ok_or(AppError::TokenInvalid)?;

    let claims = jwt::verify(token, secret).map_err(|_| AppError::TokenInvalid)?;

    Ok(AuthUser {
        user_id: claims.uid,
        email: claims.sub,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        decode_header(header, &state.config.auth.jwt_secret)
    }
}

/// A missing header yields `None`; a present but invalid token is still rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let header = header.to_str().map_err(|_| AppError::TokenInvalid)?;
        decode_header(header, &state.config.auth.jwt_secret).map(Some)
    }
}
