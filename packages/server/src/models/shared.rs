use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::PaginationConfig;
use crate::error::AppError;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 6)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 8)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// A page of results together with its pagination metadata.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// `page` / `limit` query parameters shared by paginated endpoints.
#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, 1-based.
    pub page: Option<u64>,
    /// Items per page.
    pub limit: Option<u64>,
}

impl PageQuery {
    /// Resolve to `(page, per_page)` using configured defaults and bounds.
    pub fn resolve(&self, config: &PaginationConfig) -> (u64, u64) {
        let page = Ord::max(self.page.unwrap_or(1), 1);
        let per_page = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        (page, per_page)
    }
}

/// Row offset of `page`, rejecting pages past what Postgres can address.
pub fn page_offset(page: u64, per_page: u64) -> Result<u64, AppError> {
    page.saturating_sub(1)
        .checked_mul(per_page)
        .filter(|&offset| offset <= i64::MAX as u64)
        .ok_or_else(|| AppError::Validation(format!("Page {page} is out of range")))
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Deserialize `1`/`0`/`true`/`false` query flags.
pub fn bool_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("1") | Some("true") | Some("True") => Ok(Some(true)),
        Some("0") | Some("false") | Some("False") => Ok(Some(false)),
        Some(other) => Err(de::Error::custom(format!(
            "expected 1, 0, true or false, got '{other}'"
        ))),
    }
}

/// Validate a trimmed text field against a character range.
pub fn validate_length(value: &str, field: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{field} must be {min}-{max} characters"
        )));
    }
    Ok(())
}

/// Validate that an ID list has no duplicates.
pub fn validate_unique_ids(ids: &[i32], name: &str) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for &id in ids {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!("Duplicate {name} {id}")));
        }
    }
    Ok(())
}

/// Validate a password (8-128 characters).
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}
