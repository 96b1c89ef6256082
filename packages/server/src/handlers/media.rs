use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::media::ImageName;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/media/{name}",
    tag = "Media",
    operation_id = "getImage",
    summary = "Serve a recipe image",
    params(("name" = String, Path, description = "Stored image name, `{sha256}.{ext}`")),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let name: ImageName = name.parse()?;
    let bytes = state.images.get(&name).await?;
    Ok((
        [
            (header::CONTENT_TYPE, name.format.content_type()),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    ))
}
