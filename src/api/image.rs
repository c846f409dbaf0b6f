use std::path::Path;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use super::extract::PathId;
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/image/{id}",
    tag = "image",
    params(("id" = i32, Path, description = "Book id")),
    responses(
        (status = 200, description = "JPEG cover"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<Response, ApiError> {
    if id < 0 {
        return Err(ApiError::not_found("Image not found"));
    }
    let path = Path::new(&state.settings.images_dir).join(format!("{}.jpg", id));

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found("Image not found"))
        }
        Err(e) => Err(ApiError::internal(format!(
            "reading {}: {}",
            path.display(),
            e
        ))),
    }
}
