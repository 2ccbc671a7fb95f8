use crate::{
    AppState,
    dtos::ApiResponse,
    error::HttpError,
    middleware::{JWTAuthMiddleware, auth},
    utils::blob::{self, MAX_FEATURED_IMAGE_BYTES},
};
use axum::{
    Extension, Json, Router,
    extract::Multipart,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use tracing::instrument;

pub fn files_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(middleware::from_fn_with_state(app_state, auth))
}

/// Accept a multipart file upload and return its transport form (base64 plus
/// metadata), ready to be embedded in a content create or update request.
/// Nothing is persisted here.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn upload(
    Extension(auth): Extension<JWTAuthMiddleware>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .ok_or_else(|| HttpError::bad_request("File content type is required"))?
            .to_string();
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HttpError::bad_request(format!("Failed to read file: {}", e)))?
            .to_vec();

        let decoded =
            blob::decode_file(bytes, &content_type, &original_name, MAX_FEATURED_IMAGE_BYTES)?;

        tracing::info!(name = %original_name, size = decoded.size.unwrap_or(0), "File uploaded");
        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse::ok(
                "File uploaded successfully",
                blob::encode(&decoded, ""),
            )),
        ));
    }

    Err(HttpError::bad_request("No file part in request"))
}
