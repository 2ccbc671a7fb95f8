use crate::{
    AppState,
    db::{CategoryExt, CommentExt, ContentExt},
    dtos::{
        AddCommentDto, ApiResponse, BriefContentDto, CommentDto, ContentDetailDto,
        ContentQueryDto, ContentSummaryDto, CountDto, CreateContentDto, LikeStateDto,
        PaginationDto, SharesDto, UpdateContentDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth, is_owner_or_admin},
    models::ContentKind,
    utils::blob::{self, MAX_FEATURED_IMAGE_BYTES},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const DEFAULT_BRIEF_LIMIT: i64 = 20;

/// Routes shared by the three content kinds. The kind itself is injected as
/// an `Extension` by the router that nests this handler, so one handler set
/// serves `/api/news`, `/api/blogs` and `/api/articles`.
pub fn content_handler(app_state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create))
        .route("/{id}", axum::routing::put(update).delete(delete))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/comment", post(add_comment))
        .layer(middleware::from_fn_with_state(app_state, auth));

    Router::new()
        .route("/", get(list))
        .route("/short", get(list_short))
        .route("/count", get(count))
        .route("/{id}", get(get_by_id))
        .route("/{id}/share", post(share))
        .route("/{id}/featured-image", get(featured_image))
        .merge(protected)
}

fn server_error<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> HttpError + '_ {
    move |e| {
        tracing::error!("DB error, {}: {}", context, e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    }
}

#[instrument(skip(app_state, query))]
pub async fn list(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Query(query): Query<ContentQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let records = app_state
        .db_client
        .list_content(kind, &query, page, limit)
        .await
        .map_err(server_error("listing content"))?;
    let total = app_state
        .db_client
        .count_filtered(kind, &query)
        .await
        .map_err(server_error("counting content"))?;

    Ok(Json(ApiResponse::paginated(
        format!("{} list retrieved successfully", kind.display()),
        ContentSummaryDto::from_records(&records),
        PaginationDto::new(page, limit, total),
    )))
}

/// Compact feed with the derived brief-content excerpt.
#[instrument(skip(app_state, query))]
pub async fn list_short(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Query(query): Query<ContentQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_BRIEF_LIMIT);

    let records = app_state
        .db_client
        .list_content(kind, &query, page, limit)
        .await
        .map_err(server_error("listing content"))?;
    let total = app_state
        .db_client
        .count_filtered(kind, &query)
        .await
        .map_err(server_error("counting content"))?;

    Ok(Json(ApiResponse::paginated(
        format!("{} list retrieved successfully", kind.display()),
        BriefContentDto::from_records(&records),
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip(app_state))]
pub async fn count(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let count = app_state
        .db_client
        .count_content(kind)
        .await
        .map_err(server_error("counting content"))?;

    Ok(Json(ApiResponse::ok(
        "Count retrieved successfully",
        CountDto { count },
    )))
}

/// Detail view. The view counter is incremented and persisted before the
/// response is built, so the returned `views` includes this request.
#[instrument(skip(app_state))]
pub async fn get_by_id(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .increment_views(kind, id)
        .await
        .map_err(server_error("incrementing views"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    let record = app_state
        .db_client
        .get_content(kind, id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    let comments = app_state
        .db_client
        .get_comments_for(id)
        .await
        .map_err(server_error("getting comments"))?;

    Ok(Json(ApiResponse::ok(
        format!("{} retrieved successfully", kind.display()),
        ContentDetailDto::from_record(&record, CommentDto::from_records(&comments)),
    )))
}

#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn create(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Json(body), _): WithRejection<Json<CreateContentDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid content input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .get_category(body.category)
        .await
        .map_err(server_error("getting category"))?
        .ok_or_else(|| HttpError::bad_request("Category not found"))?;

    let image = body
        .featured_image
        .clone()
        .map(|input| blob::decode(input, MAX_FEATURED_IMAGE_BYTES))
        .transpose()?;

    let item = app_state
        .db_client
        .save_content(kind, auth.user.id, &body, image)
        .await
        .map_err(server_error("saving content"))?;

    // Display-only aggregate, refreshed outside the insert.
    if let Err(e) = app_state.db_client.refresh_item_count(item.category_id).await {
        tracing::warn!(category_id = %item.category_id, "Failed to refresh category count: {}", e);
    }

    let record = app_state
        .db_client
        .get_content(kind, item.id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    tracing::info!(id = %item.id, "{} created", kind.display());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            format!("{} created successfully", kind.display()),
            ContentDetailDto::from_record(&record, vec![]),
        )),
    ))
}

/// Partial update. Existence is checked before authorization so a missing
/// item yields 404 rather than 403; the author column is never modified.
#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn update(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(id): Path<Uuid>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateContentDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid content input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = app_state
        .db_client
        .get_content_item(kind, id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    if !is_owner_or_admin(existing.author_id, &auth.user) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    if let Some(category) = body.category {
        if category != existing.category_id {
            app_state
                .db_client
                .get_category(category)
                .await
                .map_err(server_error("getting category"))?
                .ok_or_else(|| HttpError::bad_request("Category not found"))?;
        }
    }

    let image = match body.featured_image.clone() {
        None => None,
        Some(None) => Some(None),
        Some(Some(input)) => Some(Some(blob::decode(input, MAX_FEATURED_IMAGE_BYTES)?)),
    };

    let updated = app_state
        .db_client
        .update_content(kind, id, &body, image)
        .await
        .map_err(server_error("updating content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    // A category move leaves two stale counts behind.
    if updated.category_id != existing.category_id {
        for category_id in [existing.category_id, updated.category_id] {
            if let Err(e) = app_state.db_client.refresh_item_count(category_id).await {
                tracing::warn!(category_id = %category_id, "Failed to refresh category count: {}", e);
            }
        }
    }

    let record = app_state
        .db_client
        .get_content(kind, id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    let comments = app_state
        .db_client
        .get_comments_for(id)
        .await
        .map_err(server_error("getting comments"))?;

    tracing::info!(id = %id, "{} updated", kind.display());
    Ok(Json(ApiResponse::ok(
        format!("{} updated successfully", kind.display()),
        ContentDetailDto::from_record(&record, CommentDto::from_records(&comments)),
    )))
}

#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn delete(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let existing = app_state
        .db_client
        .get_content_item(kind, id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    if !is_owner_or_admin(existing.author_id, &auth.user) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let deleted = app_state
        .db_client
        .delete_content(kind, id)
        .await
        .map_err(server_error("deleting content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    if let Err(e) = app_state.db_client.refresh_item_count(deleted.category_id).await {
        tracing::warn!(category_id = %deleted.category_id, "Failed to refresh category count: {}", e);
    }

    tracing::info!(id = %id, "{} deleted", kind.display());
    Ok(Json(ApiResponse::message(format!(
        "{} deleted successfully",
        kind.display()
    ))))
}

/// Coarse like toggle: the liked state is derived from the counter itself
/// (`likes > 0`), so a decrement floors at zero and an increment marks it
/// liked. Read-then-write, last write wins.
#[instrument(skip(app_state, _auth))]
pub async fn toggle_like(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Extension(_auth): Extension<JWTAuthMiddleware>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let item = app_state
        .db_client
        .get_content_item(kind, id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    let target = if item.likes > 0 {
        item.likes - 1
    } else {
        item.likes + 1
    };

    let likes = app_state
        .db_client
        .set_likes(kind, id, target)
        .await
        .map_err(server_error("updating likes"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    Ok(Json(ApiResponse::ok(
        "Like toggled successfully",
        LikeStateDto {
            likes,
            liked: likes > 0,
        },
    )))
}

/// Unconditional share counter increment; no authentication required.
#[instrument(skip(app_state))]
pub async fn share(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let shares = app_state
        .db_client
        .increment_shares(kind, id)
        .await
        .map_err(server_error("incrementing shares"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    Ok(Json(ApiResponse::ok(
        "Share recorded successfully",
        SharesDto { shares },
    )))
}

#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn add_comment(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(id): Path<Uuid>,
    WithRejection(Json(body), _): WithRejection<Json<AddCommentDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .get_content_item(kind, id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    let comment = app_state
        .db_client
        .add_comment(id, auth.user.id, &body.text)
        .await
        .map_err(server_error("adding comment"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Comment added successfully",
            CommentDto::from_record(&comment),
        )),
    ))
}

/// Raw featured-image bytes with inline disposition.
#[instrument(skip(app_state))]
pub async fn featured_image(
    Extension(kind): Extension<ContentKind>,
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let item = app_state
        .db_client
        .get_content_item(kind, id)
        .await
        .map_err(server_error("getting content"))?
        .ok_or_else(|| HttpError::not_found(format!("{} not found", kind.display())))?;

    let image = item
        .featured_image()
        .ok_or_else(|| HttpError::not_found("No featured image"))?;

    blob::serve(&image)
}
