use crate::{
    AppState,
    db::CategoryExt,
    dtos::{
        ApiResponse, CategoryDto, CategoryQueryDto, ContentSummaryDto, CountDto,
        CreateCategoryDto, PaginationDto, UpdateCategoryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth, is_owner_or_admin},
    utils::text,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_extra::extract::WithRejection;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 50;
const DEFAULT_ITEMS_LIMIT: i64 = 10;

pub fn category_handler(app_state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create))
        .route("/{id}", put(update).delete(delete))
        .layer(middleware::from_fn_with_state(app_state, auth));

    Router::new()
        .route("/", get(list))
        .route("/count", get(count))
        .route("/slug/{slug}", get(get_by_slug))
        .route("/{id}", get(get_by_id))
        .route("/{id}/items", get(items))
        .merge(protected)
}

fn server_error<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> HttpError + '_ {
    move |e| {
        tracing::error!("DB error, {}: {}", context, e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    }
}

/// Active categories by default; pass `isActive=false` for the rest.
#[instrument(skip(app_state, query))]
pub async fn list(
    State(app_state): State<AppState>,
    Query(query): Query<CategoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let is_active = Some(query.is_active.unwrap_or(true));

    let categories = app_state
        .db_client
        .list_categories(is_active, query.search.as_deref(), page, limit)
        .await
        .map_err(server_error("listing categories"))?;
    let total = app_state
        .db_client
        .count_filtered_categories(is_active, query.search.as_deref())
        .await
        .map_err(server_error("counting categories"))?;

    Ok(Json(ApiResponse::paginated(
        "Categories retrieved successfully",
        CategoryDto::from_models(&categories),
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip(app_state))]
pub async fn count(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let count = app_state
        .db_client
        .count_categories()
        .await
        .map_err(server_error("counting categories"))?;

    Ok(Json(ApiResponse::ok(
        "Count retrieved successfully",
        CountDto { count },
    )))
}

#[instrument(skip(app_state))]
pub async fn get_by_id(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let category = app_state
        .db_client
        .get_category(id)
        .await
        .map_err(server_error("getting category"))?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;

    Ok(Json(ApiResponse::ok(
        "Category retrieved successfully",
        CategoryDto::from_model(&category),
    )))
}

#[instrument(skip(app_state))]
pub async fn get_by_slug(
    State(app_state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let category = app_state
        .db_client
        .get_category_by_slug(&slug)
        .await
        .map_err(server_error("getting category"))?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;

    Ok(Json(ApiResponse::ok(
        "Category retrieved successfully",
        CategoryDto::from_model(&category),
    )))
}

/// Content items of any kind within one category, newest first.
#[instrument(skip(app_state, query))]
pub async fn items(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CategoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .get_category(id)
        .await
        .map_err(server_error("getting category"))?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;

    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_ITEMS_LIMIT);

    let records = app_state
        .db_client
        .items_in_category(id, page, limit)
        .await
        .map_err(server_error("listing category items"))?;
    let total = app_state
        .db_client
        .count_items_in(id)
        .await
        .map_err(server_error("counting category items"))?;

    Ok(Json(ApiResponse::paginated(
        "Category items retrieved successfully",
        ContentSummaryDto::from_records(&records),
        PaginationDto::new(page, limit, total),
    )))
}

/// Names are stored lowercased; the slug is derived from the name when the
/// client does not supply one.
#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn create(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Json(body), _): WithRejection<Json<CreateCategoryDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid category input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let name = body.name.to_lowercase();
    let slug = match &body.slug {
        Some(slug) => text::slugify(slug),
        None => text::slugify(&name),
    };
    if slug.is_empty() {
        return Err(HttpError::bad_request("Category slug cannot be empty"));
    }

    if let Some(existing) = app_state
        .db_client
        .find_category_conflict(&name, &slug, None)
        .await
        .map_err(server_error("checking category conflict"))?
    {
        tracing::error!(conflicting_id = %existing.id, "Category name or slug already taken");
        return Err(HttpError::conflict(
            "Category with this name or slug already exists",
        ));
    }

    let category = app_state
        .db_client
        .save_category(
            auth.user.id,
            &name,
            &slug,
            body.description.as_deref(),
            body.color.as_deref(),
            body.icon.as_deref(),
            body.is_active.unwrap_or(true),
        )
        .await
        .map_err(server_error("saving category"))?;

    tracing::info!(id = %category.id, name = %category.name, "Category created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Category created successfully",
            CategoryDto::from_model(&category),
        )),
    ))
}

#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn update(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(id): Path<Uuid>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateCategoryDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid category input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = app_state
        .db_client
        .get_category(id)
        .await
        .map_err(server_error("getting category"))?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;

    if !is_owner_or_admin(existing.created_by, &auth.user) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let name = body.name.as_ref().map(|name| name.to_lowercase());
    let slug = body.slug.as_ref().map(|slug| text::slugify(slug));
    if slug.as_deref() == Some("") {
        return Err(HttpError::bad_request("Category slug cannot be empty"));
    }

    if name.is_some() || slug.is_some() {
        let check_name = name.clone().unwrap_or_else(|| existing.name.clone());
        let check_slug = slug.clone().unwrap_or_else(|| existing.slug.clone());
        if app_state
            .db_client
            .find_category_conflict(&check_name, &check_slug, Some(id))
            .await
            .map_err(server_error("checking category conflict"))?
            .is_some()
        {
            return Err(HttpError::conflict(
                "Category with this name or slug already exists",
            ));
        }
    }

    let category = app_state
        .db_client
        .update_category(
            id,
            name,
            slug,
            body.description.clone(),
            body.color.clone(),
            body.icon.clone(),
            body.is_active,
        )
        .await
        .map_err(server_error("updating category"))?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;

    tracing::info!(id = %category.id, "Category updated");
    Ok(Json(ApiResponse::ok(
        "Category updated successfully",
        CategoryDto::from_model(&category),
    )))
}

/// Deletion is blocked while any content item still references the category;
/// the conflict message carries the blocking count.
#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn delete(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let existing = app_state
        .db_client
        .get_category(id)
        .await
        .map_err(server_error("getting category"))?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;

    if !is_owner_or_admin(existing.created_by, &auth.user) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let in_use = app_state
        .db_client
        .count_items_in(id)
        .await
        .map_err(server_error("counting category items"))?;
    if in_use > 0 {
        return Err(HttpError::conflict(format!(
            "Cannot delete category: {} content items are using it",
            in_use
        )));
    }

    app_state
        .db_client
        .delete_category(id)
        .await
        .map_err(server_error("deleting category"))?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;

    tracing::info!(id = %id, "Category deleted");
    Ok(Json(ApiResponse::message("Category deleted successfully")))
}
