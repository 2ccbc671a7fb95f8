use crate::{
    AppState,
    db::{CategoryExt, ContentExt, UserExt},
    dtos::{
        ApiResponse, FilterUserDto, PaginationDto, PublishedPercentageDto, RecentActivityDto,
        StatisticsDto, UserListQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{auth, role_check},
    models::{ContentKind, UserRole},
    utils::blob,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const RECENT_WINDOW_DAYS: i64 = 7;

pub fn users_handler(app_state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list))
        .route("/statistics", get(statistics))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth));

    Router::new()
        .route("/{id}/profile-picture", get(profile_picture))
        .merge(admin)
}

fn server_error<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> HttpError + '_ {
    move |e| {
        tracing::error!("DB error, {}: {}", context, e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    }
}

/// Admin listing with name/email search and role/active filters.
#[instrument(skip(app_state, query))]
pub async fn list(
    State(app_state): State<AppState>,
    Query(query): Query<UserListQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let role = match query.role.as_deref() {
        None => None,
        Some("admin") => Some(UserRole::Admin),
        Some("user") => Some(UserRole::User),
        Some(other) => {
            return Err(HttpError::bad_request(format!(
                "Invalid role filter: {}",
                other
            )));
        }
    };

    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let users = app_state
        .db_client
        .get_users(query.search.as_deref(), role, query.is_active, page, limit)
        .await
        .map_err(server_error("listing users"))?;
    let total = app_state
        .db_client
        .count_users(query.search.as_deref(), role, query.is_active)
        .await
        .map_err(server_error("counting users"))?;

    Ok(Json(ApiResponse::paginated(
        "Users retrieved successfully",
        FilterUserDto::filter_users(&users),
        PaginationDto::new(page, limit, total),
    )))
}

/// Dashboard totals: users, categories, per-kind content with published
/// counts and percentages, plus seven-day creation activity.
#[instrument(skip(app_state))]
pub async fn statistics(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;

    let total_users = db
        .count_users(None, None, None)
        .await
        .map_err(server_error("counting users"))?;
    let active_users = db
        .count_users(None, None, Some(true))
        .await
        .map_err(server_error("counting users"))?;
    let total_categories = db
        .count_categories()
        .await
        .map_err(server_error("counting categories"))?;

    let total_news = db
        .count_content(ContentKind::News)
        .await
        .map_err(server_error("counting content"))?;
    let published_news = db
        .count_published(ContentKind::News)
        .await
        .map_err(server_error("counting content"))?;
    let total_blogs = db
        .count_content(ContentKind::Blog)
        .await
        .map_err(server_error("counting content"))?;
    let published_blogs = db
        .count_published(ContentKind::Blog)
        .await
        .map_err(server_error("counting content"))?;
    let total_articles = db
        .count_content(ContentKind::Article)
        .await
        .map_err(server_error("counting content"))?;
    let published_articles = db
        .count_published(ContentKind::Article)
        .await
        .map_err(server_error("counting content"))?;

    let new_users = db
        .count_recent_users(RECENT_WINDOW_DAYS)
        .await
        .map_err(server_error("counting recent users"))?;
    let new_news = db
        .count_recent(ContentKind::News, RECENT_WINDOW_DAYS)
        .await
        .map_err(server_error("counting recent content"))?;
    let new_blogs = db
        .count_recent(ContentKind::Blog, RECENT_WINDOW_DAYS)
        .await
        .map_err(server_error("counting recent content"))?;
    let new_articles = db
        .count_recent(ContentKind::Article, RECENT_WINDOW_DAYS)
        .await
        .map_err(server_error("counting recent content"))?;

    Ok(Json(ApiResponse::ok(
        "Statistics retrieved successfully",
        StatisticsDto {
            total_users,
            active_users,
            total_categories,
            total_news,
            published_news,
            total_blogs,
            published_blogs,
            total_articles,
            published_articles,
            recent_activity: RecentActivityDto {
                new_users,
                new_news,
                new_blogs,
                new_articles,
            },
            published_percentage: PublishedPercentageDto {
                news: PublishedPercentageDto::ratio(published_news, total_news),
                blogs: PublishedPercentageDto::ratio(published_blogs, total_blogs),
                articles: PublishedPercentageDto::ratio(published_articles, total_articles),
            },
        },
    )))
}

/// Raw profile-picture bytes with inline disposition.
#[instrument(skip(app_state))]
pub async fn profile_picture(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(id), None)
        .await
        .map_err(server_error("getting user"))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let picture = user
        .profile_picture()
        .ok_or_else(|| HttpError::not_found("No profile picture"))?;

    blob::serve(&picture)
}
