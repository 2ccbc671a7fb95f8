use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::{User, UserRole},
    utils::token,
};

/// Inserted into request extensions after successful authentication; handlers
/// extract it to reach the caller's user row.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: User,
}

/// Ownership rule applied before every content or category mutation: the
/// resource owner may act, and so may any admin.
pub fn is_owner_or_admin(owner_id: Uuid, caller: &User) -> bool {
    caller.id == owner_id || caller.role == UserRole::Admin
}

/// Authentication middleware.
///
/// Token extraction order: `access_token` cookie first (browser clients),
/// then `Authorization: Bearer` header (API clients). The user row is
/// re-fetched so deleted or deactivated accounts fail even with a live token.
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("access_token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|token| token.to_owned())
                })
        })
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let subject = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user_id = Uuid::parse_str(&subject)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user = app_state
        .db_client
        .get_user(Some(user_id), None)
        .await
        .map_err(|_| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    if !user.is_active {
        return Err(HttpError::unauthorized(
            ErrorMessage::UserNoLongerExist.to_string(),
        ));
    }

    req.extensions_mut()
        .insert(JWTAuthMiddleware { user: user.clone() });

    Ok(next.run(req).await)
}

/// Role-based access control. Must run after `auth`.
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with(id: Uuid, role: UserRole) -> User {
        User {
            id,
            name: "tester".to_string(),
            email: "tester@example.com".to_string(),
            password: String::new(),
            phone: None,
            role,
            is_active: true,
            last_login: None,
            otp_code: None,
            otp_expires_at: None,
            picture_data: None,
            picture_content_type: None,
            picture_name: None,
            picture_size: None,
            picture_uploaded_at: None,
            picture_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_may_mutate_own_resource() {
        let id = Uuid::new_v4();
        let user = user_with(id, UserRole::User);
        assert!(is_owner_or_admin(id, &user));
    }

    #[test]
    fn admin_may_mutate_any_resource() {
        let admin = user_with(Uuid::new_v4(), UserRole::Admin);
        assert!(is_owner_or_admin(Uuid::new_v4(), &admin));
    }

    #[test]
    fn other_users_are_denied() {
        let user = user_with(Uuid::new_v4(), UserRole::User);
        assert!(!is_owner_or_admin(Uuid::new_v4(), &user));
    }
}
