use crate::{
    AppState,
    db::UserExt,
    dtos::{
        ApiResponse, FilterUserDto, ForgotPasswordDto, LoginDataDto, LoginUserDto,
        RegisterUserDto, UpdateProfileDto, VerifyOtpDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::{send_otp_email, send_welcome_email},
    middleware::{JWTAuthMiddleware, auth},
    utils::{
        blob::{self, MAX_PROFILE_PICTURE_BYTES},
        password, token,
    },
};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{WithRejection, cookie::Cookie};
use chrono::{Duration, Utc};
use rand::Rng;
use tracing::instrument;
use validator::Validate;

/// Minutes a one-time code stays valid.
const OTP_TTL_MINUTES: i64 = 10;

pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
        .layer(middleware::from_fn_with_state(app_state, auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/verify-otp", post(verify_otp))
        .merge(protected)
}

/// Register a new account. The account is active immediately; the welcome
/// mail is best-effort and never blocks registration.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterUserDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(&body.name, &body.email, &hash_password, body.phone.as_deref())
        .await;

    match result {
        Ok(user) => {
            if let Err(e) =
                send_welcome_email(&user.email, &user.name, &app_state.env.frontend_url).await
            {
                tracing::error!("Failed to send welcome email: {}", e);
            }

            tracing::info!(email = %user.email, "Register successful");
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::ok(
                    "User registered successfully",
                    FilterUserDto::filter_user(&user),
                )),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            Err(HttpError::conflict("Email is already registered"))
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Login with email and password; issues the bearer token both in the body
/// and as an `access_token` cookie.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginUserDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized("Invalid email or password"))?;

    if !user.is_active {
        return Err(HttpError::unauthorized("Account is deactivated"));
    }

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized("Invalid email or password")
    })?;

    if !password_matched {
        return Err(HttpError::unauthorized("Invalid email or password"));
    }

    let access_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if let Err(e) = app_state.db_client.update_last_login(user.id).await {
        tracing::warn!(user_id = %user.id, "Failed to update last login: {}", e);
    }

    let cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(time::Duration::seconds(app_state.env.jwt_maxage))
        .build();

    let mut response = Json(ApiResponse::ok(
        "Login successful",
        LoginDataDto {
            token: access_token,
            user: FilterUserDto::filter_user(&user),
        },
    ))
    .into_response();

    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    tracing::info!(email = %user.email, "Login successful");
    Ok(response)
}

/// Authenticated acknowledgment that also clears the token cookie.
#[instrument(skip_all)]
pub async fn logout(
    Extension(_auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let cookie = Cookie::build(("access_token", ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build();

    let mut response = Json(ApiResponse::message("Logged out successfully")).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    Ok(response)
}

#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn get_profile(
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(ApiResponse::ok(
        "Profile retrieved successfully",
        FilterUserDto::filter_user(&auth.user),
    )))
}

/// Partial profile update; the picture goes through the media codec with the
/// profile-picture size cap.
#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn update_profile(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateProfileDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid profile input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let picture = match body.profile_picture {
        None => None,
        Some(None) => Some(None),
        Some(Some(input)) => Some(Some(blob::decode(input, MAX_PROFILE_PICTURE_BYTES)?)),
    };

    let user = app_state
        .db_client
        .update_profile(auth.user.id, body.name, body.phone, picture)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating profile: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Profile updated successfully",
        FilterUserDto::filter_user(&user),
    )))
}

/// Issue a 6-digit one-time code and mail it to the account address.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<ForgotPasswordDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid forgot-password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User with this email does not exist"))?;

    let otp = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
    let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

    app_state
        .db_client
        .set_otp(user.id, &otp, expires_at)
        .await
        .map_err(|e| {
            tracing::error!("DB error, storing OTP: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if let Err(e) = send_otp_email(&user.email, &user.name, &otp).await {
        tracing::error!("Failed to send OTP email: {}", e);
        return Err(HttpError::server_error("Failed to send OTP email"));
    }

    tracing::info!(email = %user.email, "OTP issued");
    Ok(Json(ApiResponse::message("OTP sent to your email")))
}

/// Consume a one-time code and set the new password. The code is single-use:
/// it is cleared in the same statement that writes the password.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<VerifyOtpDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid verify-otp input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User with this email does not exist"))?;

    let valid = match (&user.otp_code, user.otp_expires_at) {
        (Some(code), Some(expires_at)) => code == &body.otp && expires_at > Utc::now(),
        _ => false,
    };
    if !valid {
        return Err(HttpError::bad_request("Invalid or expired OTP"));
    }

    let hash_password = password::hash(&body.new_password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    app_state
        .db_client
        .update_password(user.id, &hash_password)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating password: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(email = %user.email, "Password reset via OTP");
    Ok(Json(ApiResponse::message("Password reset successfully")))
}
