use crate::auth::{issue_token, password, revoke_all_tokens, AuthUser};
use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::handlers::users::{ensure_email_free, ensure_username_free, normalize_email, UserResponse};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chrono::{DateTime, Utc};
use model::entities::{access_token, user, Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Login with a username or an email address
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Issued bearer token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Always `bearer`
    #[serde(rename = "type")]
    pub token_type: String,
    /// The token to send as `Authorization: Bearer <value>`
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: UserResponse,
}

/// Self-service registration. The account always gets the `user` role.
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(alias = "full_name")]
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

/// Issue a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing username/email or password", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    trace!("Entering login function");

    let identifier = request
        .username
        .as_deref()
        .or(request.email.as_deref())
        .map(str::trim)
        .filter(|identifier| !identifier.is_empty())
        .ok_or_else(|| AppError::validation("username", "username or email is required"))?
        .to_string();
    debug!("Login attempt for '{}'", identifier);

    let found = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(identifier.as_str()))
                .add(user::Column::Email.eq(normalize_email(&identifier))),
        )
        .one(&state.db)
        .await?;

    let Some(account) = found else {
        warn!("Login failed: no account matches '{}'", identifier);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !password::verify_password(&request.password, &account.password)? {
        warn!("Login failed: wrong password for user {}", account.id);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let txn = state.db.begin().await?;
    if account.role == Role::Admin {
        // Admins keep a single active session
        let revoked = revoke_all_tokens(&txn, account.id).await?;
        debug!("Revoked {} previous tokens of admin {}", revoked, account.id);
    }
    let (token, row) = issue_token(&txn, &account, state.settings.token_ttl).await?;
    txn.commit().await?;

    info!("User {} logged in", account.id);
    Ok(Json(ApiResponse::ok(
        LoginResponse {
            token_type: "bearer".to_string(),
            value: token.secret,
            expires_at: row.expires_at,
            user: UserResponse::from(account),
        },
        "Login successful",
    )))
}

/// Revoke the presented token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<String>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<()>>> {
    trace!("Entering logout function");

    access_token::Entity::delete_by_id(auth.token_id)
        .exec(&state.db)
        .await?;
    info!("User {} logged out, token {} revoked", auth.id, auth.token_id);

    Ok(Json(ApiResponse::message("Logged out successfully")))
}

/// Self-service registration
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email or username already registered", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    trace!("Entering register function");

    let email = normalize_email(&request.email);
    let username = request.username.as_deref().map(str::trim).map(str::to_string);
    debug!("Registering account for {}", email);

    ensure_email_free(&state.db, &email).await?;
    if let Some(username) = &username {
        ensure_username_free(&state.db, username).await?;
    }

    let account = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password: Set(password::hash_password(&request.password)?),
        full_name: Set(request.full_name.map(|name| name.trim().to_string())),
        role: Set(Role::User),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Registered user {}", account.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(account), "User registered successfully")),
    ))
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile retrieved", body = ApiResponse<UserResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let account = user::Entity::find_by_id(auth.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(ApiResponse::ok(UserResponse::from(account), "Profile retrieved successfully")))
}
