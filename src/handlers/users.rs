use crate::auth::{password::hash_password, AuthUser};
use crate::error::{AppError, Result};
use crate::extract::{PageParams, PathParam, ValidatedJson, ValidatedQuery};
use crate::handlers::fetch_page;
use crate::policy::{authorize, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use model::entities::{user, Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a new user
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: Option<String>,
    /// Email address (must be unique)
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    /// Plain password, at least 8 characters
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    /// Defaults to `user`
    pub role: Option<Role>,
    #[serde(alias = "full_name")]
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
}

/// Request body for updating a user. Absent fields are left unchanged.
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
    #[serde(alias = "full_name")]
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
}

/// Request body for changing a user's role
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// User response model. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub username: Option<String>,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fails with `CONFLICT` when another account already uses `email`.
pub(crate) async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str) -> Result<()> {
    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;
    if taken.is_some() {
        warn!("Email '{}' is already registered", email);
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    Ok(())
}

/// Fails with `CONFLICT` when another account already uses `username`.
pub(crate) async fn ensure_username_free<C: ConnectionTrait>(db: &C, username: &str) -> Result<()> {
    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if taken.is_some() {
        warn!("Username '{}' is already registered", username);
        return Err(AppError::Conflict("Username is already registered".to_string()));
    }
    Ok(())
}

async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("User with ID {} not found", user_id);
            AppError::NotFound(format!("User with ID {} not found", user_id))
        })
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 409, description = "Email or username already registered", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(caller = auth.id))]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    trace!("Entering create_user function");
    authorize(auth.role, Resource::User, Action::Create)?;

    let email = normalize_email(&request.email);
    let username = request.username.as_deref().map(str::trim).map(str::to_string);
    let role = request.role.unwrap_or_default();
    debug!("Creating user with email: {}, role: {}", email, role);

    ensure_email_free(&state.db, &email).await?;
    if let Some(username) = &username {
        ensure_username_free(&state.db, username).await?;
    }

    let new_user = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password: Set(hash_password(&request.password)?),
        full_name: Set(request.full_name.map(|name| name.trim().to_string())),
        role: Set(role),
        ..Default::default()
    };

    trace!("Attempting to insert new user into database");
    let user_model = new_user.insert(&state.db).await?;
    info!("User created successfully with ID: {}, email: {}", user_model.id, user_model.email);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(user_model), "User created successfully")),
    ))
}

/// Get all users, newest first
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(PageParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>> {
    trace!("Entering get_users function");
    authorize(auth.role, Resource::User, Action::List)?;

    let select = user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id);
    let (users, pagination) = fetch_page(&state.db, select, &params).await?;

    let user_count = users.len();
    let user_responses: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    info!("Successfully retrieved {} users", user_count);
    Ok(Json(ApiResponse::paginated(
        user_responses,
        pagination,
        "Users retrieved successfully",
    )))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    PathParam(user_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    trace!("Entering get_user function for user_id: {}", user_id);
    authorize(auth.role, Resource::User, Action::Read)?;

    let user_model = find_user(&state.db, user_id).await?;
    debug!("Successfully retrieved user with ID: {}", user_model.id);

    Ok(Json(ApiResponse::ok(
        UserResponse::from(user_model),
        "User retrieved successfully",
    )))
}

/// Update a user
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email or username already registered", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_user(
    PathParam(user_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    trace!("Entering update_user function for user_id: {}", user_id);
    authorize(auth.role, Resource::User, Action::Update)?;

    let existing = find_user(&state.db, user_id).await?;
    if request.role.is_some() && existing.id == auth.id {
        warn!("User {} tried to change their own role through update", auth.id);
        return Err(AppError::SelfRoleChange);
    }

    // Uniqueness is only re-checked for values that actually change
    let email = request.email.as_deref().map(normalize_email);
    if let Some(email) = email.as_deref().filter(|email| *email != existing.email) {
        ensure_email_free(&state.db, email).await?;
    }
    let username = request.username.as_deref().map(str::trim).map(str::to_string);
    if let Some(username) = username
        .as_deref()
        .filter(|username| existing.username.as_deref() != Some(*username))
    {
        ensure_username_free(&state.db, username).await?;
    }

    let mut user_active: user::ActiveModel = existing.into();

    if let Some(username) = username {
        trace!("Updating username to: {}", username);
        user_active.username = Set(Some(username));
    }
    if let Some(email) = email {
        trace!("Updating email to: {}", email);
        user_active.email = Set(email);
    }
    if let Some(password) = &request.password {
        trace!("Re-hashing password");
        user_active.password = Set(hash_password(password)?);
    }
    if let Some(role) = request.role {
        trace!("Updating role to: {}", role);
        user_active.role = Set(role);
    }
    if let Some(full_name) = request.full_name {
        user_active.full_name = Set(Some(full_name.trim().to_string()));
    }

    let updated = user_active.update(&state.db).await?;
    info!("User with ID {} updated successfully", updated.id);

    Ok(Json(ApiResponse::ok(
        UserResponse::from(updated),
        "User updated successfully",
    )))
}

/// Delete a user. Their news and tokens are removed with them.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 400, description = "Caller tried to delete their own account", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    PathParam(user_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<()>>> {
    trace!("Entering delete_user function for user_id: {}", user_id);
    authorize(auth.role, Resource::User, Action::Delete)?;

    let target = find_user(&state.db, user_id).await?;
    if target.id == auth.id {
        warn!("User {} tried to delete their own account", auth.id);
        return Err(AppError::SelfDelete);
    }

    user::Entity::delete_by_id(target.id).exec(&state.db).await?;
    info!("User with ID {} deleted successfully", target.id);

    Ok(Json(ApiResponse::message(format!(
        "User '{}' deleted successfully",
        target.email
    ))))
}

/// Change a user's role
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/role",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    request_body = ChangeRoleRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Role updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid role, or caller tried to change their own role", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn change_role(
    PathParam(user_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<ChangeRoleRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    trace!("Entering change_role function for user_id: {}", user_id);
    authorize(auth.role, Resource::User, Action::ChangeRole)?;

    let target = find_user(&state.db, user_id).await?;
    if target.id == auth.id {
        warn!("User {} tried to change their own role", auth.id);
        return Err(AppError::SelfRoleChange);
    }

    let previous = target.role;
    let mut user_active: user::ActiveModel = target.into();
    user_active.role = Set(request.role);
    let updated = user_active.update(&state.db).await?;
    info!("User {} role changed from {} to {}", updated.id, previous, updated.role);

    Ok(Json(ApiResponse::ok(
        UserResponse::from(updated),
        format!("Role changed to {}", request.role),
    )))
}
