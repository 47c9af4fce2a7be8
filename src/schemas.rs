use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use storage::{ImageFile, StorageProvider, UploadedImage};
use tracing::{debug, warn};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::config::Settings;
use crate::error::{FieldError, Result};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Image storage backend selected at start-up
    pub storage: Arc<dyn StorageProvider>,
    /// Runtime settings
    pub settings: Arc<Settings>,
}

impl AppState {
    pub async fn store_image(&self, file: &ImageFile, folder: &str) -> Result<UploadedImage> {
        debug!("Storing image '{}' in folder '{}'", file.file_name, folder);
        Ok(self.storage.upload_image(file, folder).await?)
    }

    /// Best-effort removal of an image this service stored. Only rows that
    /// recorded a storage id qualify; URLs supplied by clients are never
    /// deleted. Failures are logged and never reach the caller.
    pub async fn discard_image(&self, url: Option<&str>, public_id: Option<&str>) {
        let (Some(url), Some(public_id)) = (url, public_id) else {
            return;
        };
        if let Err(e) = self.storage.delete_image(url, Some(public_id)).await {
            warn!("Failed to delete image {}: {}", url, e);
        }
    }

    /// Drops an upload whose row was never written.
    pub async fn discard_upload(&self, image: Option<&UploadedImage>) {
        if let Some(image) = image {
            self.discard_image(Some(&image.url), image.public_id.as_deref())
                .await;
        }
    }
}

/// Page metadata attached to paginated list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Success status
    pub success: bool,
    /// Response message
    pub message: String,
    /// Response data
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<T>,
    /// Present on paginated lists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: Option<Pagination>, message: impl Into<String>) -> Self {
        Self {
            pagination,
            ..Self::ok(data, message)
        }
    }
}

impl ApiResponse<()> {
    /// A success envelope that carries only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Success status (always false for errors)
    pub success: bool,
    /// Human-readable error message
    pub message: String,
    /// Stable error code, e.g. `TEAM_NOT_FOUND`
    pub code: String,
    /// Field-level validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
    /// Active image storage provider
    pub storage: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::register,
        crate::handlers::auth::me,
        crate::handlers::teams::get_teams,
        crate::handlers::teams::create_team,
        crate::handlers::teams::get_team,
        crate::handlers::teams::update_team,
        crate::handlers::teams::delete_team,
        crate::handlers::players::get_players,
        crate::handlers::players::create_player,
        crate::handlers::players::get_player,
        crate::handlers::players::update_player,
        crate::handlers::players::delete_player,
        crate::handlers::players::assign_team,
        crate::handlers::users::get_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::change_role,
        crate::handlers::news::get_news,
        crate::handlers::news::create_news,
        crate::handlers::news::get_news_item,
        crate::handlers::news::update_news,
        crate::handlers::news::delete_news,
        crate::handlers::news::my_news,
        crate::handlers::news::news_by_user,
    ),
    components(
        schemas(
            ErrorResponse,
            FieldError,
            HealthResponse,
            Pagination,
            model::entities::Role,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::teams::CreateTeamRequest,
            crate::handlers::teams::UpdateTeamRequest,
            crate::handlers::teams::TeamResponse,
            crate::handlers::teams::TeamSummary,
            crate::handlers::players::CreatePlayerRequest,
            crate::handlers::players::UpdatePlayerRequest,
            crate::handlers::players::AssignTeamRequest,
            crate::handlers::players::PlayerResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::ChangeRoleRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::news::CreateNewsRequest,
            crate::handlers::news::UpdateNewsRequest,
            crate::handlers::news::NewsResponse,
            crate::handlers::news::NewsAuthor,
            crate::handlers::news::NewsByUserResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login, logout and registration"),
        (name = "teams", description = "Team management"),
        (name = "players", description = "Player management and team assignment"),
        (name = "users", description = "Account administration (admin only)"),
        (name = "news", description = "News posts"),
    ),
    info(
        title = "Roster API",
        description = "Roster management for an esports organization: teams, players, news and users",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
