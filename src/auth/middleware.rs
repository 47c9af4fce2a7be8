use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use model::entities::{access_token, user, Role};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, trace, warn};

use super::token::hash_token;
use crate::error::AppError;
use crate::schemas::AppState;

/// Authenticated caller, available to handlers as `Extension<AuthUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
    /// Row id of the presented token, used by logout.
    pub token_id: i32,
}

fn bearer_secret(request: &Request) -> Result<&str, AppError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, secret)) if scheme.eq_ignore_ascii_case("bearer") && !secret.trim().is_empty() => {
            Ok(secret.trim())
        }
        _ => Err(AppError::Unauthorized(
            "Invalid Authorization header format. Expected 'Bearer <token>'".to_string(),
        )),
    }
}

/// Resolves `Authorization: Bearer <token>` into an [`AuthUser`].
///
/// Rejects with `UNAUTHORIZED` when the header is missing or malformed, the
/// token is unknown or expired, or its owner no longer exists.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let hash = hash_token(bearer_secret(&request)?);

    let found = access_token::Entity::find()
        .filter(access_token::Column::Hash.eq(hash))
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?;

    let (token, owner) = match found {
        Some((token, Some(owner))) => (token, owner),
        Some((token, None)) => {
            warn!("Token {} has no owner", token.id);
            return Err(AppError::Unauthorized("Invalid or expired token".to_string()));
        }
        None => {
            debug!("Unknown access token presented");
            return Err(AppError::Unauthorized("Invalid or expired token".to_string()));
        }
    };

    let now = Utc::now();
    if token.is_expired(now) {
        debug!("Token {} of user {} expired", token.id, owner.id);
        access_token::Entity::delete_by_id(token.id).exec(&state.db).await?;
        return Err(AppError::Unauthorized("Invalid or expired token".to_string()));
    }

    let auth_user = AuthUser {
        id: owner.id,
        role: owner.role,
        token_id: token.id,
    };

    let mut active: access_token::ActiveModel = token.into();
    active.last_used_at = Set(Some(now));
    active.update(&state.db).await?;

    trace!("Authenticated user {} ({})", auth_user.id, auth_user.role);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
