//! Bearer-token authentication: password hashing, opaque token issuance and
//! the middleware that resolves a token into an [`AuthUser`].

mod middleware;
pub mod password;
pub mod token;

use chrono::Utc;
use model::entities::{access_token, user};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;

pub use middleware::{require_auth, AuthUser};
pub use token::NewToken;

use crate::error::Result;

/// Stores a new token for `user` and returns it with its persisted row.
pub async fn issue_token<C>(
    db: &C,
    user: &user::Model,
    ttl: chrono::Duration,
) -> Result<(NewToken, access_token::Model)>
where
    C: ConnectionTrait,
{
    let token = token::generate();
    let row = access_token::ActiveModel {
        tokenable_id: Set(user.id),
        token_type: Set(token::TOKEN_TYPE.to_string()),
        name: Set(None),
        hash: Set(token.hash.clone()),
        abilities: Set(r#"["*"]"#.to_string()),
        last_used_at: Set(None),
        expires_at: Set(Some(Utc::now() + ttl)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!("Issued access token {} for user {}", row.id, user.id);
    Ok((token, row))
}

/// Deletes every token owned by `user_id`, returning how many were removed.
pub async fn revoke_all_tokens<C>(db: &C, user_id: i32) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = access_token::Entity::delete_many()
        .filter(access_token::Column::TokenableId.eq(user_id))
        .exec(db)
        .await?;
    debug!("Revoked {} tokens of user {}", result.rows_affected, user_id);
    Ok(result.rows_affected)
}
