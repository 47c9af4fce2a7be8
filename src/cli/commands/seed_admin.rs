use anyhow::{bail, Result};
use model::entities::{user, Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, error, info, trace, warn};

use crate::auth::password;
use crate::config::connect_database;
use crate::handlers::users::normalize_email;

/// Credentials of the bootstrap admin account
pub struct AdminAccount {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub full_name: Option<String>,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

pub async fn seed_admin(database_url: &str, account: &AdminAccount) -> Result<()> {
    trace!("Entering seed_admin function");

    let db = match connect_database(database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e);
        }
    };

    let admin = upsert_admin(&db, account).await?;
    info!("Admin account ready: id={} email={}", admin.id, admin.email);
    Ok(())
}

/// Creates the admin, or promotes an existing account with the same email
/// and resets its password.
pub(crate) async fn upsert_admin<C: ConnectionTrait>(
    db: &C,
    account: &AdminAccount,
) -> Result<user::Model> {
    if account.password.len() < 8 {
        bail!("Admin password must be at least 8 characters");
    }

    let email = normalize_email(&account.email);
    let username = account
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    if let Some(username) = &username {
        let holder = user::Entity::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .filter(user::Column::Email.ne(email.as_str()))
            .one(db)
            .await?;
        if holder.is_some() {
            bail!("Username '{}' already belongs to another account", username);
        }
    }

    let hash = password::hash_password(&account.password)?;
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;

    let admin = match existing {
        Some(found) => {
            if found.role != Role::Admin {
                warn!("Promoting user {} from {} to admin", found.id, found.role);
            }
            debug!("Updating existing account {}", found.id);
            let mut active: user::ActiveModel = found.into();
            active.role = Set(Role::Admin);
            active.password = Set(hash);
            if username.is_some() {
                active.username = Set(username);
            }
            if let Some(full_name) = &account.full_name {
                active.full_name = Set(Some(full_name.clone()));
            }
            active.update(db).await?
        }
        None => {
            debug!("Creating admin account for {}", email);
            user::ActiveModel {
                username: Set(username),
                email: Set(email),
                password: Set(hash),
                full_name: Set(account.full_name.clone()),
                role: Set(Role::Admin),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    Ok(admin)
}
