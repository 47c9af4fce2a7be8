//! Root of the SeaORM entity modules: teams, players, users, news posts and
//! the access tokens issued at login.

/// Stamps `created_at` on insert and `updated_at` on every save.
macro_rules! touch {
    ($model:expr, $insert:expr) => {{
        let mut model = $model;
        let now = ::chrono::Utc::now();
        if $insert && model.created_at.is_not_set() {
            model.created_at = ::sea_orm::ActiveValue::Set(now);
        }
        model.updated_at = ::sea_orm::ActiveValue::Set(now);
        model
    }};
}
pub(crate) use touch;

pub mod access_token;
pub mod news;
pub mod player;
pub mod team;
pub mod user;

pub use user::Role;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::access_token::Entity as AccessToken;
    pub use super::news::Entity as News;
    pub use super::player::Entity as Player;
    pub use super::team::Entity as Team;
    pub use super::user::Entity as User;
}
