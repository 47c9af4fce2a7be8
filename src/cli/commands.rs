pub mod hash_password;
pub mod initdb;
pub mod migrate_and_serve;
pub mod seed_admin;
pub mod serve;

pub use hash_password::hash_password;
pub use initdb::init_database;
pub use migrate_and_serve::migrate_and_serve;
pub use seed_admin::{seed_admin, AdminAccount};
pub use serve::serve;
