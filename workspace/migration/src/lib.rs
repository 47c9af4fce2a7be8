pub use sea_orm_migration::prelude::*;

mod m20250801_000001_create_teams_and_players;
mod m20250801_000002_create_users_and_access_tokens;
mod m20250801_000003_create_news;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_teams_and_players::Migration),
            Box::new(m20250801_000002_create_users_and_access_tokens::Migration),
            Box::new(m20250801_000003_create_news::Migration),
        ]
    }
}
