use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table; role is restricted to the three known values
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len_null(Users::Username, 50).unique_key())
                    .col(string_len(Users::Email, 254).unique_key())
                    .col(string(Users::Password))
                    .col(string_null(Users::FullName))
                    .col(
                        string_len(Users::Role, 16)
                            .default("user")
                            .check(Expr::col(Users::Role).is_in(["admin", "editor", "user"])),
                    )
                    .col(timestamp_with_time_zone(Users::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Users::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Create auth_access_tokens table
        manager
            .create_table(
                Table::create()
                    .table(AuthAccessTokens::Table)
                    .if_not_exists()
                    .col(pk_auto(AuthAccessTokens::Id))
                    .col(integer(AuthAccessTokens::TokenableId))
                    .col(string(AuthAccessTokens::Type))
                    .col(string_null(AuthAccessTokens::Name))
                    .col(string(AuthAccessTokens::Hash).unique_key())
                    .col(text(AuthAccessTokens::Abilities))
                    .col(timestamp_with_time_zone_null(AuthAccessTokens::LastUsedAt))
                    .col(timestamp_with_time_zone_null(AuthAccessTokens::ExpiresAt))
                    .col(
                        timestamp_with_time_zone(AuthAccessTokens::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(AuthAccessTokens::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auth_access_tokens_user")
                            .from(AuthAccessTokens::Table, AuthAccessTokens::TokenableId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_auth_access_tokens_tokenable_id")
                    .table(AuthAccessTokens::Table)
                    .col(AuthAccessTokens::TokenableId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthAccessTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Username,
    Email,
    Password,
    FullName,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AuthAccessTokens {
    Table,
    Id,
    TokenableId,
    Type,
    Name,
    Hash,
    Abilities,
    LastUsedAt,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
