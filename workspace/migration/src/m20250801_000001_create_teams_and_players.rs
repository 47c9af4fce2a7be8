use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create teams table
        manager
            .create_table(
                Table::create()
                    .table(Teams::Table)
                    .if_not_exists()
                    .col(pk_uuid(Teams::TeamId))
                    .col(string_len(Teams::Name, 255))
                    .col(string_null(Teams::Slug).unique_key())
                    .col(string_null(Teams::Emoji))
                    .col(text_null(Teams::BannerUrl))
                    .col(text_null(Teams::BannerPublicId))
                    .col(text_null(Teams::Description))
                    .col(json_null(Teams::Achievements))
                    .col(timestamp_with_time_zone(Teams::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Teams::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Create players table; a deleted team leaves its players as free agents
        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(pk_uuid(Players::PlayerId))
                    .col(string_len(Players::Name, 255))
                    .col(integer_null(Players::Age))
                    .col(string_null(Players::Role))
                    .col(string_null(Players::Country))
                    .col(string_null(Players::Instagram))
                    .col(text_null(Players::Bio))
                    .col(json_null(Players::Stats))
                    .col(text_null(Players::PhotoUrl))
                    .col(text_null(Players::PhotoPublicId))
                    .col(uuid_null(Players::TeamId))
                    .col(timestamp_with_time_zone(Players::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Players::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_players_team")
                            .from(Players::Table, Players::TeamId)
                            .to(Teams::Table, Teams::TeamId)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_players_team_id")
                    .table(Players::Table)
                    .col(Players::TeamId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Teams::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Teams {
    Table,
    TeamId,
    Name,
    Slug,
    Emoji,
    BannerUrl,
    BannerPublicId,
    Description,
    Achievements,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Players {
    Table,
    PlayerId,
    Name,
    Age,
    Role,
    Country,
    Instagram,
    Bio,
    Stats,
    PhotoUrl,
    PhotoPublicId,
    TeamId,
    CreatedAt,
    UpdatedAt,
}
