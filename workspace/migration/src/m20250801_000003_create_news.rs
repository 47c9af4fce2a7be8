use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250801_000002_create_users_and_access_tokens::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create news table; removing an author removes their posts
        manager
            .create_table(
                Table::create()
                    .table(News::Table)
                    .if_not_exists()
                    .col(pk_auto(News::Id))
                    .col(string_len(News::Titulo, 255))
                    .col(date(News::Fecha))
                    .col(text_null(News::Comentario))
                    .col(integer(News::UserId))
                    .col(timestamp_with_time_zone(News::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(News::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_news_user")
                            .from(News::Table, News::UserId)
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
                    .name("idx_news_user_id")
                    .table(News::Table)
                    .col(News::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(News::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum News {
    Table,
    Id,
    Titulo,
    Fecha,
    Comentario,
    UserId,
    CreatedAt,
    UpdatedAt,
}
