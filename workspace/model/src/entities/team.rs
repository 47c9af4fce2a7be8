use sea_orm::entity::prelude::*;

/// An esports team. Addressed by a UUID generated at creation time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "teams")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub team_id: Uuid,
    pub name: String,
    /// URL-safe identifier, derived from `name` when the caller omits it.
    #[sea_orm(unique)]
    pub slug: Option<String>,
    pub emoji: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub banner_url: Option<String>,
    /// Storage id of a banner uploaded through the API. `None` when the URL
    /// was supplied by the client, in which case the file is never deleted.
    #[sea_orm(column_type = "Text", nullable)]
    pub banner_public_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Label -> value map, e.g. `{"2023": "Liga Master campeón"}`.
    pub achievements: Option<Json>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::player::Entity")]
    Player,
}

impl Related<super::player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Player.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(super::touch!(self, insert))
    }
}
