use sea_orm::entity::prelude::*;

/// A player. `team_id = None` marks a free agent.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "players")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub player_id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub role: Option<String>,
    pub country: Option<String>,
    pub instagram: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub stats: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub photo_url: Option<String>,
    /// Storage id of an uploaded photo, see `team::Model::banner_public_id`.
    #[sea_orm(column_type = "Text", nullable)]
    pub photo_public_id: Option<String>,
    pub team_id: Option<Uuid>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::TeamId",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Team,
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
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
