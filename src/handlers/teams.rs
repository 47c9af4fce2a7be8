use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::extract::{
    double_option, not_blank, PageParams, PathParam, Payload, UploadForm, ValidatedQuery,
};
use crate::handlers::fetch_page;
use crate::handlers::players::PlayerResponse;
use crate::policy::{authorize, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use crate::slug;
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chrono::{DateTime, Utc};
use model::entities::{player, team};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::UploadedImage;
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const BANNER_FOLDER: &str = "teams";

/// Request body for creating a team (JSON, or multipart with a `banner` file)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1 to 255 characters"),
        custom(function = "not_blank", message = "name must not be blank")
    )]
    pub name: String,
    /// Derived from `name` when omitted
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    #[validate(length(max = 32))]
    pub emoji: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "banner_url")]
    #[validate(
        length(max = 2048),
        url(message = "bannerUrl must be a valid URL")
    )]
    pub banner_url: Option<String>,
    /// Label to value map
    #[schema(value_type = Option<Object>)]
    pub achievements: Option<Value>,
}

impl UploadForm for CreateTeamRequest {
    const FILE_FIELD: &'static str = "banner";
    const JSON_FIELDS: &'static [&'static str] = &["achievements"];
}

/// Partial team update. `null` clears a field, an absent field is unchanged.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1 to 255 characters"),
        custom(function = "not_blank", message = "name must not be blank")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(min = 1, max = 255))]
    #[schema(value_type = Option<String>)]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 32))]
    #[schema(value_type = Option<String>)]
    pub emoji: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, alias = "banner_url", deserialize_with = "double_option")]
    #[validate(
        length(max = 2048),
        url(message = "bannerUrl must be a valid URL")
    )]
    #[schema(value_type = Option<String>)]
    pub banner_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub achievements: Option<Option<Value>>,
}

impl UploadForm for UpdateTeamRequest {
    const FILE_FIELD: &'static str = "banner";
    const JSON_FIELDS: &'static [&'static str] = &["achievements"];
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteTeamQuery {
    /// Delete the team's players instead of releasing them (default false)
    #[serde(default, rename = "deletePlayers")]
    pub delete_players: bool,
}

/// Compact team reference embedded in player responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub team_id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub emoji: Option<String>,
}

impl From<team::Model> for TeamSummary {
    fn from(model: team::Model) -> Self {
        Self {
            team_id: model.team_id,
            name: model.name,
            slug: model.slug,
            emoji: model.emoji,
        }
    }
}

/// Team response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    pub team_id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub emoji: Option<String>,
    pub banner_url: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub achievements: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present when a single team is fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<PlayerResponse>>,
}

impl From<team::Model> for TeamResponse {
    fn from(model: team::Model) -> Self {
        Self {
            team_id: model.team_id,
            name: model.name,
            slug: model.slug,
            emoji: model.emoji,
            banner_url: model.banner_url,
            description: model.description,
            achievements: model.achievements,
            created_at: model.created_at,
            updated_at: model.updated_at,
            players: None,
        }
    }
}

/// Achievements and stats must be a JSON object of label to value.
pub(crate) fn check_mapping(field: &str, value: Option<&Value>) -> Result<()> {
    match value {
        None | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(AppError::validation(field, format!("{} must be an object", field))),
    }
}

pub(crate) async fn find_team<C: ConnectionTrait>(db: &C, team_id: Uuid) -> Result<team::Model> {
    team::Entity::find_by_id(team_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Team with ID {} not found", team_id);
            AppError::NotFound(format!("Team with ID '{}' not found", team_id))
        })
}

async fn slug_taken<C: ConnectionTrait>(db: &C, slug: &str, except: Option<Uuid>) -> Result<bool> {
    let mut query = team::Entity::find().filter(team::Column::Slug.eq(slug));
    if let Some(team_id) = except {
        query = query.filter(team::Column::TeamId.ne(team_id));
    }
    Ok(query.one(db).await?.is_some())
}

/// An explicit slug must be free. A derived one is suffixed until it is.
async fn resolve_slug<C: ConnectionTrait>(
    db: &C,
    explicit: Option<&str>,
    name: &str,
    except: Option<Uuid>,
) -> Result<Option<String>> {
    if let Some(slug) = explicit.map(str::trim).filter(|slug| !slug.is_empty()) {
        if slug_taken(db, slug, except).await? {
            return Err(AppError::Conflict(format!("Slug '{}' is already in use", slug)));
        }
        return Ok(Some(slug.to_string()));
    }

    let base = slug::slugify(name);
    if base.is_empty() {
        debug!("Name '{}' yields no slug", name);
        return Ok(None);
    }
    for candidate in slug::candidates(&base) {
        if !slug_taken(db, &candidate, except).await? {
            trace!("Derived slug '{}'", candidate);
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Get all teams, ordered by name
#[utoipa::path(
    get,
    path = "/api/v1/teams",
    tag = "teams",
    params(PageParams),
    responses(
        (status = 200, description = "Teams retrieved successfully", body = ApiResponse<Vec<TeamResponse>>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_teams(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> Result<Json<ApiResponse<Vec<TeamResponse>>>> {
    trace!("Entering get_teams function");

    let select = team::Entity::find()
        .order_by_asc(team::Column::Name)
        .order_by_asc(team::Column::TeamId);
    let (teams, pagination) = fetch_page(&state.db, select, &params).await?;

    info!("Successfully retrieved {} teams", teams.len());
    Ok(Json(ApiResponse::paginated(
        teams.into_iter().map(TeamResponse::from).collect(),
        pagination,
        "Teams retrieved successfully",
    )))
}

/// Create a new team
#[utoipa::path(
    post,
    path = "/api/v1/teams",
    tag = "teams",
    request_body = CreateTeamRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Team created successfully", body = ApiResponse<TeamResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse),
        (status = 413, description = "Banner too large", body = ErrorResponse),
        (status = 415, description = "Unsupported banner type", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Payload<CreateTeamRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TeamResponse>>)> {
    trace!("Entering create_team function");
    authorize(auth.role, Resource::Team, Action::Create)?;

    let Payload { data: request, file } = payload;
    check_mapping("achievements", request.achievements.as_ref())?;
    debug!("Creating team with name: {}", request.name);

    let uploaded = match &file {
        Some(file) => Some(state.store_image(file, BANNER_FOLDER).await?),
        None => None,
    };

    let result = insert_team(&state, request, uploaded.as_ref()).await;
    let team_model = match result {
        Ok(team_model) => team_model,
        Err(e) => {
            error!("Failed to create team: {}", e);
            state.discard_upload(uploaded.as_ref()).await;
            return Err(e);
        }
    };

    info!("Team created successfully with ID: {}, name: {}", team_model.team_id, team_model.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(TeamResponse::from(team_model), "Team created successfully")),
    ))
}

async fn insert_team(
    state: &AppState,
    request: CreateTeamRequest,
    uploaded: Option<&UploadedImage>,
) -> Result<team::Model> {
    let slug = resolve_slug(&state.db, request.slug.as_deref(), &request.name, None).await?;

    let new_team = team::ActiveModel {
        team_id: Set(Uuid::new_v4()),
        name: Set(request.name.trim().to_string()),
        slug: Set(slug),
        emoji: Set(request.emoji),
        banner_url: Set(uploaded.map(|image| image.url.clone()).or(request.banner_url)),
        banner_public_id: Set(uploaded.and_then(|image| image.public_id.clone())),
        description: Set(request.description),
        achievements: Set(request.achievements),
        ..Default::default()
    };

    trace!("Attempting to insert new team into database");
    Ok(new_team.insert(&state.db).await?)
}

/// Get a team with its players
#[utoipa::path(
    get,
    path = "/api/v1/teams/{team_id}",
    tag = "teams",
    params(
        ("team_id" = Uuid, Path, description = "Team ID"),
    ),
    responses(
        (status = 200, description = "Team retrieved successfully", body = ApiResponse<TeamResponse>),
        (status = 400, description = "Malformed team ID", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_team(
    PathParam(team_id): PathParam<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    trace!("Entering get_team function for team_id: {}", team_id);

    let team_model = find_team(&state.db, team_id).await?;
    let players = team_model
        .find_related(player::Entity)
        .order_by_asc(player::Column::Name)
        .all(&state.db)
        .await?;
    debug!("Team {} has {} players", team_id, players.len());

    let summary = TeamSummary::from(team_model.clone());
    let mut response = TeamResponse::from(team_model);
    response.players = Some(
        players
            .into_iter()
            .map(|p| PlayerResponse::with_team(p, Some(summary.clone())))
            .collect(),
    );

    Ok(Json(ApiResponse::ok(response, "Team retrieved successfully")))
}

/// Update a team
#[utoipa::path(
    patch,
    path = "/api/v1/teams/{team_id}",
    tag = "teams",
    params(
        ("team_id" = Uuid, Path, description = "Team ID"),
    ),
    request_body = UpdateTeamRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Team updated successfully", body = ApiResponse<TeamResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_team(
    PathParam(team_id): PathParam<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Payload<UpdateTeamRequest>,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    trace!("Entering update_team function for team_id: {}", team_id);
    authorize(auth.role, Resource::Team, Action::Update)?;

    let Payload { data: request, file } = payload;
    if let Some(achievements) = &request.achievements {
        check_mapping("achievements", achievements.as_ref())?;
    }

    let existing = find_team(&state.db, team_id).await?;
    let previous_url = existing.banner_url.clone();
    let previous_public_id = existing.banner_public_id.clone();

    let slug = match &request.slug {
        Some(Some(slug)) if existing.slug.as_deref() != Some(slug.trim()) => {
            Some(resolve_slug(&state.db, Some(slug), &existing.name, Some(team_id)).await?)
        }
        Some(Some(_)) => None,
        Some(None) => Some(None),
        None => None,
    };

    let uploaded = match &file {
        Some(file) => Some(state.store_image(file, BANNER_FOLDER).await?),
        None => None,
    };

    let mut team_active: team::ActiveModel = existing.into();
    if let Some(name) = request.name {
        trace!("Updating name to: {}", name);
        team_active.name = Set(name.trim().to_string());
    }
    if let Some(slug) = slug {
        trace!("Updating slug to: {:?}", slug);
        team_active.slug = Set(slug);
    }
    if let Some(emoji) = request.emoji {
        team_active.emoji = Set(emoji);
    }
    if let Some(description) = request.description {
        team_active.description = Set(description);
    }
    if let Some(achievements) = request.achievements {
        team_active.achievements = Set(achievements);
    }
    // A client-supplied URL carries no storage id, so it is never deleted later
    match (&uploaded, request.banner_url) {
        (Some(image), _) => {
            team_active.banner_url = Set(Some(image.url.clone()));
            team_active.banner_public_id = Set(image.public_id.clone());
        }
        (None, Some(banner_url)) if banner_url != previous_url => {
            team_active.banner_url = Set(banner_url);
            team_active.banner_public_id = Set(None);
        }
        _ => {}
    }

    let updated = match team_active.update(&state.db).await {
        Ok(updated) => updated,
        Err(e) => {
            error!("Failed to update team {}: {}", team_id, e);
            state.discard_upload(uploaded.as_ref()).await;
            return Err(e.into());
        }
    };

    if updated.banner_url != previous_url {
        debug!("Banner replaced or cleared, removing the previous one");
        state
            .discard_image(previous_url.as_deref(), previous_public_id.as_deref())
            .await;
    }

    info!("Team with ID {} updated successfully", team_id);
    Ok(Json(ApiResponse::ok(TeamResponse::from(updated), "Team updated successfully")))
}

/// Delete a team, deleting or releasing its players
#[utoipa::path(
    delete,
    path = "/api/v1/teams/{team_id}",
    tag = "teams",
    params(
        ("team_id" = Uuid, Path, description = "Team ID"),
        DeleteTeamQuery,
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Team deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_team(
    PathParam(team_id): PathParam<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedQuery(query): ValidatedQuery<DeleteTeamQuery>,
) -> Result<Json<ApiResponse<()>>> {
    trace!("Entering delete_team function for team_id: {}", team_id);
    authorize(auth.role, Resource::Team, Action::Delete)?;

    let txn = state.db.begin().await?;

    let team_model = find_team(&txn, team_id).await?;
    let players = player::Entity::find()
        .filter(player::Column::TeamId.eq(team_id))
        .all(&txn)
        .await?;

    if query.delete_players {
        let result = player::Entity::delete_many()
            .filter(player::Column::TeamId.eq(team_id))
            .exec(&txn)
            .await?;
        debug!("Deleted {} players of team {}", result.rows_affected, team_id);
    } else {
        let result = player::Entity::update_many()
            .col_expr(player::Column::TeamId, Expr::value(Option::<Uuid>::None))
            .col_expr(player::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(player::Column::TeamId.eq(team_id))
            .exec(&txn)
            .await?;
        debug!("Released {} players of team {}", result.rows_affected, team_id);
    }

    team::Entity::delete_by_id(team_id).exec(&txn).await?;
    txn.commit().await?;

    if query.delete_players {
        for player_model in &players {
            state
                .discard_image(
                    player_model.photo_url.as_deref(),
                    player_model.photo_public_id.as_deref(),
                )
                .await;
        }
    }
    state
        .discard_image(team_model.banner_url.as_deref(), team_model.banner_public_id.as_deref())
        .await;

    let message = if query.delete_players {
        format!(
            "Team '{}' and its {} players were deleted successfully",
            team_model.name,
            players.len()
        )
    } else {
        format!(
            "Team '{}' was deleted and its {} players were released",
            team_model.name,
            players.len()
        )
    };
    info!("{}", message);

    Ok(Json(ApiResponse::message(message)))
}
