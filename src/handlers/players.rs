use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::extract::{
    double_option, not_blank, PageParams, PathParam, Payload, UploadForm, ValidatedJson,
    ValidatedQuery,
};
use crate::handlers::fetch_page;
use crate::handlers::teams::{check_mapping, TeamSummary};
use crate::policy::{authorize, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chrono::{DateTime, Utc};
use model::entities::{player, team};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, LoaderTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::UploadedImage;
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const PHOTO_FOLDER: &str = "players";
const DEFAULT_COUNTRY: &str = "🇦🇷 Argentina";

/// Request body for creating a player (JSON, or multipart with a `photo` file)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayerRequest {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1 to 255 characters"),
        custom(function = "not_blank", message = "name must not be blank")
    )]
    pub name: String,
    #[validate(range(min = 0, max = 150, message = "age must be between 0 and 150"))]
    pub age: Option<i32>,
    #[validate(length(max = 100))]
    pub role: Option<String>,
    /// Defaults to "🇦🇷 Argentina"
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 100))]
    pub instagram: Option<String>,
    pub bio: Option<String>,
    /// Label to value map
    #[schema(value_type = Option<Object>)]
    pub stats: Option<Value>,
    /// Ignored when a `photo` file is uploaded
    #[serde(alias = "photo_url")]
    #[validate(url(message = "photoUrl must be a valid URL"))]
    pub photo_url: Option<String>,
    /// Omit or send null for a free agent
    #[serde(alias = "team_id")]
    pub team_id: Option<Uuid>,
}

impl UploadForm for CreatePlayerRequest {
    const FILE_FIELD: &'static str = "photo";
    const JSON_FIELDS: &'static [&'static str] = &["age", "stats"];
}

/// Partial player update. `null` clears a field, an absent field is unchanged.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerRequest {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1 to 255 characters"),
        custom(function = "not_blank", message = "name must not be blank")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 0, max = 150, message = "age must be between 0 and 150"))]
    #[schema(value_type = Option<i32>)]
    pub age: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    #[schema(value_type = Option<String>)]
    pub role: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    #[schema(value_type = Option<String>)]
    pub country: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    #[schema(value_type = Option<String>)]
    pub instagram: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub stats: Option<Option<Value>>,
    #[serde(default, alias = "photo_url", deserialize_with = "double_option")]
    #[validate(url(message = "photoUrl must be a valid URL"))]
    #[schema(value_type = Option<String>)]
    pub photo_url: Option<Option<String>>,
    #[serde(default, alias = "team_id", deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub team_id: Option<Option<Uuid>>,
}

impl UploadForm for UpdatePlayerRequest {
    const FILE_FIELD: &'static str = "photo";
    const JSON_FIELDS: &'static [&'static str] = &["age", "stats"];
}

/// Request body for assigning a player to a team
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTeamRequest {
    /// Team to join, or null to release the player
    #[serde(default, alias = "team_id", deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub team_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PlayerFilters {
    /// Only players of this team
    pub team_id: Option<Uuid>,
    /// Only players without a team. Takes precedence over `teamId`.
    pub is_free_agent: Option<bool>,
}

/// Player response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub player_id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub role: Option<String>,
    pub country: Option<String>,
    pub instagram: Option<String>,
    pub bio: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub stats: Option<Value>,
    pub photo_url: Option<String>,
    pub team_id: Option<Uuid>,
    /// The player's team, resolved
    pub team: Option<TeamSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerResponse {
    pub fn with_team(model: player::Model, team: Option<TeamSummary>) -> Self {
        Self {
            player_id: model.player_id,
            name: model.name,
            age: model.age,
            role: model.role,
            country: model.country,
            instagram: model.instagram,
            bio: model.bio,
            stats: model.stats,
            photo_url: model.photo_url,
            team_id: model.team_id,
            team,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fails with `TEAM_NOT_FOUND` unless `team_id` resolves.
async fn ensure_team_exists<C: ConnectionTrait>(db: &C, team_id: Uuid) -> Result<team::Model> {
    team::Entity::find_by_id(team_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Team with ID {} does not exist", team_id);
            AppError::TeamNotFound(format!("Team with ID '{}' does not exist", team_id))
        })
}

async fn find_player<C: ConnectionTrait>(db: &C, player_id: Uuid) -> Result<player::Model> {
    player::Entity::find_by_id(player_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Player with ID {} not found", player_id);
            AppError::NotFound(format!("Player with ID '{}' not found", player_id))
        })
}

async fn load_response<C: ConnectionTrait>(db: &C, model: player::Model) -> Result<PlayerResponse> {
    let team = match model.team_id {
        Some(team_id) => team::Entity::find_by_id(team_id).one(db).await?,
        None => None,
    };
    Ok(PlayerResponse::with_team(model, team.map(TeamSummary::from)))
}

async fn upload_photo(
    state: &AppState,
    file: Option<&storage::ImageFile>,
) -> Result<Option<UploadedImage>> {
    match file {
        Some(file) => Ok(Some(state.store_image(file, PHOTO_FOLDER).await?)),
        None => Ok(None),
    }
}

/// Commits `txn` and loads the response, or rolls back and drops the upload.
async fn finish(
    state: &AppState,
    txn: DatabaseTransaction,
    outcome: Result<player::Model>,
    uploaded: Option<&UploadedImage>,
) -> Result<PlayerResponse> {
    let committed = match outcome {
        Ok(model) => match load_response(&txn, model).await {
            Ok(response) => txn.commit().await.map(|_| response).map_err(AppError::from),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = &committed {
        error!("Player write failed: {}", e);
        state.discard_upload(uploaded).await;
    }
    committed
}

/// Get all players, optionally filtered
#[utoipa::path(
    get,
    path = "/api/v1/players",
    tag = "players",
    params(PlayerFilters, PageParams),
    responses(
        (status = 200, description = "Players retrieved successfully", body = ApiResponse<Vec<PlayerResponse>>),
        (status = 400, description = "Invalid filters", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_players(
    State(state): State<AppState>,
    ValidatedQuery(filters): ValidatedQuery<PlayerFilters>,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> Result<Json<ApiResponse<Vec<PlayerResponse>>>> {
    trace!("Entering get_players function");

    let mut select = player::Entity::find()
        .order_by_asc(player::Column::Name)
        .order_by_asc(player::Column::PlayerId);

    if filters.is_free_agent == Some(true) {
        debug!("Filtering free agents");
        select = select.filter(player::Column::TeamId.is_null());
    } else if let Some(team_id) = filters.team_id {
        debug!("Filtering players of team {}", team_id);
        select = select.filter(player::Column::TeamId.eq(team_id));
    }

    let (players, pagination) = fetch_page(&state.db, select, &params).await?;
    let teams = players.load_one(team::Entity, &state.db).await?;

    let responses: Vec<PlayerResponse> = players
        .into_iter()
        .zip(teams)
        .map(|(p, t)| PlayerResponse::with_team(p, t.map(TeamSummary::from)))
        .collect();

    info!("Successfully retrieved {} players", responses.len());
    Ok(Json(ApiResponse::paginated(
        responses,
        pagination,
        "Players retrieved successfully",
    )))
}

/// Create a new player
#[utoipa::path(
    post,
    path = "/api/v1/players",
    tag = "players",
    request_body = CreatePlayerRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Player created successfully", body = ApiResponse<PlayerResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse),
        (status = 413, description = "Photo too large", body = ErrorResponse),
        (status = 415, description = "Unsupported photo type", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_player(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Payload<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PlayerResponse>>)> {
    trace!("Entering create_player function");
    authorize(auth.role, Resource::Player, Action::Create)?;

    let Payload { data: request, file } = payload;
    check_mapping("stats", request.stats.as_ref())?;
    debug!("Creating player with name: {}", request.name);

    let uploaded = upload_photo(&state, file.as_ref()).await?;

    let txn = state.db.begin().await?;
    let outcome = insert_player(&txn, request, uploaded.as_ref()).await;
    let response = finish(&state, txn, outcome, uploaded.as_ref()).await?;

    info!("Player created successfully with ID: {}", response.player_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "Player created successfully")),
    ))
}

async fn insert_player(
    txn: &DatabaseTransaction,
    request: CreatePlayerRequest,
    uploaded: Option<&UploadedImage>,
) -> Result<player::Model> {
    if let Some(team_id) = request.team_id {
        trace!("Validating team {}", team_id);
        ensure_team_exists(txn, team_id).await?;
    }

    let new_player = player::ActiveModel {
        player_id: Set(Uuid::new_v4()),
        name: Set(request.name.trim().to_string()),
        age: Set(request.age),
        role: Set(request.role),
        country: Set(Some(request.country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()))),
        instagram: Set(request.instagram),
        bio: Set(request.bio),
        stats: Set(request.stats),
        photo_url: Set(uploaded.map(|image| image.url.clone()).or(request.photo_url)),
        photo_public_id: Set(uploaded.and_then(|image| image.public_id.clone())),
        team_id: Set(request.team_id),
        ..Default::default()
    };

    trace!("Attempting to insert new player into database");
    Ok(new_player.insert(txn).await?)
}

/// Get a player by ID
#[utoipa::path(
    get,
    path = "/api/v1/players/{player_id}",
    tag = "players",
    params(
        ("player_id" = Uuid, Path, description = "Player ID"),
    ),
    responses(
        (status = 200, description = "Player retrieved successfully", body = ApiResponse<PlayerResponse>),
        (status = 400, description = "Malformed player ID", body = ErrorResponse),
        (status = 404, description = "Player not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_player(
    PathParam(player_id): PathParam<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PlayerResponse>>> {
    trace!("Entering get_player function for player_id: {}", player_id);

    let model = find_player(&state.db, player_id).await?;
    let response = load_response(&state.db, model).await?;

    Ok(Json(ApiResponse::ok(response, "Player retrieved successfully")))
}

/// Update a player
#[utoipa::path(
    patch,
    path = "/api/v1/players/{player_id}",
    tag = "players",
    params(
        ("player_id" = Uuid, Path, description = "Player ID"),
    ),
    request_body = UpdatePlayerRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Player updated successfully", body = ApiResponse<PlayerResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Player or team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_player(
    PathParam(player_id): PathParam<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Payload<UpdatePlayerRequest>,
) -> Result<Json<ApiResponse<PlayerResponse>>> {
    trace!("Entering update_player function for player_id: {}", player_id);
    authorize(auth.role, Resource::Player, Action::Update)?;

    let Payload { data: request, file } = payload;
    if let Some(stats) = &request.stats {
        check_mapping("stats", stats.as_ref())?;
    }

    let existing = find_player(&state.db, player_id).await?;
    let previous_url = existing.photo_url.clone();
    let previous_public_id = existing.photo_public_id.clone();

    let uploaded = upload_photo(&state, file.as_ref()).await?;

    let txn = state.db.begin().await?;
    let outcome = apply_update(&txn, existing, request, uploaded.as_ref()).await;
    let response = finish(&state, txn, outcome, uploaded.as_ref()).await?;

    if response.photo_url != previous_url {
        debug!("Photo replaced or cleared, removing the previous one");
        state
            .discard_image(previous_url.as_deref(), previous_public_id.as_deref())
            .await;
    }

    info!("Player with ID {} updated successfully", player_id);
    Ok(Json(ApiResponse::ok(response, "Player updated successfully")))
}

async fn apply_update(
    txn: &DatabaseTransaction,
    existing: player::Model,
    request: UpdatePlayerRequest,
    uploaded: Option<&UploadedImage>,
) -> Result<player::Model> {
    if let Some(Some(team_id)) = request.team_id {
        trace!("Validating team {}", team_id);
        ensure_team_exists(txn, team_id).await?;
    }

    let previous_url = existing.photo_url.clone();
    let mut player_active: player::ActiveModel = existing.into();

    if let Some(name) = request.name {
        trace!("Updating name to: {}", name);
        player_active.name = Set(name.trim().to_string());
    }
    if let Some(age) = request.age {
        player_active.age = Set(age);
    }
    if let Some(role) = request.role {
        player_active.role = Set(role);
    }
    if let Some(country) = request.country {
        player_active.country = Set(country);
    }
    if let Some(instagram) = request.instagram {
        player_active.instagram = Set(instagram);
    }
    if let Some(bio) = request.bio {
        player_active.bio = Set(bio);
    }
    if let Some(stats) = request.stats {
        player_active.stats = Set(stats);
    }
    if let Some(team_id) = request.team_id {
        trace!("Updating team to: {:?}", team_id);
        player_active.team_id = Set(team_id);
    }
    // A client-supplied URL carries no storage id, so it is never deleted later
    match (uploaded, request.photo_url) {
        (Some(image), _) => {
            player_active.photo_url = Set(Some(image.url.clone()));
            player_active.photo_public_id = Set(image.public_id.clone());
        }
        (None, Some(photo_url)) if photo_url != previous_url => {
            player_active.photo_url = Set(photo_url);
            player_active.photo_public_id = Set(None);
        }
        _ => {}
    }

    Ok(player_active.update(txn).await?)
}

/// Delete a player
#[utoipa::path(
    delete,
    path = "/api/v1/players/{player_id}",
    tag = "players",
    params(
        ("player_id" = Uuid, Path, description = "Player ID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Player deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Player not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_player(
    PathParam(player_id): PathParam<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<()>>> {
    trace!("Entering delete_player function for player_id: {}", player_id);
    authorize(auth.role, Resource::Player, Action::Delete)?;

    let existing = find_player(&state.db, player_id).await?;
    player::Entity::delete_by_id(player_id).exec(&state.db).await?;
    state
        .discard_image(existing.photo_url.as_deref(), existing.photo_public_id.as_deref())
        .await;

    info!("Player with ID {} deleted successfully", player_id);
    Ok(Json(ApiResponse::message(format!(
        "Player '{}' deleted successfully",
        existing.name
    ))))
}

/// Assign a player to a team, or release them with `teamId: null`
#[utoipa::path(
    patch,
    path = "/api/v1/players/{player_id}/assign-team",
    tag = "players",
    params(
        ("player_id" = Uuid, Path, description = "Player ID"),
    ),
    request_body = AssignTeamRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Player assigned or released", body = ApiResponse<PlayerResponse>),
        (status = 400, description = "Missing teamId", body = ErrorResponse),
        (status = 404, description = "Player or team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn assign_team(
    PathParam(player_id): PathParam<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<AssignTeamRequest>,
) -> Result<Json<ApiResponse<PlayerResponse>>> {
    trace!("Entering assign_team function for player_id: {}", player_id);
    authorize(auth.role, Resource::Player, Action::Update)?;

    let team_id = request
        .team_id
        .ok_or_else(|| AppError::validation("teamId", "teamId is required (null releases the player)"))?;

    let txn = state.db.begin().await?;
    let existing = find_player(&txn, player_id).await?;
    if let Some(team_id) = team_id {
        ensure_team_exists(&txn, team_id).await?;
    }

    let mut player_active: player::ActiveModel = existing.into();
    player_active.team_id = Set(team_id);
    let updated = player_active.update(&txn).await?;
    let response = load_response(&txn, updated).await?;
    txn.commit().await?;

    let message = match &response.team {
        Some(team) => format!("Player '{}' assigned to team '{}'", response.name, team.name),
        None => format!("Player '{}' released from their team", response.name),
    };
    info!("{}", message);

    Ok(Json(ApiResponse::ok(response, message)))
}
