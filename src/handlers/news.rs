use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::extract::{
    double_option, not_blank, PageParams, PathParam, ValidatedJson, ValidatedQuery,
};
use crate::handlers::fetch_page;
use crate::handlers::users::UserResponse;
use crate::policy::{authorize, authorize_owned, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use model::entities::{news, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, LoaderTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a news item
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNewsRequest {
    #[validate(
        length(min = 1, max = 255, message = "titulo must be 1 to 255 characters"),
        custom(function = "not_blank", message = "titulo must not be blank")
    )]
    pub titulo: String,
    /// Defaults to today (UTC)
    pub fecha: Option<NaiveDate>,
    pub comentario: Option<String>,
}

/// Partial news update
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateNewsRequest {
    #[validate(
        length(min = 1, max = 255, message = "titulo must be 1 to 255 characters"),
        custom(function = "not_blank", message = "titulo must not be blank")
    )]
    pub titulo: Option<String>,
    pub fecha: Option<NaiveDate>,
    /// `null` clears the comment
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub comentario: Option<Option<String>>,
}

/// Author summary attached to each news item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewsAuthor {
    pub id: i32,
    pub username: Option<String>,
    pub email: String,
}

impl From<user::Model> for NewsAuthor {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
        }
    }
}

/// News response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub id: i32,
    pub titulo: String,
    pub fecha: NaiveDate,
    pub comentario: Option<String>,
    pub user_id: i32,
    pub user: Option<NewsAuthor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewsResponse {
    fn with_author(model: news::Model, author: Option<NewsAuthor>) -> Self {
        Self {
            id: model.id,
            titulo: model.titulo,
            fecha: model.fecha,
            comentario: model.comentario,
            user_id: model.user_id,
            user: author,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A user's profile together with the news they wrote
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewsByUserResponse {
    pub user: UserResponse,
    pub news: Vec<NewsResponse>,
}

fn newest_first(select: Select<news::Entity>) -> Select<news::Entity> {
    select
        .order_by_desc(news::Column::Fecha)
        .order_by_desc(news::Column::Id)
}

async fn find_news<C: ConnectionTrait>(db: &C, news_id: i32) -> Result<news::Model> {
    news::Entity::find_by_id(news_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("News with ID {} not found", news_id);
            AppError::NotFound(format!("News with ID {} not found", news_id))
        })
}

async fn with_authors<C: ConnectionTrait>(db: &C, items: Vec<news::Model>) -> Result<Vec<NewsResponse>> {
    let authors = items.load_one(user::Entity, db).await?;
    Ok(items
        .into_iter()
        .zip(authors)
        .map(|(item, author)| NewsResponse::with_author(item, author.map(NewsAuthor::from)))
        .collect())
}

async fn single_response<C: ConnectionTrait>(db: &C, item: news::Model) -> Result<NewsResponse> {
    let author = user::Entity::find_by_id(item.user_id).one(db).await?;
    Ok(NewsResponse::with_author(item, author.map(NewsAuthor::from)))
}

/// Get all news, newest first
#[utoipa::path(
    get,
    path = "/api/v1/news",
    tag = "news",
    params(PageParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "News retrieved successfully", body = ApiResponse<Vec<NewsResponse>>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_news(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> Result<Json<ApiResponse<Vec<NewsResponse>>>> {
    trace!("Entering get_news function");
    authorize(auth.role, Resource::News, Action::List)?;

    let (items, pagination) = fetch_page(&state.db, newest_first(news::Entity::find()), &params).await?;
    let responses = with_authors(&state.db, items).await?;

    info!("Successfully retrieved {} news items", responses.len());
    Ok(Json(ApiResponse::paginated(
        responses,
        pagination,
        "News retrieved successfully",
    )))
}

/// Create a news item authored by the caller
#[utoipa::path(
    post,
    path = "/api/v1/news",
    tag = "news",
    request_body = CreateNewsRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "News created successfully", body = ApiResponse<NewsResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Only admins and editors may publish", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_news(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<CreateNewsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NewsResponse>>)> {
    trace!("Entering create_news function");
    authorize(auth.role, Resource::News, Action::Create)?;

    let fecha = request.fecha.unwrap_or_else(|| Utc::now().date_naive());
    debug!("Creating news '{}' dated {}", request.titulo, fecha);

    let item = news::ActiveModel {
        titulo: Set(request.titulo.trim().to_string()),
        fecha: Set(fecha),
        comentario: Set(request.comentario),
        user_id: Set(auth.id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("News created successfully with ID: {} by user {}", item.id, auth.id);
    let response = single_response(&state.db, item).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "News created successfully")),
    ))
}

/// Get a news item
#[utoipa::path(
    get,
    path = "/api/v1/news/{id}",
    tag = "news",
    params(
        ("id" = i32, Path, description = "News ID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "News retrieved successfully", body = ApiResponse<NewsResponse>),
        (status = 404, description = "News not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_news_item(
    PathParam(news_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<NewsResponse>>> {
    trace!("Entering get_news_item function for news_id: {}", news_id);
    authorize(auth.role, Resource::News, Action::Read)?;

    let item = find_news(&state.db, news_id).await?;
    let response = single_response(&state.db, item).await?;

    Ok(Json(ApiResponse::ok(response, "News retrieved successfully")))
}

/// Update a news item. Editors may only update their own.
#[utoipa::path(
    patch,
    path = "/api/v1/news/{id}",
    tag = "news",
    params(
        ("id" = i32, Path, description = "News ID"),
    ),
    request_body = UpdateNewsRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "News updated successfully", body = ApiResponse<NewsResponse>),
        (status = 403, description = "Not allowed to edit this item", body = ErrorResponse),
        (status = 404, description = "News not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_news(
    PathParam(news_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<UpdateNewsRequest>,
) -> Result<Json<ApiResponse<NewsResponse>>> {
    trace!("Entering update_news function for news_id: {}", news_id);

    let existing = find_news(&state.db, news_id).await?;
    authorize_owned(auth.role, auth.id, Resource::News, Action::Update, existing.user_id)?;

    let mut news_active: news::ActiveModel = existing.into();
    if let Some(titulo) = request.titulo {
        trace!("Updating titulo to: {}", titulo);
        news_active.titulo = Set(titulo.trim().to_string());
    }
    if let Some(fecha) = request.fecha {
        trace!("Updating fecha to: {}", fecha);
        news_active.fecha = Set(fecha);
    }
    if let Some(comentario) = request.comentario {
        news_active.comentario = Set(comentario);
    }

    let updated = news_active.update(&state.db).await?;
    info!("News with ID {} updated by user {}", updated.id, auth.id);

    let response = single_response(&state.db, updated).await?;
    Ok(Json(ApiResponse::ok(response, "News updated successfully")))
}

/// Delete a news item. Editors may only delete their own.
#[utoipa::path(
    delete,
    path = "/api/v1/news/{id}",
    tag = "news",
    params(
        ("id" = i32, Path, description = "News ID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "News deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed to delete this item", body = ErrorResponse),
        (status = 404, description = "News not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_news(
    PathParam(news_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<()>>> {
    trace!("Entering delete_news function for news_id: {}", news_id);

    let existing = find_news(&state.db, news_id).await?;
    authorize_owned(auth.role, auth.id, Resource::News, Action::Delete, existing.user_id)?;

    news::Entity::delete_by_id(existing.id).exec(&state.db).await?;
    info!("News with ID {} deleted by user {}", existing.id, auth.id);

    Ok(Json(ApiResponse::message("News deleted successfully")))
}

/// News written by the caller
#[utoipa::path(
    get,
    path = "/api/v1/news/my",
    tag = "news",
    params(PageParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Own news retrieved successfully", body = ApiResponse<Vec<NewsResponse>>),
        (status = 403, description = "Only admins and editors have own news", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn my_news(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> Result<Json<ApiResponse<Vec<NewsResponse>>>> {
    trace!("Entering my_news function");
    authorize(auth.role, Resource::News, Action::ListOwn)?;

    let select = newest_first(news::Entity::find().filter(news::Column::UserId.eq(auth.id)));
    let (items, pagination) = fetch_page(&state.db, select, &params).await?;
    let responses = with_authors(&state.db, items).await?;

    debug!("User {} has {} news items", auth.id, responses.len());
    Ok(Json(ApiResponse::paginated(
        responses,
        pagination,
        "Your news retrieved successfully",
    )))
}

/// News written by a given user (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/news/user/{user_id}",
    tag = "news",
    params(
        ("user_id" = i32, Path, description = "Author's user ID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "News retrieved successfully", body = ApiResponse<NewsByUserResponse>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn news_by_user(
    PathParam(user_id): PathParam<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<NewsByUserResponse>>> {
    trace!("Entering news_by_user function for user_id: {}", user_id);
    authorize(auth.role, Resource::News, Action::ListByUser)?;

    let author = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID {} not found", user_id)))?;

    let items = newest_first(news::Entity::find().filter(news::Column::UserId.eq(user_id)))
        .all(&state.db)
        .await?;
    let summary = NewsAuthor::from(author.clone());
    let news: Vec<NewsResponse> = items
        .into_iter()
        .map(|item| NewsResponse::with_author(item, Some(summary.clone())))
        .collect();

    info!("Retrieved {} news items of user {}", news.len(), user_id);
    Ok(Json(ApiResponse::ok(
        NewsByUserResponse {
            user: UserResponse::from(author),
            news,
        },
        "News retrieved successfully",
    )))
}
