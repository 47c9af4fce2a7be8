use crate::auth::require_auth;
use crate::handlers::{
    auth::{login, logout, me, register},
    health::{health_check, service_info},
    news::{create_news, delete_news, get_news, get_news_item, my_news, news_by_user, update_news},
    players::{assign_team, create_player, delete_player, get_player, get_players, update_player},
    teams::{create_team, delete_team, get_team, get_teams, update_team},
    users::{change_role, create_user, delete_user, get_user, get_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use crate::{obfuscate_errors, panic_handler};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Upper bound for any request body, multipart uploads included
pub const MAX_BODY_SIZE: usize = 12 * 1024 * 1024;

/// Routes reachable without a bearer token
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/login", post(login))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/teams", get(get_teams))
        .route("/api/v1/teams/:team_id", get(get_team))
        .route("/api/v1/players", get(get_players))
        .route("/api/v1/players/:player_id", get(get_player))
}

/// Routes behind `require_auth`; role checks happen in the handlers
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Session
        .route("/api/v1/auth/logout", post(logout).delete(logout))
        .route("/api/v1/logout", post(logout).delete(logout))
        .route("/api/v1/auth/me", get(me))
        // Team writes
        .route("/api/v1/teams", post(create_team))
        .route("/api/v1/teams/:team_id", patch(update_team).delete(delete_team))
        // Player writes
        .route("/api/v1/players", post(create_player))
        .route("/api/v1/players/:player_id", patch(update_player).delete(delete_player))
        .route("/api/v1/players/:player_id/assign-team", patch(assign_team))
        // User administration
        .route("/api/v1/users", get(get_users).post(create_user))
        .route(
            "/api/v1/users/:id",
            get(get_user).put(update_user).patch(update_user).delete(delete_user),
        )
        .route("/api/v1/users/:id/role", patch(change_role))
        // News
        .route("/api/v1/news", get(get_news).post(create_news))
        .route("/api/v1/news/my", get(my_news))
        .route("/api/v1/news/user/:user_id", get(news_by_user))
        .route(
            "/api/v1/news/:id",
            get(get_news_item).put(update_news).patch(update_news).delete(delete_news),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        debug!("No CORS origins configured, allowing any origin");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    debug!("CORS restricted to {} origins", allowed.len());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let production = state.settings.is_production();

    let mut router = public_routes()
        .merge(protected_routes(&state))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    if let Some(uploads_dir) = &state.settings.uploads_dir {
        debug!("Serving uploaded images from {}", uploads_dir.display());
        router = router.nest_service("/uploads", ServeDir::new(uploads_dir));
    }

    if production {
        router = router.layer(middleware::map_response(obfuscate_errors::hide_internal_details));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(move |err| {
                    panic_handler::handle_panic(production, err)
                }))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(cors_layer(&state.settings.cors_origins)),
        )
        .with_state(state)
}
