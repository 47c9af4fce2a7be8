use crate::auth::issue_token;
use crate::config::Settings;
use crate::router::create_router;
use crate::schemas::AppState;
use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestServer};
use migration::{Migrator, MigratorTrait};
use model::entities::{user, Role};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::{Arc, OnceLock};
use storage::LocalStorage;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Password of every account created through [`create_user`]
pub const TEST_PASSWORD: &str = "password123";

/// Create an in-memory SQLite database for testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    // Run migrations
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Argon2 is slow in debug builds, so the fixture hash is computed once.
fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        crate::auth::password::hash_password(TEST_PASSWORD).expect("Failed to hash test password")
    })
}

/// Initialize tracing for tests with output to STDERR.
///
/// The log level comes from RUST_LOG, defaulting to WARN.
fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| match level.to_uppercase().as_str() {
            "ERROR" => Some(Level::ERROR),
            "WARN" => Some(Level::WARN),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "TRACE" => Some(Level::TRACE),
            _ => None,
        })
        .unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// A running test server with its state and upload directory.
///
/// The temp directory lives as long as the context, so uploaded files can be
/// inspected on disk.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub public_root: TempDir,
    _tracing: tracing::subscriber::DefaultGuard,
}

impl TestApp {
    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }
}

/// Create AppState for testing, storing images locally under `public_root`
pub async fn setup_test_app_state(public_root: &TempDir, settings: Settings) -> AppState {
    let db = setup_test_db().await;
    let storage = Arc::new(LocalStorage::new(public_root.path()));

    AppState {
        db,
        storage,
        settings: Arc::new(Settings {
            uploads_dir: Some(public_root.path().join("uploads")),
            ..settings
        }),
    }
}

/// Create a test server with default settings
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Settings::default()).await
}

pub async fn setup_test_app_with(settings: Settings) -> TestApp {
    let tracing_guard = init_test_tracing();

    let public_root = tempfile::tempdir().expect("Failed to create temp dir");
    let state = setup_test_app_state(&public_root, settings).await;
    let server = TestServer::new(create_router(state.clone())).expect("Failed to start test server");

    TestApp {
        server,
        state,
        public_root,
        _tracing: tracing_guard,
    }
}

/// Insert an account directly, with [`TEST_PASSWORD`] as its password
pub async fn create_user(db: &DatabaseConnection, username: &str, role: Role) -> user::Model {
    user::ActiveModel {
        username: Set(Some(username.to_string())),
        email: Set(format!("{}@example.com", username)),
        password: Set(test_password_hash().to_string()),
        full_name: Set(None),
        role: Set(role),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test user")
}

/// Issue a bearer token for `account` without going through `/login`
pub async fn token_for(state: &AppState, account: &user::Model) -> String {
    let (token, _) = issue_token(&state.db, account, state.settings.token_ttl)
        .await
        .expect("Failed to issue token");
    token.secret
}

/// Create an account with `role` and return it with a valid token
pub async fn create_user_with_token(app: &TestApp, username: &str, role: Role) -> (user::Model, String) {
    let account = create_user(app.db(), username, role).await;
    let token = token_for(&app.state, &account).await;
    (account, token)
}

/// Adds `Authorization: Bearer <token>` to a test request
pub trait WithToken {
    fn with_token(self, token: &str) -> Self;
}

impl WithToken for TestRequest {
    fn with_token(self, token: &str) -> Self {
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token header");
        self.add_header(header::AUTHORIZATION, value)
    }
}
