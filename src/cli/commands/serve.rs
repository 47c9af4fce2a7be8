use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

use crate::config::{initialize_app_state, ServerArgs};
use crate::router::create_router;
use crate::schemas::AppState;

pub async fn serve(args: &ServerArgs) -> Result<()> {
    trace!("Entering serve function");
    info!("Roster application starting up");

    // Initialize application state
    trace!("Initializing application state");
    let state = match initialize_app_state(args).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    run_server(state, &args.bind_address).await
}

/// Binds the listener and serves the router until shutdown
pub(crate) async fn run_server(state: AppState, bind_address: &str) -> Result<()> {
    debug!("Bind address: {}", bind_address);
    info!(
        env = ?state.settings.app_env,
        storage = state.storage.name(),
        "Serving with {} token lifetime",
        state.settings.token_ttl
    );

    // Create router
    trace!("Creating application router");
    let app = create_router(state);
    debug!("Router created successfully");

    // Start server
    info!("Starting server on {}", bind_address);
    trace!("Attempting to bind TCP listener to {}", bind_address);
    let listener = match TcpListener::bind(bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("Roster API server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);
    debug!("Server is ready to accept connections");

    trace!("Starting axum server");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
