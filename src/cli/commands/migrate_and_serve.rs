use anyhow::Result;
use tracing::{debug, error, info, trace};

use super::initdb::apply_migrations;
use super::serve::run_server;
use crate::config::{initialize_app_state, ServerArgs};

pub async fn migrate_and_serve(args: &ServerArgs) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");

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

    // Apply migrations on the same connection the server will use
    apply_migrations(&state.db).await?;

    run_server(state, &args.bind_address).await
}
