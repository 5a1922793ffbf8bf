//! NoteSketch media server binary.

use notesketch_server::{AppState, ServerConfig, ServerError, router};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notesketch_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = Arc::new(AppState::new(config.upload_dir.clone()));
    let app = router(state);

    info!("NoteSketch media server listening on {}", config.addr);
    info!("Uploads stored in {}", config.upload_dir.display());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
