use std::sync::Arc;

use coderoom_backend_lib::{
    config::Settings, execute::JsGateway, ws_router, AppState,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config file and env vars are both optional; fall back to defaults
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("failed to load settings ({e}), using defaults");
        Settings::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let bind_addr = settings.bind_addr;
    let state = Arc::new(AppState::new(settings, Arc::new(JsGateway::new())));
    let app = ws_router::create_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
