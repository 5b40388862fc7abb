use anyhow::Context;
use log::{info, warn};
use server::{app::build_router, config::ServerConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenvy::dotenv().ok();

    info!("Starting portfolio server...");

    let config = ServerConfig::from_env();
    if config.spotify.is_none() {
        warn!("Spotify credentials not set, /api/spotify will report an error");
    }

    let state = AppState::new(&config).context("Failed to initialize storage")?;
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://localhost:{}", config.port);
    info!("Serving site from {}", config.site_root.display());

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
