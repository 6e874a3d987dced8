mod app;
mod auth;
mod config;
mod error;
mod frontend;
mod state;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "gatekeep=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let addr = config.addr;
    tracing::info!(
        static_dir = %config.static_dir.display(),
        allowed_origins = config.allowed_origins.len(),
        cookie_secure = config.cookie_secure,
        "configuration loaded"
    );

    let app_state = AppState::init(config).await?;
    app::serve(app::build_app(app_state), addr).await
}
