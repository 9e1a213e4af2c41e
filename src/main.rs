mod app;
mod auth;
mod choices;
mod config;
mod error;
mod mailer;
mod questions;
mod state;
mod surveys;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "pollwise=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    if app_state.config.public_origin.is_none() {
        tracing::warn!("PUBLIC_ORIGIN not set; password-reset links will point at localhost");
    }

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    let port = app_state.config.port;
    let app = app::build_app(app_state);
    app::serve(app, port).await
}
