use tracing_subscriber::EnvFilter;

mod app;
mod auth;
mod config;
mod error;
mod state;

const DEFAULT_LOG_FILTER: &str = "authsvc=info,tower_http=warn";

/// `RUST_LOG` overrides the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().with_current_span(true).init(),
        _ => builder.compact().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let (app_state, db) = state::AppState::init().await?;
    tracing::info!(
        ttl_secs = app_state.keys.ttl().as_secs(),
        bcrypt_cost = app_state.config.bcrypt_cost,
        "configuration loaded"
    );

    sqlx::migrate!("./migrations").run(&db).await?;

    app::serve(app::build_app(app_state)).await
}
