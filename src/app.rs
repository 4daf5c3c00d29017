/*
 * Responsibility
 * - tracing 初期化 → Config 読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (HTTP 共通 / Bearer)
 * - axum::serve() で起動
 */
use anyhow::Result;
use axum::Router;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    api,
    config::Config,
    middleware::http::{self, HttpLimits},
    services::auth::build_authorizer,
    state::AppState,
};

pub async fn run() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let authorizer = build_authorizer(&config)?;
    info!(?authorizer, "authorizer configured");

    let state = AppState::new(authorizer);
    let app = build_router(state, HttpLimits::from(&config));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, env = ?config.app_env, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(&state))
        .with_state(state);

    http::apply(router, limits)
}

fn init_tracing(config: &Config) {
    let default_directive = if config.app_env.is_production() {
        "info"
    } else {
        "debug"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // try_init: tests may have installed a subscriber already
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
