mod auth;
mod error;
mod handlers;
mod routes;

pub use error::{not_found, ApiError};

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use sqlx::{Pool, Postgres};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::services::gmail::OauthConfig;
use crate::services::vision::VisionConfig;

/// Everything read from the environment at startup.
pub struct AppConfig {
    pub api_token: Option<String>,
    pub upload_dir: PathBuf,
    pub vision: VisionConfig,
    pub gmail_oauth: OauthConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            api_token: env::var("API_TOKEN").ok().filter(|token| !token.is_empty()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()).into(),
            vision: VisionConfig {
                api_url: env::var("VISION_API_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
                api_key: env::var("VISION_API_KEY").unwrap_or_default(),
                model: env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            },
            gmail_oauth: OauthConfig {
                client_id: env::var("GMAIL_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("GMAIL_CLIENT_SECRET").unwrap_or_default(),
            },
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub http: reqwest::Client,
    pub config: Arc<AppConfig>,
}

pub async fn run_server(pool: Pool<Postgres>) -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::from_env());
    if config.api_token.is_none() {
        tracing::warn!("API_TOKEN is not set, requests are unauthenticated");
    }
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = AppState {
        db: pool,
        http: reqwest::Client::new(),
        config,
    };

    let app = Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes(state.clone()))
        // Receipt photos routinely exceed axum's 2 MB default.
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .with_state(state);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".into())
        .parse()?;
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
