//! Pass-through proxy that forwards problem lookups to the LeetCode GraphQL API.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::fetch_question;

#[derive(Clone)]
pub struct ProxyState {
    client: Client,
    graphql_url: String,
}

impl ProxyState {
    pub fn new(graphql_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            graphql_url: graphql_url.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SlugRequest {
    #[serde(default)]
    slug: Option<String>,
}

enum ProxyError {
    MissingSlug,
    Upstream(AppError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ProxyError::MissingSlug => (StatusCode::BAD_REQUEST, "Missing slug".to_string()),
            ProxyError::Upstream(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/leetcode", post(leetcode))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// POST /leetcode - returns the upstream `question` object for `{ "slug": ... }`.
async fn leetcode(
    State(state): State<ProxyState>,
    body: std::result::Result<Json<SlugRequest>, JsonRejection>,
) -> std::result::Result<Json<Value>, ProxyError> {
    let slug = body
        .ok()
        .and_then(|Json(req)| req.slug)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ProxyError::MissingSlug)?;

    info!(slug = %slug, "forwarding question lookup");
    let question = fetch_question(&state.client, &state.graphql_url, &slug)
        .await
        .map_err(|e| {
            tracing::warn!(slug = %slug, error = %e, "upstream lookup failed");
            ProxyError::Upstream(e)
        })?;

    Ok(Json(question))
}

/// Serves the proxy until Ctrl-C.
pub async fn serve(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.proxy_port);
    let addr: SocketAddr = format!("{}:{}", config.proxy_bind, port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid proxy address: {e}")))?;

    let app = router(ProxyState::new(&config.leetcode_graphql_url)?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down proxy");
        })
        .await?;

    Ok(())
}
