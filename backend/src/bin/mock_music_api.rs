//! Stand-in for the external metadata service, for local development.
//!
//! Serves `GET /info?group=&song=` with a fixed song detail.

use std::env;

use anyhow::{Context, Result};
use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use song_catalog_shared::SongDetail;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

const DEFAULT_MOCK_PORT: &str = "8081";

#[derive(Debug, Deserialize)]
struct InfoQuery {
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    song: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = env::var("MOCK_API_PORT").unwrap_or_else(|_| DEFAULT_MOCK_PORT.to_string());
    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Mock metadata API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router()).await.context("mock api server error")?;
    Ok(())
}

fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new().route("/info", get(song_info)).layer(cors)
}

async fn song_info(Query(query): Query<InfoQuery>) -> Response {
    let group = query.group.unwrap_or_default();
    let song = query.song.unwrap_or_default();
    if group.is_empty() || song.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "group and song parameters are required"})),
        )
            .into_response();
    }

    tracing::info!(group = %group, song = %song, "serving canned song detail");
    Json(canned_detail()).into_response()
}

fn canned_detail() -> SongDetail {
    SongDetail {
        release_date: "16.07.2006".to_string(),
        text: [
            "Ooh baby, don't you know I suffer?\nOoh baby, can you hear me moan?\nYou caught me \
             under false pretenses\nHow long before you let me go?",
            "Ooh\nYou set my soul alight\nOoh\nYou set my soul alight",
        ]
        .join("\n\n"),
        link: "https://www.youtube.com/watch?v=Xsp3_a-PMTw".to_string(),
    }
}
