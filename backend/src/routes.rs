use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::{handlers, request_context::request_context_middleware, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(middleware::from_fn(request_context_middleware))
        .layer(cors)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(handlers::list_songs).post(handlers::create_song))
        .route(
            "/songs/:id",
            get(handlers::get_song)
                .put(handlers::update_song)
                .delete(handlers::delete_song),
        )
        .route("/songs/:id/lyrics", get(handlers::get_lyrics))
}
