use axum::http::{HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::error::{ServerError, ServerResult};
use crate::handler;
use crate::state::AppState;

/// Build the API routes without middleware.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::INFO, get(handler::info_handler))
        .route(
            endpoints::FILES,
            get(handler::list_files).patch(handler::update_files),
        )
        .route(endpoints::ALL_FILES, patch(handler::update_all))
        .route(endpoints::RECONCILE, post(handler::reconcile_file))
        .route(endpoints::EXISTS, get(handler::file_exists))
        .with_state(state)
}

/// Build the full router: API routes behind CORS and request tracing.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> ServerResult<Router> {
    Ok(api_routes(state)
        .layer(cors_layer(allowed_origins)?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(allowed_origins: &[String]) -> ServerResult<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| ServerError::Config(format!("invalid CORS origin: {origin}")))
        })
        .collect::<ServerResult<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any))
}
