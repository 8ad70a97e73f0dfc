use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod tfl_client;

use tfl_client::TransitProvider;

#[derive(Clone)]
pub struct AppState {
    pub api_token: Option<Arc<str>>,
    pub transit: Arc<dyn TransitProvider>,
}

impl AppState {
    pub fn new(api_token: Option<String>, transit: Arc<dyn TransitProvider>) -> Self {
        Self {
            api_token: api_token.map(Arc::<str>::from),
            transit,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
