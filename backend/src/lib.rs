pub mod aggregate;
pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod quota;
pub mod report;
pub mod roast;
pub mod routes;
pub mod store;
pub mod test_util;

pub use auth::{AuthUser, JwksClient};
pub use config::Config;
pub use error::{ApiError, Result};
pub use llm::LlmClient;
pub use store::ExpenseStore;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub jwks_client: JwksClient,
    pub llm: LlmClient,
    pub store: ExpenseStore,
}

/// Build the CORS layer from config: "*" means any origin, otherwise a
/// comma-separated allow list.
pub fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.trim() == "*" {
        layer.allow_origin(Any)
    } else {
        let list: Vec<_> = origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(list))
    }
}

/// Assemble the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors.origins);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::me::router(state.clone()))
        .merge(routes::expenses::router(state.clone()))
        .merge(routes::billing::router(state))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
