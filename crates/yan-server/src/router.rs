use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use yan_protocol::endpoints;
use yan_sync::SyncServer;

use crate::handler;

/// Build the router. Methods other than `GET` and `POST` on a branch get
/// `405 Method Not Allowed`.
pub fn build_router(server: SyncServer) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(
            endpoints::BRANCH,
            get(handler::pull_handler).post(handler::push_handler),
        )
        .with_state(server)
        .layer(TraceLayer::new_for_http())
}
