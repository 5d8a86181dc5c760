use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use yan_sdk::Yan;
use yan_sync::SyncServer;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Yan sync server.
pub struct YanServer {
    config: ServerConfig,
    sync: SyncServer,
}

impl YanServer {
    pub fn new(config: ServerConfig, yan: Yan) -> Self {
        Self {
            config,
            sync: SyncServer::new(yan),
        }
    }

    /// A server over a fresh in-memory repository.
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(config, Yan::in_memory())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn yan(&self) -> &Yan {
        self.sync.yan()
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let router = build_router(self.sync.clone());
        if self.config.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let app = self.router();
        tracing::info!("Yan server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = YanServer::in_memory(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "127.0.0.1:9418".parse().unwrap());
    }

    #[test]
    fn router_builds_with_cors() {
        let config = ServerConfig {
            cors: true,
            ..ServerConfig::default()
        };
        let _router = YanServer::in_memory(config).router();
    }
}
