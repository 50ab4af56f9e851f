//! MCP server runners for catalog-mcp.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use catalog_core::catalog::CatalogService;
use catalog_core::services::CatalogHandle;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use serde::Serialize;
use tracing::info;

use crate::CatalogMcp;

const DEFAULT_HTTP_PORT: u16 = 4020;

/// Liveness payload served at `/health` and by the `health` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    /// Catalog backend label, `http` or `memory`.
    pub backend: &'static str,
    pub max_page_size: usize,
}

impl HealthReport {
    #[must_use]
    pub fn from_handle<S: CatalogService>(handle: &CatalogHandle<S>) -> Self {
        Self {
            status: "ok",
            backend: handle.catalog().backend(),
            max_page_size: handle.control().max_page_size(),
        }
    }
}

/// Configuration for the MCP streamable HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }

    #[must_use]
    pub const fn with_sse_keep_alive(mut self, sse_keep_alive: Option<Duration>) -> Self {
        self.sse_keep_alive = sse_keep_alive;
        self
    }

    #[must_use]
    pub const fn with_sse_retry(mut self, sse_retry: Option<Duration>) -> Self {
        self.sse_retry = sse_retry;
        self
    }
}

impl Default for McpHttpServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_HTTP_PORT)))
    }
}

/// Serves the MCP server over stdio.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio<S>(
    handle: CatalogHandle<S>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: CatalogService + 'static,
{
    let backend = handle.catalog().backend();
    let service = CatalogMcp::with_handle(handle);
    let (stdin, stdout) = stdio();
    info!(backend, "serving MCP over stdio");
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Serves the MCP server using streamable HTTP transport.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http<S>(
    handle: CatalogHandle<S>,
    config: McpHttpServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: CatalogService + 'static,
{
    let service_handle = handle.clone();
    let service: StreamableHttpService<CatalogMcp<S>, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(CatalogMcp::with_handle(service_handle.clone())),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                sse_keep_alive: config.sse_keep_alive,
                sse_retry: config.sse_retry,
                stateful_mode: config.stateful_mode,
                ..Default::default()
            },
        );

    let report = HealthReport::from_handle(&handle);
    let backend = report.backend;
    let app = Router::new()
        .route("/health", get(move || async move { Json(report) }))
        .nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, backend, "serving MCP over streamable HTTP");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_loopback() {
        let config = McpHttpServerConfig::default();
        assert_eq!(config.addr.to_string(), "127.0.0.1:4020");
        assert!(config.stateful_mode);
        assert_eq!(config.sse_keep_alive, Some(Duration::from_secs(15)));
    }

    #[test]
    fn health_report_names_the_backend() {
        let catalog = catalog_core::catalog::MemoryCatalog::from_json(r#"{"assets": []}"#)
            .expect("catalog");
        let handle = CatalogHandle::from_catalog(catalog).with_max_page_size(40);
        let report = HealthReport::from_handle(&handle);
        assert_eq!(
            report,
            HealthReport {
                status: "ok",
                backend: "memory",
                max_page_size: 40,
            }
        );
        assert_eq!(
            serde_json::to_value(&report).expect("json"),
            serde_json::json!({ "status": "ok", "backend": "memory", "max_page_size": 40 })
        );
        assert_eq!(handle.catalog().request_count(), 0);
    }

    #[test]
    fn builders_override_fields() {
        let config = McpHttpServerConfig::default()
            .with_stateful_mode(false)
            .with_sse_keep_alive(None)
            .with_sse_retry(Some(Duration::from_secs(1)));
        assert!(!config.stateful_mode);
        assert!(config.sse_keep_alive.is_none());
        assert_eq!(config.sse_retry, Some(Duration::from_secs(1)));
    }
}
