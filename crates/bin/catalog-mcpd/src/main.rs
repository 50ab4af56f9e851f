//! Daemon entry point for the catalog MCP server.
//!
//! Loads configuration from CLI arguments and the environment, builds the
//! catalog client, and serves the MCP protocol over stdio and/or streamable
//! HTTP.

mod config;

use std::error::Error;

use catalog_core::catalog::{CatalogService, HttpCatalog, MemoryCatalog};
use catalog_core::services::CatalogHandle;
use catalog_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{CatalogBackend, CatalogConfig};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = CatalogConfig::from_args()?;

    // stdout belongs to the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &config.backend {
        CatalogBackend::Fixture(path) => {
            info!(path = %path.display(), "using fixture catalog");
            let catalog = MemoryCatalog::load(path).await?;
            run(CatalogHandle::from_catalog(catalog), &config).await
        }
        CatalogBackend::Remote(remote) => {
            info!(base_url = %remote.base_url, "using remote catalog");
            let catalog = HttpCatalog::new(remote.clone())?;
            run(CatalogHandle::from_catalog(catalog), &config).await
        }
    }
}

async fn run<S>(handle: CatalogHandle<S>, config: &CatalogConfig) -> Result<(), BoxError>
where
    S: CatalogService + 'static,
{
    let handle = handle.with_max_page_size(config.max_page_size);
    let http_config = McpHttpServerConfig::new(config.mcp_http_addr);
    match (config.enable_stdio, config.mcp_serve) {
        (true, true) => {
            tokio::try_join!(
                serve_stdio(handle.clone()),
                serve_streamable_http(handle, http_config)
            )?;
        }
        (true, false) => serve_stdio(handle).await?,
        (false, _) => serve_streamable_http(handle, http_config).await?,
    }
    Ok(())
}
