//! MCP server implementation for catalog-mcp.
//!
//! This crate wires the catalog control plane into rmcp tool handlers and
//! exposes the search, lineage, update, and custom metadata tools.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use catalog_core::catalog::CatalogService;
use catalog_core::control::CatalogControlPlane;
use catalog_core::services::CatalogHandle;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};

pub use tools::assets::{AssetRefParams, AssetSelection, UpdateAssetsParams, ValueSelection};
pub use tools::context::HelpCommands;
pub use tools::lineage::TraverseLineageParams;
pub use tools::metadata::{
    BadgeConditionParams,
    CreateBadgeParams,
    CreateCustomMetadataParams,
    CustomAttributeParams,
    DeleteBadgeParams,
    GetCustomMetadataParams,
    ModifyAttributeParams,
    UpdateBadgeParams,
    UpdateCustomMetadataParams,
};
pub use tools::search::{DslQueryParams, SearchAssetsParams};

const SERVER_INSTRUCTIONS: &str = r"catalog-mcp exposes a metadata catalog (tables, columns, views, dashboards) to agents.

Workflow:
1. Find assets with `search_assets`:
   - `conditions` must all hold, `negative_conditions` must all fail, and at least `min_somes`
     of `some_conditions` must hold. A condition value is a literal, a list of literals,
     the string `has_any_value`, or `{operator, value}` with operators eq, match,
     has_any_value, startswith, within, between, gt, gte, lt, lte.
   - Narrow with `asset_type`, `connection_qualified_name`, `tags` (display names),
     `domain_guids`, `date_range` and `guids`. Archived assets are hidden unless `include_archived` is true.
   - Page with `limit` and `offset`; `limit` 0 returns only the total count.
2. Send a raw search DSL body with `get_assets_by_dsl` when the filters are not enough.
3. Walk lineage with `traverse_lineage` (UPSTREAM or DOWNSTREAM). The result reports whether
   the walk exhausted the graph or stopped at a depth, size, or one-hop bound.
4. Update `user_description` or `certificate_status` on one or many assets with
   `update_assets`. Pass one value for all assets or one value per asset.
5. Manage custom metadata structures and badges with `create_custom_metadata`,
   `get_custom_metadata`, `update_custom_metadata`, `create_badge`, `update_badge`,
   and `delete_badge`.

Notes:
- Domain failures come back as tool errors carrying `{error, kind}`.
- Use `help` for the command list and `filter_help` for filter examples.
- `health` reports `{status, backend, max_page_size}`.";

/// MCP server wrapper around a catalog handle and tool routers.
pub struct CatalogMcp<S> {
    tool_router: ToolRouter<Self>,
    handle: CatalogHandle<S>,
}

impl<S> Clone for CatalogMcp<S> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            handle: self.handle.clone(),
        }
    }
}

impl<S: CatalogService + 'static> CatalogMcp<S> {
    /// Creates a new server owning the catalog client.
    #[must_use]
    pub fn new(catalog: S) -> Self {
        Self::with_handle(CatalogHandle::new(Arc::new(catalog)))
    }

    /// Creates a new server over a shared catalog handle.
    #[must_use]
    pub fn with_handle(handle: CatalogHandle<S>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_search()
            + Self::tool_router_lineage()
            + Self::tool_router_assets()
            + Self::tool_router_metadata()
            + Self::tool_router_context();
        Self {
            tool_router,
            handle,
        }
    }

    #[must_use]
    pub const fn handle(&self) -> &CatalogHandle<S> {
        &self.handle
    }

    pub(crate) fn control(&self) -> CatalogControlPlane<S> {
        self.handle.control()
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<S: CatalogService + 'static> CatalogMcp<S> {
    #[tool(description = "Health check. Reports status, catalog backend, and max page size.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(
            server::HealthReport::from_handle(&self.handle),
        )?]))
    }
}

#[tool_handler]
impl<S: CatalogService + 'static> ServerHandler for CatalogMcp<S> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
