use catalog_core::catalog::CatalogService;
use catalog_core::control::LineageRequest;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{CatalogMcp, helpers};

/// Parameters for a lineage traversal.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TraverseLineageParams {
    /// Seed asset guid.
    pub guid: String,
    /// UPSTREAM or DOWNSTREAM.
    pub direction: String,
    /// Hop limit. Omit, or pass 1000000 or more, for no limit.
    pub depth: Option<i64>,
    /// Maximum number of assets to return. Defaults to 10.
    pub size: Option<i64>,
    /// Stop after the first hop. Defaults to true.
    pub immediate_neighbors: Option<bool>,
}

#[tool_router(router = tool_router_lineage, vis = "pub")]
impl<S: CatalogService + 'static> CatalogMcp<S> {
    #[tool(description = "Walk lineage from a seed asset. Returns assets with their hop depth, the references between them, and whether the walk was exhausted or bounded.")]
    async fn traverse_lineage(
        &self,
        params: Parameters<TraverseLineageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let TraverseLineageParams {
            guid,
            direction,
            depth,
            size,
            immediate_neighbors,
        } = params.0;
        let request = match LineageRequest::parse(&guid, &direction, depth, size, immediate_neighbors) {
            Ok(request) => request,
            Err(err) => return helpers::error_result(&err),
        };
        let control = self.control();
        helpers::json_result(control.traverse_lineage(&request).await)
    }
}
