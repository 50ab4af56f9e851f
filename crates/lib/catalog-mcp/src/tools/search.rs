use std::collections::BTreeMap;

use catalog_core::CatalogResult;
use catalog_core::catalog::CatalogService;
use catalog_core::control::{SearchOptions, count_arg};
use catalog_core::query::SearchFilters;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CatalogMcp, helpers};

/// Parameters for a structured asset search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchAssetsParams {
    /// Attribute name to condition; every entry must hold.
    pub conditions: Option<BTreeMap<String, Value>>,
    /// Attribute name to condition; no entry may hold.
    pub negative_conditions: Option<BTreeMap<String, Value>>,
    /// Attribute name to condition; at least `min_somes` entries must hold.
    pub some_conditions: Option<BTreeMap<String, Value>>,
    /// Defaults to 1.
    pub min_somes: Option<i64>,
    /// Extra attributes to return on each asset.
    pub include_attributes: Option<Vec<String>>,
    /// Asset type such as Table, Column, or View.
    pub asset_type: Option<String>,
    pub include_archived: Option<bool>,
    /// Defaults to 10. Zero returns only the total count.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    /// ASC or DESC.
    pub sort_order: Option<String>,
    /// Qualified name prefix of the source connection.
    pub connection_qualified_name: Option<String>,
    pub tags: Option<Vec<String>>,
    /// When false, propagated tags also match. Defaults to true.
    pub directly_tagged: Option<bool>,
    pub domain_guids: Option<Vec<String>>,
    /// Attribute name to `{gte, lte}` bounds in epoch millis or ISO-8601.
    pub date_range: Option<BTreeMap<String, Value>>,
    pub guids: Option<Vec<String>>,
}

impl SearchAssetsParams {
    /// Splits the flat tool arguments into compiled filters and paging options.
    ///
    /// # Errors
    /// Returns `InvalidInput` for negative counts.
    pub fn into_request(self) -> CatalogResult<(SearchFilters, SearchOptions)> {
        let defaults = SearchFilters::default();
        let filters = SearchFilters {
            conditions: self.conditions.unwrap_or_default(),
            negative_conditions: self.negative_conditions.unwrap_or_default(),
            some_conditions: self.some_conditions.unwrap_or_default(),
            min_somes: self
                .min_somes
                .map_or(Ok(defaults.min_somes), |raw| count_arg("min_somes", raw))?,
            asset_type: self.asset_type,
            include_archived: self.include_archived.unwrap_or(defaults.include_archived),
            connection_qualified_name: self.connection_qualified_name,
            tags: self.tags.unwrap_or_default(),
            directly_tagged: self.directly_tagged.unwrap_or(defaults.directly_tagged),
            domain_guids: self.domain_guids.unwrap_or_default(),
            date_range: self.date_range.unwrap_or_default(),
            guids: self.guids.unwrap_or_default(),
        };
        let paging = SearchOptions::default();
        let options = SearchOptions {
            include_attributes: self.include_attributes.unwrap_or_default(),
            limit: self.limit.map_or(Ok(paging.limit), |raw| count_arg("limit", raw))?,
            offset: self.offset.map_or(Ok(paging.offset), |raw| count_arg("offset", raw))?,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        };
        Ok((filters, options))
    }
}

/// Parameters for a raw search DSL query.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DslQueryParams {
    /// Search body as a JSON object or a JSON-encoded string.
    pub dsl_query: Value,
}

#[tool_router(router = tool_router_search, vis = "pub")]
impl<S: CatalogService + 'static> CatalogMcp<S> {
    #[tool(description = "Search catalog assets with structured conditions, type, tag, connection, domain and date filters. Returns assets and the total count.")]
    async fn search_assets(
        &self,
        params: Parameters<SearchAssetsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (filters, options) = match params.0.into_request() {
            Ok(request) => request,
            Err(err) => return helpers::error_result(&err),
        };
        let control = self.control();
        helpers::json_result(control.search_assets(&filters, &options).await)
    }

    #[tool(description = "Run a raw search DSL body (object or JSON string) against the catalog index.")]
    async fn get_assets_by_dsl(
        &self,
        params: Parameters<DslQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let DslQueryParams { dsl_query } = params.0;
        let control = self.control();
        helpers::json_result(control.search_by_dsl(&dsl_query).await)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_arguments_take_search_defaults() {
        let params: SearchAssetsParams =
            serde_json::from_value(json!({ "asset_type": "Table" })).expect("params");
        let (filters, options) = params.into_request().expect("request");
        assert_eq!(filters.min_somes, 1);
        assert!(filters.directly_tagged);
        assert!(!filters.include_archived);
        assert_eq!(filters.asset_type.as_deref(), Some("Table"));
        assert_eq!(options, SearchOptions::default());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let params = SearchAssetsParams {
            limit: Some(-1),
            ..SearchAssetsParams::default()
        };
        let err = params.into_request().unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
    }

    #[test]
    fn paging_arguments_carry_over() {
        let params = SearchAssetsParams {
            limit: Some(0),
            offset: Some(20),
            min_somes: Some(2),
            sort_by: Some("name".to_string()),
            sort_order: Some("desc".to_string()),
            ..SearchAssetsParams::default()
        };
        let (filters, options) = params.into_request().expect("request");
        assert_eq!(filters.min_somes, 2);
        assert_eq!(options.limit, 0);
        assert_eq!(options.offset, 20);
        assert_eq!(options.sort_order.as_deref(), Some("desc"));
    }
}
