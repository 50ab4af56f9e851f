use catalog_core::catalog::CatalogService;
use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::CatalogMcp;

/// Payload listing the MCP commands this server exposes.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            commands: vec![
                "help - List the MCP commands this server exposes.".to_string(),
                "filter_help - Examples of search_assets conditions and operators.".to_string(),
                "search_assets - Search assets with structured filters, paging, and sorting."
                    .to_string(),
                "get_assets_by_dsl - Run a raw search DSL body against the catalog index."
                    .to_string(),
                "traverse_lineage - Walk upstream or downstream lineage from a seed asset."
                    .to_string(),
                "update_assets - Set user_description or certificate_status on a batch of assets."
                    .to_string(),
                "create_custom_metadata - Create a custom metadata structure.".to_string(),
                "get_custom_metadata - Fetch a custom metadata structure by name.".to_string(),
                "update_custom_metadata - Add, modify, or archive custom metadata attributes."
                    .to_string(),
                "create_badge - Create a badge on a custom metadata attribute.".to_string(),
                "update_badge - Update the display fields of a badge.".to_string(),
                "delete_badge - Delete a badge by guid.".to_string(),
                "health - Report status, catalog backend, and max page size.".to_string(),
            ],
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl<S: CatalogService + 'static> CatalogMcp<S> {
    #[tool(description = "List the MCP commands this server exposes.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(HelpCommands::default())?]))
    }

    #[tool(description = "Examples of search_assets conditions, operators, and date ranges.")]
    async fn filter_help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(
r#"
1. Condition values (conditions, negative_conditions, some_conditions):
    - Literal: {"certificate_status": "VERIFIED"} matches the exact value.
    - List: {"certificate_status": ["VERIFIED", "DRAFT"]} matches any element.
      In some_conditions each element counts separately toward min_somes.
    - Presence: {"description": "has_any_value"} matches assets where the attribute is set.
    - Operator: {"name": {"operator": "match", "value": "orders"}}.
2. Operators:
    - eq, match, startswith, has_any_value.
    - within takes a list, between takes a [low, high] pair.
    - gt, gte, lt, lte take a number or date.
3. some_conditions:
    - At least min_somes entries must hold (default 1). Matching entries raise the relevance score.
    - min_somes larger than the number of entries is rejected.
4. Other filters:
    - asset_type: Table, Column, View, and other catalog types.
    - include_archived: archived assets are hidden by default.
    - connection_qualified_name: prefix match on the source connection.
    - tags take display names such as "PII"; unknown tags are rejected.
    - tags with directly_tagged=false also match propagated tags.
    - date_range: {"create_time": {"gte": "2023-01-01", "lte": 1704067200000}}.
5. Paging and sorting:
    - limit (default 10, zero returns only total_count), offset, sort_by, sort_order (ASC or DESC).
    - Results always break ties by guid, so pages are stable.
"#
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_tool() {
        let commands = HelpCommands::default().commands;
        for tool in [
            "search_assets",
            "get_assets_by_dsl",
            "traverse_lineage",
            "update_assets",
            "create_custom_metadata",
            "get_custom_metadata",
            "update_custom_metadata",
            "create_badge",
            "update_badge",
            "delete_badge",
        ] {
            assert!(
                commands.iter().any(|line| line.starts_with(&format!("{tool} - "))),
                "missing {tool}"
            );
        }
    }
}
