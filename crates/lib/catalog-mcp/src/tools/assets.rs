use catalog_core::catalog::CatalogService;
use catalog_model::AssetRef;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::CatalogMcp;

/// Asset to update, as returned by `search_assets`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AssetRefParams {
    pub guid: String,
    pub type_name: String,
    pub qualified_name: String,
    pub name: Option<String>,
}

impl From<AssetRefParams> for AssetRef {
    fn from(params: AssetRefParams) -> Self {
        Self {
            guid: params.guid,
            type_name: params.type_name,
            qualified_name: params.qualified_name,
            name: params.name,
        }
    }
}

/// One asset or a list of assets.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum AssetSelection {
    One(AssetRefParams),
    Many(Vec<AssetRefParams>),
}

impl AssetSelection {
    #[must_use]
    pub fn into_refs(self) -> Vec<AssetRef> {
        match self {
            Self::One(asset) => vec![asset.into()],
            Self::Many(assets) => assets.into_iter().map(Into::into).collect(),
        }
    }
}

/// One value for every asset, or one value per asset.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum ValueSelection {
    One(String),
    Many(Vec<String>),
}

impl ValueSelection {
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Parameters for a governed attribute update.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateAssetsParams {
    pub assets: AssetSelection,
    /// `user_description` or `certificate_status`.
    pub attribute_name: String,
    /// Certificate values are DRAFT, VERIFIED, or DEPRECATED.
    pub attribute_values: ValueSelection,
}

#[tool_router(router = tool_router_assets, vis = "pub")]
impl<S: CatalogService + 'static> CatalogMcp<S> {
    #[tool(description = "Set user_description or certificate_status on one or more assets in a single batch. Always returns {updated_count, errors}.")]
    async fn update_assets(
        &self,
        params: Parameters<UpdateAssetsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let UpdateAssetsParams {
            assets,
            attribute_name,
            attribute_values,
        } = params.0;
        let assets = assets.into_refs();
        let values = attribute_values.into_values();
        let outcome = self
            .control()
            .update_assets(&assets, &attribute_name, &values)
            .await;
        Ok(CallToolResult::success(vec![Content::json(outcome)?]))
    }
}
