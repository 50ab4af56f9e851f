use std::collections::BTreeMap;

use catalog_core::catalog::CatalogService;
use catalog_core::control::{
    AttributeModification,
    BadgeConditionInput,
    BadgeRequest,
    BadgeUpdateRequest,
    CustomAttributeInput,
    CustomMetadataRequest,
    CustomMetadataUpdateRequest,
};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{CatalogMcp, helpers};

/// Attribute inside a custom metadata structure.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CustomAttributeParams {
    pub display_name: String,
    /// STRING, INTEGER, DECIMAL, BOOLEAN, DATE, OPTIONS, USERS, GROUPS, URL, or SQL.
    pub attribute_type: String,
    pub description: Option<String>,
    pub multi_valued: Option<bool>,
    /// Required for OPTIONS attributes.
    pub options_name: Option<String>,
}

impl From<CustomAttributeParams> for CustomAttributeInput {
    fn from(params: CustomAttributeParams) -> Self {
        Self {
            display_name: params.display_name,
            attribute_type: params.attribute_type,
            description: params.description,
            multi_valued: params.multi_valued.unwrap_or(false),
            options_name: params.options_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateCustomMetadataParams {
    pub display_name: String,
    pub attributes: Option<Vec<CustomAttributeParams>>,
    pub description: Option<String>,
    /// Takes precedence over `logo_url`.
    pub emoji: Option<String>,
    pub logo_url: Option<String>,
    pub locked: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetCustomMetadataParams {
    /// Display name or internal name of the structure.
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ModifyAttributeParams {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub multi_valued: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateCustomMetadataParams {
    /// Display name or guid of the structure.
    pub name: String,
    pub add_attributes: Option<Vec<CustomAttributeParams>>,
    /// Existing attribute display name to the changes to apply.
    pub modify_attributes: Option<BTreeMap<String, ModifyAttributeParams>>,
    /// Attribute display names to archive.
    pub remove_attributes: Option<Vec<String>>,
    /// Required when removing attributes.
    pub archived_by: Option<String>,
}

impl From<UpdateCustomMetadataParams> for CustomMetadataUpdateRequest {
    fn from(params: UpdateCustomMetadataParams) -> Self {
        Self {
            name: params.name,
            add_attributes: params
                .add_attributes
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
            modify_attributes: params
                .modify_attributes
                .unwrap_or_default()
                .into_iter()
                .map(|(name, change)| {
                    (
                        name,
                        AttributeModification {
                            display_name: change.display_name,
                            description: change.description,
                            multi_valued: change.multi_valued,
                        },
                    )
                })
                .collect(),
            remove_attributes: params.remove_attributes.unwrap_or_default(),
            archived_by: params.archived_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BadgeConditionParams {
    /// EQ, NEQ, GT, GTE, LT, or LTE.
    pub operator: String,
    pub value: String,
    /// GREEN, YELLOW, or RED.
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateBadgeParams {
    pub name: String,
    /// Custom metadata structure holding the attribute.
    pub metadata_name: String,
    pub attribute_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub logo_url: Option<String>,
    pub conditions: Option<Vec<BadgeConditionParams>>,
}

impl From<CreateBadgeParams> for BadgeRequest {
    fn from(params: CreateBadgeParams) -> Self {
        Self {
            name: params.name,
            metadata_name: params.metadata_name,
            attribute_name: params.attribute_name,
            display_name: params.display_name,
            description: params.description,
            emoji: params.emoji,
            logo_url: params.logo_url,
            conditions: params
                .conditions
                .unwrap_or_default()
                .into_iter()
                .map(|condition| BadgeConditionInput {
                    operator: condition.operator,
                    value: condition.value,
                    color: condition.color,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateBadgeParams {
    /// Name or guid of the badge.
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DeleteBadgeParams {
    pub guid: String,
}

#[tool_router(router = tool_router_metadata, vis = "pub")]
impl<S: CatalogService + 'static> CatalogMcp<S> {
    #[tool(description = "Create a custom metadata structure with typed attributes.")]
    async fn create_custom_metadata(
        &self,
        params: Parameters<CreateCustomMetadataParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let CreateCustomMetadataParams {
            display_name,
            attributes,
            description,
            emoji,
            logo_url,
            locked,
        } = params.0;
        let request = CustomMetadataRequest {
            display_name,
            attributes: attributes
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
            description,
            emoji,
            logo_url,
            locked: locked.unwrap_or(false),
        };
        let control = self.control();
        helpers::tool_result(control.create_custom_metadata(request).await, |def| {
            json!({ "created": true, "guid": def.guid, "metadata": def })
        })
    }

    #[tool(description = "Fetch a custom metadata structure by display name or internal name.")]
    async fn get_custom_metadata(
        &self,
        params: Parameters<GetCustomMetadataParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let GetCustomMetadataParams { name } = params.0;
        let control = self.control();
        helpers::tool_result(control.get_custom_metadata(&name).await, |found| match found {
            Some(def) => json!({ "found": true, "metadata": def }),
            None => json!({ "found": false }),
        })
    }

    #[tool(description = "Add, modify, or archive attributes of a custom metadata structure. Removals require archived_by.")]
    async fn update_custom_metadata(
        &self,
        params: Parameters<UpdateCustomMetadataParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control();
        helpers::tool_result(control.update_custom_metadata(params.0.into()).await, |def| {
            json!({ "updated": true, "metadata": def })
        })
    }

    #[tool(description = "Create a badge that colors a custom metadata attribute by value conditions.")]
    async fn create_badge(
        &self,
        params: Parameters<CreateBadgeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control();
        helpers::tool_result(control.create_badge(params.0.into()).await, |badge| {
            json!({ "created": true, "guid": badge.guid, "badge": badge })
        })
    }

    #[tool(description = "Update the display fields of an existing badge.")]
    async fn update_badge(
        &self,
        params: Parameters<UpdateBadgeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let UpdateBadgeParams {
            name,
            display_name,
            description,
            emoji,
            logo_url,
        } = params.0;
        let request = BadgeUpdateRequest {
            name,
            display_name,
            description,
            emoji,
            logo_url,
        };
        let control = self.control();
        helpers::tool_result(control.update_badge(request).await, |badge| {
            json!({ "updated": true, "badge": badge })
        })
    }

    #[tool(description = "Delete a badge by guid.")]
    async fn delete_badge(
        &self,
        params: Parameters<DeleteBadgeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let DeleteBadgeParams { guid } = params.0;
        let control = self.control();
        helpers::tool_result(control.delete_badge(&guid).await, |()| {
            json!({ "deleted": true, "guid": guid })
        })
    }
}
