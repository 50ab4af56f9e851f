use std::collections::{BTreeMap, HashSet};

use catalog_model::{
    Badge,
    BadgeColor,
    BadgeCondition,
    BadgeOperator,
    CustomAttributeDef,
    CustomAttributeType,
    CustomMetadataDef,
    CustomMetadataOptions,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::CatalogService;
use crate::error::{CatalogError, CatalogResult};

use super::CatalogControlPlane;

/// Attribute to add to a custom metadata definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttributeInput {
    pub display_name: String,
    pub attribute_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub multi_valued: bool,
    #[serde(default)]
    pub options_name: Option<String>,
}

impl CustomAttributeInput {
    fn into_def(self) -> CatalogResult<CustomAttributeDef> {
        let display_name = required("attribute display_name", &self.display_name)?;
        let attribute_type: CustomAttributeType = self.attribute_type.parse()?;
        let options_name = self
            .options_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        if attribute_type == CustomAttributeType::Options && options_name.is_none() {
            return Err(CatalogError::InvalidInput(format!(
                "attribute {display_name} of type OPTIONS requires options_name"
            )));
        }
        Ok(CustomAttributeDef {
            display_name,
            name: None,
            attribute_type,
            description: self.description,
            multi_valued: self.multi_valued,
            options_name,
            archived: false,
            archived_by: None,
        })
    }
}

/// Input for creating a custom metadata definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMetadataRequest {
    pub display_name: String,
    #[serde(default)]
    pub attributes: Vec<CustomAttributeInput>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

/// Changes to an existing attribute, keyed by its display name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributeModification {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub multi_valued: Option<bool>,
}

/// Input for changing a custom metadata definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomMetadataUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub add_attributes: Vec<CustomAttributeInput>,
    #[serde(default)]
    pub modify_attributes: BTreeMap<String, AttributeModification>,
    #[serde(default)]
    pub remove_attributes: Vec<String>,
    #[serde(default)]
    pub archived_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeConditionInput {
    pub operator: String,
    pub value: String,
    pub color: String,
}

impl BadgeConditionInput {
    fn into_condition(self) -> CatalogResult<BadgeCondition> {
        Ok(BadgeCondition {
            operator: self.operator.parse::<BadgeOperator>()?,
            value: self.value,
            color: self.color.parse::<BadgeColor>()?,
        })
    }
}

/// Input for creating a badge on a custom metadata attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRequest {
    pub name: String,
    pub metadata_name: String,
    pub attribute_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub conditions: Vec<BadgeConditionInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BadgeUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl BadgeUpdateRequest {
    const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.emoji.is_none()
            && self.logo_url.is_none()
    }
}

fn required(field: &str, value: &str) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CatalogError::InvalidInput(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn convert_attributes(
    inputs: Vec<CustomAttributeInput>,
    existing: &[CustomAttributeDef],
) -> CatalogResult<Vec<CustomAttributeDef>> {
    let mut names: HashSet<String> = existing
        .iter()
        .filter(|attr| !attr.archived)
        .map(|attr| attr.display_name.clone())
        .collect();
    let mut converted = Vec::with_capacity(inputs.len());
    for input in inputs {
        let def = input.into_def()?;
        if !names.insert(def.display_name.clone()) {
            return Err(CatalogError::InvalidInput(format!(
                "duplicate attribute display name: {}",
                def.display_name
            )));
        }
        converted.push(def);
    }
    Ok(converted)
}

fn metadata_options(
    emoji: Option<String>,
    logo_url: Option<String>,
    locked: bool,
) -> Option<CustomMetadataOptions> {
    let emoji = emoji.filter(|value| !value.trim().is_empty());
    let logo_url = logo_url.filter(|value| !value.trim().is_empty());
    if emoji.is_none() && logo_url.is_none() && !locked {
        return None;
    }
    // An emoji takes precedence over a logo URL.
    let logo_url = if emoji.is_some() { None } else { logo_url };
    Some(CustomMetadataOptions {
        emoji,
        logo_url,
        locked,
    })
}

impl<S: CatalogService> CatalogControlPlane<S> {
    /// Creates a custom metadata definition.
    ///
    /// # Errors
    /// Returns `InvalidInput` or `InvalidEnumValue` for bad input and
    /// `Upstream` when the catalog rejects the definition.
    pub async fn create_custom_metadata(
        &self,
        request: CustomMetadataRequest,
    ) -> CatalogResult<CustomMetadataDef> {
        let CustomMetadataRequest {
            display_name,
            attributes,
            description,
            emoji,
            logo_url,
            locked,
        } = request;

        let display_name = required("display_name", &display_name)?;
        let attribute_defs = convert_attributes(attributes, &[])?;
        let definition = CustomMetadataDef {
            guid: None,
            name: None,
            display_name,
            description,
            attribute_defs,
            options: metadata_options(emoji, logo_url, locked),
        };
        let created = self.catalog().create_custom_metadata(definition).await?;
        info!(
            name = %created.display_name,
            guid = created.guid.as_deref().unwrap_or_default(),
            "created custom metadata"
        );
        Ok(created)
    }

    /// Looks up a custom metadata definition by display name.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty name and `Upstream` for catalog failures.
    pub async fn get_custom_metadata(&self, name: &str) -> CatalogResult<Option<CustomMetadataDef>> {
        let name = required("name", name)?;
        self.catalog().custom_metadata(&name).await
    }

    /// Adds, modifies, and archives attributes on a definition.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown definition, `InvalidInput` for unknown
    /// attribute names, an empty change set, or a removal without `archived_by`.
    pub async fn update_custom_metadata(
        &self,
        request: CustomMetadataUpdateRequest,
    ) -> CatalogResult<CustomMetadataDef> {
        let CustomMetadataUpdateRequest {
            name,
            add_attributes,
            modify_attributes,
            remove_attributes,
            archived_by,
        } = request;

        let name = required("name", &name)?;
        if add_attributes.is_empty() && modify_attributes.is_empty() && remove_attributes.is_empty() {
            return Err(CatalogError::InvalidInput(
                "no attribute changes were requested".to_string(),
            ));
        }
        let archived_by = archived_by
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if !remove_attributes.is_empty() && archived_by.is_none() {
            return Err(CatalogError::InvalidInput(
                "archived_by is required when removing attributes".to_string(),
            ));
        }

        let mut definition = self
            .catalog()
            .custom_metadata(&name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("custom metadata {name}")))?;

        for (display_name, change) in modify_attributes {
            let attribute = definition.attribute_mut(&display_name).ok_or_else(|| {
                CatalogError::InvalidInput(format!("unknown attribute: {display_name}"))
            })?;
            if let Some(renamed) = change.display_name {
                attribute.display_name = required("display_name", &renamed)?;
            }
            if let Some(description) = change.description {
                attribute.description = Some(description);
            }
            if let Some(multi_valued) = change.multi_valued {
                attribute.multi_valued = multi_valued;
            }
        }

        for display_name in &remove_attributes {
            let attribute = definition.attribute_mut(display_name).ok_or_else(|| {
                CatalogError::InvalidInput(format!("unknown attribute: {display_name}"))
            })?;
            attribute.archived = true;
            attribute.archived_by.clone_from(&archived_by);
        }

        let added = convert_attributes(add_attributes, &definition.attribute_defs)?;
        definition.attribute_defs.extend(added);

        let updated = self.catalog().update_custom_metadata(definition).await?;
        info!(name = %updated.display_name, "updated custom metadata");
        Ok(updated)
    }

    /// Creates a badge for an existing custom metadata attribute.
    ///
    /// # Errors
    /// Returns `InvalidInput` or `InvalidEnumValue` for bad input, `NotFound`
    /// when the metadata or attribute does not exist, and `Upstream`.
    pub async fn create_badge(&self, request: BadgeRequest) -> CatalogResult<Badge> {
        let BadgeRequest {
            name,
            metadata_name,
            attribute_name,
            display_name,
            description,
            emoji,
            logo_url,
            conditions,
        } = request;

        let name = required("name", &name)?;
        let metadata_name = required("metadata_name", &metadata_name)?;
        let attribute_name = required("attribute_name", &attribute_name)?;
        let conditions = conditions
            .into_iter()
            .map(BadgeConditionInput::into_condition)
            .collect::<CatalogResult<Vec<_>>>()?;

        let definition = self
            .catalog()
            .custom_metadata(&metadata_name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("custom metadata {metadata_name}")))?;
        if definition.attribute(&attribute_name).is_none() {
            return Err(CatalogError::NotFound(format!(
                "attribute {attribute_name} on custom metadata {metadata_name}"
            )));
        }

        let saved = self
            .catalog()
            .save_badge(Badge {
                guid: None,
                name,
                metadata_name,
                attribute_name,
                display_name,
                description,
                emoji,
                logo_url,
                conditions,
            })
            .await?;
        info!(name = %saved.name, "created badge");
        Ok(saved)
    }

    /// # Errors
    /// Returns `NotFound` for an unknown badge and `InvalidInput` when nothing changes.
    pub async fn update_badge(&self, request: BadgeUpdateRequest) -> CatalogResult<Badge> {
        let name = required("name", &request.name)?;
        if request.is_empty() {
            return Err(CatalogError::InvalidInput(
                "no badge changes were requested".to_string(),
            ));
        }
        let mut badge = self
            .catalog()
            .badge(&name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("badge {name}")))?;
        if request.display_name.is_some() {
            badge.display_name = request.display_name;
        }
        if request.description.is_some() {
            badge.description = request.description;
        }
        if request.emoji.is_some() {
            badge.emoji = request.emoji;
        }
        if request.logo_url.is_some() {
            badge.logo_url = request.logo_url;
        }
        let saved = self.catalog().save_badge(badge).await?;
        info!(name = %saved.name, "updated badge");
        Ok(saved)
    }

    /// # Errors
    /// Returns `NotFound` when no badge has the guid.
    pub async fn delete_badge(&self, guid: &str) -> CatalogResult<()> {
        let guid = required("guid", guid)?;
        if self.catalog().delete_badge(&guid).await? {
            info!(guid = %guid, "deleted badge");
            Ok(())
        } else {
            Err(CatalogError::NotFound(format!("badge {guid}")))
        }
    }
}
