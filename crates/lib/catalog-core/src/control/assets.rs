use std::collections::{BTreeMap, HashSet};

use catalog_model::{AssetRef, AttributeValue, CertificateStatus, UpdatableAttribute, UpdateOutcome};
use tracing::{info, warn};

use crate::catalog::{CatalogService, EntityUpdate};
use crate::error::{CatalogError, CatalogResult};

use super::CatalogControlPlane;

/// Validates and sends governed attribute updates as one bulk call.
pub struct AttributeUpdateDispatcher<'a, S> {
    catalog: &'a S,
}

impl<'a, S: CatalogService> AttributeUpdateDispatcher<'a, S> {
    pub const fn new(catalog: &'a S) -> Self {
        Self { catalog }
    }

    /// Applies one attribute to every asset.
    ///
    /// A single value is broadcast to every asset; otherwise values pair with
    /// assets by position. Validation runs attribute name, then arity, then
    /// enum values, all before the catalog is called and before an empty
    /// batch returns.
    ///
    /// # Errors
    /// Returns `UnsupportedAttribute`, `ArityMismatch`, `InvalidEnumValue`,
    /// `InvalidInput`, or `Upstream`.
    pub async fn apply(
        &self,
        assets: &[AssetRef],
        attribute_name: &str,
        values: &[String],
    ) -> CatalogResult<UpdateOutcome> {
        let attribute: UpdatableAttribute = attribute_name
            .parse()
            .map_err(|_| CatalogError::UnsupportedAttribute(attribute_name.trim().to_string()))?;

        if values.len() != 1 && values.len() != assets.len() {
            return Err(CatalogError::ArityMismatch {
                assets: assets.len(),
                values: values.len(),
            });
        }
        let values = values
            .iter()
            .map(|raw| match attribute {
                UpdatableAttribute::CertificateStatus => {
                    Ok(raw.parse::<CertificateStatus>()?.as_str().to_string())
                }
                UpdatableAttribute::UserDescription => Ok(raw.clone()),
            })
            .collect::<CatalogResult<Vec<String>>>()?;

        if assets.is_empty() {
            return Ok(UpdateOutcome::default());
        }

        let mut updates = Vec::with_capacity(assets.len());
        for (index, asset) in assets.iter().enumerate() {
            let value = if values.len() == 1 { &values[0] } else { &values[index] };
            updates.push(entity_update(asset, attribute, value.clone())?);
        }

        let requested: Vec<String> = updates.iter().map(|update| update.guid.clone()).collect();
        let response = self.catalog.bulk_update(updates).await?;

        let confirmed: HashSet<&str> = response.updated_guids.iter().map(String::as_str).collect();
        let missing: Vec<&str> = requested
            .iter()
            .map(String::as_str)
            .filter(|guid| !confirmed.contains(guid))
            .collect();
        let updated_count = requested.len() - missing.len();
        let errors = if missing.is_empty() {
            Vec::new()
        } else {
            vec![format!(
                "catalog did not confirm updates for: {}",
                missing.join(", ")
            )]
        };
        info!(
            attribute = attribute.as_str(),
            requested = requested.len(),
            updated_count,
            "dispatched attribute updates"
        );
        Ok(UpdateOutcome {
            updated_count,
            errors,
        })
    }
}

fn entity_update(asset: &AssetRef, attribute: UpdatableAttribute, value: String) -> CatalogResult<EntityUpdate> {
    for (field, content) in [
        ("guid", &asset.guid),
        ("type_name", &asset.type_name),
        ("qualified_name", &asset.qualified_name),
    ] {
        if content.trim().is_empty() {
            return Err(CatalogError::InvalidInput(format!(
                "asset reference is missing {field}"
            )));
        }
    }
    Ok(EntityUpdate {
        guid: asset.guid.clone(),
        type_name: asset.type_name.clone(),
        qualified_name: asset.qualified_name.clone(),
        name: asset.name.clone(),
        attributes: BTreeMap::from([(attribute.field().to_string(), AttributeValue::Text(value))]),
    })
}

impl<S: CatalogService> CatalogControlPlane<S> {
    /// Applies an attribute update and folds any failure into the outcome.
    pub async fn update_assets(
        &self,
        assets: &[AssetRef],
        attribute_name: &str,
        values: &[String],
    ) -> UpdateOutcome {
        match AttributeUpdateDispatcher::new(self.catalog())
            .apply(assets, attribute_name, values)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "attribute update failed");
                UpdateOutcome::failed(err.to_string())
            }
        }
    }
}
