//! Catalog service seam and its HTTP and in-memory implementations.

use std::collections::BTreeMap;
use std::future::Future;

use catalog_model::{Asset, AttributeValue, Badge, CustomMetadataDef, LineageDirection, TagDef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogResult;

pub mod http;
pub mod memory;

pub use http::{HttpCatalog, HttpCatalogConfig};
pub use memory::{CatalogFixture, FixtureEdge, MemoryCatalog};

/// Index search request: a complete DSL body plus the attributes to project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSearchRequest {
    pub dsl: Value,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexSearchResponse {
    pub assets: Vec<Asset>,
    pub approximate_count: Option<u64>,
}

/// Request for the immediate lineage neighbours of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageFrontierRequest {
    pub guid: String,
    pub direction: LineageDirection,
    pub size: usize,
}

/// Attribute changes for one asset in a bulk update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub guid: String,
    pub type_name: String,
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkUpdateResponse {
    pub updated_guids: Vec<String>,
}

/// Remote metadata catalog operations.
///
/// Implementations must be shareable across concurrent tool calls. Every
/// method maps transport or service failures to `CatalogError::Upstream`.
pub trait CatalogService: Send + Sync {
    fn index_search(
        &self,
        request: IndexSearchRequest,
    ) -> impl Future<Output = CatalogResult<IndexSearchResponse>> + Send;

    /// Returns up to `size` assets one hop away in `direction`.
    fn lineage_frontier(
        &self,
        request: LineageFrontierRequest,
    ) -> impl Future<Output = CatalogResult<Vec<Asset>>> + Send;

    fn bulk_update(
        &self,
        updates: Vec<EntityUpdate>,
    ) -> impl Future<Output = CatalogResult<BulkUpdateResponse>> + Send;

    /// Looks up a custom metadata definition by display name.
    fn custom_metadata(
        &self,
        display_name: &str,
    ) -> impl Future<Output = CatalogResult<Option<CustomMetadataDef>>> + Send;

    fn create_custom_metadata(
        &self,
        definition: CustomMetadataDef,
    ) -> impl Future<Output = CatalogResult<CustomMetadataDef>> + Send;

    fn update_custom_metadata(
        &self,
        definition: CustomMetadataDef,
    ) -> impl Future<Output = CatalogResult<CustomMetadataDef>> + Send;

    fn badge(&self, name: &str) -> impl Future<Output = CatalogResult<Option<Badge>>> + Send;

    /// Creates or replaces a badge, returning it with its guid.
    fn save_badge(&self, badge: Badge) -> impl Future<Output = CatalogResult<Badge>> + Send;

    /// Deletes a badge; `false` when no badge has the guid.
    fn delete_badge(&self, guid: &str) -> impl Future<Output = CatalogResult<bool>> + Send;

    /// Lists tag definitions so display names can be mapped to the internal
    /// names stored on assets.
    fn tag_defs(&self) -> impl Future<Output = CatalogResult<Vec<TagDef>>> + Send;

    /// Short backend label reported by health checks.
    fn backend(&self) -> &'static str;
}
