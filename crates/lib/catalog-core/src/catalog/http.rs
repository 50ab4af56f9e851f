use std::collections::BTreeMap;
use std::time::Duration;

use catalog_model::schema::{
    ATTR_DESCRIPTION,
    ATTR_DISPLAY_NAME,
    ATTR_NAME,
    ATTR_QUALIFIED_NAME,
    DEFAULT_SEARCH_ATTRIBUTES,
    FIELD_TYPE_NAME,
    TYPE_BADGE,
};
use catalog_model::{
    Asset,
    AttributeValue,
    Badge,
    BadgeColor,
    BadgeCondition,
    BadgeOperator,
    CustomMetadataDef,
    TagDef,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::query::{BoolClause, Clause};

use super::{
    BulkUpdateResponse,
    CatalogService,
    EntityUpdate,
    IndexSearchRequest,
    IndexSearchResponse,
    LineageFrontierRequest,
};

const INDEX_SEARCH_PATH: &str = "/api/meta/search/indexsearch";
const LINEAGE_LIST_PATH: &str = "/api/meta/lineage/list";
const ENTITY_BULK_PATH: &str = "/api/meta/entity/bulk";
const TYPEDEFS_PATH: &str = "/api/meta/types/typedefs";

const BADGE_METADATA_ATTRIBUTE: &str = "badgeMetadataAttribute";
const BADGE_CONDITIONS: &str = "badgeConditions";
const ASSET_EMOJI: &str = "assetEmoji";
const ASSET_ICON_URL: &str = "assetIconUrl";

/// Connection settings for a remote catalog.
#[derive(Debug, Clone)]
pub struct HttpCatalogConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl HttpCatalogConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Catalog client speaking the metadata service's REST API.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpCatalog {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty base URL or key, and `Upstream` if
    /// the HTTP client cannot be constructed.
    pub fn new(config: HttpCatalogConfig) -> CatalogResult<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CatalogError::InvalidInput("catalog base URL is required".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(CatalogError::InvalidInput("catalog API key is required".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("catalog-mcp/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> CatalogResult<T> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let response = check_status(path, response).await?;
        Ok(response.json().await?)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> CatalogResult<T> {
        debug!(path, "catalog POST");
        self.send(path, self.client.post(self.url(path)).json(body)).await
    }

    async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> CatalogResult<T> {
        debug!(path, "catalog PUT");
        self.send(path, self.client.put(self.url(path)).json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> CatalogResult<T> {
        debug!(path, "catalog GET");
        self.send(path, self.client.get(self.url(path)).query(query)).await
    }

    async fn business_metadata_defs(&self) -> CatalogResult<Vec<CustomMetadataDef>> {
        let defs: TypeDefsEnvelope = self
            .get(TYPEDEFS_PATH, &[("type", "business_metadata")])
            .await?;
        Ok(defs.business_metadata_defs)
    }

    async fn write_typedef(&self, definition: CustomMetadataDef, create: bool) -> CatalogResult<CustomMetadataDef> {
        let display_name = definition.display_name.clone();
        let body = json!({ "businessMetadataDefs": [definition] });
        let envelope: TypeDefsEnvelope = if create {
            self.post(TYPEDEFS_PATH, &body).await?
        } else {
            self.put(TYPEDEFS_PATH, &body).await?
        };
        envelope
            .business_metadata_defs
            .into_iter()
            .next()
            .ok_or_else(|| {
                CatalogError::upstream(format!(
                    "catalog returned no definition for {display_name}"
                ))
            })
    }
}

async fn check_status(path: &str, response: Response) -> CatalogResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CatalogError::upstream(format!(
        "{path} returned {status}: {}",
        body.trim()
    )))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchEnvelope {
    #[serde(default)]
    entities: Vec<Asset>,
    #[serde(default)]
    approximate_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeDefsEnvelope {
    #[serde(default)]
    business_metadata_defs: Vec<CustomMetadataDef>,
    #[serde(default)]
    classification_defs: Vec<TagDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationEnvelope {
    #[serde(default)]
    mutated_entities: BTreeMap<String, Vec<MutatedEntity>>,
}

#[derive(Debug, Deserialize)]
struct MutatedEntity {
    guid: String,
}

impl MutationEnvelope {
    fn guids(self, kinds: &[&str]) -> Vec<String> {
        self.mutated_entities
            .into_iter()
            .filter(|(kind, _)| kinds.contains(&kind.as_str()))
            .flat_map(|(_, entities)| entities)
            .map(|entity| entity.guid)
            .collect()
    }
}

fn entity_body(update: &EntityUpdate) -> Value {
    let mut attributes = update.attributes.clone();
    attributes.insert(
        ATTR_QUALIFIED_NAME.to_string(),
        AttributeValue::from(update.qualified_name.as_str()),
    );
    if let Some(name) = &update.name {
        attributes.insert(ATTR_NAME.to_string(), AttributeValue::from(name.as_str()));
    }
    json!({
        "typeName": update.type_name,
        "guid": update.guid,
        "attributes": attributes,
    })
}

fn badge_entity(badge: &Badge) -> Value {
    let conditions: Vec<Value> = badge
        .conditions
        .iter()
        .map(|condition| {
            json!({
                "badgeConditionOperator": condition.operator.as_str(),
                "badgeConditionValue": condition.value,
                "badgeConditionColorhex": condition.color.hex(),
            })
        })
        .collect();
    let mut attributes = json!({
        ATTR_NAME: badge.name,
        ATTR_QUALIFIED_NAME: format!("badges/global/{}.{}", badge.metadata_name, badge.attribute_name),
        BADGE_METADATA_ATTRIBUTE: format!("{}.{}", badge.metadata_name, badge.attribute_name),
        BADGE_CONDITIONS: conditions,
    });
    for (key, value) in [
        (ATTR_DISPLAY_NAME, &badge.display_name),
        (ATTR_DESCRIPTION, &badge.description),
        (ASSET_EMOJI, &badge.emoji),
        (ASSET_ICON_URL, &badge.logo_url),
    ] {
        if let Some(value) = value {
            attributes[key] = json!(value);
        }
    }
    let mut entity = json!({ "typeName": TYPE_BADGE, "attributes": attributes });
    if let Some(guid) = &badge.guid {
        entity["guid"] = json!(guid);
    }
    entity
}

fn badge_from_asset(asset: &Asset) -> Option<Badge> {
    let text = |key: &str| {
        asset
            .attribute(key)
            .and_then(AttributeValue::as_str)
            .map(ToString::to_string)
    };
    let target = text(BADGE_METADATA_ATTRIBUTE)?;
    let (metadata_name, attribute_name) = target.split_once('.')?;
    let conditions = asset
        .attribute(BADGE_CONDITIONS)
        .and_then(AttributeValue::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(badge_condition_from_value)
        .collect();
    Some(Badge {
        guid: Some(asset.guid.clone()),
        name: text(ATTR_NAME)?,
        metadata_name: metadata_name.to_string(),
        attribute_name: attribute_name.to_string(),
        display_name: text(ATTR_DISPLAY_NAME),
        description: text(ATTR_DESCRIPTION),
        emoji: text(ASSET_EMOJI),
        logo_url: text(ASSET_ICON_URL),
        conditions,
    })
}

fn badge_condition_from_value(value: &AttributeValue) -> Option<BadgeCondition> {
    let AttributeValue::Map(fields) = value else {
        return None;
    };
    let operator: BadgeOperator = fields.get("badgeConditionOperator")?.as_str()?.parse().ok()?;
    let hex = fields.get("badgeConditionColorhex")?.as_str()?;
    let color = [BadgeColor::Green, BadgeColor::Yellow, BadgeColor::Red]
        .into_iter()
        .find(|color| color.hex().eq_ignore_ascii_case(hex))?;
    Some(BadgeCondition {
        operator,
        value: fields.get("badgeConditionValue")?.as_str()?.to_string(),
        color,
    })
}

impl CatalogService for HttpCatalog {
    async fn index_search(&self, request: IndexSearchRequest) -> CatalogResult<IndexSearchResponse> {
        let body = json!({
            "dsl": request.dsl,
            "attributes": request.attributes,
            "suppressLogs": true,
            "showSearchScore": true,
        });
        let envelope: SearchEnvelope = self.post(INDEX_SEARCH_PATH, &body).await?;
        Ok(IndexSearchResponse {
            assets: envelope.entities,
            approximate_count: envelope.approximate_count,
        })
    }

    async fn lineage_frontier(&self, request: LineageFrontierRequest) -> CatalogResult<Vec<Asset>> {
        let body = json!({
            "guid": request.guid,
            "size": request.size,
            "from": 0,
            "depth": 1,
            "direction": request.direction.as_str(),
            "immediateNeighbors": true,
            "attributes": DEFAULT_SEARCH_ATTRIBUTES,
            "excludeMeanings": true,
            "excludeClassifications": false,
        });
        let envelope: SearchEnvelope = self.post(LINEAGE_LIST_PATH, &body).await?;
        Ok(envelope.entities)
    }

    async fn bulk_update(&self, updates: Vec<EntityUpdate>) -> CatalogResult<BulkUpdateResponse> {
        let entities: Vec<Value> = updates.iter().map(entity_body).collect();
        let envelope: MutationEnvelope = self
            .post(ENTITY_BULK_PATH, &json!({ "entities": entities }))
            .await?;
        Ok(BulkUpdateResponse {
            updated_guids: envelope.guids(&["UPDATE", "PARTIAL_UPDATE"]),
        })
    }

    async fn custom_metadata(&self, display_name: &str) -> CatalogResult<Option<CustomMetadataDef>> {
        Ok(self
            .business_metadata_defs()
            .await?
            .into_iter()
            .find(|def| def.display_name == display_name))
    }

    async fn create_custom_metadata(&self, definition: CustomMetadataDef) -> CatalogResult<CustomMetadataDef> {
        self.write_typedef(definition, true).await
    }

    async fn update_custom_metadata(&self, definition: CustomMetadataDef) -> CatalogResult<CustomMetadataDef> {
        self.write_typedef(definition, false).await
    }

    async fn badge(&self, name: &str) -> CatalogResult<Option<Badge>> {
        let query = Clause::Bool(BoolClause {
            must: vec![
                Clause::term(FIELD_TYPE_NAME, TYPE_BADGE),
                Clause::term("name.keyword", name),
            ],
            ..BoolClause::default()
        });
        let attributes = [
            ATTR_NAME,
            ATTR_DISPLAY_NAME,
            ATTR_DESCRIPTION,
            BADGE_METADATA_ATTRIBUTE,
            BADGE_CONDITIONS,
            ASSET_EMOJI,
            ASSET_ICON_URL,
        ];
        let response = self
            .index_search(IndexSearchRequest {
                dsl: json!({ "from": 0, "size": 1, "query": query.to_dsl() }),
                attributes: attributes.iter().map(ToString::to_string).collect(),
            })
            .await?;
        Ok(response.assets.first().and_then(badge_from_asset))
    }

    async fn save_badge(&self, badge: Badge) -> CatalogResult<Badge> {
        let envelope: MutationEnvelope = self
            .post(ENTITY_BULK_PATH, &json!({ "entities": [badge_entity(&badge)] }))
            .await?;
        let guid = envelope
            .guids(&["CREATE", "UPDATE", "PARTIAL_UPDATE"])
            .into_iter()
            .next()
            .or_else(|| badge.guid.clone())
            .ok_or_else(|| CatalogError::upstream(format!("catalog did not persist badge {}", badge.name)))?;
        Ok(Badge {
            guid: Some(guid),
            ..badge
        })
    }

    async fn delete_badge(&self, guid: &str) -> CatalogResult<bool> {
        let path = format!("/api/meta/entity/guid/{guid}");
        debug!(path = %path, "catalog DELETE");
        let response = self
            .client
            .delete(self.url(&path))
            .query(&[("deleteType", "HARD")])
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(&path, response).await?;
        Ok(true)
    }

    async fn tag_defs(&self) -> CatalogResult<Vec<TagDef>> {
        let defs: TypeDefsEnvelope = self.get(TYPEDEFS_PATH, &[("type", "classification")]).await?;
        Ok(defs.classification_defs)
    }

    fn backend(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_badge() -> Badge {
        Badge {
            guid: None,
            name: "quality".to_string(),
            metadata_name: "Data Quality".to_string(),
            attribute_name: "Score".to_string(),
            display_name: Some("Quality".to_string()),
            description: None,
            emoji: None,
            logo_url: None,
            conditions: vec![BadgeCondition {
                operator: BadgeOperator::Gte,
                value: "80".to_string(),
                color: BadgeColor::Green,
            }],
        }
    }

    #[test]
    fn rejects_missing_connection_settings() {
        let err = HttpCatalog::new(HttpCatalogConfig::new("  ", "key")).unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
        let err = HttpCatalog::new(HttpCatalogConfig::new("https://x", "")).unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
    }

    #[test]
    fn normalizes_base_url() {
        let catalog = HttpCatalog::new(HttpCatalogConfig::new("https://tenant.example/", "key"))
            .expect("client");
        assert_eq!(catalog.base_url(), "https://tenant.example");
        assert_eq!(catalog.url(INDEX_SEARCH_PATH), "https://tenant.example/api/meta/search/indexsearch");
    }

    #[test]
    fn entity_body_carries_identity_attributes() {
        let update = EntityUpdate {
            guid: "g-1".to_string(),
            type_name: "Table".to_string(),
            qualified_name: "db/sch/orders".to_string(),
            name: Some("orders".to_string()),
            attributes: BTreeMap::from([(
                "certificateStatus".to_string(),
                AttributeValue::from("VERIFIED"),
            )]),
        };
        let body = entity_body(&update);
        assert_eq!(body["typeName"], "Table");
        assert_eq!(body["attributes"]["qualifiedName"], "db/sch/orders");
        assert_eq!(body["attributes"]["certificateStatus"], "VERIFIED");
    }

    #[test]
    fn badge_entities_round_trip_through_assets() {
        let badge = sample_badge();
        let entity = badge_entity(&badge);
        let asset: Asset = serde_json::from_value(json!({
            "guid": "b-1",
            "typeName": TYPE_BADGE,
            "attributes": entity["attributes"].clone(),
        }))
        .expect("asset");
        let restored = badge_from_asset(&asset).expect("badge");
        assert_eq!(restored.guid.as_deref(), Some("b-1"));
        assert_eq!(restored.metadata_name, "Data Quality");
        assert_eq!(restored.conditions, badge.conditions);
    }

    #[test]
    fn mutation_envelope_filters_by_kind() {
        let envelope: MutationEnvelope = serde_json::from_value(json!({
            "mutatedEntities": {
                "UPDATE": [{ "guid": "a" }],
                "CREATE": [{ "guid": "b" }]
            }
        }))
        .expect("envelope");
        assert_eq!(envelope.guids(&["UPDATE"]), vec!["a".to_string()]);
    }

    #[test]
    fn typedef_envelope_reads_classification_names() {
        let envelope: TypeDefsEnvelope = serde_json::from_value(json!({
            "classificationDefs": [
                { "name": "x7Pii3Kq", "displayName": "PII", "category": "CLASSIFICATION" }
            ]
        }))
        .expect("envelope");
        assert!(envelope.business_metadata_defs.is_empty());
        assert_eq!(
            envelope.classification_defs,
            vec![TagDef {
                name: "x7Pii3Kq".to_string(),
                display_name: "PII".to_string(),
            }]
        );
    }
}
