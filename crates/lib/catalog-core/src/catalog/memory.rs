use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use catalog_model::schema::FIELD_SCORE;
use catalog_model::{Asset, AttributeValue, Badge, CustomMetadataDef, LineageDirection, TagDef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::query::{Clause, RangeClause, SortOrder, SortSpec, entity_attribute};

use super::{
    BulkUpdateResponse,
    CatalogService,
    EntityUpdate,
    IndexSearchRequest,
    IndexSearchResponse,
    LineageFrontierRequest,
};

const DEFAULT_PAGE: usize = 10;

/// Directed lineage edge: data flows from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureEdge {
    pub source: String,
    pub target: String,
}

impl FixtureEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Seed data for a `MemoryCatalog`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFixture {
    pub assets: Vec<Asset>,
    pub lineage: Vec<FixtureEdge>,
    pub custom_metadata: Vec<CustomMetadataDef>,
    pub badges: Vec<Badge>,
    pub tags: Vec<TagDef>,
}

/// In-process catalog that evaluates index queries against fixture data.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: RwLock<CatalogFixture>,
    requests: AtomicUsize,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(fixture: CatalogFixture) -> Self {
        Self {
            state: RwLock::new(fixture),
            requests: AtomicUsize::new(0),
        }
    }

    /// Parses a JSON fixture.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the JSON does not describe a fixture.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let fixture: CatalogFixture = serde_json::from_str(json)
            .map_err(|err| CatalogError::InvalidInput(format!("invalid catalog fixture: {err}")))?;
        Ok(Self::new(fixture))
    }

    /// Reads and parses a JSON fixture file.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|err| {
            CatalogError::InvalidInput(format!("failed to read fixture {}: {err}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Number of catalog calls served so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    pub async fn asset(&self, guid: &str) -> Option<Asset> {
        self.state
            .read()
            .await
            .assets
            .iter()
            .find(|asset| asset.guid == guid)
            .cloned()
    }

    fn record(&self, operation: &'static str) {
        let count = self.requests.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        debug!(operation, count, "memory catalog call");
    }
}

impl CatalogService for MemoryCatalog {
    async fn index_search(&self, request: IndexSearchRequest) -> CatalogResult<IndexSearchResponse> {
        self.record("index_search");
        let body = SearchBody::parse(&request.dsl)?;
        let state = self.state.read().await;

        let mut hits: Vec<(f64, &Asset)> = state
            .assets
            .iter()
            .filter_map(|asset| evaluate(&body.query, asset).map(|score| (score, asset)))
            .collect();
        let total = hits.len();
        hits.sort_by(|left, right| compare_hits(*left, *right, &body.sort));

        let assets = hits
            .into_iter()
            .skip(body.from)
            .take(body.size)
            .map(|(score, asset)| project(asset, score, &request.attributes))
            .collect();
        Ok(IndexSearchResponse {
            assets,
            approximate_count: u64::try_from(total).ok(),
        })
    }

    async fn lineage_frontier(&self, request: LineageFrontierRequest) -> CatalogResult<Vec<Asset>> {
        self.record("lineage_frontier");
        let state = self.state.read().await;
        if !state.assets.iter().any(|asset| asset.guid == request.guid) {
            return Err(CatalogError::NotFound(format!("asset {}", request.guid)));
        }
        let neighbours = state
            .lineage
            .iter()
            .filter_map(|edge| match request.direction {
                LineageDirection::Downstream if edge.source == request.guid => Some(&edge.target),
                LineageDirection::Upstream if edge.target == request.guid => Some(&edge.source),
                _ => None,
            })
            .filter_map(|guid| state.assets.iter().find(|asset| &asset.guid == guid))
            .take(request.size)
            .cloned()
            .collect();
        Ok(neighbours)
    }

    async fn bulk_update(&self, updates: Vec<EntityUpdate>) -> CatalogResult<BulkUpdateResponse> {
        self.record("bulk_update");
        let mut state = self.state.write().await;
        let mut updated_guids = Vec::with_capacity(updates.len());
        for update in updates {
            let Some(asset) = state
                .assets
                .iter_mut()
                .find(|asset| asset.guid == update.guid && asset.type_name == update.type_name)
            else {
                continue;
            };
            asset.attributes.extend(update.attributes);
            updated_guids.push(update.guid);
        }
        Ok(BulkUpdateResponse { updated_guids })
    }

    async fn custom_metadata(&self, display_name: &str) -> CatalogResult<Option<CustomMetadataDef>> {
        self.record("custom_metadata");
        Ok(self
            .state
            .read()
            .await
            .custom_metadata
            .iter()
            .find(|def| def.display_name == display_name)
            .cloned())
    }

    async fn create_custom_metadata(&self, mut definition: CustomMetadataDef) -> CatalogResult<CustomMetadataDef> {
        self.record("create_custom_metadata");
        let mut state = self.state.write().await;
        if state
            .custom_metadata
            .iter()
            .any(|def| def.display_name == definition.display_name)
        {
            return Err(CatalogError::upstream(format!(
                "custom metadata {} already exists",
                definition.display_name
            )));
        }
        definition.guid = Some(Uuid::new_v4().to_string());
        assign_internal_names(&mut definition);
        state.custom_metadata.push(definition.clone());
        Ok(definition)
    }

    async fn update_custom_metadata(&self, mut definition: CustomMetadataDef) -> CatalogResult<CustomMetadataDef> {
        self.record("update_custom_metadata");
        let mut state = self.state.write().await;
        let existing = state
            .custom_metadata
            .iter_mut()
            .find(|def| match (&def.guid, &definition.guid) {
                (Some(current), Some(requested)) => current == requested,
                _ => def.display_name == definition.display_name,
            })
            .ok_or_else(|| {
                CatalogError::NotFound(format!("custom metadata {}", definition.display_name))
            })?;
        assign_internal_names(&mut definition);
        definition.guid.clone_from(&existing.guid);
        *existing = definition.clone();
        Ok(definition)
    }

    async fn badge(&self, name: &str) -> CatalogResult<Option<Badge>> {
        self.record("badge");
        Ok(self
            .state
            .read()
            .await
            .badges
            .iter()
            .find(|badge| badge.name == name)
            .cloned())
    }

    async fn save_badge(&self, mut badge: Badge) -> CatalogResult<Badge> {
        self.record("save_badge");
        let mut state = self.state.write().await;
        let position = state.badges.iter().position(|existing| match &badge.guid {
            Some(guid) => existing.guid.as_ref() == Some(guid),
            None => existing.name == badge.name,
        });
        if let Some(index) = position {
            badge.guid.clone_from(&state.badges[index].guid);
            state.badges[index] = badge.clone();
        } else {
            badge.guid = Some(Uuid::new_v4().to_string());
            state.badges.push(badge.clone());
        }
        Ok(badge)
    }

    async fn delete_badge(&self, guid: &str) -> CatalogResult<bool> {
        self.record("delete_badge");
        let mut state = self.state.write().await;
        let before = state.badges.len();
        state.badges.retain(|badge| badge.guid.as_deref() != Some(guid));
        Ok(state.badges.len() != before)
    }

    async fn tag_defs(&self) -> CatalogResult<Vec<TagDef>> {
        self.record("tag_defs");
        Ok(self.state.read().await.tags.clone())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

fn assign_internal_names(definition: &mut CustomMetadataDef) {
    if definition.name.is_none() {
        definition.name = Some(Uuid::new_v4().simple().to_string());
    }
    for attribute in &mut definition.attribute_defs {
        if attribute.name.is_none() {
            attribute.name = Some(Uuid::new_v4().simple().to_string());
        }
    }
}

struct SearchBody {
    query: Clause,
    from: usize,
    size: usize,
    sort: Vec<SortSpec>,
}

impl SearchBody {
    fn parse(dsl: &Value) -> CatalogResult<Self> {
        let reject = |message: String| CatalogError::upstream(format!("index search rejected: {message}"));
        let object = dsl
            .as_object()
            .ok_or_else(|| reject("request body must be an object".to_string()))?;
        let query = object
            .get("query")
            .map(Clause::from_dsl)
            .transpose()
            .map_err(|err| reject(err.to_string()))?
            .unwrap_or(Clause::MatchAll);
        let count = |key: &str, default: usize| -> CatalogResult<usize> {
            object.get(key).map_or(Ok(default), |value| {
                value
                    .as_u64()
                    .and_then(|raw| usize::try_from(raw).ok())
                    .ok_or_else(|| reject(format!("{key} must be a non-negative integer")))
            })
        };
        let sort = match object.get("sort") {
            None => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(SortSpec::from_dsl)
                .collect::<Result<_, _>>()
                .map_err(|err| reject(err.to_string()))?,
            Some(entry) => vec![SortSpec::from_dsl(entry).map_err(|err| reject(err.to_string()))?],
        };
        Ok(Self {
            query,
            from: count("from", 0)?,
            size: count("size", DEFAULT_PAGE)?,
            sort,
        })
    }
}

/// Returns the relevance score when the asset satisfies the clause.
fn evaluate(clause: &Clause, asset: &Asset) -> Option<f64> {
    let constant = |matched: bool| matched.then_some(0.0);
    match clause {
        Clause::MatchAll => Some(0.0),
        Clause::Term { field, value } => {
            constant(field_values(asset, field).iter().any(|item| value_eq(item, value)))
        }
        Clause::Terms { field, values } => constant(
            field_values(asset, field)
                .iter()
                .any(|item| values.iter().any(|value| value_eq(item, value))),
        ),
        Clause::Exists { field } => {
            constant(field_values(asset, field).iter().any(AttributeValue::is_present))
        }
        Clause::Match { field, text } => {
            let wanted = tokens(text);
            let matched = field_values(asset, field).iter().any(|item| {
                item.as_str()
                    .is_some_and(|value| tokens(value).iter().any(|token| wanted.contains(token)))
            });
            matched.then_some(1.0)
        }
        Clause::Prefix { field, value } => constant(
            field_values(asset, field)
                .iter()
                .any(|item| item.as_str().is_some_and(|text| text.starts_with(value.as_str()))),
        ),
        Clause::Range(range) => constant(
            field_values(asset, &range.field)
                .iter()
                .any(|item| in_range(item, range)),
        ),
        Clause::Bool(group) => {
            let mut score = 0.0;
            for clause in &group.must {
                score += evaluate(clause, asset)?;
            }
            if group
                .must_not
                .iter()
                .any(|clause| evaluate(clause, asset).is_some())
            {
                return None;
            }
            let mut matched = 0;
            for clause in &group.should {
                if let Some(partial) = evaluate(clause, asset) {
                    matched += 1;
                    score += partial;
                }
            }
            (matched >= group.effective_minimum_should_match()).then_some(score)
        }
    }
}

fn field_values(asset: &Asset, field: &str) -> Vec<AttributeValue> {
    let base = field
        .strip_suffix(".keyword")
        .or_else(|| field.strip_suffix(".text"))
        .unwrap_or(field);
    match base {
        "__guid" => vec![AttributeValue::from(asset.guid.as_str())],
        "__typeName" => vec![AttributeValue::from(asset.type_name.as_str())],
        "__state" => vec![AttributeValue::from(asset.status.as_str())],
        "__traitNames" => asset
            .classification_names
            .iter()
            .map(|tag| AttributeValue::from(tag.as_str()))
            .collect(),
        other => asset
            .attribute(entity_attribute(other))
            .map(flatten)
            .unwrap_or_default(),
    }
}

fn flatten(value: &AttributeValue) -> Vec<AttributeValue> {
    match value {
        AttributeValue::Null => Vec::new(),
        AttributeValue::List(items) => items
            .iter()
            .filter(|item| !matches!(item, AttributeValue::Null))
            .cloned()
            .collect(),
        other => vec![other.clone()],
    }
}

fn value_eq(item: &AttributeValue, value: &Value) -> bool {
    match (item, value) {
        (AttributeValue::Text(text), Value::String(wanted)) => text == wanted,
        (AttributeValue::Text(text), Value::Number(wanted)) => *text == wanted.to_string(),
        (AttributeValue::Bool(flag), Value::Bool(wanted)) => flag == wanted,
        (AttributeValue::Integer(_) | AttributeValue::Float(_), Value::Number(wanted)) => item
            .as_f64()
            .zip(wanted.as_f64())
            .is_some_and(|(left, right)| (left - right).abs() < f64::EPSILON),
        _ => false,
    }
}

fn compare_to_bound(item: &AttributeValue, bound: &Value) -> Option<Ordering> {
    match (item.as_f64(), bound.as_f64()) {
        (Some(left), Some(right)) => left.partial_cmp(&right),
        _ => match (item.as_str(), bound.as_str()) {
            (Some(left), Some(right)) => Some(left.cmp(right)),
            _ => None,
        },
    }
}

fn in_range(item: &AttributeValue, range: &RangeClause) -> bool {
    let check = |bound: &Option<Value>, accept: fn(Ordering) -> bool| {
        bound
            .as_ref()
            .is_none_or(|bound| compare_to_bound(item, bound).is_some_and(accept))
    };
    check(&range.gt, Ordering::is_gt)
        && check(&range.gte, Ordering::is_ge)
        && check(&range.lt, Ordering::is_lt)
        && check(&range.lte, Ordering::is_le)
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn compare_hits(left: (f64, &Asset), right: (f64, &Asset), sort: &[SortSpec]) -> Ordering {
    if sort.is_empty() {
        return right.0.total_cmp(&left.0);
    }
    for spec in sort {
        let ordering = if spec.field == FIELD_SCORE {
            directed(left.0.total_cmp(&right.0), spec.order)
        } else {
            let left_value = field_values(left.1, &spec.field).into_iter().next();
            let right_value = field_values(right.1, &spec.field).into_iter().next();
            match (left_value, right_value) {
                (Some(left_value), Some(right_value)) => {
                    directed(compare_values(&left_value, &right_value), spec.order)
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

const fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare_values(left: &AttributeValue, right: &AttributeValue) -> Ordering {
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        _ => match (left.as_str(), right.as_str()) {
            (Some(left), Some(right)) => left.cmp(right),
            _ => Ordering::Equal,
        },
    }
}

fn project(asset: &Asset, score: f64, attributes: &[String]) -> Asset {
    let mut projected = asset.clone();
    if !attributes.is_empty() {
        projected
            .attributes
            .retain(|name, _| attributes.iter().any(|wanted| wanted == name));
    }
    projected.score = Some(score);
    projected
}
