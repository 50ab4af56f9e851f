use catalog_model::{SearchResponse, TagDef};
use catalog_model::schema::{DEFAULT_SEARCH_ATTRIBUTES, FIELD_GUID, FIELD_SCORE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::catalog::{CatalogService, IndexSearchRequest};
use crate::error::{CatalogError, CatalogResult};
use crate::query::{Clause, SearchFilters, SortOrder, SortSpec, compile, projected_attribute, resolve_field};

use super::CatalogControlPlane;

const DEFAULT_LIMIT: usize = 10;

/// Pagination, sorting, and projection for a compiled search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub include_attributes: Vec<String>,
    pub limit: usize,
    pub offset: usize,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_attributes: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort_by: None,
            sort_order: None,
        }
    }
}

impl SearchOptions {
    /// Sort keys with the deterministic identifier tie-break appended.
    ///
    /// # Errors
    /// Returns `InvalidFilter` for a sort order other than ASC or DESC.
    pub fn sort_specs(&self) -> CatalogResult<Vec<SortSpec>> {
        let order = match self.sort_order.as_deref().map(str::trim) {
            None | Some("") => SortOrder::Asc,
            Some(token) => SortOrder::parse(token).ok_or_else(|| {
                CatalogError::invalid_filter(format!(
                    "sort_order must be ASC or DESC, got {token}"
                ))
            })?,
        };
        let primary = match self.sort_by.as_deref().map(str::trim) {
            Some(field) if !field.is_empty() => SortSpec::new(resolve_field(field).keyword, order),
            _ => SortSpec::new(FIELD_SCORE, SortOrder::Desc),
        };
        let mut specs = vec![primary];
        if specs[0].field != FIELD_GUID {
            specs.push(SortSpec::new(FIELD_GUID, SortOrder::Asc));
        }
        Ok(specs)
    }

    /// Default attributes followed by caller selections, without duplicates.
    #[must_use]
    pub fn attributes(&self) -> Vec<String> {
        let mut attributes: Vec<String> = DEFAULT_SEARCH_ATTRIBUTES
            .iter()
            .map(ToString::to_string)
            .collect();
        for requested in &self.include_attributes {
            if requested.trim().is_empty() {
                continue;
            }
            let resolved = projected_attribute(requested);
            if !attributes.contains(&resolved) {
                attributes.push(resolved);
            }
        }
        attributes
    }
}

/// Issues a compiled clause tree as one index search.
pub struct QueryExecutor<'a, S> {
    catalog: &'a S,
    max_page_size: usize,
}

impl<'a, S: CatalogService> QueryExecutor<'a, S> {
    pub const fn new(catalog: &'a S, max_page_size: usize) -> Self {
        Self {
            catalog,
            max_page_size,
        }
    }

    /// Runs the search. `limit = 0` still queries the catalog for the total.
    ///
    /// # Errors
    /// Returns `PageSizeExceeded` above the maximum page size, `InvalidFilter`
    /// for a bad sort order, and `Upstream` for catalog failures.
    pub async fn execute(&self, query: &Clause, options: &SearchOptions) -> CatalogResult<SearchResponse> {
        if options.limit > self.max_page_size {
            return Err(CatalogError::PageSizeExceeded {
                requested: options.limit,
                max: self.max_page_size,
            });
        }
        let sort: Vec<Value> = options.sort_specs()?.iter().map(SortSpec::to_dsl).collect();
        let dsl = json!({
            "from": options.offset,
            "size": options.limit,
            "query": query.to_dsl(),
            "sort": sort,
            "track_total_hits": true,
        });
        debug!(dsl = %dsl, "index search");

        let response = self
            .catalog
            .index_search(IndexSearchRequest {
                dsl,
                attributes: options.attributes(),
            })
            .await?;
        Ok(SearchResponse {
            assets: response.assets,
            total_count: response.approximate_count,
        })
    }
}

/// Forwards a caller-authored DSL payload untouched.
pub struct RawQueryExecutor<'a, S> {
    catalog: &'a S,
}

impl<'a, S: CatalogService> RawQueryExecutor<'a, S> {
    pub const fn new(catalog: &'a S) -> Self {
        Self { catalog }
    }

    /// # Errors
    /// Returns `MalformedQuery` for unparseable or non-object payloads and
    /// `Upstream` for catalog failures.
    pub async fn execute(&self, payload: &Value) -> CatalogResult<SearchResponse> {
        let dsl = parse_raw_query(payload)?;
        debug!(dsl = %dsl, "raw index search");
        let response = self
            .catalog
            .index_search(IndexSearchRequest {
                dsl,
                attributes: DEFAULT_SEARCH_ATTRIBUTES
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            })
            .await?;
        Ok(SearchResponse {
            assets: response.assets,
            total_count: response.approximate_count,
        })
    }
}

/// Accepts a DSL object or a string containing one.
///
/// # Errors
/// Returns `MalformedQuery` with the parser message when the payload is not a JSON object.
pub fn parse_raw_query(payload: &Value) -> CatalogResult<Value> {
    let parsed = match payload {
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map_err(|err| CatalogError::MalformedQuery(err.to_string()))?,
        other => other.clone(),
    };
    if parsed.is_object() {
        Ok(parsed)
    } else {
        Err(CatalogError::MalformedQuery(
            "query must be a JSON object".to_string(),
        ))
    }
}

/// Maps tag display names to the internal names stored on assets.
///
/// Display names match exactly first, then ignoring case. An internal name
/// passes through unchanged. Blank entries are dropped.
///
/// # Errors
/// Returns `InvalidFilter` naming the first tag that matches no definition.
pub fn resolve_tag_names(tags: &[String], defs: &[TagDef]) -> CatalogResult<Vec<String>> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            defs.iter()
                .find(|def| def.display_name == tag)
                .or_else(|| defs.iter().find(|def| def.display_name.eq_ignore_ascii_case(tag)))
                .or_else(|| defs.iter().find(|def| def.name == tag))
                .map(|def| def.name.clone())
                .ok_or_else(|| CatalogError::invalid_filter(format!("unknown tag: {tag}")))
        })
        .collect()
}

impl<S: CatalogService> CatalogControlPlane<S> {
    /// Compiles structured filters and runs them as one search.
    ///
    /// # Errors
    /// Returns the compiler's validation errors, `PageSizeExceeded`, or `Upstream`.
    pub async fn search_assets(
        &self,
        filters: &SearchFilters,
        options: &SearchOptions,
    ) -> CatalogResult<SearchResponse> {
        let query = if filters.tags.iter().any(|tag| !tag.trim().is_empty()) {
            let defs = self.catalog().tag_defs().await?;
            let resolved = SearchFilters {
                tags: resolve_tag_names(&filters.tags, &defs)?,
                ..filters.clone()
            };
            compile(&resolved)?
        } else {
            compile(filters)?
        };
        QueryExecutor::new(self.catalog(), self.max_page_size())
            .execute(&query, options)
            .await
    }

    /// Runs a caller-authored DSL query.
    ///
    /// # Errors
    /// Returns `MalformedQuery` or `Upstream`.
    pub async fn search_by_dsl(&self, payload: &Value) -> CatalogResult<SearchResponse> {
        RawQueryExecutor::new(self.catalog()).execute(payload).await
    }
}
