use std::collections::BTreeMap;
use std::path::PathBuf;

use catalog_core::catalog::MemoryCatalog;
use catalog_core::control::SearchOptions;
use catalog_core::query::SearchFilters;
use catalog_core::services::CatalogHandle;
use catalog_core::CatalogError;
use catalog_model::SearchResponse;
use serde_json::json;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("catalog.json")
}

async fn build_handle() -> CatalogHandle<MemoryCatalog> {
    let catalog = MemoryCatalog::load(fixture_path())
        .await
        .unwrap_or_else(|err| panic!("failed to load catalog fixture: {err}"));
    CatalogHandle::from_catalog(catalog)
}

fn guids(response: &SearchResponse) -> Vec<&str> {
    response.assets.iter().map(|asset| asset.guid.as_str()).collect()
}

fn conditions(entries: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

#[tokio::test]
async fn verified_tables_come_back_in_tie_break_order() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        asset_type: Some("Table".to_string()),
        conditions: conditions(&[("certificate_status", json!("VERIFIED"))]),
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1", "t2"]);
    assert_eq!(response.total_count, Some(2));
}

#[tokio::test]
async fn limit_zero_returns_only_the_count() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        asset_type: Some("table".to_string()),
        ..SearchFilters::default()
    };
    let options = SearchOptions {
        limit: 0,
        ..SearchOptions::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &options)
        .await
        .expect("count-only search should succeed");
    assert!(response.assets.is_empty());
    assert_eq!(response.total_count, Some(3));
}

#[tokio::test]
async fn oversized_pages_fail_before_calling_the_catalog() {
    let handle = build_handle().await.with_max_page_size(50);
    let options = SearchOptions {
        limit: 51,
        ..SearchOptions::default()
    };
    let err = handle
        .control()
        .search_assets(&SearchFilters::default(), &options)
        .await
        .unwrap_err();
    assert_eq!(err, CatalogError::PageSizeExceeded { requested: 51, max: 50 });
    assert_eq!(handle.catalog().request_count(), 0);
}

#[tokio::test]
async fn negative_has_any_value_finds_undocumented_assets() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        asset_type: Some("Table".to_string()),
        negative_conditions: conditions(&[("description", json!("has_any_value"))]),
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t2", "t3"]);
}

#[tokio::test]
async fn archived_assets_need_an_explicit_opt_in() {
    let handle = build_handle().await;
    let mut filters = SearchFilters {
        conditions: conditions(&[("name", json!("legacy_orders"))]),
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert!(response.assets.is_empty());

    filters.include_archived = true;
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t4"]);
}

#[tokio::test]
async fn match_conditions_rank_by_relevance() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        some_conditions: conditions(&[
            ("name", json!({ "operator": "match", "value": "orders" })),
            ("description", json!({ "operator": "match", "value": "orders online" })),
        ]),
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1", "t3"]);
    let first = response.assets[0].score.expect("score");
    let second = response.assets[1].score.expect("score");
    assert!(first > second);
}

#[tokio::test]
async fn min_somes_requires_that_many_matches() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        asset_type: Some("Table".to_string()),
        some_conditions: conditions(&[
            ("certificate_status", json!("VERIFIED")),
            ("owner_users", json!("has_any_value")),
            ("user_description", json!("has_any_value")),
        ]),
        min_somes: 2,
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1", "t2"]);
}

#[tokio::test]
async fn connection_tags_and_dates_narrow_results() {
    let handle = build_handle().await;
    let control = handle.control();

    let by_connection = SearchFilters {
        connection_qualified_name: Some("default/postgres".to_string()),
        ..SearchFilters::default()
    };
    let response = control
        .search_assets(&by_connection, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t3"]);

    let direct_tags = SearchFilters {
        tags: vec!["PII".to_string()],
        ..SearchFilters::default()
    };
    let response = control
        .search_assets(&direct_tags, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1"]);

    let propagated = SearchFilters {
        directly_tagged: false,
        ..direct_tags
    };
    let response = control
        .search_assets(&propagated, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1", "t2"]);

    let created_2023 = SearchFilters {
        date_range: conditions(&[(
            "create_time",
            json!({ "gte": "2023-01-01T00:00:00Z", "lte": "2023-12-31" }),
        )]),
        ..SearchFilters::default()
    };
    let response = control
        .search_assets(&created_2023, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t2", "t3"]);
}

#[tokio::test]
async fn explicit_sort_and_pagination_are_stable() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        asset_type: Some("Table".to_string()),
        ..SearchFilters::default()
    };
    let page = |offset| SearchOptions {
        limit: 2,
        offset,
        sort_by: Some("name".to_string()),
        sort_order: Some("desc".to_string()),
        ..SearchOptions::default()
    };
    let first = handle
        .control()
        .search_assets(&filters, &page(0))
        .await
        .expect("first page");
    let second = handle
        .control()
        .search_assets(&filters, &page(2))
        .await
        .expect("second page");
    assert_eq!(guids(&first), ["t3", "t1"]);
    assert_eq!(guids(&second), ["t2"]);
}

#[tokio::test]
async fn projection_keeps_defaults_and_requested_attributes() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        guids: vec!["t1".to_string()],
        ..SearchFilters::default()
    };
    let options = SearchOptions {
        include_attributes: vec!["owner_users".to_string()],
        ..SearchOptions::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &options)
        .await
        .expect("search should succeed");
    let asset = &response.assets[0];
    assert_eq!(asset.name(), Some("orders"));
    assert!(asset.attribute("ownerUsers").is_some());
    assert!(asset.attribute("createTime").is_none());
}

#[tokio::test]
async fn invalid_filters_are_rejected_locally() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        conditions: conditions(&[("name", json!({ "operator": "near", "value": "x" }))]),
        ..SearchFilters::default()
    };
    let err = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidFilterError");

    let filters = SearchFilters {
        asset_type: Some("Spreadsheet".to_string()),
        ..SearchFilters::default()
    };
    let err = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "UnknownAssetTypeError");
    assert_eq!(handle.catalog().request_count(), 0);
}

#[tokio::test]
async fn raw_dsl_strings_are_forwarded() {
    let handle = build_handle().await;
    let payload = json!(
        r#"{"size": 5, "query": {"bool": {"filter": [{"term": {"__typeName.keyword": "View"}}]}}}"#
    );
    let response = handle
        .control()
        .search_by_dsl(&payload)
        .await
        .expect("raw search should succeed");
    assert_eq!(guids(&response), ["v1"]);

    let err = handle
        .control()
        .search_by_dsl(&json!("{\"query\": "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "MalformedQueryError");
    assert_eq!(handle.catalog().request_count(), 1);
}

#[tokio::test]
async fn condition_lists_match_any_listed_value() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        asset_type: Some("Table".to_string()),
        conditions: conditions(&[("certificate_status", json!(["VERIFIED", "DRAFT"]))]),
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1", "t2", "t3"]);

    let filters = SearchFilters {
        asset_type: Some("Table".to_string()),
        negative_conditions: conditions(&[("certificate_status", json!(["DRAFT", "DEPRECATED"]))]),
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1", "t2"]);
}

#[tokio::test]
async fn tag_filters_resolve_display_names_before_searching() {
    let handle = build_handle().await;
    let filters = SearchFilters {
        tags: vec!["pii".to_string(), "Finance".to_string()],
        directly_tagged: false,
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&filters, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1", "t2"]);
    assert_eq!(handle.catalog().request_count(), 2);

    let by_internal_name = SearchFilters {
        tags: vec!["x7Pii3Kq".to_string()],
        ..SearchFilters::default()
    };
    let response = handle
        .control()
        .search_assets(&by_internal_name, &SearchOptions::default())
        .await
        .expect("search should succeed");
    assert_eq!(guids(&response), ["t1"]);

    let unknown = SearchFilters {
        tags: vec!["Restricted".to_string()],
        ..SearchFilters::default()
    };
    let err = handle
        .control()
        .search_assets(&unknown, &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidFilter(_)));
    assert!(err.to_string().contains("Restricted"));
    assert_eq!(handle.catalog().request_count(), 5);
}
