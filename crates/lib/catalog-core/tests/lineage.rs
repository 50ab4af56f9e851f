use std::path::PathBuf;

use catalog_core::catalog::MemoryCatalog;
use catalog_core::control::LineageRequest;
use catalog_core::services::CatalogHandle;
use catalog_model::{LineageCompletion, LineageResult, StopReason};

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

fn request(
    guid: &str,
    direction: &str,
    depth: Option<i64>,
    size: Option<i64>,
    immediate_neighbors: bool,
) -> LineageRequest {
    LineageRequest::parse(guid, direction, depth, size, Some(immediate_neighbors))
        .unwrap_or_else(|err| panic!("invalid lineage request: {err}"))
}

fn node_guids(result: &LineageResult) -> Vec<&str> {
    result
        .nodes
        .iter()
        .map(|node| node.asset.guid.as_str())
        .collect()
}

fn edge_pairs(result: &LineageResult) -> Vec<(&str, &str)> {
    result
        .edges
        .iter()
        .map(|edge| (edge.source_guid.as_str(), edge.target_guid.as_str()))
        .collect()
}

#[tokio::test]
async fn cycles_visit_each_node_once() {
    let handle = build_handle().await;
    let result = handle
        .control()
        .traverse_lineage(&request("l-a", "DOWNSTREAM", Some(1_000_000), Some(10), false))
        .await
        .expect("traversal should succeed");

    assert_eq!(node_guids(&result), ["l-b", "l-c", "l-a"]);
    assert_eq!(
        edge_pairs(&result),
        [("l-a", "l-b"), ("l-b", "l-c"), ("l-c", "l-a")]
    );
    assert_eq!(result.completion, LineageCompletion::Exhausted);
    assert_eq!(handle.catalog().request_count(), 3);
}

#[tokio::test]
async fn immediate_neighbors_stop_after_one_hop() {
    let handle = build_handle().await;
    let result = handle
        .control()
        .traverse_lineage(&request("hub", "downstream", None, Some(10), true))
        .await
        .expect("traversal should succeed");

    assert_eq!(node_guids(&result), ["h1", "h2", "h3", "h4"]);
    assert!(result.nodes.iter().all(|node| node.depth == 1));
    assert_eq!(
        result.completion,
        LineageCompletion::BoundedStop {
            reason: StopReason::ImmediateNeighbors
        }
    );
    assert_eq!(handle.catalog().request_count(), 1);
}

#[tokio::test]
async fn size_limit_keeps_the_edge_to_the_dropped_node() {
    let handle = build_handle().await;
    let result = handle
        .control()
        .traverse_lineage(&request("hub", "DOWNSTREAM", None, Some(2), false))
        .await
        .expect("traversal should succeed");

    assert_eq!(node_guids(&result), ["h1", "h2"]);
    assert_eq!(
        edge_pairs(&result),
        [("hub", "h1"), ("hub", "h2"), ("hub", "h3")]
    );
    assert!(!result.contains_node("h3"));
    assert_eq!(
        result.completion,
        LineageCompletion::BoundedStop {
            reason: StopReason::SizeLimit
        }
    );
}

#[tokio::test]
async fn depth_limit_bounds_the_walk() {
    let handle = build_handle().await;
    let result = handle
        .control()
        .traverse_lineage(&request("x", "DOWNSTREAM", Some(1), Some(10), false))
        .await
        .expect("traversal should succeed");
    assert_eq!(node_guids(&result), ["y"]);
    assert_eq!(
        result.completion,
        LineageCompletion::BoundedStop {
            reason: StopReason::DepthLimit
        }
    );

    let result = handle
        .control()
        .traverse_lineage(&request("x", "DOWNSTREAM", Some(0), Some(10), false))
        .await
        .expect("traversal should succeed");
    assert!(result.nodes.is_empty());
    assert!(result.edges.is_empty());
}

#[tokio::test]
async fn upstream_walks_reach_the_graph_boundary() {
    let handle = build_handle().await;
    let result = handle
        .control()
        .traverse_lineage(&request("z", "UPSTREAM", None, Some(10), false))
        .await
        .expect("traversal should succeed");

    assert_eq!(node_guids(&result), ["y", "x", "h1", "hub"]);
    let depths: Vec<u32> = result.nodes.iter().map(|node| node.depth).collect();
    assert_eq!(depths, [1, 2, 3, 4]);
    assert_eq!(edge_pairs(&result)[0], ("z", "y"));
    assert_eq!(result.completion, LineageCompletion::Exhausted);
}

#[tokio::test]
async fn unknown_seed_is_an_error() {
    let handle = build_handle().await;
    let err = handle
        .control()
        .traverse_lineage(&request("missing", "UPSTREAM", None, None, true))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "NotFoundError");
}
