use std::collections::{HashSet, VecDeque};

use catalog_model::schema::UNBOUNDED_DEPTH;
use catalog_model::{
    LineageCompletion,
    LineageDirection,
    LineageEdge,
    LineageNode,
    LineageResult,
    StopReason,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogService, LineageFrontierRequest};
use crate::error::{CatalogError, CatalogResult};

use super::{CatalogControlPlane, count_arg};

const DEFAULT_SIZE: usize = 10;

/// Validated lineage traversal parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRequest {
    pub guid: String,
    pub direction: LineageDirection,
    /// `None` walks until the graph or the size limit is exhausted.
    pub depth: Option<u32>,
    pub size: usize,
    pub immediate_neighbors: bool,
}

impl LineageRequest {
    /// Builds a request from raw tool arguments, applying defaults.
    ///
    /// Depth values at or above the unbounded sentinel disable the depth limit.
    ///
    /// # Errors
    /// Returns `InvalidDirection` for a direction other than UPSTREAM or
    /// DOWNSTREAM and `InvalidInput` for an empty guid or negative counts.
    pub fn parse(
        guid: &str,
        direction: &str,
        depth: Option<i64>,
        size: Option<i64>,
        immediate_neighbors: Option<bool>,
    ) -> CatalogResult<Self> {
        let guid = guid.trim();
        if guid.is_empty() {
            return Err(CatalogError::InvalidInput("guid is required".to_string()));
        }
        let direction = direction
            .parse::<LineageDirection>()
            .map_err(|_| CatalogError::InvalidDirection(direction.trim().to_uppercase()))?;
        let depth = match depth {
            None => None,
            Some(raw) => {
                let depth = count_arg("depth", raw)?;
                u32::try_from(depth)
                    .ok()
                    .filter(|depth| *depth < UNBOUNDED_DEPTH)
            }
        };
        let size = size.map_or(Ok(DEFAULT_SIZE), |raw| count_arg("size", raw))?;
        Ok(Self {
            guid: guid.to_string(),
            direction,
            depth,
            size,
            immediate_neighbors: immediate_neighbors.unwrap_or(true),
        })
    }
}

/// Breadth-first lineage walk over the catalog's one-hop frontier calls.
pub struct LineageTraverser<'a, S> {
    catalog: &'a S,
}

impl<'a, S: CatalogService> LineageTraverser<'a, S> {
    pub const fn new(catalog: &'a S) -> Self {
        Self { catalog }
    }

    /// Walks lineage from the seed asset.
    ///
    /// The seed is expanded first but only joins the node set when an edge
    /// leads back to it. Every traversed edge is recorded before the size
    /// check, so the edge to the first node past the size limit is kept while
    /// that node is dropped.
    ///
    /// # Errors
    /// Propagates catalog failures; no partial result is returned.
    pub async fn traverse(&self, request: &LineageRequest) -> CatalogResult<LineageResult> {
        let mut queue = VecDeque::from([(request.guid.clone(), 0_u32)]);
        let mut seen: HashSet<String> = HashSet::new();
        let mut nodes: Vec<LineageNode> = Vec::new();
        let mut edges: Vec<LineageEdge> = Vec::new();
        let fetch_size = request.size.max(1);

        let completion = 'walk: loop {
            let Some((guid, depth)) = queue.pop_front() else {
                break LineageCompletion::Exhausted;
            };
            if request.depth.is_some_and(|limit| depth >= limit) {
                break bounded(StopReason::DepthLimit);
            }
            if nodes.len() >= request.size {
                break bounded(StopReason::SizeLimit);
            }

            let neighbours = self
                .catalog
                .lineage_frontier(LineageFrontierRequest {
                    guid: guid.clone(),
                    direction: request.direction,
                    size: fetch_size,
                })
                .await?;
            debug!(guid = %guid, depth, found = neighbours.len(), "expanded lineage node");

            for asset in neighbours {
                edges.push(LineageEdge {
                    source_guid: guid.clone(),
                    target_guid: asset.guid.clone(),
                    direction: request.direction,
                });
                if seen.contains(&asset.guid) {
                    continue;
                }
                if nodes.len() >= request.size {
                    break 'walk bounded(StopReason::SizeLimit);
                }
                seen.insert(asset.guid.clone());
                if asset.guid != request.guid {
                    queue.push_back((asset.guid.clone(), depth + 1));
                }
                nodes.push(LineageNode {
                    asset,
                    depth: depth + 1,
                });
            }

            if request.immediate_neighbors {
                break bounded(StopReason::ImmediateNeighbors);
            }
        };

        info!(
            guid = %request.guid,
            direction = %request.direction,
            nodes = nodes.len(),
            edges = edges.len(),
            ?completion,
            "lineage traversal finished"
        );
        Ok(LineageResult {
            nodes,
            edges,
            completion,
        })
    }
}

const fn bounded(reason: StopReason) -> LineageCompletion {
    LineageCompletion::BoundedStop { reason }
}

impl<S: CatalogService> CatalogControlPlane<S> {
    /// # Errors
    /// Propagates catalog failures from any frontier fetch.
    pub async fn traverse_lineage(&self, request: &LineageRequest) -> CatalogResult<LineageResult> {
        LineageTraverser::new(self.catalog()).traverse(request).await
    }
}
