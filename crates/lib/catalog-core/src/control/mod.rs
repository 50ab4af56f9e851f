use std::sync::Arc;

use catalog_model::schema::DEFAULT_MAX_PAGE_SIZE;

use crate::catalog::CatalogService;
use crate::error::{CatalogError, CatalogResult};

pub mod assets;
pub mod lineage;
pub mod metadata;
pub mod search;

pub use assets::AttributeUpdateDispatcher;
pub use lineage::{LineageRequest, LineageTraverser};
pub use metadata::{
    AttributeModification,
    BadgeConditionInput,
    BadgeRequest,
    BadgeUpdateRequest,
    CustomAttributeInput,
    CustomMetadataRequest,
    CustomMetadataUpdateRequest,
};
pub use search::{QueryExecutor, RawQueryExecutor, SearchOptions};

/// Entry point for every catalog operation exposed as a tool.
pub struct CatalogControlPlane<S> {
    catalog: Arc<S>,
    max_page_size: usize,
}

impl<S> Clone for CatalogControlPlane<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            max_page_size: self.max_page_size,
        }
    }
}

impl<S: CatalogService> CatalogControlPlane<S> {
    pub const fn new(catalog: Arc<S>) -> Self {
        Self {
            catalog,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn catalog(&self) -> &S {
        &self.catalog
    }

    pub const fn max_page_size(&self) -> usize {
        self.max_page_size
    }
}

/// Converts a caller-supplied count to `usize`, rejecting negatives.
///
/// # Errors
/// Returns `InvalidInput` when `value` is negative.
pub fn count_arg(name: &str, value: i64) -> CatalogResult<usize> {
    usize::try_from(value).map_err(|_| {
        CatalogError::InvalidInput(format!("{name} must be a non-negative integer, got {value}"))
    })
}
