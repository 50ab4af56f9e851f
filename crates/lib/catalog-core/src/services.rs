use std::sync::Arc;

use crate::catalog::CatalogService;
use crate::control::CatalogControlPlane;

/// Shared service handle for one catalog connection.
pub struct CatalogHandle<S> {
    catalog: Arc<S>,
    control: CatalogControlPlane<S>,
}

impl<S> Clone for CatalogHandle<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            control: self.control.clone(),
        }
    }
}

impl<S: CatalogService> CatalogHandle<S> {
    pub fn new(catalog: Arc<S>) -> Self {
        let control = CatalogControlPlane::new(Arc::clone(&catalog));
        Self { catalog, control }
    }

    pub fn from_catalog(catalog: S) -> Self {
        Self::new(Arc::new(catalog))
    }

    /// Overrides the largest page size a search may request.
    #[must_use]
    pub fn with_max_page_size(self, max_page_size: usize) -> Self {
        Self {
            control: self.control.with_max_page_size(max_page_size),
            catalog: self.catalog,
        }
    }

    pub fn catalog(&self) -> Arc<S> {
        Arc::clone(&self.catalog)
    }

    pub fn control(&self) -> CatalogControlPlane<S> {
        self.control.clone()
    }
}
