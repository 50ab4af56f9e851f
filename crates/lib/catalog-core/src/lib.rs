//! Core services for catalog-mcp.
//!
//! This crate compiles structured search filters into index queries, walks
//! lineage graphs, dispatches governed attribute updates, and provides the
//! HTTP and in-memory catalog clients those operations run against.

pub mod catalog;
pub mod control;
pub mod error;
pub mod query;
pub mod services;

pub use error::{CatalogError, CatalogResult};
