//! Data model and index schema helpers for catalog-mcp.
//!
//! This crate defines the asset, lineage, and governance types shared by the
//! query compiler, the catalog clients, and the MCP tool surface.

pub mod models;
pub mod schema;

pub use models::*;
