//! MCP tool modules.
//!
//! Tools are grouped by domain: asset search, lineage traversal, attribute
//! updates, custom metadata management, and contextual help.

pub mod assets;
pub mod context;
pub mod lineage;
pub mod metadata;
pub mod search;
