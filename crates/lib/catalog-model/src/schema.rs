//! Index field names and schema constants shared across crates.

pub const FIELD_GUID: &str = "__guid";
pub const FIELD_TYPE_NAME: &str = "__typeName.keyword";
pub const FIELD_STATE: &str = "__state";
pub const FIELD_TRAIT_NAMES: &str = "__traitNames";
pub const FIELD_PROPAGATED_TRAIT_NAMES: &str = "__propagatedTraitNames";
pub const FIELD_DOMAIN_GUIDS: &str = "domainGUIDs";
pub const FIELD_CONNECTION_QUALIFIED_NAME: &str = "connectionQualifiedName";
pub const FIELD_SCORE: &str = "_score";

pub const ATTR_NAME: &str = "name";
pub const ATTR_DISPLAY_NAME: &str = "displayName";
pub const ATTR_QUALIFIED_NAME: &str = "qualifiedName";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_USER_DESCRIPTION: &str = "userDescription";
pub const ATTR_CERTIFICATE_STATUS: &str = "certificateStatus";

pub const STATE_ACTIVE: &str = "ACTIVE";
pub const STATE_DELETED: &str = "DELETED";

pub const TYPE_BADGE: &str = "Badge";

/// Attributes requested on every search in addition to caller selections.
pub const DEFAULT_SEARCH_ATTRIBUTES: &[&str] = &[
    ATTR_NAME,
    ATTR_QUALIFIED_NAME,
    ATTR_DESCRIPTION,
    ATTR_USER_DESCRIPTION,
    ATTR_CERTIFICATE_STATUS,
];

/// Largest page a single search may request unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 300;

/// Depth values at or above this sentinel mean "no depth limit".
pub const UNBOUNDED_DEPTH: u32 = 1_000_000;

/// Asset type names accepted by the `asset_type` search filter.
pub const KNOWN_ASSET_TYPES: &[&str] = &[
    "AtlasGlossary",
    "AtlasGlossaryCategory",
    "AtlasGlossaryTerm",
    "Badge",
    "BIProcess",
    "Collection",
    "Column",
    "ColumnProcess",
    "Connection",
    "Database",
    "DataDomain",
    "DataProduct",
    "DbtColumnProcess",
    "DbtMetric",
    "DbtModel",
    "DbtModelColumn",
    "DbtProcess",
    "DbtSource",
    "DbtTest",
    "File",
    "Folder",
    "Function",
    "LookerDashboard",
    "LookerExplore",
    "LookerLook",
    "LookerModel",
    "MaterialisedView",
    "PowerBIDashboard",
    "PowerBIDataset",
    "PowerBIReport",
    "PowerBITable",
    "Procedure",
    "Process",
    "Query",
    "S3Bucket",
    "S3Object",
    "Schema",
    "SnowflakeDynamicTable",
    "SnowflakePipe",
    "SnowflakeStream",
    "SnowflakeTag",
    "Table",
    "TablePartition",
    "TableauDashboard",
    "TableauDatasource",
    "TableauWorkbook",
    "TableauWorksheet",
    "View",
];

/// Resolves a user-supplied asset type to its canonical spelling.
#[must_use]
pub fn canonical_asset_type(name: &str) -> Option<&'static str> {
    let trimmed = name.trim();
    KNOWN_ASSET_TYPES
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(trimmed))
}
