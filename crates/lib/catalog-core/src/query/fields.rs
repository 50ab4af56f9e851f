//! Mapping from user-facing attribute names to index fields.

use catalog_model::schema::{
    FIELD_CONNECTION_QUALIFIED_NAME,
    FIELD_DOMAIN_GUIDS,
    FIELD_GUID,
    FIELD_PROPAGATED_TRAIT_NAMES,
    FIELD_STATE,
    FIELD_TRAIT_NAMES,
    FIELD_TYPE_NAME,
};

/// Index fields backing one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Exact-value field used for term, terms, exists, prefix, and range clauses.
    pub keyword: String,
    /// Analyzed field used for match clauses.
    pub text: String,
}

impl ResolvedField {
    fn same(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            text: field.clone(),
            keyword: field,
        }
    }
}

struct KnownField {
    name: &'static str,
    keyword: &'static str,
    text: Option<&'static str>,
}

const fn known(name: &'static str, keyword: &'static str, text: Option<&'static str>) -> KnownField {
    KnownField { name, keyword, text }
}

const KNOWN_FIELDS: &[KnownField] = &[
    known("guid", FIELD_GUID, None),
    known("type_name", FIELD_TYPE_NAME, Some("__typeName")),
    known("status", FIELD_STATE, None),
    known("state", FIELD_STATE, None),
    known("created_by", "__createdBy", None),
    known("updated_by", "__modifiedBy", None),
    known("create_time", "__timestamp", None),
    known("update_time", "__modificationTimestamp", None),
    known("name", "name.keyword", Some("name")),
    known("display_name", "displayName.keyword", Some("displayName")),
    known("qualified_name", "qualifiedName", Some("qualifiedName.text")),
    known("description", "description.keyword", Some("description")),
    known("user_description", "userDescription.keyword", Some("userDescription")),
    known("certificate_status", "certificateStatus", Some("certificateStatus.text")),
    known("owner_users", "ownerUsers", None),
    known("owner_groups", "ownerGroups", None),
    known("tags", FIELD_TRAIT_NAMES, None),
    known("atlan_tags", FIELD_TRAIT_NAMES, None),
    known("propagated_tags", FIELD_PROPAGATED_TRAIT_NAMES, None),
    known("domain_guids", FIELD_DOMAIN_GUIDS, None),
    known("connection_qualified_name", FIELD_CONNECTION_QUALIFIED_NAME, None),
    known("connector_name", "connectorName", None),
    known("popularity_score", "popularityScore", None),
    known("asset_policy_guids", "assetPolicyGUIDs", None),
    known("non_compliant_asset_policy_guids", "nonCompliantAssetPolicyGUIDs", None),
];

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|ch| *ch != '_')
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Resolves an attribute name to its index fields.
///
/// Known attributes match regardless of snake or camel case. Names that already
/// look like index fields pass through; other snake-case names become camel case.
#[must_use]
pub fn resolve_field(attribute: &str) -> ResolvedField {
    let attribute = attribute.trim();
    let normalized = normalize(attribute);
    if let Some(field) = KNOWN_FIELDS
        .iter()
        .find(|field| normalize(field.name) == normalized)
    {
        return ResolvedField {
            keyword: field.keyword.to_string(),
            text: field.text.unwrap_or(field.keyword).to_string(),
        };
    }
    if attribute.starts_with("__") || attribute.contains('.') {
        return ResolvedField::same(attribute);
    }
    ResolvedField::same(snake_to_camel(attribute))
}

/// Maps an index field back to the entity attribute it is derived from.
#[must_use]
pub fn entity_attribute(field: &str) -> &str {
    let base = field
        .strip_suffix(".keyword")
        .or_else(|| field.strip_suffix(".text"))
        .unwrap_or(field);
    match base {
        "__timestamp" => "createTime",
        "__modificationTimestamp" => "updateTime",
        "__createdBy" => "createdBy",
        "__modifiedBy" => "updatedBy",
        other => other,
    }
}

/// Resolves a caller-facing attribute name to the entity attribute to project.
#[must_use]
pub fn projected_attribute(attribute: &str) -> String {
    entity_attribute(&resolve_field(attribute).keyword).to_string()
}

fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_attributes_resolve_in_either_case() {
        let snake = resolve_field("display_name");
        let camel = resolve_field("displayName");
        assert_eq!(snake, camel);
        assert_eq!(snake.keyword, "displayName.keyword");
        assert_eq!(snake.text, "displayName");
        assert_eq!(resolve_field("status").keyword, FIELD_STATE);
    }

    #[test]
    fn unknown_attributes_fall_back_to_camel_case() {
        assert_eq!(resolve_field("source_read_count").keyword, "sourceReadCount");
        assert_eq!(resolve_field("rowCount").keyword, "rowCount");
        assert_eq!(resolve_field("__customField").keyword, "__customField");
        assert_eq!(resolve_field("name.keyword").keyword, "name.keyword");
    }

    #[test]
    fn projection_uses_entity_attribute_names() {
        assert_eq!(projected_attribute("qualified_name"), "qualifiedName");
        assert_eq!(projected_attribute("display_name"), "displayName");
        assert_eq!(projected_attribute("create_time"), "createTime");
        assert_eq!(projected_attribute("row_count"), "rowCount");
    }
}
