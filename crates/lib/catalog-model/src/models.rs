use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{
    ATTR_CERTIFICATE_STATUS,
    ATTR_DESCRIPTION,
    ATTR_NAME,
    ATTR_QUALIFIED_NAME,
    ATTR_USER_DESCRIPTION,
    FIELD_PROPAGATED_TRAIT_NAMES,
};

/// Error returned when a token does not name a member of a closed enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl ParseEnumError {
    #[must_use]
    pub fn new(kind: &'static str, value: &str, expected: &'static [&'static str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} value: {} (expected one of: {})",
            self.kind,
            self.value,
            self.expected.join(", ")
        )
    }
}

impl Error for ParseEnumError {}

// Closed token enums: serde uses the exact token, `FromStr` ignores ASCII case.
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($kind:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $vis enum $name {
            $($(#[$vmeta])* #[serde(rename = $token)] $variant),+
        }

        impl $name {
            pub const TOKENS: &'static [&'static str] = &[$($token),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($token) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ParseEnumError::new($kind, value, Self::TOKENS))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

token_enum! {
    /// Certification state of an asset.
    pub enum CertificateStatus ("certificate status") {
        Verified => "VERIFIED",
        Draft => "DRAFT",
        Deprecated => "DEPRECATED",
    }
}

token_enum! {
    /// Direction of a lineage traversal.
    pub enum LineageDirection ("direction") {
        Upstream => "UPSTREAM",
        Downstream => "DOWNSTREAM",
    }
}

token_enum! {
    /// Lifecycle state of a catalog entity.
    #[derive(Default)]
    pub enum EntityStatus ("entity status") {
        #[default]
        Active => "ACTIVE",
        Deleted => "DELETED",
    }
}

token_enum! {
    /// Attributes that the bulk update tool may change.
    pub enum UpdatableAttribute ("attribute name") {
        UserDescription => "user_description",
        CertificateStatus => "certificate_status",
    }
}

impl UpdatableAttribute {
    /// Wire name of the attribute on the catalog entity.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::UserDescription => ATTR_USER_DESCRIPTION,
            Self::CertificateStatus => ATTR_CERTIFICATE_STATUS,
        }
    }
}

token_enum! {
    /// Primitive type of a custom metadata attribute.
    pub enum CustomAttributeType ("attribute type") {
        String => "STRING",
        Integer => "INTEGER",
        Decimal => "DECIMAL",
        Boolean => "BOOLEAN",
        Date => "DATE",
        Options => "OPTIONS",
        Users => "USERS",
        Groups => "GROUPS",
        Url => "URL",
        Sql => "SQL",
    }
}

token_enum! {
    /// Comparison applied by a badge condition.
    pub enum BadgeOperator ("badge operator") {
        Eq => "EQ",
        Neq => "NEQ",
        Gt => "GT",
        Gte => "GTE",
        Lt => "LT",
        Lte => "LTE",
    }
}

token_enum! {
    /// Colour shown when a badge condition matches.
    pub enum BadgeColor ("badge color") {
        Green => "GREEN",
        Yellow => "YELLOW",
        Red => "RED",
    }
}

impl BadgeColor {
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Green => "#047960",
            Self::Yellow => "#F7B43D",
            Self::Red => "#BF1B1B",
        }
    }
}

/// Attribute value carried on an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Self>),
    Map(BTreeMap<String, Self>),
}

impl AttributeValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Interprets an integer value as epoch milliseconds.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }

    /// True when the value carries data: not null, not an empty string or collection.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Text(value) => !value.is_empty(),
            Self::List(values) => values.iter().any(Self::is_present),
            Self::Map(values) => !values.is_empty(),
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) => true,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Catalog entity as returned by search and lineage calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub guid: String,
    pub type_name: String,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classification_names: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default, rename = "searchScore", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Asset {
    #[must_use]
    pub fn new(guid: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            type_name: type_name.into(),
            status: EntityStatus::Active,
            classification_names: Vec::new(),
            attributes: BTreeMap::new(),
            score: None,
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classification_names = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: EntityStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(AttributeValue::as_str)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text(ATTR_NAME)
    }

    #[must_use]
    pub fn qualified_name(&self) -> Option<&str> {
        self.text(ATTR_QUALIFIED_NAME)
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.text(ATTR_DESCRIPTION)
    }

    #[must_use]
    pub fn user_description(&self) -> Option<&str> {
        self.text(ATTR_USER_DESCRIPTION)
    }

    /// Certificate status, when present and recognised.
    #[must_use]
    pub fn certificate_status(&self) -> Option<CertificateStatus> {
        self.text(ATTR_CERTIFICATE_STATUS)
            .and_then(|value| value.parse().ok())
    }

    #[must_use]
    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        self.attribute(name).and_then(AttributeValue::as_timestamp)
    }

    /// Tags applied directly to the asset.
    #[must_use]
    pub fn direct_tags(&self) -> &[String] {
        &self.classification_names
    }

    /// Tags inherited through propagation.
    #[must_use]
    pub fn propagated_tags(&self) -> Vec<&str> {
        self.attribute(FIELD_PROPAGATED_TRAIT_NAMES)
            .and_then(AttributeValue::as_list)
            .map(|values| values.iter().filter_map(AttributeValue::as_str).collect())
            .unwrap_or_default()
    }
}

/// Page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub assets: Vec<Asset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// Asset reached during a lineage traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageNode {
    #[serde(flatten)]
    pub asset: Asset,
    pub depth: u32,
}

/// Edge traversed from `source_guid` (the expanded node) to `target_guid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub source_guid: String,
    pub target_guid: String,
    pub direction: LineageDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    SizeLimit,
    DepthLimit,
    ImmediateNeighbors,
}

/// How a traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineageCompletion {
    BoundedStop { reason: StopReason },
    Exhausted,
}

/// Flattened lineage graph: nodes in first-visit order, edges in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageResult {
    #[serde(rename = "assets")]
    pub nodes: Vec<LineageNode>,
    #[serde(rename = "references")]
    pub edges: Vec<LineageEdge>,
    pub completion: LineageCompletion,
}

impl LineageResult {
    #[must_use]
    pub fn node(&self, guid: &str) -> Option<&LineageNode> {
        self.nodes.iter().find(|node| node.asset.guid == guid)
    }

    #[must_use]
    pub fn contains_node(&self, guid: &str) -> bool {
        self.node(guid).is_some()
    }
}

/// Reference to an asset targeted by a bulk attribute update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub guid: String,
    pub type_name: String,
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of a bulk attribute update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub updated_count: usize,
    pub errors: Vec<String>,
}

impl UpdateOutcome {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            updated_count: 0,
            errors: vec![message.into()],
        }
    }
}

/// Tag definition: the internal name stored on assets and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDef {
    pub name: String,
    pub display_name: String,
}

/// Attribute inside a custom metadata definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAttributeDef {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub attribute_type: CustomAttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub multi_valued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_name: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by: Option<String>,
}

/// Logo and locking options for a custom metadata definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetadataOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

/// Custom metadata (business metadata) type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetadataDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub attribute_defs: Vec<CustomAttributeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CustomMetadataOptions>,
}

impl CustomMetadataDef {
    /// Finds a non-archived attribute by display name.
    #[must_use]
    pub fn attribute(&self, display_name: &str) -> Option<&CustomAttributeDef> {
        self.attribute_defs
            .iter()
            .find(|attr| !attr.archived && attr.display_name == display_name)
    }

    pub fn attribute_mut(&mut self, display_name: &str) -> Option<&mut CustomAttributeDef> {
        self.attribute_defs
            .iter_mut()
            .find(|attr| !attr.archived && attr.display_name == display_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCondition {
    pub operator: BadgeOperator,
    pub value: String,
    pub color: BadgeColor,
}

/// Badge shown for a custom metadata attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub name: String,
    pub metadata_name: String,
    pub attribute_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub conditions: Vec<BadgeCondition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_enums_parse_case_insensitively() {
        assert_eq!("downstream".parse::<LineageDirection>(), Ok(LineageDirection::Downstream));
        assert_eq!("VERIFIED".parse::<CertificateStatus>(), Ok(CertificateStatus::Verified));
        let err = "SIDEWAYS".parse::<LineageDirection>().unwrap_err();
        assert_eq!(err.value, "SIDEWAYS");
        assert!(err.to_string().contains("UPSTREAM"));
    }

    #[test]
    fn asset_deserializes_catalog_entity_shape() {
        let json = r#"{
            "typeName": "Table",
            "guid": "g-1",
            "status": "ACTIVE",
            "classificationNames": ["PII"],
            "attributes": {
                "name": "orders",
                "qualifiedName": "default/snowflake/db/sch/orders",
                "certificateStatus": "VERIFIED",
                "createTime": 1641034800000,
                "ownerUsers": ["ana", "bo"],
                "popularityScore": 0.5,
                "description": null
            },
            "searchScore": 2.5
        }"#;
        let asset: Asset = serde_json::from_str(json).expect("asset should parse");
        assert_eq!(asset.type_name, "Table");
        assert_eq!(asset.name(), Some("orders"));
        assert_eq!(asset.certificate_status(), Some(CertificateStatus::Verified));
        assert_eq!(asset.direct_tags(), ["PII".to_string()]);
        assert_eq!(asset.attribute("description"), Some(&AttributeValue::Null));
        assert_eq!(
            asset.attribute("popularityScore"),
            Some(&AttributeValue::Float(0.5))
        );
        let created = asset.timestamp("createTime").expect("timestamp");
        assert_eq!(created.timestamp_millis(), 1_641_034_800_000);
        assert_eq!(asset.score, Some(2.5));
    }

    #[test]
    fn presence_ignores_empty_values() {
        assert!(!AttributeValue::Null.is_present());
        assert!(!AttributeValue::from("").is_present());
        assert!(!AttributeValue::List(vec![AttributeValue::Null]).is_present());
        assert!(AttributeValue::from("x").is_present());
    }

    #[test]
    fn lineage_result_serializes_with_tool_field_names() {
        let result = LineageResult {
            nodes: vec![LineageNode {
                asset: Asset::new("b", "Table"),
                depth: 1,
            }],
            edges: vec![LineageEdge {
                source_guid: "a".to_string(),
                target_guid: "b".to_string(),
                direction: LineageDirection::Downstream,
            }],
            completion: LineageCompletion::BoundedStop {
                reason: StopReason::ImmediateNeighbors,
            },
        };
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["assets"][0]["guid"], "b");
        assert_eq!(value["assets"][0]["depth"], 1);
        assert_eq!(value["references"][0]["direction"], "DOWNSTREAM");
        assert_eq!(value["completion"]["state"], "BOUNDED_STOP");
        assert_eq!(value["completion"]["reason"], "IMMEDIATE_NEIGHBORS");
    }
}
