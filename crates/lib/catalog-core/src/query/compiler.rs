use std::collections::BTreeMap;

use catalog_model::schema::{
    FIELD_CONNECTION_QUALIFIED_NAME,
    FIELD_DOMAIN_GUIDS,
    FIELD_GUID,
    FIELD_PROPAGATED_TRAIT_NAMES,
    FIELD_STATE,
    FIELD_TRAIT_NAMES,
    FIELD_TYPE_NAME,
    STATE_ACTIVE,
    canonical_asset_type,
};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};

use super::clause::{BoolClause, Clause, RangeClause};
use super::fields::resolve_field;
use super::operator::{Condition, ConditionOperator, ConditionValue, parse_conditions};

/// Structured search filters accepted by `search_assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Every entry must hold.
    pub conditions: BTreeMap<String, Value>,
    /// No entry may hold.
    pub negative_conditions: BTreeMap<String, Value>,
    /// At least `min_somes` entries must hold.
    pub some_conditions: BTreeMap<String, Value>,
    pub min_somes: usize,
    pub asset_type: Option<String>,
    pub include_archived: bool,
    pub connection_qualified_name: Option<String>,
    pub tags: Vec<String>,
    pub directly_tagged: bool,
    pub domain_guids: Vec<String>,
    /// Attribute name to `{"gte": .., "lte": ..}` bounds.
    pub date_range: BTreeMap<String, Value>,
    pub guids: Vec<String>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            conditions: BTreeMap::new(),
            negative_conditions: BTreeMap::new(),
            some_conditions: BTreeMap::new(),
            min_somes: 1,
            asset_type: None,
            include_archived: false,
            connection_qualified_name: None,
            tags: Vec::new(),
            directly_tagged: true,
            domain_guids: Vec::new(),
            date_range: BTreeMap::new(),
            guids: Vec::new(),
        }
    }
}

/// Compiles filters into a clause tree. Pure and deterministic.
///
/// # Errors
/// Returns `InvalidFilter` for malformed conditions or bounds and
/// `UnknownAssetType` for an unrecognised `asset_type`.
pub fn compile(filters: &SearchFilters) -> CatalogResult<Clause> {
    let mut root = BoolClause::default();

    if let Some(asset_type) = non_blank(filters.asset_type.as_deref()) {
        let canonical = canonical_asset_type(asset_type)
            .ok_or_else(|| CatalogError::UnknownAssetType(asset_type.to_string()))?;
        root.must.push(Clause::term(FIELD_TYPE_NAME, canonical));
    }

    let must = compile_group(&filters.conditions, ListMode::AnyOf)?;
    let must_not = compile_group(&filters.negative_conditions, ListMode::AnyOf)?;
    let some = compile_group(&filters.some_conditions, ListMode::EachCounts)?;

    let state_overridden = [
        &filters.conditions,
        &filters.negative_conditions,
        &filters.some_conditions,
    ]
    .into_iter()
    .flat_map(BTreeMap::keys)
    .any(|attribute| resolve_field(attribute).keyword == FIELD_STATE);
    if !filters.include_archived && !state_overridden {
        root.must.push(Clause::term(FIELD_STATE, STATE_ACTIVE));
    }

    root.must.extend(must);

    if !some.is_empty() {
        if filters.min_somes > some.len() {
            return Err(CatalogError::invalid_filter(format!(
                "min_somes ({}) exceeds the number of some_conditions ({})",
                filters.min_somes,
                some.len()
            )));
        }
        if filters.min_somes > 0 {
            root.must.push(Clause::Bool(BoolClause {
                should: some,
                minimum_should_match: Some(filters.min_somes),
                ..BoolClause::default()
            }));
        }
    }

    if let Some(prefix) = non_blank(filters.connection_qualified_name.as_deref()) {
        root.must.push(Clause::Prefix {
            field: FIELD_CONNECTION_QUALIFIED_NAME.to_string(),
            value: prefix.to_string(),
        });
    }

    let tags = non_blank_all(&filters.tags);
    if !tags.is_empty() {
        let direct = Clause::terms(FIELD_TRAIT_NAMES, tags.iter().copied());
        if filters.directly_tagged {
            root.must.push(direct);
        } else {
            root.must.push(Clause::Bool(BoolClause {
                should: vec![
                    direct,
                    Clause::terms(FIELD_PROPAGATED_TRAIT_NAMES, tags.iter().copied()),
                ],
                minimum_should_match: Some(1),
                ..BoolClause::default()
            }));
        }
    }

    let domains = non_blank_all(&filters.domain_guids);
    if !domains.is_empty() {
        root.must.push(Clause::terms(FIELD_DOMAIN_GUIDS, domains));
    }

    for (attribute, bounds) in &filters.date_range {
        root.must.push(compile_date_range(attribute, bounds)?);
    }

    let guids = non_blank_all(&filters.guids);
    if !guids.is_empty() {
        root.must.push(Clause::terms(FIELD_GUID, guids));
    }

    root.must_not.extend(must_not);

    if root.is_empty() {
        Ok(Clause::MatchAll)
    } else {
        Ok(Clause::Bool(root))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn non_blank_all(values: &[String]) -> Vec<&str> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect()
}

/// How a list value inside a condition group is compiled.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ListMode {
    /// The list yields one clause that holds when any element holds.
    AnyOf,
    /// Each element is its own clause and counts toward `min_somes`.
    EachCounts,
}

fn compile_group(group: &BTreeMap<String, Value>, mode: ListMode) -> CatalogResult<Vec<Clause>> {
    let mut clauses = Vec::new();
    for (attribute, raw) in group {
        let conditions = parse_conditions(attribute, raw)?;
        if mode == ListMode::AnyOf && raw.is_array() && conditions.len() > 1 {
            clauses.push(compile_any_of(attribute, &conditions));
        } else {
            clauses.extend(conditions.iter().map(compile_condition));
        }
    }
    Ok(clauses)
}

fn compile_any_of(attribute: &str, conditions: &[Condition]) -> Clause {
    let literals: Option<Vec<Value>> = conditions
        .iter()
        .map(|condition| match (condition.operator, &condition.value) {
            (ConditionOperator::Eq, ConditionValue::Scalar(value)) => Some(value.clone()),
            _ => None,
        })
        .collect();
    match literals {
        Some(values) => Clause::Terms {
            field: resolve_field(attribute).keyword,
            values,
        },
        None => Clause::Bool(BoolClause {
            should: conditions.iter().map(compile_condition).collect(),
            minimum_should_match: Some(1),
            ..BoolClause::default()
        }),
    }
}

fn compile_condition(condition: &Condition) -> Clause {
    let field = resolve_field(&condition.attribute);
    let range = |gt, gte, lt, lte| {
        Clause::Range(RangeClause {
            field: field.keyword.clone(),
            gt,
            gte,
            lt,
            lte,
        })
    };
    match (condition.operator, &condition.value) {
        (ConditionOperator::HasAnyValue, _) | (_, ConditionValue::None) => {
            Clause::exists(field.keyword.clone())
        }
        (ConditionOperator::Match, ConditionValue::Scalar(value)) => Clause::Match {
            field: field.text.clone(),
            text: scalar_string(value),
        },
        (ConditionOperator::StartsWith, ConditionValue::Scalar(value)) => Clause::Prefix {
            field: field.keyword.clone(),
            value: scalar_string(value),
        },
        (ConditionOperator::Gt, ConditionValue::Scalar(value)) => {
            range(Some(value.clone()), None, None, None)
        }
        (ConditionOperator::Gte, ConditionValue::Scalar(value)) => {
            range(None, Some(value.clone()), None, None)
        }
        (ConditionOperator::Lt, ConditionValue::Scalar(value)) => {
            range(None, None, Some(value.clone()), None)
        }
        (ConditionOperator::Lte, ConditionValue::Scalar(value)) => {
            range(None, None, None, Some(value.clone()))
        }
        (_, ConditionValue::Pair(low, high)) => {
            range(None, Some(low.clone()), None, Some(high.clone()))
        }
        (_, ConditionValue::List(values)) => Clause::Terms {
            field: field.keyword.clone(),
            values: values.clone(),
        },
        (_, ConditionValue::Scalar(value)) => Clause::term(field.keyword.clone(), value.clone()),
    }
}

fn scalar_string(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), ToString::to_string)
}

fn compile_date_range(attribute: &str, bounds: &Value) -> CatalogResult<Clause> {
    let object = bounds.as_object().ok_or_else(|| {
        CatalogError::invalid_filter(format!(
            "date_range for {attribute} must be an object with gte and/or lte"
        ))
    })?;
    if let Some(key) = object.keys().find(|key| !matches!(key.as_str(), "gte" | "lte")) {
        return Err(CatalogError::invalid_filter(format!(
            "date_range for {attribute} has unsupported bound '{key}'"
        )));
    }
    let gte = object
        .get("gte")
        .map(|value| parse_date_bound(attribute, value))
        .transpose()?;
    let lte = object
        .get("lte")
        .map(|value| parse_date_bound(attribute, value))
        .transpose()?;
    if gte.is_none() && lte.is_none() {
        return Err(CatalogError::invalid_filter(format!(
            "date_range for {attribute} needs at least one of gte or lte"
        )));
    }
    if let (Some(low), Some(high)) = (gte, lte)
        && low > high
    {
        return Err(CatalogError::invalid_filter(format!(
            "date_range for {attribute} has gte after lte"
        )));
    }
    Ok(Clause::Range(RangeClause {
        field: resolve_field(attribute).keyword,
        gte: gte.map(Value::from),
        lte: lte.map(Value::from),
        ..RangeClause::default()
    }))
}

/// Accepts epoch milliseconds, RFC 3339 timestamps, or `YYYY-MM-DD` dates (midnight UTC).
fn parse_date_bound(attribute: &str, value: &Value) -> CatalogResult<i64> {
    let invalid = || {
        CatalogError::invalid_filter(format!(
            "date_range bound for {attribute} must be epoch milliseconds or an RFC 3339 date: {value}"
        ))
    };
    match value {
        Value::Number(number) => number.as_i64().ok_or_else(invalid),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(millis) = text.parse::<i64>() {
                return Ok(millis);
            }
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Ok(parsed.timestamp_millis());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc().timestamp_millis())
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn must_clauses(clause: &Clause) -> &[Clause] {
        match clause {
            Clause::Bool(group) => &group.must,
            other => panic!("expected bool clause, got {other:?}"),
        }
    }

    #[test]
    fn empty_filters_only_exclude_archived_assets() {
        let clause = compile(&SearchFilters::default()).unwrap();
        assert_eq!(must_clauses(&clause), [Clause::term(FIELD_STATE, STATE_ACTIVE)]);

        let archived = SearchFilters {
            include_archived: true,
            ..SearchFilters::default()
        };
        assert_eq!(compile(&archived).unwrap(), Clause::MatchAll);
    }

    #[test]
    fn compilation_is_deterministic() {
        let filters = SearchFilters {
            asset_type: Some("table".to_string()),
            conditions: BTreeMap::from([
                ("certificate_status".to_string(), json!("VERIFIED")),
                ("name".to_string(), json!({ "operator": "match", "value": "orders" })),
            ]),
            tags: vec!["PII".to_string()],
            ..SearchFilters::default()
        };
        assert_eq!(compile(&filters).unwrap(), compile(&filters).unwrap());
        let dsl = compile(&filters).unwrap().to_dsl();
        assert_eq!(dsl["bool"]["must"][0], json!({ "term": { FIELD_TYPE_NAME: "Table" } }));
    }

    #[test]
    fn negative_has_any_value_excludes_populated_fields() {
        let filters = SearchFilters {
            negative_conditions: BTreeMap::from([(
                "description".to_string(),
                json!("has_any_value"),
            )]),
            ..SearchFilters::default()
        };
        let Clause::Bool(group) = compile(&filters).unwrap() else {
            panic!("expected bool clause");
        };
        assert_eq!(group.must_not, vec![Clause::exists("description.keyword")]);
    }

    #[test]
    fn zero_min_somes_drops_the_group() {
        let mut filters = SearchFilters {
            some_conditions: BTreeMap::from([
                ("certificate_status".to_string(), json!("VERIFIED")),
                ("owner_users".to_string(), json!("has_any_value")),
            ]),
            min_somes: 0,
            ..SearchFilters::default()
        };
        assert_eq!(
            compile(&filters).unwrap(),
            compile(&SearchFilters::default()).unwrap()
        );

        filters.min_somes = 3;
        assert_eq!(compile(&filters).unwrap_err().kind(), "InvalidFilterError");

        filters.min_somes = 2;
        let clause = compile(&filters).unwrap();
        let Some(Clause::Bool(group)) = must_clauses(&clause).last() else {
            panic!("expected should group");
        };
        assert_eq!(group.should.len(), 2);
        assert_eq!(group.minimum_should_match, Some(2));
    }

    #[test]
    fn state_condition_replaces_the_default_state_filter() {
        let filters = SearchFilters {
            conditions: BTreeMap::from([("status".to_string(), json!("DELETED"))]),
            ..SearchFilters::default()
        };
        let clause = compile(&filters).unwrap();
        assert_eq!(must_clauses(&clause), [Clause::term(FIELD_STATE, "DELETED")]);
    }

    #[test]
    fn unknown_asset_type_is_rejected() {
        let filters = SearchFilters {
            asset_type: Some("Spreadsheet".to_string()),
            ..SearchFilters::default()
        };
        assert_eq!(
            compile(&filters).unwrap_err(),
            CatalogError::UnknownAssetType("Spreadsheet".to_string())
        );
    }

    #[test]
    fn date_ranges_accept_millis_and_rfc3339() {
        let filters = SearchFilters {
            date_range: BTreeMap::from([(
                "create_time".to_string(),
                json!({ "gte": 1_640_995_200_000_i64, "lte": "2022-12-31T00:00:00Z" }),
            )]),
            include_archived: true,
            ..SearchFilters::default()
        };
        let clause = compile(&filters).unwrap();
        assert_eq!(
            must_clauses(&clause),
            [Clause::Range(RangeClause {
                field: "__timestamp".to_string(),
                gte: Some(json!(1_640_995_200_000_i64)),
                lte: Some(json!(1_672_444_800_000_i64)),
                ..RangeClause::default()
            })]
        );
    }

    #[test]
    fn inverted_or_malformed_date_ranges_are_rejected() {
        for bounds in [
            json!({ "gte": 20, "lte": 10 }),
            json!({ "after": 10 }),
            json!({}),
            json!({ "gte": "last tuesday" }),
            json!(5),
        ] {
            let filters = SearchFilters {
                date_range: BTreeMap::from([("update_time".to_string(), bounds)]),
                ..SearchFilters::default()
            };
            assert_eq!(compile(&filters).unwrap_err().kind(), "InvalidFilterError");
        }
    }

    #[test]
    fn propagated_tags_widen_the_tag_filter() {
        let filters = SearchFilters {
            tags: vec!["PII".to_string()],
            directly_tagged: false,
            include_archived: true,
            ..SearchFilters::default()
        };
        let clause = compile(&filters).unwrap();
        let [Clause::Bool(group)] = must_clauses(&clause) else {
            panic!("expected single tag group");
        };
        assert_eq!(group.should.len(), 2);
        assert_eq!(group.minimum_should_match, Some(1));
    }

    #[test]
    fn connection_prefix_and_guid_filters_compile() {
        let filters = SearchFilters {
            connection_qualified_name: Some("default/snowflake/123".to_string()),
            guids: vec!["g-1".to_string(), " ".to_string()],
            include_archived: true,
            ..SearchFilters::default()
        };
        let clause = compile(&filters).unwrap();
        assert_eq!(
            must_clauses(&clause),
            [
                Clause::Prefix {
                    field: FIELD_CONNECTION_QUALIFIED_NAME.to_string(),
                    value: "default/snowflake/123".to_string(),
                },
                Clause::terms(FIELD_GUID, ["g-1"]),
            ]
        );
    }

    #[test]
    fn condition_lists_match_any_element() {
        let statuses = json!(["VERIFIED", "DRAFT"]);
        let filters = SearchFilters {
            conditions: BTreeMap::from([("certificate_status".to_string(), statuses.clone())]),
            negative_conditions: BTreeMap::from([(
                "owner_users".to_string(),
                json!(["ana", { "operator": "startswith", "value": "ops-" }]),
            )]),
            ..SearchFilters::default()
        };
        let Clause::Bool(group) = compile(&filters).unwrap() else {
            panic!("expected bool clause");
        };
        assert_eq!(
            group.must.last(),
            Some(&Clause::Terms {
                field: "certificateStatus".to_string(),
                values: vec![json!("VERIFIED"), json!("DRAFT")],
            })
        );
        let [Clause::Bool(excluded)] = group.must_not.as_slice() else {
            panic!("expected one any-of group in must_not");
        };
        assert_eq!(excluded.should.len(), 2);
        assert_eq!(excluded.minimum_should_match, Some(1));

        let some = SearchFilters {
            some_conditions: BTreeMap::from([("certificate_status".to_string(), statuses)]),
            ..SearchFilters::default()
        };
        let clause = compile(&some).unwrap();
        let Some(Clause::Bool(should_group)) = must_clauses(&clause).last() else {
            panic!("expected should group");
        };
        assert_eq!(should_group.should.len(), 2);
    }
}
