use std::fmt;

use serde_json::{Map, Value, json};

/// Boolean clause tree understood by the catalog's document index.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    MatchAll,
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value> },
    Exists { field: String },
    Match { field: String, text: String },
    Prefix { field: String, value: String },
    Range(RangeClause),
    Bool(BoolClause),
}

/// Numeric or lexical range over a single field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeClause {
    pub field: String,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

/// Conjunction, exclusion, and threshold-disjunction groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolClause {
    pub must: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub should: Vec<Clause>,
    pub minimum_should_match: Option<usize>,
}

impl BoolClause {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }

    /// Should-members that must match; the index defaults to 1 without must clauses.
    #[must_use]
    pub fn effective_minimum_should_match(&self) -> usize {
        self.minimum_should_match.unwrap_or_else(|| {
            usize::from(self.must.is_empty() && !self.should.is_empty())
        })
    }
}

impl Clause {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    /// Field targeted by a leaf clause.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Term { field, .. }
            | Self::Terms { field, .. }
            | Self::Exists { field }
            | Self::Match { field, .. }
            | Self::Prefix { field, .. } => Some(field.as_str()),
            Self::Range(range) => Some(range.field.as_str()),
            Self::MatchAll | Self::Bool(_) => None,
        }
    }

    /// Serializes the clause into the index query DSL.
    #[must_use]
    pub fn to_dsl(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::Match { field, text } => json!({ "match": { field.as_str(): text } }),
            Self::Prefix { field, value } => json!({ "prefix": { field.as_str(): value } }),
            Self::Range(range) => {
                let mut bounds = Map::new();
                for (key, bound) in [
                    ("gt", &range.gt),
                    ("gte", &range.gte),
                    ("lt", &range.lt),
                    ("lte", &range.lte),
                ] {
                    if let Some(bound) = bound {
                        bounds.insert(key.to_string(), bound.clone());
                    }
                }
                json!({ "range": { range.field.as_str(): bounds } })
            }
            Self::Bool(group) => {
                let mut body = Map::new();
                for (key, clauses) in [
                    ("must", &group.must),
                    ("must_not", &group.must_not),
                    ("should", &group.should),
                ] {
                    if !clauses.is_empty() {
                        body.insert(
                            key.to_string(),
                            Value::Array(clauses.iter().map(Self::to_dsl).collect()),
                        );
                    }
                }
                if let Some(minimum) = group.minimum_should_match {
                    body.insert("minimum_should_match".to_string(), json!(minimum));
                }
                json!({ "bool": body })
            }
        }
    }

    /// Parses the DSL subset this crate emits, plus `filter` and `function_score` wrappers.
    ///
    /// # Errors
    /// Returns `DslError` naming the first unsupported or malformed construct.
    pub fn from_dsl(value: &Value) -> Result<Self, DslError> {
        let object = value
            .as_object()
            .ok_or_else(|| DslError::new("query clause must be an object"))?;
        let mut entries = object.iter();
        let (Some((kind, body)), None) = (entries.next(), entries.next()) else {
            return Err(DslError::new("query clause must have exactly one key"));
        };

        match kind.as_str() {
            "match_all" => Ok(Self::MatchAll),
            "term" => {
                let (field, value) = single_field(kind, body)?;
                let value = value
                    .as_object()
                    .and_then(|inner| inner.get("value"))
                    .unwrap_or(value)
                    .clone();
                Ok(Self::Term { field, value })
            }
            "terms" => {
                let (field, value) = single_field(kind, body)?;
                let values = value
                    .as_array()
                    .ok_or_else(|| DslError::new("terms values must be an array"))?
                    .clone();
                Ok(Self::Terms { field, values })
            }
            "exists" => {
                let field = body
                    .get("field")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DslError::new("exists requires a field"))?;
                Ok(Self::exists(field))
            }
            "match" | "match_phrase" => {
                let (field, value) = single_field(kind, body)?;
                let text = value
                    .as_object()
                    .and_then(|inner| inner.get("query"))
                    .unwrap_or(value);
                let text = scalar_text(text)
                    .ok_or_else(|| DslError::new("match query must be a scalar"))?;
                Ok(Self::Match { field, text })
            }
            "prefix" => {
                let (field, value) = single_field(kind, body)?;
                let value = value
                    .as_object()
                    .and_then(|inner| inner.get("value"))
                    .unwrap_or(value);
                let value = value
                    .as_str()
                    .ok_or_else(|| DslError::new("prefix value must be a string"))?
                    .to_string();
                Ok(Self::Prefix { field, value })
            }
            "range" => {
                let (field, bounds) = single_field(kind, body)?;
                let bounds = bounds
                    .as_object()
                    .ok_or_else(|| DslError::new("range bounds must be an object"))?;
                Ok(Self::Range(RangeClause {
                    field,
                    gt: bounds.get("gt").cloned(),
                    gte: bounds.get("gte").cloned(),
                    lt: bounds.get("lt").cloned(),
                    lte: bounds.get("lte").cloned(),
                }))
            }
            "bool" => parse_bool(body).map(Self::Bool),
            "function_score" | "constant_score" => {
                let inner = body.get("query").or_else(|| body.get("filter"));
                inner.map_or(Ok(Self::MatchAll), Self::from_dsl)
            }
            other => Err(DslError::new(format!("unsupported query clause: {other}"))),
        }
    }
}

fn single_field<'a>(kind: &str, body: &'a Value) -> Result<(String, &'a Value), DslError> {
    let object = body
        .as_object()
        .ok_or_else(|| DslError::new(format!("{kind} body must be an object")))?;
    let mut entries = object.iter().filter(|(key, _)| key.as_str() != "boost");
    match (entries.next(), entries.next()) {
        (Some((field, value)), None) => Ok((field.clone(), value)),
        _ => Err(DslError::new(format!("{kind} must name exactly one field"))),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn parse_bool(body: &Value) -> Result<BoolClause, DslError> {
    let object = body
        .as_object()
        .ok_or_else(|| DslError::new("bool body must be an object"))?;
    let mut group = BoolClause::default();
    for (key, value) in object {
        match key.as_str() {
            "must" | "filter" => group.must.extend(parse_clause_list(value)?),
            "must_not" => group.must_not.extend(parse_clause_list(value)?),
            "should" => group.should.extend(parse_clause_list(value)?),
            "minimum_should_match" => {
                group.minimum_should_match = Some(parse_minimum(value)?);
            }
            "boost" | "_name" => {}
            other => {
                return Err(DslError::new(format!("unsupported bool key: {other}")));
            }
        }
    }
    Ok(group)
}

fn parse_clause_list(value: &Value) -> Result<Vec<Clause>, DslError> {
    match value {
        Value::Array(items) => items.iter().map(Clause::from_dsl).collect(),
        other => Clause::from_dsl(other).map(|clause| vec![clause]),
    }
}

fn parse_minimum(value: &Value) -> Result<usize, DslError> {
    let parsed = match value {
        Value::Number(number) => number.as_u64().and_then(|raw| usize::try_from(raw).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| DslError::new("minimum_should_match must be a non-negative integer"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

/// Sort key applied to a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    #[must_use]
    pub fn to_dsl(&self) -> Value {
        json!({ self.field.as_str(): { "order": self.order.as_str() } })
    }

    /// Parses one sort entry: `"field"`, `{"field": "desc"}`, or `{"field": {"order": "desc"}}`.
    ///
    /// # Errors
    /// Returns `DslError` when the entry does not follow one of those shapes.
    pub fn from_dsl(value: &Value) -> Result<Self, DslError> {
        match value {
            Value::String(field) => Ok(Self::new(field.clone(), SortOrder::Asc)),
            Value::Object(object) if object.len() == 1 => {
                let Some((field, spec)) = object.iter().next() else {
                    return Err(DslError::new("sort entry is empty"));
                };
                let order = spec
                    .get("order")
                    .unwrap_or(spec)
                    .as_str()
                    .map_or(Some(SortOrder::Asc), SortOrder::parse)
                    .ok_or_else(|| DslError::new(format!("invalid sort order for {field}")))?;
                Ok(Self::new(field.clone(), order))
            }
            _ => Err(DslError::new("sort entry must name exactly one field")),
        }
    }
}

/// Error raised when a DSL payload cannot be mapped onto a clause tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DslError {
    message: String,
}

impl DslError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DslError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_clause_serializes_only_populated_groups() {
        let clause = Clause::Bool(BoolClause {
            must: vec![Clause::term("__state", "ACTIVE")],
            must_not: vec![Clause::exists("description.keyword")],
            should: Vec::new(),
            minimum_should_match: None,
        });
        assert_eq!(
            clause.to_dsl(),
            json!({
                "bool": {
                    "must": [{ "term": { "__state": "ACTIVE" } }],
                    "must_not": [{ "exists": { "field": "description.keyword" } }]
                }
            })
        );
    }

    #[test]
    fn parses_filter_context_and_function_score_wrappers() {
        let dsl = json!({
            "function_score": {
                "query": {
                    "bool": {
                        "filter": [{ "terms": { "certificateStatus": ["VERIFIED"] } }],
                        "must_not": { "term": { "isPartial": { "value": true } } },
                        "minimum_should_match": "1"
                    }
                },
                "score_mode": "sum"
            }
        });
        let clause = Clause::from_dsl(&dsl).expect("dsl should parse");
        let Clause::Bool(group) = clause else {
            panic!("expected bool clause");
        };
        assert_eq!(group.must, vec![Clause::terms("certificateStatus", ["VERIFIED"])]);
        assert_eq!(group.must_not, vec![Clause::term("isPartial", true)]);
        assert_eq!(group.minimum_should_match, Some(1));
    }

    #[test]
    fn rejects_unsupported_clauses() {
        let err = Clause::from_dsl(&json!({ "nested": { "path": "x" } })).unwrap_err();
        assert!(err.to_string().contains("nested"));
        assert!(Clause::from_dsl(&json!({ "term": {}, "match": {} })).is_err());
    }

    #[test]
    fn should_defaults_to_one_without_must() {
        let group = BoolClause {
            should: vec![Clause::MatchAll],
            ..BoolClause::default()
        };
        assert_eq!(group.effective_minimum_should_match(), 1);
        let group = BoolClause {
            must: vec![Clause::MatchAll],
            should: vec![Clause::MatchAll],
            ..BoolClause::default()
        };
        assert_eq!(group.effective_minimum_should_match(), 0);
    }

    #[test]
    fn sort_entries_accept_common_shapes() {
        assert_eq!(
            SortSpec::from_dsl(&json!({ "_score": { "order": "desc" } })),
            Ok(SortSpec::new("_score", SortOrder::Desc))
        );
        assert_eq!(
            SortSpec::from_dsl(&json!({ "name.keyword": "desc" })),
            Ok(SortSpec::new("name.keyword", SortOrder::Desc))
        );
        assert_eq!(
            SortSpec::from_dsl(&json!("__guid")),
            Ok(SortSpec::new("__guid", SortOrder::Asc))
        );
    }
}
