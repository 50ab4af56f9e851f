use serde_json::{Map, Value};

use crate::error::{CatalogError, CatalogResult};

/// Bare string value that asks for "field exists" instead of equality.
pub const HAS_ANY_VALUE: &str = "has_any_value";

/// Operators accepted inside `{"operator": .., "value": ..}` condition objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Eq,
    Match,
    HasAnyValue,
    StartsWith,
    Within,
    Between,
    Gt,
    Gte,
    Lt,
    Lte,
}

const OPERATOR_TOKENS: &[(&str, ConditionOperator)] = &[
    ("eq", ConditionOperator::Eq),
    ("match", ConditionOperator::Match),
    ("has_any_value", ConditionOperator::HasAnyValue),
    ("startswith", ConditionOperator::StartsWith),
    ("starts_with", ConditionOperator::StartsWith),
    ("within", ConditionOperator::Within),
    ("in", ConditionOperator::Within),
    ("between", ConditionOperator::Between),
    ("gt", ConditionOperator::Gt),
    ("gte", ConditionOperator::Gte),
    ("lt", ConditionOperator::Lt),
    ("lte", ConditionOperator::Lte),
];

impl ConditionOperator {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        OPERATOR_TOKENS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, operator)| *operator)
    }

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Match => "match",
            Self::HasAnyValue => "has_any_value",
            Self::StartsWith => "startswith",
            Self::Within => "within",
            Self::Between => "between",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }

    fn accepted_tokens() -> String {
        OPERATOR_TOKENS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Operand carried by a parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    None,
    Scalar(Value),
    List(Vec<Value>),
    Pair(Value, Value),
}

/// One predicate over an attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

/// Expands one filter entry into conditions.
///
/// A list value yields one condition per element; an object value must carry
/// an `operator` token and, except for `has_any_value`, a `value`.
///
/// # Errors
/// Returns `InvalidFilter` when the entry has no usable shape.
pub fn parse_conditions(attribute: &str, raw: &Value) -> CatalogResult<Vec<Condition>> {
    if attribute.trim().is_empty() {
        return Err(CatalogError::invalid_filter("condition attribute name is empty"));
    }
    match raw {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(CatalogError::invalid_filter(format!(
                    "condition list for {attribute} is empty"
                )));
            }
            items
                .iter()
                .map(|item| match item {
                    Value::Array(_) => Err(CatalogError::invalid_filter(format!(
                        "nested lists are not allowed in conditions for {attribute}"
                    ))),
                    other => parse_single(attribute, other),
                })
                .collect()
        }
        other => parse_single(attribute, other).map(|condition| vec![condition]),
    }
}

fn parse_single(attribute: &str, raw: &Value) -> CatalogResult<Condition> {
    let (operator, value) = match raw {
        Value::Null => {
            return Err(CatalogError::invalid_filter(format!(
                "condition for {attribute} has no value"
            )));
        }
        Value::String(text) if text.trim().eq_ignore_ascii_case(HAS_ANY_VALUE) => {
            (ConditionOperator::HasAnyValue, ConditionValue::None)
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            (ConditionOperator::Eq, ConditionValue::Scalar(raw.clone()))
        }
        Value::Object(object) => parse_operator_object(attribute, object)?,
        Value::Array(_) => {
            return Err(CatalogError::invalid_filter(format!(
                "unexpected list in condition for {attribute}"
            )));
        }
    };
    Ok(Condition {
        attribute: attribute.to_string(),
        operator,
        value,
    })
}

fn parse_operator_object(
    attribute: &str,
    object: &Map<String, Value>,
) -> CatalogResult<(ConditionOperator, ConditionValue)> {
    let token = object
        .get("operator")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CatalogError::invalid_filter(format!(
                "condition object for {attribute} requires a string 'operator'"
            ))
        })?;
    let operator = ConditionOperator::from_token(token).ok_or_else(|| {
        CatalogError::invalid_filter(format!(
            "unknown operator '{token}' for {attribute} (expected one of: {})",
            ConditionOperator::accepted_tokens()
        ))
    })?;

    if operator == ConditionOperator::HasAnyValue {
        return Ok((operator, ConditionValue::None));
    }

    let value = object.get("value").filter(|value| !value.is_null()).ok_or_else(|| {
        CatalogError::invalid_filter(format!(
            "operator '{}' for {attribute} requires a value",
            operator.token()
        ))
    })?;

    let operand = match operator {
        ConditionOperator::Match | ConditionOperator::StartsWith => {
            if !value.is_string() {
                return Err(CatalogError::invalid_filter(format!(
                    "operator '{}' for {attribute} requires a string value",
                    operator.token()
                )));
            }
            ConditionValue::Scalar(value.clone())
        }
        ConditionOperator::Within => {
            let items = value.as_array().filter(|items| !items.is_empty()).ok_or_else(|| {
                CatalogError::invalid_filter(format!(
                    "operator 'within' for {attribute} requires a non-empty list"
                ))
            })?;
            for item in items {
                require_scalar(attribute, operator, item)?;
            }
            ConditionValue::List(items.clone())
        }
        ConditionOperator::Between => match value.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                require_scalar(attribute, operator, low)?;
                require_scalar(attribute, operator, high)?;
                ConditionValue::Pair(low.clone(), high.clone())
            }
            _ => {
                return Err(CatalogError::invalid_filter(format!(
                    "operator 'between' for {attribute} requires exactly two values"
                )));
            }
        },
        ConditionOperator::Eq
        | ConditionOperator::Gt
        | ConditionOperator::Gte
        | ConditionOperator::Lt
        | ConditionOperator::Lte => {
            require_scalar(attribute, operator, value)?;
            ConditionValue::Scalar(value.clone())
        }
        ConditionOperator::HasAnyValue => ConditionValue::None,
    };
    Ok((operator, operand))
}

fn require_scalar(attribute: &str, operator: ConditionOperator, value: &Value) -> CatalogResult<()> {
    if matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
        Ok(())
    } else {
        Err(CatalogError::invalid_filter(format!(
            "operator '{}' for {attribute} requires scalar values",
            operator.token()
        )))
    }
}
