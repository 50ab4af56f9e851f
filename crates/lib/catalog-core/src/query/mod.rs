//! Filter compilation into the index query DSL.

pub mod clause;
pub mod compiler;
pub mod fields;
pub mod operator;

pub use clause::{BoolClause, Clause, DslError, RangeClause, SortOrder, SortSpec};
pub use compiler::{SearchFilters, compile};
pub use fields::{ResolvedField, entity_attribute, projected_attribute, resolve_field};
pub use operator::{Condition, ConditionOperator, ConditionValue, HAS_ANY_VALUE, parse_conditions};
