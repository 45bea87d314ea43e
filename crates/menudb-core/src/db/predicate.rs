use crate::{db::path::FieldPath, serialize::Document};
use serde_json::Value;
use std::cmp::Ordering;

///
/// CompareOp
///
/// Operators a parent-discovery query may use.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    ArrayContains,
}

///
/// Predicate
///
/// One `(field, operator, value)` filter over a collection.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub field: FieldPath,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    #[must_use]
    pub const fn new(field: FieldPath, op: CompareOp, value: Value) -> Self {
        Self { field, op, value }
    }

    #[must_use]
    pub fn eq(field: FieldPath, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::Eq, value.into())
    }

    #[must_use]
    pub fn gt(field: FieldPath, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::Gt, value.into())
    }

    #[must_use]
    pub fn array_contains(field: FieldPath, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::ArrayContains, value.into())
    }

    /// Match documents where `field` holds a non-empty string.
    ///
    /// This is the range form used to ask "does map entry `<id>` exist",
    /// by probing a string field every entry carries (`menus.<id>.name`).
    #[must_use]
    pub fn non_empty_string(field: FieldPath) -> Self {
        Self::gt(field, "")
    }

    /// Evaluate this predicate against one document body.
    ///
    /// Missing fields never match. Ordering operators compare numbers with
    /// numbers and strings with strings; mixed types never match.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        let Some(actual) = lookup(document, &self.field) else {
            return false;
        };

        match self.op {
            CompareOp::Eq => actual == &self.value,
            CompareOp::ArrayContains => match actual {
                Value::Array(items) => items.contains(&self.value),
                _ => false,
            },
            CompareOp::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            CompareOp::Lte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            CompareOp::Gte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Resolve a field path inside a document.
#[must_use]
pub fn lookup<'a>(document: &'a Document, field: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = field.segments().split_first()?;
    let mut current = document.get(first)?;

    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

// Same-type ordering only.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        _ => None,
    }
}

///
/// TESTS
///
