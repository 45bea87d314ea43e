use crate::serialize::SerializeError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Serialize a value into a JSON tree.
pub(super) fn to_value<T>(t: &T) -> Result<Value, SerializeError>
where
    T: Serialize,
{
    serde_json::to_value(t).map_err(|e| SerializeError::Serialize(e.to_string()))
}

/// Deserialize a JSON tree into a value.
pub(super) fn from_value<T>(value: Value) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|e| SerializeError::Deserialize(e.to_string()))
}

// Short type label for diagnostics.
pub(super) const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
