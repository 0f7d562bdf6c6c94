//! Boundary checks for structured payloads entering the store.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Serialize a setting value. Any JSON value except `null` is accepted.
pub fn setting_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
  let value = serde_json::to_value(value)?;
  if value.is_null() {
    return Err(StoreError::InvalidPayload(
      "setting value must not be null".to_string(),
    ));
  }
  Ok(value)
}

/// Serialize a draft or cache payload, which must be a JSON object or array.
pub fn structured<T: Serialize + ?Sized>(what: &str, value: &T) -> Result<Value> {
  let value = serde_json::to_value(value)?;
  if !(value.is_object() || value.is_array()) {
    return Err(StoreError::InvalidPayload(format!(
      "{} must be a JSON object or array, got {}",
      what,
      kind(&value)
    )));
  }
  Ok(value)
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_setting_accepts_scalars() {
    assert_eq!(setting_value("dark").unwrap(), json!("dark"));
    assert_eq!(setting_value(&3).unwrap(), json!(3));
    assert_eq!(setting_value(&true).unwrap(), json!(true));
  }

  #[test]
  fn test_setting_rejects_null() {
    let err = setting_value(&Option::<String>::None).unwrap_err();
    assert!(matches!(err, StoreError::InvalidPayload(_)));
  }

  #[test]
  fn test_structured_accepts_objects_and_arrays() {
    assert_eq!(structured("content", &json!({"a": 1})).unwrap(), json!({"a": 1}));
    assert_eq!(structured("content", &vec![1, 2]).unwrap(), json!([1, 2]));
  }

  #[test]
  fn test_structured_rejects_scalars_and_null() {
    let err = structured("content", "text").unwrap_err();
    assert_eq!(
      err.to_string(),
      "invalid payload: content must be a JSON object or array, got string"
    );
    assert!(structured("content", &json!(null)).is_err());
    assert!(structured("content", &7).is_err());
  }
}
