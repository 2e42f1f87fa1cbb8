//! Argument validation against a tool's JSON parameter schema
//!
//! Only the subset of JSON Schema the built-in tools declare is checked:
//! `required`, per-property `type`, and `enum`. Unknown keywords are ignored.

use serde_json::{Map, Value};

/// Check `args` against `schema`, returning a readable reason on mismatch.
pub fn validate_arguments(schema: &Value, args: &Map<String, Value>) -> Result<(), String> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            match args.get(name) {
                None | Some(Value::Null) => return Err(format!("{} is required", name)),
                Some(_) => {}
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, value) in args {
        let Some(prop) = properties.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        if let Some(expected) = prop.get("type").and_then(Value::as_str) {
            if !matches_type(expected, value) {
                return Err(format!(
                    "{} must be of type {}, got {}",
                    name,
                    expected,
                    type_name(value)
                ));
            }
        }

        if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(format!("{} must be one of [{}]", name, options.join(", ")));
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "enum": ["list", "kill"] },
                "pid": { "type": "integer" },
                "recursive": { "type": "boolean" }
            },
            "required": ["action"]
        })
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_arguments() {
        assert!(validate_arguments(&schema(), &args(json!({"action": "list", "pid": 4}))).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let err = validate_arguments(&schema(), &args(json!({"pid": 4}))).unwrap_err();
        assert_eq!(err, "action is required");
    }

    #[test]
    fn test_wrong_type() {
        let err = validate_arguments(&schema(), &args(json!({"action": "list", "pid": "4"}))).unwrap_err();
        assert!(err.contains("pid must be of type integer"));
    }

    #[test]
    fn test_enum_violation() {
        let err = validate_arguments(&schema(), &args(json!({"action": "stop"}))).unwrap_err();
        assert!(err.starts_with("action must be one of"));
    }

    #[test]
    fn test_unknown_properties_pass() {
        assert!(validate_arguments(&schema(), &args(json!({"action": "kill", "extra": 1}))).is_ok());
    }
}
