//! JSON Schema 工具
//!
//! - validate_value_against_schema：按工具声明的 schema 校验输入（type / required / properties / additionalProperties / enum / items 子集）
//! - json_schema_for：用 schemars 生成结构化输出的 Schema，拼入 system prompt，减少推理能力输出格式错误

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 返回类型 T 的 JSON Schema 字符串，可拼入 system prompt
pub fn json_schema_for<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 校验 value 是否满足 schema；null schema 表示不限
pub fn validate_value_against_schema(value: &Value, schema: &Value, path: &str) -> Result<(), String> {
    if schema.is_null() {
        return Ok(());
    }
    let schema_obj = schema
        .as_object()
        .ok_or_else(|| format!("schema at '{path}' must be an object"))?;

    if let Some(type_spec) = schema_obj.get("type") {
        validate_json_type(value, type_spec, path)?;
    }

    if let Some(variants) = schema_obj.get("enum").and_then(|v| v.as_array()) {
        if !variants.iter().any(|candidate| candidate == value) {
            return Err(format!("{path} is not one of the allowed enum values"));
        }
    }

    if let Some(required) = schema_obj.get("required").and_then(|v| v.as_array()) {
        let object = value
            .as_object()
            .ok_or_else(|| format!("{path} must be an object for required fields"))?;
        for key in required.iter().filter_map(|v| v.as_str()) {
            if !object.contains_key(key) {
                return Err(format!("{path} missing required field '{key}'"));
            }
        }
    }

    if let Some(properties) = schema_obj.get("properties").and_then(|v| v.as_object()) {
        if let Some(object) = value.as_object() {
            for (key, property_schema) in properties {
                if let Some(child) = object.get(key) {
                    validate_value_against_schema(child, property_schema, &format!("{path}.{key}"))?;
                }
            }
            if schema_obj.get("additionalProperties").and_then(|v| v.as_bool()) == Some(false) {
                if let Some(unknown) = object.keys().find(|k| !properties.contains_key(*k)) {
                    return Err(format!("{path} contains unknown field '{unknown}'"));
                }
            }
        }
    }

    if let Some(item_schema) = schema_obj.get("items") {
        if let Some(array) = value.as_array() {
            for (idx, item) in array.iter().enumerate() {
                validate_value_against_schema(item, item_schema, &format!("{path}[{idx}]"))?;
            }
        }
    }

    Ok(())
}

fn validate_json_type(value: &Value, type_spec: &Value, path: &str) -> Result<(), String> {
    let matches = |t: &str| match t {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => false,
    };

    match type_spec {
        Value::String(name) if matches(name) => Ok(()),
        Value::String(name) => Err(format!("{path} expected type '{name}'")),
        Value::Array(types) if types.iter().filter_map(|t| t.as_str()).any(matches) => Ok(()),
        Value::Array(_) => Err(format!("{path} did not match any allowed types")),
        _ => Err(format!("{path} schema.type must be string or array")),
    }
}
