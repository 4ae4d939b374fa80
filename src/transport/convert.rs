//! Conversions between protobuf well-known types and JSON.
//!
//! Kubernetes objects travel as `google.protobuf.Struct`. Struct numbers are
//! always doubles, so whole numbers are turned back into JSON integers on the
//! way in; otherwise every replica count would come back as `3.0`.

use std::time::Duration;

use serde_json::{Map, Number, Value};

use crate::error::TransportError;

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Converts a protobuf Struct into a JSON object.
pub fn struct_to_json(s: prost_types::Struct) -> Result<Map<String, Value>, TransportError> {
    s.fields
        .into_iter()
        .map(|(key, value)| value_to_json(value).map(|v| (key, v)))
        .collect()
}

/// Converts a protobuf Value into JSON.
pub fn value_to_json(value: prost_types::Value) -> Result<Value, TransportError> {
    use prost_types::value::Kind;

    let Some(kind) = value.kind else {
        return Err(TransportError::InvalidStruct {
            message: "value has no kind set".to_string(),
        });
    };

    Ok(match kind {
        Kind::NullValue(_) => Value::Null,
        Kind::BoolValue(b) => Value::Bool(b),
        Kind::StringValue(s) => Value::String(s),
        Kind::NumberValue(n) => number_to_json(n),
        Kind::StructValue(s) => Value::Object(struct_to_json(s)?),
        Kind::ListValue(list) => Value::Array(
            list.values
                .into_iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Value::Number(Number::from(n as i64));
    }
    // Non-finite numbers have no JSON representation.
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// Converts a JSON object into a protobuf Struct.
#[must_use]
pub fn json_to_struct(map: Map<String, Value>) -> prost_types::Struct {
    prost_types::Struct {
        fields: map
            .into_iter()
            .map(|(key, value)| (key, json_to_value(value)))
            .collect(),
    }
}

/// Converts JSON into a protobuf Value.
#[must_use]
pub fn json_to_value(value: Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Kind::StringValue(s),
        Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.into_iter().map(json_to_value).collect(),
        }),
        Value::Object(map) => Kind::StructValue(json_to_struct(map)),
    };
    prost_types::Value { kind: Some(kind) }
}

/// Converts a TTL into a protobuf Duration.
#[must_use]
pub fn duration_to_proto(ttl: Duration) -> prost_types::Duration {
    prost_types::Duration {
        seconds: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        nanos: i32::try_from(ttl.subsec_nanos()).unwrap_or(0),
    }
}
