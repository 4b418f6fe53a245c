//! Driver values to typed wire values.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::{spatial, temporal};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::types::Value;
use crate::query_api::wire::WireValue;

/// Encode a parameter value.
///
/// Graph entities are server-side only and cannot be sent back as
/// parameters; undecodable fields surface their original error.
pub fn encode(value: &Value) -> DriverResult<WireValue> {
    Ok(match value {
        Value::Null => WireValue::Null,
        Value::Boolean(b) => WireValue::Boolean(*b),
        Value::Integer(i) => WireValue::Integer(i.to_string()),
        Value::BigInt(i) => WireValue::Integer(i.to_string()),
        Value::Number(n) => encode_number(*n),
        Value::Float(f) => WireValue::Float(format_float(*f)),
        Value::String(s) => WireValue::String(s.clone()),
        Value::Bytes(b) => WireValue::Base64(BASE64.encode(b)),
        Value::List(items) => WireValue::List(items.iter().map(encode).collect::<DriverResult<_>>()?),
        Value::Map(map) => {
            let mut entries = map
                .iter()
                .map(|(key, value)| Ok((key.clone(), encode(value)?)))
                .collect::<DriverResult<Vec<_>>>()?;
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            WireValue::Map(entries)
        }
        Value::Point(point) => WireValue::Point(spatial::format_point(point)),
        Value::Date(date) => WireValue::Date(temporal::format_date(date)),
        Value::Time(time) => WireValue::Time(temporal::format_time(time)),
        Value::LocalTime(time) => WireValue::LocalTime(temporal::format_local_time(time)),
        Value::DateTime(dt) => WireValue::OffsetDateTime(temporal::format_offset_date_time(dt)),
        Value::ZonedDateTime(dt) => WireValue::ZonedDateTime(temporal::format_zoned_date_time(dt)?),
        Value::LocalDateTime(dt) => WireValue::LocalDateTime(temporal::format_local_date_time(dt)),
        Value::Duration(d) => WireValue::Duration(temporal::format_duration(d)),
        Value::Node(_) | Value::Relationship(_) | Value::Path(_) => {
            return Err(DriverError::protocol(format!(
                "{} values cannot be used as query parameters",
                value.type_name()
            )))
        }
        Value::Invalid(invalid) => return Err(invalid.error.clone()),
    })
}

/// Integers decoded as `f64` go back out as integers when they still are.
fn encode_number(n: f64) -> WireValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 2f64.powi(63) {
        WireValue::Integer((n as i64).to_string())
    } else {
        WireValue::Float(format_float(n))
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::driver::types::{InvalidValue, Node};

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&Value::Integer(-7)).unwrap(), WireValue::Integer("-7".into()));
        assert_eq!(
            encode(&Value::BigInt(1 << 80)).unwrap(),
            WireValue::Integer("1208925819614629174706176".into())
        );
        assert_eq!(encode(&Value::Number(3.0)).unwrap(), WireValue::Integer("3".into()));
        assert_eq!(encode(&Value::Float(0.5)).unwrap(), WireValue::Float("0.5".into()));
        assert_eq!(encode(&Value::Float(f64::NAN)).unwrap(), WireValue::Float("NaN".into()));
        assert_eq!(encode(&Value::Bytes(vec![1, 2, 3])).unwrap(), WireValue::Base64("AQID".into()));
    }

    #[test]
    fn test_encode_map_sorted() {
        let mut map = HashMap::new();
        map.insert("b".to_string(), Value::Boolean(true));
        map.insert("a".to_string(), Value::Null);

        assert_eq!(
            encode(&Value::Map(map)).unwrap(),
            WireValue::Map(vec![
                ("a".into(), WireValue::Null),
                ("b".into(), WireValue::Boolean(true)),
            ])
        );
    }

    #[test]
    fn test_encode_rejects_entities() {
        let node = Value::Node(Node::new("n", vec![], HashMap::new()));
        assert!(matches!(encode(&node), Err(DriverError::Protocol(_))));

        let error = DriverError::protocol("Invalid point: x");
        let invalid = Value::Invalid(InvalidValue::new("Point", "x", error.clone()));
        assert_eq!(encode(&Value::List(vec![invalid])).unwrap_err(), error);
    }
}
