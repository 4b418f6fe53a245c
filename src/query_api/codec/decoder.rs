//! Typed wire values to driver values.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::debug;

use super::{spatial, temporal, IntegerMode};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::types::{InvalidValue, Node, Path, PathSegment, Relationship, Value};
use crate::query_api::wire::{WireNode, WireRelationship, WireValue};

/// Decodes wire values with one integer representation for the whole call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    mode: IntegerMode,
}

impl Decoder {
    pub fn new(mode: IntegerMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> IntegerMode {
        self.mode
    }

    /// Decode one result row.
    pub fn decode_row(&self, row: &[WireValue]) -> DriverResult<Vec<Value>> {
        row.iter().map(|value| self.decode(value)).collect()
    }

    /// Decode one value.
    pub fn decode(&self, value: &WireValue) -> DriverResult<Value> {
        Ok(match value {
            WireValue::Null => Value::Null,
            WireValue::Boolean(b) => Value::Boolean(*b),
            WireValue::Integer(text) => self.decode_integer(text)?,
            WireValue::Float(text) => Value::Float(parse_float(text)?),
            WireValue::String(s) => Value::String(s.clone()),
            WireValue::Base64(text) => Value::Bytes(
                BASE64
                    .decode(text)
                    .map_err(|e| DriverError::protocol(format!("Invalid Base64 value: {}", e)))?,
            ),
            WireValue::Date(text) => Value::Date(temporal::parse_date(text)?),
            WireValue::Time(text) => Value::Time(temporal::parse_time(text)?),
            WireValue::LocalTime(text) => Value::LocalTime(temporal::parse_local_time(text)?),
            WireValue::OffsetDateTime(text) => Value::DateTime(temporal::parse_offset_date_time(text)?),
            WireValue::ZonedDateTime(text) => Value::ZonedDateTime(temporal::parse_zoned_date_time(text)?),
            WireValue::LocalDateTime(text) => Value::LocalDateTime(temporal::parse_local_date_time(text)?),
            WireValue::Duration(text) => Value::Duration(temporal::parse_duration(text)?),
            // A bad point poisons only its own field.
            WireValue::Point(text) => match spatial::parse_point(text) {
                Ok(point) => Value::Point(point),
                Err(error) => {
                    debug!(raw = %text, "undecodable point kept as invalid field");
                    Value::Invalid(InvalidValue::new("Point", text.clone(), error))
                }
            },
            WireValue::List(items) => Value::List(self.decode_row(items)?),
            WireValue::Map(entries) => Value::Map(self.decode_entries(entries)?),
            WireValue::Node(node) => Value::Node(self.decode_node(node)?),
            WireValue::Relationship(rel) => Value::Relationship(self.decode_relationship(rel)?),
            WireValue::Path(items) => Value::Path(self.decode_path(items)?),
        })
    }

    fn decode_integer(&self, text: &str) -> DriverResult<Value> {
        let out_of_range = || DriverError::protocol(format!("Invalid Integer value: {}", text));
        match self.mode {
            IntegerMode::Lossless => text.parse::<i64>().map(Value::Integer).map_err(|_| out_of_range()),
            IntegerMode::Number => {
                if text.is_empty() || !text.trim_start_matches('-').bytes().all(|b| b.is_ascii_digit()) {
                    return Err(out_of_range());
                }
                text.parse::<f64>().map(Value::Number).map_err(|_| out_of_range())
            }
            IntegerMode::BigInt => text.parse::<i128>().map(Value::BigInt).map_err(|_| out_of_range()),
        }
    }

    fn decode_entries(&self, entries: &[(String, WireValue)]) -> DriverResult<HashMap<String, Value>> {
        entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.decode(value)?)))
            .collect()
    }

    fn decode_node(&self, node: &WireNode) -> DriverResult<Node> {
        Ok(Node::new(
            node.element_id.clone(),
            node.labels.clone(),
            self.decode_entries(&node.properties)?,
        ))
    }

    fn decode_relationship(&self, rel: &WireRelationship) -> DriverResult<Relationship> {
        Ok(Relationship::new(
            rel.element_id.clone(),
            rel.start_node_element_id.clone(),
            rel.end_node_element_id.clone(),
            rel.rel_type.clone(),
            self.decode_entries(&rel.properties)?,
        ))
    }

    /// Fold an alternating node/relationship list into segments.
    ///
    /// Each segment ends on the node the next one starts from.
    fn decode_path(&self, items: &[WireValue]) -> DriverResult<Path> {
        let malformed = || DriverError::protocol(format!("Malformed path of {} elements", items.len()));
        if items.len() % 2 == 0 {
            return Err(malformed());
        }

        let start = match &items[0] {
            WireValue::Node(node) => self.decode_node(node)?,
            _ => return Err(malformed()),
        };

        let mut current = start.clone();
        let mut segments = Vec::with_capacity(items.len() / 2);
        for pair in items[1..].chunks(2) {
            let (WireValue::Relationship(rel), WireValue::Node(node)) = (&pair[0], &pair[1]) else {
                return Err(malformed());
            };
            let end = self.decode_node(node)?;
            segments.push(PathSegment {
                start: current,
                relationship: self.decode_relationship(rel)?,
                end: end.clone(),
            });
            current = end;
        }

        Ok(Path::new(start, current, segments))
    }
}

fn parse_float(text: &str) -> DriverResult<f64> {
    match text {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        _ => text
            .parse()
            .map_err(|_| DriverError::protocol(format!("Invalid Float value: {}", text))),
    }
}
