//! Typed JSON values as they appear on the wire.
//!
//! Every value is an object `{"$type": <tag>, "_value": <payload>}`. Scalars
//! that JSON cannot carry faithfully (integers, floats, temporals, points,
//! bytes) are string-encoded; containers nest further typed values.

use serde_json::{json, Map as JsonMap, Value as Json};

use crate::driver::error::{DriverError, DriverResult};

const TYPE_KEY: &str = "$type";
const VALUE_KEY: &str = "_value";

/// A node on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireNode {
    pub element_id: String,
    pub labels: Vec<String>,
    pub properties: Vec<(String, WireValue)>,
}

/// A relationship on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRelationship {
    pub element_id: String,
    pub start_node_element_id: String,
    pub end_node_element_id: String,
    pub rel_type: String,
    pub properties: Vec<(String, WireValue)>,
}

/// One typed JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Boolean(bool),
    Integer(String),
    Float(String),
    String(String),
    Base64(String),
    Date(String),
    Time(String),
    LocalTime(String),
    OffsetDateTime(String),
    ZonedDateTime(String),
    LocalDateTime(String),
    Duration(String),
    Point(String),
    List(Vec<WireValue>),
    /// Entries keep the order they were received in.
    Map(Vec<(String, WireValue)>),
    Node(WireNode),
    Relationship(WireRelationship),
    /// Alternating node, relationship, node, ...
    Path(Vec<WireValue>),
}

impl WireValue {
    /// The `$type` tag.
    pub fn type_tag(&self) -> &'static str {
        match self {
            WireValue::Null => "Null",
            WireValue::Boolean(_) => "Boolean",
            WireValue::Integer(_) => "Integer",
            WireValue::Float(_) => "Float",
            WireValue::String(_) => "String",
            WireValue::Base64(_) => "Base64",
            WireValue::Date(_) => "Date",
            WireValue::Time(_) => "Time",
            WireValue::LocalTime(_) => "LocalTime",
            WireValue::OffsetDateTime(_) => "OffsetDateTime",
            WireValue::ZonedDateTime(_) => "ZonedDateTime",
            WireValue::LocalDateTime(_) => "LocalDateTime",
            WireValue::Duration(_) => "Duration",
            WireValue::Point(_) => "Point",
            WireValue::List(_) => "List",
            WireValue::Map(_) => "Map",
            WireValue::Node(_) => "Node",
            WireValue::Relationship(_) => "Relationship",
            WireValue::Path(_) => "Path",
        }
    }

    /// Render as a typed JSON object.
    pub fn to_json(&self) -> Json {
        let payload = match self {
            WireValue::Null => Json::Null,
            WireValue::Boolean(b) => Json::Bool(*b),
            WireValue::Integer(s)
            | WireValue::Float(s)
            | WireValue::String(s)
            | WireValue::Base64(s)
            | WireValue::Date(s)
            | WireValue::Time(s)
            | WireValue::LocalTime(s)
            | WireValue::OffsetDateTime(s)
            | WireValue::ZonedDateTime(s)
            | WireValue::LocalDateTime(s)
            | WireValue::Duration(s)
            | WireValue::Point(s) => Json::String(s.clone()),
            WireValue::List(items) | WireValue::Path(items) => {
                Json::Array(items.iter().map(WireValue::to_json).collect())
            }
            WireValue::Map(entries) => Json::Object(entries_to_json(entries)),
            WireValue::Node(node) => json!({
                "_element_id": node.element_id,
                "_labels": node.labels,
                "_properties": entries_to_json(&node.properties),
            }),
            WireValue::Relationship(rel) => json!({
                "_element_id": rel.element_id,
                "_start_node_element_id": rel.start_node_element_id,
                "_end_node_element_id": rel.end_node_element_id,
                "_type": rel.rel_type,
                "_properties": entries_to_json(&rel.properties),
            }),
        };
        json!({ TYPE_KEY: self.type_tag(), VALUE_KEY: payload })
    }

    /// Parse a typed JSON object.
    pub fn from_json(json: &Json) -> DriverResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| DriverError::protocol(format!("Expected a typed value, got {}", json)))?;
        let tag = object
            .get(TYPE_KEY)
            .and_then(Json::as_str)
            .ok_or_else(|| DriverError::protocol(format!("Typed value without {}: {}", TYPE_KEY, json)))?;
        let payload = object.get(VALUE_KEY).unwrap_or(&Json::Null);

        let text = || {
            payload
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| DriverError::protocol(format!("{} value must be a string: {}", tag, payload)))
        };

        Ok(match tag {
            "Null" => WireValue::Null,
            "Boolean" => WireValue::Boolean(
                payload
                    .as_bool()
                    .ok_or_else(|| DriverError::protocol(format!("Boolean value expected: {}", payload)))?,
            ),
            "Integer" => WireValue::Integer(number_text(payload, tag)?),
            "Float" => WireValue::Float(number_text(payload, tag)?),
            "String" => WireValue::String(text()?),
            "Base64" => WireValue::Base64(text()?),
            "Date" => WireValue::Date(text()?),
            "Time" => WireValue::Time(text()?),
            "LocalTime" => WireValue::LocalTime(text()?),
            "OffsetDateTime" => WireValue::OffsetDateTime(text()?),
            "ZonedDateTime" => WireValue::ZonedDateTime(text()?),
            "LocalDateTime" => WireValue::LocalDateTime(text()?),
            "Duration" => WireValue::Duration(text()?),
            "Point" => WireValue::Point(text()?),
            "List" => WireValue::List(array_items(payload, tag)?),
            "Path" => WireValue::Path(array_items(payload, tag)?),
            "Map" => WireValue::Map(entries_from_json(payload)?),
            "Node" => WireValue::Node(WireNode {
                element_id: field_str(payload, "_element_id")?,
                labels: payload
                    .get("_labels")
                    .and_then(Json::as_array)
                    .map(|labels| labels.iter().filter_map(Json::as_str).map(str::to_string).collect())
                    .unwrap_or_default(),
                properties: properties(payload)?,
            }),
            "Relationship" => WireValue::Relationship(WireRelationship {
                element_id: field_str(payload, "_element_id")?,
                start_node_element_id: field_str(payload, "_start_node_element_id")?,
                end_node_element_id: field_str(payload, "_end_node_element_id")?,
                rel_type: field_str(payload, "_type")?,
                properties: properties(payload)?,
            }),
            other => return Err(DriverError::protocol(format!("Unknown value type: {}", other))),
        })
    }
}

fn entries_to_json(entries: &[(String, WireValue)]) -> JsonMap<String, Json> {
    entries
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

fn entries_from_json(payload: &Json) -> DriverResult<Vec<(String, WireValue)>> {
    let object = payload
        .as_object()
        .ok_or_else(|| DriverError::protocol(format!("Map value must be an object: {}", payload)))?;
    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), WireValue::from_json(value)?)))
        .collect()
}

fn properties(payload: &Json) -> DriverResult<Vec<(String, WireValue)>> {
    match payload.get("_properties") {
        Some(props) => entries_from_json(props),
        None => Ok(Vec::new()),
    }
}

fn array_items(payload: &Json, tag: &str) -> DriverResult<Vec<WireValue>> {
    payload
        .as_array()
        .ok_or_else(|| DriverError::protocol(format!("{} value must be an array: {}", tag, payload)))?
        .iter()
        .map(WireValue::from_json)
        .collect()
}

fn field_str(payload: &Json, field: &str) -> DriverResult<String> {
    payload
        .get(field)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::protocol(format!("Missing {} in {}", field, payload)))
}

/// Numbers are normally string-encoded, but plain JSON numbers are tolerated.
fn number_text(payload: &Json, tag: &str) -> DriverResult<String> {
    match payload {
        Json::String(s) => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        other => Err(DriverError::protocol(format!("{} value expected: {}", tag, other))),
    }
}
