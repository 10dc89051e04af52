//! Transfer objects and the record mapper
//!
//! A transfer object is a JSON object with camelCase properties. Relations are
//! exchanged as summaries (`{"id": 3, "libelle": "Centre"}`); only the `id` of
//! an incoming summary is read.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind};
use super::record::{FieldValue, Record};
use crate::error::{Error, Result};

/// JSON transfer object of one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityDto(Map<String, Value>);

impl EntityDto {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier, if present and numeric
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    /// True when an `id` property is present and not null
    pub fn has_id(&self) -> bool {
        self.0.get("id").is_some_and(|v| !v.is_null())
    }

    pub fn set_id(&mut self, id: i64) {
        self.0.insert("id".to_string(), Value::from(id));
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.0.get(property)
    }

    pub fn insert(&mut self, property: impl Into<String>, value: Value) {
        self.0.insert(property.into(), value);
    }

    /// Builder: set a property
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(property, value.into());
        self
    }

    /// Builder: set a relation summary carrying only the id
    pub fn with_relation(self, relation: impl Into<String>, id: i64) -> Self {
        self.with(relation, serde_json::json!({ "id": id }))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for EntityDto {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::BadRequest(format!(
                "Expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }
}

impl From<EntityDto> for Value {
    fn from(dto: EntityDto) -> Self {
        dto.into_value()
    }
}

/// Convert a transfer object into a record
///
/// Null and absent properties are both left out of the record. Unknown
/// properties are ignored.
pub fn to_record(descriptor: &EntityDescriptor, dto: &EntityDto) -> Result<Record> {
    let mut record = Record::new();

    match dto.get("id") {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) => {
            record.id = Some(n.as_i64().ok_or_else(|| {
                Error::BadRequest(format!("Invalid id '{}' for {}", n, descriptor.name))
            })?);
        }
        Some(other) => {
            return Err(Error::BadRequest(format!(
                "Invalid id for {}: expected a number, got {}",
                descriptor.name,
                json_type(other)
            )));
        }
    }

    for field in descriptor.fields {
        match dto.get(field.name) {
            None | Some(Value::Null) => {}
            Some(value) => {
                record
                    .values
                    .insert(field.column, field_value(descriptor, field, value)?);
            }
        }
    }

    for relation in descriptor.relations {
        let related_id = match dto.get(relation.name) {
            None | Some(Value::Null) => None,
            Some(Value::Object(summary)) => match summary.get("id") {
                None | Some(Value::Null) => None,
                Some(id) => Some(id.as_i64().ok_or_else(|| {
                    Error::BadRequest(format!(
                        "Invalid {}.{}.id: expected a number",
                        descriptor.name, relation.name
                    ))
                })?),
            },
            Some(other) => {
                return Err(Error::BadRequest(format!(
                    "Invalid {}.{}: expected an object, got {}",
                    descriptor.name,
                    relation.name,
                    json_type(other)
                )));
            }
        };
        if let Some(id) = related_id {
            record.references.insert(relation.name, id);
        }
    }

    Ok(record)
}

/// Convert a record into its transfer object
pub fn to_dto(descriptor: &EntityDescriptor, record: &Record) -> EntityDto {
    let mut dto = EntityDto::new();
    dto.insert("id", record.id.map(Value::from).unwrap_or(Value::Null));

    for field in descriptor.fields {
        let value = record
            .values
            .get(field.column)
            .map(json_value)
            .unwrap_or(Value::Null);
        dto.insert(field.name, value);
    }

    for relation in descriptor.relations {
        let summary = match record.reference(relation.name) {
            None => Value::Null,
            Some(id) => {
                let mut summary = Map::new();
                summary.insert("id".to_string(), Value::from(id));
                if let Some(display) = relation.display_field {
                    let label = record
                        .related(relation.name)
                        .filter(|related| related.id == Some(id))
                        .and_then(|related| related.values.get(display))
                        .map(json_value);
                    if let Some(label) = label {
                        summary.insert(display.to_string(), label);
                    }
                }
                Value::Object(summary)
            }
        };
        dto.insert(relation.name, summary);
    }

    dto
}

fn field_value(
    descriptor: &EntityDescriptor,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<FieldValue> {
    let mismatch = || {
        Error::BadRequest(format!(
            "Invalid {}.{}: expected {:?}, got {}",
            descriptor.name,
            field.name,
            field.kind,
            json_type(value)
        ))
    };

    match field.kind {
        FieldKind::Text => value
            .as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or_else(mismatch),
        FieldKind::Integer => value
            .as_i64()
            .filter(|i| i32::try_from(*i).is_ok())
            .map(FieldValue::Integer)
            .ok_or_else(mismatch),
        FieldKind::Long => value.as_i64().map(FieldValue::Integer).ok_or_else(mismatch),
        FieldKind::Float => value.as_f64().map(FieldValue::Float).ok_or_else(mismatch),
        FieldKind::Instant => {
            let text = value.as_str().ok_or_else(mismatch)?;
            DateTime::parse_from_rfc3339(text)
                .map(|t| FieldValue::Instant(t.with_timezone(&Utc)))
                .map_err(|e| {
                    Error::BadRequest(format!(
                        "Invalid {}.{}: '{}' is not an RFC 3339 instant ({})",
                        descriptor.name, field.name, text, e
                    ))
                })
        }
    }
}

fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Integer(i) => Value::from(*i),
        FieldValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::Instant(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
