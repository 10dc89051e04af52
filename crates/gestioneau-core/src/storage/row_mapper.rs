//! Row mapper
//!
//! Reads the `<prefix>_<column>` projection produced by the query builder back
//! into records. A null `<prefix>_id` means the left-joined row is absent.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::domain::descriptor::{EntityDescriptor, FieldKind};
use crate::domain::record::{FieldValue, Record};
use crate::error::{Error, Result};
use crate::storage::query::BASE_ALIAS;

/// Format used to store instants, fixed width so text ordering is time ordering
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Unexpected(format!("Stored instant '{}' is invalid: {}", text, e)))
}

/// Map the entity of `descriptor` under `prefix`, without its relations
///
/// Returns `None` when the row holds no entity under that prefix.
pub fn map_prefixed(
    row: &SqliteRow,
    descriptor: &EntityDescriptor,
    prefix: &str,
) -> Result<Option<Record>> {
    let id: Option<i64> = row.try_get(format!("{}_id", prefix).as_str())?;
    let Some(id) = id else {
        return Ok(None);
    };

    let mut record = Record::new().with_id(id);

    for field in descriptor.fields {
        let name = format!("{}_{}", prefix, field.column);
        let value = match field.kind {
            FieldKind::Text => row
                .try_get::<Option<String>, _>(name.as_str())?
                .map(FieldValue::Text),
            FieldKind::Integer | FieldKind::Long => row
                .try_get::<Option<i64>, _>(name.as_str())?
                .map(FieldValue::Integer),
            FieldKind::Float => row
                .try_get::<Option<f64>, _>(name.as_str())?
                .map(FieldValue::Float),
            FieldKind::Instant => row
                .try_get::<Option<String>, _>(name.as_str())?
                .map(|text| parse_instant(&text).map(FieldValue::Instant))
                .transpose()?,
        };
        if let Some(value) = value {
            record.values.insert(field.column, value);
        }
    }

    for relation in descriptor.relations {
        let name = format!("{}_{}", prefix, relation.column);
        if let Some(fk) = row.try_get::<Option<i64>, _>(name.as_str())? {
            record.references.insert(relation.name, fk);
        }
    }

    Ok(Some(record))
}

/// Map a full joined row: the base entity plus every directly related entity
pub fn map_entity(row: &SqliteRow, descriptor: &EntityDescriptor) -> Result<Option<Record>> {
    let Some(mut record) = map_prefixed(row, descriptor, BASE_ALIAS)? else {
        return Ok(None);
    };

    for relation in descriptor.relations {
        if let Some(related) = map_prefixed(row, relation.target, relation.name)? {
            record.related.insert(relation.name, related);
        }
    }

    Ok(Some(record))
}
