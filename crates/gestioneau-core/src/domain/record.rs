//! Persistence records
//!
//! A [`Record`] is the in-memory form of one row of an entity table: its
//! identifier, the non-null scalar columns, the non-null foreign keys, and the
//! related entities resolved by the one-level join. Absence from a map means
//! NULL in the store.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use super::descriptor::FieldKind;

/// A non-null scalar value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Instant(DateTime<Utc>),
}

impl FieldValue {
    /// The field kind this value satisfies
    pub fn matches(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (Self::Text(_), FieldKind::Text)
                | (Self::Integer(_), FieldKind::Integer | FieldKind::Long)
                | (Self::Float(_), FieldKind::Float)
                | (Self::Instant(_), FieldKind::Instant)
        )
    }

    /// Text used by the full-text search mirror
    pub fn to_search_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Instant(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// One entity row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub id: Option<i64>,
    /// Scalar values keyed by column name
    pub values: BTreeMap<&'static str, FieldValue>,
    /// Foreign-key ids keyed by relation name
    pub references: BTreeMap<&'static str, i64>,
    /// Related rows resolved by the query join, keyed by relation name
    pub related: BTreeMap<&'static str, Record>,
}

impl Record {
    /// A new, unsaved record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the identifier
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder: set a scalar value by column name
    pub fn with_value(mut self, column: &'static str, value: FieldValue) -> Self {
        self.values.insert(column, value);
        self
    }

    /// Builder: set a text value
    pub fn with_text(self, column: &'static str, value: impl Into<String>) -> Self {
        self.with_value(column, FieldValue::Text(value.into()))
    }

    /// Builder: set a foreign key by relation name
    pub fn with_reference(mut self, relation: &'static str, id: i64) -> Self {
        self.references.insert(relation, id);
        self
    }

    /// Scalar value of a column
    pub fn value(&self, column: &str) -> Option<&FieldValue> {
        self.values.get(column)
    }

    /// Text value of a column
    pub fn text(&self, column: &str) -> Option<&str> {
        match self.values.get(column) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Foreign key of a relation
    pub fn reference(&self, relation: &str) -> Option<i64> {
        self.references.get(relation).copied()
    }

    /// Related row resolved by the last read
    pub fn related(&self, relation: &str) -> Option<&Record> {
        self.related.get(relation)
    }

    /// Overlay every non-null value of `patch` onto this record
    ///
    /// Values absent from the patch are left untouched. A foreign key that
    /// changes drops the stale related row.
    pub fn merge(&mut self, patch: &Record) {
        for (column, value) in &patch.values {
            self.values.insert(*column, value.clone());
        }
        for (relation, id) in &patch.references {
            if self.references.insert(*relation, *id) != Some(*id) {
                self.related.remove(relation);
            }
        }
    }

    /// Copy without the resolved relations, as written to the store
    pub fn flattened(&self) -> Record {
        Record {
            id: self.id,
            values: self.values.clone(),
            references: self.references.clone(),
            related: BTreeMap::new(),
        }
    }
}
