//! Entity descriptors
//!
//! A descriptor is the static shape of one entity: its table, REST resource,
//! scalar fields and single-level foreign-key relations. The repository, row
//! mapper, search mirror and service are all generic over descriptors.

use serde::Serialize;

/// Storage kind of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text
    Text,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// Floating point number
    Float,
    /// Point in time, UTC
    Instant,
}

impl FieldKind {
    /// SQLite column type used when bootstrapping the schema
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer | Self::Long => "INTEGER",
            Self::Float => "REAL",
            Self::Instant => "TEXT",
        }
    }
}

/// One scalar attribute of an entity
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldDescriptor {
    /// Transfer-object property name (camelCase)
    pub name: &'static str,
    /// Column name in the entity table
    pub column: &'static str,
    pub kind: FieldKind,
    /// Enforced by the store as NOT NULL
    pub required: bool,
}

/// A direct foreign-key relation to another entity
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RelationDescriptor {
    /// Relation name, also the join alias and transfer-object property
    pub name: &'static str,
    /// Foreign-key column in the owning table
    pub column: &'static str,
    #[serde(serialize_with = "serialize_target")]
    pub target: &'static EntityDescriptor,
    /// Field of the target copied into the summary (`None` for id only)
    pub display_field: Option<&'static str>,
}

fn serialize_target<S: serde::Serializer>(
    target: &&'static EntityDescriptor,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(target.name)
}

/// A predefined "no row of another table references this one" filter
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NullFilter {
    /// Value of the `filter` request parameter, e.g. `prevision-is-null`
    pub name: &'static str,
    /// Table holding the inverse foreign key
    pub referencing_table: &'static str,
    /// Foreign-key column in the referencing table
    pub referencing_column: &'static str,
}

/// Static description of an entity
#[derive(Debug, Serialize)]
pub struct EntityDescriptor {
    /// Entity name, e.g. `Province`
    pub name: &'static str,
    pub table: &'static str,
    /// Plural REST resource, e.g. `provinces`
    pub resource: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub relations: &'static [RelationDescriptor],
    pub null_filters: &'static [NullFilter],
}

impl EntityDescriptor {
    /// Look up a field by property name or column name
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name || f.column == name)
    }

    /// Look up a relation by name or foreign-key column
    pub fn relation(&self, name: &str) -> Option<&'static RelationDescriptor> {
        self.relations
            .iter()
            .find(|r| r.name == name || r.column == name)
    }

    /// Look up a predefined null filter by its request value
    pub fn null_filter(&self, name: &str) -> Option<&'static NullFilter> {
        self.null_filters.iter().find(|f| f.name == name)
    }

    /// Resolve a sort property to a column of the base table
    ///
    /// Accepts `id`, a field property or column name, or a relation name
    /// (sorting on the foreign key).
    pub fn sortable_column(&self, property: &str) -> Option<&'static str> {
        if property == "id" {
            return Some("id");
        }
        self.field(property)
            .map(|f| f.column)
            .or_else(|| self.relation(property).map(|r| r.column))
    }

    /// Every writable column, scalar fields first then foreign keys
    pub fn writable_columns(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .map(|f| f.column)
            .chain(self.relations.iter().map(|r| r.column))
            .collect()
    }

    /// Name used in alert headers, e.g. `gestioneauProvince`
    pub fn alert_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }
}

impl PartialEq for EntityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl Eq for EntityDescriptor {}
