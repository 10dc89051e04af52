//! Query builder
//!
//! Every read is one SELECT over the base table aliased `e`, left-outer-joined
//! to each directly related table (aliased by relation name, one level deep).
//! Columns are projected as `<alias>_<column>` for the row mapper.

use sqlx::{QueryBuilder, Sqlite};

use crate::domain::descriptor::EntityDescriptor;
use crate::domain::page::Pageable;
use crate::error::{Error, Result};

/// Alias of the base table in every generated query
pub const BASE_ALIAS: &str = "e";

/// A WHERE predicate scoped to the base alias
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// `e.id = ?`
    IdEquals(i64),
    /// `e.<column> IS NULL`
    ColumnIsNull(&'static str),
    /// No row of `table` references this one through `column`
    NotReferencedBy {
        table: &'static str,
        column: &'static str,
    },
    /// Caller-written fragment, passed to the store unchecked
    Raw(String),
}

impl Criteria {
    fn push_to(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        match self {
            Self::IdEquals(id) => {
                builder.push(format!("{}.id = ", BASE_ALIAS));
                builder.push_bind(*id);
            }
            Self::ColumnIsNull(column) => {
                builder.push(format!("{}.{} IS NULL", BASE_ALIAS, column));
            }
            Self::NotReferencedBy { table, column } => {
                builder.push(format!(
                    "{alias}.id NOT IN (SELECT {column} FROM {table} WHERE {column} IS NOT NULL)",
                    alias = BASE_ALIAS,
                ));
            }
            Self::Raw(fragment) => {
                builder.push("(");
                builder.push(fragment.as_str());
                builder.push(")");
            }
        }
    }
}

/// SELECT / COUNT generator for one entity
#[derive(Debug, Clone)]
pub struct EntityQuery {
    descriptor: &'static EntityDescriptor,
    criteria: Vec<Criteria>,
}

impl EntityQuery {
    pub fn new(descriptor: &'static EntityDescriptor) -> Self {
        Self {
            descriptor,
            criteria: Vec::new(),
        }
    }

    /// Builder: add a predicate, AND-ed with the others
    pub fn filter(mut self, criteria: Criteria) -> Self {
        self.criteria.push(criteria);
        self
    }

    /// Builder: add several predicates
    pub fn filter_all(mut self, criteria: impl IntoIterator<Item = Criteria>) -> Self {
        self.criteria.extend(criteria);
        self
    }

    /// Projection and joins, without WHERE or paging
    pub fn select_sql(&self) -> String {
        let d = self.descriptor;
        let mut columns = projection(d, BASE_ALIAS);
        let mut joins = String::new();

        for relation in d.relations {
            columns.extend(projection(relation.target, relation.name));
            joins.push_str(&format!(
                " LEFT OUTER JOIN {table} {alias} ON {base}.{fk} = {alias}.id",
                table = relation.target.table,
                alias = relation.name,
                base = BASE_ALIAS,
                fk = relation.column,
            ));
        }

        format!(
            "SELECT {} FROM {} {}{}",
            columns.join(", "),
            d.table,
            BASE_ALIAS,
            joins
        )
    }

    /// Full SELECT; without a page spec rows come in store order
    pub fn select(&self, pageable: Option<&Pageable>) -> Result<QueryBuilder<'static, Sqlite>> {
        let mut builder = QueryBuilder::new(self.select_sql());
        self.push_where(&mut builder);

        if let Some(pageable) = pageable {
            let order_by = self.order_by(pageable)?;
            if !order_by.is_empty() {
                builder.push(" ORDER BY ");
                builder.push(order_by);
            }
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(pageable.size));
            builder.push(" OFFSET ");
            builder.push_bind(pageable.offset());
        }

        Ok(builder)
    }

    /// COUNT(*) over the base table with the same predicates
    pub fn count(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {} {}",
            self.descriptor.table, BASE_ALIAS
        ));
        self.push_where(&mut builder);
        builder
    }

    fn push_where(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        for (i, criteria) in self.criteria.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            criteria.push_to(builder);
        }
    }

    /// Sort properties come from callers, so only known columns are accepted
    fn order_by(&self, pageable: &Pageable) -> Result<String> {
        pageable
            .sort
            .iter()
            .map(|order| {
                let column = self
                    .descriptor
                    .sortable_column(&order.property)
                    .ok_or_else(|| {
                        Error::BadRequest(format!(
                            "Cannot sort {} by unknown property '{}'",
                            self.descriptor.name, order.property
                        ))
                    })?;
                Ok(format!(
                    "{}.{} {}",
                    BASE_ALIAS,
                    column,
                    order.direction.as_sql()
                ))
            })
            .collect::<Result<Vec<_>>>()
            .map(|parts| parts.join(", "))
    }
}

/// `alias.column AS alias_column` for the id, fields and foreign keys
fn projection(descriptor: &EntityDescriptor, alias: &str) -> Vec<String> {
    std::iter::once("id")
        .chain(descriptor.writable_columns())
        .map(|column| format!("{alias}.{column} AS {alias}_{column}"))
        .collect()
}
