//! Entity repository
//!
//! One generic repository serves every catalog entity. Reads go through the
//! query builder and row mapper; writes bind every writable column.

use futures_util::TryStreamExt;
use sqlx::query_builder::Separated;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::domain::descriptor::{EntityDescriptor, NullFilter};
use crate::domain::page::Pageable;
use crate::domain::record::{FieldValue, Record};
use crate::error::{Error, Result};
use crate::storage::query::{Criteria, EntityQuery};
use crate::storage::row_mapper::{self, format_instant};

/// Relational access for one entity
#[derive(Debug, Clone)]
pub struct EntityRepository {
    pool: SqlitePool,
    descriptor: &'static EntityDescriptor,
}

impl EntityRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: SqlitePool, descriptor: &'static EntityDescriptor) -> Self {
        Self { pool, descriptor }
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    fn query(&self) -> EntityQuery {
        EntityQuery::new(self.descriptor)
    }

    // ========== Reads ==========

    /// Rows matching every criteria, optionally paged and sorted
    pub async fn find_all_by(
        &self,
        criteria: Vec<Criteria>,
        pageable: Option<&Pageable>,
    ) -> Result<Vec<Record>> {
        let mut builder = self.query().filter_all(criteria).select(pageable)?;
        let mut rows = builder.build().fetch(&self.pool);

        let mut records = Vec::new();
        while let Some(row) = rows.try_next().await? {
            if let Some(record) = row_mapper::map_entity(&row, self.descriptor)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// One page of rows
    pub async fn find_page(&self, pageable: &Pageable) -> Result<Vec<Record>> {
        self.find_all_by(Vec::new(), Some(pageable)).await
    }

    /// Every row, in store order
    pub async fn find_all(&self) -> Result<Vec<Record>> {
        self.find_all_by(Vec::new(), None).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Record>> {
        let mut records = self
            .find_all_by(vec![Criteria::IdEquals(id)], None)
            .await?;
        Ok(records.pop())
    }

    /// Rows whose foreign key for `relation` is NULL
    pub async fn find_all_where_relation_is_null(&self, relation: &str) -> Result<Vec<Record>> {
        let relation = self.descriptor.relation(relation).ok_or_else(|| {
            Error::BadRequest(format!(
                "{} has no relation '{}'",
                self.descriptor.name, relation
            ))
        })?;
        self.find_all_by(vec![Criteria::ColumnIsNull(relation.column)], None)
            .await
    }

    /// Rows that no row of the filter's table references
    pub async fn find_all_where_null(&self, filter: &NullFilter) -> Result<Vec<Record>> {
        self.find_all_by(
            vec![Criteria::NotReferencedBy {
                table: filter.referencing_table,
                column: filter.referencing_column,
            }],
            None,
        )
        .await
    }

    pub async fn exists_by_id(&self, id: i64) -> Result<bool> {
        Ok(self.count_by(vec![Criteria::IdEquals(id)]).await? > 0)
    }

    pub async fn count_all(&self) -> Result<i64> {
        self.count_by(Vec::new()).await
    }

    pub async fn count_by(&self, criteria: Vec<Criteria>) -> Result<i64> {
        let mut builder = self.query().filter_all(criteria).count();
        let (count,): (i64,) = builder.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    // ========== Writes ==========

    /// Insert a new row; the store assigns the id
    pub async fn insert(&self, record: &Record) -> Result<Record> {
        let d = self.descriptor;
        let mut builder: QueryBuilder<'static, Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            d.table,
            d.writable_columns().join(", ")
        ));
        {
            let mut values = builder.separated(", ");
            for field in d.fields {
                push_value(&mut values, record.values.get(field.column), false);
            }
            for relation in d.relations {
                values.push_bind(record.reference(relation.name));
            }
        }
        builder.push(")");

        let result = builder.build().execute(&self.pool).await?;
        let id = result.last_insert_rowid();
        debug!(entity = d.name, id, "Inserted row");

        let mut saved = record.clone();
        saved.id = Some(id);
        Ok(saved)
    }

    /// Replace every writable column of the row; returns the rows changed
    pub async fn update(&self, record: &Record) -> Result<u64> {
        let d = self.descriptor;
        let id = record.id.ok_or_else(|| {
            Error::BadRequest(format!("Cannot update {} without an id", d.name))
        })?;

        let mut builder: QueryBuilder<'static, Sqlite> =
            QueryBuilder::new(format!("UPDATE {} SET ", d.table));
        {
            let mut assignments = builder.separated(", ");
            for field in d.fields {
                assignments.push(format!("{} = ", field.column));
                push_value(&mut assignments, record.values.get(field.column), true);
            }
            for relation in d.relations {
                assignments.push(format!("{} = ", relation.column));
                assignments.push_bind_unseparated(record.reference(relation.name));
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Overlay the non-null values of `patch` onto row `id` and write it back
    ///
    /// Read then write, not atomic: two concurrent partial updates of the same
    /// row can lose one writer's fields. Returns `None` when the row is gone.
    pub async fn partial_update(&self, patch: &Record, id: i64) -> Result<Option<Record>> {
        let Some(mut current) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        current.merge(patch);

        if self.update(&current).await? == 0 {
            return Ok(None);
        }
        Ok(Some(current))
    }

    /// Delete a row; deleting a missing id is not an error
    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.descriptor.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        debug!(
            entity = self.descriptor.name,
            id,
            deleted = result.rows_affected(),
            "Deleted row"
        );
        Ok(())
    }
}

/// Bind one scalar value, or NULL when absent
fn push_value(
    separated: &mut Separated<'_, 'static, Sqlite, &'static str>,
    value: Option<&FieldValue>,
    unseparated: bool,
) {
    macro_rules! bind {
        ($v:expr) => {
            if unseparated {
                separated.push_bind_unseparated($v);
            } else {
                separated.push_bind($v);
            }
        };
    }

    match value {
        None => bind!(None::<String>),
        Some(FieldValue::Text(s)) => bind!(s.clone()),
        Some(FieldValue::Integer(i)) => bind!(*i),
        Some(FieldValue::Float(f)) => bind!(*f),
        Some(FieldValue::Instant(t)) => bind!(format_instant(t)),
    }
}
