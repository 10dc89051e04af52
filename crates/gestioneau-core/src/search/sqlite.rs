//! SQLite FTS5 search mirror
//!
//! All entities share one FTS5 table in a database of their own. Each row
//! holds the entity name, the document id, the JSON document and the text
//! that is actually indexed.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::index::SearchIndex;
use crate::domain::descriptor::EntityDescriptor;
use crate::domain::dto::{EntityDto, to_dto, to_record};
use crate::domain::page::Pageable;
use crate::domain::record::{FieldValue, Record};
use crate::error::{Error, Result};
use crate::storage::{Database, DatabaseConfig};

const CREATE_DOCUMENTS_TABLE: &str = r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS search_documents USING fts5(
        entity UNINDEXED,
        doc_id UNINDEXED,
        document UNINDEXED,
        content,
        tokenize = 'unicode61 remove_diacritics 2'
    );
"#;

fn search_error(err: sqlx::Error) -> Error {
    Error::SearchError(err.to_string())
}

/// Build an FTS5 MATCH expression from user text
///
/// Every whitespace-separated term is quoted so FTS5 operators in user input
/// are matched literally. A trailing `*` is kept as a prefix match. Returns
/// `None` when the text selects every document.
pub fn match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter_map(|term| {
            let prefix = term.ends_with('*');
            let body = term.trim_end_matches('*');
            if body.is_empty() {
                return None;
            }
            let quoted = format!("\"{}\"", body.replace('"', "\"\""));
            Some(if prefix { quoted + "*" } else { quoted })
        })
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Text indexed for a record: every scalar value
fn indexed_content(record: &Record) -> String {
    record
        .values
        .values()
        .map(FieldValue::to_search_text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// FTS5-backed [`SearchIndex`]
#[derive(Debug, Clone)]
pub struct SqliteSearchIndex {
    pool: SqlitePool,
}

impl SqliteSearchIndex {
    /// Wrap a pool whose schema is already in place
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the mirror database and create its table if needed
    pub async fn open(config: DatabaseConfig) -> anyhow::Result<Self> {
        let db = Database::new(config.no_migrate()).await?;
        let index = Self::new(db.pool().clone());
        index.ensure_schema().await?;
        Ok(index)
    }

    /// In-memory mirror (useful for testing)
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::open(DatabaseConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(search_error)?;
        Ok(())
    }

    /// Sort keys are document properties, restricted to the entity's own
    fn order_by(descriptor: &EntityDescriptor, pageable: &Pageable) -> Result<Vec<String>> {
        pageable
            .sort
            .iter()
            .map(|order| {
                let property = if order.property == "id" {
                    "id"
                } else {
                    descriptor
                        .field(&order.property)
                        .map(|f| f.name)
                        .ok_or_else(|| {
                            Error::BadRequest(format!(
                                "Cannot sort {} search results by '{}'",
                                descriptor.name, order.property
                            ))
                        })?
                };
                Ok(format!(
                    "json_extract(document, '$.{}') {}",
                    property,
                    order.direction.as_sql()
                ))
            })
            .collect()
    }
}

#[async_trait]
impl SearchIndex for SqliteSearchIndex {
    async fn index(&self, descriptor: &'static EntityDescriptor, record: &Record) -> Result<()> {
        let id = record.id.ok_or_else(|| {
            Error::SearchError(format!("Cannot index a {} without an id", descriptor.name))
        })?;
        let document = serde_json::to_string(&to_dto(descriptor, &record.flattened()))?;
        let content = indexed_content(record);

        let mut tx = self.pool.begin().await.map_err(search_error)?;
        sqlx::query("DELETE FROM search_documents WHERE entity = ? AND doc_id = ?")
            .bind(descriptor.name)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(search_error)?;
        sqlx::query(
            "INSERT INTO search_documents (entity, doc_id, document, content) VALUES (?, ?, ?, ?)",
        )
        .bind(descriptor.name)
        .bind(id)
        .bind(document)
        .bind(content)
        .execute(&mut *tx)
        .await
        .map_err(search_error)?;
        tx.commit().await.map_err(search_error)?;

        debug!(entity = descriptor.name, id, "Indexed document");
        Ok(())
    }

    async fn delete_by_id(&self, descriptor: &'static EntityDescriptor, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM search_documents WHERE entity = ? AND doc_id = ?")
            .bind(descriptor.name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(search_error)?;
        Ok(())
    }

    async fn search(
        &self,
        descriptor: &'static EntityDescriptor,
        query: &str,
        pageable: &Pageable,
    ) -> Result<Vec<Record>> {
        let expression = match_expression(query);
        let mut order_by = Self::order_by(descriptor, pageable)?;
        if order_by.is_empty() {
            order_by.push(if expression.is_some() {
                "rank".to_string()
            } else {
                "CAST(doc_id AS INTEGER)".to_string()
            });
        }

        let mut builder: QueryBuilder<'static, Sqlite> =
            QueryBuilder::new("SELECT document FROM search_documents WHERE entity = ");
        builder.push_bind(descriptor.name);
        if let Some(expression) = expression {
            builder.push(" AND search_documents MATCH ");
            builder.push_bind(expression);
        }
        builder.push(" ORDER BY ");
        builder.push(order_by.join(", "));
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(pageable.size));
        builder.push(" OFFSET ");
        builder.push_bind(pageable.offset());

        let documents: Vec<(String,)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(search_error)?;

        documents
            .into_iter()
            .map(|(document,)| {
                let dto: EntityDto = serde_json::from_str(&document)?;
                to_record(descriptor, &dto)
            })
            .collect()
    }

    async fn count(&self, descriptor: &'static EntityDescriptor) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM search_documents WHERE entity = ?")
                .bind(descriptor.name)
                .fetch_one(&self.pool)
                .await
                .map_err(search_error)?;
        Ok(count)
    }

    async fn clear(&self, descriptor: &'static EntityDescriptor) -> Result<()> {
        let result = sqlx::query("DELETE FROM search_documents WHERE entity = ?")
            .bind(descriptor.name)
            .execute(&self.pool)
            .await
            .map_err(search_error)?;
        debug!(
            entity = descriptor.name,
            removed = result.rows_affected(),
            "Cleared search documents"
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(search_error)?;
        Ok(())
    }
}
