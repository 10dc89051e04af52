//! Search mirror trait
//!
//! The mirror keeps a flat copy of each entity for free-text queries. It is
//! written after the relational store and is never transactionally coupled to
//! it.

use async_trait::async_trait;

use crate::domain::descriptor::EntityDescriptor;
use crate::domain::page::Pageable;
use crate::domain::record::Record;
use crate::error::Result;

/// Free-text document store, one document collection per entity
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the document of `record`
    async fn index(&self, descriptor: &'static EntityDescriptor, record: &Record) -> Result<()>;

    /// Remove one document; removing a missing document is not an error
    async fn delete_by_id(&self, descriptor: &'static EntityDescriptor, id: i64) -> Result<()>;

    /// Documents matching `query`; an empty query or `*` matches everything
    async fn search(
        &self,
        descriptor: &'static EntityDescriptor,
        query: &str,
        pageable: &Pageable,
    ) -> Result<Vec<Record>>;

    /// Number of documents held for the entity
    async fn count(&self, descriptor: &'static EntityDescriptor) -> Result<i64>;

    /// Drop every document of the entity
    async fn clear(&self, descriptor: &'static EntityDescriptor) -> Result<()>;

    /// Check the mirror can be reached
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
