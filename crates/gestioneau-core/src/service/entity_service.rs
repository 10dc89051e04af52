//! Entity service
//!
//! Writes go to the relational store first and are then mirrored into the
//! search index. The two are not transactional together: a failed mirror
//! write leaves a stale document, which `reindex` repairs.

use std::fmt;
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::domain::descriptor::{EntityDescriptor, NullFilter};
use crate::domain::dto::{EntityDto, to_dto, to_record};
use crate::domain::page::{Order, Pageable};
use crate::error::{Error, Result};
use crate::search::SearchIndex;
use crate::storage::EntityRepository;

/// Rows read per page while rebuilding the mirror
const REINDEX_BATCH: u32 = 500;

/// CRUD and search for one entity
#[derive(Clone)]
pub struct EntityService {
    descriptor: &'static EntityDescriptor,
    repository: EntityRepository,
    search: Arc<dyn SearchIndex>,
}

impl fmt::Debug for EntityService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityService")
            .field("entity", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

impl EntityService {
    pub fn new(
        pool: SqlitePool,
        descriptor: &'static EntityDescriptor,
        search: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            descriptor,
            repository: EntityRepository::new(pool, descriptor),
            search,
        }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// Get the underlying repository
    pub fn repository(&self) -> &EntityRepository {
        &self.repository
    }

    /// Insert (no id) or fully replace (id) an entity, then mirror it
    pub async fn save(&self, dto: &EntityDto) -> Result<EntityDto> {
        let d = self.descriptor;
        debug!("Request to save {} : {:?}", d.name, dto);

        let record = to_record(d, dto)?;
        let saved = match record.id {
            None => self.repository.insert(&record).await?,
            Some(id) => {
                if self.repository.update(&record).await? == 0 {
                    return Err(Error::NotFound { entity: d.name, id });
                }
                record
            }
        };

        self.search.index(d, &saved).await?;
        Ok(to_dto(d, &saved))
    }

    /// Merge the non-null properties of `dto` into the stored entity
    ///
    /// Returns `None` when no entity has the dto's id.
    pub async fn partial_update(&self, dto: &EntityDto) -> Result<Option<EntityDto>> {
        let d = self.descriptor;
        debug!("Request to partially update {} : {:?}", d.name, dto);

        let patch = to_record(d, dto)?;
        let id = patch.id.ok_or_else(|| {
            Error::BadRequest(format!("Cannot update {} without an id", d.name))
        })?;

        let Some(updated) = self.repository.partial_update(&patch, id).await? else {
            return Ok(None);
        };

        self.search.index(d, &updated).await?;
        Ok(Some(to_dto(d, &updated)))
    }

    /// One page of entities
    pub async fn find_all(&self, pageable: &Pageable) -> Result<Vec<EntityDto>> {
        debug!("Request to get all {}", self.descriptor.name);
        let records = self.repository.find_page(pageable).await?;
        Ok(records.iter().map(|r| to_dto(self.descriptor, r)).collect())
    }

    /// Entities selected by a predefined "not referenced" filter
    pub async fn find_all_where_null(&self, filter: &NullFilter) -> Result<Vec<EntityDto>> {
        debug!(
            "Request to get all {} where {}",
            self.descriptor.name, filter.name
        );
        let records = self.repository.find_all_where_null(filter).await?;
        Ok(records.iter().map(|r| to_dto(self.descriptor, r)).collect())
    }

    /// Entities whose `relation` foreign key is NULL
    pub async fn find_all_where_relation_is_null(&self, relation: &str) -> Result<Vec<EntityDto>> {
        debug!(
            "Request to get all {} where {} is null",
            self.descriptor.name, relation
        );
        let records = self
            .repository
            .find_all_where_relation_is_null(relation)
            .await?;
        Ok(records.iter().map(|r| to_dto(self.descriptor, r)).collect())
    }

    pub async fn find_one(&self, id: i64) -> Result<Option<EntityDto>> {
        debug!("Request to get {} : {}", self.descriptor.name, id);
        let record = self.repository.find_by_id(id).await?;
        Ok(record.map(|r| to_dto(self.descriptor, &r)))
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        self.repository.exists_by_id(id).await
    }

    /// Delete from the store, then from the mirror
    ///
    /// The mirror delete is attempted even when the store delete fails; the
    /// first error is returned.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let d = self.descriptor;
        debug!("Request to delete {} : {}", d.name, id);

        let stored = self.repository.delete_by_id(id).await;
        if let Err(e) = &stored {
            warn!(entity = d.name, id, error = %e, "Store delete failed");
        }

        let mirrored = self.search.delete_by_id(d, id).await;
        if let Err(e) = &mirrored {
            warn!(entity = d.name, id, error = %e, "Search mirror delete failed");
        }

        stored.and(mirrored)
    }

    /// Free-text search, answered by the mirror alone
    pub async fn search(&self, query: &str, pageable: &Pageable) -> Result<Vec<EntityDto>> {
        debug!(
            "Request to search for a page of {} for query {}",
            self.descriptor.name, query
        );
        let records = self.search.search(self.descriptor, query, pageable).await?;
        Ok(records.iter().map(|r| to_dto(self.descriptor, r)).collect())
    }

    pub async fn count_all(&self) -> Result<i64> {
        self.repository.count_all().await
    }

    pub async fn search_count(&self) -> Result<i64> {
        self.search.count(self.descriptor).await
    }

    /// Rebuild the mirror from the store; returns the documents written
    pub async fn reindex(&self) -> Result<u64> {
        let d = self.descriptor;
        self.search.clear(d).await?;

        let mut indexed = 0u64;
        let mut page = 0u32;
        loop {
            let pageable = Pageable::new(page, REINDEX_BATCH).sorted_by(Order::asc("id"));
            let records = self.repository.find_page(&pageable).await?;
            for record in &records {
                self.search.index(d, record).await?;
                indexed += 1;
            }
            if records.len() < REINDEX_BATCH as usize {
                break;
            }
            page += 1;
        }

        debug!(entity = d.name, indexed, "Rebuilt search mirror");
        Ok(indexed)
    }
}
