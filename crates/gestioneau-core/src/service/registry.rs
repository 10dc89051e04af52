//! Service registry
//!
//! One [`EntityService`] per catalog entity, all sharing the relational pool
//! and the search mirror handle.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use super::entity_service::EntityService;
use crate::domain::catalog::{self, CATALOG};
use crate::error::{Error, Result};
use crate::search::SearchIndex;

#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<EntityService>,
}

impl ServiceRegistry {
    pub fn new(pool: SqlitePool, search: Arc<dyn SearchIndex>) -> Self {
        let services = CATALOG
            .iter()
            .copied()
            .map(|descriptor| EntityService::new(pool.clone(), descriptor, search.clone()))
            .collect();
        Self { services }
    }

    /// Service of the entity exposed at `resource` (e.g. `provinces`)
    pub fn get(&self, resource: &str) -> Option<&EntityService> {
        self.services
            .iter()
            .find(|s| s.descriptor().resource == resource)
    }

    /// Like [`get`](Self::get), failing with `UnknownResource`
    pub fn resolve(&self, resource: &str) -> Result<&EntityService> {
        self.get(resource)
            .ok_or_else(|| Error::UnknownResource(resource.to_string()))
    }

    /// Service named by resource path or entity name (`provinces`, `Province`)
    pub fn lookup(&self, name: &str) -> Result<&EntityService> {
        self.get(name)
            .or_else(|| catalog::by_name(name).and_then(|d| self.get(d.resource)))
            .ok_or_else(|| Error::UnknownResource(name.to_string()))
    }

    /// Every service, in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &EntityService> {
        self.services.iter()
    }

    /// Rebuild the search mirror of every entity
    pub async fn reindex_all(&self) -> Result<Vec<(&'static str, u64)>> {
        let mut report = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let indexed = service.reindex().await?;
            info!(entity = service.descriptor().name, indexed, "Reindexed");
            report.push((service.descriptor().resource, indexed));
        }
        Ok(report)
    }
}
