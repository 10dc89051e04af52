//! Storage layer - SQLite relational store
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema bootstrap generated from the entity catalog
//! - `query`: Joined SELECT / COUNT generation
//! - `row_mapper`: Projection of joined rows back into records
//! - `repository`: Generic per-entity CRUD
//!
//! # Usage
//!
//! ```ignore
//! use gestioneau_core::domain::catalog::PROVINCE;
//! use gestioneau_core::storage::{Database, EntityRepository};
//!
//! let db = Database::in_memory().await?;
//! let provinces = EntityRepository::new(db.pool().clone(), &PROVINCE);
//! let page = provinces.find_page(&Default::default()).await?;
//! ```

pub mod database;
pub mod migrations;
pub mod query;
pub mod repository;
pub mod row_mapper;

// Re-export commonly used types
pub use database::{Database, DatabaseConfig, default_database_path, default_search_path};
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};
pub use query::{Criteria, EntityQuery};
pub use repository::EntityRepository;
