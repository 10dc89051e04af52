//! Gestioneau Core Library
//!
//! Back-office engine for water and sanitation infrastructure follow-up:
//! - Entity catalog (descriptors for every administrative and technical entity)
//! - Storage (SQLite relational store, joined queries, generic repository)
//! - Search mirror (SQLite FTS5 document index)
//! - Entity services keeping both stores in step
//! - Configuration
//!
//! This crate knows nothing about HTTP; the REST surface lives in
//! `gestioneau-server`.

pub mod config;
pub mod domain;
pub mod error;
pub mod search;
pub mod service;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::{EntityDescriptor, EntityDto, Order, Page, Pageable, Record};
    pub use crate::error::{Error, Result};
    pub use crate::search::{SearchIndex, SqliteSearchIndex};
    pub use crate::service::{EntityService, ServiceRegistry};
    pub use crate::storage::{Database, DatabaseConfig};
}
