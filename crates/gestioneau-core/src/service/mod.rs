//! Service layer
//!
//! Composes the relational repository and the search mirror and converts
//! between records and transfer objects.

pub mod entity_service;
pub mod registry;

pub use entity_service::EntityService;
pub use registry::ServiceRegistry;
