//! Domain layer
//!
//! Entity descriptors and the static catalog, persistence records, transfer
//! objects and page specifications.

pub mod catalog;
pub mod descriptor;
pub mod dto;
pub mod page;
pub mod record;

pub use catalog::CATALOG;
pub use descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, NullFilter, RelationDescriptor};
pub use dto::{to_dto, to_record, EntityDto};
pub use page::{Direction, Order, Page, Pageable, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use record::{FieldValue, Record};
