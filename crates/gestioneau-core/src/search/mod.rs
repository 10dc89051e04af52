//! Search mirror
//!
//! - `index`: the [`SearchIndex`] trait the services write through
//! - `sqlite`: FTS5 implementation over a dedicated SQLite database

pub mod index;
pub mod sqlite;

pub use index::SearchIndex;
pub use sqlite::{SqliteSearchIndex, match_expression};
