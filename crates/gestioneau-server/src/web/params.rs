//! Query-string parameters of the collection endpoints

use gestioneau_core::Error;
use gestioneau_core::config::PagingConfig;
use gestioneau_core::domain::{Order, Pageable};

/// `page`, `size`, `sort`, `filter` and `query` of a collection request
///
/// `sort` may repeat (`sort=libelle,asc&sort=id,desc`). Unknown parameters
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub pageable: Pageable,
    pub filter: Option<String>,
    pub query: Option<String>,
}

impl ListParams {
    pub fn parse(pairs: &[(String, String)], paging: &PagingConfig) -> Result<Self, Error> {
        let mut pageable = Pageable::new(0, paging.default_size);
        let mut filter = None;
        let mut query = None;

        for (key, value) in pairs {
            match key.as_str() {
                "page" => pageable.page = number(key, value)?,
                "size" => pageable.size = number(key, value)?,
                "sort" => pageable.sort.push(Order::parse(value)?),
                "filter" if !value.is_empty() => filter = Some(value.clone()),
                "query" => query = Some(value.clone()),
                _ => {}
            }
        }

        Ok(Self {
            pageable: pageable.clamped(paging.max_size),
            filter,
            query,
        })
    }
}

fn number(key: &str, value: &str) -> Result<u32, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::BadRequest(format!("Invalid '{}' parameter: {}", key, value)))
}

/// Parse an id path segment
pub fn parse_id(value: &str) -> Result<i64, Error> {
    value
        .parse()
        .map_err(|_| Error::BadRequest(format!("Invalid id: {}", value)))
}
