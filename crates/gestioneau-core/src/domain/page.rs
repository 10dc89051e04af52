//! Page specifications and result pages

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default page size when the caller gives none
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound applied to any requested page size
pub const MAX_PAGE_SIZE: u32 = 2000;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse a `property[,asc|desc]` sort parameter
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split(',').map(str::trim);
        let property = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::BadRequest(format!("Invalid sort parameter '{}'", value)))?;
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(other) => {
                return Err(Error::BadRequest(format!(
                    "Invalid sort direction '{}'",
                    other
                )));
            }
        };
        Ok(Self {
            property: property.to_string(),
            direction,
        })
    }
}

/// Zero-based page number, page size and sort keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub page: u32,
    pub size: u32,
    #[serde(default)]
    pub sort: Vec<Order>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
        }
    }
}

impl Pageable {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: Vec::new(),
        }
    }

    /// Builder: append a sort key
    pub fn sorted_by(mut self, order: Order) -> Self {
        self.sort.push(order);
        self
    }

    /// Copy with the size clamped to `1..=max_size`
    pub fn clamped(&self, max_size: u32) -> Self {
        Self {
            page: self.page,
            size: self.size.clamp(1, max_size.max(1)),
            sort: self.sort.clone(),
        }
    }

    /// Row offset of the first element of the page
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: i64) -> Self {
        Self {
            content,
            number: pageable.page,
            size: pageable.size,
            total_elements,
        }
    }

    /// Number of pages needed to hold every element
    pub fn total_pages(&self) -> u32 {
        if self.size == 0 || self.total_elements <= 0 {
            return 0;
        }
        let size = i64::from(self.size);
        u32::try_from((self.total_elements + size - 1) / size).unwrap_or(u32::MAX)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}
