//! Gestioneau REST transport
//!
//! JHipster-compatible HTTP endpoints over the generic entity services of
//! `gestioneau-core`.

pub mod web;

pub use web::{AppState, build_router};
