//! HTTP router and shared request state

pub mod error;
pub mod headers;
pub mod params;
pub mod resource;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use gestioneau_core::config::{Config, PagingConfig};
use gestioneau_core::search::SearchIndex;
use gestioneau_core::service::{EntityService, ServiceRegistry};
use gestioneau_core::storage::Database;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, Problem};
pub use headers::Alerts;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub database: Database,
    pub search: Arc<dyn SearchIndex>,
    pub alerts: Arc<Alerts>,
    pub paging: PagingConfig,
}

impl AppState {
    /// Build the services for every catalog entity
    ///
    /// Fails when the configured application name cannot be used in a
    /// header name.
    pub fn new(
        database: Database,
        search: Arc<dyn SearchIndex>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let registry = ServiceRegistry::new(database.pool().clone(), search.clone());
        let alerts = Alerts::new(&config.application.name, &config.application.entity_prefix)?;
        Ok(Self {
            registry: Arc::new(registry),
            database,
            search,
            alerts: Arc::new(alerts),
            paging: config.paging.clone(),
        })
    }

    /// Service behind a REST resource path, or 404
    pub fn service(&self, resource: &str) -> Result<&EntityService, ApiError> {
        Ok(self.registry.resolve(resource)?)
    }
}

/// Every `/api` route
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/api/health", get(resource::health))
        .route("/api/_search/:resource", get(resource::search))
        .route("/api/:resource", get(resource::list).post(resource::create))
        .route(
            "/api/:resource/:id",
            get(resource::get_one)
                .put(resource::update)
                .patch(resource::partial_update)
                .delete(resource::delete),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
