//! Generic entity resource handlers
//!
//! One set of handlers serves every catalog entity; the `{resource}` path
//! segment selects the service.

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use gestioneau_core::Error as CoreError;
use gestioneau_core::domain::{EntityDescriptor, EntityDto, Page};
use gestioneau_core::service::EntityService;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::AppState;
use super::error::{ApiError, MERGE_PATCH_JSON};
use super::headers::pagination_headers;
use super::params::{ListParams, parse_id};

type QueryPairs = Query<Vec<(String, String)>>;

/// `POST /api/{resource}`
pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let service = state.service(&resource)?;
    let d = service.descriptor();
    let dto = read_body(&body)?;
    debug!("REST request to save {} : {:?}", d.name, dto);

    if dto.has_id() {
        return Err(rejected(
            &state,
            d,
            StatusCode::BAD_REQUEST,
            "idexists",
            format!("A new {} cannot already have an ID", d.name),
        ));
    }

    let saved = service.save(&dto).await?;
    let id = saved
        .id()
        .ok_or_else(|| CoreError::Unexpected(format!("Saved {} has no id", d.name)))?;

    let mut headers = state.alerts.created(d, id);
    if let Ok(location) = HeaderValue::try_from(format!("/api/{}/{}", d.resource, id)) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(saved)).into_response())
}

/// `PUT /api/{resource}/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let service = state.service(&resource)?;
    let d = service.descriptor();
    let id = parse_id(&id)?;
    let dto = read_body(&body)?;
    debug!("REST request to update {} : {}, {:?}", d.name, id, dto);

    check_target(&state, service, &dto, id).await?;
    let saved = service.save(&dto).await?;
    Ok((state.alerts.updated(d, id), Json(saved)).into_response())
}

/// `PATCH /api/{resource}/{id}` with a merge-patch body
pub async fn partial_update(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let service = state.service(&resource)?;
    let d = service.descriptor();
    require_merge_patch(&headers)?;
    let id = parse_id(&id)?;
    let dto = read_body(&body)?;
    debug!(
        "REST request to partial update {} partially : {}, {:?}",
        d.name, id, dto
    );

    check_target(&state, service, &dto, id).await?;
    match service.partial_update(&dto).await? {
        Some(updated) => Ok((state.alerts.updated(d, id), Json(updated)).into_response()),
        None => Err(not_found(&state, d)),
    }
}

/// `GET /api/{resource}`
///
/// A known `filter` value returns the whole filtered list without
/// pagination headers; any other value is ignored.
pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(pairs): QueryPairs,
) -> Result<Response, ApiError> {
    let service = state.service(&resource)?;
    let d = service.descriptor();
    let params = ListParams::parse(&pairs, &state.paging)?;

    if let Some(filter) = params.filter.as_deref().and_then(|name| d.null_filter(name)) {
        debug!("REST request to get all {} where {}", d.name, filter.name);
        let content = service.find_all_where_null(filter).await?;
        return Ok(Json(content).into_response());
    }

    debug!("REST request to get a page of {}", d.name);
    let content = service.find_all(&params.pageable).await?;
    let total = service.count_all().await?;
    let page = Page::new(content, &params.pageable, total);
    Ok((pagination_headers(&uri, &page), Json(page.content)).into_response())
}

/// `GET /api/{resource}/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let service = state.service(&resource)?;
    let d = service.descriptor();
    let id = parse_id(&id)?;
    debug!("REST request to get {} : {}", d.name, id);

    match service.find_one(id).await? {
        Some(dto) => Ok(Json(dto).into_response()),
        None => Err(CoreError::NotFound { entity: d.name, id }.into()),
    }
}

/// `DELETE /api/{resource}/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let service = state.service(&resource)?;
    let d = service.descriptor();
    let id = parse_id(&id)?;
    debug!("REST request to delete {} : {}", d.name, id);

    service.delete(id).await?;
    Ok((StatusCode::NO_CONTENT, state.alerts.deleted(d, id)).into_response())
}

/// `GET /api/_search/{resource}?query=`
pub async fn search(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(pairs): QueryPairs,
) -> Result<Response, ApiError> {
    let service = state.service(&resource)?;
    let d = service.descriptor();
    let params = ListParams::parse(&pairs, &state.paging)?;
    let query = params.query.ok_or_else(|| {
        CoreError::BadRequest("Required request parameter 'query' is not present".to_string())
    })?;
    debug!("REST request to search for a page of {} for query {}", d.name, query);

    let content = service.search(&query, &params.pageable).await?;
    let total = service.search_count().await?;
    let page = Page::new(content, &params.pageable, total);
    Ok((pagination_headers(&uri, &page), Json(page.content)).into_response())
}

#[derive(Debug, Serialize)]
struct ComponentHealth {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                status: "UP",
                error: None,
            },
            Err(e) => Self {
                status: "DOWN",
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    components: BTreeMap<&'static str, ComponentHealth>,
}

/// `GET /api/health`: relational store and search mirror
pub async fn health(State(state): State<AppState>) -> Response {
    let mut components = BTreeMap::new();
    components.insert(
        "db",
        ComponentHealth::from_result(state.database.health_check().await),
    );
    components.insert(
        "search",
        ComponentHealth::from_result(state.search.health_check().await),
    );

    let up = components.values().all(|c| c.status == "UP");
    let status = if up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = Health {
        status: if up { "UP" } else { "DOWN" },
        components,
    };
    (status, Json(body)).into_response()
}

fn read_body(body: &Bytes) -> Result<EntityDto, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
    Ok(EntityDto::try_from(value)?)
}

fn require_merge_patch(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case(MERGE_PATCH_JSON) {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType(content_type.to_string()))
    }
}

/// Body id present, equal to the path id, and naming a stored row
async fn check_target(
    state: &AppState,
    service: &EntityService,
    dto: &EntityDto,
    id: i64,
) -> Result<(), ApiError> {
    let d = service.descriptor();
    let Some(body_id) = dto.id() else {
        return Err(rejected(
            state,
            d,
            StatusCode::BAD_REQUEST,
            "idnull",
            "Invalid id".to_string(),
        ));
    };
    if body_id != id {
        return Err(rejected(
            state,
            d,
            StatusCode::BAD_REQUEST,
            "idinvalid",
            "Invalid ID".to_string(),
        ));
    }
    if !service.exists(id).await? {
        return Err(not_found(state, d));
    }
    Ok(())
}

fn not_found(state: &AppState, d: &EntityDescriptor) -> ApiError {
    rejected(
        state,
        d,
        StatusCode::NOT_FOUND,
        "idnotfound",
        "Entity not found".to_string(),
    )
}

fn rejected(
    state: &AppState,
    d: &EntityDescriptor,
    status: StatusCode,
    error_key: &'static str,
    message: String,
) -> ApiError {
    ApiError::Alert {
        status,
        message,
        entity_name: state.alerts.entity_name(d),
        error_key,
        headers: state.alerts.failure(d, error_key),
    }
}
