//! REST API tests driving the router in-process

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use gestioneau_core::config::Config;
use gestioneau_core::search::SqliteSearchIndex;
use gestioneau_core::storage::Database;
use gestioneau_server::{AppState, build_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const MERGE_PATCH: &str = "application/merge-patch+json";

async fn app() -> Router {
    let db = Database::in_memory().await.expect("store");
    let index = SqliteSearchIndex::in_memory().await.expect("search mirror");
    let state = AppState::new(db, Arc::new(index), &Config::default()).expect("state");
    build_router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    content_type: Option<&str>,
    body: Option<String>,
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        request = request.header(header::CONTENT_TYPE, content_type);
    }
    let body = body.map(Body::from).unwrap_or_else(Body::empty);
    app.clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, "GET", uri, None, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, "POST", uri, Some("application/json"), Some(body.to_string())).await
}

async fn put(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, "PUT", uri, Some("application/json"), Some(body.to_string())).await
}

async fn patch(app: &Router, uri: &str, content_type: &str, body: Value) -> Response<Body> {
    send(app, "PATCH", uri, Some(content_type), Some(body.to_string())).await
}

async fn body_json(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_str<'a>(resp: &'a Response<Body>, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Create an entity and return its id
async fn create(app: &Router, resource: &str, body: Value) -> i64 {
    let resp = post(app, &format!("/api/{}", resource), body).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_returns_location_and_alert() {
    let app = app().await;
    let resp = post(&app, "/api/regions", json!({ "libelle": "Centre" })).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(header_str(&resp, "location"), Some("/api/regions/1"));
    assert_eq!(
        header_str(&resp, "x-gestioneauapp-alert"),
        Some("gestioneauApp.gestioneauRegion.created")
    );
    assert_eq!(header_str(&resp, "x-gestioneauapp-params"), Some("1"));
    assert_eq!(body_json(resp).await, json!({ "id": 1, "libelle": "Centre" }));
}

#[tokio::test]
async fn test_create_with_id_is_rejected() {
    let app = app().await;
    let resp = post(&app, "/api/regions", json!({ "id": 5, "libelle": "Centre" })).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_str(&resp, "x-gestioneauapp-error"), Some("error.idexists"));
    assert_eq!(
        header_str(&resp, "x-gestioneauapp-params"),
        Some("gestioneauRegion")
    );
    let problem = body_json(resp).await;
    assert_eq!(problem["status"], json!(400));
    assert_eq!(problem["errorKey"], json!("idexists"));
    assert_eq!(problem["entityName"], json!("gestioneauRegion"));

    let list = get(&app, "/api/regions").await;
    assert_eq!(header_str(&list, "x-total-count"), Some("0"));
}

#[tokio::test]
async fn test_get_returns_related_summary() {
    let app = app().await;
    let region = create(&app, "regions", json!({ "libelle": "Centre" })).await;
    let province = create(
        &app,
        "provinces",
        json!({ "libelle": "Kadiogo", "region": { "id": region } }),
    )
    .await;

    let resp = get(&app, &format!("/api/provinces/{}", province)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({
            "id": province,
            "libelle": "Kadiogo",
            "region": { "id": region, "libelle": "Centre" }
        })
    );
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let app = app().await;
    let resp = get(&app, "/api/regions/42").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["status"], json!(404));

    let resp = get(&app, "/api/regions/abc").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_put_replaces_entity() {
    let app = app().await;
    let id = create(&app, "regions", json!({ "libelle": "Centre" })).await;

    let resp = put(
        &app,
        &format!("/api/regions/{}", id),
        json!({ "id": id, "libelle": "Centre-Nord" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        header_str(&resp, "x-gestioneauapp-alert"),
        Some("gestioneauApp.gestioneauRegion.updated")
    );

    let found = body_json(get(&app, &format!("/api/regions/{}", id)).await).await;
    assert_eq!(found["libelle"], json!("Centre-Nord"));
}

#[tokio::test]
async fn test_put_id_mismatch_does_not_mutate() {
    let app = app().await;
    let id = create(&app, "communes", json!({ "libelle": "Ouagadougou" })).await;

    let resp = put(
        &app,
        &format!("/api/communes/{}", id + 7),
        json!({ "id": id, "libelle": "Bobo-Dioulasso" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_str(&resp, "x-gestioneauapp-error"), Some("error.idinvalid"));

    let found = body_json(get(&app, &format!("/api/communes/{}", id)).await).await;
    assert_eq!(found["libelle"], json!("Ouagadougou"));
}

#[tokio::test]
async fn test_put_without_id_or_on_missing_row() {
    let app = app().await;

    let resp = put(&app, "/api/regions/1", json!({ "libelle": "Est" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["errorKey"], json!("idnull"));

    let resp = put(&app, "/api/regions/99", json!({ "id": 99, "libelle": "Est" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(header_str(&resp, "x-gestioneauapp-error"), Some("error.idnotfound"));
}

#[tokio::test]
async fn test_patch_requires_merge_patch_content_type() {
    let app = app().await;
    let id = create(&app, "regions", json!({ "libelle": "Sahel" })).await;

    let resp = patch(
        &app,
        &format!("/api/regions/{}", id),
        "application/json",
        json!({ "id": id, "libelle": "Nord" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let found = body_json(get(&app, &format!("/api/regions/{}", id)).await).await;
    assert_eq!(found["libelle"], json!("Sahel"));
}

#[tokio::test]
async fn test_patch_merges_non_null_properties() {
    let app = app().await;
    let id = create(
        &app,
        "direction-regionales",
        json!({ "libelle": "DR Centre", "responsable": "Sawadogo", "contact": "25 30 00 00" }),
    )
    .await;

    let resp = patch(
        &app,
        &format!("/api/direction-regionales/{}", id),
        MERGE_PATCH,
        json!({ "id": id, "contact": "25 31 11 11", "responsable": null }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        header_str(&resp, "x-gestioneauapp-alert"),
        Some("gestioneauApp.gestioneauDirectionRegionale.updated")
    );

    let patched = body_json(resp).await;
    assert_eq!(patched["libelle"], json!("DR Centre"));
    assert_eq!(patched["responsable"], json!("Sawadogo"));
    assert_eq!(patched["contact"], json!("25 31 11 11"));

    let resp = patch(
        &app,
        "/api/direction-regionales/77",
        "application/merge-patch+json; charset=utf-8",
        json!({ "id": 77, "contact": "x" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_page_beyond_range() {
    let app = app().await;
    create(&app, "regions", json!({ "libelle": "Sahel" })).await;

    let resp = get(&app, "/api/regions?page=4294967295&size=1").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "x-total-count"), Some("1"));
    let link = header_str(&resp, "link").unwrap().to_string();
    assert!(!link.contains("rel=\"next\""));
    assert!(link.contains("rel=\"prev\""));
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn test_list_pagination_headers() {
    let app = app().await;
    for name in ["Boucle du Mouhoun", "Cascades", "Centre", "Centre-Est", "Sahel"] {
        create(&app, "regions", json!({ "libelle": name })).await;
    }

    let resp = get(&app, "/api/regions?page=1&size=2").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "x-total-count"), Some("5"));
    assert_eq!(
        header_str(&resp, "link"),
        Some(
            "</api/regions?page=2&size=2>; rel=\"next\",\
             </api/regions?page=0&size=2>; rel=\"prev\",\
             </api/regions?page=2&size=2>; rel=\"last\",\
             </api/regions?page=0&size=2>; rel=\"first\""
        )
    );
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);

    let sorted = body_json(get(&app, "/api/regions?sort=id,desc&size=3").await).await;
    let ids: Vec<i64> = sorted
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![5, 4, 3]);

    let resp = get(&app, "/api/regions?sort=population").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_with_null_filter() {
    let app = app().await;
    let planned = create(&app, "annees", json!({ "libelle": "2020" })).await;
    let free = create(&app, "annees", json!({ "libelle": "2021" })).await;
    create(
        &app,
        "previsions",
        json!({
            "nbLatrine": 1, "nbPuisard": 1, "nbPublic": 0, "nbScolaire": 0,
            "refannee": { "id": planned }
        }),
    )
    .await;

    let resp = get(&app, "/api/annees?filter=prevision-is-null").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-total-count").is_none());
    let found = body_json(resp).await;
    assert_eq!(found, json!([{ "id": free, "libelle": "2021" }]));

    let resp = get(&app, "/api/annees?filter=unknown-filter").await;
    assert_eq!(header_str(&resp, "x-total-count"), Some("2"));
}

#[tokio::test]
async fn test_delete_returns_no_content() {
    let app = app().await;
    let id = create(&app, "macons", json!({ "libelle": "Kabore" })).await;

    let resp = send(&app, "DELETE", &format!("/api/macons/{}", id), None, None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        header_str(&resp, "x-gestioneauapp-alert"),
        Some("gestioneauApp.gestioneauMacon.deleted")
    );

    let resp = get(&app, &format!("/api/macons/{}", id)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, "DELETE", &format!("/api/macons/{}", id), None, None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_search_endpoint() {
    let app = app().await;
    for name in ["Centre", "Centre-Est", "Sahel"] {
        create(&app, "regions", json!({ "libelle": name })).await;
    }

    let resp = get(&app, "/api/_search/regions?query=centre").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "x-total-count"), Some("3"));
    let hits = body_json(resp).await;
    assert_eq!(hits.as_array().unwrap().len(), 2);

    let resp = get(&app, "/api/_search/regions?query=sah*").await;
    assert_eq!(body_json(resp).await, json!([{ "id": 3, "libelle": "Sahel" }]));

    let resp = get(&app, "/api/_search/regions").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_resource_is_not_found() {
    let app = app().await;
    let resp = get(&app, "/api/widgets").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["status"], json!(404));

    let resp = post(&app, "/api/widgets", json!({ "libelle": "x" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let app = app().await;

    let resp = send(
        &app,
        "POST",
        "/api/regions",
        Some("application/json"),
        Some("{\"libelle\": ".to_string()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], json!("error.http.400"));

    let resp = post(&app, "/api/regions", json!(["Centre"])).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post(&app, "/api/previsions", json!({ "nbLatrine": "ten" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dangling_reference_is_server_error() {
    let app = app().await;
    let resp = post(
        &app,
        "/api/provinces",
        json!({ "libelle": "Kadiogo", "region": { "id": 404 } }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["status"], json!(500));
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let resp = get(&app, "/api/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({
            "status": "UP",
            "components": {
                "db": { "status": "UP" },
                "search": { "status": "UP" }
            }
        })
    );
}
