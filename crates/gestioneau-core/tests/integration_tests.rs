//! Gestioneau Core Integration Tests

use std::sync::Arc;

use gestioneau_core::{
    Error,
    domain::{EntityDto, Order, Pageable, catalog},
    search::{SearchIndex, SqliteSearchIndex},
    service::ServiceRegistry,
    storage::Database,
};
use serde_json::{Value, json};

async fn registry() -> ServiceRegistry {
    let db = Database::in_memory().await.expect("store");
    let index = SqliteSearchIndex::in_memory().await.expect("search mirror");
    ServiceRegistry::new(db.pool().clone(), Arc::new(index))
}

fn dto(value: Value) -> EntityDto {
    EntityDto::try_from(value).expect("object")
}

#[tokio::test]
async fn test_province_reads_back_its_region() {
    let registry = registry().await;
    let regions = registry.resolve("regions").unwrap();
    let provinces = registry.resolve("provinces").unwrap();

    let centre = regions.save(&dto(json!({ "libelle": "Centre" }))).await.unwrap();
    let kadiogo = provinces
        .save(&dto(json!({
            "libelle": "Kadiogo",
            "region": { "id": centre.id() }
        })))
        .await
        .unwrap();

    let found = provinces
        .find_one(kadiogo.id().unwrap())
        .await
        .unwrap()
        .expect("saved province");

    assert_eq!(found.get("libelle"), Some(&json!("Kadiogo")));
    assert_eq!(
        found.get("region"),
        Some(&json!({ "id": centre.id(), "libelle": "Centre" }))
    );
}

#[tokio::test]
async fn test_find_one_after_save_matches_input() {
    let registry = registry().await;
    let previsions = registry.resolve("previsions").unwrap();

    let input = json!({
        "nbLatrine": 10,
        "nbPuisard": 4,
        "nbPublic": 1,
        "nbScolaire": 2,
        "centre": null,
        "refannee": null
    });
    let saved = previsions.save(&dto(input.clone())).await.unwrap();
    let found = previsions
        .find_one(saved.id().unwrap())
        .await
        .unwrap()
        .unwrap();

    let mut expected = input;
    expected["id"] = json!(saved.id());
    assert_eq!(found.into_value(), expected);
}

#[tokio::test]
async fn test_fiche_suivi_ouvrage_joins_every_relation() {
    let registry = registry().await;
    let mut fiche = json!({
        "prjAppuis": "PN-AEPA",
        "nomBenef": "Ouedraogo",
        "prenomBenef": "Awa",
        "professionBenef": "Commercante",
        "nbUsagers": 8,
        "contacts": "70 00 00 00",
        "longitude": -1.5197,
        "latitude": 12.3714,
        "dateRemiseDevis": "2021-01-15T00:00:00Z",
        "dateDebutTravaux": "2021-02-01T00:00:00Z",
        "dateFinTravaux": "2021-03-01T00:00:00Z",
        "coutMenage": "25000",
        "subvOnea": 100000,
        "subvProjet": 50000,
        "autreSubv": 0,
        "toles": 6,
        "animateur": "Kabore",
        "superviseur": "Zongo",
        "controleur": "Traore"
    });

    // Lookup tables referenced by the sheet
    for (relation, resource) in [
        ("natureouvrage", "nature-ouvrages"),
        ("typehabitation", "type-habitations"),
        ("sourceapprovep", "source-approv-eps"),
        ("modeevacuationeauusee", "mode-evacuation-eau-usees"),
        ("modeevacexcreta", "mode-evac-excretas"),
        ("macon", "macons"),
        ("prefabricant", "prefabricants"),
    ] {
        let saved = registry
            .resolve(resource)
            .unwrap()
            .save(&dto(json!({ "libelle": format!("{} 1", relation) })))
            .await
            .unwrap();
        fiche[relation] = json!({ "id": saved.id() });
    }

    let fiches = registry.resolve("fiche-suivi-ouvrages").unwrap();
    let saved = fiches.save(&dto(fiche)).await.unwrap();
    let found = fiches.find_one(saved.id().unwrap()).await.unwrap().unwrap();

    assert_eq!(found.get("macon").unwrap()["libelle"], json!("macon 1"));
    assert_eq!(found.get("parcelle"), Some(&Value::Null));
    assert_eq!(found.get("rue"), Some(&Value::Null));
    assert_eq!(found.get("longitude"), Some(&json!(-1.5197)));
    assert_eq!(found.get("dateDebutTravaux"), Some(&json!("2021-02-01T00:00:00Z")));
}

#[tokio::test]
async fn test_delete_twice_is_not_an_error() {
    let registry = registry().await;
    let regions = registry.resolve("regions").unwrap();
    let id = regions
        .save(&dto(json!({ "libelle": "Nord" })))
        .await
        .unwrap()
        .id()
        .unwrap();

    regions.delete(id).await.unwrap();
    regions.delete(id).await.unwrap();
    assert!(regions.find_one(id).await.unwrap().is_none());
    assert_eq!(regions.search_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_partial_update_never_nulls_absent_fields() {
    let registry = registry().await;
    let directions = registry.resolve("direction-regionales").unwrap();
    let saved = directions
        .save(&dto(json!({
            "libelle": "DR Centre",
            "responsable": "Sawadogo",
            "contact": "25 30 00 00"
        })))
        .await
        .unwrap();

    let patched = directions
        .partial_update(&dto(json!({ "id": saved.id(), "contact": "25 31 11 11", "responsable": null })))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(patched.get("libelle"), Some(&json!("DR Centre")));
    assert_eq!(patched.get("responsable"), Some(&json!("Sawadogo")));
    assert_eq!(patched.get("contact"), Some(&json!("25 31 11 11")));
}

#[tokio::test]
async fn test_relation_is_null_returns_exact_subset() {
    let registry = registry().await;
    let regions = registry.resolve("regions").unwrap();
    let provinces = registry.resolve("provinces").unwrap();
    let centre = regions.save(&dto(json!({ "libelle": "Centre" }))).await.unwrap();

    let mut orphan_ids = Vec::new();
    for (i, linked) in [true, false, true, false, false].into_iter().enumerate() {
        let mut body = json!({ "libelle": format!("Province {}", i) });
        if linked {
            body["region"] = json!({ "id": centre.id() });
        }
        let saved = provinces.save(&dto(body)).await.unwrap();
        if !linked {
            orphan_ids.push(saved.id().unwrap());
        }
    }

    let found: Vec<i64> = provinces
        .find_all_where_relation_is_null("region")
        .await
        .unwrap()
        .iter()
        .filter_map(EntityDto::id)
        .collect();
    assert_eq!(found, orphan_ids);
}

#[tokio::test]
async fn test_annee_without_prevision_filter() {
    let registry = registry().await;
    let annees = registry.resolve("annees").unwrap();
    let previsions = registry.resolve("previsions").unwrap();

    let planned = annees.save(&dto(json!({ "libelle": "2020" }))).await.unwrap();
    let free = annees.save(&dto(json!({ "libelle": "2021" }))).await.unwrap();
    previsions
        .save(&dto(json!({
            "nbLatrine": 1, "nbPuisard": 1, "nbPublic": 0, "nbScolaire": 0,
            "refannee": { "id": planned.id() }
        })))
        .await
        .unwrap();

    let filter = catalog::ANNEE.null_filter("prevision-is-null").unwrap();
    let found = annees.find_all_where_null(filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), free.id());
}

#[tokio::test]
async fn test_page_size_bounds_rows_and_count_is_total() {
    let registry = registry().await;
    let macons = registry.resolve("macons").unwrap();
    for i in 0..7 {
        macons
            .save(&dto(json!({ "libelle": format!("Macon {}", i) })))
            .await
            .unwrap();
    }

    for size in [1, 3, 7, 10] {
        let page = macons.find_all(&Pageable::new(0, size)).await.unwrap();
        assert!(page.len() <= size as usize);
        assert_eq!(macons.count_all().await.unwrap(), 7);
    }

    let sorted = macons
        .find_all(&Pageable::new(0, 2).sorted_by(Order::desc("id")))
        .await
        .unwrap();
    assert!(sorted[0].id() > sorted[1].id());
}

#[tokio::test]
async fn test_dangling_reference_is_constraint_violation() {
    let registry = registry().await;
    let communes = registry.resolve("communes").unwrap();
    let result = communes
        .save(&dto(json!({ "libelle": "Ouagadougou", "province": { "id": 404 } })))
        .await;
    assert!(matches!(result, Err(Error::ConstraintViolation(_))));
    assert_eq!(communes.search_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_search_does_not_touch_store() {
    let db = Database::in_memory().await.unwrap();
    let index = Arc::new(SqliteSearchIndex::in_memory().await.unwrap());
    let registry = ServiceRegistry::new(db.pool().clone(), index.clone());
    let regions = registry.resolve("regions").unwrap();

    regions.save(&dto(json!({ "libelle": "Hauts-Bassins" }))).await.unwrap();
    // Row removed behind the service's back: the mirror still answers
    sqlx::query("DELETE FROM region").execute(db.pool()).await.unwrap();

    let hits = regions.search("bassins", &Pageable::default()).await.unwrap();
    assert_eq!(hits.len(), 1);

    assert_eq!(registry.reindex_all().await.unwrap().len(), catalog::CATALOG.len());
    assert_eq!(index.count(&catalog::REGION).await.unwrap(), 0);
}
