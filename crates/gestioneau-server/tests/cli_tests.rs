//! CLI integration tests for gestioneau
//!
//! Every command runs against a temporary config directory and temporary
//! database files.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's configuration and data
#[allow(deprecated)]
fn gestioneau_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gestioneau").unwrap();
    cmd.current_dir(dir.path());
    cmd.env("GESTIONEAU_CONFIG_DIR", dir.path().join("config"));
    cmd.env("GESTIONEAU_DATABASE_PATH", dir.path().join("data/gestioneau.db"));
    cmd.env("GESTIONEAU_SEARCH_PATH", dir.path().join("data/search.db"));
    cmd.env_remove("GESTIONEAU_HOST");
    cmd.env_remove("GESTIONEAU_PORT");
    cmd
}

#[test]
fn test_entities_lists_catalog() {
    let dir = TempDir::new().unwrap();
    gestioneau_cmd(&dir)
        .arg("entities")
        .assert()
        .success()
        .stdout(predicate::str::contains("Province"))
        .stdout(predicate::str::contains("fiche-suivi-ouvrages"));
}

#[test]
fn test_entities_json() {
    let dir = TempDir::new().unwrap();
    let output = gestioneau_cmd(&dir)
        .args(["--format", "json", "entities"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let catalog: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entities = catalog.as_array().unwrap();
    assert_eq!(entities.len(), 22);
    assert_eq!(entities[0]["resource"], "regions");
}

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    let expected = dir.path().join("config").join("config.toml");
    gestioneau_cmd(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();
    gestioneau_cmd(&dir)
        .args(["config", "set", "server.port", "9090"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set server.port = 9090"));

    gestioneau_cmd(&dir)
        .args(["config", "get", "server.port"])
        .assert()
        .success()
        .stdout("9090\n");

    assert!(dir.path().join("config/config.toml").exists());
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    gestioneau_cmd(&dir)
        .args(["config", "get", "server.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_reindex_empty_store() {
    let dir = TempDir::new().unwrap();
    gestioneau_cmd(&dir)
        .args(["reindex", "regions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("regions"))
        .stdout(predicate::str::contains("0 documents"));

    assert!(dir.path().join("data/gestioneau.db").exists());
    assert!(dir.path().join("data/search.db").exists());
}

#[test]
fn test_reindex_by_entity_name() {
    let dir = TempDir::new().unwrap();
    gestioneau_cmd(&dir)
        .args(["reindex", "Region"])
        .assert()
        .success()
        .stdout(predicate::str::contains("regions"))
        .stdout(predicate::str::contains("0 documents"));
}

#[test]
fn test_reindex_unknown_resource_fails() {
    let dir = TempDir::new().unwrap();
    gestioneau_cmd(&dir)
        .args(["reindex", "widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown resource"));
}

#[test]
fn test_doctor() {
    let dir = TempDir::new().unwrap();
    gestioneau_cmd(&dir)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Configuration: Valid"))
        .stdout(predicate::str::contains("[OK] Database: Connected"))
        .stdout(predicate::str::contains("[OK] Search mirror: Connected"));
}
