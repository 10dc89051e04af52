//! Schema bootstrap
//!
//! The entity tables are generated from the catalog, one table per descriptor
//! in dependency order, so foreign keys always point at a table created
//! earlier. Applied versions are tracked in `_migrations`.

use sqlx::SqlitePool;

use crate::domain::catalog::CATALOG;
use crate::domain::descriptor::EntityDescriptor;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// DDL of one entity table and the indexes on its foreign keys
pub fn table_ddl(descriptor: &EntityDescriptor) -> String {
    let mut columns = vec!["    id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for field in descriptor.fields {
        let not_null = if field.required { " NOT NULL" } else { "" };
        columns.push(format!(
            "    {} {}{}",
            field.column,
            field.kind.sql_type(),
            not_null
        ));
    }
    for relation in descriptor.relations {
        columns.push(format!(
            "    {} INTEGER REFERENCES {}(id)",
            relation.column, relation.target.table
        ));
    }

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
        descriptor.table,
        columns.join(",\n")
    );
    for relation in descriptor.relations {
        ddl.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column});\n",
            table = descriptor.table,
            column = relation.column
        ));
    }
    ddl
}

/// Migration 1: every catalog entity
pub fn catalog_schema() -> String {
    CATALOG
        .iter()
        .map(|descriptor| table_ddl(descriptor))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!(
            entities = CATALOG.len(),
            "Applying migration v1: entity catalog schema"
        );
        sqlx::raw_sql(&catalog_schema()).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Check if migrations are pending
pub async fn needs_migration(pool: &SqlitePool) -> anyhow::Result<bool> {
    let current_version = get_current_version(pool).await?;
    Ok(current_version < CURRENT_VERSION)
}

/// Get the migration status
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}
