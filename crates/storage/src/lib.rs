//! Storage layer: SQLite persistence for the vector index.
//!
//! Holds DB pool setup, the migration runner, and vector-row helpers.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

pub mod models;

use models::VectorRow;

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let mut url = database_url.to_string();
    if !database_url.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let norm = path.to_string_lossy().replace('\\', "/");
        if path.is_absolute() {
            url = format!("sqlite:///{}?mode=rwc", norm.trim_start_matches('/'));
        } else {
            url = format!("sqlite://{}?mode=rwc", norm);
        }
    }
    let mut opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        opts = opts.max_connections(1);
    } else {
        opts = opts.max_connections(5);
    }
    let pool = opts.connect(&url).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Applies SQLx migrations located in crates/storage/migrations.
    // Safe to run multiple times (idempotent).
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert or replace by `(collection, id)`. A replace keeps the original
/// insertion `seq` so query tie-break order stays stable across re-indexing.
pub async fn upsert_vector(pool: &SqlitePool, row: &VectorRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO vectors (collection, id, embedding, document, metadata_json, seq)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(collection, id) DO UPDATE SET
            embedding=excluded.embedding,
            document=excluded.document,
            metadata_json=excluded.metadata_json
        "#,
    )
    .bind(&row.collection)
    .bind(&row.id)
    .bind(&row.embedding)
    .bind(&row.document)
    .bind(&row.metadata_json)
    .bind(row.seq)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_vector(
    pool: &SqlitePool,
    collection: &str,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM vectors WHERE collection = ?1 AND id = ?2")
        .bind(collection)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_collection(
    pool: &SqlitePool,
    collection: &str,
) -> Result<Vec<VectorRow>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT collection, id, embedding, document, metadata_json, seq
        FROM vectors WHERE collection = ?1 ORDER BY seq ASC
        "#,
    )
    .bind(collection)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(VectorRow {
            collection: row.try_get("collection")?,
            id: row.try_get("id")?,
            embedding: row.try_get("embedding")?,
            document: row.try_get("document")?,
            metadata_json: row.try_get("metadata_json")?,
            seq: row.try_get("seq")?,
        });
    }
    Ok(out)
}

pub async fn max_seq(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COALESCE(MAX(seq), 0) AS max_seq FROM vectors")
        .fetch_one(pool)
        .await?;
    row.try_get("max_seq")
}
