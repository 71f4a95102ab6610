use crate::core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Idempotent catalog schema.
///
/// Applied at startup and re-applied whenever a read finds the schema
/// damaged, so every statement must be safe to run against an existing database.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id BLOB PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    icon TEXT NOT NULL DEFAULT 'fa-solid fa-folder',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_slug ON categories (slug);

CREATE TABLE IF NOT EXISTS items (
    id BLOB PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    category_id BLOB NULL REFERENCES categories (id) ON DELETE SET NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    images TEXT NOT NULL DEFAULT '[]',
    file_path TEXT NULL,
    external_link TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_items_slug ON items (slug);
CREATE INDEX IF NOT EXISTS idx_items_category_id ON items (category_id);
"#;

/// SQLite result codes that mean the file itself is unusable
const SQLITE_CORRUPT: &str = "11";
const SQLITE_NOTADB: &str = "26";

/// Open the catalog database and make sure the schema exists.
///
/// A database file that SQLite reports as corrupt is moved aside and replaced
/// by a fresh, empty one. Any other failure is returned to the caller.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let file = database_file(&config.url, &options);
    if let Some(parent) = file.as_deref().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    match open_with_schema(config, options.clone()).await {
        Ok(pool) => Ok(pool),
        Err(e) if is_corruption(&e) => {
            let Some(file) = file else {
                return Err(e);
            };
            tracing::error!(
                "Database at {} is unreadable ({}); starting from an empty store",
                file.display(),
                e
            );
            quarantine(&file).await?;
            open_with_schema(config, options).await
        }
        Err(e) => Err(e),
    }
}

/// Apply the idempotent schema to an open pool
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

async fn open_with_schema(
    config: &DatabaseConfig,
    options: SqliteConnectOptions,
) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    if let Err(e) = apply_schema(&pool).await {
        pool.close().await;
        return Err(e);
    }

    Ok(pool)
}

fn database_file(url: &str, options: &SqliteConnectOptions) -> Option<PathBuf> {
    if url.contains(":memory:") || url.contains("mode=memory") {
        return None;
    }
    Some(options.get_filename().to_path_buf())
}

fn is_corruption(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => {
            let code = db.code();
            matches!(code.as_deref(), Some(SQLITE_CORRUPT) | Some(SQLITE_NOTADB))
                || db.message().contains("not a database")
                || db.message().contains("malformed")
        }
        _ => false,
    }
}

/// Move a damaged database file aside as `<file>.corrupt-<timestamp>`
async fn quarantine(file: &Path) -> std::io::Result<()> {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let mut target = file.as_os_str().to_owned();
    target.push(format!(".corrupt-{}", stamp));
    let target = PathBuf::from(target);

    tokio::fs::rename(file, &target).await?;
    tracing::warn!("Moved damaged database to {}", target.display());

    // Journal sidecars belong to the damaged file
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = file.as_os_str().to_owned();
        sidecar.push(suffix);
        let _ = tokio::fs::remove_file(PathBuf::from(sidecar)).await;
    }

    Ok(())
}
