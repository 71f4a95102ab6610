#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use base64::prelude::*;
#[cfg(test)]
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
#[cfg(test)]
use sqlx::SqlitePool;
#[cfg(test)]
use std::str::FromStr;

#[cfg(test)]
use crate::core::database::apply_schema;
#[cfg(test)]
use crate::modules::storage::{AssetStore, RecordStore, SqliteRecordStore};

#[cfg(test)]
pub const TEST_ADMIN_USERNAME: &str = "admin";
#[cfg(test)]
pub const TEST_ADMIN_PASSWORD: &str = "secret";

/// In-memory database with the catalog schema.
///
/// Every in-memory connection is its own database, so the pool is pinned to
/// one connection that never expires.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    apply_schema(&pool).await.unwrap();
    pool
}

/// Record store, asset store and the temp directory backing the assets.
///
/// Keep the `TempDir` alive for the duration of the test.
#[cfg(test)]
pub struct TestStores {
    pub dir: tempfile::TempDir,
    pub records: Arc<SqliteRecordStore>,
    pub assets: Arc<AssetStore>,
}

#[cfg(test)]
impl TestStores {
    pub fn record_store(&self) -> Arc<dyn RecordStore> {
        self.records.clone()
    }
}

#[cfg(test)]
pub async fn test_stores() -> TestStores {
    let dir = tempfile::tempdir().unwrap();
    let assets = AssetStore::new(dir.path());
    assets.ensure_layout().await.unwrap();

    TestStores {
        records: Arc::new(SqliteRecordStore::new(memory_pool().await)),
        assets: Arc::new(assets),
        dir,
    }
}

/// `Authorization` header value for the test admin
#[cfg(test)]
pub fn admin_basic_auth() -> String {
    format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{}:{}", TEST_ADMIN_USERNAME, TEST_ADMIN_PASSWORD))
    )
}

#[cfg(test)]
pub fn admin_credentials() -> Arc<String> {
    Arc::new(format!("{}:{}", TEST_ADMIN_USERNAME, TEST_ADMIN_PASSWORD))
}

/// Random display name for generated fixtures
#[cfg(test)]
pub fn fake_item_name() -> String {
    use fake::faker::lorem::en::Words;
    use fake::Fake;

    let words: Vec<String> = Words(2..4).fake();
    words.join(" ")
}
