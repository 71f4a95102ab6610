use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::record_store::{ItemFilter, RecordKind, RecordStore, Window};
use crate::core::database::apply_schema;
use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryChanges};
use crate::features::items::models::{Item, ItemChanges};

const CATEGORY_COLUMNS: &str = "id, name, slug, icon, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, name, slug, category_id, tags, title, content, images, \
                            file_path, external_link, created_at, updated_at";

/// Tag list of the current row, or an empty array when the stored text is damaged
const SAFE_TAGS: &str = "json_each(CASE WHEN json_valid(items.tags) THEN items.tags ELSE '[]' END)";

/// Item row as stored, with list columns still JSON encoded
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    name: String,
    slug: String,
    category_id: Option<Uuid>,
    tags: String,
    title: String,
    content: String,
    images: String,
    file_path: Option<String>,
    external_link: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        let tags = decode_list(row.id, "tags", &row.tags);
        let images = decode_list(row.id, "images", &row.images);
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            category_id: row.category_id,
            tags,
            title: row.title,
            content: row.content,
            images,
            file_path: row.file_path,
            external_link: row.external_link,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn decode_list(id: Uuid, column: &str, raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(
                "Item {} has malformed {} ({}); treating it as empty",
                id,
                column,
                e
            );
            Vec::new()
        }
    }
}

fn encode_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values)
        .map_err(|e| AppError::Internal(format!("Failed to encode list column: {}", e)))
}

/// Record store backed by a SQLite pool
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Log a failed read and repair the schema so the next read can succeed
    async fn recover<T>(&self, operation: &str, error: sqlx::Error, fallback: T) -> T {
        tracing::error!(
            "Record store read '{}' failed: {}; re-applying schema",
            operation,
            error
        );
        if let Err(e) = apply_schema(&self.pool).await {
            tracing::error!("Failed to re-apply schema: {}", e);
        }
        fallback
    }

    fn push_item_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ItemFilter) {
        builder.push(" WHERE 1 = 1");

        if let Some(search) = &filter.search {
            // lower() only folds ASCII, so the needle is folded the same way
            let needle = search.to_ascii_lowercase();
            builder
                .push(" AND (instr(lower(items.name), ")
                .push_bind(needle.clone())
                .push(") > 0 OR EXISTS (SELECT 1 FROM ")
                .push(SAFE_TAGS)
                .push(" AS t WHERE instr(lower(t.value), ")
                .push_bind(needle)
                .push(") > 0))");
        }

        if let Some(category_id) = filter.category_id {
            builder
                .push(" AND items.category_id = ")
                .push_bind(category_id);
        }

        if let Some(tag) = &filter.tag {
            builder
                .push(" AND EXISTS (SELECT 1 FROM ")
                .push(SAFE_TAGS)
                .push(" AS t WHERE t.value = ")
                .push_bind(tag.clone())
                .push(")");
        }
    }

    async fn fetch_item(&self, column: &str, value: Lookup<'_>) -> Result<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE {} = ?", ITEM_COLUMNS, column);
        let query = sqlx::query_as::<_, ItemRow>(&sql);
        let query = match value {
            Lookup::Id(id) => query.bind(id),
            Lookup::Slug(slug) => query.bind(slug.to_string()),
        };

        match query.fetch_optional(&self.pool).await {
            Ok(row) => Ok(row.map(Item::from)),
            Err(e) => Ok(self.recover("get_item", e, None).await),
        }
    }

    async fn fetch_category(&self, column: &str, value: Lookup<'_>) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE {} = ?",
            CATEGORY_COLUMNS, column
        );
        let query = sqlx::query_as::<_, Category>(&sql);
        let query = match value {
            Lookup::Id(id) => query.bind(id),
            Lookup::Slug(slug) => query.bind(slug.to_string()),
        };

        match query.fetch_optional(&self.pool).await {
            Ok(category) => Ok(category),
            Err(e) => Ok(self.recover("get_category", e, None).await),
        }
    }
}

/// Lookup key for single-record reads
enum Lookup<'a> {
    Id(Uuid),
    Slug(&'a str),
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories ORDER BY name COLLATE NOCASE, rowid",
            CATEGORY_COLUMNS
        );
        match sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await
        {
            Ok(categories) => Ok(categories),
            Err(e) => Ok(self.recover("list_categories", e, Vec::new()).await),
        }
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        self.fetch_category("id", Lookup::Id(id)).await
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.fetch_category("slug", Lookup::Slug(slug)).await
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, icon, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.icon)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert category: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: &CategoryChanges,
    ) -> Result<Option<Category>> {
        let sql = format!(
            r#"
            UPDATE categories
            SET name = ?, slug = ?, icon = ?, updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&sql)
            .bind(&changes.name)
            .bind(&changes.slug)
            .bind(&changes.icon)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update category {}: {:?}", id, e);
                AppError::Database(e)
            })
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query("UPDATE items SET category_id = NULL WHERE category_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if detached > 0 {
            tracing::info!("Detached {} item(s) from deleted category {}", detached, id);
        }

        Ok(deleted > 0)
    }

    async fn list_items(&self, filter: &ItemFilter, window: Option<Window>) -> Result<Vec<Item>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM items", ITEM_COLUMNS));
        Self::push_item_filter(&mut builder, filter);
        builder.push(" ORDER BY items.created_at DESC, items.rowid DESC");

        if let Some(window) = window {
            builder
                .push(" LIMIT ")
                .push_bind(window.limit)
                .push(" OFFSET ")
                .push_bind(window.offset);
        }

        match builder
            .build_query_as::<ItemRow>()
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => Ok(rows.into_iter().map(Item::from).collect()),
            Err(e) => Ok(self.recover("list_items", e, Vec::new()).await),
        }
    }

    async fn count_items(&self, filter: &ItemFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM items");
        Self::push_item_filter(&mut builder, filter);

        match builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
        {
            Ok(count) => Ok(count),
            Err(e) => Ok(self.recover("count_items", e, 0).await),
        }
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        self.fetch_item("id", Lookup::Id(id)).await
    }

    async fn get_item_by_slug(&self, slug: &str) -> Result<Option<Item>> {
        self.fetch_item("slug", Lookup::Slug(slug)).await
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        let tags = encode_list(&item.tags)?;
        let images = encode_list(&item.images)?;

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, slug, category_id, tags, title, content, images,
                file_path, external_link, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.slug)
        .bind(item.category_id)
        .bind(tags)
        .bind(&item.title)
        .bind(&item.content)
        .bind(images)
        .bind(&item.file_path)
        .bind(&item.external_link)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert item: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn update_item(&self, id: Uuid, changes: &ItemChanges) -> Result<Option<Item>> {
        let tags = encode_list(&changes.tags)?;
        let images = encode_list(&changes.images)?;
        let sql = format!(
            r#"
            UPDATE items
            SET name = ?, slug = ?, category_id = ?, tags = ?, title = ?, content = ?,
                images = ?, file_path = ?, external_link = ?, updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );

        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(&changes.name)
            .bind(&changes.slug)
            .bind(changes.category_id)
            .bind(tags)
            .bind(&changes.title)
            .bind(&changes.content)
            .bind(images)
            .bind(&changes.file_path)
            .bind(&changes.external_link)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update item {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        Ok(row.map(Item::from))
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete item {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn slug_taken(&self, kind: RecordKind, slug: &str, except: Option<Uuid>) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE slug = ? AND (? IS NULL OR id <> ?))",
            kind.table()
        );

        match sqlx::query_scalar::<_, bool>(&sql)
            .bind(slug)
            .bind(except)
            .bind(except)
            .fetch_one(&self.pool)
            .await
        {
            Ok(taken) => Ok(taken),
            Err(e) => Ok(self.recover("slug_taken", e, false).await),
        }
    }
}
