use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::{Category, CategoryChanges};
use crate::features::items::models::{Item, ItemChanges};
use crate::shared::normalize::suffixed_slug;

/// Record collections that carry a unique slug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Categories,
    Items,
}

impl RecordKind {
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Categories => "categories",
            RecordKind::Items => "items",
        }
    }
}

/// Conditions applied to item listings, ANDed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Case-insensitive substring of the name or of any tag
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    /// Exact tag membership
    pub tag: Option<String>,
}

/// Row window of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
}

/// Persistence for categories and items.
///
/// Reads never fail on a damaged schema: implementations log, repair and
/// answer empty or `None`. Writes surface their errors.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // Categories

    /// All categories ordered by name
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    async fn insert_category(&self, category: &Category) -> Result<()>;

    async fn update_category(
        &self,
        id: Uuid,
        changes: &CategoryChanges,
    ) -> Result<Option<Category>>;

    /// Delete a category and detach its items. Returns whether a row went away.
    async fn delete_category(&self, id: Uuid) -> Result<bool>;

    // Items

    /// Items matching `filter`, newest first
    async fn list_items(&self, filter: &ItemFilter, window: Option<Window>) -> Result<Vec<Item>>;

    async fn count_items(&self, filter: &ItemFilter) -> Result<i64>;

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>>;

    async fn get_item_by_slug(&self, slug: &str) -> Result<Option<Item>>;

    async fn insert_item(&self, item: &Item) -> Result<()>;

    /// Replace the mutable columns of an item. This write is the commit
    /// point of an upsert.
    async fn update_item(&self, id: Uuid, changes: &ItemChanges) -> Result<Option<Item>>;

    async fn delete_item(&self, id: Uuid) -> Result<bool>;

    // Slugs

    /// Whether `slug` belongs to a record of `kind` other than `except`
    async fn slug_taken(&self, kind: RecordKind, slug: &str, except: Option<Uuid>) -> Result<bool>;
}

/// First free slug for `base`, trying `base`, `base-2`, `base-3`, ...
///
/// The record `except` does not collide with itself, so renaming a record to
/// its current name keeps its slug.
pub async fn unique_slug(
    store: &dyn RecordStore,
    kind: RecordKind,
    base: &str,
    except: Option<Uuid>,
) -> Result<String> {
    if !store.slug_taken(kind, base, except).await? {
        return Ok(base.to_string());
    }

    let mut attempt = 2;
    loop {
        let candidate = suffixed_slug(base, attempt);
        if !store.slug_taken(kind, &candidate, except).await? {
            tracing::debug!(
                "Slug '{}' taken in {}, using '{}'",
                base,
                kind.table(),
                candidate
            );
            return Ok(candidate);
        }
        attempt += 1;
    }
}
