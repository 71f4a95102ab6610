use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::record_store::{unique_slug, ItemFilter, RecordKind, RecordStore};
use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;
use crate::features::items::models::Item;
use crate::shared::constants::DEFAULT_CATEGORY_ICON;
use crate::shared::normalize::slugify;

/// Flat-file catalog (`database.json`) as written by the file-backed store
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    categories: Vec<SnapshotCategory>,
    #[serde(default)]
    items: Vec<SnapshotItem>,
}

#[derive(Debug, Deserialize)]
struct SnapshotCategory {
    id: Uuid,
    name: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotItem {
    id: Uuid,
    name: String,
    #[serde(default)]
    slug: Option<String>,
    /// Blank or dangling references are dropped on import
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    external_link: Option<String>,
}

/// Records written by one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub categories: usize,
    pub items: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Replace the store's contents with a flat-file snapshot.
///
/// The file is read and parsed before anything is touched, so a missing or
/// malformed snapshot leaves the store as it was. Existing records are then
/// cleared and the snapshot's categories and items inserted with their ids.
/// Asset files are not touched.
pub async fn import_snapshot(store: &dyn RecordStore, path: &Path) -> Result<ImportReport> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        tracing::error!("Failed to read snapshot {}: {}", path.display(), e);
        AppError::Storage(e)
    })?;
    let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
        AppError::Validation(format!("Invalid snapshot {}: {}", path.display(), e))
    })?;

    tracing::info!(
        "Read {} categories and {} items from {}",
        snapshot.categories.len(),
        snapshot.items.len(),
        path.display()
    );

    clear(store).await?;

    let mut report = ImportReport::default();
    let mut category_ids = HashSet::new();

    for entry in snapshot.categories {
        let base = non_blank(entry.slug).unwrap_or_else(|| slugify(&entry.name));
        let slug = unique_slug(store, RecordKind::Categories, &base, None).await?;
        if slug != base {
            tracing::warn!("Category slug '{}' already taken, imported as '{}'", base, slug);
        }

        let now = Utc::now();
        let category = Category {
            id: entry.id,
            name: entry.name,
            slug,
            icon: non_blank(entry.icon).unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string()),
            created_at: now,
            updated_at: now,
        };
        store.insert_category(&category).await?;
        category_ids.insert(category.id);
        report.categories += 1;
    }

    for entry in snapshot.items {
        let base = non_blank(entry.slug).unwrap_or_else(|| slugify(&entry.name));
        let slug = unique_slug(store, RecordKind::Items, &base, None).await?;
        if slug != base {
            tracing::warn!("Item slug '{}' already taken, imported as '{}'", base, slug);
        }

        let category_id = match non_blank(entry.category_id) {
            None => None,
            Some(raw) => match Uuid::parse_str(raw.trim()) {
                Ok(id) if category_ids.contains(&id) => Some(id),
                _ => {
                    tracing::warn!(
                        "Item {} references unknown category '{}'; importing it uncategorized",
                        entry.id,
                        raw
                    );
                    None
                }
            },
        };

        let mut item = Item::skeleton(entry.name, slug);
        item.id = entry.id;
        item.category_id = category_id;
        item.tags = entry.tags.unwrap_or_default();
        item.title = non_blank(entry.title).unwrap_or_else(|| item.name.clone());
        item.content = entry.content.unwrap_or_default();
        item.images = entry.images.unwrap_or_default();
        item.file_path = non_blank(entry.file_path);
        item.external_link = non_blank(entry.external_link);

        store.insert_item(&item).await?;
        report.items += 1;
    }

    tracing::info!(
        "Imported {} categories and {} items",
        report.categories,
        report.items
    );
    Ok(report)
}

async fn clear(store: &dyn RecordStore) -> Result<()> {
    let items = store.list_items(&ItemFilter::default(), None).await?;
    for item in &items {
        store.delete_item(item.id).await?;
    }

    let categories = store.list_categories().await?;
    for category in &categories {
        store.delete_category(category.id).await?;
    }

    tracing::info!(
        "Cleared {} categories and {} items before import",
        categories.len(),
        items.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::test_stores;
    use serde_json::json;

    async fn write_snapshot(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("database.json");
        tokio::fs::write(&path, body).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_import_replaces_store_contents() {
        let stores = test_stores().await;
        let store = stores.record_store();
        let stale = Item::skeleton("Stale".into(), "stale".into());
        store.insert_item(&stale).await.unwrap();

        let category_id = Uuid::new_v4();
        let first_id = Uuid::new_v4();
        let second_id = Uuid::new_v4();
        let body = json!({
            "categories": [
                { "id": category_id, "name": "Themes", "slug": "themes" }
            ],
            "items": [
                {
                    "id": first_id,
                    "name": "Night Kit",
                    "slug": "night-kit",
                    "categoryId": category_id,
                    "tags": ["dark", "landing"],
                    "images": ["/uploads/images/a.png"],
                    "filePath": "/uploads/files/a.zip",
                    "externalLink": ""
                },
                {
                    "id": second_id,
                    "name": "Loose",
                    "slug": "loose",
                    "categoryId": Uuid::new_v4()
                }
            ]
        })
        .to_string();
        let path = write_snapshot(stores.dir.path(), &body).await;

        let report = import_snapshot(store.as_ref(), &path).await.unwrap();
        assert_eq!(report, ImportReport { categories: 1, items: 2 });

        assert!(store.get_item(stale.id).await.unwrap().is_none());

        let category = store.get_category(category_id).await.unwrap().unwrap();
        assert_eq!(category.icon, DEFAULT_CATEGORY_ICON);

        let first = store.get_item(first_id).await.unwrap().unwrap();
        assert_eq!(first.category_id, Some(category_id));
        assert_eq!(first.tags, vec!["dark".to_string(), "landing".to_string()]);
        assert_eq!(first.images, vec!["/uploads/images/a.png".to_string()]);
        assert_eq!(first.title, "Night Kit");
        assert_eq!(first.file_path.as_deref(), Some("/uploads/files/a.zip"));
        assert!(first.external_link.is_none());

        let second = store.get_item(second_id).await.unwrap().unwrap();
        assert!(second.category_id.is_none());
        assert!(second.tags.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_snapshot_leaves_store_untouched() {
        let stores = test_stores().await;
        let store = stores.record_store();
        let kept = Item::skeleton("Kept".into(), "kept".into());
        store.insert_item(&kept).await.unwrap();

        let path = write_snapshot(stores.dir.path(), "{ \"items\": [ { \"id\": ").await;
        let result = import_snapshot(store.as_ref(), &path).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.get_item(kept.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_storage_error() {
        let stores = test_stores().await;
        let store = stores.record_store();

        let result = import_snapshot(store.as_ref(), &stores.dir.path().join("absent.json")).await;

        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_duplicate_slugs_get_suffixed() {
        let stores = test_stores().await;
        let store = stores.record_store();
        let body = json!({
            "items": [
                { "id": Uuid::new_v4(), "name": "Kit", "slug": "kit" },
                { "id": Uuid::new_v4(), "name": "Kit", "slug": "kit" }
            ]
        })
        .to_string();
        let path = write_snapshot(stores.dir.path(), &body).await;

        import_snapshot(store.as_ref(), &path).await.unwrap();

        assert!(store.get_item_by_slug("kit").await.unwrap().is_some());
        assert!(store.get_item_by_slug("kit-2").await.unwrap().is_some());
    }
}
