use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::items::models::{Item, ItemChanges};
use crate::features::items::services::reconciliation::{
    apply_removals, plan_assets, AssetPlan, RemovalReport,
};
use crate::modules::storage::{
    unique_slug, AssetKind, AssetStore, RecordKind, RecordStore, StagedUpload, UploadManifest,
};
use crate::shared::constants::{
    FIELD_CATEGORY_ID, FIELD_CONTENT, FIELD_EXISTING_IMAGES, FIELD_EXTERNAL_LINK, FIELD_NAME,
    FIELD_TAGS, FIELD_TITLE,
};
use crate::shared::form::FormValues;
use crate::shared::normalize::{normalize_tags, slugify};

/// Result of a committed item update
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub item: Item,
    /// Files that left the item, and those that could not be deleted
    pub removals: RemovalReport,
}

/// Where a product file lives on disk and the name it is served under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub path: PathBuf,
    pub filename: String,
}

/// Asset paths adopted from the staged uploads of one submission
#[derive(Debug, Default)]
struct StoredUploads {
    images: Vec<String>,
    file: Option<String>,
}

/// Item lifecycle: creation, upsert with asset reconciliation, cascade delete.
///
/// The record store write is the commit point of every change. Staged uploads
/// are rolled back when anything fails before or during that write, and
/// dropped files are deleted only after it succeeded.
pub struct ItemService {
    store: Arc<dyn RecordStore>,
    assets: Arc<AssetStore>,
}

impl ItemService {
    pub fn new(store: Arc<dyn RecordStore>, assets: Arc<AssetStore>) -> Self {
        Self { store, assets }
    }

    /// Create a near-empty item so the editor can work against its id
    pub async fn create_item(&self, name: &str) -> Result<Item> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Item name is required".to_string()));
        }

        let slug = unique_slug(self.store.as_ref(), RecordKind::Items, &slugify(name), None).await?;
        let item = Item::skeleton(name.to_string(), slug);
        self.store.insert_item(&item).await?;

        info!("Created item {} ({})", item.id, item.slug);
        Ok(item)
    }

    /// Every item, newest first
    pub async fn list_all(&self) -> Result<Vec<Item>> {
        self.store.list_items(&Default::default(), None).await
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Item> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", id)))
    }

    /// Create an empty staged file for a streamed upload
    pub async fn open_upload(
        &self,
        kind: AssetKind,
        original_name: &str,
    ) -> Result<(StagedUpload, tokio::fs::File)> {
        self.assets.open_staged(kind, original_name).await
    }

    /// Drop the staged files of a submission that never reached the engine
    pub async fn discard_uploads(&self, manifest: &UploadManifest) {
        self.assets.rollback_staged(manifest).await;
    }

    /// Apply an editor submission to an existing item.
    ///
    /// Form fields replace the item's text fields; `existingImages` lists the
    /// stored images to keep and the manifest brings new ones.
    pub async fn upsert_item(
        &self,
        id: Uuid,
        form: &FormValues,
        manifest: UploadManifest,
    ) -> Result<UpsertOutcome> {
        let committed: Result<(Item, AssetPlan)> = async {
            let current = self.get_item(id).await?;

            let name = form
                .text(FIELD_NAME)
                .ok_or_else(|| AppError::Validation("Item name is required".to_string()))?;
            let category_id = self.resolve_category(form.text(FIELD_CATEGORY_ID)).await?;
            let slug =
                unique_slug(self.store.as_ref(), RecordKind::Items, &slugify(&name), Some(id))
                    .await?;

            let uploads = self.store_uploads(&manifest).await?;
            let plan = plan_assets(
                &current.images,
                &form.all(FIELD_EXISTING_IMAGES),
                uploads.images,
                current.file_path.as_deref(),
                uploads.file,
            );

            let changes = ItemChanges {
                title: form.text(FIELD_TITLE).unwrap_or_else(|| name.clone()),
                name,
                slug,
                category_id,
                tags: normalize_tags(&form.all(FIELD_TAGS)),
                content: form.first(FIELD_CONTENT).unwrap_or_default().to_string(),
                images: plan.images.clone(),
                file_path: plan.file_path.clone(),
                external_link: form.text(FIELD_EXTERNAL_LINK),
            };

            let item = self.write(id, &changes).await?;
            Ok((item, plan))
        }
        .await;

        self.finish(committed, &manifest).await
    }

    /// Append a generated screenshot to an item's images.
    ///
    /// Every existing asset is kept.
    pub async fn attach_generated_image(
        &self,
        id: Uuid,
        staged: StagedUpload,
    ) -> Result<UpsertOutcome> {
        let mut manifest = UploadManifest::default();
        manifest.push(staged);

        let committed: Result<(Item, AssetPlan)> = async {
            let current = self.get_item(id).await?;
            let uploads = self.store_uploads(&manifest).await?;
            let plan = plan_assets(
                &current.images,
                &current.images,
                uploads.images,
                current.file_path.as_deref(),
                uploads.file,
            );

            let mut changes = current.changes();
            changes.images = plan.images.clone();
            changes.file_path = plan.file_path.clone();

            let item = self.write(id, &changes).await?;
            Ok((item, plan))
        }
        .await;

        self.finish(committed, &manifest).await
    }

    /// Delete an item together with every file it owns.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn delete_item(&self, id: Uuid) -> Result<bool> {
        let Some(item) = self.store.get_item(id).await? else {
            debug!("Item {} already gone", id);
            return Ok(false);
        };

        let plan = AssetPlan::removing_all(&item);
        let report = apply_removals(&self.assets, &plan).await;
        if !report.failed.is_empty() {
            warn!(
                "Deleting item {} left {} asset(s) behind",
                id,
                report.failed.len()
            );
        }

        let deleted = self.store.delete_item(id).await?;
        info!(
            "Deleted item {} ({}) and {} asset(s)",
            id,
            item.slug,
            report.removed.len()
        );
        Ok(deleted)
    }

    /// Locate the product file of an item for download.
    ///
    /// The served name is the item slug plus the stored file's extension.
    pub async fn resolve_download(&self, slug: &str) -> Result<DownloadTarget> {
        let not_found = || AppError::NotFound(format!("No download for item '{}'", slug));

        let item = self.store.get_item_by_slug(slug).await?.ok_or_else(not_found)?;
        let file_path = item.file_path.as_deref().ok_or_else(not_found)?;
        let path = self
            .assets
            .resolve(AssetKind::ProductFile, file_path)
            .ok_or_else(not_found)?;

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(not_found()),
            Err(e) => {
                warn!("Product file {} of item {} is unavailable: {}", path.display(), item.id, e);
                return Err(not_found());
            }
        }

        let filename = match Path::new(file_path).extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", item.slug, ext),
            None => item.slug.clone(),
        };

        Ok(DownloadTarget { path, filename })
    }

    async fn resolve_category(&self, raw: Option<String>) -> Result<Option<Uuid>> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        let id = Uuid::parse_str(&raw)
            .map_err(|_| AppError::Validation(format!("Invalid category id '{}'", raw)))?;

        if self.store.get_category(id).await?.is_none() {
            return Err(AppError::Validation(format!("Category {} does not exist", id)));
        }

        Ok(Some(id))
    }

    async fn store_uploads(&self, manifest: &UploadManifest) -> Result<StoredUploads> {
        let mut stored = StoredUploads::default();

        for staged in &manifest.new_images {
            stored.images.push(self.assets.store(staged).await?);
        }
        if let Some(staged) = &manifest.product_file {
            stored.file = Some(self.assets.store(staged).await?);
        }

        Ok(stored)
    }

    async fn write(&self, id: Uuid, changes: &ItemChanges) -> Result<Item> {
        self.store
            .update_item(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", id)))
    }

    /// Roll back staged uploads of a failed change, or apply the removals of
    /// a committed one
    async fn finish(
        &self,
        committed: Result<(Item, AssetPlan)>,
        manifest: &UploadManifest,
    ) -> Result<UpsertOutcome> {
        match committed {
            Ok((item, plan)) => {
                let removals = if plan.has_removals() {
                    apply_removals(&self.assets, &plan).await
                } else {
                    RemovalReport::default()
                };
                if !removals.failed.is_empty() {
                    warn!(
                        "Item {} committed but {} old asset(s) remain on disk",
                        item.id,
                        removals.failed.len()
                    );
                }
                info!(
                    "Updated item {} ({}): {} image(s), {} asset(s) removed",
                    item.id,
                    item.slug,
                    item.images.len(),
                    removals.removed.len()
                );
                Ok(UpsertOutcome { item, removals })
            }
            Err(e) => {
                warn!("Item change failed, rolling back staged uploads: {}", e);
                self.assets.rollback_staged(manifest).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::{Category, CategoryChanges};
    use crate::modules::storage::{ItemFilter, SqliteRecordStore, Window};
    use crate::shared::test_helpers::{fake_item_name, test_stores, TestStores};
    use async_trait::async_trait;

    /// Store whose item writes always fail
    struct FailingWrites {
        inner: Arc<SqliteRecordStore>,
    }

    #[async_trait]
    impl RecordStore for FailingWrites {
        async fn list_categories(&self) -> Result<Vec<Category>> {
            self.inner.list_categories().await
        }
        async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
            self.inner.get_category(id).await
        }
        async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
            self.inner.get_category_by_slug(slug).await
        }
        async fn insert_category(&self, category: &Category) -> Result<()> {
            self.inner.insert_category(category).await
        }
        async fn update_category(
            &self,
            id: Uuid,
            changes: &CategoryChanges,
        ) -> Result<Option<Category>> {
            self.inner.update_category(id, changes).await
        }
        async fn delete_category(&self, id: Uuid) -> Result<bool> {
            self.inner.delete_category(id).await
        }
        async fn list_items(
            &self,
            filter: &ItemFilter,
            window: Option<Window>,
        ) -> Result<Vec<Item>> {
            self.inner.list_items(filter, window).await
        }
        async fn count_items(&self, filter: &ItemFilter) -> Result<i64> {
            self.inner.count_items(filter).await
        }
        async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
            self.inner.get_item(id).await
        }
        async fn get_item_by_slug(&self, slug: &str) -> Result<Option<Item>> {
            self.inner.get_item_by_slug(slug).await
        }
        async fn insert_item(&self, item: &Item) -> Result<()> {
            self.inner.insert_item(item).await
        }
        async fn update_item(&self, _id: Uuid, _changes: &ItemChanges) -> Result<Option<Item>> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn delete_item(&self, id: Uuid) -> Result<bool> {
            self.inner.delete_item(id).await
        }
        async fn slug_taken(
            &self,
            kind: RecordKind,
            slug: &str,
            except: Option<Uuid>,
        ) -> Result<bool> {
            self.inner.slug_taken(kind, slug, except).await
        }
    }

    fn service(stores: &TestStores) -> ItemService {
        ItemService::new(stores.record_store(), stores.assets.clone())
    }

    fn form(fields: &[(&str, &str)]) -> FormValues {
        fields.iter().copied().collect()
    }

    async fn staged_image(stores: &TestStores, name: &str) -> StagedUpload {
        stores
            .assets
            .stage(AssetKind::Image, name, name.as_bytes())
            .await
            .unwrap()
    }

    fn disk_path(stores: &TestStores, kind: AssetKind, asset_path: &str) -> PathBuf {
        stores.assets.resolve(kind, asset_path).unwrap()
    }

    #[tokio::test]
    async fn test_create_item_builds_skeleton() {
        let stores = test_stores().await;
        let service = service(&stores);

        let item = service.create_item("  Landing Page Kit ").await.unwrap();

        assert_eq!(item.name, "Landing Page Kit");
        assert_eq!(item.title, "Landing Page Kit");
        assert_eq!(item.slug, "landing-page-kit");
        assert!(item.images.is_empty());
        assert!(item.file_path.is_none());
    }

    #[tokio::test]
    async fn test_create_item_slug_collision_gets_suffix() {
        let stores = test_stores().await;
        let service = service(&stores);

        let first = service.create_item("Hero").await.unwrap();
        let second = service.create_item("hero").await.unwrap();

        assert_eq!(first.slug, "hero");
        assert_eq!(second.slug, "hero-2");
    }

    #[tokio::test]
    async fn test_create_item_rejects_blank_name() {
        let stores = test_stores().await;
        let result = service(&stores).create_item("   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upsert_applies_form_and_uploads() {
        let stores = test_stores().await;
        let service = service(&stores);
        let item = service.create_item(&fake_item_name()).await.unwrap();

        let mut manifest = UploadManifest::default();
        manifest.push(staged_image(&stores, "one.png").await);
        manifest.push(staged_image(&stores, "two.png").await);
        manifest.push(
            stores
                .assets
                .stage(AssetKind::ProductFile, "kit.zip", b"zip")
                .await
                .unwrap(),
        );

        let values = form(&[
            ("name", "Dark Admin Theme"),
            ("tags", "Admin, Dark Mode"),
            ("tags", "admin"),
            ("content", "# Heading\n"),
            ("externalLink", "  "),
        ]);
        let outcome = service.upsert_item(item.id, &values, manifest).await.unwrap();
        let updated = outcome.item;

        assert_eq!(updated.slug, "dark-admin-theme");
        assert_eq!(updated.title, "Dark Admin Theme");
        assert_eq!(updated.tags, vec!["admin".to_string(), "dark-mode".to_string()]);
        assert_eq!(updated.content, "# Heading\n");
        assert_eq!(updated.external_link, None);
        assert_eq!(updated.images.len(), 2);
        assert!(updated.images.iter().all(|p| p.starts_with("/uploads/images/")));
        let file_path = updated.file_path.clone().unwrap();
        assert!(file_path.starts_with("/uploads/files/") && file_path.ends_with(".zip"));
        assert!(outcome.removals.removed.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_removes_dropped_assets_after_commit() {
        let stores = test_stores().await;
        let service = service(&stores);
        let item = service.create_item("Kit").await.unwrap();

        let mut manifest = UploadManifest::default();
        manifest.push(staged_image(&stores, "a.png").await);
        manifest.push(staged_image(&stores, "b.png").await);
        manifest.push(
            stores
                .assets
                .stage(AssetKind::ProductFile, "v1.zip", b"v1")
                .await
                .unwrap(),
        );
        let first = service
            .upsert_item(item.id, &form(&[("name", "Kit")]), manifest)
            .await
            .unwrap()
            .item;
        let (a, b) = (first.images[0].clone(), first.images[1].clone());
        let old_file = first.file_path.clone().unwrap();

        let mut manifest = UploadManifest::default();
        manifest.push(
            stores
                .assets
                .stage(AssetKind::ProductFile, "v2.zip", b"v2")
                .await
                .unwrap(),
        );
        let values = form(&[("name", "Kit"), ("existingImages[]", b.as_str())]);
        let outcome = service.upsert_item(item.id, &values, manifest).await.unwrap();

        assert_eq!(outcome.item.images, vec![b.clone()]);
        assert_ne!(outcome.item.file_path.as_deref(), Some(old_file.as_str()));
        assert!(!disk_path(&stores, AssetKind::Image, &a).exists());
        assert!(disk_path(&stores, AssetKind::Image, &b).exists());
        assert!(!disk_path(&stores, AssetKind::ProductFile, &old_file).exists());
        assert_eq!(outcome.removals.removed.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_rolls_back_when_write_fails() {
        let stores = test_stores().await;
        let seeded = service(&stores).create_item("Stable").await.unwrap();
        let failing = ItemService::new(
            Arc::new(FailingWrites {
                inner: stores.records.clone(),
            }),
            stores.assets.clone(),
        );

        let first = staged_image(&stores, "first.png").await;
        let second = staged_image(&stores, "second.png").await;
        let file = stores
            .assets
            .stage(AssetKind::ProductFile, "new.zip", b"zip")
            .await
            .unwrap();
        let mut manifest = UploadManifest::default();
        manifest.push(first.clone());
        manifest.push(second.clone());
        manifest.push(file.clone());

        let result = failing
            .upsert_item(seeded.id, &form(&[("name", "Changed")]), manifest)
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(!first.path.exists());
        assert!(!second.path.exists());
        assert!(!file.path.exists());
        let leftovers = std::fs::read_dir(stores.assets.dir(AssetKind::Image))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
        let unchanged = stores.records.get_item(seeded.id).await.unwrap().unwrap();
        assert_eq!(unchanged, seeded);
    }

    #[tokio::test]
    async fn test_upsert_missing_item_rolls_back() {
        let stores = test_stores().await;
        let image = staged_image(&stores, "orphan.png").await;
        let mut manifest = UploadManifest::default();
        manifest.push(image.clone());

        let result = service(&stores)
            .upsert_item(Uuid::new_v4(), &form(&[("name", "Ghost")]), manifest)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(!image.path.exists());
    }

    #[tokio::test]
    async fn test_upsert_rejects_unknown_category() {
        let stores = test_stores().await;
        let service = service(&stores);
        let item = service.create_item("Kit").await.unwrap();

        let invalid = form(&[("name", "Kit"), ("categoryId", "not-a-uuid")]);
        let result = service
            .upsert_item(item.id, &invalid, UploadManifest::default())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let unknown_id = Uuid::new_v4().to_string();
        let unknown = form(&[("name", "Kit"), ("categoryId", unknown_id.as_str())]);
        let result = service
            .upsert_item(item.id, &unknown, UploadManifest::default())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upsert_keeps_own_slug_on_resubmit() {
        let stores = test_stores().await;
        let service = service(&stores);
        let item = service.create_item("Hero").await.unwrap();

        let outcome = service
            .upsert_item(item.id, &form(&[("name", "Hero")]), UploadManifest::default())
            .await
            .unwrap();

        assert_eq!(outcome.item.slug, "hero");
    }

    #[tokio::test]
    async fn test_attach_generated_image_appends() {
        let stores = test_stores().await;
        let service = service(&stores);
        let item = service.create_item("Shots").await.unwrap();
        let mut manifest = UploadManifest::default();
        manifest.push(staged_image(&stores, "first.png").await);
        let first = service
            .upsert_item(item.id, &form(&[("name", "Shots")]), manifest)
            .await
            .unwrap()
            .item;

        let screenshot = staged_image(&stores, "screenshot.png").await;
        let outcome = service
            .attach_generated_image(item.id, screenshot)
            .await
            .unwrap();

        assert_eq!(outcome.item.images.len(), 2);
        assert_eq!(outcome.item.images[0], first.images[0]);
        assert!(outcome.removals.removed.is_empty());
    }

    #[tokio::test]
    async fn test_delete_item_cascades_and_is_idempotent() {
        let stores = test_stores().await;
        let service = service(&stores);
        let item = service.create_item("Doomed").await.unwrap();
        let mut manifest = UploadManifest::default();
        manifest.push(staged_image(&stores, "a.png").await);
        manifest.push(
            stores
                .assets
                .stage(AssetKind::ProductFile, "a.zip", b"zip")
                .await
                .unwrap(),
        );
        let stored = service
            .upsert_item(item.id, &form(&[("name", "Doomed")]), manifest)
            .await
            .unwrap()
            .item;
        let image = disk_path(&stores, AssetKind::Image, &stored.images[0]);
        let file = disk_path(&stores, AssetKind::ProductFile, stored.file_path.as_deref().unwrap());

        assert!(service.delete_item(item.id).await.unwrap());
        assert!(!service.delete_item(item.id).await.unwrap());

        assert!(!image.exists());
        assert!(!file.exists());
        assert!(matches!(
            service.get_item(item.id).await,
            Err(AppError::NotFound(_))
        ));
        let listed = stores
            .records
            .list_items(&ItemFilter::default(), None)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_download_names_file_after_slug() {
        let stores = test_stores().await;
        let service = service(&stores);
        let item = service.create_item("Icon Pack").await.unwrap();

        assert!(matches!(
            service.resolve_download("icon-pack").await,
            Err(AppError::NotFound(_))
        ));

        let mut manifest = UploadManifest::default();
        manifest.push(
            stores
                .assets
                .stage(AssetKind::ProductFile, "icons-final.ZIP", b"zip")
                .await
                .unwrap(),
        );
        service
            .upsert_item(item.id, &form(&[("name", "Icon Pack")]), manifest)
            .await
            .unwrap();

        let target = service.resolve_download("icon-pack").await.unwrap();
        assert_eq!(target.filename, "icon-pack.zip");
        assert!(target.path.exists());

        assert!(matches!(
            service.resolve_download("unknown").await,
            Err(AppError::NotFound(_))
        ));
    }
}
