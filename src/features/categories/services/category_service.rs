use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    CategoryResponseDto, CreateCategoryDto, UpdateCategoryDto,
};
use crate::features::categories::models::{Category, CategoryChanges};
use crate::modules::storage::{unique_slug, RecordKind, RecordStore};
use crate::shared::constants::DEFAULT_CATEGORY_ICON;
use crate::shared::normalize::slugify;

/// Service for category operations
pub struct CategoryService {
    store: Arc<dyn RecordStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// List all categories ordered by name
    pub async fn list(&self) -> Result<Vec<CategoryResponseDto>> {
        let categories = self.store.list_categories().await?;
        Ok(categories.into_iter().map(|c| c.into()).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<CategoryResponseDto> {
        self.store
            .get_category(id)
            .await?
            .map(|c| c.into())
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    /// Get category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<CategoryResponseDto> {
        self.store
            .get_category_by_slug(slug)
            .await?
            .map(|c| c.into())
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))
    }

    pub async fn create(&self, dto: CreateCategoryDto) -> Result<CategoryResponseDto> {
        let name = required_name(&dto.name)?;
        let slug =
            unique_slug(self.store.as_ref(), RecordKind::Categories, &slugify(&name), None).await?;
        let icon = icon_or_default(dto.icon.as_deref());

        let category = Category::new(name, slug, icon);
        self.store.insert_category(&category).await?;

        tracing::info!("Created category {} ({})", category.id, category.slug);
        Ok(category.into())
    }

    /// Update name and/or icon. A changed name re-derives the slug.
    pub async fn update(&self, id: Uuid, dto: UpdateCategoryDto) -> Result<CategoryResponseDto> {
        let current = self
            .store
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        let name = match dto.name.as_deref() {
            Some(raw) => required_name(raw)?,
            None => current.name.clone(),
        };
        let slug = if name == current.name {
            current.slug.clone()
        } else {
            unique_slug(
                self.store.as_ref(),
                RecordKind::Categories,
                &slugify(&name),
                Some(id),
            )
            .await?
        };
        let icon = match dto.icon.as_deref() {
            Some(icon) => icon_or_default(Some(icon)),
            None => current.icon.clone(),
        };
        let changes = CategoryChanges { name, slug, icon };

        let category = self
            .store
            .update_category(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        tracing::info!("Updated category {} ({})", category.id, category.slug);
        Ok(category.into())
    }

    /// Delete a category. Its items stay and lose their category.
    ///
    /// Deleting a missing category succeeds.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.store.delete_category(id).await? {
            tracing::info!("Deleted category {}", id);
        } else {
            tracing::debug!("Category {} already gone", id);
        }
        Ok(())
    }
}

fn required_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }
    Ok(name.to_string())
}

fn icon_or_default(icon: Option<&str>) -> String {
    icon.map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or(DEFAULT_CATEGORY_ICON)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::items::models::Item;
    use crate::shared::test_helpers::test_stores;

    fn create_dto(name: &str, icon: Option<&str>) -> CreateCategoryDto {
        CreateCategoryDto {
            name: name.to_string(),
            icon: icon.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_icon_and_suffixes_slug() {
        let stores = test_stores().await;
        let service = CategoryService::new(stores.record_store());

        let first = service.create(create_dto("UI Kits", None)).await.unwrap();
        let second = service
            .create(create_dto("UI  Kits", Some("fa-solid fa-box")))
            .await
            .unwrap();

        assert_eq!(first.slug, "ui-kits");
        assert_eq!(first.icon, DEFAULT_CATEGORY_ICON);
        assert_eq!(second.slug, "ui-kits-2");
        assert_eq!(second.icon, "fa-solid fa-box");
    }

    #[tokio::test]
    async fn test_update_rename_rederives_slug() {
        let stores = test_stores().await;
        let service = CategoryService::new(stores.record_store());
        let created = service.create(create_dto("Icons", None)).await.unwrap();

        let renamed = service
            .update(
                created.id,
                UpdateCategoryDto {
                    name: Some("Icon Packs".to_string()),
                    icon: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(renamed.slug, "icon-packs");
        assert_eq!(renamed.icon, DEFAULT_CATEGORY_ICON);
        assert_eq!(service.get_by_slug("icon-packs").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_update_icon_only_keeps_slug() {
        let stores = test_stores().await;
        let service = CategoryService::new(stores.record_store());
        let created = service.create(create_dto("Fonts", None)).await.unwrap();

        let updated = service
            .update(
                created.id,
                UpdateCategoryDto {
                    name: None,
                    icon: Some("fa-solid fa-font".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.slug, "fonts");
        assert_eq!(updated.icon, "fa-solid fa-font");
    }

    #[tokio::test]
    async fn test_delete_clears_item_category_and_is_idempotent() {
        let stores = test_stores().await;
        let store = stores.record_store();
        let service = CategoryService::new(store.clone());
        let created = service.create(create_dto("Themes", None)).await.unwrap();
        let mut item = Item::skeleton("Night".into(), "night".into());
        item.category_id = Some(created.id);
        store.insert_item(&item).await.unwrap();

        service.delete(created.id).await.unwrap();
        service.delete(created.id).await.unwrap();

        let item = store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(item.category_id, None);
        assert!(matches!(
            service.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
