use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;
use crate::features::items::models::Item;
use crate::modules::storage::{ItemFilter, RecordStore, Window};
use crate::shared::normalize::normalize_tag;
use crate::shared::types::{Meta, PageRequest};

/// Item resolved for public display
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub item: Item,
    pub category: Option<Category>,
}

/// One page of a public listing
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    pub meta: Meta,
}

/// Read-only queries behind the public catalog
pub struct CatalogQueryService {
    store: Arc<dyn RecordStore>,
}

impl CatalogQueryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Filtered, paginated listing, newest first
    pub async fn list_items(&self, filter: &ItemFilter, page: PageRequest) -> Result<CatalogPage> {
        let total = self.store.count_items(filter).await?;
        let items = self
            .store
            .list_items(
                filter,
                Some(Window {
                    offset: page.offset(),
                    limit: page.limit(),
                }),
            )
            .await?;

        tracing::debug!(
            "Catalog page {} ({} of {} items)",
            page.page(),
            items.len(),
            total
        );

        Ok(CatalogPage {
            entries: self.enrich(items).await?,
            meta: page.meta(total),
        })
    }

    pub async fn get_item(&self, slug: &str) -> Result<CatalogEntry> {
        let item = self
            .store
            .get_item_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item '{}' not found", slug)))?;

        let category = match item.category_id {
            Some(id) => self.store.get_category(id).await?,
            None => None,
        };

        Ok(CatalogEntry { item, category })
    }

    /// Items of the category with `slug`
    pub async fn category_archive(
        &self,
        slug: &str,
        page: PageRequest,
    ) -> Result<(Category, CatalogPage)> {
        let category = self
            .store
            .get_category_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))?;

        let filter = ItemFilter {
            category_id: Some(category.id),
            ..Default::default()
        };
        let listing = self.list_items(&filter, page).await?;

        Ok((category, listing))
    }

    /// Items carrying `tag`, after the same normalization tags get on write
    pub async fn tag_archive(&self, tag: &str, page: PageRequest) -> Result<(String, CatalogPage)> {
        let Some(tag) = normalize_tag(tag) else {
            return Ok((
                String::new(),
                CatalogPage {
                    entries: Vec::new(),
                    meta: page.meta(0),
                },
            ));
        };

        let filter = ItemFilter {
            tag: Some(tag.clone()),
            ..Default::default()
        };
        let listing = self.list_items(&filter, page).await?;

        Ok((tag, listing))
    }

    /// Attach each item's category, loading the categories once
    async fn enrich(&self, items: Vec<Item>) -> Result<Vec<CatalogEntry>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let categories: HashMap<Uuid, Category> = self
            .store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(items
            .into_iter()
            .map(|item| {
                let category = item
                    .category_id
                    .and_then(|id| categories.get(&id).cloned());
                CatalogEntry { item, category }
            })
            .collect())
    }
}
