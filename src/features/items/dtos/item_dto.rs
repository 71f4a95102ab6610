use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::dtos::CategorySummaryDto;
use crate::features::items::models::Item;
use crate::features::items::services::{CatalogEntry, UpsertOutcome};
use crate::modules::storage::ItemFilter;
use crate::shared::normalize::normalize_tag;
use crate::shared::types::PaginationQuery;

/// Request DTO for creating an item skeleton
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateItemDto {
    /// Display name; the slug is derived from it
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Editor submission for an item.
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler reads the multipart stream directly.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UpsertItemFormDto {
    /// Required display name
    pub name: String,
    /// Defaults to the name
    pub title: Option<String>,
    /// Markdown source
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    /// Repeatable; every value may hold comma separated tags
    pub tags: Vec<String>,
    pub external_link: Option<String>,
    /// Stored image paths to keep, in display order (also accepted as `existingImages[]`)
    pub existing_images: Vec<String>,
    /// Up to 10 new images
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub new_images: Vec<String>,
    /// Replaces the current product file
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub product_file: Option<String>,
}

/// Query parameters of public listings
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PublicItemsQuery {
    /// Page number (1-indexed, default: 1)
    pub page: Option<String>,
    /// Items per page (default: 9, max: 100)
    pub limit: Option<String>,
    /// Case-insensitive match against name or tags
    pub search: Option<String>,
    /// Only items of this category
    pub category_id: Option<String>,
    /// Only items carrying this tag
    pub tag: Option<String>,
}

impl PublicItemsQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page.clone(),
            limit: self.limit.clone(),
        }
    }

    /// Listing filter; blank values are ignored, the tag is normalized like
    /// stored tags and a malformed category id matches nothing
    pub fn filter(&self) -> ItemFilter {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        ItemFilter {
            search: non_blank(&self.search),
            category_id: non_blank(&self.category_id)
                .map(|raw| Uuid::parse_str(&raw).unwrap_or(Uuid::nil())),
            tag: non_blank(&self.tag).and_then(|raw| normalize_tag(&raw)),
        }
    }
}

/// Public view of an item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponseDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub title: String,
    /// Markdown source
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    /// First image, if any
    pub thumbnail: Option<String>,
    pub category: Option<CategorySummaryDto>,
    pub external_link: Option<String>,
    /// Present when the item has a product file
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CatalogEntry> for ItemResponseDto {
    fn from(entry: CatalogEntry) -> Self {
        let item = entry.item;
        Self {
            thumbnail: item.thumbnail().map(str::to_string),
            download_url: item
                .file_path
                .as_ref()
                .map(|_| format!("/api/items/{}/download", item.slug)),
            category: entry.category.map(Into::into),
            id: item.id,
            name: item.name,
            slug: item.slug,
            title: item.title,
            content: item.content,
            tags: item.tags,
            images: item.images,
            external_link: item.external_link,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Admin view of an item, including the stored asset paths
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminItemResponseDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub thumbnail: Option<String>,
    pub file_path: Option<String>,
    pub external_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for AdminItemResponseDto {
    fn from(item: Item) -> Self {
        Self {
            thumbnail: item.thumbnail().map(str::to_string),
            id: item.id,
            name: item.name,
            slug: item.slug,
            category_id: item.category_id,
            tags: item.tags,
            title: item.title,
            content: item.content,
            images: item.images,
            file_path: item.file_path,
            external_link: item.external_link,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Result of an editor submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertItemResponseDto {
    pub item: AdminItemResponseDto,
    /// Asset paths deleted because they left the item
    pub removed_assets: Vec<String>,
    /// Asset paths that left the item but could not be deleted
    pub failed_removals: Vec<String>,
}

impl From<UpsertOutcome> for UpsertItemResponseDto {
    fn from(outcome: UpsertOutcome) -> Self {
        Self {
            item: outcome.item.into(),
            removed_assets: outcome.removals.removed,
            failed_removals: outcome.removals.failed,
        }
    }
}

/// Items of one category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryArchiveDto {
    pub category: CategorySummaryDto,
    pub items: Vec<ItemResponseDto>,
}

/// Items carrying one tag
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagArchiveDto {
    /// Normalized tag that was matched
    pub tag: String,
    pub items: Vec<ItemResponseDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(search: Option<&str>, category_id: Option<&str>, tag: Option<&str>) -> PublicItemsQuery {
        PublicItemsQuery {
            search: search.map(str::to_string),
            category_id: category_id.map(str::to_string),
            tag: tag.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_ignores_blank_values() {
        let filter = query(Some("  "), Some(""), None).filter();
        assert_eq!(filter, ItemFilter::default());
    }

    #[test]
    fn test_filter_normalizes_tag() {
        let filter = query(None, None, Some("Dark Mode")).filter();
        assert_eq!(filter.tag.as_deref(), Some("dark-mode"));

        let filter = query(None, None, Some("Foo, Bar")).filter();
        assert_eq!(filter.tag.as_deref(), Some("foo,-bar"));
    }

    #[test]
    fn test_filter_malformed_category_matches_nothing() {
        let filter = query(None, Some("abc"), None).filter();
        assert_eq!(filter.category_id, Some(Uuid::nil()));
    }

    #[test]
    fn test_public_dto_hides_file_path() {
        let mut item = Item::skeleton("Kit".into(), "kit".into());
        item.file_path = Some("/uploads/files/x.zip".into());

        let dto = ItemResponseDto::from(CatalogEntry {
            item,
            category: None,
        });
        let json = serde_json::to_value(&dto).unwrap();

        assert!(json.get("filePath").is_none());
        assert_eq!(json["downloadUrl"], "/api/items/kit/download");
        assert!(json["thumbnail"].is_null());
    }
}
