use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A catalog entry.
///
/// `images` and `file_path` hold logical asset paths
/// (`/uploads/images/<name>`, `/uploads/files/<name>`). The item owns those
/// files: they are removed when they leave the record or when the item is
/// deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub title: String,
    pub content: String,
    /// Display order; the first image is the thumbnail
    pub images: Vec<String>,
    pub file_path: Option<String>,
    pub external_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Near-empty record so the editor always works against an existing id
    pub fn skeleton(name: String, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: name.clone(),
            name,
            slug,
            category_id: None,
            tags: Vec::new(),
            content: String::new(),
            images: Vec::new(),
            file_path: None,
            external_link: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// The record's current mutable columns, as a starting point for an update
    pub fn changes(&self) -> ItemChanges {
        ItemChanges {
            name: self.name.clone(),
            slug: self.slug.clone(),
            category_id: self.category_id,
            tags: self.tags.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            images: self.images.clone(),
            file_path: self.file_path.clone(),
            external_link: self.external_link.clone(),
        }
    }
}

/// Mutable columns of an item, written as one update
#[derive(Debug, Clone, PartialEq)]
pub struct ItemChanges {
    pub name: String,
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub file_path: Option<String>,
    pub external_link: Option<String>,
}
