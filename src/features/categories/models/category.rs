use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for category
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: String, slug: String, icon: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            slug,
            icon,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Mutable columns of a category
#[derive(Debug, Clone)]
pub struct CategoryChanges {
    pub name: String,
    pub slug: String,
    pub icon: String,
}
