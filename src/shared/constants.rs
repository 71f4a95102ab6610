/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Icon assigned to categories created without one
pub const DEFAULT_CATEGORY_ICON: &str = "fa-solid fa-folder";

// =============================================================================
// UPLOAD MANIFEST
// =============================================================================

/// Multipart field carrying new item images
pub const FIELD_NEW_IMAGES: &str = "newImages";

/// Multipart field carrying the downloadable product file
pub const FIELD_PRODUCT_FILE: &str = "productFile";

/// Maximum number of images accepted in one upsert
pub const MAX_NEW_IMAGES: usize = 10;

// =============================================================================
// ITEM FORM
// =============================================================================

pub const FIELD_NAME: &str = "name";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_CATEGORY_ID: &str = "categoryId";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_EXTERNAL_LINK: &str = "externalLink";

/// Stored image paths the editor wants to keep, in display order
pub const FIELD_EXISTING_IMAGES: &str = "existingImages";
