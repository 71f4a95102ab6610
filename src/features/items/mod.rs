//! Catalog items and their assets.
//!
//! Items are created as a skeleton, filled in through multipart editor
//! submissions and deleted together with every file they own.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET | `/api/items` | No | Paginated, filtered listing |
//! | GET | `/api/items/{slug}` | No | Get item by slug |
//! | GET | `/api/items/{slug}/download` | No | Download the product file |
//! | GET | `/api/categories/{slug}/items` | No | Items of a category |
//! | GET | `/api/tags/{tag}/items` | No | Items carrying a tag |
//! | GET | `/api/admin/items` | Admin | List all items |
//! | POST | `/api/admin/items` | Admin | Create item skeleton |
//! | GET | `/api/admin/items/{id}` | Admin | Get item |
//! | DELETE | `/api/admin/items/{id}` | Admin | Delete item and its files |
//! | POST | `/api/admin/items/{id}/upsert` | Admin | Save editor submission |
//! | POST | `/api/admin/items/{id}/images` | Admin | Attach a generated screenshot |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{CatalogQueryService, ItemService};
