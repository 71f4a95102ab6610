//! Item categories.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET | `/api/categories` | No | List categories |
//! | GET | `/api/categories/{slug}` | No | Get category by slug |
//! | GET | `/api/admin/categories` | Admin | List categories |
//! | POST | `/api/admin/categories` | Admin | Create category |
//! | GET | `/api/admin/categories/{id}` | Admin | Get category |
//! | PUT | `/api/admin/categories/{id}` | Admin | Update category |
//! | DELETE | `/api/admin/categories/{id}` | Admin | Delete category, detaching its items |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::CategoryService;
