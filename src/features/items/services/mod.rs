mod item_service;
mod query_service;
pub mod reconciliation;

pub use item_service::{ItemService, UpsertOutcome};
pub use query_service::{CatalogEntry, CatalogPage, CatalogQueryService};
