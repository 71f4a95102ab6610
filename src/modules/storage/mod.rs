//! Storage module
//!
//! Filesystem asset store for uploaded images and product files, and the
//! record store holding categories and items, plus the importer for
//! flat-file catalog snapshots.

mod asset_store;
mod import;
mod record_store;
mod sqlite_store;

pub use asset_store::{AssetKind, AssetStore, StagedUpload, UploadManifest};
pub use import::import_snapshot;
pub use record_store::{unique_slug, ItemFilter, RecordKind, RecordStore, Window};
pub use sqlite_store::SqliteRecordStore;
