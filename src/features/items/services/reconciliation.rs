//! Asset reconciliation for item updates.
//!
//! Works out which files an item keeps, adopts and drops. Planning is pure;
//! removals only run once the record write has committed.

use futures::future::join_all;

use crate::features::items::models::Item;
use crate::modules::storage::{AssetKind, AssetStore};

/// Asset state to commit plus the files that leave the item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPlan {
    pub images: Vec<String>,
    pub file_path: Option<String>,
    pub remove_images: Vec<String>,
    pub remove_file: Option<String>,
}

impl AssetPlan {
    /// Plan that drops every asset of `item`
    pub fn removing_all(item: &Item) -> Self {
        Self {
            images: Vec::new(),
            file_path: None,
            remove_images: dedupe(item.images.iter().cloned()),
            remove_file: item.file_path.clone(),
        }
    }

    pub fn has_removals(&self) -> bool {
        !self.remove_images.is_empty() || self.remove_file.is_some()
    }
}

/// Outcome of applying the removals of a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Diff the stored assets against what the submission asks for.
///
/// Only paths already on the item can be kept, so a client cannot claim
/// someone else's file. Kept images come first in request order, followed by
/// the new uploads; repeats keep their first position.
pub fn plan_assets(
    old_images: &[String],
    requested_keep: &[String],
    newly_uploaded: Vec<String>,
    old_file: Option<&str>,
    new_file: Option<String>,
) -> AssetPlan {
    let keep: Vec<String> = requested_keep
        .iter()
        .filter(|path| old_images.contains(path))
        .cloned()
        .collect();

    let remove_images = dedupe(
        old_images
            .iter()
            .filter(|path| !keep.contains(path))
            .cloned(),
    );

    let images = dedupe(keep.into_iter().chain(newly_uploaded));

    let (file_path, remove_file) = match new_file {
        Some(new_path) => {
            let replaced = old_file
                .filter(|old| *old != new_path)
                .map(str::to_string);
            (Some(new_path), replaced)
        }
        None => (old_file.map(str::to_string), None),
    };

    AssetPlan {
        images,
        file_path,
        remove_images,
        remove_file,
    }
}

/// Delete every file the plan drops.
///
/// Each removal is independent; a failure is logged and reported but does
/// not stop the others.
pub async fn apply_removals(assets: &AssetStore, plan: &AssetPlan) -> RemovalReport {
    let targets = plan
        .remove_images
        .iter()
        .map(|path| (AssetKind::Image, path))
        .chain(plan.remove_file.iter().map(|path| (AssetKind::ProductFile, path)));

    let results = join_all(targets.map(|(kind, path)| async move {
        (path.clone(), assets.delete(kind, path).await)
    }))
    .await;

    let mut report = RemovalReport::default();
    for (path, result) in results {
        match result {
            Ok(()) => report.removed.push(path),
            Err(e) => {
                tracing::warn!("Asset {} could not be removed: {}", path, e);
                report.failed.push(path);
            }
        }
    }

    report
}

fn dedupe(paths: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for path in paths {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
}
