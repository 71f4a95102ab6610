//! Filesystem asset store
//!
//! Keeps uploaded item images and product files under a public root:
//!
//! ```text
//! <public_root>/uploads/images/<uuid>.<ext>   ->  /uploads/images/<uuid>.<ext>
//! <public_root>/uploads/files/<uuid>.<ext>    ->  /uploads/files/<uuid>.<ext>
//! ```
//!
//! Stored names are random UUIDs; the client's filename only contributes its
//! extension. Lookups always go through the basename of a logical path, so a
//! record can never point the store outside its subtree.

use futures::future::join_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};

/// Longest extension carried over from an uploaded filename
const MAX_EXTENSION_LEN: usize = 16;

/// Which subtree an asset lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Item images (screenshots, thumbnails)
    Image,
    /// The single downloadable file of an item
    ProductFile,
}

impl AssetKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Image => "images",
            AssetKind::ProductFile => "files",
        }
    }

    /// Prefix of logical paths persisted on records
    pub fn url_prefix(self) -> &'static str {
        match self {
            AssetKind::Image => "/uploads/images",
            AssetKind::ProductFile => "/uploads/files",
        }
    }
}

/// A file written by the upload handler but not yet committed to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub kind: AssetKind,
    pub original_name: String,
    pub stored_name: String,
    pub path: PathBuf,
}

/// Files staged for one admin submission
#[derive(Debug, Clone, Default)]
pub struct UploadManifest {
    pub new_images: Vec<StagedUpload>,
    pub product_file: Option<StagedUpload>,
}

impl UploadManifest {
    pub fn push(&mut self, staged: StagedUpload) {
        match staged.kind {
            AssetKind::Image => self.new_images.push(staged),
            AssetKind::ProductFile => self.product_file = Some(staged),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_images.is_empty() && self.product_file.is_none()
    }

    /// Every staged file, images first
    pub fn staged(&self) -> impl Iterator<Item = &StagedUpload> {
        self.new_images.iter().chain(self.product_file.iter())
    }
}

/// Filesystem-backed asset store
pub struct AssetStore {
    public_root: PathBuf,
}

impl AssetStore {
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
        }
    }

    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    /// Directory holding assets of `kind`
    pub fn dir(&self, kind: AssetKind) -> PathBuf {
        self.public_root.join("uploads").join(kind.dir_name())
    }

    /// Create the upload subtrees if they do not exist yet
    pub async fn ensure_layout(&self) -> Result<()> {
        for kind in [AssetKind::Image, AssetKind::ProductFile] {
            let dir = self.dir(kind);
            fs::create_dir_all(&dir).await.map_err(|e| {
                error!("Failed to create asset directory {}: {}", dir.display(), e);
                AppError::Storage(e)
            })?;
        }
        info!(
            "Asset store ready at {}",
            self.public_root.join("uploads").display()
        );
        Ok(())
    }

    /// Create an empty staged file under a fresh random name.
    ///
    /// The caller streams the upload into the returned handle. The staged
    /// entry should be recorded in a manifest before writing so that a
    /// failed transfer can still be rolled back.
    pub async fn open_staged(
        &self,
        kind: AssetKind,
        original_name: &str,
    ) -> Result<(StagedUpload, fs::File)> {
        let stored_name = match extension_of(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.dir(kind).join(&stored_name);

        let file = fs::File::create(&path).await.map_err(|e| {
            warn!("Failed to create staged file {}: {}", path.display(), e);
            AppError::Storage(e)
        })?;

        debug!(
            "Staged upload '{}' as {}",
            original_name,
            path.display()
        );

        Ok((
            StagedUpload {
                kind,
                original_name: original_name.to_string(),
                stored_name,
                path,
            },
            file,
        ))
    }

    /// Stage a complete upload held in memory
    pub async fn stage(
        &self,
        kind: AssetKind,
        original_name: &str,
        data: &[u8],
    ) -> Result<StagedUpload> {
        let (staged, mut file) = self.open_staged(kind, original_name).await?;

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!("Failed to write staged file {}: {}", staged.path.display(), e);
            let _ = fs::remove_file(&staged.path).await;
            return Err(AppError::Storage(e));
        }

        Ok(staged)
    }

    /// Adopt a staged upload and return the logical path to persist.
    ///
    /// Fails when the staged file is missing or sits outside the subtree of
    /// its kind.
    pub async fn store(&self, staged: &StagedUpload) -> Result<String> {
        let expected = self.dir(staged.kind).join(&staged.stored_name);
        if staged.path != expected {
            return Err(AppError::Internal(format!(
                "Staged upload {} is outside the {} directory",
                staged.path.display(),
                staged.kind.dir_name()
            )));
        }

        let metadata = fs::metadata(&staged.path).await.map_err(|e| {
            error!(
                "Staged upload {} cannot be adopted: {}",
                staged.path.display(),
                e
            );
            AppError::Storage(e)
        })?;
        if !metadata.is_file() {
            return Err(AppError::Internal(format!(
                "Staged upload {} is not a regular file",
                staged.path.display()
            )));
        }

        Ok(format!("{}/{}", staged.kind.url_prefix(), staged.stored_name))
    }

    /// Disk location of a logical asset path
    pub fn resolve(&self, kind: AssetKind, asset_path: &str) -> Option<PathBuf> {
        Path::new(asset_path)
            .file_name()
            .map(|name| self.dir(kind).join(name))
    }

    /// Physically delete an asset.
    ///
    /// An already absent file counts as deleted. Any other failure is logged
    /// and returned.
    pub async fn delete(&self, kind: AssetKind, asset_path: &str) -> Result<()> {
        let Some(full_path) = self.resolve(kind, asset_path) else {
            return Ok(());
        };

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!("Deleted asset {}", full_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Asset {} already absent", full_path.display());
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete asset {}: {}", full_path.display(), e);
                Err(AppError::Storage(e))
            }
        }
    }

    /// Remove every staged file of a submission that will not be committed.
    ///
    /// Failures are logged and skipped so one stuck file does not keep the
    /// others around.
    pub async fn rollback_staged(&self, manifest: &UploadManifest) {
        if manifest.is_empty() {
            return;
        }

        let removals = manifest.staged().map(|staged| async move {
            if let Err(e) = fs::remove_file(&staged.path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!(
                        "Rollback could not remove staged upload {}: {}",
                        staged.path.display(),
                        e
                    );
                }
            }
        });
        join_all(removals).await;

        info!(
            "Rolled back {} staged upload(s)",
            manifest.staged().count()
        );
    }
}

/// Extension of an uploaded filename, if it is short and plain
fn extension_of(original_name: &str) -> Option<String> {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase)
}
