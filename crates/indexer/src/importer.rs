use crate::error::{IndexerError, Result};
use crate::scanner::{slash_path, ImageScanner};
use layout_protocol::{AssetDb, SettlePolicy};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One copied image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub logical_name: String,
    pub stored_path: PathBuf,
    /// Location below the destination folder, `/`-separated.
    pub relative_path: String,
}

/// Logical name -> asset. A later file with the same name replaces an
/// earlier one.
pub type ImageMap = BTreeMap<String, ImageAsset>;

#[derive(Debug, Clone, Default)]
pub struct ImportedImages {
    pub images: ImageMap,
    /// Asset-db path of the destination folder.
    pub db_path: String,
}

/// Copy every image under `source` into `target`.
///
/// A missing source yields an empty map. Subdirectories are recreated only
/// with `keep_structure`; otherwise all files land directly in `target`.
pub async fn copy_images(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    keep_structure: bool,
) -> Result<ImageMap> {
    let source = source.as_ref().to_path_buf();
    let target = target.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || copy_blocking(&source, &target, keep_structure)).await?
}

fn copy_blocking(source: &Path, target: &Path, keep_structure: bool) -> Result<ImageMap> {
    let mut images = ImageMap::new();
    let scanned = ImageScanner::new(source).scan();
    if scanned.is_empty() {
        return Ok(images);
    }

    if !target.exists() {
        fs::create_dir_all(target)?;
        log::info!("Created image folder {}", target.display());
    }

    for image in scanned {
        let file_name = image.file_name();
        let relative_dir = if keep_structure {
            image.relative_dir.as_str()
        } else {
            ""
        };

        let dest_dir = relative_dir
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(target.to_path_buf(), |dir, part| dir.join(part));
        if let Err(e) = fs::create_dir_all(&dest_dir) {
            log::warn!("Cannot create {}: {e}", dest_dir.display());
            continue;
        }

        let stored_path = dest_dir.join(&file_name);
        if let Err(e) = fs::copy(&image.path, &stored_path) {
            log::warn!("Failed to copy {}: {e}", image.path.display());
            continue;
        }

        let relative_path = if relative_dir.is_empty() {
            file_name
        } else {
            format!("{relative_dir}/{file_name}")
        };
        log::debug!("Copied image {relative_path}");

        let logical_name = image.logical_name();
        if let Some(previous) = images.get(&logical_name) {
            log::warn!(
                "Image name \"{logical_name}\" now points at {relative_path} instead of {}",
                previous.relative_path
            );
        }
        images.insert(
            logical_name.clone(),
            ImageAsset {
                logical_name,
                stored_path,
                relative_path,
            },
        );
    }

    log::info!("Copied {} images into {}", images.len(), target.display());
    Ok(images)
}

/// `db://assets/<target relative to <project>/assets>`.
pub fn asset_db_path(target: &Path, project: &Path) -> Result<String> {
    let assets = project.join("assets");
    let relative = target
        .strip_prefix(&assets)
        .map_err(|_| IndexerError::OutsideAssets {
            target: target.to_path_buf(),
            assets: assets.clone(),
        })?;

    let relative = slash_path(relative);
    if relative.is_empty() {
        Ok("db://assets".to_string())
    } else {
        Ok(format!("db://assets/{relative}"))
    }
}

/// Copies images into the project and waits for the asset db to pick them up.
pub struct ResourceImporter {
    assets: Arc<dyn AssetDb>,
    settle: SettlePolicy,
}

impl ResourceImporter {
    pub fn new(assets: Arc<dyn AssetDb>, settle: SettlePolicy) -> Self {
        Self { assets, settle }
    }

    pub async fn import(
        &self,
        source: &Path,
        target: &Path,
        project: &Path,
        keep_structure: bool,
    ) -> Result<ImportedImages> {
        let db_path = asset_db_path(target, project)?;
        let images = copy_images(source, target, keep_structure).await?;

        log::info!("Refreshing {db_path}");
        if let Err(e) = self.assets.refresh_asset(&db_path).await {
            log::warn!("Asset refresh for {db_path} failed: {e}");
        }
        // The asset db has no completion signal; both pauses are heuristics.
        self.settle.after_refresh().await;
        self.settle.after_import().await;

        Ok(ImportedImages { images, db_path })
    }
}
