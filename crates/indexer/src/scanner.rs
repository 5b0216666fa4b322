use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as sprite sources, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImage {
    pub path: PathBuf,
    /// Directory below the scan root, `/`-separated, empty at the top level.
    pub relative_dir: String,
}

impl ScannedImage {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its extension.
    pub fn logical_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Recursive image finder. Entries come back sorted by file name within each
/// directory, so repeated scans of the same tree agree.
pub struct ImageScanner {
    root: PathBuf,
}

impl ImageScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn scan(&self) -> Vec<ScannedImage> {
        if !self.root.is_dir() {
            log::warn!("Image folder {} not found", self.root.display());
            return Vec::new();
        }

        let mut images = Vec::new();
        for result in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !Self::is_image(entry.path()) {
                continue;
            }

            let relative_dir = entry
                .path()
                .parent()
                .and_then(|parent| parent.strip_prefix(&self.root).ok())
                .map(slash_path)
                .unwrap_or_default();
            images.push(ScannedImage {
                path: entry.into_path(),
                relative_dir,
            });
        }

        log::info!("Found {} images under {}", images.len(), self.root.display());
        images
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate))
            })
    }
}

/// Join path components with `/` whatever the host separator is.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
