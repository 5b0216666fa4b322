//! # Layout Indexer
//!
//! Brings layout images into an editor project.
//!
//! ## Pipeline
//!
//! ```text
//! Image folder
//!     │
//!     ├──> ImageScanner (png / jpg / jpeg, sorted walk)
//!     │
//!     ├──> copy_images ──> <project>/assets/...
//!     │      └─> ImageMap (logical name -> ImageAsset)
//!     │
//!     └──> AssetDb::refresh_asset(db://assets/...)
//!            └─> settle pauses
//! ```

mod error;
mod importer;
mod scanner;

pub use error::{IndexerError, Result};
pub use importer::{
    asset_db_path, copy_images, ImageAsset, ImageMap, ImportedImages, ResourceImporter,
};
pub use scanner::{ImageScanner, ScannedImage, IMAGE_EXTENSIONS};
