use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{} is not inside the project's assets folder {}", .target.display(), .assets.display())]
    OutsideAssets { target: PathBuf, assets: PathBuf },

    #[error("Copy task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
