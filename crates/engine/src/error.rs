use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImportError>;

/// Conditions that stop a run before the scene is touched.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Records(#[from] layout_records::RecordsError),

    #[error("No scene anchor: {0}")]
    NoAnchor(String),
}
