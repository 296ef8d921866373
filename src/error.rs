use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed catalog payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
    #[error("Video not found: '{id}'")]
    NotFound { id: String },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn not_found(id: impl Into<String>) -> Self {
        CatalogError::NotFound { id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
