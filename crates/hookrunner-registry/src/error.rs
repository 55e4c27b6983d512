use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store error: {0}")]
    Store(#[from] hookrunner_store::StoreError),

    #[error("hook name already registered: {0}")]
    DuplicateName(String),

    #[error("hook not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
