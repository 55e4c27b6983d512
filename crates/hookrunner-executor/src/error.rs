use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("hook file not found: {0}")]
    FileNotFound(String),

    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
