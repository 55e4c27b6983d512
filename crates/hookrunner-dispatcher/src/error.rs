use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("store error: {0}")]
    Store(#[from] hookrunner_store::StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] hookrunner_registry::RegistryError),

    #[error("queue error: {0}")]
    Queue(#[from] hookrunner_queue::QueueError),

    #[error("executor error: {0}")]
    Executor(#[from] hookrunner_executor::ExecutorError),

    #[error("global dispatcher not initialized")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, DispatcherError>;
