use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Routing error: {0}")]
    Routing(#[from] core_routing::RoutingError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
