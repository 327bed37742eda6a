use jobwatch_interface::InterfaceError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewModelError {
    #[error("job payload is missing `{0}`")]
    MissingField(&'static str),
}

/// Failure of [`BatchViewModel::find`](super::batch::BatchViewModel::find).
#[derive(Debug, Error)]
pub enum FindError {
    #[error("expected `<app>:<job>`, got {0:?}")]
    InvalidId(String),
    #[error(transparent)]
    Transport(#[from] InterfaceError),
    #[error("failed to decode job resource: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    ViewModel(#[from] ViewModelError),
    /// The status call answered with an `error` payload.
    #[error("status rpc failed: {0}")]
    Rpc(Value),
    #[error("status rpc returned no status")]
    MissingStatus,
    #[error("lookup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
