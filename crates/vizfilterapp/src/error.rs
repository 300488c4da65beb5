use crate::model::{FilterId, ViewId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VizError {
    #[error("Filter not found: {0}")]
    FilterNotFound(FilterId),

    #[error("View not found: {0}")]
    ViewNotFound(ViewId),

    #[error("Host rejected operation: {0}")]
    Host(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Configuration error: {0}")]
    Config(#[from] confique::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VizError>;
