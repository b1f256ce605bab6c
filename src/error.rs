use thiserror::Error;

use crate::storage::StorageError;
use crate::types::{Domain, ItemKey};

#[derive(Error, Debug)]
pub enum PracticeError {
    /// Malformed parameters; rejected before anything is computed or stored.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("item {item} not found in domain {domain}")]
    ItemNotFound { domain: Domain, item: ItemKey },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PracticeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

pub type PracticeResult<T> = Result<T, PracticeError>;
