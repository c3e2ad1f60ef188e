use std::{error::Error, fmt};

use crate::store::StoreError;

pub mod search;
pub mod sql;
pub mod statement;

pub use search::{ExportRequest, SearchControlPlane, SearchRequest};
pub use sql::SqlControlPlane;

#[derive(Debug)]
pub enum ControlError {
    /// The statement failed a safety guard; the message is shown to callers verbatim.
    Rejected(&'static str),
    InvalidInput(String),
    Store(StoreError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "{message}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControlError {}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

fn ensure_non_empty(value: &str, field: &str) -> Result<(), ControlError> {
    if value.trim().is_empty() {
        return Err(ControlError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

/// Index names go into the request path unencoded. Wildcards and
/// comma-separated lists stay allowed; path and query delimiters do not.
fn ensure_index(index: &str) -> Result<(), ControlError> {
    ensure_non_empty(index, "index")?;
    if let Some(bad) = index
        .chars()
        .find(|ch| matches!(ch, '/' | '\\' | '?' | '#') || ch.is_whitespace())
    {
        return Err(ControlError::InvalidInput(format!(
            "index {index:?} must not contain {bad:?}"
        )));
    }
    Ok(())
}
