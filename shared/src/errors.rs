//! Error types shared with API clients

use thiserror::Error;

/// Input validation failure
///
/// The message is safe to show to the caller verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    MissingFields(&'static str),

    #[error("{0}")]
    Invalid(String),
}
