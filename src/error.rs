//! Error taxonomy for the catalog core.
//!
//! Every fallible operation in the crate returns one of these variants.
//! Absence of a row in the key-value store is not an error at the catalog
//! layer; it surfaces as `Ok(None)` there and is promoted to [`Error::NotFound`]
//! by the service layer where absence is exceptional.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the catalog, resolver, importer, and feed builder.
#[derive(Debug, Error)]
pub enum Error {
    /// A production or resource that must exist does not.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write collides with existing state: kind change on an existing
    /// GUID, or a duplicate production name under a different owner.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A production is not buildable, has no visible episodes, or carries
    /// a malformed show-type value.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// An imported transfer produced a byte count that disagrees with the
    /// declared Content-Length. Nothing becomes visible when this fires.
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    /// An asset existence or HEAD check did not succeed.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Store or client errors passed through with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::ValidationFailed(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Internal(anyhow::Error::new(e).context("key-value store"))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Internal(anyhow::Error::new(e).context("blob store io"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(anyhow::Error::new(e).context("catalog row serialization"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Internal(anyhow::Error::new(e).context("document serialization"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Internal(anyhow::Error::new(e).context("http client"))
    }
}
