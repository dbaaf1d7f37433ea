//! Error types shared by the compiler and the engine.

use thiserror::Error;

/// Boxed provider error, kept verbatim as the error source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Engine errors.
///
/// None of these are retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// Single-row mutation on a descriptor without a primary key.
    ///
    /// Bulk `ResultSet::update`/`ResultSet::delete` remain available.
    #[error("`{schema}` declares no primary key")]
    NoPrimaryKey {
        /// Name of the descriptor.
        schema: String,
    },

    /// Operation on a row whose `delete()` already succeeded.
    #[error("row has been deleted")]
    RowDeleted,

    /// Column name absent from the descriptor.
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// A key component needed to identify related rows is null or unset.
    #[error("incomplete key: `{column}` is null")]
    IncompleteKey {
        /// The null key column.
        column: String,
    },

    /// Malformed condition tree or result attributes.
    #[error("compilation error: {0}")]
    Compilation(String),

    /// Failure surfaced by the connection provider, including timeouts.
    #[error("connectivity error: {0}")]
    Connectivity(#[source] BoxError),

    /// Descriptor name absent from the catalog.
    #[error("unknown schema `{0}`")]
    UnknownSchema(String),

    /// Relationship name absent from the descriptor.
    #[error("unknown relationship `{0}`")]
    UnknownRelationship(String),

    /// A descriptor references columns it does not define.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Single-row mutation on a row that was never inserted.
    #[error("row is not in storage")]
    NotInStorage,

    /// Insert of a row that is already persisted.
    #[error("row is already in storage")]
    AlreadyInStorage,

    /// An identity write or re-fetch matched no row.
    #[error("row not found")]
    NotFound,

    /// Typed read of a value with another tag.
    #[error("column `{column}` holds {found}, expected {expected}")]
    TypeMismatch {
        /// Column that was read.
        column: String,
        /// Requested type.
        expected: &'static str,
        /// Tag actually stored.
        found: &'static str,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wraps a connection provider failure.
    pub fn connectivity(err: impl Into<BoxError>) -> Self {
        Self::Connectivity(err.into())
    }

    pub(crate) fn compilation(message: impl Into<String>) -> Self {
        Self::Compilation(message.into())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
