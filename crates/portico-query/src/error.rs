use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why `Site::open` could not hand back exactly one item
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NotOneObjectReturned {
    /// The search yielded nothing
    ObjectDoesNotExist,
    /// The search yielded two or more items
    MultipleObjectsReturned,
}

impl fmt::Display for NotOneObjectReturned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotOneObjectReturned::ObjectDoesNotExist => write!(f, "object does not exist"),
            NotOneObjectReturned::MultipleObjectsReturned => {
                write!(f, "multiple objects returned")
            }
        }
    }
}

/// Unified error type for site and access point operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Configuration file missing or unreadable
    #[error("Configuration not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No factory registered for this backend kind
    #[error("Unknown backend kind: {0}")]
    UnknownBackendKind(String),

    /// No access point registered under this name
    #[error("Unknown access point: {0}")]
    UnknownAccessPoint(String),

    /// Expected exactly one item
    #[error("Expected exactly one object: {0}")]
    NotOneObjectReturned(NotOneObjectReturned),

    /// Item handed to save/remove without an owning access point
    #[error("Item is not bound to any access point")]
    UnboundItem,

    /// Conditions rejected by the backend
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Item rejected by the backend
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DataError {
    /// Create a "not found" error with custom message
    pub fn not_found(msg: impl Into<String>) -> Self {
        DataError::NotFound(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        DataError::InvalidConfiguration(msg.into())
    }

    /// Create an invalid query error
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        DataError::InvalidQuery(msg.into())
    }

    /// Create an invalid item error
    pub fn invalid_item(msg: impl Into<String>) -> Self {
        DataError::InvalidItem(msg.into())
    }

    /// The cardinality failure carried by this error, if any
    pub fn not_one(&self) -> Option<NotOneObjectReturned> {
        match self {
            DataError::NotOneObjectReturned(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl From<NotOneObjectReturned> for DataError {
    fn from(kind: NotOneObjectReturned) -> Self {
        DataError::NotOneObjectReturned(kind)
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
