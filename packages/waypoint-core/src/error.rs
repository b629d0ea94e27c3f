//! Error types for the credential registry.
//!
//! Messages carry method kinds, ids and identities only. Serialized content
//! can hold secrets and never appears in an error.

/// Errors raised by codecs, the credential store and cascade deletion.
#[derive(Debug, thiserror::Error)]
pub enum CredsError {
    #[error("Unknown authentication method: {0}")]
    UnknownMethod(String),

    #[error("Malformed {method} content: {reason}")]
    MalformedContent { method: String, reason: String },

    #[error("Credentials #{0} not found")]
    NotFound(i64),

    #[error("{method} credentials '{identity}' already stored as #{existing_id}")]
    DuplicateIdentity {
        method: String,
        identity: String,
        existing_id: i64,
    },

    #[error("Edit changes credential identity from '{from}' to '{to}'; create new credentials instead")]
    IdentityChanged { from: String, to: String },

    #[error("Failed to delete dependent {kind}: {message}")]
    Dependent { kind: String, message: String },

    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CredsError {
    /// Shorthand used by codecs when content does not parse.
    pub fn malformed(method: &str, reason: impl Into<String>) -> Self {
        CredsError::MalformedContent {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CredsError>;
