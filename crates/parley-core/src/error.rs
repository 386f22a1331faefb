//! Dialog engine error types.

use thiserror::Error;

/// Top-level error type shared by the engine, the dialog library and the
/// state collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    /// A dialog operation was called with an empty dialog id.
    #[error("dialog id must not be empty")]
    EmptyDialogId,

    /// No dialog with this id is registered in the context or any ancestor.
    #[error("dialog not found: '{id}'")]
    DialogNotFound {
        /// The id that failed to resolve.
        id: String,
    },

    /// A frame on the stack references a dialog that is no longer registered.
    #[error("cannot {operation} dialog '{id}': it is not registered")]
    UnregisteredDialog {
        /// The id recorded on the stack frame.
        id: String,
        /// The operation that needed the dialog.
        operation: &'static str,
    },

    /// A dialog with this id is already registered.
    #[error("duplicate dialog id: '{0}'")]
    DuplicateId(String),

    /// A write was attempted against a read-only scope.
    #[error("scope '{0}' is read-only")]
    ReadOnlyScope(String),

    /// A state path could not be parsed or does not address a value.
    #[error("invalid state path: '{0}'")]
    InvalidPath(String),

    /// An argument violated the operation's contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A child context outlived the container frame it was derived from.
    #[error("dialog context is detached: its container frame was removed")]
    DetachedContext,

    /// State could not be converted to or from its stored representation.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A state store or other infrastructure failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A failure raised by a dialog behavior or an external service it called.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl From<serde_json::Error> for DialogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
