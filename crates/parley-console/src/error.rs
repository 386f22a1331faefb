//! Parley console error types.

use parley_core::error::DialogError;
use thiserror::Error;

/// Startup and runtime errors for the console host.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// An environment variable holds a value the console cannot use.
    #[error("configuration error: {0}")]
    Config(String),

    /// A turn failed inside the dialog engine.
    #[error("dialog error: {0}")]
    Dialog(#[from] DialogError),

    /// Reading input or writing replies failed.
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}
