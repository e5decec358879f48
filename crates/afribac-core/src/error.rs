//! Command pipeline errors

use crate::traits::LlmError;
use afribac_config::ResolveError;

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors raised while preparing or running a command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// `edit` needs a selection to anchor the replacement
    #[error("Edit requires an active selection")]
    EditRequiresSelection,

    /// The selection points outside the posted document
    #[error("Selection does not point into the document")]
    InvalidSelection,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Model error: {0}")]
    Model(#[from] LlmError),

    /// A structured element did not match the expected schema
    #[error("Invalid structured output: {0}")]
    InvalidOutput(String),

    /// The receiving side went away (client disconnected)
    #[error("Event stream closed")]
    StreamClosed,
}

impl From<crate::writer::StreamClosed> for CommandError {
    fn from(_: crate::writer::StreamClosed) -> Self {
        CommandError::StreamClosed
    }
}
