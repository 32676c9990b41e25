use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Internal invariant checks that should never fire at runtime are
/// `assert!`s, not variants of this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("An IO error occurred: {0}.")]
    Io(#[from] std::io::Error),

    #[error("Malformed {what}: {detail}.")]
    MalformedInput { what: String, detail: String },

    #[error("Sequence name '{0}' does not encode genome&chromosome&{{c,l}}.")]
    BadSequenceName(String),

    #[error("Value of option '{option}' was rejected: {message}.")]
    OptionValidation { option: String, message: String },

    #[error("Unknown option '{0}'.")]
    UnknownOption(String),

    #[error("Required collaborator '{0}' is not configured.")]
    MissingCollaborator(String),

    #[error("The operation was cancelled by a failed task.")]
    Cancelled,

    #[error("Fragment without an alignment row.")]
    NoRow,

    #[error("Alignment rows of different lengths.")]
    RowLengthMismatch,

    #[error("Leaf '{0}' was not found among the alignment rows.")]
    UnknownLeaf(String),

    #[error("Two sequences share the name or genome '{0}'.")]
    DuplicateRowName(String),

    #[error("Row of '{seq}' does not match the fragments of the sequence.")]
    RowMismatch { seq: String },
}

impl Error {
    /// Shorthand for [`Error::MalformedInput`].
    pub fn malformed(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::MalformedInput {
            what: what.into(),
            detail: detail.into(),
        }
    }
}
