use thiserror::Error;

/// A call rejected before any engine work was issued.
///
/// These are the caller's mistakes: the operation is logged and aborted, and
/// none of its callbacks run. Failures reported by the engine itself travel
/// through the error callbacks instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// A required name (database, table, index) was empty.
    #[error("missing {0}")]
    MissingName(&'static str),

    /// The connection was never opened or has been closed.
    #[error("no active database connection; open a database first")]
    NoConnection,

    /// The input could not be turned into a batch.
    #[error("invalid {0} input")]
    InvalidInput(&'static str),

    /// A range descriptor with no usable bound.
    #[error("range has no usable bounds")]
    EmptyRange,
}
