use core::fmt;

/// Errors raised by the numeric core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Argument passed into a function was invalid.
    InvalidArg {
        /// The invalid arg.
        arg: String,
        /// Explaining why arg is invalid.
        reason: String,
    },
    /// The convolution backend rejected its inputs.
    Conv {
        /// Message reported by the backend.
        reason: String,
    },
    /// Execution was attempted with a violated invariant.
    ExecInvariantViolation {
        /// Why execution could not proceed.
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArg { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            Error::Conv { reason } => write!(f, "Convolution failed: {reason}"),
            Error::ExecInvariantViolation { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result alias for the numeric core.
pub type Result<T> = core::result::Result<T, Error>;
