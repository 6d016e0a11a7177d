use core::fmt;

/// Validation errors raised at kernel construction or adapter binding time.
///
/// These cover every invalid-parameter case: out-of-range cutoffs, unordered
/// frequency grids, mismatched lengths, even-length kernels where odd ones are
/// required. No partial output is ever produced alongside one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input or configuration field is empty.
    EmptyInput {
        /// Name of the argument that is empty.
        arg: &'static str,
    },
    /// A configuration argument value is invalid.
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A contiguous 1D slice view could not be obtained.
    NonContiguous {
        /// Name of the argument that is non-contiguous.
        arg: &'static str,
    },
    /// Output/input lengths did not match required shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyInput { arg } => write!(f, "Input `{arg}` was empty."),
            ConfigError::InvalidArgument { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            ConfigError::NonContiguous { arg } => {
                write!(f, "Argument `{arg}` is not contiguous in memory.")
            }
            ConfigError::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime invariant violations for checked kernel entrypoints.
///
/// Raised when the input data itself is inconsistent (a complex root without
/// its conjugate, a kernel with a null at its normalization frequency) or when
/// a numeric collaborator gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecInvariantViolation {
    /// An execution precondition was violated.
    InvalidState {
        /// Human readable reason.
        reason: &'static str,
    },
    /// Output length mismatched the expected runtime shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// Adapter binding/configuration failure.
    Config(ConfigError),
    /// A numeric core routine failed.
    Core(fbank_core::Error),
}

impl From<ConfigError> for ExecInvariantViolation {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<fbank_core::Error> for ExecInvariantViolation {
    fn from(value: fbank_core::Error) -> Self {
        Self::Core(value)
    }
}

impl fmt::Display for ExecInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecInvariantViolation::InvalidState { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
            ExecInvariantViolation::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Execution length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ExecInvariantViolation::Config(err) => write!(f, "{err}"),
            ExecInvariantViolation::Core(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ExecInvariantViolation {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecInvariantViolation::Config(err) => Some(err),
            ExecInvariantViolation::Core(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_render_argument_names() {
        let err = ConfigError::LengthMismatch {
            arg: "imag",
            expected: 4,
            got: 3,
        };
        assert_eq!(
            err.to_string(),
            "Length mismatch on `imag`. Expected 4, got 3."
        );
    }

    #[test]
    fn exec_violation_wraps_config_and_core_errors() {
        let wrapped: ExecInvariantViolation = ConfigError::EmptyInput { arg: "poles" }.into();
        assert_eq!(
            wrapped,
            ExecInvariantViolation::Config(ConfigError::EmptyInput { arg: "poles" })
        );
        assert!(std::error::Error::source(&wrapped).is_some());

        let core: ExecInvariantViolation = fbank_core::Error::Conv {
            reason: "kernel too long".to_string(),
        }
        .into();
        assert_eq!(core.to_string(), "Convolution failed: kernel too long");
    }
}
