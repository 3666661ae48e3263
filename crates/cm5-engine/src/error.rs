//! Construction and stepping errors.

use std::error::Error;
use std::fmt;

use cm5_core::StateError;
use cm5_io::CodecError;
use cm5_shader::CompilerInitError;

use crate::config::ConfigError;
use crate::executor::ExecutionError;
use crate::import::ImportError;

// ── InitError ──────────────────────────────────────────────────────

/// A [`Simulator`](crate::Simulator) could not be constructed.
///
/// Construction is all-or-nothing: when this is returned no simulator
/// exists and every resource acquired along the way has been released.
#[derive(Debug)]
pub enum InitError {
    /// The options failed validation.
    Config(ConfigError),
    /// The state could not be allocated or seeded.
    State(StateError),
    /// The shader compiler could not be started.
    Compiler(CompilerInitError),
    /// One or more shaders failed to load, compile, or bind.
    Import(ImportError),
    /// The step file to resume from could not be read.
    Codec(CodecError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid options: {e}"),
            Self::State(e) => write!(f, "state setup failed: {e}"),
            Self::Compiler(e) => write!(f, "compiler startup failed: {e}"),
            Self::Import(e) => write!(f, "{e}"),
            Self::Codec(e) => write!(f, "cannot resume: {e}"),
        }
    }
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::State(e) => Some(e),
            Self::Compiler(e) => Some(e),
            Self::Import(e) => Some(e),
            Self::Codec(e) => Some(e),
        }
    }
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StateError> for InitError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<CompilerInitError> for InitError {
    fn from(e: CompilerInitError) -> Self {
        Self::Compiler(e)
    }
}

impl From<ImportError> for InitError {
    fn from(e: ImportError) -> Self {
        Self::Import(e)
    }
}

impl From<CodecError> for InitError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ── StepExecutionError ─────────────────────────────────────────────

/// A step failed. The simulator state is exactly as before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepExecutionError {
    /// The executor or post-step verification reported an error.
    Backend {
        /// Stage that failed.
        stage: String,
        /// Description of the failure.
        reason: String,
    },
    /// A live cell picked up a NaN or infinity.
    NonFinite {
        /// Stage that produced it.
        stage: String,
        /// Slot of the first affected cell.
        cell: usize,
    },
}

impl StepExecutionError {
    /// The stage the failure is attributed to.
    pub fn stage(&self) -> &str {
        match self {
            Self::Backend { stage, .. } | Self::NonFinite { stage, .. } => stage,
        }
    }
}

impl fmt::Display for StepExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { stage, reason } => write!(f, "step failed in '{stage}': {reason}"),
            Self::NonFinite { stage, cell } => {
                write!(f, "step failed in '{stage}': cell {cell} is not finite")
            }
        }
    }
}

impl Error for StepExecutionError {}

impl From<ExecutionError> for StepExecutionError {
    fn from(e: ExecutionError) -> Self {
        match e {
            ExecutionError::Failed { stage, reason } => Self::Backend { stage, reason },
            ExecutionError::NonFinite { stage, cell } => Self::NonFinite { stage, cell },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_errors_keep_their_stage() {
        let e: StepExecutionError = ExecutionError::NonFinite {
            stage: "contact".into(),
            cell: 4,
        }
        .into();
        assert_eq!(e.stage(), "contact");
        assert_eq!(e.to_string(), "step failed in 'contact': cell 4 is not finite");
    }

    #[test]
    fn init_error_exposes_source() {
        let e = InitError::from(ConfigError::NoInitialCells);
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("invalid options"));
    }
}
