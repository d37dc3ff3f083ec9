/*!
 * Error types for s3-integrity
 */

use crate::protocol::s3::ledger::{PhaseLedger, UploadPhase};
use crate::protocol::s3::S3Error;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UploadError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Error, Debug)]
pub enum UploadError {
    /// Source file does not exist
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Source exists but cannot be used
    #[error("Invalid input: {0}")]
    Input(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A protocol phase failed; carries the phase and the ledger up to it
    #[error("{0}")]
    PhaseFailed(Box<PhaseFailure>),
}

/// The failing phase plus every phase recorded before it
#[derive(Debug, Clone)]
pub struct PhaseFailure {
    pub phase: UploadPhase,
    pub ledger: PhaseLedger,
}

impl fmt::Display for PhaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.phase.summary())
    }
}

impl UploadError {
    pub fn phase_failed(phase: UploadPhase, ledger: PhaseLedger) -> Self {
        UploadError::PhaseFailed(Box::new(PhaseFailure { phase, ledger }))
    }

    /// Phase that failed, if the error came from the protocol
    pub fn failed_phase(&self) -> Option<&UploadPhase> {
        match self {
            UploadError::PhaseFailed(failure) => Some(&failure.phase),
            _ => None,
        }
    }

    /// Ledger recorded up to the failure, if the protocol had started
    pub fn ledger(&self) -> Option<&PhaseLedger> {
        match self {
            UploadError::PhaseFailed(failure) => Some(&failure.ledger),
            _ => None,
        }
    }

    /// Whether the failure was raised before any store call
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            UploadError::SourceNotFound(_) | UploadError::Input(_) | UploadError::Config(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}

impl From<S3Error> for UploadError {
    fn from(err: S3Error) -> Self {
        UploadError::Config(err.to_string())
    }
}
