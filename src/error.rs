//! Error taxonomy for the batch front end.
//!
//! Only failures that abort the whole run live here; a single file failing to
//! decompile is recorded in the outcome counters instead (see
//! [`crate::engine::Counters`]).

use thiserror::Error;

/// Fatal errors, each mapped to a distinct process exit code.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Malformed usage not caught by the option parser, e.g. an empty input
    /// set after directory expansion.
    #[error("{0}")]
    Usage(String),

    /// The external decompiler engine could not be resolved on PATH.
    #[error("cannot resolve decompiler engine '{program}': {reason}")]
    Setup { program: String, reason: String },

    /// A decompiled source failed round-trip verification in serial mode.
    /// Parallel mode counts these instead of aborting.
    #[error("verification failed for {path}")]
    VerifyMismatch { path: String },
}

impl BatchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            BatchError::Usage(_) => 1,
            BatchError::Setup { .. } => 2,
            BatchError::VerifyMismatch { .. } => 1,
        }
    }
}
