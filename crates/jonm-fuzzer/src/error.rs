//! Engine errors

use crate::exec::RunnerError;
use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal engine errors.
///
/// Candidate absence and transient mutation failures are not errors; they
/// are recovered locally and counted in per-mutator statistics. Everything
/// here aborts the current round.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Checksum instrumentation failed to place the initial container load
    #[error("Failed to inject checksum instrumentation into program {program_id}")]
    ChecksumInjectionFailed {
        /// Identity of the rejected seed
        program_id: u64,
    },

    /// An internal invariant was violated; indicates a bug in the engine,
    /// not in the target
    #[error("Invariant violated: {what}")]
    InvariantViolation {
        /// Description of the breached invariant
        what: String,
    },

    /// The external runner failed
    #[error(transparent)]
    Runner(#[from] RunnerError),
}
