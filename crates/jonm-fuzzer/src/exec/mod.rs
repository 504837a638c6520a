//! Program execution interface
//!
//! The external process runner and the lifter are collaborators; this
//! module defines the contract the engines consume: execution records,
//! the runner and lifter traits, and the per-engine execution cache.

mod cache;

pub use cache::ExecutionCache;

use jonm_il::Program;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result alias for runner operations.
pub type ExecResult<T> = Result<T, RunnerError>;

/// Errors from the external runner channel.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The runner channel is no longer usable
    #[error("Runner channel failed: {0}")]
    Channel(String),

    /// The runner refused the program before executing it
    #[error("Runner rejected program: {0}")]
    Rejected(String),
}

/// Outcome of one program execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// The program ran to completion with exit status zero
    Succeeded,
    /// The program exited with a non-zero status
    Failed(i32),
    /// The engine process crashed with the given signal
    Crashed(i32),
    /// The execution exceeded its timeout
    TimedOut,
}

impl Outcome {
    /// Whether the execution completed successfully.
    pub fn is_success(&self) -> bool {
        *self == Outcome::Succeeded
    }

    /// Whether the engine process crashed.
    pub fn is_crash(&self) -> bool {
        matches!(self, Outcome::Crashed(_))
    }
}

/// Record of one program execution.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    /// How the execution ended
    pub outcome: Outcome,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Captured fuzzer-dedicated output channel
    pub fuzzout: String,
    /// Wall-clock execution time
    pub exec_time: Duration,
}

impl Execution {
    /// A successful execution with the given stdout; convenience for tests
    /// and referees.
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Execution {
            outcome: Outcome::Succeeded,
            stdout: stdout.into(),
            stderr: String::new(),
            fuzzout: String::new(),
            exec_time: Duration::from_millis(0),
        }
    }
}

/// Why an execution is being requested.
///
/// Opaque to the runner contract, but recorded so collaborators (coverage
/// evaluation in particular) can treat auxiliary runs differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Purpose {
    /// A regular fuzzing execution
    Fuzzing,
    /// A determinism-gate execution
    Determinism,
    /// The referee execution of a seed
    Referee,
    /// Anything else
    Other,
}

/// External process runner executing lifted programs.
///
/// Implementations must be deterministic for identical input in the
/// absence of engine bugs. The timeout applies to a single execution; a
/// [`Outcome::TimedOut`] terminates that execution only.
pub trait Runner {
    /// Execute the given source text.
    fn run(&mut self, source: &str, timeout: Duration, purpose: Purpose) -> ExecResult<Execution>;
}

/// Converts IL programs to target source text; external collaborator.
pub trait Lifter {
    /// Lift a program to source text (without the wire preamble).
    fn lift(&self, program: &Program) -> String;
}
