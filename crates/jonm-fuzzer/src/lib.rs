//! JoNM — a differential mutation engine for JIT compilers
//!
//! JoNM ("JIT-on/off mutation") takes IL programs, transforms them into
//! semantically equivalent variants built to provoke the target engine's
//! JIT, executes seed and mutant under an external runner, and flags
//! stdout divergence as a candidate miscompilation. Because the mutations
//! preserve interpreted behavior, any divergence is attributable to the
//! JIT.
//!
//! # Architecture
//!
//! - [`analysis`] — context, dead-code, def-use, and recursion analyzers,
//!   rebuilt per program.
//! - [`instrument`] — checksum instrumentation and the wire preamble that
//!   give every program a stable observable output.
//! - [`mutate`] — the mutation framework (instruction- and
//!   subroutine-shaped sampling) and the JoN / warmup mutator registries.
//! - [`exec`] — the runner and lifter collaborator contracts and the
//!   execution cache.
//! - [`engine`] — the JoNM round loop and the hybrid driver.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod instrument;
pub mod mutate;

pub use config::Config;
pub use engine::{
    run_until_shutdown, Corpus, EventSink, FuzzCtx, FuzzEngine, HybridFuzzer, JonmEngine,
    MiscompilationReport, Origin, RoundOutcome,
};
pub use error::{EngineError, EngineResult};
pub use exec::{ExecResult, Execution, ExecutionCache, Lifter, Outcome, Purpose, Runner, RunnerError};
pub use instrument::{ChecksumPolicy, InsertChecksumOps};
pub use mutate::{Mutator, MutatorStats};
