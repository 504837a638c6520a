//! Fuzzing engines
//!
//! An engine performs one fuzzing round at a time against a context of
//! collaborators: the corpus it samples from, the runner and lifter that
//! execute programs, and the event sink that receives findings. Engines
//! are driven by [`run_until_shutdown`], which honors the shutdown flag
//! between rounds; a round itself is never interrupted.

mod hybrid;
mod jonm;

pub use hybrid::HybridFuzzer;
pub use jonm::JonmEngine;

use crate::config::Config;
use crate::error::EngineResult;
use crate::exec::{Execution, Lifter, Runner};
use jonm_il::Program;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Where a finding originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    /// Found by this worker.
    Local,
}

/// A candidate miscompilation: a succeeded mutant whose stdout diverges
/// from the referee under identical external conditions.
#[derive(Debug, Serialize)]
pub struct MiscompilationReport<'a> {
    /// The diverging mutant
    pub mutant: &'a Program,
    /// The mutant's stdout
    pub mutant_stdout: &'a str,
    /// The instrumented seed the mutant derives from
    pub seed: &'a Program,
    /// The referee stdout recorded from the seed
    pub seed_stdout: &'a str,
    /// Where the finding originated
    pub origin: Origin,
    /// The mutant's execution time
    pub exec_time: Duration,
}

/// Receives engine findings; external collaborator.
pub trait EventSink {
    /// A candidate miscompilation was found.
    fn miscompilation(&mut self, report: &MiscompilationReport<'_>);

    /// A mutant crashed the target engine.
    fn crash(&mut self, _program: &Program, _execution: &Execution) {}

    /// A seed produced differing output across identical executions.
    fn non_determinism(&mut self, _program: &Program, _first: &Execution, _second: &Execution) {}
}

/// Source of seed programs; external collaborator. Samples are drawn
/// atomically under the corpus's own synchronization contract.
pub trait Corpus {
    /// Number of programs available.
    fn len(&self) -> usize;

    /// Whether the corpus is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw one program.
    fn sample(&self, rng: &mut StdRng) -> Option<Program>;
}

/// Collaborators and per-worker state threaded through an engine round.
pub struct FuzzCtx<'a> {
    /// Seed corpus
    pub corpus: &'a dyn Corpus,
    /// External process runner
    pub runner: &'a mut dyn Runner,
    /// IL-to-source lifter
    pub lifter: &'a dyn Lifter,
    /// Finding sink
    pub events: &'a mut dyn EventSink,
    /// The worker's PRNG, seeded reproducibly
    pub rng: &'a mut StdRng,
    /// Engine configuration
    pub config: &'a Config,
}

/// What one fuzzing round did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// No eligible seed was available.
    NoSeed,
    /// The seed was rejected by the determinism gate.
    SeedRejected,
    /// The round ran its mutation loop.
    Completed {
        /// Mutants that were executed
        mutants_executed: usize,
        /// Divergences reported
        miscompilations: usize,
    },
}

/// A fuzzing engine.
pub trait FuzzEngine {
    /// Engine name, for logs and the hybrid driver.
    fn name(&self) -> &'static str;

    /// Perform one fuzzing round.
    fn fuzz_one(&mut self, ctx: &mut FuzzCtx<'_>) -> EngineResult<RoundOutcome>;
}

/// Drive an engine until the shutdown flag is raised. The flag is checked
/// between rounds only; a round runs to completion once started.
pub fn run_until_shutdown(
    engine: &mut dyn FuzzEngine,
    ctx: &mut FuzzCtx<'_>,
    shutdown: &AtomicBool,
) -> EngineResult<u64> {
    let mut rounds = 0;
    while !shutdown.load(Ordering::Acquire) {
        engine.fuzz_one(ctx)?;
        rounds += 1;
    }
    tracing::debug!(engine = engine.name(), rounds, "shutdown honored");
    Ok(rounds)
}
