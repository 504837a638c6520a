//! Mutation framework
//!
//! A mutator locates candidate sites in a program, samples some of them,
//! and re-emits the program with mutated fragments spliced in. Two
//! sampling shapes exist (per-instruction and per-outmost-subroutine);
//! both live in [`sampler`]. Every mutator returns `None` when it finds no
//! candidate, and every produced program is a new object carrying the
//! parent's contributors plus the mutator's own name.

pub mod args;
pub mod jon;
pub mod sampler;
pub mod warmup;

use crate::config::Config;
use jonm_il::Program;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-mutator statistics.
///
/// Mutators may be shared across workers, so counters are atomic.
#[derive(Debug, Default)]
pub struct MutatorStats {
    attempts: AtomicU64,
    failures: AtomicU64,
    added_instructions: AtomicU64,
}

impl MutatorStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed generation attempt.
    pub fn failed_to_generate(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful mutation that added `added` instructions.
    pub fn record_success(&self, added: u64) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.added_instructions.fetch_add(added, Ordering::Relaxed);
    }

    /// Total attempts.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Failed attempts.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Total instructions added across successful mutations.
    pub fn added_instructions(&self) -> u64 {
        self.added_instructions.load(Ordering::Relaxed)
    }
}

/// Shared state threaded through one mutation.
pub struct MutationCtx<'a> {
    /// The worker's PRNG.
    pub rng: &'a mut StdRng,
    /// Engine configuration.
    pub config: &'a Config,
}

/// A program mutator.
pub trait Mutator: Send + Sync {
    /// Stable identity, recorded in contributor sets.
    fn name(&self) -> &'static str;

    /// Statistics for this mutator.
    fn stats(&self) -> &MutatorStats;

    /// Produce a mutated variant, or `None` when no candidate exists.
    fn mutate(&self, program: &Program, ctx: &mut MutationCtx<'_>) -> Option<Program>;
}

/// Names of the semantic-preserving JoN mutators, used to keep their
/// output out of their own input.
pub const JON_MUTATOR_NAMES: [&str; 4] = [
    jon::NEUTRAL_LOOP_MUTATOR_NAME,
    jon::SINGLE_EXECUTION_MUTATOR_NAME,
    jon::JIT_WARMUP_CALL_MUTATOR_NAME,
    jon::DEOPT_CALL_MUTATOR_NAME,
];

/// Whether any JoN mutator has contributed to the program.
pub fn has_jon_contributor(program: &Program) -> bool {
    JON_MUTATOR_NAMES
        .iter()
        .any(|name| program.has_contributor(name))
}

/// All semantic-preserving JoN mutators.
pub fn jon_mutators() -> Vec<Box<dyn Mutator>> {
    vec![
        Box::new(jon::NeutralLoopMutator::new()),
        Box::new(jon::SingleExecutionMutator::new()),
        Box::new(jon::JitWarmupCallMutator::new()),
        Box::new(jon::DeoptCallMutator::new()),
    ]
}

/// All non-preserving warmup mutators.
pub fn warmup_mutators() -> Vec<Box<dyn Mutator>> {
    vec![
        Box::new(warmup::SubroutineLoopMutator::new()),
        Box::new(warmup::CallInLoopMutator::new()),
        Box::new(warmup::CallDeoptMutator::new()),
        Box::new(warmup::CallDeoptRecompileMutator::new()),
    ]
}
