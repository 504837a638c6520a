//! Call-in-loop wrapping
//!
//! Replaces a single call with a warmup loop that performs the call every
//! iteration, rebinding the original result to the last iteration's value.
//! The callee runs many extra times; semantics may change.

use crate::mutate::sampler::instruction_mutation;
use crate::mutate::warmup::wrappable_call;
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::Program;

/// Contributor name of this mutator.
pub const CALL_IN_LOOP_MUTATOR_NAME: &str = "CallInLoopMutator";

/// Wraps an existing call in a warmup loop.
pub struct CallInLoopMutator {
    stats: MutatorStats,
}

impl CallInLoopMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        CallInLoopMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for CallInLoopMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutator for CallInLoopMutator {
    fn name(&self) -> &'static str {
        CALL_IN_LOOP_MUTATOR_NAME
    }

    fn stats(&self) -> &MutatorStats {
        &self.stats
    }

    fn mutate(&self, program: &Program, ctx: &mut MutationCtx<'_>) -> Option<Program> {
        instruction_mutation(
            program,
            ctx,
            self.name(),
            2,
            wrappable_call,
            |b, instr, ctx| {
                let saved = b.load_null();
                b.build_repeat_loop(ctx.config.max_loop_trip_count_in_jit, |b, _| {
                    let replica = b.replicate(instr);
                    if let Some(result) = replica.output() {
                        b.reassign(saved, result);
                    }
                });
                if let Some(original) = instr.output() {
                    b.remap(original, saved);
                }
                true
            },
        )
    }
}
