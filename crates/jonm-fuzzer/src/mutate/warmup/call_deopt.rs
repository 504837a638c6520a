//! Call-in-loop with de-optimization
//!
//! Like call-in-loop wrapping, followed by one call with deliberately
//! type-divergent arguments to invalidate the specialization the loop just
//! built up.

use crate::mutate::args;
use crate::mutate::sampler::instruction_mutation;
use crate::mutate::warmup::{emit_followup_call, wrappable_call};
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::Program;

/// Contributor name of this mutator.
pub const CALL_DEOPT_MUTATOR_NAME: &str = "CallDeoptMutator";

/// Wraps a call in a warmup loop, then de-optimizes it.
pub struct CallDeoptMutator {
    stats: MutatorStats,
}

impl CallDeoptMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        CallDeoptMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for CallDeoptMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutator for CallDeoptMutator {
    fn name(&self) -> &'static str {
        CALL_DEOPT_MUTATOR_NAME
    }

    fn stats(&self) -> &MutatorStats {
        &self.stats
    }

    fn mutate(&self, program: &Program, ctx: &mut MutationCtx<'_>) -> Option<Program> {
        instruction_mutation(
            program,
            ctx,
            self.name(),
            1,
            wrappable_call,
            |b, instr, ctx| {
                let types: Vec<_> = instr
                    .call_arguments()
                    .iter()
                    .map(|&arg| args::infer_type(program, arg))
                    .collect();
                let saved = b.load_null();
                b.build_repeat_loop(ctx.config.max_loop_trip_count_in_jit, |b, _| {
                    let replica = b.replicate(instr);
                    if let Some(result) = replica.output() {
                        b.reassign(saved, result);
                    }
                });
                emit_followup_call(b, instr, &types, true, ctx);
                if let Some(original) = instr.output() {
                    b.remap(original, saved);
                }
                true
            },
        )
    }
}
