//! Call-in-loop with de-optimization and recompilation
//!
//! The full warm / poison / re-warm cycle: a warmup loop around the call,
//! one type-divergent call to de-optimize, and a second warmup loop of
//! matching-type calls to push the engine into recompiling.

use crate::mutate::args;
use crate::mutate::sampler::instruction_mutation;
use crate::mutate::warmup::{emit_followup_call, wrappable_call};
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::Program;

/// Contributor name of this mutator.
pub const CALL_DEOPT_RECOMPILE_MUTATOR_NAME: &str = "CallDeoptRecompileMutator";

/// Warmup loop, de-opt call, and a recompile loop around one call site.
pub struct CallDeoptRecompileMutator {
    stats: MutatorStats,
}

impl CallDeoptRecompileMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        CallDeoptRecompileMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for CallDeoptRecompileMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutator for CallDeoptRecompileMutator {
    fn name(&self) -> &'static str {
        CALL_DEOPT_RECOMPILE_MUTATOR_NAME
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
                let trip_count = ctx.config.max_loop_trip_count_in_jit;

                let saved = b.load_null();
                b.build_repeat_loop(trip_count, |b, _| {
                    let replica = b.replicate(instr);
                    if let Some(result) = replica.output() {
                        b.reassign(saved, result);
                    }
                });
                emit_followup_call(b, instr, &types, true, ctx);
                b.build_repeat_loop(trip_count, |b, _| {
                    emit_followup_call(b, instr, &types, false, ctx);
                });
                if let Some(original) = instr.output() {
                    b.remap(original, saved);
                }
                true
            },
        )
    }
}
