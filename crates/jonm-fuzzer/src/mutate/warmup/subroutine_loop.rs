//! Subroutine warmup-loop insertion
//!
//! Prepends a warmup loop of fresh code to an outmost subroutine body so
//! the body crosses the JIT threshold on its first invocation. The extra
//! loop runs on every call; semantics may change.

use crate::mutate::sampler::subroutine_mutation;
use crate::mutate::warmup::warmup_site_ok;
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::Program;

/// Contributor name of this mutator.
pub const SUBROUTINE_LOOP_MUTATOR_NAME: &str = "SubroutineLoopMutator";

/// Prepends a warmup loop to a subroutine body.
pub struct SubroutineLoopMutator {
    stats: MutatorStats,
}

impl SubroutineLoopMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        SubroutineLoopMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for SubroutineLoopMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutator for SubroutineLoopMutator {
    fn name(&self) -> &'static str {
        SUBROUTINE_LOOP_MUTATOR_NAME
    }

    fn stats(&self) -> &MutatorStats {
        &self.stats
    }

    fn mutate(&self, program: &Program, ctx: &mut MutationCtx<'_>) -> Option<Program> {
        subroutine_mutation(
            program,
            ctx,
            self.name(),
            1,
            warmup_site_ok,
            |_, site| site.mutable_mask.first().copied().unwrap_or(false),
            |b, site, ctx| {
                b.adopt(site.head_instr());
                b.isolated(|b| {
                    b.build_prefix(ctx.rng);
                    b.build_repeat_loop(ctx.config.max_loop_trip_count_in_jit, |b, _| {
                        b.build(ctx.rng, ctx.config.small_code_block_size);
                    });
                });
                for instr in &site.instructions[1..] {
                    b.adopt(instr);
                }
                true
            },
        )
    }
}
