//! Neutral-loop insertion
//!
//! Inserts a bounded loop of fresh, side-effect-free code at a mutable
//! position inside a subroutine, wrapped in a try with an empty catch.
//! Running the loop pushes the enclosing subroutine over the OSR
//! threshold, so the JIT compiles it mid-execution; the loop itself never
//! touches state the surrounding program can observe.

use crate::mutate::sampler::{jon_site_ok, subroutine_mutation};
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::{Program, ProgramBuilder};
use rand::seq::SliceRandom;

/// Contributor name of this mutator.
pub const NEUTRAL_LOOP_MUTATOR_NAME: &str = "NeutralLoopMutator";

/// Inserts an OSR-provoking neutral loop into a subroutine body.
pub struct NeutralLoopMutator {
    stats: MutatorStats,
}

impl NeutralLoopMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        NeutralLoopMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for NeutralLoopMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutator for NeutralLoopMutator {
    fn name(&self) -> &'static str {
        NEUTRAL_LOOP_MUTATOR_NAME
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
            jon_site_ok,
            |_, site| !site.body_is_empty() && !site.mutable_slots().is_empty(),
            |b, site, ctx| {
                let slots = site.mutable_slots();
                let slot = match slots.choose(ctx.rng) {
                    Some(&slot) => slot,
                    None => {
                        for instr in site.instructions {
                            b.adopt(instr);
                        }
                        return false;
                    }
                };
                for (relative, instr) in site.instructions.iter().enumerate() {
                    b.adopt(instr);
                    if relative == slot {
                        insert_neutral_loop(b, ctx);
                    }
                }
                true
            },
        )
    }
}

fn insert_neutral_loop(b: &mut ProgramBuilder, ctx: &mut MutationCtx<'_>) {
    let trip_count = ctx.config.max_loop_trip_count_in_jit;
    b.isolated(|b| {
        b.build_try_catch(
            |b| {
                b.build_prefix(ctx.rng);
                b.build_repeat_loop(trip_count, |b, _| {
                    b.build(ctx.rng, ctx.config.small_code_block_size);
                });
            },
            |_, _| {},
        );
    });
}
