//! De-optimization pre-call
//!
//! The inverse of the JIT-warmup pre-call: for a function whose call site
//! sits inside a loop (so the engine will have compiled it), the injected
//! loop calls it with deliberately type-divergent arguments — and only
//! after the loop counter passes the midpoint, so a compiled code path
//! exists to invalidate. The following real calls may then trigger
//! recompilation.

use crate::analysis::Context;
use crate::mutate::args;
use crate::mutate::jon::warmup_call::precallable;
use crate::mutate::sampler::{analyze_sites, jon_site_ok, subroutine_mutation};
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::{Comparator, Program, Variable};

/// Contributor name of this mutator.
pub const DEOPT_CALL_MUTATOR_NAME: &str = "DeoptCallMutator";

/// Pre-calls a loop-called function with type-divergent arguments.
pub struct DeoptCallMutator {
    stats: MutatorStats,
}

impl DeoptCallMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        DeoptCallMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for DeoptCallMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutator for DeoptCallMutator {
    fn name(&self) -> &'static str {
        DEOPT_CALL_MUTATOR_NAME
    }

    fn stats(&self) -> &MutatorStats {
        &self.stats
    }

    fn mutate(&self, program: &Program, ctx: &mut MutationCtx<'_>) -> Option<Program> {
        let infos = analyze_sites(program);
        subroutine_mutation(
            program,
            ctx,
            self.name(),
            1,
            jon_site_ok,
            |program, site| {
                // Only functions whose first call runs inside a loop.
                match precallable(program, site) {
                    Some(call_index) => infos[call_index].context.contains(Context::LOOP),
                    None => false,
                }
            },
            |b, site, ctx| {
                let (f_orig, call_index) = match site
                    .head_instr()
                    .output()
                    .zip(precallable(program, site))
                {
                    Some(found) => found,
                    None => {
                        for instr in site.instructions {
                            b.adopt(instr);
                        }
                        return false;
                    }
                };
                let arg_types = args::call_argument_types(program, call_index);

                let flag = b.load_bool(false);
                b.adopt(site.head_instr());
                b.build_if(flag, |b| {
                    crate::mutate::jon::fresh_neutral_block(b, ctx);
                    let result = b.load_null();
                    b.do_return(Some(result));
                });
                for instr in &site.instructions[1..] {
                    b.adopt(instr);
                }

                let f = b.translate(f_orig);
                let trip_count = ctx.config.max_loop_trip_count_in_jit;
                let on = b.load_bool(true);
                b.reassign(flag, on);
                b.build_try_catch_finally(
                    |b| {
                        b.build_repeat_loop(trip_count, |b, iteration| {
                            let midpoint = b.load_int(trip_count / 2);
                            let past = b.compare(
                                iteration,
                                midpoint,
                                Comparator::GreaterThanOrEqual,
                            );
                            b.build_if(past, |b| {
                                let call_args: Vec<Variable> = arg_types
                                    .iter()
                                    .map(|&hint| args::divergent_literal(b, hint, ctx.rng))
                                    .collect();
                                b.call_function(f, &call_args);
                            });
                        });
                    },
                    |_, _| {},
                    |b| {
                        let off = b.load_bool(false);
                        b.reassign(flag, off);
                    },
                );
                true
            },
        )
    }
}
