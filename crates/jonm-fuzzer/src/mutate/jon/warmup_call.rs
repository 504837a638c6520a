//! JIT-warmup pre-call
//!
//! For a plain or arrow function that the program calls later, injects a
//! flag-guarded early-return prologue into the function body and a warmup
//! loop between the definition and the first call. The loop calls the
//! function with fresh arguments shaped like the first call's, so the JIT
//! specializes on the same types the real call will use. The flag is set
//! only around the warmup loop; outside it the prologue never fires.

use crate::analysis::Context;
use crate::mutate::args;
use crate::mutate::jon::fresh_neutral_block;
use crate::mutate::sampler::{jon_site_ok, subroutine_mutation, SubroutineSite};
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::{Opcode, Program, Variable};

/// Contributor name of this mutator.
pub const JIT_WARMUP_CALL_MUTATOR_NAME: &str = "JitWarmupCallMutator";

/// Pre-calls a function in a warmup loop with matching argument shapes.
pub struct JitWarmupCallMutator {
    stats: MutatorStats,
}

impl JitWarmupCallMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        JitWarmupCallMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for JitWarmupCallMutator {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the program's first call whose callee is `f`.
pub(crate) fn first_call_of(program: &Program, f: Variable) -> Option<usize> {
    program
        .iter()
        .enumerate()
        .find(|(_, instr)| instr.is_call() && instr.inputs.first() == Some(&f))
        .map(|(index, _)| index)
}

/// Whether a subroutine site is a pre-callable function definition: a
/// plain or arrow function defined at an unvetoed position and called
/// later in the program.
pub(crate) fn precallable(program: &Program, site: &SubroutineSite<'_>) -> Option<usize> {
    let head = site.head_instr();
    if !matches!(
        head.opcode,
        Opcode::BeginPlainFunction | Opcode::BeginArrowFunction
    ) {
        return None;
    }
    if !site.head_info.context.contains(Context::JAVASCRIPT)
        || site.head_info.aggregate.contains_any(
            Context::LOOP | Context::CODE_STRING | Context::OBJECT_LITERAL,
        )
        || site.head_info.dead
    {
        return None;
    }
    let f = head.output()?;
    match first_call_of(program, f) {
        Some(call_index) if call_index > site.block.tail => Some(call_index),
        _ => None,
    }
}

impl Mutator for JitWarmupCallMutator {
    fn name(&self) -> &'static str {
        JIT_WARMUP_CALL_MUTATOR_NAME
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
            |program, site| precallable(program, site).is_some(),
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

                // The guard flag lives just before the definition.
                let flag = b.load_bool(false);
                b.adopt(site.head_instr());
                b.build_if(flag, |b| {
                    fresh_neutral_block(b, ctx);
                    let result = b.load_null();
                    b.do_return(Some(result));
                });
                for instr in &site.instructions[1..] {
                    b.adopt(instr);
                }

                // Warmup loop: after the definition, before the first call.
                let f = b.translate(f_orig);
                let on = b.load_bool(true);
                b.reassign(flag, on);
                b.build_try_catch_finally(
                    |b| {
                        b.build_repeat_loop(ctx.config.max_loop_trip_count_in_jit, |b, _| {
                            fresh_neutral_block(b, ctx);
                            let call_args: Vec<Variable> = arg_types
                                .iter()
                                .map(|&hint| args::matching_literal(b, hint, ctx.rng))
                                .collect();
                            b.call_function(f, &call_args);
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
