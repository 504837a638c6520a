//! Single-execution wrap
//!
//! Moves one interior instruction into a hot loop while guaranteeing it
//! executes exactly once. The loop body runs fresh neutral code every
//! iteration; the wrapped instruction fires on the first pass only,
//! guarded by a flag. A finally arm retries the instruction when an
//! exception aborted the loop before the first pass completed, setting the
//! flag *before* re-executing so a throwing retry cannot run it twice.

use crate::mutate::jon::fresh_neutral_block;
use crate::mutate::sampler::{jon_site_ok, subroutine_mutation, SubroutineSite};
use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::{Instruction, Opcode, Program, ProgramBuilder, UnaryOperator};
use rand::seq::SliceRandom;

/// Contributor name of this mutator.
pub const SINGLE_EXECUTION_MUTATOR_NAME: &str = "SingleExecutionMutator";

/// Wraps one instruction in a run-once guard inside a warmup loop.
pub struct SingleExecutionMutator {
    stats: MutatorStats,
}

impl SingleExecutionMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        SingleExecutionMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for SingleExecutionMutator {
    fn default() -> Self {
        Self::new()
    }
}

/// Instructions eligible for wrapping: effect-free of control flow and
/// naming, with at most one output.
fn is_wrappable(instr: &Instruction) -> bool {
    if instr.is_jump() || instr.opcode.is_block() || instr.is_call() || instr.is_guarded() {
        return false;
    }
    if matches!(
        instr.opcode,
        Opcode::Eval
            | Opcode::Await
            | Opcode::LoadNamedVariable
            | Opcode::StoreNamedVariable
            | Opcode::DefineNamedVariable
            | Opcode::LoadBuiltin
            | Opcode::ConfigureElement
            | Opcode::ConfigureProperty
    ) {
        return false;
    }
    instr.outputs.len() <= 1 && instr.inner_outputs.is_empty()
}

fn wrappable_slots(site: &SubroutineSite<'_>) -> Vec<usize> {
    (1..site.instructions.len().saturating_sub(1))
        .filter(|&relative| {
            site.mutable_mask[relative] && is_wrappable(&site.instructions[relative])
        })
        .collect()
}

impl Mutator for SingleExecutionMutator {
    fn name(&self) -> &'static str {
        SINGLE_EXECUTION_MUTATOR_NAME
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
            |_, site| !wrappable_slots(site).is_empty(),
            |b, site, ctx| {
                let slots = wrappable_slots(site);
                let chosen = match slots.choose(ctx.rng) {
                    Some(&slot) => slot,
                    None => {
                        for instr in site.instructions {
                            b.adopt(instr);
                        }
                        return false;
                    }
                };
                for (relative, instr) in site.instructions.iter().enumerate() {
                    if relative == chosen {
                        wrap_single_execution(b, instr, ctx);
                    } else {
                        b.adopt(instr);
                    }
                }
                true
            },
        )
    }
}

fn wrap_single_execution(b: &mut ProgramBuilder, instr: &Instruction, ctx: &mut MutationCtx<'_>) {
    let trip_count = ctx.config.max_loop_trip_count_in_jit;
    let flag = b.load_bool(false);
    let saved = b.load_null();
    b.build_try_catch_finally(
        |b| {
            b.build_repeat_loop(trip_count, |b, _| {
                fresh_neutral_block(b, ctx);
                let pending = b.unary(flag, UnaryOperator::LogicalNot);
                b.build_if(pending, |b| {
                    let replica = b.replicate(instr);
                    if let Some(result) = replica.output() {
                        b.reassign(saved, result);
                    }
                    let done = b.load_bool(true);
                    b.reassign(flag, done);
                });
            });
        },
        |_, _| {},
        |b| {
            let pending = b.unary(flag, UnaryOperator::LogicalNot);
            b.build_if(pending, |b| {
                // Flag first: a throwing retry must not run the
                // instruction a second time.
                let done = b.load_bool(true);
                b.reassign(flag, done);
                let replica = b.replicate(instr);
                if let Some(result) = replica.output() {
                    b.reassign(saved, result);
                }
            });
        },
    );
    if let Some(original) = instr.output() {
        b.remap(original, saved);
    }
}
