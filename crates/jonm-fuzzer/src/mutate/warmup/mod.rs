//! JIT warmup mutators
//!
//! Non-semantic-preserving transforms used by the JIT mutation engine and
//! as fallbacks when every JoN mutator fails on a seed: warmup loops
//! prepended to subroutine bodies, calls wrapped in loops, and de-opt /
//! recompile call sequences. Output divergence caused by these mutators is
//! expected; they are never used where the differential oracle applies.

mod call_deopt;
mod call_deopt_recompile;
mod call_in_loop;
mod subroutine_loop;
mod wrap_in_function;

pub use call_deopt::{CallDeoptMutator, CALL_DEOPT_MUTATOR_NAME};
pub use call_deopt_recompile::{CallDeoptRecompileMutator, CALL_DEOPT_RECOMPILE_MUTATOR_NAME};
pub use call_in_loop::{CallInLoopMutator, CALL_IN_LOOP_MUTATOR_NAME};
pub use subroutine_loop::{SubroutineLoopMutator, SUBROUTINE_LOOP_MUTATOR_NAME};
pub use wrap_in_function::{WrapInFunctionMutator, WRAP_IN_FUNCTION_MUTATOR_NAME};

use crate::analysis::Context;
use crate::mutate::args::{self, TypeHint};
use crate::mutate::sampler::SiteInfo;
use crate::mutate::MutationCtx;
use jonm_il::{Instruction, Opcode, ProgramBuilder, Variable};

/// Veto for warmup insertions: executable script code, not in a code
/// string, reachable. Loops are allowed; these mutators do not preserve
/// semantics anyway.
pub(crate) fn warmup_site_ok(info: &SiteInfo) -> bool {
    info.context.contains(Context::JAVASCRIPT)
        && !info.context.contains(Context::CODE_STRING)
        && !info.dead
}

/// Whether an instruction is a call that can be re-emitted in a loop.
pub(crate) fn wrappable_call(instr: &Instruction, info: &SiteInfo) -> bool {
    instr.is_call()
        && !instr.is_guarded()
        && instr.outputs.len() == 1
        && instr.inner_outputs.is_empty()
        && warmup_site_ok(info)
}

/// Re-issue a call with synthesized arguments: matching shapes when
/// `divergent` is false, deliberately different ones otherwise.
pub(crate) fn emit_followup_call(
    b: &mut ProgramBuilder,
    instr: &Instruction,
    types: &[TypeHint],
    divergent: bool,
    ctx: &mut MutationCtx<'_>,
) {
    let callee_orig = match instr.inputs.first() {
        Some(&callee) => callee,
        None => return,
    };
    let callee = b.translate(callee_orig);
    let call_args: Vec<Variable> = types
        .iter()
        .map(|&hint| {
            if divergent {
                args::divergent_literal(b, hint, ctx.rng)
            } else {
                args::matching_literal(b, hint, ctx.rng)
            }
        })
        .collect();
    match instr.opcode {
        Opcode::CallFunction => {
            b.call_function(callee, &call_args);
        }
        Opcode::CallMethod => {
            if let Some(name) = instr.name() {
                b.call_method(callee, name, &call_args);
            }
        }
        Opcode::Construct => {
            b.construct(callee, &call_args);
        }
        _ => {}
    }
}
