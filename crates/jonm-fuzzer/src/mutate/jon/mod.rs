//! Semantic-preserving JoN mutators
//!
//! The four transforms that provoke the target JIT without changing the
//! program's observable output: neutral-loop insertion, single-execution
//! wrap, JIT-warmup pre-call, and de-optimization pre-call. All four are
//! subroutine-shaped and share the common insertion veto of
//! [`jon_site_ok`](crate::mutate::sampler::jon_site_ok).

mod deopt_call;
mod neutral_loop;
mod single_execution;
mod warmup_call;

pub use deopt_call::{DeoptCallMutator, DEOPT_CALL_MUTATOR_NAME};
pub use neutral_loop::{NeutralLoopMutator, NEUTRAL_LOOP_MUTATOR_NAME};
pub use single_execution::{SingleExecutionMutator, SINGLE_EXECUTION_MUTATOR_NAME};
pub use warmup_call::{JitWarmupCallMutator, JIT_WARMUP_CALL_MUTATOR_NAME};

use crate::mutate::MutationCtx;
use jonm_il::ProgramBuilder;

/// Emit a fresh code block with no data dependency on the host program:
/// a few literal values followed by pure data-flow instructions, all
/// behind a visibility barrier.
pub(crate) fn fresh_neutral_block(b: &mut ProgramBuilder, ctx: &mut MutationCtx<'_>) {
    let block_size = ctx.config.small_code_block_size;
    b.isolated(|b| {
        b.build_prefix(ctx.rng);
        b.build(ctx.rng, block_size);
    });
}
