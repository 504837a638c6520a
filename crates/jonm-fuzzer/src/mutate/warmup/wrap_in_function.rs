//! Whole-program function wrap
//!
//! Last-resort fallback when no other mutator finds a candidate: move the
//! entire program body into a fresh function and call it in a warmup loop.
//! Applicable to any non-empty program.

use crate::mutate::{MutationCtx, Mutator, MutatorStats};
use jonm_il::{Program, ProgramBuilder};

/// Contributor name of this mutator.
pub const WRAP_IN_FUNCTION_MUTATOR_NAME: &str = "WrapInFunctionMutator";

/// Wraps the whole program in a function called in a warmup loop.
pub struct WrapInFunctionMutator {
    stats: MutatorStats,
}

impl WrapInFunctionMutator {
    /// Create the mutator.
    pub fn new() -> Self {
        WrapInFunctionMutator {
            stats: MutatorStats::new(),
        }
    }
}

impl Default for WrapInFunctionMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutator for WrapInFunctionMutator {
    fn name(&self) -> &'static str {
        WRAP_IN_FUNCTION_MUTATOR_NAME
    }

    fn stats(&self) -> &MutatorStats {
        &self.stats
    }

    fn mutate(&self, program: &Program, ctx: &mut MutationCtx<'_>) -> Option<Program> {
        if program.is_empty() {
            return None;
        }
        let mut b = ProgramBuilder::new();
        b.inherit_contributors(program);
        b.add_contributor(self.name());
        b.adopting(program, |b| {
            let f = b.build_plain_function(0, |b, _| {
                for instr in program {
                    b.adopt(instr);
                }
            });
            b.build_repeat_loop(ctx.config.max_loop_trip_count_in_jit, |b, _| {
                b.call_function(f, &[]);
            });
        });
        Some(b.finalize())
    }
}
