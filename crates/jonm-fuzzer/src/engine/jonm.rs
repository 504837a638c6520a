//! The JoNM engine
//!
//! One round: pick a seed untouched by JoN mutators, normalize and
//! instrument its checksum, gate it on determinism, record its output as
//! the referee, then derive a series of mutants from the *same* seed and
//! byte-compare each succeeded mutant's stdout against the referee.
//! Divergence is a candidate miscompilation; failures and timeouts are
//! not, because the oracle only speaks for runs that completed.

use crate::analysis::may_recurse_unboundedly;
use crate::config::Config;
use crate::engine::{FuzzCtx, FuzzEngine, MiscompilationReport, Origin, RoundOutcome};
use crate::error::{EngineError, EngineResult};
use crate::exec::{Execution, ExecutionCache, Outcome, Purpose};
use crate::instrument::{ChecksumPolicy, InsertChecksumOps};
use crate::mutate::{
    has_jon_contributor, jon_mutators, warmup, MutationCtx, Mutator,
};
use jonm_il::Program;
use rand::seq::SliceRandom;
use std::time::Duration;

/// How often to re-sample the corpus for an untainted seed before giving
/// up on the round.
const MAX_SEED_PICKS: usize = 32;

/// The JIT-on/off mutation engine.
pub struct JonmEngine {
    mutators: Vec<Box<dyn Mutator>>,
    fallback: Box<dyn Mutator>,
    last_resort: Box<dyn Mutator>,
    checksum: InsertChecksumOps,
    cache: ExecutionCache,
}

impl JonmEngine {
    /// Create the engine with the full JoN mutator registry.
    pub fn new(config: &Config) -> Self {
        JonmEngine {
            mutators: jon_mutators(),
            fallback: Box::new(warmup::SubroutineLoopMutator::new()),
            last_resort: Box::new(warmup::WrapInFunctionMutator::new()),
            checksum: InsertChecksumOps::from_config(ChecksumPolicy::Modest, config),
            cache: ExecutionCache::new(),
        }
    }

    /// Statistics of the registered JoN mutators, by name.
    pub fn mutator_stats(&self) -> Vec<(&'static str, u64, u64)> {
        self.mutators
            .iter()
            .map(|m| (m.name(), m.stats().attempts(), m.stats().failures()))
            .collect()
    }

    /// Draw a seed whose contributor set lists no JoN mutator, so mutants
    /// never feed back into their own input.
    fn pick_seed(&self, ctx: &mut FuzzCtx<'_>) -> Option<Program> {
        for _ in 0..MAX_SEED_PICKS {
            let program = ctx.corpus.sample(ctx.rng)?;
            if !has_jon_contributor(&program) {
                return Some(program);
            }
        }
        None
    }

    /// Lift, wrap, and execute a program.
    fn execute(
        &mut self,
        program: &Program,
        ctx: &mut FuzzCtx<'_>,
        purpose: Purpose,
    ) -> EngineResult<Execution> {
        let body = ctx.lifter.lift(program);
        let source = crate::instrument::wrap_source(&body);
        let timeout = Duration::from_millis(ctx.config.execution_timeout_ms);
        Ok(ctx.runner.run(&source, timeout, purpose)?)
    }

    /// Execute the seed repeatedly; true iff every run succeeded with
    /// byte-identical stdout. The final execution is cached as the referee.
    fn check_determinism(&mut self, seed: &Program, ctx: &mut FuzzCtx<'_>) -> EngineResult<bool> {
        let runs = ctx.config.determinism_executions.max(1);
        let mut last: Option<Execution> = None;
        for _ in 0..runs {
            let execution = self.execute(seed, ctx, Purpose::Determinism)?;
            if !execution.outcome.is_success() {
                tracing::debug!(seed = seed.id(), outcome = ?execution.outcome, "seed rejected");
                return Ok(false);
            }
            if let Some(previous) = &last {
                if previous.stdout != execution.stdout {
                    tracing::warn!(seed = seed.id(), "seed output is non-deterministic");
                    ctx.events.non_determinism(seed, previous, &execution);
                    return Ok(false);
                }
            }
            last = Some(execution);
        }
        if let Some(execution) = last {
            self.cache.insert(seed.id(), execution);
        }
        Ok(true)
    }

    /// Sample JoN mutators with retries; fall back to the non-preserving
    /// inserters when every attempt fails.
    fn mutate_seed(&self, seed: &Program, mctx: &mut MutationCtx<'_>) -> Option<Program> {
        let attempts = mctx.config.max_mutation_attempts.max(1);
        for attempt in 0..attempts {
            let mutator = match self.mutators.choose(mctx.rng) {
                Some(mutator) => mutator,
                None => break,
            };
            if let Some(mutant) = mutator.mutate(seed, mctx) {
                let added = mutant.len().saturating_sub(seed.len()) as u64;
                mutator.stats().record_success(added);
                return Some(mutant);
            }
            mutator.stats().failed_to_generate();

            if attempt + 1 == attempts {
                tracing::debug!(seed = seed.id(), "JoN mutators exhausted; falling back");
                for fallback in [&self.fallback, &self.last_resort] {
                    if let Some(mutant) = fallback.mutate(seed, mctx) {
                        let added = mutant.len().saturating_sub(seed.len()) as u64;
                        fallback.stats().record_success(added);
                        return Some(mutant);
                    }
                    fallback.stats().failed_to_generate();
                }
            }
        }
        None
    }
}

impl FuzzEngine for JonmEngine {
    fn name(&self) -> &'static str {
        "JoNM"
    }

    fn fuzz_one(&mut self, ctx: &mut FuzzCtx<'_>) -> EngineResult<RoundOutcome> {
        let seed = match self.pick_seed(ctx) {
            Some(seed) => seed,
            None => return Ok(RoundOutcome::NoSeed),
        };

        // Normalize spliced container loads and (re-)instrument. A seed we
        // cannot instrument indicates a bug, not a bad seed.
        let seed = self.checksum.preprocess(&seed, ctx.rng);
        let instrumented = seed
            .instructions()
            .first()
            .map(InsertChecksumOps::is_checksum_load)
            .unwrap_or(false);
        if !instrumented {
            return Err(EngineError::ChecksumInjectionFailed {
                program_id: seed.id(),
            });
        }

        // Determinism gate: the recursion heuristic first, then repeated
        // execution.
        if may_recurse_unboundedly(&seed) {
            tracing::debug!(seed = seed.id(), "recursion heuristic rejected seed");
            return Ok(RoundOutcome::SeedRejected);
        }
        if !self.check_determinism(&seed, ctx)? {
            return Ok(RoundOutcome::SeedRejected);
        }
        let referee = match self.cache.get(seed.id()) {
            Some(execution) => execution.clone(),
            None => {
                return Err(EngineError::InvariantViolation {
                    what: "referee execution missing from cache".to_string(),
                })
            }
        };

        let mut mutants_executed = 0;
        let mut miscompilations = 0;
        for _ in 0..ctx.config.num_consecutive_mutations {
            // All consecutive mutations derive from the same instrumented
            // seed; the seed is never advanced within a round.
            let mutant = {
                let mut mctx = MutationCtx {
                    rng: ctx.rng,
                    config: ctx.config,
                };
                self.mutate_seed(&seed, &mut mctx)
            };
            let mutant = match mutant {
                Some(mutant) => mutant,
                None => continue,
            };
            let mutant = self.checksum.postprocess(&mutant).unwrap_or(mutant);

            if mutant.id() == seed.id() {
                return Err(EngineError::InvariantViolation {
                    what: "mutant is the same object as the seed".to_string(),
                });
            }

            let execution = self.execute(&mutant, ctx, Purpose::Fuzzing)?;
            mutants_executed += 1;
            match execution.outcome {
                Outcome::Succeeded => {
                    if execution.stdout != referee.stdout {
                        miscompilations += 1;
                        tracing::info!(
                            seed = seed.id(),
                            mutant = mutant.id(),
                            "stdout divergence, candidate miscompilation"
                        );
                        ctx.events.miscompilation(&MiscompilationReport {
                            mutant: &mutant,
                            mutant_stdout: &execution.stdout,
                            seed: &seed,
                            seed_stdout: &referee.stdout,
                            origin: Origin::Local,
                            exec_time: execution.exec_time,
                        });
                    }
                }
                Outcome::Crashed(_) => {
                    ctx.events.crash(&mutant, &execution);
                }
                // Runtime failures and timeouts say nothing under this
                // oracle.
                Outcome::Failed(_) | Outcome::TimedOut => {}
            }
        }

        self.cache.remove(seed.id());
        Ok(RoundOutcome::Completed {
            mutants_executed,
            miscompilations,
        })
    }
}
