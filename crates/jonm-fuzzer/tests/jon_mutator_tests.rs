mod common;

use common::function_seed;
use jonm_fuzzer::mutate::jon::{
    DeoptCallMutator, JitWarmupCallMutator, NeutralLoopMutator, SingleExecutionMutator,
};
use jonm_fuzzer::mutate::warmup::{
    CallDeoptMutator, CallDeoptRecompileMutator, CallInLoopMutator, SubroutineLoopMutator,
};
use jonm_fuzzer::mutate::{jon_mutators, MutationCtx, Mutator};
use jonm_fuzzer::Config;
use jonm_il::{verify_program, Attributes, BinaryOperator, Opcode, Program, ProgramBuilder};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fixtures() -> (StdRng, Config) {
    (StdRng::seed_from_u64(0x10ad), Config::default())
}

/// A function with a meaty body, called once after its definition.
fn seed_with_body() -> Program {
    let mut b = ProgramBuilder::new();
    let f = b.build_plain_function(1, |b, params| {
        let one = b.load_int(1);
        let sum = b.binary(params[0], one, BinaryOperator::Add);
        let double = b.binary(sum, sum, BinaryOperator::Add);
        b.do_return(Some(double));
    });
    let arg = b.load_int(41);
    b.call_function(f, &[arg]);
    b.finalize()
}

/// A function called inside a loop.
fn seed_with_loop_call() -> Program {
    let mut b = ProgramBuilder::new();
    let f = b.build_plain_function(1, |b, params| {
        let one = b.load_int(1);
        let sum = b.binary(params[0], one, BinaryOperator::Add);
        b.do_return(Some(sum));
    });
    b.build_repeat_loop(100, |b, i| {
        b.call_function(f, &[i]);
    });
    b.finalize()
}

/// An empty function, still called later.
fn seed_with_empty_function() -> Program {
    let mut b = ProgramBuilder::new();
    let f = b.build_plain_function(0, |_, _| {});
    b.call_function(f, &[]);
    b.finalize()
}

// ============================================================================
// Contributor and identity invariants
// ============================================================================

#[test]
fn test_mutants_are_new_objects_with_extended_contributors() {
    let (mut rng, config) = fixtures();
    let mut seed = seed_with_loop_call();
    seed.add_contributor("SpliceMutator");

    for mutator in jon_mutators() {
        let mut ctx = MutationCtx {
            rng: &mut rng,
            config: &config,
        };
        if let Some(mutant) = mutator.mutate(&seed, &mut ctx) {
            assert_ne!(mutant.id(), seed.id(), "{} must emit a new object", mutator.name());
            assert!(
                mutant.has_contributor(mutator.name()),
                "{} must record itself",
                mutator.name()
            );
            assert!(
                mutant.has_contributor("SpliceMutator"),
                "{} must keep parent contributors",
                mutator.name()
            );
            verify_program(&mutant).unwrap_or_else(|e| {
                panic!("{} produced malformed program: {e}", mutator.name())
            });
        }
    }
}

// ============================================================================
// Neutral-loop insertion
// ============================================================================

#[test]
fn test_neutral_loop_inserts_guarded_warmup_loop() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = seed_with_body();
    let mutant = NeutralLoopMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("body has mutable slots");

    let block = mutant.find_all_subroutines(Some(0))[0];
    let body = &mutant.instructions()[block.head..=block.tail];
    assert!(body.iter().any(|i| i.opcode == Opcode::BeginTry));
    assert!(body
        .iter()
        .any(|i| i.opcode == Opcode::BeginRepeatLoop && i.attrs == Attributes::Int(921)));
    assert!(mutant.len() > seed.len());
}

#[test]
fn test_neutral_loop_skips_empty_bodies() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = seed_with_empty_function();
    assert!(NeutralLoopMutator::new().mutate(&seed, &mut ctx).is_none());
}

#[test]
fn test_no_subroutine_means_no_candidate() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let mut b = ProgramBuilder::new();
    b.load_int(1);
    let seed = b.finalize();

    assert!(NeutralLoopMutator::new().mutate(&seed, &mut ctx).is_none());
    assert!(SingleExecutionMutator::new().mutate(&seed, &mut ctx).is_none());
    assert!(JitWarmupCallMutator::new().mutate(&seed, &mut ctx).is_none());
    assert!(DeoptCallMutator::new().mutate(&seed, &mut ctx).is_none());
}

// ============================================================================
// Single-execution wrap
// ============================================================================

#[test]
fn test_single_execution_wrap_shape() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    // A body whose only wrappable instruction is the addition, so the
    // wrapped opcode is known.
    let mut b = ProgramBuilder::new();
    b.build_plain_function(1, |b, params| {
        let sum = b.binary(params[0], params[0], BinaryOperator::Add);
        b.do_return(Some(sum));
    });
    let seed = b.finalize();
    let mutant = SingleExecutionMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("body has wrappable instructions");
    verify_program(&mutant).expect("wrapped program verifies");

    // The construct carries a try group with a finally arm and a warmup
    // loop inside the try.
    let groups = mutant.find_all_block_groups(None);
    let try_group = groups
        .iter()
        .find(|g| mutant[g.head].opcode == Opcode::BeginTry)
        .expect("try group present");
    let finally_index = try_group
        .interiors
        .iter()
        .copied()
        .find(|&i| mutant[i].opcode == Opcode::BeginFinally)
        .expect("finally arm present");

    // The retry path sets the flag before re-executing the instruction.
    let retry = &mutant.instructions()[finally_index..try_group.tail];
    let flag_set = retry
        .iter()
        .position(|i| i.opcode == Opcode::Reassign)
        .expect("finally sets the flag");
    let reexecution = retry
        .iter()
        .position(|i| i.opcode == Opcode::BinaryOp)
        .expect("finally re-executes the instruction");
    assert!(
        flag_set < reexecution,
        "flag must be set before the retry re-executes"
    );
}

#[test]
fn test_single_execution_skips_empty_bodies() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = seed_with_empty_function();
    assert!(SingleExecutionMutator::new().mutate(&seed, &mut ctx).is_none());
}

// ============================================================================
// JIT-warmup pre-call
// ============================================================================

#[test]
fn test_warmup_call_injects_prologue_and_warmup_loop() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = function_seed();
    let mutant = JitWarmupCallMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("plain function with a later call");
    verify_program(&mutant).expect("warmup mutant verifies");

    let block = mutant.find_all_subroutines(Some(0))[0];
    // Prologue: the first instruction of the body opens the guard.
    assert_eq!(mutant[block.head + 1].opcode, Opcode::BeginIf);
    // The guarded prologue returns null.
    let body = &mutant.instructions()[block.head..=block.tail];
    assert!(body.iter().any(|i| i.opcode == Opcode::Return));

    // A warmup loop sits between the definition and the original call.
    let after = &mutant.instructions()[block.tail..];
    assert!(after
        .iter()
        .any(|i| i.opcode == Opcode::BeginRepeatLoop && i.attrs == Attributes::Int(921)));
    let calls = mutant
        .iter()
        .filter(|i| i.opcode == Opcode::CallFunction)
        .count();
    assert!(calls >= 2, "warmup adds calls to the original one");
}

#[test]
fn test_warmup_call_applies_to_empty_bodies() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = seed_with_empty_function();
    let mutant = JitWarmupCallMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("pre-call mutators still run on empty bodies");
    verify_program(&mutant).expect("mutant verifies");
}

#[test]
fn test_warmup_call_matches_argument_types() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = function_seed(); // called as f(1)
    let mutant = JitWarmupCallMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("candidate exists");

    // Inside the warmup loop, every injected call's argument is defined
    // by an integer literal, matching the original call shape.
    let block = mutant.find_all_subroutines(Some(0))[0];
    let loop_head = mutant
        .iter()
        .enumerate()
        .position(|(index, i)| {
            index > block.tail
                && i.opcode == Opcode::BeginRepeatLoop
                && i.attrs == Attributes::Int(921)
        })
        .expect("warmup loop present");
    let loop_tail = mutant.find_block_end(loop_head).unwrap();
    let warmup_calls: Vec<_> = mutant.instructions()[loop_head..=loop_tail]
        .iter()
        .filter(|i| i.opcode == Opcode::CallFunction)
        .collect();
    assert_eq!(warmup_calls.len(), 1);
    for call in &warmup_calls {
        for &arg in call.call_arguments() {
            let def = mutant
                .iter()
                .find(|i| i.output() == Some(arg))
                .expect("argument defined");
            assert_eq!(def.opcode, Opcode::LoadInt, "argument shape must match");
        }
    }
}

// ============================================================================
// De-optimization pre-call
// ============================================================================

#[test]
fn test_deopt_call_requires_loop_call_site() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    // Called once at top level: not a deopt candidate.
    assert!(DeoptCallMutator::new()
        .mutate(&function_seed(), &mut ctx)
        .is_none());

    // Called inside a loop: candidate.
    let mutant = DeoptCallMutator::new()
        .mutate(&seed_with_loop_call(), &mut ctx)
        .expect("loop call site is a candidate");
    verify_program(&mutant).expect("deopt mutant verifies");

    // The injected loop gates its call on the midpoint and the call uses
    // a type-divergent argument.
    assert!(mutant.iter().any(|i| {
        i.opcode == Opcode::Compare
            && i.attrs == Attributes::Compare(jonm_il::Comparator::GreaterThanOrEqual)
    }));
    assert!(mutant
        .iter()
        .any(|i| i.opcode == Opcode::LoadString && i.attrs == Attributes::Str("deopt".into())));
}

// ============================================================================
// Warmup (non-preserving) mutators
// ============================================================================

#[test]
fn test_subroutine_loop_prepends_warmup() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = seed_with_body();
    let mutant = SubroutineLoopMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("subroutine exists");
    verify_program(&mutant).expect("mutant verifies");

    let block = mutant.find_all_subroutines(Some(0))[0];
    let body = &mutant.instructions()[block.head + 1..block.tail];
    assert!(body.iter().any(|i| i.opcode == Opcode::BeginRepeatLoop));
}

#[test]
fn test_call_in_loop_wraps_call() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = function_seed();
    let mutant = CallInLoopMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("calls exist");
    verify_program(&mutant).expect("mutant verifies");

    // Every wrapped call got a repeat loop and a result rebinding.
    assert!(mutant.iter().any(|i| i.opcode == Opcode::BeginRepeatLoop));
    assert!(mutant.iter().any(|i| i.opcode == Opcode::Reassign));
    assert!(mutant.iter().any(|i| i.opcode == Opcode::LoadNull));
}

#[test]
fn test_call_deopt_adds_divergent_followup() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = function_seed();
    let mutant = CallDeoptMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("calls exist");
    verify_program(&mutant).expect("mutant verifies");

    assert!(mutant
        .iter()
        .any(|i| i.opcode == Opcode::LoadString && i.attrs == Attributes::Str("deopt".into())));
}

#[test]
fn test_call_deopt_recompile_adds_second_loop() {
    let (mut rng, config) = fixtures();
    let mut ctx = MutationCtx {
        rng: &mut rng,
        config: &config,
    };
    let seed = function_seed();
    let mutant = CallDeoptRecompileMutator::new()
        .mutate(&seed, &mut ctx)
        .expect("calls exist");
    verify_program(&mutant).expect("mutant verifies");

    let loops = mutant
        .iter()
        .filter(|i| i.opcode == Opcode::BeginRepeatLoop)
        .count();
    assert!(loops >= 2, "warmup and recompile loops both present");
}
