mod common;

use common::{function_seed, recursive_seed, DebugLifter, RecordingSink, ScriptedRunner, VecCorpus};
use jonm_fuzzer::mutate::jon::NEUTRAL_LOOP_MUTATOR_NAME;
use jonm_fuzzer::{
    run_until_shutdown, Config, Execution, FuzzCtx, FuzzEngine, HybridFuzzer, JonmEngine, Outcome,
    RoundOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

const REFEREE_STDOUT: &str = "42\nChecksum: 11206928\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn timed_out() -> Execution {
    Execution {
        outcome: Outcome::TimedOut,
        stdout: String::new(),
        stderr: String::new(),
        fuzzout: String::new(),
        exec_time: Duration::from_secs(2),
    }
}

fn crashed() -> Execution {
    Execution {
        outcome: Outcome::Crashed(11),
        stdout: String::new(),
        stderr: "Segmentation fault".to_string(),
        fuzzout: String::new(),
        exec_time: Duration::from_millis(5),
    }
}

// ============================================================================
// Determinism gate
// ============================================================================

#[test]
fn test_round_rejects_recursive_seed_without_executing() {
    let corpus = VecCorpus::new(vec![recursive_seed()]);
    let mut runner = ScriptedRunner::new(|_, _| Execution::succeeded(""));
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(1);
    let config = Config::default();
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(outcome, RoundOutcome::SeedRejected);
    assert_eq!(runner.runs, 0, "recursive seed must never execute");
}

#[test]
fn test_round_rejects_timing_out_seed() {
    let corpus = VecCorpus::new(vec![function_seed()]);
    let mut runner = ScriptedRunner::new(|_, _| timed_out());
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(2);
    let config = Config::default();
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(outcome, RoundOutcome::SeedRejected);
    assert_eq!(runner.determinism_runs, 1);
    assert_eq!(runner.fuzzing_runs, 0);
}

#[test]
fn test_round_rejects_nondeterministic_seed() {
    let corpus = VecCorpus::new(vec![function_seed()]);
    let mut counter = 0u32;
    let mut runner = ScriptedRunner::new(move |_, _| {
        counter += 1;
        Execution::succeeded(format!("{counter}\n"))
    });
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(3);
    let config = Config::default();
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(outcome, RoundOutcome::SeedRejected);
    assert_eq!(sink.non_determinism, 1);
    assert!(sink.miscompilations.is_empty());
}

// ============================================================================
// Differential comparison
// ============================================================================

#[test]
fn test_divergent_mutant_reports_miscompilation() {
    init_tracing();
    let corpus = VecCorpus::new(vec![function_seed()]);
    let mut fuzz_count = 0u32;
    let mut runner = ScriptedRunner::new(move |_, purpose| {
        if purpose == jonm_fuzzer::Purpose::Fuzzing {
            fuzz_count += 1;
            if fuzz_count == 2 {
                // One mutant prints something else.
                return Execution::succeeded("41\nChecksum: 11206928\n");
            }
        }
        Execution::succeeded(REFEREE_STDOUT)
    });
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(4);
    let config = Config {
        num_consecutive_mutations: 3,
        ..Config::default()
    };
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(
        outcome,
        RoundOutcome::Completed {
            mutants_executed: 3,
            miscompilations: 1
        }
    );
    assert_eq!(sink.miscompilations.len(), 1);
    let (_, mutant_stdout, _, seed_stdout) = &sink.miscompilations[0];
    assert_eq!(mutant_stdout, "41\nChecksum: 11206928\n");
    assert_eq!(seed_stdout, REFEREE_STDOUT);
    assert_eq!(runner.determinism_runs, 3);
    assert_eq!(runner.fuzzing_runs, 3);
}

#[test]
fn test_failed_and_timed_out_mutants_are_not_miscompilations() {
    let corpus = VecCorpus::new(vec![function_seed()]);
    let mut fuzz_count = 0u32;
    let mut runner = ScriptedRunner::new(move |_, purpose| {
        if purpose == jonm_fuzzer::Purpose::Fuzzing {
            fuzz_count += 1;
            return match fuzz_count {
                1 => Execution {
                    outcome: Outcome::Failed(3),
                    stdout: "garbage\n".to_string(),
                    stderr: "TypeError".to_string(),
                    fuzzout: String::new(),
                    exec_time: Duration::from_millis(1),
                },
                2 => timed_out(),
                _ => Execution::succeeded(REFEREE_STDOUT),
            };
        }
        Execution::succeeded(REFEREE_STDOUT)
    });
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(5);
    let config = Config {
        num_consecutive_mutations: 3,
        ..Config::default()
    };
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(
        outcome,
        RoundOutcome::Completed {
            mutants_executed: 3,
            miscompilations: 0
        }
    );
    assert!(sink.miscompilations.is_empty());
}

#[test]
fn test_crashing_mutants_route_to_crash_sink() {
    let corpus = VecCorpus::new(vec![function_seed()]);
    let mut runner = ScriptedRunner::new(move |_, purpose| {
        if purpose == jonm_fuzzer::Purpose::Fuzzing {
            crashed()
        } else {
            Execution::succeeded(REFEREE_STDOUT)
        }
    });
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(6);
    let config = Config::default();
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(
        outcome,
        RoundOutcome::Completed {
            mutants_executed: 5,
            miscompilations: 0
        }
    );
    assert_eq!(sink.crashes, 5);
    assert!(sink.miscompilations.is_empty());
}

// ============================================================================
// Seed picking
// ============================================================================

#[test]
fn test_jon_tainted_seeds_are_skipped() {
    let mut tainted = function_seed();
    tainted.add_contributor(NEUTRAL_LOOP_MUTATOR_NAME);
    let corpus = VecCorpus::new(vec![tainted]);
    let mut runner = ScriptedRunner::new(|_, _| Execution::succeeded(REFEREE_STDOUT));
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(7);
    let config = Config::default();
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(outcome, RoundOutcome::NoSeed);
    assert_eq!(runner.runs, 0);
}

#[test]
fn test_empty_corpus_yields_no_seed() {
    let corpus = VecCorpus::new(vec![]);
    let mut runner = ScriptedRunner::new(|_, _| Execution::succeeded(""));
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(8);
    let config = Config::default();
    let mut engine = JonmEngine::new(&config);

    let outcome = engine
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();

    assert_eq!(outcome, RoundOutcome::NoSeed);
}

// ============================================================================
// Hybrid driver
// ============================================================================

struct CountingEngine {
    name: &'static str,
    rounds: std::rc::Rc<std::cell::Cell<u32>>,
}

impl FuzzEngine for CountingEngine {
    fn name(&self) -> &'static str {
        self.name
    }

    fn fuzz_one(&mut self, _ctx: &mut FuzzCtx<'_>) -> jonm_fuzzer::EngineResult<RoundOutcome> {
        self.rounds.set(self.rounds.get() + 1);
        Ok(RoundOutcome::NoSeed)
    }
}

#[test]
fn test_hybrid_respects_weights() {
    let heavy = std::rc::Rc::new(std::cell::Cell::new(0));
    let light = std::rc::Rc::new(std::cell::Cell::new(0));

    let mut hybrid = HybridFuzzer::new();
    hybrid.add_engine(
        6,
        Box::new(CountingEngine {
            name: "heavy",
            rounds: heavy.clone(),
        }),
    );
    hybrid.add_engine(
        2,
        Box::new(CountingEngine {
            name: "light",
            rounds: light.clone(),
        }),
    );

    let corpus = VecCorpus::new(vec![]);
    let mut runner = ScriptedRunner::new(|_, _| Execution::succeeded(""));
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(9);
    let config = Config::default();

    for _ in 0..200 {
        hybrid
            .fuzz_one(&mut FuzzCtx {
                corpus: &corpus,
                runner: &mut runner,
                lifter: &DebugLifter,
                events: &mut sink,
                rng: &mut rng,
                config: &config,
            })
            .unwrap();
    }

    assert_eq!(heavy.get() + light.get(), 200);
    assert!(
        heavy.get() > light.get(),
        "weight 6 must be drawn more often than weight 2 ({} vs {})",
        heavy.get(),
        light.get()
    );
}

#[test]
fn test_hybrid_without_children_is_inert() {
    let mut hybrid = HybridFuzzer::new();
    let corpus = VecCorpus::new(vec![]);
    let mut runner = ScriptedRunner::new(|_, _| Execution::succeeded(""));
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(10);
    let config = Config::default();

    let outcome = hybrid
        .fuzz_one(&mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        })
        .unwrap();
    assert_eq!(outcome, RoundOutcome::NoSeed);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_shutdown_is_honored_between_rounds() {
    let corpus = VecCorpus::new(vec![]);
    let mut runner = ScriptedRunner::new(|_, _| Execution::succeeded(""));
    let mut sink = RecordingSink::default();
    let mut rng = StdRng::seed_from_u64(11);
    let config = Config::default();
    let mut engine = JonmEngine::new(&config);

    let shutdown = AtomicBool::new(true);
    let rounds = run_until_shutdown(
        &mut engine,
        &mut FuzzCtx {
            corpus: &corpus,
            runner: &mut runner,
            lifter: &DebugLifter,
            events: &mut sink,
            rng: &mut rng,
            config: &config,
        },
        &shutdown,
    )
    .unwrap();
    assert_eq!(rounds, 0);
    assert_eq!(runner.runs, 0);
}
