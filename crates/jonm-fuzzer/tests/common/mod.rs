#![allow(dead_code)]

//! Shared fixtures for integration tests: an in-memory corpus, a scripted
//! runner, a recording event sink, and a debug lifter.

use jonm_fuzzer::{
    Corpus, EventSink, ExecResult, Execution, Lifter, MiscompilationReport, Purpose, Runner,
};
use jonm_il::{Program, ProgramBuilder};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::time::Duration;

/// In-memory corpus of cloned programs.
pub struct VecCorpus {
    programs: Vec<Program>,
}

impl VecCorpus {
    pub fn new(programs: Vec<Program>) -> Self {
        VecCorpus { programs }
    }
}

impl Corpus for VecCorpus {
    fn len(&self) -> usize {
        self.programs.len()
    }

    fn sample(&self, rng: &mut StdRng) -> Option<Program> {
        self.programs.choose(rng).cloned()
    }
}

/// Runner driven by a closure; counts invocations per purpose.
pub struct ScriptedRunner<F: FnMut(&str, Purpose) -> Execution> {
    script: F,
    pub runs: usize,
    pub determinism_runs: usize,
    pub fuzzing_runs: usize,
}

impl<F: FnMut(&str, Purpose) -> Execution> ScriptedRunner<F> {
    pub fn new(script: F) -> Self {
        ScriptedRunner {
            script,
            runs: 0,
            determinism_runs: 0,
            fuzzing_runs: 0,
        }
    }
}

impl<F: FnMut(&str, Purpose) -> Execution> Runner for ScriptedRunner<F> {
    fn run(&mut self, source: &str, _timeout: Duration, purpose: Purpose) -> ExecResult<Execution> {
        self.runs += 1;
        match purpose {
            Purpose::Determinism => self.determinism_runs += 1,
            Purpose::Fuzzing => self.fuzzing_runs += 1,
            _ => {}
        }
        Ok((self.script)(source, purpose))
    }
}

/// Event sink that records everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub miscompilations: Vec<(u64, String, u64, String)>,
    pub crashes: usize,
    pub non_determinism: usize,
}

impl EventSink for RecordingSink {
    fn miscompilation(&mut self, report: &MiscompilationReport<'_>) {
        // Reports travel over the collaborator channel; they must
        // serialize.
        serde_json::to_string(report).expect("report serializes");
        self.miscompilations.push((
            report.mutant.id(),
            report.mutant_stdout.to_string(),
            report.seed.id(),
            report.seed_stdout.to_string(),
        ));
    }

    fn crash(&mut self, _program: &Program, _execution: &Execution) {
        self.crashes += 1;
    }

    fn non_determinism(&mut self, _program: &Program, _first: &Execution, _second: &Execution) {
        self.non_determinism += 1;
    }
}

/// Lifter producing one line per instruction; runners under test ignore
/// the source anyway.
pub struct DebugLifter;

impl Lifter for DebugLifter {
    fn lift(&self, program: &Program) -> String {
        let mut out = String::new();
        for instr in program {
            out.push_str(&format!("{:?};\n", instr.opcode));
        }
        out
    }
}

/// A seed that defines `function f(x) { return x + 1 }`, calls it once
/// with an integer, and prints the result.
pub fn function_seed() -> Program {
    let mut b = ProgramBuilder::new();
    let print = b.load_builtin("print");
    let f = b.build_plain_function(1, |b, params| {
        let one = b.load_int(1);
        let sum = b.binary(params[0], one, jonm_il::BinaryOperator::Add);
        b.do_return(Some(sum));
    });
    let arg = b.load_int(1);
    let result = b.call_function(f, &[arg]);
    b.call_function(print, &[result]);
    b.finalize()
}

/// A seed containing `function f() { f() }`.
pub fn recursive_seed() -> Program {
    let mut b = ProgramBuilder::new();
    b.build_plain_function(0, |b, _| {
        let f_inner = b.visible_variables()[0];
        b.call_function(f_inner, &[]);
    });
    b.finalize()
}
