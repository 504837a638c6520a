//! Checksum instrumentation
//!
//! Differential testing needs a stable observable output for every program;
//! many corpus programs print nothing. This mutator threads a running
//! integer checksum through the program: the wire preamble seeds the
//! container and prints it on exit, and the instrumentation inserts update
//! operations against it at random program points.
//!
//! Update placement is governed by a policy. The default Modest policy
//! updates freely outside subroutines and bounds per-subroutine update
//! counts through a keyed counter map, so engines that inline or elide
//! calls differently still agree on the final value.

use crate::analysis::{Context, ContextAnalyzer, DeadCodeAnalyzer, DefUseAnalyzer};
use crate::config::Config;
use crate::instrument::preamble;
use jonm_il::{
    BinaryOperator, Comparator, Instruction, Opcode, Program, ProgramBuilder, SubroutineKind,
    Variable,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Contributor name recorded on instrumented programs.
pub const CHECKSUM_MUTATOR_NAME: &str = "InsertChecksumOpsMutator";

/// Key under which top-level updates would be counted; always updated
/// unconditionally.
pub const GLOBAL_KEY: &str = "global";

/// Operators used for checksum updates.
pub const CHECKSUM_UPDATE_OPS: [BinaryOperator; 11] = [
    BinaryOperator::Add,
    BinaryOperator::Sub,
    BinaryOperator::Mul,
    BinaryOperator::BitAnd,
    BinaryOperator::BitOr,
    BinaryOperator::Xor,
    BinaryOperator::LogicOr,
    BinaryOperator::LogicAnd,
    BinaryOperator::LShift,
    BinaryOperator::RShift,
    BinaryOperator::UnsignedRShift,
];

/// Placement policy for checksum updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumPolicy {
    /// Update anywhere inside executable script code.
    Aggressive,
    /// Update only outside any subroutine, so update counts cannot depend
    /// on engine-specific call behavior.
    Conservative,
    /// Update freely outside subroutines; inside subroutines, bound the
    /// per-subroutine update count through a keyed counter.
    Modest,
}

/// How updates are emitted inside one subroutine under the Modest policy.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UpdateMode {
    /// Unconditional direct update.
    Direct,
    /// Counted update through the given key.
    Keyed(String),
    /// No updates in this subroutine.
    Skip,
}

/// The insert-checksum-ops mutator.
pub struct InsertChecksumOps {
    policy: ChecksumPolicy,
    probability: f64,
    max_updates_per_subroutine: i64,
}

impl InsertChecksumOps {
    /// Create the mutator with default probability and cap.
    pub fn new(policy: ChecksumPolicy) -> Self {
        InsertChecksumOps {
            policy,
            probability: 0.2,
            max_updates_per_subroutine: 50,
        }
    }

    /// Create the mutator from configuration.
    pub fn from_config(policy: ChecksumPolicy, config: &Config) -> Self {
        InsertChecksumOps {
            policy,
            probability: config.checksum_insertion_prob,
            max_updates_per_subroutine: config.max_updates_per_subroutine,
        }
    }

    /// Whether an instruction loads the checksum container.
    pub fn is_checksum_load(instr: &Instruction) -> bool {
        instr.opcode == Opcode::LoadNamedVariable
            && instr.name() == Some(preamble::CHECKSUM_VARIABLE)
    }

    /// Number of checksum-container loads in a program.
    pub fn count_checksum_loads(program: &Program) -> usize {
        program
            .iter()
            .filter(|i| Self::is_checksum_load(i))
            .count()
    }

    /// Prepare a program for mutation: scrub stale container loads left by
    /// corpus splicing, then inject a fresh container load at index 0 and
    /// update operations throughout.
    pub fn preprocess(&self, program: &Program, rng: &mut StdRng) -> Program {
        let scrubbed = self.scrub(program);
        self.instrument(&scrubbed, rng)
    }

    /// Rewrite every checksum-container load into a freshly allocated
    /// local two-slot array `[0, {}]`.
    ///
    /// Spliced-in loads would otherwise alias the real container and
    /// contribute engine-dependent updates.
    fn scrub(&self, program: &Program) -> Program {
        let mut b = ProgramBuilder::new();
        b.inherit_contributors(program);
        b.adopting(program, |b| {
            for instr in program {
                if Self::is_checksum_load(instr) {
                    let local = fresh_local_container(b);
                    if let Some(out) = instr.output() {
                        b.remap(out, local);
                    }
                } else {
                    b.adopt(instr);
                }
            }
        });
        b.finalize()
    }

    /// Inject the container load and update operations.
    fn instrument(&self, program: &Program, rng: &mut StdRng) -> Program {
        let def_use = DefUseAnalyzer::from_program(program);

        let mut b = ProgramBuilder::new();
        b.inherit_contributors(program);
        b.add_contributor(CHECKSUM_MUTATOR_NAME);

        b.adopting(program, |b| {
            let container = b.load_named_variable(preamble::CHECKSUM_VARIABLE);

            let mut context = ContextAnalyzer::new();
            let mut dead_code = DeadCodeAnalyzer::new();
            // Innermost subroutine's update mode; the base entry is the
            // top level.
            let mut modes: Vec<UpdateMode> = vec![UpdateMode::Direct];

            for (index, instr) in program.iter().enumerate() {
                if instr.opcode.is_subroutine_start() {
                    modes.push(self.classify_subroutine(index, instr, &def_use));
                } else if closes_subroutine(instr) && modes.len() > 1 {
                    modes.pop();
                }

                b.adopt(instr);
                context.analyze(instr);
                dead_code.analyze(instr);

                if !rng.gen_bool(self.probability) {
                    continue;
                }
                let ctx = context.context();
                if !ctx.contains(Context::JAVASCRIPT)
                    || ctx.contains_any(Context::CODE_STRING | Context::OBJECT_LITERAL)
                    || dead_code.is_dead_code()
                {
                    continue;
                }

                let in_subroutine = ctx.contains(Context::SUBROUTINE);
                match self.policy {
                    ChecksumPolicy::Aggressive => {
                        self.emit_direct_update(b, container, rng);
                    }
                    ChecksumPolicy::Conservative => {
                        if !in_subroutine {
                            self.emit_direct_update(b, container, rng);
                        }
                    }
                    ChecksumPolicy::Modest => {
                        if !in_subroutine {
                            self.emit_direct_update(b, container, rng);
                        } else {
                            match modes.last() {
                                Some(UpdateMode::Direct) => {
                                    self.emit_direct_update(b, container, rng);
                                }
                                Some(UpdateMode::Keyed(key)) => {
                                    let key = key.clone();
                                    self.emit_keyed_update(b, container, &key, rng);
                                }
                                Some(UpdateMode::Skip) | None => {}
                            }
                        }
                    }
                }
            }
        });
        b.finalize()
    }

    /// Classify one subroutine definition for the Modest policy.
    fn classify_subroutine(
        &self,
        head_index: usize,
        head: &Instruction,
        def_use: &DefUseAnalyzer,
    ) -> UpdateMode {
        let kind = match head.opcode.subroutine_kind() {
            Some(kind) => kind,
            None => return UpdateMode::Skip,
        };
        let key = UpdateMode::Keyed(format!("s{head_index}"));
        match kind {
            // Invocation counts of higher-order values depend on the
            // engine's iteration internals; exclude those.
            SubroutineKind::PlainFunction
            | SubroutineKind::ArrowFunction
            | SubroutineKind::GeneratorFunction => match head.output() {
                Some(f) if def_use.is_passed_to_call(f) => UpdateMode::Skip,
                _ => key,
            },
            SubroutineKind::AsyncFunction
            | SubroutineKind::ObjectLiteralComputedMethod
            | SubroutineKind::Constructor
            | SubroutineKind::ClassConstructor => UpdateMode::Skip,
            SubroutineKind::ObjectLiteralMethod | SubroutineKind::ClassMethod => {
                // Implicit conversion hooks are invoked at the engine's
                // discretion.
                match head.name() {
                    Some("toString") | Some("valueOf") => UpdateMode::Skip,
                    _ => key,
                }
            }
            SubroutineKind::ObjectLiteralGetter
            | SubroutineKind::ObjectLiteralSetter
            | SubroutineKind::ClassGetter
            | SubroutineKind::ClassSetter
            | SubroutineKind::ClassStaticInitializer => key,
        }
    }

    /// `container[0] op= literal`
    fn emit_direct_update(&self, b: &mut ProgramBuilder, container: Variable, rng: &mut StdRng) {
        let (op, value) = random_update(rng);
        let operand = b.load_int(value);
        b.update_element(container, 0, op, operand);
    }

    /// The bounded in-subroutine update: initialize `container[1][key]` to
    /// zero on first sight, then update the checksum and bump the counter
    /// while it is below the cap. The `"global"` key updates
    /// unconditionally.
    fn emit_keyed_update(
        &self,
        b: &mut ProgramBuilder,
        container: Variable,
        key: &str,
        rng: &mut StdRng,
    ) {
        if key == GLOBAL_KEY {
            self.emit_direct_update(b, container, rng);
            return;
        }
        let (op, value) = random_update(rng);
        let counters = b.get_element(container, 1);
        let current = b.get_property(counters, key);
        let undefined = b.load_undefined();
        let missing = b.compare(current, undefined, Comparator::StrictEqual);
        b.build_if(missing, |b| {
            let zero = b.load_int(0);
            b.set_property(counters, key, zero);
        });
        let count = b.get_property(counters, key);
        let cap = b.load_int(self.max_updates_per_subroutine);
        let below = b.compare(count, cap, Comparator::LessThan);
        b.build_if(below, |b| {
            let operand = b.load_int(value);
            b.update_element(container, 0, op, operand);
            let one = b.load_int(1);
            let next = b.binary(count, one, BinaryOperator::Add);
            b.set_property(counters, key, next);
        });
    }

    /// Deduplicate container loads after a downstream mutation: only the
    /// very first instruction may load the container; any other load is
    /// rewritten to a fresh local array.
    ///
    /// Returns `None` when the program is not instrumented (no index-0
    /// load) or already clean; the caller keeps the input program.
    pub fn postprocess(&self, program: &Program) -> Option<Program> {
        let first_is_load = program
            .instructions()
            .first()
            .map(Self::is_checksum_load)
            .unwrap_or(false);
        if !first_is_load {
            return None;
        }
        let duplicates = program
            .iter()
            .skip(1)
            .any(Self::is_checksum_load);
        if !duplicates {
            return None;
        }

        let mut b = ProgramBuilder::new();
        b.inherit_contributors(program);
        b.adopting(program, |b| {
            for (index, instr) in program.iter().enumerate() {
                if index > 0 && Self::is_checksum_load(instr) {
                    let local = fresh_local_container(b);
                    if let Some(out) = instr.output() {
                        b.remap(out, local);
                    }
                } else {
                    b.adopt(instr);
                }
            }
        });
        Some(b.finalize())
    }
}

fn closes_subroutine(instr: &Instruction) -> bool {
    instr.is_block_end()
        && !instr.is_block_start()
        && instr.opcode.is_member_of(jonm_il::Family::AnySubroutine)
}

/// A fresh local `[0, {}]` container.
fn fresh_local_container(b: &mut ProgramBuilder) -> Variable {
    let zero = b.load_int(0);
    let counters = b.create_object(&[]);
    b.create_array(&[zero, counters])
}

fn random_update(rng: &mut StdRng) -> (BinaryOperator, i64) {
    let op = *CHECKSUM_UPDATE_OPS
        .choose(rng)
        .unwrap_or(&BinaryOperator::Add);
    let value = rng.gen_range(1..0x10000);
    (op, value)
}
