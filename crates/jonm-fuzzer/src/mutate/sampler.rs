//! Candidate sampling
//!
//! The two base shapes of the mutation framework. Both sweep the program
//! once with fresh analyzers, collect candidate sites, sample at most
//! `max_simultaneous` of them uniformly, and re-emit the program through a
//! builder, adopting unchanged instructions and dispatching to the mutator
//! at chosen sites. Both return `None` iff no candidate exists.

use crate::analysis::{Context, ContextAnalyzer, DeadCodeAnalyzer};
use crate::mutate::MutationCtx;
use jonm_il::{Block, Instruction, Program, ProgramBuilder};
use rand::seq::SliceRandom;

/// Analyzer state captured after each instruction.
#[derive(Debug, Clone, Copy)]
pub struct SiteInfo {
    /// Current context at this position.
    pub context: Context,
    /// Aggregate context at this position.
    pub aggregate: Context,
    /// Whether this position is unreachable.
    pub dead: bool,
}

/// Sweep the program once and capture the analyzer state after every
/// instruction.
pub fn analyze_sites(program: &Program) -> Vec<SiteInfo> {
    let mut context = ContextAnalyzer::new();
    let mut dead_code = DeadCodeAnalyzer::new();
    program
        .iter()
        .map(|instr| {
            context.analyze(instr);
            dead_code.analyze(instr);
            SiteInfo {
                context: context.context(),
                aggregate: context.aggregate_context(),
                dead: dead_code.is_dead_code(),
            }
        })
        .collect()
}

/// The common JoN insertion veto: executable script code, not directly
/// inside a loop, a code string, or an object literal, and reachable.
pub fn jon_site_ok(info: &SiteInfo) -> bool {
    info.context.contains(Context::JAVASCRIPT)
        && !info
            .context
            .contains_any(Context::LOOP | Context::CODE_STRING | Context::OBJECT_LITERAL)
        && !info.dead
}

/// One outmost subroutine offered to a subroutine mutator.
pub struct SubroutineSite<'p> {
    /// The subroutine block within the whole program.
    pub block: Block,
    /// The subroutine's instructions, heads included.
    pub instructions: &'p [Instruction],
    /// `mutable_mask[i]` is true when code may be inserted after
    /// `instructions[i]`.
    pub mutable_mask: Vec<bool>,
    /// Analyzer state just inside the subroutine body.
    pub head_info: SiteInfo,
}

impl SubroutineSite<'_> {
    /// Relative indices after which insertion is allowed.
    pub fn mutable_slots(&self) -> Vec<usize> {
        self.mutable_mask
            .iter()
            .enumerate()
            .filter_map(|(index, &ok)| ok.then_some(index))
            .collect()
    }

    /// The subroutine's opening instruction.
    pub fn head_instr(&self) -> &Instruction {
        &self.instructions[0]
    }

    /// Whether the body is empty (head immediately followed by tail).
    pub fn body_is_empty(&self) -> bool {
        self.instructions.len() <= 2
    }
}

/// Per-outmost-subroutine mutation.
///
/// `slot_ok` decides which positions inside a subroutine accept insertions
/// (building the mutable mask), `is_candidate` filters whole subroutines,
/// and `emit` re-emits one sampled subroutine (mutated, or adopted
/// unchanged returning false). Returns `None` iff no candidate exists or
/// every sampled emission declined.
pub fn subroutine_mutation(
    program: &Program,
    ctx: &mut MutationCtx<'_>,
    mutator_name: &'static str,
    max_simultaneous: usize,
    slot_ok: impl Fn(&SiteInfo) -> bool,
    is_candidate: impl Fn(&Program, &SubroutineSite<'_>) -> bool,
    mut emit: impl FnMut(&mut ProgramBuilder, &SubroutineSite<'_>, &mut MutationCtx<'_>) -> bool,
) -> Option<Program> {
    let infos = analyze_sites(program);

    let mut sites: Vec<SubroutineSite<'_>> = Vec::new();
    for block in program.find_all_subroutines(Some(0)) {
        let instructions = &program.instructions()[block.head..=block.tail];
        let mut mutable_mask = vec![false; instructions.len()];
        for relative in 0..instructions.len().saturating_sub(1) {
            mutable_mask[relative] = slot_ok(&infos[block.head + relative]);
        }
        let site = SubroutineSite {
            block,
            instructions,
            mutable_mask,
            head_info: infos[block.head],
        };
        if is_candidate(program, &site) {
            sites.push(site);
        }
    }
    if sites.is_empty() {
        return None;
    }

    let count = max_simultaneous.max(1).min(sites.len());
    let mut chosen: Vec<usize> = (0..sites.len()).collect();
    chosen.shuffle(ctx.rng);
    chosen.truncate(count);
    chosen.sort_unstable();

    let mut b = ProgramBuilder::new();
    b.inherit_contributors(program);
    b.add_contributor(mutator_name);

    let mut mutated_any = false;
    b.adopting(program, |b| {
        let mut next_site = chosen.iter().peekable();
        let mut index = 0;
        while index < program.len() {
            let at_chosen_site = next_site
                .peek()
                .map(|&&s| sites[s].block.head == index)
                .unwrap_or(false);
            if at_chosen_site {
                let site = &sites[*next_site.next().unwrap()];
                if emit(b, site, ctx) {
                    mutated_any = true;
                } else {
                    for instr in site.instructions {
                        b.adopt(instr);
                    }
                }
                index = site.block.tail + 1;
            } else {
                b.adopt(&program[index]);
                index += 1;
            }
        }
    });

    if !mutated_any {
        return None;
    }
    Some(b.finalize())
}

/// Per-instruction mutation.
///
/// `can_mutate` filters single instructions; `mutate_at` consumes a
/// sampled instruction and emits its replacement (returning false to adopt
/// it unchanged). Returns `None` iff no candidate exists or every sampled
/// emission declined.
pub fn instruction_mutation(
    program: &Program,
    ctx: &mut MutationCtx<'_>,
    mutator_name: &'static str,
    max_simultaneous: usize,
    can_mutate: impl Fn(&Instruction, &SiteInfo) -> bool,
    mut mutate_at: impl FnMut(&mut ProgramBuilder, &Instruction, &mut MutationCtx<'_>) -> bool,
) -> Option<Program> {
    let infos = analyze_sites(program);

    let candidates: Vec<usize> = program
        .iter()
        .enumerate()
        .filter(|(index, instr)| can_mutate(instr, &infos[*index]))
        .map(|(index, _)| index)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let count = max_simultaneous.max(1).min(candidates.len());
    let mut chosen: Vec<usize> = candidates
        .choose_multiple(ctx.rng, count)
        .copied()
        .collect();
    chosen.sort_unstable();

    let mut b = ProgramBuilder::new();
    b.inherit_contributors(program);
    b.add_contributor(mutator_name);

    let mut mutated_any = false;
    b.adopting(program, |b| {
        let mut next_site = chosen.iter().peekable();
        for (index, instr) in program.iter().enumerate() {
            let at_chosen_site = next_site.peek().map(|&&s| s == index).unwrap_or(false);
            if at_chosen_site {
                next_site.next();
                if mutate_at(b, instr, ctx) {
                    mutated_any = true;
                } else {
                    b.adopt(instr);
                }
            } else {
                b.adopt(instr);
            }
        }
    });

    if !mutated_any {
        return None;
    }
    Some(b.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use jonm_il::Opcode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ctx_parts() -> (StdRng, Config) {
        (StdRng::seed_from_u64(11), Config::default())
    }

    #[test]
    fn test_no_candidates_returns_none() {
        let (mut rng, config) = ctx_parts();
        let mut ctx = MutationCtx {
            rng: &mut rng,
            config: &config,
        };
        // No subroutines at all.
        let mut b = ProgramBuilder::new();
        b.load_int(1);
        let program = b.finalize();

        let result = subroutine_mutation(
            &program,
            &mut ctx,
            "TestMutator",
            1,
            jon_site_ok,
            |_, _| true,
            |_, _, _| true,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_unchanged_sites_are_adopted() {
        let (mut rng, config) = ctx_parts();
        let mut ctx = MutationCtx {
            rng: &mut rng,
            config: &config,
        };
        let mut b = ProgramBuilder::new();
        b.build_plain_function(0, |b, _| {
            b.load_int(1);
        });
        b.load_int(2);
        let program = b.finalize();

        // The emitter inserts one extra load at the first mutable slot.
        let mutated = subroutine_mutation(
            &program,
            &mut ctx,
            "TestMutator",
            1,
            jon_site_ok,
            |_, site| !site.mutable_slots().is_empty(),
            |b, site, _| {
                for (relative, instr) in site.instructions.iter().enumerate() {
                    b.adopt(instr);
                    if relative == 0 {
                        b.load_int(42);
                    }
                }
                true
            },
        )
        .expect("candidate exists");

        assert_eq!(mutated.len(), program.len() + 1);
        assert!(mutated.has_contributor("TestMutator"));
        assert_ne!(mutated.id(), program.id());
        jonm_il::verify_program(&mutated).expect("mutated program verifies");
    }

    #[test]
    fn test_instruction_sampler_replaces_sampled_site() {
        let (mut rng, config) = ctx_parts();
        let mut ctx = MutationCtx {
            rng: &mut rng,
            config: &config,
        };
        let mut b = ProgramBuilder::new();
        b.load_int(1);
        b.load_int(2);
        let program = b.finalize();

        let mutated = instruction_mutation(
            &program,
            &mut ctx,
            "TestMutator",
            2,
            |instr, _| instr.opcode == Opcode::LoadInt,
            |b, instr, _| {
                // Replace the literal with a pair whose sum replaces it.
                let a = b.load_int(1);
                let c = b.load_int(1);
                let sum = b.binary(a, c, jonm_il::BinaryOperator::Add);
                if let Some(out) = instr.output() {
                    b.remap(out, sum);
                }
                true
            },
        )
        .expect("candidates exist");

        assert_eq!(mutated.len(), 6);
        jonm_il::verify_program(&mutated).expect("mutated program verifies");
    }
}
