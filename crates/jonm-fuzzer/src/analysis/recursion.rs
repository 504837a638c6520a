//! Unbounded recursion heuristic
//!
//! Flags programs containing a subroutine that may invoke itself before
//! any return: such programs frequently fail to terminate and would defeat
//! the determinism gate. The heuristic is intentionally over-approximating
//! and is used only as a pre-filter.

use jonm_il::{Opcode, Program, Variable};
use rustc_hash::{FxHashMap, FxHashSet};

/// Whether any subroutine in the program may recurse without bound.
///
/// For every subroutine definition, its body is scanned linearly with
/// nested subroutines skipped. If a self-invocation (by function value, by
/// a name the value is bound to, or by the subroutine's own method, getter,
/// or setter name) appears before any return, the program is flagged.
pub fn may_recurse_unboundedly(program: &Program) -> bool {
    // Names each variable is bound to via named-variable definitions.
    let mut bound_names: FxHashMap<Variable, FxHashSet<&str>> = FxHashMap::default();
    for instr in program {
        if matches!(
            instr.opcode,
            Opcode::DefineNamedVariable | Opcode::StoreNamedVariable
        ) {
            if let (Some(&value), Some(name)) = (instr.inputs.first(), instr.name()) {
                bound_names.entry(value).or_default().insert(name);
            }
        }
    }

    // Defining instruction index for each variable, for callee lookups.
    let mut definitions: FxHashMap<Variable, usize> = FxHashMap::default();
    for (index, instr) in program.iter().enumerate() {
        for output in instr.all_outputs() {
            definitions.insert(output, index);
        }
    }

    for block in program.find_all_subroutines(None) {
        let head = &program[block.head];
        let self_value = head.output();
        let self_names: FxHashSet<&str> = self_value
            .and_then(|v| bound_names.get(&v))
            .cloned()
            .unwrap_or_default();
        let member_name = head.name();

        let mut index = block.head + 1;
        while index < block.tail {
            let instr = &program[index];
            if instr.opcode.is_subroutine_start() {
                // Nested subroutines run on their own activation.
                match program.find_block_end(index) {
                    Ok(end) => {
                        index = end + 1;
                        continue;
                    }
                    Err(_) => break,
                }
            }
            if instr.opcode == Opcode::Return {
                break;
            }
            if is_self_reference(
                program,
                instr,
                self_value,
                &self_names,
                member_name,
                &definitions,
            ) {
                return true;
            }
            index += 1;
        }
    }
    false
}

fn is_self_reference(
    program: &Program,
    instr: &jonm_il::Instruction,
    self_value: Option<Variable>,
    self_names: &FxHashSet<&str>,
    member_name: Option<&str>,
    definitions: &FxHashMap<Variable, usize>,
) -> bool {
    if instr.is_call() {
        if let Some(&callee) = instr.inputs.first() {
            if self_value == Some(callee) {
                return true;
            }
            // Callee loaded through a name the subroutine value is bound to.
            if let Some(&def_index) = definitions.get(&callee) {
                let def = &program[def_index];
                if def.opcode == Opcode::LoadNamedVariable {
                    if let Some(name) = def.name() {
                        if self_names.contains(name) {
                            return true;
                        }
                    }
                }
            }
        }
    }
    // Method, getter, and setter bodies re-entering through their own name.
    if let Some(own) = member_name {
        let accesses_own_member = match instr.opcode {
            Opcode::CallMethod | Opcode::GetProperty | Opcode::SetProperty => {
                instr.name() == Some(own)
            }
            _ => false,
        };
        if accesses_own_member {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use jonm_il::ProgramBuilder;

    #[test]
    fn test_direct_recursion_flagged() {
        // function f() { f() }
        let mut b = ProgramBuilder::new();
        b.build_plain_function(0, |b, _| {
            let f_inner = b.visible_variables()[0];
            b.call_function(f_inner, &[]);
        });
        let program = b.finalize();
        assert!(may_recurse_unboundedly(&program));
    }

    #[test]
    fn test_return_before_call_not_flagged() {
        // function f() { return; f() } — the call is unreachable.
        let mut b = ProgramBuilder::new();
        b.build_plain_function(0, |b, _| {
            let f_inner = b.visible_variables()[0];
            b.do_return(None);
            b.call_function(f_inner, &[]);
        });
        let program = b.finalize();
        assert!(!may_recurse_unboundedly(&program));
    }

    #[test]
    fn test_named_recursion_flagged() {
        // var g = f; function body calls g by name.
        let mut b = ProgramBuilder::new();
        let f = b.build_plain_function(0, |b, _| {
            let g = b.load_named_variable("g");
            b.call_function(g, &[]);
        });
        b.define_named_variable("g", f);
        let program = b.finalize();
        assert!(may_recurse_unboundedly(&program));
    }

    #[test]
    fn test_nested_subroutine_is_skipped() {
        // function f() { let h = () => { f() } } — the inner call runs on
        // h's activation, not f's.
        let mut b = ProgramBuilder::new();
        b.build_plain_function(0, |b, _| {
            let f_inner = b.visible_variables()[0];
            b.build_arrow_function(0, |b, _| {
                b.call_function(f_inner, &[]);
            });
        });
        let program = b.finalize();
        assert!(!may_recurse_unboundedly(&program));
    }

    #[test]
    fn test_plain_call_not_flagged() {
        let mut b = ProgramBuilder::new();
        let helper = b.build_plain_function(0, |b, _| {
            b.do_return(None);
        });
        b.build_plain_function(0, |b, _| {
            b.call_function(helper, &[]);
        });
        let program = b.finalize();
        assert!(!may_recurse_unboundedly(&program));
    }
}
