//! Argument shape synthesis
//!
//! The pre-call mutators re-call functions with arguments whose types
//! either match an observed call (so the JIT specializes on the same
//! shape) or deliberately diverge from it (to poison the specialization).
//! Types are inferred from the defining instruction of each argument;
//! anything without literal provenance is opaque at IL level.

use jonm_il::{Opcode, Program, ProgramBuilder, Variable};
use rand::rngs::StdRng;
use rand::Rng;

/// Coarse type of a call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    /// Integer literal provenance
    Int,
    /// Float literal provenance
    Float,
    /// Boolean literal provenance
    Bool,
    /// String literal provenance
    Str,
    /// Anything else
    Opaque,
}

/// Infer the type of `v` from its defining instruction.
pub fn infer_type(program: &Program, v: Variable) -> TypeHint {
    for instr in program {
        if instr.output() == Some(v) {
            return match instr.opcode {
                Opcode::LoadInt => TypeHint::Int,
                Opcode::LoadFloat => TypeHint::Float,
                Opcode::LoadBool => TypeHint::Bool,
                Opcode::LoadString => TypeHint::Str,
                _ => TypeHint::Opaque,
            };
        }
    }
    TypeHint::Opaque
}

/// Infer the argument types of a call instruction.
pub fn call_argument_types(program: &Program, call_index: usize) -> Vec<TypeHint> {
    program[call_index]
        .call_arguments()
        .iter()
        .map(|&arg| infer_type(program, arg))
        .collect()
}

/// Emit a fresh literal of the given type.
pub fn matching_literal(b: &mut ProgramBuilder, hint: TypeHint, rng: &mut StdRng) -> Variable {
    match hint {
        TypeHint::Int | TypeHint::Opaque => b.load_int(rng.gen_range(0..0x100)),
        TypeHint::Float => b.load_float(rng.gen_range(0..1000) as f64 / 10.0),
        TypeHint::Bool => b.load_bool(rng.gen_bool(0.5)),
        TypeHint::Str => b.load_string("warm"),
    }
}

/// Emit a fresh literal whose type deliberately differs from `hint`.
pub fn divergent_literal(b: &mut ProgramBuilder, hint: TypeHint, rng: &mut StdRng) -> Variable {
    match hint {
        TypeHint::Int => b.load_string("deopt"),
        TypeHint::Float => b.load_bool(rng.gen_bool(0.5)),
        TypeHint::Bool => b.load_string("deopt"),
        TypeHint::Str => b.load_int(rng.gen_range(0..0x100)),
        TypeHint::Opaque => b.load_string("deopt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_infer_literal_types() {
        let mut b = ProgramBuilder::new();
        let i = b.load_int(1);
        let f = b.load_float(1.5);
        let s = b.load_string("x");
        let arr = b.create_int_array(&[1]);
        let program = b.finalize();

        assert_eq!(infer_type(&program, i), TypeHint::Int);
        assert_eq!(infer_type(&program, f), TypeHint::Float);
        assert_eq!(infer_type(&program, s), TypeHint::Str);
        assert_eq!(infer_type(&program, arr), TypeHint::Opaque);
    }

    #[test]
    fn test_divergent_literal_changes_type() {
        let mut rng = StdRng::seed_from_u64(3);
        for hint in [TypeHint::Int, TypeHint::Float, TypeHint::Bool, TypeHint::Str] {
            let mut b = ProgramBuilder::new();
            let v = divergent_literal(&mut b, hint, &mut rng);
            let program = b.finalize();
            assert_ne!(infer_type(&program, v), hint);
        }
    }
}
