//! Structural program verification

use crate::instruction::Instruction;
use crate::program::Program;
use crate::variable::Variable;
use rustc_hash::FxHashSet;

/// Structural verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// A block end with no open block
    #[error("Block end at {index} has no open block")]
    UnbalancedBlockEnd {
        /// Index of the offending instruction
        index: usize,
    },

    /// A block left open at the end of the program
    #[error("Block starting at {head} is never closed")]
    UnclosedBlock {
        /// Index of the dangling block start
        head: usize,
    },

    /// An input variable that was never defined or is out of scope
    #[error("Instruction at {index} uses {variable} which is not in scope")]
    UseOfUndefined {
        /// Index of the offending instruction
        index: usize,
        /// The out-of-scope variable
        variable: Variable,
    },

    /// A variable defined twice
    #[error("Instruction at {index} redefines {variable}")]
    Redefinition {
        /// Index of the offending instruction
        index: usize,
        /// The redefined variable
        variable: Variable,
    },

    /// Inner outputs on an instruction that opens no block
    #[error("Instruction at {index} has inner outputs but opens no block")]
    StrayInnerOutputs {
        /// Index of the offending instruction
        index: usize,
    },
}

/// Verify a program's block structure and variable discipline.
///
/// Checks that blocks nest strictly, every input is defined and in scope at
/// its use, no variable is defined twice, and inner outputs appear only on
/// block starts.
pub fn verify_program(program: &Program) -> Result<(), VerifyError> {
    let mut scopes: Vec<Vec<Variable>> = vec![Vec::new()];
    let mut block_heads: Vec<usize> = Vec::new();
    let mut defined: FxHashSet<Variable> = FxHashSet::default();

    for (index, instr) in program.iter().enumerate() {
        if !instr.inner_outputs.is_empty() && !instr.is_block_start() {
            return Err(VerifyError::StrayInnerOutputs { index });
        }

        for &input in &instr.inputs {
            if !in_scope(&scopes, input) {
                return Err(VerifyError::UseOfUndefined {
                    index,
                    variable: input,
                });
            }
        }

        if instr.is_block_end() {
            if scopes.len() < 2 {
                return Err(VerifyError::UnbalancedBlockEnd { index });
            }
            scopes.pop();
            block_heads.pop();
        }

        for &output in &instr.outputs {
            define(&mut scopes, &mut defined, output)
                .map_err(|variable| VerifyError::Redefinition { index, variable })?;
        }

        if instr.is_block_start() {
            scopes.push(Vec::new());
            block_heads.push(index);
            for &inner in &instr.inner_outputs {
                define(&mut scopes, &mut defined, inner)
                    .map_err(|variable| VerifyError::Redefinition { index, variable })?;
            }
        }
    }

    if let Some(&head) = block_heads.last() {
        return Err(VerifyError::UnclosedBlock { head });
    }
    Ok(())
}

fn in_scope(scopes: &[Vec<Variable>], v: Variable) -> bool {
    scopes.iter().any(|scope| scope.contains(&v))
}

fn define(
    scopes: &mut [Vec<Variable>],
    defined: &mut FxHashSet<Variable>,
    v: Variable,
) -> Result<(), Variable> {
    if !defined.insert(v) {
        return Err(v);
    }
    if let Some(scope) = scopes.last_mut() {
        scope.push(v);
    }
    Ok(())
}
