//! Def-use analysis
//!
//! Maps each variable-defining instruction to the instructions consuming
//! its outputs, and tracks which variables are ever passed as *arguments*
//! to a call. A subroutine value passed higher-order has an
//! engine-dependent invocation count, which matters to checksum keying.

use jonm_il::{Program, Variable};
use rustc_hash::{FxHashMap, FxHashSet};

/// Def-use information for one program.
pub struct DefUseAnalyzer {
    definitions: FxHashMap<Variable, usize>,
    uses: FxHashMap<usize, Vec<usize>>,
    call_arguments: FxHashSet<Variable>,
}

impl DefUseAnalyzer {
    /// Build the analysis for a program.
    pub fn from_program(program: &Program) -> Self {
        let mut definitions: FxHashMap<Variable, usize> = FxHashMap::default();
        let mut uses: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        let mut call_arguments: FxHashSet<Variable> = FxHashSet::default();

        for (index, instr) in program.iter().enumerate() {
            for &input in &instr.inputs {
                if let Some(&def_index) = definitions.get(&input) {
                    uses.entry(def_index).or_default().push(index);
                }
            }
            if instr.is_call() {
                for &arg in instr.call_arguments() {
                    call_arguments.insert(arg);
                }
            }
            for output in instr.all_outputs() {
                definitions.insert(output, index);
            }
        }

        DefUseAnalyzer {
            definitions,
            uses,
            call_arguments,
        }
    }

    /// Index of the instruction defining `v`, if any.
    pub fn definition_of(&self, v: Variable) -> Option<usize> {
        self.definitions.get(&v).copied()
    }

    /// Indices of the instructions consuming outputs of the instruction at
    /// `def_index`.
    pub fn uses_of(&self, def_index: usize) -> &[usize] {
        self.uses.get(&def_index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `v` is ever passed as an argument to a call (higher-order
    /// usage).
    pub fn is_passed_to_call(&self, v: Variable) -> bool {
        self.call_arguments.contains(&v)
    }
}
