//! Dead code tracking
//!
//! Tracks whether the traversal cursor has passed an unconditional jump or
//! return within the current block. Used to veto insertion points: code
//! inserted there would never execute.

use jonm_il::Instruction;

/// Tracks per-block dead-code state along a linear instruction sweep.
pub struct DeadCodeAnalyzer {
    /// One flag per open block; the top is the current position.
    stack: Vec<bool>,
}

impl DeadCodeAnalyzer {
    /// Create an analyzer positioned before the first instruction.
    pub fn new() -> Self {
        DeadCodeAnalyzer { stack: vec![false] }
    }

    /// Whether the current position is unreachable.
    pub fn is_dead_code(&self) -> bool {
        self.stack.last().copied().unwrap_or(false)
    }

    /// Advance past one instruction.
    pub fn analyze(&mut self, instr: &Instruction) {
        if instr.is_block_end() && self.stack.len() > 1 {
            self.stack.pop();
        }
        if instr.is_block_start() {
            // A block opened in dead code is itself dead.
            let inherited = self.is_dead_code();
            self.stack.push(inherited);
        } else if instr.is_jump() {
            if let Some(top) = self.stack.last_mut() {
                *top = true;
            }
        }
    }
}

impl Default for DeadCodeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
