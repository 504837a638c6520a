//! IL programs
//!
//! A program is an immutable ordered sequence of instructions plus
//! provenance metadata: a unique identity and the set of mutator names that
//! have contributed to it. Block discovery is exact and structural.

use crate::instruction::Instruction;
use crate::opcode::Family;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Errors from structural queries on a program.
#[derive(Debug, Error)]
pub enum ProgramError {
    /// A block start has no matching end
    #[error("Block starting at {head} has no matching end")]
    UnmatchedBlockStart {
        /// Index of the dangling block start
        head: usize,
    },
    /// The queried instruction does not start a block
    #[error("Instruction at {index} does not start a block")]
    NotABlockStart {
        /// Index of the offending instruction
        index: usize,
    },
}

/// A single block: the indices of its head and tail instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Index of the block start instruction
    pub head: usize,
    /// Index of the block end instruction
    pub tail: usize,
}

impl Block {
    /// Number of instructions in the block, heads included.
    pub fn len(&self) -> usize {
        self.tail - self.head + 1
    }

    /// Whether the block has an empty body.
    pub fn is_empty(&self) -> bool {
        self.tail == self.head + 1
    }
}

/// A block group: a head, intermediate arm boundaries, and a tail.
///
/// For `try { } catch { } finally { }` the interiors are the `BeginCatch`
/// and `BeginFinally` instructions; for `if/else` the `BeginElse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGroup {
    /// Index of the group's opening instruction
    pub head: usize,
    /// Indices of intermediate arm boundaries, in order
    pub interiors: Vec<usize>,
    /// Index of the group's closing instruction
    pub tail: usize,
}

impl BlockGroup {
    /// All block-start indices of the group (head plus interiors).
    pub fn block_starts(&self) -> Vec<usize> {
        let mut starts = Vec::with_capacity(1 + self.interiors.len());
        starts.push(self.head);
        starts.extend_from_slice(&self.interiors);
        starts
    }
}

/// An immutable IL program.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    id: u64,
    instructions: Vec<Instruction>,
    contributors: FxHashSet<String>,
}

impl Program {
    /// Create a program from an instruction sequence.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Program {
            id: NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            instructions,
            contributors: FxHashSet::default(),
        }
    }

    /// Create a program carrying an existing contributor set.
    pub fn with_contributors(
        instructions: Vec<Instruction>,
        contributors: FxHashSet<String>,
    ) -> Self {
        Program {
            id: NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            instructions,
            contributors,
        }
    }

    /// The program's unique identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction sequence.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Iterate over the instructions.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// The set of mutator names that have contributed to this program.
    pub fn contributors(&self) -> &FxHashSet<String> {
        &self.contributors
    }

    /// Whether the given mutator has contributed to this program.
    pub fn has_contributor(&self, name: &str) -> bool {
        self.contributors.contains(name)
    }

    /// Record a contributor.
    pub fn add_contributor(&mut self, name: &str) {
        self.contributors.insert(name.to_string());
    }

    /// Find the index of the instruction that closes the block opened at
    /// `head`.
    ///
    /// Intermediate arms (`BeginElse`, `BeginCatch`, `BeginFinally`)
    /// continue the group; the returned index is the group's final end.
    pub fn find_block_end(&self, head: usize) -> Result<usize, ProgramError> {
        if !self.instructions[head].is_block_start() {
            return Err(ProgramError::NotABlockStart { index: head });
        }

        let mut depth: i64 = 1;
        for (offset, instr) in self.instructions[head + 1..].iter().enumerate() {
            if instr.is_block_end() {
                depth -= 1;
            }
            if instr.is_block_start() {
                depth += 1;
            }
            if depth <= 0 {
                return Ok(head + 1 + offset);
            }
        }
        Err(ProgramError::UnmatchedBlockStart { head })
    }

    /// Find all block groups in the program, ordered by head index.
    ///
    /// With `at_depth`, only groups at the given nesting depth are returned
    /// (0 = top level).
    pub fn find_all_block_groups(&self, at_depth: Option<usize>) -> Vec<BlockGroup> {
        let mut stack: Vec<BlockGroup> = Vec::new();
        let mut groups = Vec::new();

        for (index, instr) in self.instructions.iter().enumerate() {
            let start = instr.is_block_start();
            let end = instr.is_block_end();
            if start && end {
                // Intermediate arm of the innermost open group.
                if let Some(group) = stack.last_mut() {
                    group.interiors.push(index);
                }
            } else if start {
                stack.push(BlockGroup {
                    head: index,
                    interiors: Vec::new(),
                    tail: index,
                });
            } else if end {
                if let Some(mut group) = stack.pop() {
                    group.tail = index;
                    if at_depth.is_none() || at_depth == Some(stack.len()) {
                        groups.push(group);
                    }
                }
            }
        }

        groups.sort_by_key(|g| g.head);
        groups
    }

    /// Find all subroutine blocks, ordered by head index.
    ///
    /// With `at_depth`, only subroutines at the given *subroutine* nesting
    /// depth are returned (0 = outmost; a function inside a loop is still
    /// outmost).
    pub fn find_all_subroutines(&self, at_depth: Option<usize>) -> Vec<Block> {
        let mut stack: Vec<usize> = Vec::new();
        let mut subroutines = Vec::new();

        for (index, instr) in self.instructions.iter().enumerate() {
            if instr.opcode.is_subroutine_start() {
                stack.push(index);
            } else if instr.is_block_end()
                && !instr.is_block_start()
                && instr.opcode.is_member_of(Family::AnySubroutine)
            {
                if let Some(head) = stack.pop() {
                    if at_depth.is_none() || at_depth == Some(stack.len()) {
                        subroutines.push(Block { head, tail: index });
                    }
                }
            }
        }

        subroutines.sort_by_key(|b| b.head);
        subroutines
    }
}

impl Index<usize> for Program {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
