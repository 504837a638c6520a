//! Program context tracking
//!
//! Context is a bitset over the syntactic circumstances of a program point
//! (inside a loop, inside a subroutine, inside a code string, ...). The
//! analyzer maintains a stack driven by block open/close and exposes two
//! flavors: the *current* context, which is restored on block exit, and the
//! *aggregate* context, which accumulates the bits of every enclosing block
//! and never un-sets a bit within a block.

use jonm_il::{Instruction, Opcode, SubroutineKind};
use std::ops::BitOr;

/// A bitset of context flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context(u32);

impl Context {
    /// No context at all.
    pub const EMPTY: Context = Context(0);
    /// Executable script code.
    pub const JAVASCRIPT: Context = Context(1);
    /// Inside a loop body.
    pub const LOOP: Context = Context(1 << 1);
    /// Inside a subroutine body.
    pub const SUBROUTINE: Context = Context(1 << 2);
    /// Inside an object literal.
    pub const OBJECT_LITERAL: Context = Context(1 << 3);
    /// Inside a code string.
    pub const CODE_STRING: Context = Context(1 << 4);
    /// Inside an async function.
    pub const ASYNC_FUNCTION: Context = Context(1 << 5);
    /// Inside a generator function.
    pub const GENERATOR_FUNCTION: Context = Context(1 << 6);
    /// Inside a class definition.
    pub const CLASS_DEFINITION: Context = Context(1 << 7);
    /// Inside a method body.
    pub const METHOD: Context = Context(1 << 8);

    /// Whether all bits of `other` are set.
    pub fn contains(self, other: Context) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    pub fn contains_any(self, other: Context) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Context {
    type Output = Context;

    fn bitor(self, rhs: Context) -> Context {
        Context(self.0 | rhs.0)
    }
}

/// Tracks current and aggregate context along a linear instruction sweep.
pub struct ContextAnalyzer {
    /// Stack of (current, aggregate) pairs, one per open block plus the
    /// top-level entry.
    stack: Vec<(Context, Context)>,
}

impl ContextAnalyzer {
    /// Create an analyzer positioned before the first instruction.
    pub fn new() -> Self {
        ContextAnalyzer {
            stack: vec![(Context::JAVASCRIPT, Context::JAVASCRIPT)],
        }
    }

    /// The context at the current position.
    pub fn context(&self) -> Context {
        self.stack.last().map(|&(c, _)| c).unwrap_or(Context::EMPTY)
    }

    /// The aggregate context at the current position: the union of every
    /// enclosing block's context.
    pub fn aggregate_context(&self) -> Context {
        self.stack.last().map(|&(_, a)| a).unwrap_or(Context::EMPTY)
    }

    /// Advance past one instruction.
    pub fn analyze(&mut self, instr: &Instruction) {
        if instr.is_block_end() && self.stack.len() > 1 {
            self.stack.pop();
        }
        if instr.is_block_start() {
            let (parent_current, parent_aggregate) =
                *self.stack.last().unwrap_or(&(Context::EMPTY, Context::EMPTY));
            let current = block_context(instr.opcode, parent_current);
            self.stack.push((current, parent_aggregate | current));
        }
    }
}

impl Default for ContextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// The current context inside the block opened by `opcode`, given the
/// current context outside it.
///
/// Subroutine bodies reset the context (code in a function defined inside
/// a loop does not itself run in that loop); code strings propagate into
/// everything nested below them.
fn block_context(opcode: Opcode, parent: Context) -> Context {
    if let Some(kind) = opcode.subroutine_kind() {
        let mut ctx = Context::JAVASCRIPT | Context::SUBROUTINE;
        match kind {
            SubroutineKind::AsyncFunction => ctx = ctx | Context::ASYNC_FUNCTION,
            SubroutineKind::GeneratorFunction => ctx = ctx | Context::GENERATOR_FUNCTION,
            SubroutineKind::ObjectLiteralMethod
            | SubroutineKind::ObjectLiteralComputedMethod
            | SubroutineKind::ObjectLiteralGetter
            | SubroutineKind::ObjectLiteralSetter
            | SubroutineKind::ClassMethod
            | SubroutineKind::ClassGetter
            | SubroutineKind::ClassSetter => ctx = ctx | Context::METHOD,
            _ => {}
        }
        if parent.contains(Context::CODE_STRING) {
            ctx = ctx | Context::CODE_STRING;
        }
        return ctx;
    }
    match opcode {
        Opcode::BeginRepeatLoop | Opcode::BeginWhileLoop => parent | Context::LOOP,
        // Literal and class bodies hold members, not statements; the
        // javascript bit comes back inside their method bodies.
        Opcode::BeginObjectLiteral => propagate_strings(parent, Context::OBJECT_LITERAL),
        Opcode::BeginClassDefinition => propagate_strings(parent, Context::CLASS_DEFINITION),
        Opcode::BeginCodeString => parent | Context::CODE_STRING,
        // if/else, try/catch/finally arms propagate their surroundings
        _ => parent,
    }
}

fn propagate_strings(parent: Context, ctx: Context) -> Context {
    if parent.contains(Context::CODE_STRING) {
        ctx | Context::CODE_STRING
    } else {
        ctx
    }
}
