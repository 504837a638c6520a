//! IL instructions

use crate::opcode::{BinaryOperator, Comparator, Opcode, UnaryOperator};
use crate::variable::Variable;
use serde::{Deserialize, Serialize};

/// Immediate payload attached to an instruction.
///
/// Most opcodes take no payload; literal loads, element accesses, and named
/// operations carry theirs here rather than as input operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attributes {
    /// No payload
    None,
    /// Integer immediate
    Int(i64),
    /// Float immediate
    Float(f64),
    /// Boolean immediate
    Bool(bool),
    /// String immediate (string literals, code strings)
    Str(String),
    /// Builtin name
    Builtin(String),
    /// Property, method, or variable name
    Name(String),
    /// Integer array payload for `CreateIntArray`
    IntArray(Vec<i64>),
    /// Property names for `CreateObject`, aligned with the inputs
    Properties(Vec<String>),
    /// Call payload
    Call {
        /// Whether the call is guarded (wrapped in an implicit try)
        guarded: bool,
    },
    /// Method call payload
    Method {
        /// Method name
        name: String,
        /// Whether the call is guarded
        guarded: bool,
    },
    /// Binary operation payload
    Binary(BinaryOperator),
    /// Comparison payload
    Compare(Comparator),
    /// Unary operation payload
    Unary(UnaryOperator),
    /// Element access payload for `Get/Set/Configure Element`
    ElementIndex(i64),
    /// Compound element update payload for `UpdateElement`
    Element {
        /// Element index
        index: i64,
        /// Update operator
        op: BinaryOperator,
    },
}

/// A single IL instruction.
///
/// An instruction is a tuple of opcode, ordered input operands, ordered
/// output operands, block-scoped inner outputs (function parameters, loop
/// induction variables, caught exceptions), and an immediate payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The operation performed
    pub opcode: Opcode,
    /// Input operands
    pub inputs: Vec<Variable>,
    /// Output operands, visible in the surrounding scope
    pub outputs: Vec<Variable>,
    /// Outputs visible only inside the block opened by this instruction
    pub inner_outputs: Vec<Variable>,
    /// Immediate payload
    pub attrs: Attributes,
}

impl Instruction {
    /// Create an instruction with no inner outputs.
    pub fn new(
        opcode: Opcode,
        inputs: Vec<Variable>,
        outputs: Vec<Variable>,
        attrs: Attributes,
    ) -> Self {
        Instruction {
            opcode,
            inputs,
            outputs,
            inner_outputs: Vec::new(),
            attrs,
        }
    }

    /// Create an instruction with inner outputs.
    pub fn with_inner_outputs(
        opcode: Opcode,
        inputs: Vec<Variable>,
        outputs: Vec<Variable>,
        inner_outputs: Vec<Variable>,
        attrs: Attributes,
    ) -> Self {
        Instruction {
            opcode,
            inputs,
            outputs,
            inner_outputs,
            attrs,
        }
    }

    /// The single output of this instruction, if it has exactly one.
    pub fn output(&self) -> Option<Variable> {
        if self.outputs.len() == 1 {
            Some(self.outputs[0])
        } else {
            None
        }
    }

    /// All variables defined by this instruction (outputs then inner outputs).
    pub fn all_outputs(&self) -> impl Iterator<Item = Variable> + '_ {
        self.outputs
            .iter()
            .copied()
            .chain(self.inner_outputs.iter().copied())
    }

    /// Whether this instruction opens a block.
    pub fn is_block_start(&self) -> bool {
        self.opcode.is_block_start()
    }

    /// Whether this instruction closes a block.
    pub fn is_block_end(&self) -> bool {
        self.opcode.is_block_end()
    }

    /// Whether this instruction is a call.
    pub fn is_call(&self) -> bool {
        self.opcode.is_call()
    }

    /// Whether this instruction unconditionally transfers control.
    pub fn is_jump(&self) -> bool {
        self.opcode.is_jump()
    }

    /// Whether this instruction is guarded (its failure is swallowed).
    pub fn is_guarded(&self) -> bool {
        match &self.attrs {
            Attributes::Call { guarded } => *guarded,
            Attributes::Method { guarded, .. } => *guarded,
            _ => false,
        }
    }

    /// The name payload of this instruction, if it carries one.
    pub fn name(&self) -> Option<&str> {
        match &self.attrs {
            Attributes::Name(name) => Some(name),
            Attributes::Builtin(name) => Some(name),
            Attributes::Method { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Call arguments (inputs excluding the callee or receiver).
    ///
    /// Empty for non-call instructions.
    pub fn call_arguments(&self) -> &[Variable] {
        if self.is_call() && !self.inputs.is_empty() {
            &self.inputs[1..]
        } else {
            &[]
        }
    }
}
