//! JoNM intermediate language
//!
//! This crate provides the IL that the mutation engine operates on:
//! a closed opcode universe with family predicates, SSA-style variables,
//! programs with exact block discovery and contributor provenance, a
//! scope-aware program builder with cross-program adoption, and a
//! structural verifier.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builder;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod variable;
pub mod verify;

pub use builder::ProgramBuilder;
pub use instruction::{Attributes, Instruction};
pub use opcode::{BinaryOperator, Comparator, Family, Opcode, SubroutineKind, UnaryOperator};
pub use program::{Block, BlockGroup, Program, ProgramError};
pub use variable::Variable;
pub use verify::{verify_program, VerifyError};
