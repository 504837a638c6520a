//! IL opcodes
//!
//! This module defines the closed instruction universe of the mutation IL.
//! Opcodes carry no operands themselves; operands and immediate payloads
//! live on [`Instruction`](crate::Instruction).

use serde::{Deserialize, Serialize};

/// IL opcode enumeration
///
/// Opcodes are organized into categories:
/// - Literals and builtins
/// - Collections (arrays, objects, elements, properties)
/// - Expressions (binary, compare, unary, reassignment)
/// - Named variables
/// - Calls
/// - Control transfer (return, break, continue, throw)
/// - Block structure (functions, methods, classes, loops, try/catch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// No operation
    Nop,

    // ===== Literals & Builtins =====
    /// Load an integer literal
    LoadInt,
    /// Load a float literal
    LoadFloat,
    /// Load a boolean literal
    LoadBool,
    /// Load a string literal
    LoadString,
    /// Load the null value
    LoadNull,
    /// Load the undefined value
    LoadUndefined,
    /// Load a named builtin from the global scope
    LoadBuiltin,

    // ===== Collections =====
    /// Create an array from the input values
    CreateArray,
    /// Create an array from an integer literal payload
    CreateIntArray,
    /// Create an object literal with the given property names
    CreateObject,
    /// Load `array[index]` (index is an immediate)
    GetElement,
    /// Store `array[index] = value`
    SetElement,
    /// Compound-assign `array[index] op= value`
    UpdateElement,
    /// Load `object.name`
    GetProperty,
    /// Store `object.name = value`
    SetProperty,
    /// Define a property with explicit descriptor flags
    ConfigureProperty,
    /// Define an element with explicit descriptor flags
    ConfigureElement,
    /// Load `object[key]` where key is a runtime value
    GetComputedProperty,
    /// Store `object[key] = value` where key is a runtime value
    SetComputedProperty,

    // ===== Expressions =====
    /// Binary arithmetic/bitwise/logic operation
    BinaryOp,
    /// Comparison operation
    Compare,
    /// Unary operation
    UnaryOp,
    /// Reassign an existing variable: `target = value`
    Reassign,

    // ===== Named Variables =====
    /// Load a named (non-SSA) variable
    LoadNamedVariable,
    /// Store to a named variable
    StoreNamedVariable,
    /// Define a named variable bound to the input value
    DefineNamedVariable,

    // ===== Calls =====
    /// Call a function value: inputs are `[callee, args...]`
    CallFunction,
    /// Call a method: inputs are `[receiver, args...]`
    CallMethod,
    /// Construct: inputs are `[constructor, args...]`
    Construct,

    // ===== Control Transfer =====
    /// Return from the enclosing subroutine
    Return,
    /// Break out of the enclosing loop
    LoopBreak,
    /// Continue the enclosing loop
    LoopContinue,
    /// Throw the input value
    ThrowException,
    /// Await the input value
    Await,
    /// Evaluate a code string
    Eval,

    // ===== Functions =====
    /// Begin a plain function definition
    BeginPlainFunction,
    /// End a plain function definition
    EndPlainFunction,
    /// Begin an arrow function definition
    BeginArrowFunction,
    /// End an arrow function definition
    EndArrowFunction,
    /// Begin a generator function definition
    BeginGeneratorFunction,
    /// End a generator function definition
    EndGeneratorFunction,
    /// Begin an async function definition
    BeginAsyncFunction,
    /// End an async function definition
    EndAsyncFunction,
    /// Begin a standalone constructor definition
    BeginConstructor,
    /// End a standalone constructor definition
    EndConstructor,

    // ===== Object Literals =====
    /// Begin an object literal
    BeginObjectLiteral,
    /// End an object literal; outputs the constructed object
    EndObjectLiteral,
    /// Begin an object literal method
    BeginObjectLiteralMethod,
    /// End an object literal method
    EndObjectLiteralMethod,
    /// Begin an object literal method with a computed name
    BeginObjectLiteralComputedMethod,
    /// End an object literal method with a computed name
    EndObjectLiteralComputedMethod,
    /// Begin an object literal getter
    BeginObjectLiteralGetter,
    /// End an object literal getter
    EndObjectLiteralGetter,
    /// Begin an object literal setter
    BeginObjectLiteralSetter,
    /// End an object literal setter
    EndObjectLiteralSetter,

    // ===== Classes =====
    /// Begin a class definition
    BeginClassDefinition,
    /// End a class definition
    EndClassDefinition,
    /// Begin a class constructor
    BeginClassConstructor,
    /// End a class constructor
    EndClassConstructor,
    /// Begin a class method
    BeginClassMethod,
    /// End a class method
    EndClassMethod,
    /// Begin a class getter
    BeginClassGetter,
    /// End a class getter
    EndClassGetter,
    /// Begin a class setter
    BeginClassSetter,
    /// End a class setter
    EndClassSetter,
    /// Begin a class static initializer block
    BeginClassStaticInitializer,
    /// End a class static initializer block
    EndClassStaticInitializer,

    // ===== Structured Control Flow =====
    /// Begin an if body; input is the condition
    BeginIf,
    /// Begin the else arm of an if
    BeginElse,
    /// End an if/else group
    EndIf,
    /// Begin a counted loop; trip count is an immediate
    BeginRepeatLoop,
    /// End a counted loop
    EndRepeatLoop,
    /// Begin a while loop; input is the condition
    BeginWhileLoop,
    /// End a while loop
    EndWhileLoop,
    /// Begin a try body
    BeginTry,
    /// Begin a catch arm; the caught value is an inner output
    BeginCatch,
    /// Begin a finally arm
    BeginFinally,
    /// End a try/catch/finally group
    EndTryCatchFinally,
    /// Begin a code string (source text built at runtime)
    BeginCodeString,
    /// End a code string; outputs the string value
    EndCodeString,
}

/// Opcode family, used for membership queries that span several opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Any subroutine definition (functions, methods, accessors, initializers)
    AnySubroutine,
    /// Plain function definitions
    PlainFunction,
    /// Arrow function definitions
    ArrowFunction,
    /// Generator function definitions
    GeneratorFunction,
    /// Async function definitions
    AsyncFunction,
    /// Standalone constructor definitions
    Constructor,
    /// Object literal blocks
    ObjectLiteral,
    /// Object literal methods (named or computed)
    ObjectLiteralMethod,
    /// Object literal getters
    ObjectLiteralGetter,
    /// Object literal setters
    ObjectLiteralSetter,
    /// Class definition blocks
    ClassDefinition,
    /// Class constructors
    ClassConstructor,
    /// Class methods
    ClassMethod,
    /// Class getters
    ClassGetter,
    /// Class setters
    ClassSetter,
    /// Class static initializer blocks
    ClassStaticInitializer,
    /// Loop blocks
    Loop,
    /// Try/catch/finally blocks
    TryCatch,
    /// Code evaluation
    Eval,
    /// Await
    Await,
    /// Builtin loads
    LoadBuiltin,
    /// Named variable loads
    LoadNamedVariable,
    /// Named variable stores
    StoreNamedVariable,
    /// Named variable definitions
    DefineNamedVariable,
    /// Element configuration
    ConfigureElement,
    /// Property configuration
    ConfigureProperty,
}

/// Kind of subroutine opened by a block-start opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubroutineKind {
    /// `function f(...) {}`
    PlainFunction,
    /// `(...) => {}`
    ArrowFunction,
    /// `function* f(...) {}`
    GeneratorFunction,
    /// `async function f(...) {}`
    AsyncFunction,
    /// Standalone constructor
    Constructor,
    /// Object literal method with a static name
    ObjectLiteralMethod,
    /// Object literal method with a computed name
    ObjectLiteralComputedMethod,
    /// Object literal getter
    ObjectLiteralGetter,
    /// Object literal setter
    ObjectLiteralSetter,
    /// Class constructor
    ClassConstructor,
    /// Class method
    ClassMethod,
    /// Class getter
    ClassGetter,
    /// Class setter
    ClassSetter,
    /// Class static initializer block
    ClassStaticInitializer,
}

impl Opcode {
    /// Whether this opcode opens a block.
    ///
    /// `BeginElse`, `BeginCatch`, and `BeginFinally` both close the previous
    /// arm and open a new one, so they are block starts *and* block ends.
    pub fn is_block_start(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            BeginPlainFunction
                | BeginArrowFunction
                | BeginGeneratorFunction
                | BeginAsyncFunction
                | BeginConstructor
                | BeginObjectLiteral
                | BeginObjectLiteralMethod
                | BeginObjectLiteralComputedMethod
                | BeginObjectLiteralGetter
                | BeginObjectLiteralSetter
                | BeginClassDefinition
                | BeginClassConstructor
                | BeginClassMethod
                | BeginClassGetter
                | BeginClassSetter
                | BeginClassStaticInitializer
                | BeginIf
                | BeginElse
                | BeginRepeatLoop
                | BeginWhileLoop
                | BeginTry
                | BeginCatch
                | BeginFinally
                | BeginCodeString
        )
    }

    /// Whether this opcode closes a block.
    pub fn is_block_end(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            EndPlainFunction
                | EndArrowFunction
                | EndGeneratorFunction
                | EndAsyncFunction
                | EndConstructor
                | EndObjectLiteral
                | EndObjectLiteralMethod
                | EndObjectLiteralComputedMethod
                | EndObjectLiteralGetter
                | EndObjectLiteralSetter
                | EndClassDefinition
                | EndClassConstructor
                | EndClassMethod
                | EndClassGetter
                | EndClassSetter
                | EndClassStaticInitializer
                | EndIf
                | EndRepeatLoop
                | EndWhileLoop
                | EndTryCatchFinally
                | EndCodeString
                | BeginElse
                | BeginCatch
                | BeginFinally
        )
    }

    /// Whether this opcode participates in block structure at all.
    pub fn is_block(self) -> bool {
        self.is_block_start() || self.is_block_end()
    }

    /// Whether this opcode is a call.
    pub fn is_call(self) -> bool {
        matches!(
            self,
            Opcode::CallFunction | Opcode::CallMethod | Opcode::Construct
        )
    }

    /// Whether this opcode unconditionally transfers control within a block.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Return | Opcode::LoopBreak | Opcode::LoopContinue | Opcode::ThrowException
        )
    }

    /// Whether this opcode is a no-op.
    pub fn is_nop(self) -> bool {
        self == Opcode::Nop
    }

    /// The kind of subroutine opened by this opcode, if it opens one.
    pub fn subroutine_kind(self) -> Option<SubroutineKind> {
        use Opcode::*;
        match self {
            BeginPlainFunction => Some(SubroutineKind::PlainFunction),
            BeginArrowFunction => Some(SubroutineKind::ArrowFunction),
            BeginGeneratorFunction => Some(SubroutineKind::GeneratorFunction),
            BeginAsyncFunction => Some(SubroutineKind::AsyncFunction),
            BeginConstructor => Some(SubroutineKind::Constructor),
            BeginObjectLiteralMethod => Some(SubroutineKind::ObjectLiteralMethod),
            BeginObjectLiteralComputedMethod => Some(SubroutineKind::ObjectLiteralComputedMethod),
            BeginObjectLiteralGetter => Some(SubroutineKind::ObjectLiteralGetter),
            BeginObjectLiteralSetter => Some(SubroutineKind::ObjectLiteralSetter),
            BeginClassConstructor => Some(SubroutineKind::ClassConstructor),
            BeginClassMethod => Some(SubroutineKind::ClassMethod),
            BeginClassGetter => Some(SubroutineKind::ClassGetter),
            BeginClassSetter => Some(SubroutineKind::ClassSetter),
            BeginClassStaticInitializer => Some(SubroutineKind::ClassStaticInitializer),
            _ => None,
        }
    }

    /// Whether this opcode opens a subroutine body.
    pub fn is_subroutine_start(self) -> bool {
        self.subroutine_kind().is_some()
    }

    /// Family membership query.
    pub fn is_member_of(self, family: Family) -> bool {
        use Opcode::*;
        match family {
            Family::AnySubroutine => {
                self.subroutine_kind().is_some()
                    || matches!(
                        self,
                        EndPlainFunction
                            | EndArrowFunction
                            | EndGeneratorFunction
                            | EndAsyncFunction
                            | EndConstructor
                            | EndObjectLiteralMethod
                            | EndObjectLiteralComputedMethod
                            | EndObjectLiteralGetter
                            | EndObjectLiteralSetter
                            | EndClassConstructor
                            | EndClassMethod
                            | EndClassGetter
                            | EndClassSetter
                            | EndClassStaticInitializer
                    )
            }
            Family::PlainFunction => matches!(self, BeginPlainFunction | EndPlainFunction),
            Family::ArrowFunction => matches!(self, BeginArrowFunction | EndArrowFunction),
            Family::GeneratorFunction => {
                matches!(self, BeginGeneratorFunction | EndGeneratorFunction)
            }
            Family::AsyncFunction => matches!(self, BeginAsyncFunction | EndAsyncFunction),
            Family::Constructor => matches!(self, BeginConstructor | EndConstructor),
            Family::ObjectLiteral => matches!(self, BeginObjectLiteral | EndObjectLiteral),
            Family::ObjectLiteralMethod => matches!(
                self,
                BeginObjectLiteralMethod
                    | EndObjectLiteralMethod
                    | BeginObjectLiteralComputedMethod
                    | EndObjectLiteralComputedMethod
            ),
            Family::ObjectLiteralGetter => {
                matches!(self, BeginObjectLiteralGetter | EndObjectLiteralGetter)
            }
            Family::ObjectLiteralSetter => {
                matches!(self, BeginObjectLiteralSetter | EndObjectLiteralSetter)
            }
            Family::ClassDefinition => matches!(self, BeginClassDefinition | EndClassDefinition),
            Family::ClassConstructor => matches!(self, BeginClassConstructor | EndClassConstructor),
            Family::ClassMethod => matches!(self, BeginClassMethod | EndClassMethod),
            Family::ClassGetter => matches!(self, BeginClassGetter | EndClassGetter),
            Family::ClassSetter => matches!(self, BeginClassSetter | EndClassSetter),
            Family::ClassStaticInitializer => {
                matches!(self, BeginClassStaticInitializer | EndClassStaticInitializer)
            }
            Family::Loop => matches!(
                self,
                BeginRepeatLoop | EndRepeatLoop | BeginWhileLoop | EndWhileLoop
            ),
            Family::TryCatch => {
                matches!(self, BeginTry | BeginCatch | BeginFinally | EndTryCatchFinally)
            }
            Family::Eval => self == Eval,
            Family::Await => self == Await,
            Family::LoadBuiltin => self == LoadBuiltin,
            Family::LoadNamedVariable => self == LoadNamedVariable,
            Family::StoreNamedVariable => self == StoreNamedVariable,
            Family::DefineNamedVariable => self == DefineNamedVariable,
            Family::ConfigureElement => self == ConfigureElement,
            Family::ConfigureProperty => self == ConfigureProperty,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    Xor,
    /// `||`
    LogicOr,
    /// `&&`
    LogicAnd,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `>>>`
    UnsignedRShift,
    /// `**`
    Exp,
}

impl BinaryOperator {
    /// Source token for this operator.
    pub fn token(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::Xor => "^",
            BinaryOperator::LogicOr => "||",
            BinaryOperator::LogicAnd => "&&",
            BinaryOperator::LShift => "<<",
            BinaryOperator::RShift => ">>",
            BinaryOperator::UnsignedRShift => ">>>",
            BinaryOperator::Exp => "**",
        }
    }
}

/// Comparators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `==`
    Equal,
    /// `===`
    StrictEqual,
    /// `!=`
    NotEqual,
    /// `!==`
    StrictNotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

impl Comparator {
    /// Source token for this comparator.
    pub fn token(self) -> &'static str {
        match self {
            Comparator::Equal => "==",
            Comparator::StrictEqual => "===",
            Comparator::NotEqual => "!=",
            Comparator::StrictNotEqual => "!==",
            Comparator::LessThan => "<",
            Comparator::LessThanOrEqual => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEqual => ">=",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `!`
    LogicalNot,
    /// `~`
    BitwiseNot,
    /// Unary `-`
    Minus,
    /// Unary `+`
    Plus,
}

impl UnaryOperator {
    /// Source token for this operator.
    pub fn token(self) -> &'static str {
        match self {
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
        }
    }
}
