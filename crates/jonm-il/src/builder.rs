//! Program builder
//!
//! The builder appends instructions one at a time, tracks variable
//! visibility through block scopes, and can adopt instructions from other
//! programs, translating their variables into its own numbering.
//!
//! Block-building helpers take explicit callbacks that receive the builder
//! (and any block-scoped variables) as parameters; the builder is never
//! captured by a closure.

use crate::instruction::{Attributes, Instruction};
use crate::opcode::{BinaryOperator, Comparator, Opcode, UnaryOperator};
use crate::program::Program;
use crate::variable::Variable;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

/// Incremental builder for IL programs.
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
    next_variable: u32,
    /// Variables currently in scope, in definition order.
    visible: Vec<Variable>,
    /// Indices into `visible` captured at block entry.
    scope_starts: Vec<usize>,
    /// Visibility fences for isolated fragment generation.
    barriers: Vec<usize>,
    hidden: FxHashSet<Variable>,
    /// Stack of variable translation maps for adoption scopes.
    adoption: Vec<FxHashMap<Variable, Variable>>,
    contributors: FxHashSet<String>,
}

impl ProgramBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        ProgramBuilder {
            instructions: Vec::new(),
            next_variable: 0,
            visible: Vec::new(),
            scope_starts: Vec::new(),
            barriers: Vec::new(),
            hidden: FxHashSet::default(),
            adoption: Vec::new(),
            contributors: FxHashSet::default(),
        }
    }

    /// Number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of variables allocated so far.
    pub fn num_variables(&self) -> u32 {
        self.next_variable
    }

    /// Consume the builder and produce the finished program.
    pub fn finalize(self) -> Program {
        Program::with_contributors(self.instructions, self.contributors)
    }

    /// Record a contributor on the program being built.
    pub fn add_contributor(&mut self, name: &str) {
        self.contributors.insert(name.to_string());
    }

    /// Copy all contributors of `program` onto the program being built.
    pub fn inherit_contributors(&mut self, program: &Program) {
        for name in program.contributors() {
            self.contributors.insert(name.clone());
        }
    }

    fn next_var(&mut self) -> Variable {
        let v = Variable::new(self.next_variable);
        self.next_variable += 1;
        v
    }

    fn define(&mut self, v: Variable) {
        self.visible.push(v);
    }

    fn open_scope(&mut self) {
        self.scope_starts.push(self.visible.len());
    }

    fn close_scope(&mut self) {
        if let Some(start) = self.scope_starts.pop() {
            self.visible.truncate(start);
        }
    }

    /// Append an instruction, maintaining scope-derived visibility.
    pub fn emit(&mut self, instr: Instruction) {
        if instr.is_block_end() {
            self.close_scope();
        }
        for v in &instr.outputs {
            self.define(*v);
        }
        if instr.is_block_start() {
            self.open_scope();
            for v in &instr.inner_outputs {
                self.define(*v);
            }
        }
        self.instructions.push(instr);
    }

    // ===== Variable visibility =====

    /// Variables visible at the current position, respecting scopes, the
    /// innermost isolation barrier, and the hidden set.
    pub fn visible_variables(&self) -> Vec<Variable> {
        let from = self
            .barriers
            .last()
            .copied()
            .unwrap_or(0)
            .min(self.visible.len());
        self.visible[from..]
            .iter()
            .copied()
            .filter(|v| !self.hidden.contains(v))
            .collect()
    }

    /// A uniformly random visible variable, if any.
    pub fn random_variable(&self, rng: &mut StdRng) -> Option<Variable> {
        self.visible_variables().choose(rng).copied()
    }

    /// Hide a variable from visibility queries.
    pub fn hide(&mut self, v: Variable) {
        self.hidden.insert(v);
    }

    /// Run `f` behind a visibility barrier: code generated inside sees only
    /// variables it defines itself.
    pub fn isolated<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.barriers.push(self.visible.len());
        let result = f(self);
        self.barriers.pop();
        result
    }

    // ===== Adoption =====

    /// Run `f` within an adoption scope for `program`: instructions of that
    /// program passed to [`adopt`](Self::adopt) have their variables
    /// translated into this builder's numbering.
    pub fn adopting<R>(&mut self, _program: &Program, f: impl FnOnce(&mut Self) -> R) -> R {
        self.adoption.push(FxHashMap::default());
        let result = f(self);
        self.adoption.pop();
        result
    }

    /// Translate a foreign variable through the innermost adoption map,
    /// allocating a fresh variable on first sight.
    pub fn translate(&mut self, v: Variable) -> Variable {
        if self.adoption.is_empty() {
            return v;
        }
        if let Some(&mapped) = self.adoption.last().and_then(|m| m.get(&v)) {
            return mapped;
        }
        let fresh = self.next_var();
        if let Some(map) = self.adoption.last_mut() {
            map.insert(v, fresh);
        }
        fresh
    }

    /// Override the adoption mapping for a foreign variable.
    ///
    /// Subsequent adopted uses of `from` read `to` instead.
    pub fn remap(&mut self, from: Variable, to: Variable) {
        if let Some(map) = self.adoption.last_mut() {
            map.insert(from, to);
        }
    }

    /// Adopt a foreign instruction: translate its variables and emit it.
    pub fn adopt(&mut self, instr: &Instruction) {
        let inputs = instr.inputs.iter().map(|&v| self.translate(v)).collect();
        let outputs = instr.outputs.iter().map(|&v| self.translate(v)).collect();
        let inner_outputs = instr
            .inner_outputs
            .iter()
            .map(|&v| self.translate(v))
            .collect();
        self.emit(Instruction {
            opcode: instr.opcode,
            inputs,
            outputs,
            inner_outputs,
            attrs: instr.attrs.clone(),
        });
    }

    /// Adopt a foreign instruction and return its translated outputs, for
    /// callers that need to reference the adopted definitions directly.
    pub fn adopt_and_define(&mut self, instr: &Instruction) -> Vec<Variable> {
        self.adopt(instr);
        instr.outputs.iter().map(|&v| self.translate(v)).collect()
    }

    /// Re-emit a foreign instruction with fresh, unrecorded outputs.
    ///
    /// Inputs are translated through the adoption map; outputs get fresh
    /// variables that are *not* recorded, so later adopted uses of the
    /// original outputs are unaffected.
    pub fn replicate(&mut self, instr: &Instruction) -> Instruction {
        let inputs: Vec<Variable> = instr.inputs.iter().map(|&v| self.translate(v)).collect();
        let outputs: Vec<Variable> = instr.outputs.iter().map(|_| self.next_var()).collect();
        let inner_outputs: Vec<Variable> =
            instr.inner_outputs.iter().map(|_| self.next_var()).collect();
        let replica = Instruction {
            opcode: instr.opcode,
            inputs,
            outputs,
            inner_outputs,
            attrs: instr.attrs.clone(),
        };
        self.emit(replica.clone());
        replica
    }

    /// Adopt an entire program.
    pub fn append(&mut self, program: &Program) {
        self.adopting(program, |b| {
            for instr in program {
                b.adopt(instr);
            }
        });
    }

    // ===== Literals & builtins =====

    /// Load an integer literal.
    pub fn load_int(&mut self, value: i64) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadInt,
            vec![],
            vec![out],
            Attributes::Int(value),
        ));
        out
    }

    /// Load a float literal.
    pub fn load_float(&mut self, value: f64) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadFloat,
            vec![],
            vec![out],
            Attributes::Float(value),
        ));
        out
    }

    /// Load a boolean literal.
    pub fn load_bool(&mut self, value: bool) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadBool,
            vec![],
            vec![out],
            Attributes::Bool(value),
        ));
        out
    }

    /// Load a string literal.
    pub fn load_string(&mut self, value: &str) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadString,
            vec![],
            vec![out],
            Attributes::Str(value.to_string()),
        ));
        out
    }

    /// Load null.
    pub fn load_null(&mut self) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadNull,
            vec![],
            vec![out],
            Attributes::None,
        ));
        out
    }

    /// Load undefined.
    pub fn load_undefined(&mut self) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadUndefined,
            vec![],
            vec![out],
            Attributes::None,
        ));
        out
    }

    /// Load a builtin by name.
    pub fn load_builtin(&mut self, name: &str) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadBuiltin,
            vec![],
            vec![out],
            Attributes::Builtin(name.to_string()),
        ));
        out
    }

    // ===== Named variables =====

    /// Load a named variable.
    pub fn load_named_variable(&mut self, name: &str) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::LoadNamedVariable,
            vec![],
            vec![out],
            Attributes::Name(name.to_string()),
        ));
        out
    }

    /// Store to a named variable.
    pub fn store_named_variable(&mut self, name: &str, value: Variable) {
        self.emit(Instruction::new(
            Opcode::StoreNamedVariable,
            vec![value],
            vec![],
            Attributes::Name(name.to_string()),
        ));
    }

    /// Define a named variable bound to `value`.
    pub fn define_named_variable(&mut self, name: &str, value: Variable) {
        self.emit(Instruction::new(
            Opcode::DefineNamedVariable,
            vec![value],
            vec![],
            Attributes::Name(name.to_string()),
        ));
    }

    // ===== Collections =====

    /// Create an array from values.
    pub fn create_array(&mut self, values: &[Variable]) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::CreateArray,
            values.to_vec(),
            vec![out],
            Attributes::None,
        ));
        out
    }

    /// Create an array from integer literals.
    pub fn create_int_array(&mut self, values: &[i64]) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::CreateIntArray,
            vec![],
            vec![out],
            Attributes::IntArray(values.to_vec()),
        ));
        out
    }

    /// Create an object literal from (name, value) pairs.
    pub fn create_object(&mut self, properties: &[(&str, Variable)]) -> Variable {
        let out = self.next_var();
        let names = properties.iter().map(|(n, _)| n.to_string()).collect();
        let inputs = properties.iter().map(|&(_, v)| v).collect();
        self.emit(Instruction::new(
            Opcode::CreateObject,
            inputs,
            vec![out],
            Attributes::Properties(names),
        ));
        out
    }

    /// Load `array[index]`.
    pub fn get_element(&mut self, array: Variable, index: i64) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::GetElement,
            vec![array],
            vec![out],
            Attributes::ElementIndex(index),
        ));
        out
    }

    /// Store `array[index] = value`.
    pub fn set_element(&mut self, array: Variable, index: i64, value: Variable) {
        self.emit(Instruction::new(
            Opcode::SetElement,
            vec![array, value],
            vec![],
            Attributes::ElementIndex(index),
        ));
    }

    /// Compound-assign `array[index] op= value`.
    pub fn update_element(
        &mut self,
        array: Variable,
        index: i64,
        op: BinaryOperator,
        value: Variable,
    ) {
        self.emit(Instruction::new(
            Opcode::UpdateElement,
            vec![array, value],
            vec![],
            Attributes::Element { index, op },
        ));
    }

    /// Load `object.name`.
    pub fn get_property(&mut self, object: Variable, name: &str) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::GetProperty,
            vec![object],
            vec![out],
            Attributes::Name(name.to_string()),
        ));
        out
    }

    /// Store `object.name = value`.
    pub fn set_property(&mut self, object: Variable, name: &str, value: Variable) {
        self.emit(Instruction::new(
            Opcode::SetProperty,
            vec![object, value],
            vec![],
            Attributes::Name(name.to_string()),
        ));
    }

    /// Load `object[key]`.
    pub fn get_computed_property(&mut self, object: Variable, key: Variable) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::GetComputedProperty,
            vec![object, key],
            vec![out],
            Attributes::None,
        ));
        out
    }

    /// Store `object[key] = value`.
    pub fn set_computed_property(&mut self, object: Variable, key: Variable, value: Variable) {
        self.emit(Instruction::new(
            Opcode::SetComputedProperty,
            vec![object, key, value],
            vec![],
            Attributes::None,
        ));
    }

    // ===== Expressions =====

    /// Binary operation.
    pub fn binary(&mut self, lhs: Variable, rhs: Variable, op: BinaryOperator) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::BinaryOp,
            vec![lhs, rhs],
            vec![out],
            Attributes::Binary(op),
        ));
        out
    }

    /// Comparison.
    pub fn compare(&mut self, lhs: Variable, rhs: Variable, op: Comparator) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::Compare,
            vec![lhs, rhs],
            vec![out],
            Attributes::Compare(op),
        ));
        out
    }

    /// Unary operation.
    pub fn unary(&mut self, operand: Variable, op: UnaryOperator) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::UnaryOp,
            vec![operand],
            vec![out],
            Attributes::Unary(op),
        ));
        out
    }

    /// Reassign an existing variable.
    pub fn reassign(&mut self, target: Variable, value: Variable) {
        self.emit(Instruction::new(
            Opcode::Reassign,
            vec![target, value],
            vec![],
            Attributes::None,
        ));
    }

    // ===== Calls =====

    /// Call a function value.
    pub fn call_function(&mut self, callee: Variable, args: &[Variable]) -> Variable {
        let out = self.next_var();
        let mut inputs = vec![callee];
        inputs.extend_from_slice(args);
        self.emit(Instruction::new(
            Opcode::CallFunction,
            inputs,
            vec![out],
            Attributes::Call { guarded: false },
        ));
        out
    }

    /// Call a method on a receiver.
    pub fn call_method(&mut self, receiver: Variable, name: &str, args: &[Variable]) -> Variable {
        let out = self.next_var();
        let mut inputs = vec![receiver];
        inputs.extend_from_slice(args);
        self.emit(Instruction::new(
            Opcode::CallMethod,
            inputs,
            vec![out],
            Attributes::Method {
                name: name.to_string(),
                guarded: false,
            },
        ));
        out
    }

    /// Construct an instance.
    pub fn construct(&mut self, constructor: Variable, args: &[Variable]) -> Variable {
        let out = self.next_var();
        let mut inputs = vec![constructor];
        inputs.extend_from_slice(args);
        self.emit(Instruction::new(
            Opcode::Construct,
            inputs,
            vec![out],
            Attributes::Call { guarded: false },
        ));
        out
    }

    // ===== Control transfer =====

    /// Return from the enclosing subroutine.
    pub fn do_return(&mut self, value: Option<Variable>) {
        let inputs = value.into_iter().collect();
        self.emit(Instruction::new(
            Opcode::Return,
            inputs,
            vec![],
            Attributes::None,
        ));
    }

    /// Await a value.
    pub fn await_expr(&mut self, value: Variable) -> Variable {
        let out = self.next_var();
        self.emit(Instruction::new(
            Opcode::Await,
            vec![value],
            vec![out],
            Attributes::None,
        ));
        out
    }

    /// Throw a value.
    pub fn throw(&mut self, value: Variable) {
        self.emit(Instruction::new(
            Opcode::ThrowException,
            vec![value],
            vec![],
            Attributes::None,
        ));
    }

    /// Evaluate a code string with the given arguments.
    pub fn eval(&mut self, code: &str, args: &[Variable]) {
        self.emit(Instruction::new(
            Opcode::Eval,
            args.to_vec(),
            vec![],
            Attributes::Str(code.to_string()),
        ));
    }

    // ===== Blocks =====

    /// Build `if (cond) { body }`.
    pub fn build_if(&mut self, cond: Variable, body: impl FnOnce(&mut Self)) {
        self.emit(Instruction::new(
            Opcode::BeginIf,
            vec![cond],
            vec![],
            Attributes::None,
        ));
        body(self);
        self.emit(Instruction::new(
            Opcode::EndIf,
            vec![],
            vec![],
            Attributes::None,
        ));
    }

    /// Build `if (cond) { then } else { other }`.
    pub fn build_if_else(
        &mut self,
        cond: Variable,
        then_body: impl FnOnce(&mut Self),
        else_body: impl FnOnce(&mut Self),
    ) {
        self.emit(Instruction::new(
            Opcode::BeginIf,
            vec![cond],
            vec![],
            Attributes::None,
        ));
        then_body(self);
        self.emit(Instruction::new(
            Opcode::BeginElse,
            vec![],
            vec![],
            Attributes::None,
        ));
        else_body(self);
        self.emit(Instruction::new(
            Opcode::EndIf,
            vec![],
            vec![],
            Attributes::None,
        ));
    }

    /// Build `try { } catch (e) { }`.
    pub fn build_try_catch(
        &mut self,
        try_body: impl FnOnce(&mut Self),
        catch_body: impl FnOnce(&mut Self, Variable),
    ) {
        self.emit(Instruction::new(
            Opcode::BeginTry,
            vec![],
            vec![],
            Attributes::None,
        ));
        try_body(self);
        let exception = self.next_var();
        self.emit(Instruction::with_inner_outputs(
            Opcode::BeginCatch,
            vec![],
            vec![],
            vec![exception],
            Attributes::None,
        ));
        catch_body(self, exception);
        self.emit(Instruction::new(
            Opcode::EndTryCatchFinally,
            vec![],
            vec![],
            Attributes::None,
        ));
    }

    /// Build `try { } finally { }`.
    pub fn build_try_finally(
        &mut self,
        try_body: impl FnOnce(&mut Self),
        finally_body: impl FnOnce(&mut Self),
    ) {
        self.emit(Instruction::new(
            Opcode::BeginTry,
            vec![],
            vec![],
            Attributes::None,
        ));
        try_body(self);
        self.emit(Instruction::new(
            Opcode::BeginFinally,
            vec![],
            vec![],
            Attributes::None,
        ));
        finally_body(self);
        self.emit(Instruction::new(
            Opcode::EndTryCatchFinally,
            vec![],
            vec![],
            Attributes::None,
        ));
    }

    /// Build `try { } catch (e) { } finally { }`.
    pub fn build_try_catch_finally(
        &mut self,
        try_body: impl FnOnce(&mut Self),
        catch_body: impl FnOnce(&mut Self, Variable),
        finally_body: impl FnOnce(&mut Self),
    ) {
        self.emit(Instruction::new(
            Opcode::BeginTry,
            vec![],
            vec![],
            Attributes::None,
        ));
        try_body(self);
        let exception = self.next_var();
        self.emit(Instruction::with_inner_outputs(
            Opcode::BeginCatch,
            vec![],
            vec![],
            vec![exception],
            Attributes::None,
        ));
        catch_body(self, exception);
        self.emit(Instruction::new(
            Opcode::BeginFinally,
            vec![],
            vec![],
            Attributes::None,
        ));
        finally_body(self);
        self.emit(Instruction::new(
            Opcode::EndTryCatchFinally,
            vec![],
            vec![],
            Attributes::None,
        ));
    }

    /// Build a counted loop running `trip_count` times. The body callback
    /// receives the induction variable.
    pub fn build_repeat_loop(
        &mut self,
        trip_count: i64,
        body: impl FnOnce(&mut Self, Variable),
    ) {
        let induction = self.next_var();
        self.emit(Instruction::with_inner_outputs(
            Opcode::BeginRepeatLoop,
            vec![],
            vec![],
            vec![induction],
            Attributes::Int(trip_count),
        ));
        body(self, induction);
        self.emit(Instruction::new(
            Opcode::EndRepeatLoop,
            vec![],
            vec![],
            Attributes::None,
        ));
    }

    /// Build `while (cond) { body }`.
    pub fn build_while_loop(&mut self, cond: Variable, body: impl FnOnce(&mut Self)) {
        self.emit(Instruction::new(
            Opcode::BeginWhileLoop,
            vec![cond],
            vec![],
            Attributes::None,
        ));
        body(self);
        self.emit(Instruction::new(
            Opcode::EndWhileLoop,
            vec![],
            vec![],
            Attributes::None,
        ));
    }

    fn build_function(
        &mut self,
        begin: Opcode,
        end: Opcode,
        param_count: usize,
        body: impl FnOnce(&mut Self, &[Variable]),
    ) -> Variable {
        let function = self.next_var();
        let params: Vec<Variable> = (0..param_count).map(|_| self.next_var()).collect();
        self.emit(Instruction::with_inner_outputs(
            begin,
            vec![],
            vec![function],
            params.clone(),
            Attributes::None,
        ));
        body(self, &params);
        self.emit(Instruction::new(end, vec![], vec![], Attributes::None));
        function
    }

    /// Build a plain function; returns the function value.
    pub fn build_plain_function(
        &mut self,
        param_count: usize,
        body: impl FnOnce(&mut Self, &[Variable]),
    ) -> Variable {
        self.build_function(
            Opcode::BeginPlainFunction,
            Opcode::EndPlainFunction,
            param_count,
            body,
        )
    }

    /// Build an arrow function; returns the function value.
    pub fn build_arrow_function(
        &mut self,
        param_count: usize,
        body: impl FnOnce(&mut Self, &[Variable]),
    ) -> Variable {
        self.build_function(
            Opcode::BeginArrowFunction,
            Opcode::EndArrowFunction,
            param_count,
            body,
        )
    }

    // ===== Random fragment generation =====

    /// Emit a handful of fresh literal values to seed fragment generation.
    pub fn build_prefix(&mut self, rng: &mut StdRng) {
        let count = 2 + rng.gen_range(0..3);
        for _ in 0..count {
            self.random_literal(rng);
        }
    }

    /// Emit `count` fresh values (literals and small arrays).
    pub fn build_values(&mut self, rng: &mut StdRng, count: usize) {
        for _ in 0..count {
            if rng.gen_bool(0.2) {
                let len = rng.gen_range(0..4);
                let values: Vec<i64> = (0..len).map(|_| rng.gen_range(0..0x1000)).collect();
                self.create_int_array(&values);
            } else {
                self.random_literal(rng);
            }
        }
    }

    /// Emit `count` small data-flow instructions over visible variables.
    ///
    /// Generated code is pure value computation; it cannot throw and has
    /// no observable side effects.
    pub fn build(&mut self, rng: &mut StdRng, count: usize) {
        for _ in 0..count {
            let lhs = self.random_variable(rng);
            let rhs = self.random_variable(rng);
            match (lhs, rhs) {
                (Some(a), Some(b)) => match rng.gen_range(0..4) {
                    0 => {
                        let op = *SAFE_BINARY_OPS.choose(rng).unwrap_or(&BinaryOperator::Add);
                        self.binary(a, b, op);
                    }
                    1 => {
                        let op = *COMPARATORS.choose(rng).unwrap_or(&Comparator::LessThan);
                        self.compare(a, b, op);
                    }
                    2 => {
                        let op = *UNARY_OPS.choose(rng).unwrap_or(&UnaryOperator::Minus);
                        self.unary(a, op);
                    }
                    _ => {
                        self.random_literal(rng);
                    }
                },
                _ => {
                    self.random_literal(rng);
                }
            }
        }
    }

    fn random_literal(&mut self, rng: &mut StdRng) -> Variable {
        match rng.gen_range(0..3) {
            0 => {
                let value = rng.gen_range(-0x8000..0x8000);
                self.load_int(value)
            }
            1 => {
                let value = rng.gen_range(-1000..1000) as f64 / 10.0;
                self.load_float(value)
            }
            _ => {
                let value = rng.gen_bool(0.5);
                self.load_bool(value)
            }
        }
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Binary operators safe for generated neutral code (no division, which
/// could produce engine-dependent NaN printing through later arithmetic).
const SAFE_BINARY_OPS: [BinaryOperator; 8] = [
    BinaryOperator::Add,
    BinaryOperator::Sub,
    BinaryOperator::Mul,
    BinaryOperator::BitAnd,
    BinaryOperator::BitOr,
    BinaryOperator::Xor,
    BinaryOperator::LShift,
    BinaryOperator::RShift,
];

const COMPARATORS: [Comparator; 4] = [
    Comparator::Equal,
    Comparator::StrictEqual,
    Comparator::LessThan,
    Comparator::GreaterThan,
];

const UNARY_OPS: [UnaryOperator; 3] = [
    UnaryOperator::LogicalNot,
    UnaryOperator::BitwiseNot,
    UnaryOperator::Minus,
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_scope_visibility() {
        let mut b = ProgramBuilder::new();
        let outer = b.load_int(1);
        b.build_plain_function(1, |b, params| {
            // Outer variables and parameters are visible inside the body.
            let visible = b.visible_variables();
            assert!(visible.contains(&outer));
            assert!(visible.contains(&params[0]));
            b.load_int(2);
        });
        // Body-local definitions went out of scope; the function value is in.
        let visible = b.visible_variables();
        assert!(visible.contains(&outer));
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_function_value_visible_in_body() {
        let mut b = ProgramBuilder::new();
        let mut seen_inside = None;
        let f = b.build_plain_function(0, |b, _| {
            seen_inside = Some(b.visible_variables());
        });
        assert!(seen_inside.unwrap().contains(&f));
    }

    #[test]
    fn test_isolated_barrier() {
        let mut b = ProgramBuilder::new();
        let outer = b.load_int(1);
        b.isolated(|b| {
            assert!(b.visible_variables().is_empty());
            let inner = b.load_int(2);
            assert_eq!(b.visible_variables(), vec![inner]);
        });
        // Barrier lifted: both are visible again.
        assert!(b.visible_variables().contains(&outer));
    }

    #[test]
    fn test_hide() {
        let mut b = ProgramBuilder::new();
        let v = b.load_int(1);
        b.hide(v);
        assert!(b.visible_variables().is_empty());
    }

    #[test]
    fn test_adoption_renumbers() {
        let mut donor = ProgramBuilder::new();
        let a = donor.load_int(1);
        let c = donor.load_int(2);
        donor.binary(a, c, BinaryOperator::Add);
        let donor = donor.finalize();

        let mut b = ProgramBuilder::new();
        b.load_int(0); // occupy v0
        b.append(&donor);
        let program = b.finalize();

        assert_eq!(program.len(), 4);
        // The adopted add consumes the renumbered variables, not v0/v1.
        let add = &program[3];
        assert_eq!(add.inputs.len(), 2);
        assert!(add.inputs.iter().all(|v| v.number() >= 1));
    }

    #[test]
    fn test_remap_overrides_adoption() {
        let mut donor = ProgramBuilder::new();
        let a = donor.load_int(1);
        donor.unary(a, UnaryOperator::Minus);
        let donor = donor.finalize();

        let mut b = ProgramBuilder::new();
        let replacement = b.load_int(7);
        b.adopting(&donor, |b| {
            // Skip the donor's first instruction; its output reads ours.
            b.remap(donor[0].output().unwrap(), replacement);
            b.adopt(&donor[1]);
        });
        let program = b.finalize();
        assert_eq!(program[1].inputs, vec![replacement]);
    }

    #[test]
    fn test_replicate_leaves_map_untouched() {
        let mut donor = ProgramBuilder::new();
        let a = donor.load_int(1);
        donor.unary(a, UnaryOperator::Minus);
        let donor = donor.finalize();

        let mut b = ProgramBuilder::new();
        b.adopting(&donor, |b| {
            b.adopt(&donor[0]);
            let replica = b.replicate(&donor[1]);
            b.adopt(&donor[1]);
            let program_out = replica.output().unwrap();
            // The re-adopted instruction got its own translation, distinct
            // from the replica's fresh output.
            assert_ne!(program_out, b.instructions.last().unwrap().outputs[0]);
        });
    }

    #[test]
    fn test_build_generates_pure_code() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut b = ProgramBuilder::new();
        b.build_prefix(&mut rng);
        b.build(&mut rng, 10);
        let program = b.finalize();
        assert!(program.len() >= 12);
        for instr in &program {
            assert!(!instr.is_call());
            assert!(!instr.opcode.is_block(), "generated code must be flat");
        }
    }

    #[test]
    fn test_repeat_loop_induction_variable() {
        let mut b = ProgramBuilder::new();
        b.build_repeat_loop(10, |b, i| {
            assert!(b.visible_variables().contains(&i));
            b.load_int(1);
        });
        let program = b.finalize();
        assert_eq!(program[0].opcode, Opcode::BeginRepeatLoop);
        assert_eq!(program[0].attrs, Attributes::Int(10));
        assert_eq!(program[0].inner_outputs.len(), 1);
    }
}
