//! The bytecode virtual machine. Executes a flat `TacProgram` with a
//! fetch-decode-execute loop over a program counter; all mutable runtime
//! state — call frames, the value stack, and the aggregate tables — lives
//! here. `operators` and `builtins` are stateless helpers the VM calls into.

use std::collections::HashMap;

use crate::builtins;
use crate::error::{CorvidError, Result};
use crate::operators;
use crate::tac::{Instr, TacItem, TacProgram};
use crate::value::{AggregateId, Value};

/// A single activation record. Locals are a flat name→value map, matching
/// the source language's lack of nested block-scoped storage at runtime —
/// shadowing is resolved at compile time, by the time the VM sees a name it
/// refers to exactly one slot.
#[derive(Debug, Default)]
struct Frame {
    locals: HashMap<String, Value>,
}

/// What happened after executing one instruction.
enum Flow {
    Next,
    Jump(usize),
    /// The outermost frame returned: execution halts with this value.
    Halt(Option<Value>),
}

pub struct Vm {
    tac: TacProgram,
    label_map: HashMap<String, usize>,
    function_params: HashMap<String, Vec<String>>,
    frames: Vec<Frame>,
    value_stack: Vec<Value>,
    return_stack: Vec<usize>,
    call_result_stack: Vec<String>,
    arrays: HashMap<AggregateId, Vec<Option<Value>>>,
    tuples: HashMap<AggregateId, Vec<Option<Value>>>,
    next_aggregate_id: AggregateId,
    pc: usize,
    debug: bool,
}

impl Vm {
    pub fn new(tac: TacProgram) -> Result<Self> {
        let (label_map, function_params) = tac.build_label_map();
        let pc = *label_map
            .get("main")
            .ok_or_else(|| CorvidError::UndefinedLabel { label: "main".to_string() })?;
        Ok(Self {
            tac,
            label_map,
            function_params,
            frames: vec![Frame::default()],
            value_stack: Vec::new(),
            return_stack: Vec::new(),
            call_result_stack: Vec::new(),
            arrays: HashMap::new(),
            tuples: HashMap::new(),
            next_aggregate_id: 0,
            pc,
            debug: false,
        })
    }

    /// Prints each instruction and the value stack before executing it.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Runs the program to completion, starting at `main`. Returns `main`'s
    /// return value, or `None` if `main` returns bare.
    pub fn run(&mut self) -> Result<Option<Value>> {
        loop {
            if self.pc >= self.tac.items.len() {
                return Ok(None);
            }
            let item = self.tac.items[self.pc].clone();
            if self.debug {
                eprintln!("pc={} {item} stack={:?}", self.pc, self.value_stack);
            }
            let flow = match item {
                TacItem::Label { .. } => Flow::Next,
                TacItem::Instr(instr) => self.step(&instr)?,
            };
            match flow {
                Flow::Next => self.pc += 1,
                Flow::Jump(target) => self.pc = target,
                Flow::Halt(value) => return Ok(value),
            }
        }
    }

    fn frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("at least one frame")
    }

    fn store(&mut self, name: &str, value: Value) {
        self.frame().locals.insert(name.to_string(), value);
    }

    fn get_value(&self, operand: &str) -> Result<Value> {
        if let Some(inner) = operand.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            return Ok(Value::Str(inner.to_string()));
        }
        if operand == "true" {
            return Ok(Value::Bool(true));
        }
        if operand == "false" {
            return Ok(Value::Bool(false));
        }
        if let Ok(i) = operand.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        if let Ok(f) = operand.parse::<f64>() {
            return Ok(Value::Float(f));
        }
        self.frames
            .last()
            .and_then(|f| f.locals.get(operand))
            .cloned()
            .ok_or_else(|| CorvidError::RuntimeUndefinedVariable { name: operand.to_string() })
    }

    fn get_index(&self, operand: &str) -> Result<usize> {
        match self.get_value(operand)? {
            Value::Int(i) if i >= 0 => Ok(i as usize),
            other => Err(CorvidError::MalformedOperand { operand: other.to_string() }),
        }
    }

    fn get_aggregate_id(&self, operand: &str) -> Result<(AggregateId, bool)> {
        match self.get_value(operand)? {
            Value::Array(id) => Ok((id, false)),
            Value::Tuple(id) => Ok((id, true)),
            other => Err(CorvidError::MalformedOperand { operand: other.to_string() }),
        }
    }

    fn step(&mut self, instr: &Instr) -> Result<Flow> {
        match instr {
            Instr::Assign { result, value } => {
                let v = self.get_value(value)?;
                self.store(result, v);
                Ok(Flow::Next)
            }
            Instr::Binary { result, op, arg1, arg2 } => {
                let left = self.get_value(arg1)?;
                let right = self.get_value(arg2)?;
                let value = operators::apply_binary(*op, &left, &right)?;
                self.store(result, value);
                Ok(Flow::Next)
            }
            Instr::Unary { result, op, arg1 } => {
                let v = self.get_value(arg1)?;
                let value = match op.as_str() {
                    "!" => operators::apply_not(&v)?,
                    "-" => operators::apply_neg(&v)?,
                    _ => return Err(CorvidError::MalformedOperand { operand: op.clone() }),
                };
                self.store(result, value);
                Ok(Flow::Next)
            }
            Instr::Param { value } => {
                let v = self.get_value(value)?;
                self.value_stack.push(v);
                Ok(Flow::Next)
            }
            Instr::Call { result, name, argc } => self.call(result, name, *argc),
            Instr::Return { value } => self.do_return(value.as_deref()),
            Instr::Goto { label } => Ok(Flow::Jump(self.label(label)?)),
            Instr::IfGoto { cond, label } => match self.get_value(cond)? {
                Value::Bool(true) => Ok(Flow::Jump(self.label(label)?)),
                Value::Bool(false) => Ok(Flow::Next),
                other => Err(CorvidError::MalformedOperand { operand: other.to_string() }),
            },
            Instr::AllocArray { result, size } => {
                let id = self.new_aggregate();
                self.arrays.insert(id, vec![None; *size]);
                self.store(result, Value::Array(id));
                Ok(Flow::Next)
            }
            Instr::AllocTuple { result, size } => {
                let id = self.new_aggregate();
                self.tuples.insert(id, vec![None; *size]);
                self.store(result, Value::Tuple(id));
                Ok(Flow::Next)
            }
            Instr::ArrayStore { array, index, value } => {
                let (id, _) = self.get_aggregate_id(array)?;
                let idx = self.get_index(index)?;
                let v = self.get_value(value)?;
                let slots = self.arrays.get_mut(&id).ok_or(CorvidError::AggregateNotFound { id })?;
                let len = slots.len();
                let slot = slots
                    .get_mut(idx)
                    .ok_or(CorvidError::IndexOutOfRange { index: idx as i64, len })?;
                *slot = Some(v);
                Ok(Flow::Next)
            }
            Instr::TupleStore { tuple, index, value } => {
                let (id, _) = self.get_aggregate_id(tuple)?;
                let idx = self.get_index(index)?;
                let v = self.get_value(value)?;
                let slots = self.tuples.get_mut(&id).ok_or(CorvidError::AggregateNotFound { id })?;
                let len = slots.len();
                let slot = slots
                    .get_mut(idx)
                    .ok_or(CorvidError::IndexOutOfRange { index: idx as i64, len })?;
                if slot.is_some() {
                    return Err(CorvidError::TupleOverwrite { index: idx as i64 });
                }
                *slot = Some(v);
                Ok(Flow::Next)
            }
            Instr::ArrayLoad { result, array, index } => {
                let (id, _) = self.get_aggregate_id(array)?;
                let idx = self.get_index(index)?;
                let slots = self.arrays.get(&id).ok_or(CorvidError::AggregateNotFound { id })?;
                let len = slots.len();
                let value = slots
                    .get(idx)
                    .ok_or(CorvidError::IndexOutOfRange { index: idx as i64, len })?
                    .clone()
                    .unwrap_or(Value::Nil);
                self.store(result, value);
                Ok(Flow::Next)
            }
            Instr::TupleLoad { result, tuple, index } => {
                let (id, _) = self.get_aggregate_id(tuple)?;
                let idx = self.get_index(index)?;
                let slots = self.tuples.get(&id).ok_or(CorvidError::AggregateNotFound { id })?;
                let len = slots.len();
                let value = slots
                    .get(idx)
                    .ok_or(CorvidError::IndexOutOfRange { index: idx as i64, len })?
                    .clone()
                    .unwrap_or(Value::Nil);
                self.store(result, value);
                Ok(Flow::Next)
            }
        }
    }

    fn new_aggregate(&mut self) -> AggregateId {
        let id = self.next_aggregate_id;
        self.next_aggregate_id += 1;
        id
    }

    fn label(&self, name: &str) -> Result<usize> {
        self.label_map.get(name).copied().ok_or_else(|| CorvidError::UndefinedLabel { label: name.to_string() })
    }

    fn call(&mut self, result: &str, name: &str, argc: usize) -> Result<Flow> {
        let mut params = Vec::with_capacity(argc);
        for _ in 0..argc {
            params.insert(0, self.value_stack.pop().ok_or(CorvidError::CallStackUnderflow)?);
        }
        self.value_stack.clear();

        match name {
            "print" => {
                builtins::print(&params)?;
                Ok(Flow::Next)
            }
            "input" => {
                let value = builtins::input(&params)?;
                self.store(result, value);
                Ok(Flow::Next)
            }
            _ => {
                let target = self.label(name)?;
                self.return_stack.push(self.pc + 1);
                self.call_result_stack.push(result.to_string());
                let mut new_frame = Frame::default();
                if let Some(param_names) = self.function_params.get(name) {
                    for (n, v) in param_names.iter().zip(params) {
                        new_frame.locals.insert(n.clone(), v);
                    }
                }
                self.frames.push(new_frame);
                Ok(Flow::Jump(target))
            }
        }
    }

    fn do_return(&mut self, value: Option<&str>) -> Result<Flow> {
        let return_value = match value {
            Some(v) => Some(self.get_value(v)?),
            None => None,
        };
        let Some(return_pc) = self.return_stack.pop() else {
            return Ok(Flow::Halt(return_value));
        };
        self.frames.pop();
        if let Some(result_var) = self.call_result_stack.pop() {
            if !result_var.is_empty() {
                if let Some(v) = &return_value {
                    self.store(&result_var, v.clone());
                }
            }
        }
        self.value_stack.clear();
        if let Some(v) = &return_value {
            self.value_stack.push(v.clone());
        }
        Ok(Flow::Jump(return_pc))
    }
}

/// Runs a compiled program and returns `main`'s result.
pub fn run(tac: TacProgram) -> Result<Option<Value>> {
    run_with(tac, false)
}

/// Runs a compiled program, optionally tracing each executed instruction to
/// stderr as it runs.
pub fn run_with(tac: TacProgram, debug: bool) -> Result<Option<Value>> {
    let mut vm = Vm::new(tac)?;
    vm.set_debug(debug);
    vm.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irgen;
    use crate::parser::Parser;
    use crate::sema::Analyzer;

    fn run_source(src: &str) -> Option<Value> {
        let program = Parser::parse(src).expect("parses");
        let program = Analyzer::analyze(program).expect("type-checks");
        let tac = irgen::generate(&program).expect("lowers");
        run(tac).expect("executes")
    }

    #[test]
    fn straight_line_arithmetic() {
        assert_eq!(run_source("fn main() -> int { return 2 + 3 * 4; }"), Some(Value::Int(14)));
    }

    #[test]
    fn for_loop_accumulates_correctly() {
        let src = "fn main() -> int { int s = 0; for (int i = 1; i <= 5; i = i + 1) { s = s + i; } return s; }";
        assert_eq!(run_source(src), Some(Value::Int(15)));
    }

    #[test]
    fn recursive_call_computes_fibonacci() {
        let src = "fn fib(n: int) -> int { \
                if (n < 2) { return n; } else { return fib(n - 1) + fib(n - 2); } \
            } \
            fn main() -> int { return fib(10); }";
        assert_eq!(run_source(src), Some(Value::Int(55)));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let program = Parser::parse("fn main() -> int { int x = 1 / 0; return x; }").unwrap();
        let program = Analyzer::analyze(program).unwrap();
        let tac = irgen::generate(&program).unwrap();
        assert!(matches!(run(tac), Err(CorvidError::DivisionByZero)));
    }

    #[test]
    fn array_round_trips_through_store_and_load() {
        let src = "fn main() -> int { list<int> a = [10, 20, 30]; return a[1]; }";
        assert_eq!(run_source(src), Some(Value::Int(20)));
    }

    #[test]
    fn tuple_elements_cannot_be_overwritten() {
        // Lowering alone already writes each tuple slot exactly once, so this
        // exercises the VM's defense in depth rather than reachable source.
        let mut tac = TacProgram::new();
        tac.push(TacItem::Label { name: "main".to_string(), params: Some(vec![]) });
        let mut vm = Vm::new(tac).unwrap();
        let id = vm.new_aggregate();
        vm.tuples.insert(id, vec![None, None]);
        vm.arrays.clear();
        vm.store("t", Value::Tuple(id));
        vm.step(&Instr::TupleStore { tuple: "t".to_string(), index: "0".to_string(), value: "1".to_string() })
            .unwrap();
        let second = vm.step(&Instr::TupleStore {
            tuple: "t".to_string(),
            index: "0".to_string(),
            value: "2".to_string(),
        });
        assert!(matches!(second, Err(CorvidError::TupleOverwrite { index: 0 })));
    }
}
