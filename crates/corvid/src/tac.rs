//! Three-address code: the flat, labeled instruction list IR generation
//! produces and the VM executes. `Display` renders the stable wire syntax
//! used by `-g` and by golden-output tests.

use std::fmt;

use crate::ast::BinOp;

/// A program point: either a label (optionally carrying a function's
/// ordered parameter names) or an executable instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum TacItem {
    Label { name: String, params: Option<Vec<String>> },
    Instr(Instr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// `result = value`
    Assign { result: String, value: String },
    /// `result = arg1 op arg2`
    Binary {
        result: String,
        op: BinOp,
        arg1: String,
        arg2: String,
    },
    /// `result = op arg1` (unary `!`/`-`)
    Unary { result: String, op: String, arg1: String },
    Param { value: String },
    /// `result = call name, argc`
    Call { result: String, name: String, argc: usize },
    Return { value: Option<String> },
    Goto { label: String },
    IfGoto { cond: String, label: String },
    AllocArray { result: String, size: usize },
    AllocTuple { result: String, size: usize },
    ArrayStore { array: String, index: String, value: String },
    TupleStore { tuple: String, index: String, value: String },
    ArrayLoad { result: String, array: String, index: String },
    TupleLoad { result: String, tuple: String, index: String },
}

impl fmt::Display for TacItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TacItem::Label { name, .. } => write!(f, "{name}:"),
            TacItem::Instr(instr) => write!(f, "{instr}"),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Assign { result, value } => write!(f, "{result} = {value}"),
            Instr::Binary { result, op, arg1, arg2 } => {
                write!(f, "{result} = {arg1} {} {arg2}", op.as_str())
            }
            Instr::Unary { result, op, arg1 } => write!(f, "{result} = {op} {arg1}"),
            Instr::Param { value } => write!(f, "param {value}"),
            Instr::Call { result, name, argc } => write!(f, "{result} = call {name}, {argc}"),
            Instr::Return { value: Some(v) } => write!(f, "return {v}"),
            Instr::Return { value: None } => write!(f, "return"),
            Instr::Goto { label } => write!(f, "goto {label}"),
            Instr::IfGoto { cond, label } => write!(f, "if {cond} goto {label}"),
            Instr::AllocArray { result, size } => write!(f, "{result} = new array[{size}]"),
            Instr::AllocTuple { result, size } => write!(f, "{result} = new tuple[{size}]"),
            Instr::ArrayStore { array, index, value } => {
                write!(f, "array_store {array}[{index}] = {value}")
            }
            Instr::TupleStore { tuple, index, value } => {
                write!(f, "tuple_store {tuple}[{index}] = {value}")
            }
            Instr::ArrayLoad { result, array, index } => write!(f, "{result} = {array}[{index}]"),
            Instr::TupleLoad { result, tuple, index } => write!(f, "{result} = {tuple}[{index}]"),
        }
    }
}

/// The full ordered instruction list produced by IR generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TacProgram {
    pub items: Vec<TacItem>,
}

impl TacProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: TacItem) {
        self.items.push(item);
    }

    pub fn push_instr(&mut self, instr: Instr) {
        self.items.push(TacItem::Instr(instr));
    }

    pub fn push_label(&mut self, name: String) {
        self.items.push(TacItem::Label { name, params: None });
    }

    /// Builds the index mapping each label name to its position in `items`,
    /// and the parameter-name list for each function-entry label.
    pub fn build_label_map(&self) -> (std::collections::HashMap<String, usize>, std::collections::HashMap<String, Vec<String>>) {
        let mut label_map = std::collections::HashMap::new();
        let mut function_params = std::collections::HashMap::new();
        for (i, item) in self.items.iter().enumerate() {
            if let TacItem::Label { name, params } = item {
                label_map.insert(name.clone(), i);
                if let Some(params) = params {
                    function_params.insert(name.clone(), params.clone());
                }
            }
        }
        (label_map, function_params)
    }
}

impl fmt::Display for TacProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.items.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_binary_instruction() {
        let instr = Instr::Binary {
            result: "t0".to_string(),
            op: BinOp::Add,
            arg1: "1".to_string(),
            arg2: "2".to_string(),
        };
        assert_eq!(instr.to_string(), "t0 = 1 + 2");
    }

    #[test]
    fn renders_call_and_return() {
        assert_eq!(
            Instr::Call {
                result: "t1".to_string(),
                name: "fib".to_string(),
                argc: 1
            }
            .to_string(),
            "t1 = call fib, 1"
        );
        assert_eq!(Instr::Return { value: Some("t1".to_string()) }.to_string(), "return t1");
        assert_eq!(Instr::Return { value: None }.to_string(), "return");
    }

    #[test]
    fn label_map_records_function_params() {
        let mut prog = TacProgram::new();
        prog.push(TacItem::Label {
            name: "fib".to_string(),
            params: Some(vec!["n".to_string()]),
        });
        prog.push_instr(Instr::Return { value: Some("n".to_string()) });
        let (label_map, function_params) = prog.build_label_map();
        assert_eq!(label_map["fib"], 0);
        assert_eq!(function_params["fib"], vec!["n".to_string()]);
    }
}
