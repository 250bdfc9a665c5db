//! Lowers a type-checked `Program` into a flat `TacProgram`. Runs after
//! semantic analysis, so every name is already known to resolve and every
//! `Expr::Index` already carries its resolved `IndexKind` — this pass only
//! has to pick instructions, not re-derive meaning.

use std::collections::HashSet;

use crate::ast::{
    AssignOp, BinOp, CompoundStmt, Decl, Expr, ForInit, ForStmt, FunctionDecl, IfStmt, IndexKind,
    Program, Stmt, UnaryOp,
};
use crate::diagnostic::Span;
use crate::error::{CorvidError, Result};
use crate::tac::{Instr, TacItem, TacProgram};

struct LoopCtx {
    /// Where `continue` jumps: the update clause, not the top of the loop,
    /// so the update still runs before the condition is re-checked.
    continue_target: String,
    end_label: String,
}

struct IrGen {
    tac: TacProgram,
    temp_count: u64,
    label_count: u64,
    var_scopes: Vec<HashSet<String>>,
    loop_stack: Vec<LoopCtx>,
    has_return: bool,
}

/// Lowers `program` to three-address code. Functions are emitted with `main`
/// first, followed by the rest in source order, regardless of where `main`
/// appears in the declaration list — the entry point belongs at the top of
/// the instruction stream. Class declarations are type-checked but emit no
/// code: they remain declarations-only.
pub fn generate(program: &Program) -> Result<TacProgram> {
    let mut gen = IrGen::new();

    let mut main_fn = None;
    let mut other_fns = Vec::new();
    for decl in &program.declarations {
        if let Decl::Function(f) = decl {
            if f.name == "main" {
                main_fn = Some(f);
            } else {
                other_fns.push(f);
            }
        }
    }

    if let Some(f) = main_fn {
        gen.lower_function(f)?;
    }
    for f in other_fns {
        gen.lower_function(f)?;
    }

    Ok(gen.tac)
}

impl IrGen {
    fn new() -> Self {
        Self {
            tac: TacProgram::new(),
            temp_count: 0,
            label_count: 0,
            var_scopes: vec![HashSet::new()],
            loop_stack: Vec::new(),
            has_return: false,
        }
    }

    fn new_temp(&mut self) -> String {
        let n = self.temp_count;
        self.temp_count += 1;
        format!("t{n}")
    }

    fn new_label(&mut self) -> String {
        let n = self.label_count;
        self.label_count += 1;
        format!("L{n}")
    }

    fn emit(&mut self, instr: Instr) {
        self.tac.push_instr(instr);
    }

    fn push_label(&mut self, name: String) {
        self.tac.push_label(name);
    }

    fn push_scope(&mut self) {
        self.var_scopes.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        if self.var_scopes.len() > 1 {
            self.var_scopes.pop();
        }
    }

    fn declare(&mut self, name: String) {
        self.var_scopes.last_mut().expect("at least global scope").insert(name);
    }

    fn is_known(&self, name: &str) -> bool {
        self.var_scopes.iter().rev().any(|s| s.contains(name))
    }

    fn require_known(&self, name: &str, span: Span) -> Result<()> {
        if self.is_known(name) {
            Ok(())
        } else {
            Err(CorvidError::UndefinedAtLowering { name: name.to_string(), span })
        }
    }

    fn lower_function(&mut self, f: &FunctionDecl) -> Result<()> {
        let param_names: Vec<String> = f.params.iter().map(|p| p.name.clone()).collect();
        self.tac.push(TacItem::Label { name: f.name.clone(), params: Some(param_names.clone()) });

        self.push_scope();
        for name in &param_names {
            self.declare(name.clone());
        }
        let saved_has_return = self.has_return;
        self.has_return = false;

        self.lower_compound(&f.body)?;
        if !self.has_return {
            self.emit(Instr::Return { value: None });
        }

        self.has_return = saved_has_return;
        self.pop_scope();
        Ok(())
    }

    fn lower_compound(&mut self, c: &CompoundStmt) -> Result<()> {
        self.push_scope();
        for stmt in &c.statements {
            self.lower_stmt(stmt)?;
        }
        self.pop_scope();
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl(v) => {
                if let Some(init) = &v.init {
                    let value = self.lower_expr(init)?;
                    self.emit(Instr::Assign { result: v.name.clone(), value });
                }
                self.declare(v.name.clone());
                Ok(())
            }
            Stmt::Compound(c) => self.lower_compound(c),
            Stmt::Return(expr, _) => {
                self.has_return = true;
                let value = match expr {
                    Some(e) => Some(self.lower_expr(e)?),
                    None => None,
                };
                self.emit(Instr::Return { value });
                Ok(())
            }
            Stmt::ExprStmt(e) => {
                self.lower_expr(e)?;
                Ok(())
            }
            Stmt::If(if_stmt) => self.lower_if(if_stmt),
            Stmt::For(for_stmt) => self.lower_for(for_stmt),
            Stmt::Break(span) => {
                let end_label = self
                    .loop_stack
                    .last()
                    .map(|l| l.end_label.clone())
                    .ok_or(CorvidError::LoopControlOutsideLoop { keyword: "break".to_string(), span: *span })?;
                self.emit(Instr::Goto { label: end_label });
                Ok(())
            }
            Stmt::Continue(span) => {
                let target = self
                    .loop_stack
                    .last()
                    .map(|l| l.continue_target.clone())
                    .ok_or(CorvidError::LoopControlOutsideLoop { keyword: "continue".to_string(), span: *span })?;
                self.emit(Instr::Goto { label: target });
                Ok(())
            }
            Stmt::Comment(_) => Ok(()),
        }
    }

    /// Lowers an `if`/`elif*`/`else?` chain. `elif` branches are not a
    /// distinct construct at this level: each is lowered as the `else` of
    /// its predecessor, recursing down the chain until it bottoms out at the
    /// trailing `else` (or nothing).
    fn lower_if(&mut self, if_stmt: &IfStmt) -> Result<()> {
        self.lower_if_chain(
            &if_stmt.condition,
            &if_stmt.then_branch,
            &if_stmt.elif_branches,
            if_stmt.else_branch.as_ref(),
        )
    }

    fn lower_if_chain(
        &mut self,
        cond: &Expr,
        then_branch: &CompoundStmt,
        elifs: &[crate::ast::ElifBranch],
        else_branch: Option<&CompoundStmt>,
    ) -> Result<()> {
        let cond_val = self.lower_expr(cond)?;
        let true_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instr::IfGoto { cond: cond_val, label: true_label.clone() });
        if let Some((next, rest)) = elifs.split_first() {
            self.lower_if_chain(&next.condition, &next.body, rest, else_branch)?;
        } else if let Some(else_branch) = else_branch {
            self.lower_compound(else_branch)?;
        }
        self.emit(Instr::Goto { label: end_label.clone() });
        self.push_label(true_label);
        self.lower_compound(then_branch)?;
        self.push_label(end_label);
        Ok(())
    }

    fn lower_for(&mut self, f: &ForStmt) -> Result<()> {
        self.push_scope();

        let start_label = self.new_label();
        let end_label = self.new_label();
        let update_label = self.new_label();
        self.loop_stack.push(LoopCtx {
            continue_target: update_label.clone(),
            end_label: end_label.clone(),
        });

        if let Some(init) = &f.initializer {
            self.lower_for_init(init)?;
        }

        self.push_label(start_label.clone());
        if let Some(cond) = &f.condition {
            let cond_val = self.lower_expr(cond)?;
            let negated = self.new_temp();
            self.emit(Instr::Unary { result: negated.clone(), op: "!".to_string(), arg1: cond_val });
            self.emit(Instr::IfGoto { cond: negated, label: end_label.clone() });
        }

        self.lower_compound(&f.body)?;

        self.push_label(update_label);
        if let Some(update) = &f.update {
            self.lower_expr(update)?;
        }
        self.emit(Instr::Goto { label: start_label });
        self.push_label(end_label);

        self.loop_stack.pop();
        self.pop_scope();
        Ok(())
    }

    fn lower_for_init(&mut self, init: &ForInit) -> Result<()> {
        match init {
            ForInit::VarDecl(v) => {
                if let Some(e) = &v.init {
                    let value = self.lower_expr(e)?;
                    self.emit(Instr::Assign { result: v.name.clone(), value });
                }
                self.declare(v.name.clone());
            }
            ForInit::Expr(e) => {
                self.lower_expr(e)?;
            }
        }
        Ok(())
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Literal(lit, _) => Ok(literal_text(lit)),
            Expr::Variable(name, span) => {
                self.require_known(name, *span)?;
                Ok(name.clone())
            }
            Expr::Binary(lhs, op, rhs, _) => {
                let lhs_val = self.lower_expr(lhs)?;
                let rhs_val = self.lower_expr(rhs)?;
                let result = self.new_temp();
                self.emit(Instr::Binary { result: result.clone(), op: *op, arg1: lhs_val, arg2: rhs_val });
                Ok(result)
            }
            Expr::Unary(op, operand, _, _) => self.lower_unary(*op, operand),
            Expr::Assignment(target, op, value, _) => self.lower_assignment(target, *op, value),
            Expr::Call(name, args, _) => self.lower_call(name, args),
            Expr::List(elems, _) => self.lower_aggregate(elems, true),
            Expr::Tuple(elems, _) => self.lower_aggregate(elems, false),
            Expr::Index(collection, index, kind, _) => self.lower_index(collection, index, *kind),
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<String> {
        match op {
            UnaryOp::Not => {
                let val = self.lower_expr(operand)?;
                let result = self.new_temp();
                self.emit(Instr::Unary { result: result.clone(), op: "!".to_string(), arg1: val });
                Ok(result)
            }
            UnaryOp::Neg => {
                let val = self.lower_expr(operand)?;
                let result = self.new_temp();
                self.emit(Instr::Unary { result: result.clone(), op: "-".to_string(), arg1: val });
                Ok(result)
            }
            UnaryOp::Inc | UnaryOp::Dec => {
                // Both prefix and postfix forms mutate the operand in place
                // and yield the post-mutation value; this language has no
                // distinct "old value" form of `++`/`--`.
                let var_name = self.lower_expr(operand)?;
                let binop = if op == UnaryOp::Inc { BinOp::Add } else { BinOp::Sub };
                self.emit(Instr::Binary {
                    result: var_name.clone(),
                    op: binop,
                    arg1: var_name.clone(),
                    arg2: "1".to_string(),
                });
                let result = self.new_temp();
                self.emit(Instr::Assign { result: result.clone(), value: var_name });
                Ok(result)
            }
        }
    }

    fn lower_assignment(&mut self, target: &Expr, op: AssignOp, value: &Expr) -> Result<String> {
        let value_val = self.lower_expr(value)?;
        match target {
            Expr::Variable(name, var_span) => {
                self.require_known(name, *var_span)?;
                let final_val = match op.as_binop() {
                    Some(binop) => {
                        let result = self.new_temp();
                        self.emit(Instr::Binary {
                            result: result.clone(),
                            op: binop,
                            arg1: name.clone(),
                            arg2: value_val,
                        });
                        result
                    }
                    None => value_val,
                };
                self.emit(Instr::Assign { result: name.clone(), value: final_val.clone() });
                Ok(name.clone())
            }
            Expr::Index(collection, index, kind, _) => {
                // Semantic analysis already rejects any assignment whose
                // target resolved to `IndexKind::Tuple`, so only array
                // targets ever reach lowering here.
                debug_assert_ne!(*kind, IndexKind::Tuple);
                let coll_val = self.lower_expr(collection)?;
                let idx_val = self.lower_expr(index)?;
                let final_val = match op.as_binop() {
                    Some(binop) => {
                        let current = self.new_temp();
                        self.emit(Instr::ArrayLoad {
                            result: current.clone(),
                            array: coll_val.clone(),
                            index: idx_val.clone(),
                        });
                        let result = self.new_temp();
                        self.emit(Instr::Binary {
                            result: result.clone(),
                            op: binop,
                            arg1: current,
                            arg2: value_val,
                        });
                        result
                    }
                    None => value_val,
                };
                self.emit(Instr::ArrayStore {
                    array: coll_val,
                    index: idx_val,
                    value: final_val.clone(),
                });
                Ok(final_val)
            }
            _ => unreachable!("semantic analysis guarantees an assignable target"),
        }
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> Result<String> {
        // Evaluate arguments right-to-left (so nested call side effects run
        // in that order) but emit `param` instructions left-to-right.
        let mut arg_vals = Vec::with_capacity(args.len());
        for arg in args.iter().rev() {
            arg_vals.push(self.lower_expr(arg)?);
        }
        arg_vals.reverse();
        for v in &arg_vals {
            self.emit(Instr::Param { value: v.clone() });
        }
        let result = self.new_temp();
        self.emit(Instr::Call { result: result.clone(), name: name.to_string(), argc: args.len() });
        Ok(result)
    }

    fn lower_aggregate(&mut self, elems: &[Expr], is_array: bool) -> Result<String> {
        let result = self.new_temp();
        if is_array {
            self.emit(Instr::AllocArray { result: result.clone(), size: elems.len() });
        } else {
            self.emit(Instr::AllocTuple { result: result.clone(), size: elems.len() });
        }
        for (i, elem) in elems.iter().enumerate() {
            let val = self.lower_expr(elem)?;
            if is_array {
                self.emit(Instr::ArrayStore { array: result.clone(), index: i.to_string(), value: val });
            } else {
                self.emit(Instr::TupleStore { tuple: result.clone(), index: i.to_string(), value: val });
            }
        }
        Ok(result)
    }

    fn lower_index(&mut self, collection: &Expr, index: &Expr, kind: IndexKind) -> Result<String> {
        let coll_val = self.lower_expr(collection)?;
        let idx_val = self.lower_expr(index)?;
        let result = self.new_temp();
        match kind {
            IndexKind::Tuple => {
                self.emit(Instr::TupleLoad { result: result.clone(), tuple: coll_val, index: idx_val });
            }
            IndexKind::Array | IndexKind::Unknown => {
                self.emit(Instr::ArrayLoad { result: result.clone(), array: coll_val, index: idx_val });
            }
        }
        Ok(result)
    }
}

fn literal_text(lit: &crate::ast::Literal) -> String {
    use crate::ast::Literal;
    match lit {
        Literal::Int(i) => i.to_string(),
        Literal::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{f:.1}")
            } else {
                f.to_string()
            }
        }
        Literal::Bool(b) => b.to_string(),
        Literal::Str(s) => format!("\"{s}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::sema::Analyzer;

    fn generate_from_source(src: &str) -> TacProgram {
        let program = Parser::parse(src).expect("parses");
        let program = Analyzer::new().analyze(program).expect("type-checks");
        generate(&program).expect("lowers")
    }

    #[test]
    fn lowers_simple_return() {
        let tac = generate_from_source("fn main() -> int { return 1 + 2; }");
        let text = tac.to_string();
        assert!(text.contains("main:"));
        assert!(text.contains("t0 = 1 + 2"));
        assert!(text.contains("return t0"));
    }

    #[test]
    fn for_loop_condition_is_not_inverted() {
        let tac = generate_from_source(
            "fn main() -> int { int s = 0; for (int i = 1; i <= 5; i = i + 1) { s = s + i; } return s; }",
        );
        let text = tac.to_string();
        // the comparison keeps its literal operator and operand order
        assert!(text.contains("i <= 5"));
        // exit check negates the condition rather than inverting the opcode
        assert!(text.contains("! t"));
        assert!(text.contains("if t") && text.contains("goto L"));
    }

    #[test]
    fn elif_chain_lowers_without_dropping_branches() {
        let tac = generate_from_source(
            "fn main() -> int { int x = 2; if (x == 0) { return 0; } elif (x == 1) { return 1; } else { return 2; } }",
        );
        let labels = tac
            .items
            .iter()
            .filter(|i| matches!(i, TacItem::Label { params: None, .. }))
            .count();
        // two if/elif levels => 4 labels (true/end per level)
        assert_eq!(labels, 4);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let program = Parser::parse("fn main() -> int { break; return 0; }").unwrap();
        let program = Analyzer::new().analyze(program).unwrap();
        assert!(matches!(generate(&program), Err(CorvidError::LoopControlOutsideLoop { .. })));
    }

    #[test]
    fn array_and_tuple_index_dispatch_on_resolved_kind() {
        let tac = generate_from_source(
            "fn main() -> int { list<int> a = [1, 2, 3]; tuple<int, int> t = (4, 5); return a[0] + t[1]; }",
        );
        let has_array_load = tac.items.iter().any(|item| {
            matches!(item, TacItem::Instr(Instr::ArrayLoad { array, .. }) if array.starts_with('t'))
        });
        let has_tuple_load = tac
            .items
            .iter()
            .any(|item| matches!(item, TacItem::Instr(Instr::TupleLoad { .. })));
        assert!(has_array_load, "expected an array_load against the list");
        assert!(has_tuple_load, "expected a tuple_load against the tuple");
    }

    #[test]
    fn missing_return_gets_a_trailing_bare_return() {
        let tac = generate_from_source("fn side_effect() -> void { int x = 1; }");
        let text = tac.to_string();
        assert!(text.trim_end().ends_with("return"));
    }
}
