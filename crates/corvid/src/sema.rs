//! Semantic analysis: resolves types, enforces scoping, and rejects
//! ill-typed programs. Walks the AST and rebuilds it with each
//! `IndexAccess`'s resolved collection kind (`array` vs. `tuple`) baked in,
//! so IR generation never has to re-derive it.

use crate::ast::*;
use crate::error::{CorvidError, Result};
use crate::symbol::{ScopeArena, Symbol, SymbolKind};
use crate::types::Type;

pub struct Analyzer {
    scopes: ScopeArena,
    current_function: Option<Symbol>,
}

impl Analyzer {
    pub fn new() -> Self {
        let mut scopes = ScopeArena::new();
        scopes
            .define(Symbol::function("input", Type::str(), vec![("prompt".to_string(), Type::str())], false))
            .expect("fresh global scope");
        scopes
            .define(Symbol::function("print", Type::void(), vec![], true))
            .expect("fresh global scope");
        Self {
            scopes,
            current_function: None,
        }
    }

    pub fn analyze(program: Program) -> Result<Program> {
        let mut analyzer = Self::new();
        analyzer.check_program(program)
    }

    fn check_program(&mut self, program: Program) -> Result<Program> {
        let declarations = program
            .declarations
            .into_iter()
            .map(|d| self.check_decl(d))
            .collect::<Result<Vec<_>>>()?;
        Ok(Program { declarations })
    }

    fn check_decl(&mut self, decl: Decl) -> Result<Decl> {
        Ok(match decl {
            Decl::Import(modules) => Decl::Import(modules),
            Decl::Comment(c) => Decl::Comment(c),
            Decl::Function(f) => Decl::Function(self.check_function_decl(f)?),
            Decl::Class(c) => Decl::Class(self.check_class_decl(c)?),
        })
    }

    fn check_class_decl(&mut self, class: ClassDecl) -> Result<ClassDecl> {
        if self.scopes.lookup(&class.name).is_some() {
            return Err(CorvidError::DuplicateDefinition {
                name: class.name.clone(),
                span: crate::diagnostic::Span::default(),
            });
        }
        self.scopes.define(Symbol::class(&class.name)).ok();

        self.scopes.push_scope();
        let members = class
            .members
            .into_iter()
            .map(|m| self.check_member(m))
            .collect::<Result<Vec<_>>>()?;
        self.scopes.pop_scope();

        Ok(ClassDecl {
            name: class.name,
            base: class.base,
            members,
        })
    }

    fn check_member(&mut self, member: Member) -> Result<Member> {
        Ok(match member {
            Member::Comment(c) => Member::Comment(c),
            Member::Var(v) => Member::Var(self.check_member_var_decl(v)?),
            Member::Function(f) => Member::Function(self.check_member_function_decl(f)?),
        })
    }

    fn check_member_var_decl(&mut self, decl: MemberVarDecl) -> Result<MemberVarDecl> {
        let var_type = resolve_type_str(&decl.var_type);
        self.scopes
            .define(Symbol::variable(&decl.name, var_type.clone()))
            .map_err(|_| CorvidError::DuplicateDefinition {
                name: decl.name.clone(),
                span: crate::diagnostic::Span::default(),
            })?;
        let init = match decl.init {
            Some(e) => {
                let (e, init_ty) = self.check_expr(e)?;
                if !init_ty.is_assignable_to(&var_type) {
                    return Err(CorvidError::TypeMismatch {
                        expected: var_type.to_string(),
                        found: init_ty.to_string(),
                        span: e.span(),
                    });
                }
                Some(e)
            }
            None => None,
        };
        Ok(MemberVarDecl {
            var_type: decl.var_type,
            name: decl.name,
            init,
            is_public: decl.is_public,
        })
    }

    fn check_member_function_decl(&mut self, decl: MemberFunctionDecl) -> Result<MemberFunctionDecl> {
        let f = self.check_function_like(decl.return_type, decl.name, decl.params, decl.body)?;
        Ok(MemberFunctionDecl {
            return_type: f.0,
            name: f.1,
            params: f.2,
            body: f.3,
            is_public: decl.is_public,
        })
    }

    fn check_function_decl(&mut self, decl: FunctionDecl) -> Result<FunctionDecl> {
        let span = decl.span;
        let f = self.check_function_like(decl.return_type, decl.name, decl.params, decl.body)?;
        Ok(FunctionDecl {
            return_type: f.0,
            name: f.1,
            params: f.2,
            body: f.3,
            span,
        })
    }

    #[allow(clippy::type_complexity)]
    fn check_function_like(
        &mut self,
        return_type: String,
        name: String,
        params: Vec<Parameter>,
        body: CompoundStmt,
    ) -> Result<(String, String, Vec<Parameter>, CompoundStmt)> {
        let resolved_return = resolve_type_str(&return_type);
        let resolved_params: Vec<(String, Type)> = params
            .iter()
            .map(|p| (p.name.clone(), resolve_type_str(&p.ty)))
            .collect();

        let func_symbol = Symbol::function(&name, resolved_return.clone(), resolved_params.clone(), false);
        self.scopes
            .define(func_symbol.clone())
            .map_err(|_| CorvidError::DuplicateDefinition {
                name: name.clone(),
                span: crate::diagnostic::Span::default(),
            })?;

        let enclosing_function = self.current_function.take();
        self.current_function = Some(func_symbol);

        self.scopes.push_scope();
        for (param_name, param_type) in &resolved_params {
            self.scopes
                .define(Symbol::variable(param_name, param_type.clone()))
                .map_err(|_| CorvidError::DuplicateDefinition {
                    name: param_name.clone(),
                    span: crate::diagnostic::Span::default(),
                })?;
        }

        let body = self.check_compound(body)?;

        self.scopes.pop_scope();
        self.current_function = enclosing_function;

        Ok((return_type, name, params, body))
    }

    fn check_compound(&mut self, compound: CompoundStmt) -> Result<CompoundStmt> {
        self.scopes.push_scope();
        let statements = compound
            .statements
            .into_iter()
            .map(|s| self.check_stmt(s))
            .collect::<Result<Vec<_>>>();
        self.scopes.pop_scope();
        Ok(CompoundStmt {
            statements: statements?,
        })
    }

    fn check_stmt(&mut self, stmt: Stmt) -> Result<Stmt> {
        Ok(match stmt {
            Stmt::Comment(c) => Stmt::Comment(c),
            Stmt::Break(s) => Stmt::Break(s),
            Stmt::Continue(s) => Stmt::Continue(s),
            Stmt::VarDecl(v) => Stmt::VarDecl(self.check_var_decl(v)?),
            Stmt::Compound(c) => Stmt::Compound(self.check_compound(c)?),
            Stmt::ExprStmt(e) => Stmt::ExprStmt(self.check_expr(e)?.0),
            Stmt::Return(expr, span) => self.check_return(expr, span)?,
            Stmt::If(i) => Stmt::If(self.check_if(i)?),
            Stmt::For(f) => Stmt::For(self.check_for(f)?),
        })
    }

    fn check_var_decl(&mut self, decl: VarDecl) -> Result<VarDecl> {
        let var_type = resolve_type_str(&decl.var_type);
        let init = match decl.init {
            Some(e) => {
                let (e, init_ty) = self.check_expr(e)?;
                if !init_ty.is_assignable_to(&var_type) {
                    return Err(CorvidError::TypeMismatch {
                        expected: var_type.to_string(),
                        found: init_ty.to_string(),
                        span: e.span(),
                    });
                }
                Some(e)
            }
            None => None,
        };
        self.scopes
            .define(Symbol::variable(&decl.name, var_type))
            .map_err(|_| CorvidError::DuplicateDefinition {
                name: decl.name.clone(),
                span: decl.span,
            })?;
        Ok(VarDecl {
            var_type: decl.var_type,
            name: decl.name,
            init,
            span: decl.span,
        })
    }

    fn check_return(&mut self, expr: Option<Expr>, span: crate::diagnostic::Span) -> Result<Stmt> {
        let Some(func) = self.current_function.clone() else {
            return Err(CorvidError::ReturnOutsideFunction { span });
        };
        match expr {
            Some(e) => {
                let (e, ty) = self.check_expr(e)?;
                if !ty.is_assignable_to(&func.ty) {
                    return Err(CorvidError::TypeMismatch {
                        expected: func.ty.to_string(),
                        found: ty.to_string(),
                        span: e.span(),
                    });
                }
                Ok(Stmt::Return(Some(e), span))
            }
            None => {
                if !func.ty.is_void() {
                    return Err(CorvidError::TypeMismatch {
                        expected: func.ty.to_string(),
                        found: "void".to_string(),
                        span,
                    });
                }
                Ok(Stmt::Return(None, span))
            }
        }
    }

    fn check_if(&mut self, stmt: IfStmt) -> Result<IfStmt> {
        let (condition, cond_ty) = self.check_expr(stmt.condition)?;
        if !cond_ty.is_bool() {
            return Err(CorvidError::NonBoolCondition {
                found: cond_ty.to_string(),
                span: condition.span(),
            });
        }
        let then_branch = self.check_compound(stmt.then_branch)?;
        let elif_branches = stmt
            .elif_branches
            .into_iter()
            .map(|b| self.check_elif(b))
            .collect::<Result<Vec<_>>>()?;
        let else_branch = match stmt.else_branch {
            Some(b) => Some(self.check_compound(b)?),
            None => None,
        };
        Ok(IfStmt {
            condition,
            then_branch,
            elif_branches,
            else_branch,
        })
    }

    fn check_elif(&mut self, branch: ElifBranch) -> Result<ElifBranch> {
        let (condition, cond_ty) = self.check_expr(branch.condition)?;
        if !cond_ty.is_bool() {
            return Err(CorvidError::NonBoolCondition {
                found: cond_ty.to_string(),
                span: condition.span(),
            });
        }
        let body = self.check_compound(branch.body)?;
        Ok(ElifBranch { condition, body })
    }

    fn check_for(&mut self, stmt: ForStmt) -> Result<ForStmt> {
        self.scopes.push_scope();

        let initializer = match stmt.initializer {
            Some(init) => Some(Box::new(match *init {
                ForInit::VarDecl(v) => ForInit::VarDecl(self.check_var_decl(v)?),
                ForInit::Expr(e) => ForInit::Expr(self.check_expr(e)?.0),
            })),
            None => None,
        };

        let condition = match stmt.condition {
            Some(c) => {
                let (c, ty) = self.check_expr(c)?;
                if !ty.is_bool() {
                    return Err(CorvidError::NonBoolCondition {
                        found: ty.to_string(),
                        span: c.span(),
                    });
                }
                Some(c)
            }
            None => None,
        };

        let update = match stmt.update {
            Some(u) => Some(self.check_expr(u)?.0),
            None => None,
        };

        let body = self.check_compound(stmt.body)?;
        self.scopes.pop_scope();

        Ok(ForStmt {
            initializer,
            condition,
            update,
            body,
        })
    }

    fn check_expr(&mut self, expr: Expr) -> Result<(Expr, Type)> {
        match expr {
            Expr::Literal(lit, span) => {
                let ty = match &lit {
                    Literal::Int(_) => Type::int(),
                    Literal::Float(_) => Type::float(),
                    Literal::Bool(_) => Type::bool(),
                    Literal::Str(_) => Type::str(),
                };
                Ok((Expr::Literal(lit, span), ty))
            }
            Expr::Variable(name, span) => {
                let ty = self
                    .scopes
                    .lookup(&name)
                    .ok_or_else(|| CorvidError::UndefinedName {
                        name: name.clone(),
                        span,
                    })?
                    .ty
                    .clone();
                Ok((Expr::Variable(name, span), ty))
            }
            Expr::Binary(left, op, right, span) => self.check_binary(*left, op, *right, span),
            Expr::Unary(op, operand, prefix, span) => self.check_unary(op, *operand, prefix, span),
            Expr::Assignment(target, op, value, span) => self.check_assignment(*target, op, *value, span),
            Expr::Call(name, args, span) => self.check_call(name, args, span),
            Expr::List(elems, span) => self.check_list(elems, span),
            Expr::Tuple(elems, span) => self.check_tuple(elems, span),
            Expr::Index(collection, index, _, span) => self.check_index(*collection, *index, span),
        }
    }

    fn check_binary(&mut self, left: Expr, op: BinOp, right: Expr, span: crate::diagnostic::Span) -> Result<(Expr, Type)> {
        let (left, left_ty) = self.check_expr(left)?;
        let (right, right_ty) = self.check_expr(right)?;

        let result_ty = if op.is_arithmetic() {
            if left_ty.is_numeric() && right_ty.is_numeric() {
                if matches!(left_ty, Type::Base(ref n) if n == "float") || matches!(right_ty, Type::Base(ref n) if n == "float") {
                    Type::float()
                } else {
                    Type::int()
                }
            } else {
                return Err(CorvidError::TypeMismatch {
                    expected: "int or float".to_string(),
                    found: format!("{left_ty} and {right_ty}"),
                    span,
                });
            }
        } else if op.is_comparison() {
            if left_ty == right_ty {
                Type::bool()
            } else {
                return Err(CorvidError::TypeMismatch {
                    expected: left_ty.to_string(),
                    found: right_ty.to_string(),
                    span,
                });
            }
        } else {
            debug_assert!(op.is_logical());
            if left_ty.is_bool() && right_ty.is_bool() {
                Type::bool()
            } else {
                return Err(CorvidError::TypeMismatch {
                    expected: "bool".to_string(),
                    found: format!("{left_ty} and {right_ty}"),
                    span,
                });
            }
        };

        Ok((Expr::Binary(Box::new(left), op, Box::new(right), span), result_ty))
    }

    fn check_unary(&mut self, op: UnaryOp, operand: Expr, prefix: bool, span: crate::diagnostic::Span) -> Result<(Expr, Type)> {
        let (operand, operand_ty) = self.check_expr(operand)?;
        let ty = match op {
            UnaryOp::Not if operand_ty.is_bool() => Type::bool(),
            UnaryOp::Not => {
                return Err(CorvidError::TypeMismatch {
                    expected: "bool".to_string(),
                    found: operand_ty.to_string(),
                    span,
                })
            }
            UnaryOp::Neg if operand_ty.is_numeric() => operand_ty.clone(),
            UnaryOp::Neg => {
                return Err(CorvidError::TypeMismatch {
                    expected: "int or float".to_string(),
                    found: operand_ty.to_string(),
                    span,
                })
            }
            UnaryOp::Inc | UnaryOp::Dec if operand_ty.is_numeric() => operand_ty.clone(),
            UnaryOp::Inc | UnaryOp::Dec => {
                return Err(CorvidError::TypeMismatch {
                    expected: "int or float".to_string(),
                    found: operand_ty.to_string(),
                    span,
                })
            }
        };
        Ok((Expr::Unary(op, Box::new(operand), prefix, span), ty))
    }

    fn check_assignment(&mut self, target: Expr, op: AssignOp, value: Expr, span: crate::diagnostic::Span) -> Result<(Expr, Type)> {
        let (target, target_ty) = self.check_expr(target)?;
        let (value, value_ty) = self.check_expr(value)?;

        if !value_ty.is_assignable_to(&target_ty) {
            return Err(CorvidError::TypeMismatch {
                expected: target_ty.to_string(),
                found: value_ty.to_string(),
                span,
            });
        }

        if let Expr::Index(_, _, IndexKind::Tuple, _) = &target {
            return Err(CorvidError::TupleElementAssignment { span });
        }

        Ok((Expr::Assignment(Box::new(target), op, Box::new(value), span), target_ty))
    }

    fn check_call(&mut self, name: String, args: Vec<Expr>, span: crate::diagnostic::Span) -> Result<(Expr, Type)> {
        let symbol = self
            .scopes
            .lookup(&name)
            .ok_or_else(|| CorvidError::UndefinedName {
                name: name.clone(),
                span,
            })?
            .clone();

        if symbol.kind != SymbolKind::Function {
            return Err(CorvidError::NotAFunction { name, span });
        }

        let mut checked_args = Vec::with_capacity(args.len());
        if symbol.is_variadic {
            for arg in args {
                checked_args.push(self.check_expr(arg)?.0);
            }
        } else {
            if symbol.params.len() != args.len() {
                return Err(CorvidError::ArityMismatch {
                    name: name.clone(),
                    expected: symbol.params.len(),
                    found: args.len(),
                    span,
                });
            }
            for (arg, (param_name, param_ty)) in args.into_iter().zip(symbol.params.iter()) {
                let (arg, arg_ty) = self.check_expr(arg)?;
                if !arg_ty.is_assignable_to(param_ty) {
                    return Err(CorvidError::TypeMismatch {
                        expected: format!("{param_ty} (parameter '{param_name}')"),
                        found: arg_ty.to_string(),
                        span: arg.span(),
                    });
                }
                checked_args.push(arg);
            }
        }

        Ok((Expr::Call(name, checked_args, span), symbol.ty.clone()))
    }

    fn check_list(&mut self, elems: Vec<Expr>, span: crate::diagnostic::Span) -> Result<(Expr, Type)> {
        if elems.is_empty() {
            return Err(CorvidError::EmptyListLiteral { span });
        }
        let mut checked = Vec::with_capacity(elems.len());
        let mut iter = elems.into_iter();
        let (first, first_ty) = self.check_expr(iter.next().unwrap())?;
        checked.push(first);
        for elem in iter {
            let (elem, elem_ty) = self.check_expr(elem)?;
            if !elem_ty.is_assignable_to(&first_ty) && !first_ty.is_assignable_to(&elem_ty) {
                return Err(CorvidError::TypeMismatch {
                    expected: first_ty.to_string(),
                    found: elem_ty.to_string(),
                    span: elem.span(),
                });
            }
            checked.push(elem);
        }
        Ok((Expr::List(checked, span), Type::List(Box::new(first_ty))))
    }

    fn check_tuple(&mut self, elems: Vec<Expr>, span: crate::diagnostic::Span) -> Result<(Expr, Type)> {
        let mut checked = Vec::with_capacity(elems.len());
        let mut types = Vec::with_capacity(elems.len());
        for elem in elems {
            let (elem, ty) = self.check_expr(elem)?;
            checked.push(elem);
            types.push(ty);
        }
        Ok((Expr::Tuple(checked, span), Type::Tuple(types)))
    }

    fn check_index(&mut self, collection: Expr, index: Expr, span: crate::diagnostic::Span) -> Result<(Expr, Type)> {
        let (collection, collection_ty) = self.check_expr(collection)?;

        let (element_ty, kind) = match &collection_ty {
            Type::List(elem) => ((**elem).clone(), IndexKind::Array),
            Type::Tuple(elems) => {
                let Expr::Literal(Literal::Int(i), _) = &index else {
                    return Err(CorvidError::NonConstantTupleIndex { span: index.span() });
                };
                let i = *i;
                if i < 0 || i as usize >= elems.len() {
                    return Err(CorvidError::TupleIndexOutOfRange {
                        index: i,
                        ty: collection_ty.to_string(),
                        span,
                    });
                }
                (elems[i as usize].clone(), IndexKind::Tuple)
            }
            other => {
                return Err(CorvidError::NotIndexable {
                    name: collection.to_string_hint(),
                    ty: other.to_string(),
                    span,
                })
            }
        };

        let (index, index_ty) = self.check_expr(index)?;
        if !index_ty.is_assignable_to(&Type::int()) {
            return Err(CorvidError::TypeMismatch {
                expected: "int".to_string(),
                found: index_ty.to_string(),
                span: index.span(),
            });
        }

        Ok((
            Expr::Index(Box::new(collection), Box::new(index), kind, span),
            element_ty,
        ))
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Expr {
    /// A short human-readable label for error messages that need to name an
    /// offending expression (e.g. "cannot index `x`").
    fn to_string_hint(&self) -> String {
        match self {
            Expr::Variable(name, _) => name.clone(),
            other => format!("{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze(src: &str) -> Result<Program> {
        let ast = Parser::parse(src).expect("parse should succeed");
        Analyzer::analyze(ast)
    }

    #[test]
    fn accepts_well_typed_program() {
        assert!(analyze("fn main() -> int { return 1 + 2 * 3; }").is_ok());
    }

    #[test]
    fn rejects_assignment_into_tuple_element() {
        let result = analyze(
            "fn main() -> int { tuple<int,str> t = (1, \"hi\"); t[0] = 2; return 0; }",
        );
        assert!(matches!(result, Err(CorvidError::TupleElementAssignment { .. })));
    }

    #[test]
    fn rejects_call_to_undefined_function() {
        let result = analyze("fn main() -> int { return nope(); }");
        assert!(matches!(result, Err(CorvidError::UndefinedName { .. })));
    }

    #[test]
    fn rejects_non_literal_tuple_index() {
        let result = analyze(
            "fn main() -> int { tuple<int,int> t = (1, 2); int i = 0; return t[i]; }",
        );
        assert!(matches!(result, Err(CorvidError::NonConstantTupleIndex { .. })));
    }

    #[test]
    fn rejects_non_bool_if_condition() {
        let result = analyze("fn main() -> int { if (1) { return 1; } return 0; }");
        assert!(matches!(result, Err(CorvidError::NonBoolCondition { .. })));
    }

    #[test]
    fn resolves_index_kind_for_arrays_and_tuples() {
        let prog = analyze(
            "fn main() -> int { list<int> xs = [1,2,3]; tuple<int,int> t = (1,2); return xs[0] + t[0]; }",
        )
        .unwrap();
        let Decl::Function(f) = &prog.declarations[0] else { panic!() };
        let Stmt::Return(Some(Expr::Binary(left, _, right, _)), _) = &f.body.statements[2] else {
            panic!()
        };
        assert!(matches!(**left, Expr::Index(_, _, IndexKind::Array, _)));
        assert!(matches!(**right, Expr::Index(_, _, IndexKind::Tuple, _)));
    }

    #[test]
    fn elif_branches_are_type_checked() {
        let result = analyze(
            "fn main() -> int { if (true) { return 1; } elif (1) { return 2; } return 0; }",
        );
        assert!(matches!(result, Err(CorvidError::NonBoolCondition { .. })));
    }
}
