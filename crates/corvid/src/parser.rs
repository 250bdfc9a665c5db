//! Recursive-descent parser. A cursor walks a precomputed token list with
//! single-token lookahead; `eat` asserts and consumes, `optional_eat` is a
//! no-op on mismatch.

use crate::ast::*;
use crate::diagnostic::Span;
use crate::error::{CorvidError, Result};
use crate::token::{Token, TokenKind};

const VAR_DECL_KEYWORDS: &[&str] = &["nil", "bool", "int", "float", "str", "tuple", "list"];

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program> {
        let tokens = crate::lexer::tokenize(source);
        Self::new(tokens).program()
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn span_here(&self) -> Span {
        let t = self.current();
        Span::new(t.pos, t.pos + t.text.len().max(1))
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn is_op(&self, value: &str) -> bool {
        self.current().kind == TokenKind::Operator && self.current().text == value
    }

    fn is_keyword(&self, value: &str) -> bool {
        self.current().kind == TokenKind::Keyword && self.current().text == value
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Result<String> {
        if self.current().kind == kind {
            let text = self.current().text.clone();
            self.advance();
            Ok(text)
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn eat_op(&mut self, value: &str) -> Result<()> {
        if self.is_op(value) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("OPERATOR with value '{value}'")))
        }
    }

    fn eat_keyword(&mut self, value: &str) -> Result<()> {
        if self.is_keyword(value) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("KEYWORD with value '{value}'")))
        }
    }

    fn optional_eat_op(&mut self, value: &str) {
        if self.is_op(value) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> CorvidError {
        let t = self.current();
        if t.kind == TokenKind::Eof {
            CorvidError::UnexpectedEof {
                expected: expected.to_string(),
                span: self.span_here(),
            }
        } else {
            CorvidError::UnexpectedToken {
                found: format!("{} ('{}')", t.kind, t.text),
                expected: expected.to_string(),
                span: self.span_here(),
            }
        }
    }

    // ---- declarations ------------------------------------------------

    fn program(&mut self) -> Result<Program> {
        let mut declarations = Vec::new();
        while !self.is(TokenKind::Eof) {
            if self.is(TokenKind::Comment) {
                declarations.push(Decl::Comment(self.comment()?));
            } else if self.is(TokenKind::Keyword) {
                match self.current().text.as_str() {
                    "import" => declarations.push(Decl::Import(self.import_statement()?)),
                    "fn" => declarations.push(Decl::Function(self.function_decl()?)),
                    "class" => declarations.push(Decl::Class(self.class_decl()?)),
                    other => {
                        return Err(CorvidError::UnexpectedToken {
                            found: format!("KEYWORD ('{other}')"),
                            expected: "'import', 'fn', or 'class' at top level".to_string(),
                            span: self.span_here(),
                        })
                    }
                }
            } else {
                return Err(self.unexpected("a declaration"));
            }
        }
        Ok(Program { declarations })
    }

    fn comment(&mut self) -> Result<String> {
        self.eat(TokenKind::Comment)
    }

    fn import_statement(&mut self) -> Result<Vec<String>> {
        self.eat_keyword("import")?;
        let mut modules = Vec::new();
        if self.is_op("(") {
            self.advance();
            while self.is(TokenKind::Str) {
                modules.push(self.current().unquoted().to_string());
                self.advance();
            }
            self.eat_op(")")?;
        } else if self.is(TokenKind::Str) {
            modules.push(self.current().unquoted().to_string());
            self.advance();
        } else {
            return Err(self.unexpected("a string literal or '(' after 'import'"));
        }
        self.optional_eat_op(";");
        Ok(modules)
    }

    fn function_decl(&mut self) -> Result<FunctionDecl> {
        let start = self.span_here();
        self.eat_keyword("fn")?;
        let name = self.eat(TokenKind::Identifier)?;
        self.eat_op("(")?;
        let params = self.parameter_list()?;
        self.eat_op(")")?;
        self.eat_op("->")?;
        let return_type = self.parse_type()?;
        let body = self.compound_statement()?;
        Ok(FunctionDecl {
            return_type,
            name,
            params,
            body,
            span: start,
        })
    }

    fn parameter_list(&mut self) -> Result<Vec<Parameter>> {
        let mut params = Vec::new();
        if self.is_op(")") {
            return Ok(params);
        }
        loop {
            let name = self.eat(TokenKind::Identifier)?;
            self.eat_op(":")?;
            let ty = self.parse_type()?;
            params.push(Parameter { ty, name });
            if self.is_op(",") {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_type(&mut self) -> Result<String> {
        if !matches!(self.current().kind, TokenKind::Keyword | TokenKind::Identifier) {
            return Err(self.unexpected("a type name"));
        }
        let base_type = self.current().text.clone();
        self.advance();

        if self.is_op("<") {
            self.advance();
            let mut type_params = vec![self.parse_type()?];
            while self.is_op(",") {
                self.advance();
                type_params.push(self.parse_type()?);
            }
            self.eat_op(">")?;
            if base_type == "tuple" {
                return Ok(format!("tuple<{}>", type_params.join(", ")));
            }
            return Ok(format!("{base_type}<{}>", type_params[0]));
        }
        Ok(base_type)
    }

    fn class_decl(&mut self) -> Result<ClassDecl> {
        self.eat_keyword("class")?;
        let name = self.eat(TokenKind::Identifier)?;
        let mut base = None;
        if self.is_op("[") {
            self.advance();
            base = Some(self.eat(TokenKind::Identifier)?);
            self.eat_op("]")?;
        }
        let members = self.class_body()?;
        Ok(ClassDecl { name, base, members })
    }

    fn class_body(&mut self) -> Result<Vec<Member>> {
        self.eat_op("{")?;
        let mut members = Vec::new();
        while !self.is_op("}") {
            if self.is(TokenKind::Comment) {
                members.push(Member::Comment(self.comment()?));
            } else if self.is_keyword("fn") {
                members.push(Member::Function(self.member_function_decl()?));
            } else if self.is(TokenKind::Keyword) && VAR_DECL_KEYWORDS.contains(&self.current().text.as_str()) {
                members.push(Member::Var(self.member_var_decl()?));
            } else {
                return Err(self.unexpected("a member declaration"));
            }
            self.optional_eat_op(";");
        }
        self.eat_op("}")?;
        Ok(members)
    }

    fn member_var_decl(&mut self) -> Result<MemberVarDecl> {
        let var_type = self.parse_type()?;
        let name = self.eat(TokenKind::Identifier)?;
        let mut init = None;
        if self.is_op("=") {
            self.advance();
            init = Some(self.expression()?);
        }
        let is_public = name.chars().next().is_some_and(|c| c.is_uppercase());
        Ok(MemberVarDecl {
            var_type,
            name,
            init,
            is_public,
        })
    }

    fn member_function_decl(&mut self) -> Result<MemberFunctionDecl> {
        self.eat_keyword("fn")?;
        let name = self.eat(TokenKind::Identifier)?;
        self.eat_op("(")?;
        let params = self.parameter_list()?;
        self.eat_op(")")?;
        self.eat_op("->")?;
        let return_type = self.parse_type()?;
        let body = self.compound_statement()?;
        let is_public = name.chars().next().is_some_and(|c| c.is_uppercase());
        Ok(MemberFunctionDecl {
            return_type,
            name,
            params,
            body,
            is_public,
        })
    }

    // ---- statements ----------------------------------------------------

    fn compound_statement(&mut self) -> Result<CompoundStmt> {
        self.eat_op("{")?;
        let mut statements = Vec::new();
        while !self.is_op("}") {
            statements.push(self.block_statement()?);
        }
        self.eat_op("}")?;
        Ok(CompoundStmt { statements })
    }

    fn block_statement(&mut self) -> Result<Stmt> {
        if self.is(TokenKind::Comment) {
            Ok(Stmt::Comment(self.comment()?))
        } else if self.is(TokenKind::Keyword) {
            match self.current().text.as_str() {
                "return" => self.return_stmt(),
                "if" => Ok(Stmt::If(self.if_stmt()?)),
                "for" => Ok(Stmt::For(self.for_stmt()?)),
                "break" => self.break_stmt(),
                "continue" => self.continue_stmt(),
                kw if VAR_DECL_KEYWORDS.contains(&kw) => Ok(Stmt::VarDecl(self.var_decl()?)),
                other => Err(CorvidError::UnexpectedToken {
                    found: format!("KEYWORD ('{other}')"),
                    expected: "a statement".to_string(),
                    span: self.span_here(),
                }),
            }
        } else if self.is(TokenKind::Identifier) {
            self.expr_stmt()
        } else if self.is_op("++") || self.is_op("--") {
            self.increment_statement()
        } else {
            Err(self.unexpected("a statement"))
        }
    }

    fn expr_stmt(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.optional_eat_op(";");
        Ok(Stmt::ExprStmt(expr))
    }

    fn increment_statement(&mut self) -> Result<Stmt> {
        let span = self.span_here();
        let op_text = self.current().text.clone();
        self.advance();
        let operand = self.variable()?;
        let op = if op_text == "++" { UnaryOp::Inc } else { UnaryOp::Dec };
        Ok(Stmt::ExprStmt(Expr::Unary(op, Box::new(operand), true, span)))
    }

    fn variable(&mut self) -> Result<Expr> {
        let span = self.span_here();
        let name = self.eat(TokenKind::Identifier)?;
        Ok(Expr::Variable(name, span))
    }

    fn var_decl(&mut self) -> Result<VarDecl> {
        let span = self.span_here();
        let var_type = self.parse_type()?;
        let name = self.eat(TokenKind::Identifier)?;
        let mut init = None;
        if self.is_op("=") {
            self.advance();
            init = Some(self.expression()?);
        }
        self.optional_eat_op(";");
        Ok(VarDecl {
            var_type,
            name,
            init,
            span,
        })
    }

    /// `return;` is accepted (no expression); the semantic analyzer is
    /// responsible for requiring the enclosing function's return type to be
    /// `void`/`nil` in that case.
    fn return_stmt(&mut self) -> Result<Stmt> {
        let span = self.span_here();
        self.eat_keyword("return")?;
        let expr = if self.is_op(";") || self.is_op("}") {
            None
        } else {
            Some(self.expression()?)
        };
        self.optional_eat_op(";");
        Ok(Stmt::Return(expr, span))
    }

    fn if_stmt(&mut self) -> Result<IfStmt> {
        self.eat_keyword("if")?;
        self.eat_op("(")?;
        let condition = self.expression()?;
        self.eat_op(")")?;
        let then_branch = self.compound_statement()?;
        let mut elif_branches = Vec::new();
        while self.is_keyword("elif") {
            self.advance();
            self.eat_op("(")?;
            let cond = self.expression()?;
            self.eat_op(")")?;
            let body = self.compound_statement()?;
            elif_branches.push(ElifBranch { condition: cond, body });
        }
        let else_branch = if self.is_keyword("else") {
            self.advance();
            Some(self.compound_statement()?)
        } else {
            None
        };
        Ok(IfStmt {
            condition,
            then_branch,
            elif_branches,
            else_branch,
        })
    }

    fn for_stmt(&mut self) -> Result<ForStmt> {
        self.eat_keyword("for")?;
        self.eat_op("(")?;

        let initializer = if self.is_op(";") {
            self.advance();
            None
        } else if self.is(TokenKind::Keyword) && VAR_DECL_KEYWORDS.contains(&self.current().text.as_str()) {
            let decl = self.var_decl()?;
            Some(Box::new(ForInit::VarDecl(decl)))
        } else {
            let expr = self.assignment()?;
            self.eat_op(";")?;
            Some(Box::new(ForInit::Expr(expr)))
        };

        let condition = if self.is_op(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.eat_op(";")?;

        let update = if self.is_op(")") {
            None
        } else {
            Some(self.parse_update_expression()?)
        };
        self.eat_op(")")?;

        let body = self.compound_statement()?;
        Ok(ForStmt {
            initializer,
            condition,
            update,
            body,
        })
    }

    /// The `for`-loop update clause: a postfix `++`/`--`, a compound
    /// assignment, a prefix `++`/`--`, a plain assignment, or any other
    /// expression — the only place in the grammar postfix increment/decrement
    /// is recognized.
    fn parse_update_expression(&mut self) -> Result<Expr> {
        if self.is_op("++") || self.is_op("--") {
            let span = self.span_here();
            let op_text = self.current().text.clone();
            self.advance();
            let operand = self.expression()?;
            let op = if op_text == "++" { UnaryOp::Inc } else { UnaryOp::Dec };
            return Ok(Expr::Unary(op, Box::new(operand), true, span));
        }

        let expr = self.expression()?;

        if matches!(expr, Expr::Variable(..)) && (self.is_op("++") || self.is_op("--")) {
            let span = self.span_here();
            let op_text = self.current().text.clone();
            self.advance();
            let op = if op_text == "++" { UnaryOp::Inc } else { UnaryOp::Dec };
            return Ok(Expr::Unary(op, Box::new(expr), false, span));
        }

        Ok(expr)
    }

    fn break_stmt(&mut self) -> Result<Stmt> {
        let span = self.span_here();
        self.eat_keyword("break")?;
        self.optional_eat_op(";");
        Ok(Stmt::Break(span))
    }

    fn continue_stmt(&mut self) -> Result<Stmt> {
        let span = self.span_here();
        self.eat_keyword("continue")?;
        self.optional_eat_op(";");
        Ok(Stmt::Continue(span))
    }

    // ---- expressions -----------------------------------------------------

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.logical_or()?;
        if matches!(expr, Expr::Variable(..) | Expr::Index(..))
            && matches!(self.current().text.as_str(), "=" | "+=" | "-=" | "*=" | "/=")
            && self.is(TokenKind::Operator)
        {
            let span = self.span_here();
            let op_text = self.current().text.clone();
            self.advance();
            let value = self.assignment()?;
            let op = AssignOp::from_str(&op_text).expect("checked above");
            return Ok(Expr::Assignment(Box::new(expr), op, Box::new(value), span));
        }
        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut node = self.logical_and()?;
        while self.is_op("||") {
            let span = self.span_here();
            self.advance();
            let right = self.logical_and()?;
            node = Expr::Binary(Box::new(node), BinOp::Or, Box::new(right), span);
        }
        Ok(node)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut node = self.equality()?;
        while self.is_op("&&") {
            let span = self.span_here();
            self.advance();
            let right = self.equality()?;
            node = Expr::Binary(Box::new(node), BinOp::And, Box::new(right), span);
        }
        Ok(node)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut node = self.relational()?;
        while matches!(self.current().text.as_str(), "==" | "!=") && self.is(TokenKind::Operator) {
            let span = self.span_here();
            let op = BinOp::from_str(&self.current().text).expect("checked above");
            self.advance();
            let right = self.relational()?;
            node = Expr::Binary(Box::new(node), op, Box::new(right), span);
        }
        Ok(node)
    }

    fn relational(&mut self) -> Result<Expr> {
        let mut node = self.additive()?;
        while matches!(self.current().text.as_str(), "<" | ">" | "<=" | ">=") && self.is(TokenKind::Operator) {
            let span = self.span_here();
            let op = BinOp::from_str(&self.current().text).expect("checked above");
            self.advance();
            let right = self.additive()?;
            node = Expr::Binary(Box::new(node), op, Box::new(right), span);
        }
        Ok(node)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut node = self.multiplicative()?;
        while matches!(self.current().text.as_str(), "+" | "-") && self.is(TokenKind::Operator) {
            let span = self.span_here();
            let op = BinOp::from_str(&self.current().text).expect("checked above");
            self.advance();
            let right = self.multiplicative()?;
            node = Expr::Binary(Box::new(node), op, Box::new(right), span);
        }
        Ok(node)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut node = self.unary()?;
        while matches!(self.current().text.as_str(), "*" | "/" | "%") && self.is(TokenKind::Operator) {
            let span = self.span_here();
            let op = BinOp::from_str(&self.current().text).expect("checked above");
            self.advance();
            let right = self.unary()?;
            node = Expr::Binary(Box::new(node), op, Box::new(right), span);
        }
        Ok(node)
    }

    fn unary(&mut self) -> Result<Expr> {
        if (self.is_op("!") || self.is_op("-")) && self.is(TokenKind::Operator) {
            let span = self.span_here();
            let op_text = self.current().text.clone();
            self.advance();
            let operand = self.unary()?;
            let op = if op_text == "!" { UnaryOp::Not } else { UnaryOp::Neg };
            return Ok(Expr::Unary(op, Box::new(operand), true, span));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        let span = self.span_here();
        match self.current().kind {
            TokenKind::Identifier => self.variable_or_function_call(),
            TokenKind::Integer => {
                let text = self.current().text.clone();
                self.advance();
                let value: i64 = text.parse().map_err(|_| CorvidError::MalformedOperand { operand: text })?;
                Ok(Expr::Literal(Literal::Int(value), span))
            }
            TokenKind::Float => {
                let text = self.current().text.clone();
                self.advance();
                let value: f64 = text.parse().map_err(|_| CorvidError::MalformedOperand { operand: text })?;
                Ok(Expr::Literal(Literal::Float(value), span))
            }
            TokenKind::Boolean => {
                let text = self.current().text.clone();
                self.advance();
                Ok(Expr::Literal(Literal::Bool(text == "true"), span))
            }
            TokenKind::Str => {
                let text = self.current().unquoted().to_string();
                self.advance();
                Ok(Expr::Literal(Literal::Str(text), span))
            }
            TokenKind::Operator if self.is_op("(") => self.paren_expr_or_tuple(span),
            TokenKind::Operator if self.is_op("[") => self.list_literal(span),
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Empty parens are illegal here — `()` is only valid as an argument
    /// list, handled separately by `function_call`.
    fn paren_expr_or_tuple(&mut self, span: Span) -> Result<Expr> {
        self.eat_op("(")?;
        if self.is_op(")") {
            return Err(self.unexpected("an expression (empty parentheses are not a valid expression)"));
        }
        let mut elements = vec![self.expression()?];
        while self.is_op(",") {
            self.advance();
            elements.push(self.expression()?);
        }
        self.eat_op(")")?;
        if elements.len() == 1 {
            Ok(elements.into_iter().next().unwrap())
        } else {
            Ok(Expr::Tuple(elements, span))
        }
    }

    fn list_literal(&mut self, span: Span) -> Result<Expr> {
        self.eat_op("[")?;
        let mut elements = Vec::new();
        if !self.is_op("]") {
            elements.push(self.expression()?);
            while self.is_op(",") {
                self.advance();
                elements.push(self.expression()?);
            }
        }
        self.eat_op("]")?;
        Ok(Expr::List(elements, span))
    }

    fn variable_or_function_call(&mut self) -> Result<Expr> {
        let span = self.span_here();
        let name = self.eat(TokenKind::Identifier)?;
        let mut expr = Expr::Variable(name.clone(), span);
        loop {
            if self.is_op("(") {
                // Only a bare name may be called — `f()()` is rejected, same
                // as the original grammar's "simple function names only".
                let Expr::Variable(callee, _) = &expr else {
                    return Err(self.unexpected("')' (chained calls are not supported)"));
                };
                expr = self.function_call(callee.clone(), span)?;
            } else if self.is_op("[") {
                expr = self.index_access(expr, span)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn function_call(&mut self, name: String, span: Span) -> Result<Expr> {
        self.eat_op("(")?;
        let mut args = Vec::new();
        if !self.is_op(")") {
            args.push(self.expression()?);
            while self.is_op(",") {
                self.advance();
                args.push(self.expression()?);
            }
        }
        self.eat_op(")")?;
        Ok(Expr::Call(name, args, span))
    }

    fn index_access(&mut self, collection: Expr, span: Span) -> Result<Expr> {
        self.eat_op("[")?;
        let index = self.expression()?;
        self.eat_op("]")?;
        Ok(Expr::Index(Box::new(collection), Box::new(index), IndexKind::Unknown, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::parse(src).expect("parse should succeed")
    }

    #[test]
    fn parses_simple_function() {
        let prog = parse("fn main() -> int { return 1 + 2 * 3; }");
        assert_eq!(prog.declarations.len(), 1);
        match &prog.declarations[0] {
            Decl::Function(f) => assert_eq!(f.name, "main"),
            _ => panic!("expected function decl"),
        }
    }

    #[test]
    fn parses_elif_chain() {
        let prog = parse(
            "fn main() -> int { if (x == 1) { return 10; } elif (x == 2) { return 20; } else { return 30; } }",
        );
        let Decl::Function(f) = &prog.declarations[0] else { panic!() };
        let Stmt::If(if_stmt) = &f.body.statements[0] else { panic!() };
        assert_eq!(if_stmt.elif_branches.len(), 1);
        assert!(if_stmt.else_branch.is_some());
    }

    #[test]
    fn rejects_empty_parens_as_expression() {
        let result = Parser::parse("fn main() -> int { return (); }");
        assert!(result.is_err());
    }

    #[test]
    fn accepts_bare_return_with_no_expression() {
        let prog = parse("fn main() -> void { return; }");
        let Decl::Function(f) = &prog.declarations[0] else { panic!() };
        match &f.body.statements[0] {
            Stmt::Return(None, _) => {}
            other => panic!("expected bare return, got {other:?}"),
        }
    }

    #[test]
    fn parses_tuple_and_list_literals() {
        let prog = parse("fn main() -> int { tuple<int,str> t = (1, \"hi\"); list<int> xs = [1,2,3]; return 0; }");
        let Decl::Function(f) = &prog.declarations[0] else { panic!() };
        assert_eq!(f.body.statements.len(), 3);
    }

    #[test]
    fn parses_for_loop_with_increment_update() {
        let prog = parse("fn main() -> int { int s = 0; for (int i = 1; i <= 5; i++) { s += i; } return s; }");
        let Decl::Function(f) = &prog.declarations[0] else { panic!() };
        let Stmt::For(for_stmt) = &f.body.statements[1] else { panic!() };
        assert!(for_stmt.update.is_some());
    }

    #[test]
    fn parses_class_with_members() {
        let prog = parse("class Point { int X = 0; int y = 0; fn Sum() -> int { return 0; } }");
        match &prog.declarations[0] {
            Decl::Class(c) => assert_eq!(c.members.len(), 3),
            _ => panic!("expected class decl"),
        }
    }
}
