//! Recursive descent parser for the teaching language
//!
//! Consumes the token stream produced by [`Lexer`] and builds the
//! [`Program`] AST. Compound statements own indentation-delimited suites;
//! a `:` may also introduce a single-line suite of simple statements.

use super::ast::*;
use super::lexer::{LexError, Lexer, Token};
use thiserror::Error;

/// Parser error type, carrying the offending source position
#[derive(Debug, Clone, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            message: message.into(),
            line: location.line,
            column: location.column,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            line: err.location.line,
            column: err.location.column,
        }
    }
}

/// Parse a whole program.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.program()
}

/// Parse a single expression from bare text.
///
/// This is the evaluator-side entry point: event descriptors record
/// sub-expression text, and enrichment re-parses that text before
/// evaluating it against a live scope.
pub fn parse_expression_text(text: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(text)?;
    let expr = parser.expression()?;
    match parser.peek() {
        Token::Newline(_) | Token::Eof(_) => Ok(expr),
        other => Err(ParseError::new(
            format!("unexpected trailing input: {}", other),
            other.location(),
        )),
    }
}

/// Recursive descent parser over a token buffer
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    // The lexer always terminates the stream with an Eof token and `advance`
    // never moves past it, so `position` stays in bounds.
    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn location(&self) -> SourceLocation {
        self.peek().location()
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.location())
    }

    fn expect_ident(&mut self) -> Result<(String, SourceLocation), ParseError> {
        match self.peek().clone() {
            Token::Ident(name, loc) => {
                self.advance();
                Ok((name, loc))
            }
            other => Err(self.error_here(format!("expected identifier, found {}", other))),
        }
    }

    fn expect_colon(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Token::Colon(_) => {
                self.advance();
                Ok(())
            }
            other => Err(self.error_here(format!("expected ':', found {}", other))),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline(_)) {
            self.advance();
        }
    }

    fn at_simple_stmt_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Newline(_) | Token::Semicolon(_) | Token::Dedent(_) | Token::Eof(_)
        )
    }

    // ---- Statements ----

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), Token::Eof(_)) {
                break;
            }
            self.logical_line(&mut program.body)?;
        }
        Ok(program)
    }

    /// Parses one logical line into `out`: a compound statement, or one or
    /// more `;`-separated simple statements terminated by a newline.
    fn logical_line(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        match self.peek() {
            Token::Def(_) => {
                out.push(self.function_def()?);
                Ok(())
            }
            Token::If(_) => {
                out.push(self.if_statement()?);
                Ok(())
            }
            Token::While(_) => {
                out.push(self.while_statement()?);
                Ok(())
            }
            Token::For(_) => {
                out.push(self.for_statement()?);
                Ok(())
            }
            Token::Elif(_) | Token::Else(_) => {
                Err(self.error_here("'elif'/'else' without a matching 'if'"))
            }
            _ => {
                loop {
                    out.push(self.simple_statement()?);
                    match self.peek() {
                        Token::Semicolon(_) => {
                            self.advance();
                            // allow a trailing semicolon before the newline
                            if matches!(self.peek(), Token::Newline(_) | Token::Eof(_)) {
                                break;
                            }
                        }
                        _ => break,
                    }
                }
                match self.peek() {
                    Token::Newline(_) => {
                        self.advance();
                        Ok(())
                    }
                    Token::Eof(_) => Ok(()),
                    other => {
                        Err(self.error_here(format!("expected end of line, found {}", other)))
                    }
                }
            }
        }
    }

    /// Parses the suite after a `:`: either an indented block or an inline
    /// run of simple statements on the header's own line.
    fn suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();
        if matches!(self.peek(), Token::Newline(_)) {
            self.advance();
            self.skip_newlines();
            match self.peek() {
                Token::Indent(_) => {
                    self.advance();
                }
                other => {
                    return Err(
                        self.error_here(format!("expected an indented block, found {}", other))
                    )
                }
            }
            loop {
                self.skip_newlines();
                match self.peek() {
                    Token::Dedent(_) => {
                        self.advance();
                        break;
                    }
                    Token::Eof(_) => {
                        return Err(self.error_here("unexpected end of input inside a block"))
                    }
                    _ => self.logical_line(&mut body)?,
                }
            }
        } else {
            // Inline suite: simple statements only, terminated by newline.
            loop {
                body.push(self.simple_statement()?);
                match self.peek() {
                    Token::Semicolon(_) => {
                        self.advance();
                        if matches!(self.peek(), Token::Newline(_) | Token::Eof(_)) {
                            break;
                        }
                    }
                    _ => break,
                }
            }
            if matches!(self.peek(), Token::Newline(_)) {
                self.advance();
            }
        }
        if body.is_empty() {
            return Err(self.error_here("suite cannot be empty"));
        }
        Ok(body)
    }

    fn function_def(&mut self) -> Result<Stmt, ParseError> {
        let location = self.advance().location(); // def
        let (name, _) = self.expect_ident()?;
        match self.peek() {
            Token::LParen(_) => {
                self.advance();
            }
            other => {
                return Err(self.error_here(format!(
                    "expected '(' after function name, found {}",
                    other
                )))
            }
        }
        let mut params = Vec::new();
        if !matches!(self.peek(), Token::RParen(_)) {
            loop {
                let (param, _) = self.expect_ident()?;
                params.push(param);
                match self.peek() {
                    Token::Comma(_) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        match self.peek() {
            Token::RParen(_) => {
                self.advance();
            }
            other => {
                return Err(self.error_here(format!("expected ')', found {}", other)));
            }
        }
        self.expect_colon()?;
        let body = self.suite()?;
        Ok(Stmt::FunctionDef {
            name,
            params,
            body,
            location,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.advance().location(); // if / elif
        let test = self.expression()?;
        self.expect_colon()?;
        let body = self.suite()?;
        let orelse = match self.peek() {
            Token::Elif(_) => vec![self.if_statement()?],
            Token::Else(_) => {
                self.advance();
                self.expect_colon()?;
                self.suite()?
            }
            _ => Vec::new(),
        };
        Ok(Stmt::If {
            test,
            body,
            orelse,
            location,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.advance().location();
        let test = self.expression()?;
        self.expect_colon()?;
        let body = self.suite()?;
        Ok(Stmt::While {
            test,
            body,
            location,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.advance().location();
        let (variable, _) = self.expect_ident()?;
        match self.peek() {
            Token::In(_) => {
                self.advance();
            }
            other => {
                return Err(self.error_here(format!("expected 'in', found {}", other)));
            }
        }
        let iterable = self.expression()?;
        self.expect_colon()?;
        let body = self.suite()?;
        Ok(Stmt::For {
            variable,
            iterable,
            body,
            location,
        })
    }

    fn simple_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().clone() {
            Token::Return(loc) => {
                self.advance();
                let value = if self.at_simple_stmt_end() {
                    None
                } else {
                    Some(self.expression()?)
                };
                Ok(Stmt::Return {
                    value,
                    location: loc,
                })
            }
            Token::Del(loc) => {
                self.advance();
                let expr = self.expression()?;
                match expr {
                    Expr::Subscript { target, index, .. } => Ok(Stmt::Delete {
                        target: *target,
                        index: *index,
                        location: loc,
                    }),
                    _ => Err(ParseError::new("'del' requires a subscript target", loc)),
                }
            }
            Token::Pass(loc) => {
                self.advance();
                Ok(Stmt::Pass { location: loc })
            }
            Token::Break(loc) => {
                self.advance();
                Ok(Stmt::Break { location: loc })
            }
            Token::Continue(loc) => {
                self.advance();
                Ok(Stmt::Continue { location: loc })
            }
            _ => self.assignment_or_expr(),
        }
    }

    fn assignment_or_expr(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        let location = expr.location();
        let aug_op = match self.peek() {
            Token::PlusEq(_) => Some(BinOp::Add),
            Token::MinusEq(_) => Some(BinOp::Sub),
            Token::StarEq(_) => Some(BinOp::Mul),
            Token::SlashEq(_) => Some(BinOp::Div),
            Token::DoubleSlashEq(_) => Some(BinOp::FloorDiv),
            Token::PercentEq(_) => Some(BinOp::Mod),
            Token::DoubleStarEq(_) => Some(BinOp::Pow),
            _ => None,
        };
        if let Some(op) = aug_op {
            self.advance();
            let target = Self::to_assign_target(expr)?;
            let value = self.expression()?;
            return Ok(Stmt::AugAssign {
                target,
                op,
                value,
                location,
            });
        }
        if matches!(self.peek(), Token::Eq(_)) {
            self.advance();
            let target = Self::to_assign_target(expr)?;
            let value = self.expression()?;
            return Ok(Stmt::Assign {
                target,
                value,
                location,
            });
        }
        Ok(Stmt::ExprStmt {
            expr,
            location,
        })
    }

    fn to_assign_target(expr: Expr) -> Result<AssignTarget, ParseError> {
        match expr {
            Expr::Name { id, location } => Ok(AssignTarget::Name { id, location }),
            Expr::Subscript {
                target,
                index,
                location,
            } => Ok(AssignTarget::Subscript {
                target: *target,
                index: *index,
                location,
            }),
            other => Err(ParseError::new(
                "cannot assign to this expression",
                other.location(),
            )),
        }
    }

    // ---- Expressions ----

    pub fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Token::Or(_)) {
            let location = self.advance().location();
            let right = self.and_expr()?;
            left = Expr::Logical {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while matches!(self.peek(), Token::And(_)) {
            let location = self.advance().location();
            let right = self.not_expr()?;
            left = Expr::Logical {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        // `not` binds looser than comparisons, but `a not in b` is a
        // comparison operator and is handled there.
        if matches!(self.peek(), Token::Not(_)) && !matches!(self.peek_at(1), Some(Token::In(_))) {
            let location = self.advance().location();
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                location,
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.arith()?;
        let op = match self.peek() {
            Token::EqEq(_) => Some(CmpOp::Eq),
            Token::NotEq(_) => Some(CmpOp::Ne),
            Token::Lt(_) => Some(CmpOp::Lt),
            Token::Le(_) => Some(CmpOp::Le),
            Token::Gt(_) => Some(CmpOp::Gt),
            Token::Ge(_) => Some(CmpOp::Ge),
            Token::In(_) => Some(CmpOp::In),
            Token::Not(_) if matches!(self.peek_at(1), Some(Token::In(_))) => Some(CmpOp::NotIn),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        let location = self.advance().location();
        if op == CmpOp::NotIn {
            self.advance(); // the `in` after `not`
        }
        let right = self.arith()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
            location,
        })
    }

    fn arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus(_) => BinOp::Add,
                Token::Minus(_) => BinOp::Sub,
                _ => break,
            };
            let location = self.advance().location();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Token::Star(_) => BinOp::Mul,
                Token::Slash(_) => BinOp::Div,
                Token::DoubleSlash(_) => BinOp::FloorDiv,
                Token::Percent(_) => BinOp::Mod,
                _ => break,
            };
            let location = self.advance().location();
            let right = self.factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Minus(_) => {
                let location = self.advance().location();
                let operand = self.factor()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                    location,
                })
            }
            Token::Plus(_) => {
                self.advance();
                self.factor()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.postfix()?;
        if matches!(self.peek(), Token::DoubleStar(_)) {
            let location = self.advance().location();
            // right-associative, and `2 ** -1` is legal
            let exponent = self.factor()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
                location,
            });
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Token::LParen(_) => {
                    let location = self.advance().location();
                    let args = self.call_args()?;
                    match expr {
                        Expr::Name { id, .. } => {
                            expr = Expr::Call {
                                function: id,
                                args,
                                location,
                            };
                        }
                        _ => {
                            return Err(ParseError::new(
                                "only named functions can be called",
                                location,
                            ))
                        }
                    }
                }
                Token::LBracket(_) => {
                    let location = self.advance().location();
                    let index = self.expression()?;
                    match self.peek() {
                        Token::RBracket(_) => {
                            self.advance();
                        }
                        other => {
                            return Err(self.error_here(format!("expected ']', found {}", other)))
                        }
                    }
                    expr = Expr::Subscript {
                        target: Box::new(expr),
                        index: Box::new(index),
                        location,
                    };
                }
                Token::Dot(_) => {
                    self.advance();
                    let (method, location) = self.expect_ident()?;
                    match self.peek() {
                        Token::LParen(_) => {
                            self.advance();
                        }
                        other => {
                            return Err(self.error_here(format!(
                                "expected '(' after method name, found {}",
                                other
                            )))
                        }
                    }
                    let args = self.call_args()?;
                    expr = Expr::MethodCall {
                        target: Box::new(expr),
                        method,
                        args,
                        location,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Parses call arguments after the opening paren, consuming the `)`.
    fn call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !matches!(self.peek(), Token::RParen(_)) {
            loop {
                args.push(self.expression()?);
                match self.peek() {
                    Token::Comma(_) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        match self.peek() {
            Token::RParen(_) => {
                self.advance();
                Ok(args)
            }
            other => Err(self.error_here(format!("expected ')', found {}", other))),
        }
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Token::IntLiteral(value, location) => {
                self.advance();
                Ok(Expr::Int { value, location })
            }
            Token::FloatLiteral(value, location) => {
                self.advance();
                Ok(Expr::Float { value, location })
            }
            Token::StrLiteral(value, location) => {
                self.advance();
                Ok(Expr::Str { value, location })
            }
            Token::True_(location) => {
                self.advance();
                Ok(Expr::Bool {
                    value: true,
                    location,
                })
            }
            Token::False_(location) => {
                self.advance();
                Ok(Expr::Bool {
                    value: false,
                    location,
                })
            }
            Token::None_(location) => {
                self.advance();
                Ok(Expr::NoneLiteral { location })
            }
            Token::Ident(id, location) => {
                self.advance();
                Ok(Expr::Name { id, location })
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.expression()?;
                match self.peek() {
                    Token::RParen(_) => {
                        self.advance();
                        Ok(expr)
                    }
                    other => Err(self.error_here(format!("expected ')', found {}", other))),
                }
            }
            Token::LBracket(location) => {
                self.advance();
                let mut elements = Vec::new();
                if !matches!(self.peek(), Token::RBracket(_)) {
                    loop {
                        elements.push(self.expression()?);
                        match self.peek() {
                            Token::Comma(_) => {
                                self.advance();
                            }
                            _ => break,
                        }
                    }
                }
                match self.peek() {
                    Token::RBracket(_) => {
                        self.advance();
                        Ok(Expr::List { elements, location })
                    }
                    other => Err(self.error_here(format!("expected ']', found {}", other))),
                }
            }
            Token::LBrace(location) => {
                self.advance();
                let mut entries = Vec::new();
                if !matches!(self.peek(), Token::RBrace(_)) {
                    loop {
                        let key = self.expression()?;
                        self.expect_colon()?;
                        let value = self.expression()?;
                        entries.push((key, value));
                        match self.peek() {
                            Token::Comma(_) => {
                                self.advance();
                            }
                            _ => break,
                        }
                    }
                }
                match self.peek() {
                    Token::RBrace(_) => {
                        self.advance();
                        Ok(Expr::Dict { entries, location })
                    }
                    other => Err(self.error_here(format!("expected '}}', found {}", other))),
                }
            }
            other => Err(self.error_here(format!("unexpected {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignment_and_print() {
        let program = parse_program("x = 1\nx = x + 1\nprint(x)\n").expect("parse failed");
        assert_eq!(program.body.len(), 3);
        assert!(matches!(program.body[0], Stmt::Assign { .. }));
        assert!(matches!(
            program.body[2],
            Stmt::ExprStmt {
                expr: Expr::Call { .. },
                ..
            }
        ));
    }

    #[test]
    fn parses_function_def_with_nested_return() {
        let source = "def f(n):\n    if n == 0:\n        return 0\n    return f(n - 1)\n";
        let program = parse_program(source).expect("parse failed");
        match &program.body[0] {
            Stmt::FunctionDef { name, params, body, .. } => {
                assert_eq!(name, "f");
                assert_eq!(params, &["n".to_string()]);
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected function def, got {:?}", other),
        }
    }

    #[test]
    fn parses_inline_for_suite() {
        let program = parse_program("for i in [10, 20, 30]: total += i\n").expect("parse failed");
        match &program.body[0] {
            Stmt::For {
                variable,
                iterable,
                body,
                location,
            } => {
                assert_eq!(variable, "i");
                assert_eq!(iterable.to_string(), "[10, 20, 30]");
                assert_eq!(body.len(), 1);
                assert_eq!(location.line, 1);
                assert_eq!(body[0].location().line, 1);
            }
            other => panic!("expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn parses_elif_chain_as_nested_if() {
        let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        let program = parse_program(source).expect("parse failed");
        match &program.body[0] {
            Stmt::If { orelse, .. } => match &orelse[0] {
                Stmt::If { orelse: inner, .. } => assert_eq!(inner.len(), 1),
                other => panic!("expected nested if, got {:?}", other),
            },
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn parses_del_subscript() {
        let program = parse_program("del xs[0]\n").expect("parse failed");
        assert!(matches!(program.body[0], Stmt::Delete { .. }));
    }

    #[test]
    fn rejects_unbalanced_parens() {
        let err = parse_program("x = (1 + 2\n").unwrap_err();
        assert!(err.line >= 1);
    }

    #[test]
    fn rejects_assignment_to_literal() {
        let err = parse_program("1 = x\n").unwrap_err();
        assert!(err.message.contains("cannot assign"));
    }

    #[test]
    fn parses_not_in_comparison() {
        let program = parse_program("y = x not in xs\n").expect("parse failed");
        match &program.body[0] {
            Stmt::Assign { value, .. } => {
                assert_eq!(value.to_string(), "x not in xs");
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn expression_text_round_trips() {
        let expr = parse_expression_text("a + b * 2").expect("parse failed");
        let text = expr.to_string();
        let again = parse_expression_text(&text).expect("reparse failed");
        assert_eq!(text, again.to_string());
    }
}
