//! Lexer (tokenizer) for the teaching language
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! parser. Blocks are indentation-delimited, so the lexer tracks an indent
//! stack and emits synthetic [`Token::Indent`] / [`Token::Dedent`] /
//! [`Token::Newline`] tokens the way the language's own tokenizer would.
//! Newlines inside brackets are implicit line joins and produce no tokens.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    StrLiteral(String, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    Def(SourceLocation),
    Return(SourceLocation),
    If(SourceLocation),
    Elif(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    For(SourceLocation),
    In(SourceLocation),
    Del(SourceLocation),
    Pass(SourceLocation),
    Break(SourceLocation),
    Continue(SourceLocation),
    And(SourceLocation),
    Or(SourceLocation),
    Not(SourceLocation),
    True_(SourceLocation),
    False_(SourceLocation),
    None_(SourceLocation),

    // Arithmetic operators
    Plus(SourceLocation),        // +
    Minus(SourceLocation),       // -
    Star(SourceLocation),        // *
    DoubleStar(SourceLocation),  // **
    Slash(SourceLocation),       // /
    DoubleSlash(SourceLocation), // //
    Percent(SourceLocation),     // %

    // Comparison operators
    EqEq(SourceLocation),  // ==
    NotEq(SourceLocation), // !=
    Lt(SourceLocation),    // <
    Le(SourceLocation),    // <=
    Gt(SourceLocation),    // >
    Ge(SourceLocation),    // >=

    // Assignment operators
    Eq(SourceLocation),            // =
    PlusEq(SourceLocation),        // +=
    MinusEq(SourceLocation),       // -=
    StarEq(SourceLocation),        // *=
    DoubleStarEq(SourceLocation),  // **=
    SlashEq(SourceLocation),       // /=
    DoubleSlashEq(SourceLocation), // //=
    PercentEq(SourceLocation),     // %=

    // Punctuation
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    Comma(SourceLocation),     // ,
    Colon(SourceLocation),     // :
    Dot(SourceLocation),       // .
    Semicolon(SourceLocation), // ;

    // Layout
    Newline(SourceLocation),
    Indent(SourceLocation),
    Dedent(SourceLocation),

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::IntLiteral(_, loc)
            | Token::FloatLiteral(_, loc)
            | Token::StrLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Def(loc)
            | Token::Return(loc)
            | Token::If(loc)
            | Token::Elif(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::For(loc)
            | Token::In(loc)
            | Token::Del(loc)
            | Token::Pass(loc)
            | Token::Break(loc)
            | Token::Continue(loc)
            | Token::And(loc)
            | Token::Or(loc)
            | Token::Not(loc)
            | Token::True_(loc)
            | Token::False_(loc)
            | Token::None_(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::DoubleStar(loc)
            | Token::Slash(loc)
            | Token::DoubleSlash(loc)
            | Token::Percent(loc)
            | Token::EqEq(loc)
            | Token::NotEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::Eq(loc)
            | Token::PlusEq(loc)
            | Token::MinusEq(loc)
            | Token::StarEq(loc)
            | Token::DoubleStarEq(loc)
            | Token::SlashEq(loc)
            | Token::DoubleSlashEq(loc)
            | Token::PercentEq(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::Comma(loc)
            | Token::Colon(loc)
            | Token::Dot(loc)
            | Token::Semicolon(loc)
            | Token::Newline(loc)
            | Token::Indent(loc)
            | Token::Dedent(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral(n, _) => write!(f, "integer literal {}", n),
            Token::FloatLiteral(x, _) => write!(f, "float literal {}", x),
            Token::StrLiteral(_, _) => write!(f, "string literal"),
            Token::Ident(name, _) => write!(f, "identifier '{}'", name),
            Token::Def(_) => write!(f, "'def'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Elif(_) => write!(f, "'elif'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::For(_) => write!(f, "'for'"),
            Token::In(_) => write!(f, "'in'"),
            Token::Del(_) => write!(f, "'del'"),
            Token::Pass(_) => write!(f, "'pass'"),
            Token::Break(_) => write!(f, "'break'"),
            Token::Continue(_) => write!(f, "'continue'"),
            Token::And(_) => write!(f, "'and'"),
            Token::Or(_) => write!(f, "'or'"),
            Token::Not(_) => write!(f, "'not'"),
            Token::True_(_) => write!(f, "'True'"),
            Token::False_(_) => write!(f, "'False'"),
            Token::None_(_) => write!(f, "'None'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::DoubleStar(_) => write!(f, "'**'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::DoubleSlash(_) => write!(f, "'//'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::DoubleStarEq(_) => write!(f, "'**='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::DoubleSlashEq(_) => write!(f, "'//='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Colon(_) => write!(f, "':'"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Newline(_) => write!(f, "end of line"),
            Token::Indent(_) => write!(f, "indent"),
            Token::Dedent(_) => write!(f, "dedent"),
            Token::Eof(_) => write!(f, "end of input"),
        }
    }
}

/// Lexing error with the offending location
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Tokenizer state over a character buffer
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.loc(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Tokenize the whole source.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                if !self.handle_line_start()? {
                    break; // EOF reached while scanning indentation
                }
            }
            match self.peek() {
                None => break,
                Some('\n') => {
                    let loc = self.loc();
                    self.advance();
                    if self.bracket_depth == 0 {
                        self.tokens.push(Token::Newline(loc));
                        self.at_line_start = true;
                    }
                }
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(c) if c.is_ascii_digit() => self.lex_number()?,
                Some('"') | Some('\'') => self.lex_string()?,
                Some(c) if c.is_ascii_alphabetic() || c == '_' => self.lex_word(),
                Some(_) => self.lex_operator()?,
            }
        }

        // Close the final logical line, then unwind any open indentation.
        let loc = self.loc();
        if !self.at_line_start {
            self.tokens.push(Token::Newline(loc));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.tokens.push(Token::Dedent(loc));
        }
        self.tokens.push(Token::Eof(loc));
        Ok(self.tokens)
    }

    /// Measures the indentation of a fresh logical line and emits
    /// Indent/Dedent tokens. Blank and comment-only lines produce nothing.
    /// Returns false once EOF is reached.
    fn handle_line_start(&mut self) -> Result<bool, LexError> {
        let mut indent = 0usize;
        loop {
            match self.peek() {
                Some(' ') => {
                    indent += 1;
                    self.advance();
                }
                Some('\t') => {
                    return Err(self.error("tab indentation is not supported; use spaces"));
                }
                _ => break,
            }
        }
        match self.peek() {
            None => return Ok(false),
            Some('\n') => {
                self.advance();
                return Ok(true); // blank line, stay at line start
            }
            Some('\r') => {
                self.advance();
                return Ok(true);
            }
            Some('#') => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                return Ok(true);
            }
            Some(_) => {}
        }

        let loc = self.loc();
        let current = *self.indent_stack.last().unwrap_or(&0);
        if indent > current {
            self.indent_stack.push(indent);
            self.tokens.push(Token::Indent(loc));
        } else {
            while indent < *self.indent_stack.last().unwrap_or(&0) {
                self.indent_stack.pop();
                self.tokens.push(Token::Dedent(loc));
            }
            if indent != *self.indent_stack.last().unwrap_or(&0) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        self.at_line_start = false;
        Ok(true)
    }

    fn lex_number(&mut self) -> Result<(), LexError> {
        let loc = self.loc();
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let is_float = self.peek() == Some('.')
            && self.peek_next().map(|c| c.is_ascii_digit()).unwrap_or(false);
        if is_float {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float literal '{}'", text)))?;
            self.tokens.push(Token::FloatLiteral(value, loc));
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error(format!("integer literal '{}' out of range", text)))?;
            self.tokens.push(Token::IntLiteral(value, loc));
        }
        Ok(())
    }

    fn lex_string(&mut self) -> Result<(), LexError> {
        let loc = self.loc();
        let quote = self.advance().unwrap_or('"');
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error("unterminated string literal"));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        _ => return Err(self.error("unknown escape sequence in string literal")),
                    };
                    value.push(escaped);
                    self.advance();
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        self.tokens.push(Token::StrLiteral(value, loc));
        Ok(())
    }

    fn lex_word(&mut self) {
        let loc = self.loc();
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let token = match word.as_str() {
            "def" => Token::Def(loc),
            "return" => Token::Return(loc),
            "if" => Token::If(loc),
            "elif" => Token::Elif(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "for" => Token::For(loc),
            "in" => Token::In(loc),
            "del" => Token::Del(loc),
            "pass" => Token::Pass(loc),
            "break" => Token::Break(loc),
            "continue" => Token::Continue(loc),
            "and" => Token::And(loc),
            "or" => Token::Or(loc),
            "not" => Token::Not(loc),
            "True" => Token::True_(loc),
            "False" => Token::False_(loc),
            "None" => Token::None_(loc),
            _ => Token::Ident(word, loc),
        };
        self.tokens.push(token);
    }

    fn lex_operator(&mut self) -> Result<(), LexError> {
        let loc = self.loc();
        let c = self.peek().unwrap_or('\0');
        let eq_follows = |lexer: &Self, offset: usize| lexer.chars.get(lexer.pos + offset) == Some(&'=');
        let token = match c {
            '+' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::PlusEq(loc)
                } else {
                    Token::Plus(loc)
                }
            }
            '-' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::MinusEq(loc)
                } else {
                    Token::Minus(loc)
                }
            }
            '*' => {
                if self.peek_next() == Some('*') {
                    self.advance();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::DoubleStarEq(loc)
                    } else {
                        Token::DoubleStar(loc)
                    }
                } else {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::StarEq(loc)
                    } else {
                        Token::Star(loc)
                    }
                }
            }
            '/' => {
                if self.peek_next() == Some('/') {
                    self.advance();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::DoubleSlashEq(loc)
                    } else {
                        Token::DoubleSlash(loc)
                    }
                } else {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::SlashEq(loc)
                    } else {
                        Token::Slash(loc)
                    }
                }
            }
            '%' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::PercentEq(loc)
                } else {
                    Token::Percent(loc)
                }
            }
            '=' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::EqEq(loc)
                } else {
                    Token::Eq(loc)
                }
            }
            '!' => {
                if eq_follows(self, 1) {
                    self.advance();
                    self.advance();
                    Token::NotEq(loc)
                } else {
                    return Err(self.error("unexpected character '!'"));
                }
            }
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Le(loc)
                } else {
                    Token::Lt(loc)
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Ge(loc)
                } else {
                    Token::Gt(loc)
                }
            }
            '(' => {
                self.advance();
                self.bracket_depth += 1;
                Token::LParen(loc)
            }
            ')' => {
                self.advance();
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                Token::RParen(loc)
            }
            '[' => {
                self.advance();
                self.bracket_depth += 1;
                Token::LBracket(loc)
            }
            ']' => {
                self.advance();
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                Token::RBracket(loc)
            }
            '{' => {
                self.advance();
                self.bracket_depth += 1;
                Token::LBrace(loc)
            }
            '}' => {
                self.advance();
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                Token::RBrace(loc)
            }
            ',' => {
                self.advance();
                Token::Comma(loc)
            }
            ':' => {
                self.advance();
                Token::Colon(loc)
            }
            '.' => {
                self.advance();
                Token::Dot(loc)
            }
            ';' => {
                self.advance();
                Token::Semicolon(loc)
            }
            other => {
                return Err(self.error(format!("unexpected character '{}'", other)));
            }
        };
        self.tokens.push(token);
        Ok(())
    }
}
