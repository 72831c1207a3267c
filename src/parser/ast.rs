// AST definitions for the traced teaching language

use std::fmt;

/// Source location information for error reporting and event attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    /// Operator spelling as it appears in source text
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

/// Short-circuiting boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg, // -x
    Not, // not x
}

/// Expression nodes
#[derive(Debug, Clone)]
pub enum Expr {
    Int {
        value: i64,
        location: SourceLocation,
    },
    Float {
        value: f64,
        location: SourceLocation,
    },
    Str {
        value: String,
        location: SourceLocation,
    },
    Bool {
        value: bool,
        location: SourceLocation,
    },
    NoneLiteral {
        location: SourceLocation,
    },
    Name {
        id: String,
        location: SourceLocation,
    },
    List {
        elements: Vec<Expr>,
        location: SourceLocation,
    },
    Dict {
        entries: Vec<(Expr, Expr)>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Logical {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    /// A call of a named function: builtin or user-defined
    Call {
        function: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    /// A method call on a receiver expression, e.g. `xs.append(1)`
    MethodCall {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    Subscript {
        target: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    /// Get the source location of this expression
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Int { location, .. }
            | Expr::Float { location, .. }
            | Expr::Str { location, .. }
            | Expr::Bool { location, .. }
            | Expr::NoneLiteral { location }
            | Expr::Name { location, .. }
            | Expr::List { location, .. }
            | Expr::Dict { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Compare { location, .. }
            | Expr::Logical { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Call { location, .. }
            | Expr::MethodCall { location, .. }
            | Expr::Subscript { location, .. } => *location,
        }
    }

    /// True when this expression needs no parentheses as an operand
    fn is_atom(&self) -> bool {
        !matches!(
            self,
            Expr::Binary { .. } | Expr::Compare { .. } | Expr::Logical { .. } | Expr::Unary { .. }
        )
    }
}

/// Writes an operand, parenthesized when it is itself compound, so that the
/// unparsed text re-parses with the same structure.
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if expr.is_atom() {
        write!(f, "{}", expr)
    } else {
        write!(f, "({})", expr)
    }
}

impl fmt::Display for Expr {
    /// Unparse the expression back to source text. Event descriptors carry
    /// this text so it can be re-evaluated against a live scope later.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int { value, .. } => write!(f, "{}", value),
            Expr::Float { value, .. } => {
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Expr::Str { value, .. } => write!(f, "{:?}", value),
            Expr::Bool { value, .. } => write!(f, "{}", if *value { "True" } else { "False" }),
            Expr::NoneLiteral { .. } => write!(f, "None"),
            Expr::Name { id, .. } => write!(f, "{}", id),
            Expr::List { elements, .. } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Expr::Dict { entries, .. } => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Compare {
                op, left, right, ..
            } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Logical {
                op, left, right, ..
            } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Unary { op, operand, .. } => {
                match op {
                    UnaryOp::Neg => write!(f, "-")?,
                    UnaryOp::Not => write!(f, "not ")?,
                }
                write_operand(f, operand)
            }
            Expr::Call { function, args, .. } => {
                write!(f, "{}(", function)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            Expr::MethodCall {
                target,
                method,
                args,
                ..
            } => {
                write_operand(f, target)?;
                write!(f, ".{}(", method)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            Expr::Subscript { target, index, .. } => {
                write_operand(f, target)?;
                write!(f, "[{}]", index)
            }
        }
    }
}

/// Assignment targets: a plain name or a single subscript
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Name {
        id: String,
        location: SourceLocation,
    },
    Subscript {
        target: Expr,
        index: Expr,
        location: SourceLocation,
    },
}

impl AssignTarget {
    /// Source text of the whole target
    pub fn text(&self) -> String {
        match self {
            AssignTarget::Name { id, .. } => id.clone(),
            AssignTarget::Subscript { target, index, .. } => format!("{}[{}]", target, index),
        }
    }
}

/// Statement nodes
#[derive(Debug, Clone)]
pub enum Stmt {
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    Assign {
        target: AssignTarget,
        value: Expr,
        location: SourceLocation,
    },
    AugAssign {
        target: AssignTarget,
        op: BinOp,
        value: Expr,
        location: SourceLocation,
    },
    ExprStmt {
        expr: Expr,
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        location: SourceLocation,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    For {
        variable: String,
        iterable: Expr,
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    /// `del target[index]`
    Delete {
        target: Expr,
        index: Expr,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Pass {
        location: SourceLocation,
    },
}

impl Stmt {
    /// Get the source location of this statement
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::FunctionDef { location, .. }
            | Stmt::Assign { location, .. }
            | Stmt::AugAssign { location, .. }
            | Stmt::ExprStmt { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::For { location, .. }
            | Stmt::Delete { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location }
            | Stmt::Pass { location } => *location,
        }
    }

    /// Last source line spanned by this statement, including nested bodies
    pub fn last_line(&self) -> u32 {
        fn body_last(body: &[Stmt], fallback: u32) -> u32 {
            body.last().map(|s| s.last_line()).unwrap_or(fallback)
        }
        let own = self.location().line;
        match self {
            Stmt::FunctionDef { body, .. } => body_last(body, own),
            Stmt::If { body, orelse, .. } => body_last(orelse, body_last(body, own)),
            Stmt::While { body, .. } => body_last(body, own),
            Stmt::For { body, .. } => body_last(body, own),
            _ => own,
        }
    }
}

/// Top-level program: the module body
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(id: &str) -> Expr {
        Expr::Name {
            id: id.to_string(),
            location: SourceLocation::new(1, 1),
        }
    }

    #[test]
    fn unparses_binary_with_nested_parens() {
        let loc = SourceLocation::new(1, 1);
        let inner = Expr::Binary {
            op: BinOp::Add,
            left: Box::new(name("a")),
            right: Box::new(name("b")),
            location: loc,
        };
        let outer = Expr::Binary {
            op: BinOp::Mul,
            left: Box::new(inner),
            right: Box::new(Expr::Int {
                value: 2,
                location: loc,
            }),
            location: loc,
        };
        assert_eq!(outer.to_string(), "(a + b) * 2");
    }

    #[test]
    fn unparses_calls_and_subscripts() {
        let loc = SourceLocation::new(1, 1);
        let call = Expr::Call {
            function: "len".to_string(),
            args: vec![name("xs")],
            location: loc,
        };
        assert_eq!(call.to_string(), "len(xs)");

        let sub = Expr::Subscript {
            target: Box::new(name("xs")),
            index: Box::new(Expr::Int {
                value: 0,
                location: loc,
            }),
            location: loc,
        };
        assert_eq!(sub.to_string(), "xs[0]");
    }

    #[test]
    fn last_line_spans_nested_bodies() {
        let stmt = Stmt::While {
            test: name("x"),
            body: vec![Stmt::Pass {
                location: SourceLocation::new(3, 5),
            }],
            location: SourceLocation::new(2, 1),
        };
        assert_eq!(stmt.last_line(), 3);
    }
}
