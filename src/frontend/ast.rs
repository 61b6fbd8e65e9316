//! Syntax tree definitions for PLC
//!
//! The tree is built once by the (external) parser and never restructured.
//! The analyzer fills in the annotation slots; the interpreter and code
//! emitter only read them.

use std::fmt;

use num::BigInt;
use serde::{Deserialize, Serialize};

use crate::frontend::scope::{FunctionBinding, VariableBinding};
use crate::types::{Decimal, Type};
use crate::utils::Span;

// ==================== Annotation Slots ====================

/// A node annotation written by the analyzer.
///
/// Slots start out unresolved and are written at most once; analyzing the
/// same tree again must produce the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Unresolved,
    Resolved(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Unresolved
    }
}

impl<T: PartialEq + fmt::Debug> Slot<T> {
    pub fn resolve(&mut self, value: T) {
        match self {
            Slot::Unresolved => *self = Slot::Resolved(value),
            Slot::Resolved(existing) => {
                debug_assert_eq!(existing, &value, "annotation rewritten with a different value");
            }
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Unresolved => None,
            Slot::Resolved(value) => Some(value),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Slot::Resolved(_))
    }
}

// ==================== Top Level ====================

/// A complete program
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub globals: Vec<Global>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Source {
    pub fn new(globals: Vec<Global>, functions: Vec<Function>) -> Self {
        Self { globals, functions }
    }
}

/// Top-level variable: `VAR name: Type = value;`, `VAL name = value;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    pub mutable: bool,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub value: Option<Expr>,
    #[serde(default)]
    pub span: Span,
    #[serde(skip)]
    pub variable: Slot<VariableBinding>,
}

impl Global {
    pub fn new(name: &str, mutable: bool, type_name: Option<&str>, value: Option<Expr>) -> Self {
        Self {
            name: name.to_string(),
            mutable,
            type_name: type_name.map(str::to_string),
            value,
            span: Span::dummy(),
            variable: Slot::Unresolved,
        }
    }
}

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub parameter_type_names: Vec<String>,
    #[serde(default)]
    pub return_type_name: Option<String>,
    pub statements: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
    #[serde(skip)]
    pub function: Slot<FunctionBinding>,
}

impl Function {
    /// `params` pairs each parameter name with its type name
    pub fn new(name: &str, params: &[(&str, &str)], return_type_name: Option<&str>, statements: Vec<Stmt>) -> Self {
        Self {
            name: name.to_string(),
            parameters: params.iter().map(|(name, _)| name.to_string()).collect(),
            parameter_type_names: params.iter().map(|(_, ty)| ty.to_string()).collect(),
            return_type_name: return_type_name.map(str::to_string),
            statements,
            span: Span::dummy(),
            function: Slot::Unresolved,
        }
    }
}

// ==================== Statements ====================

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// A function call evaluated for its side effects
    Expression {
        expr: Expr,
        #[serde(default)]
        span: Span,
    },
    /// LET name [: Type] [= value];
    Declaration {
        name: String,
        #[serde(default)]
        type_name: Option<String>,
        #[serde(default)]
        value: Option<Expr>,
        #[serde(default)]
        span: Span,
        #[serde(skip)]
        variable: Slot<VariableBinding>,
    },
    /// receiver = value;
    Assignment {
        receiver: Expr,
        value: Expr,
        #[serde(default)]
        span: Span,
    },
    If {
        condition: Expr,
        then_statements: Vec<Stmt>,
        #[serde(default)]
        else_statements: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    /// The last case is the default and carries no value
    Switch {
        condition: Expr,
        cases: Vec<Case>,
        #[serde(default)]
        span: Span,
    },
    While {
        condition: Expr,
        statements: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Return {
        value: Expr,
        #[serde(default)]
        span: Span,
    },
}

/// One arm of a switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    #[serde(default)]
    pub value: Option<Expr>,
    pub statements: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

impl Case {
    pub fn new(value: Expr, statements: Vec<Stmt>) -> Self {
        Self {
            value: Some(value),
            statements,
            span: Span::dummy(),
        }
    }

    /// The trailing DEFAULT arm
    pub fn default_case(statements: Vec<Stmt>) -> Self {
        Self {
            value: None,
            statements,
            span: Span::dummy(),
        }
    }
}

impl Stmt {
    pub fn expression(expr: Expr) -> Self {
        let span = expr.span;
        Stmt::Expression { expr, span }
    }

    pub fn declaration(name: &str, type_name: Option<&str>, value: Option<Expr>) -> Self {
        Stmt::Declaration {
            name: name.to_string(),
            type_name: type_name.map(str::to_string),
            value,
            span: Span::dummy(),
            variable: Slot::Unresolved,
        }
    }

    pub fn assignment(receiver: Expr, value: Expr) -> Self {
        let span = receiver.span.merge(&value.span);
        Stmt::Assignment { receiver, value, span }
    }

    pub fn if_else(condition: Expr, then_statements: Vec<Stmt>, else_statements: Vec<Stmt>) -> Self {
        Stmt::If {
            span: condition.span,
            condition,
            then_statements,
            else_statements,
        }
    }

    pub fn switch(condition: Expr, cases: Vec<Case>) -> Self {
        Stmt::Switch {
            span: condition.span,
            condition,
            cases,
        }
    }

    pub fn while_loop(condition: Expr, statements: Vec<Stmt>) -> Self {
        Stmt::While {
            span: condition.span,
            condition,
            statements,
        }
    }

    pub fn return_value(value: Expr) -> Self {
        let span = value.span;
        Stmt::Return { value, span }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Expression { span, .. } => *span,
            Stmt::Declaration { span, .. } => *span,
            Stmt::Assignment { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::Switch { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::Return { span, .. } => *span,
        }
    }
}

// ==================== Expressions ====================

/// Expression node with its resolved-type slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
    #[serde(skip)]
    pub ty: Slot<Type>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    /// Parenthesized binary expression
    Group(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `name` or `name[offset]`
    Access {
        name: String,
        #[serde(default)]
        offset: Option<Box<Expr>>,
        #[serde(skip)]
        variable: Slot<VariableBinding>,
    },
    FunctionCall {
        name: String,
        arguments: Vec<Expr>,
        #[serde(skip)]
        function: Slot<FunctionBinding>,
    },
    /// `[a, b, c]`
    List(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: Slot::Unresolved,
        }
    }

    /// Same node, located at `span`
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn literal(literal: impl Into<Literal>) -> Self {
        Self::new(ExprKind::Literal(literal.into()), Span::dummy())
    }

    pub fn nil() -> Self {
        Self::literal(Literal::Nil)
    }

    pub fn integer(value: i64) -> Self {
        Self::literal(Literal::Integer(BigInt::from(value)))
    }

    pub fn group(inner: Expr) -> Self {
        let span = inner.span;
        Self::new(ExprKind::Group(Box::new(inner)), span)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = left.span.merge(&right.span);
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn access(name: &str) -> Self {
        Self::new(
            ExprKind::Access {
                name: name.to_string(),
                offset: None,
                variable: Slot::Unresolved,
            },
            Span::dummy(),
        )
    }

    pub fn index(name: &str, offset: Expr) -> Self {
        let span = offset.span;
        Self::new(
            ExprKind::Access {
                name: name.to_string(),
                offset: Some(Box::new(offset)),
                variable: Slot::Unresolved,
            },
            span,
        )
    }

    pub fn call(name: &str, arguments: Vec<Expr>) -> Self {
        Self::new(
            ExprKind::FunctionCall {
                name: name.to_string(),
                arguments,
                function: Slot::Unresolved,
            },
            Span::dummy(),
        )
    }

    pub fn list(elements: Vec<Expr>) -> Self {
        Self::new(ExprKind::List(elements), Span::dummy())
    }

    /// Static type, once analyzed
    pub fn resolved_type(&self) -> Option<&Type> {
        self.ty.get()
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(#[serde(with = "display_fromstr")] BigInt),
    Decimal(#[serde(with = "display_fromstr")] Decimal),
    Character(char),
    String(String),
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<char> for Literal {
    fn from(value: char) -> Self {
        Literal::Character(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<Decimal> for Literal {
    fn from(value: Decimal) -> Self {
        Literal::Decimal(value)
    }
}

/// Big numbers travel as strings so trees stay readable as JSON
mod display_fromstr {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "^")]
    Pow,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        };
        write!(f, "{}", symbol)
    }
}
