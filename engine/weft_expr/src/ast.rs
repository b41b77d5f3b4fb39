//! Expression tree.

/// Binary operator, in precedence tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
}

/// Unary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

/// Parsed expression.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Expr {
    /// Literal number.
    Number(f64),
    /// Literal string.
    Str(String),
    /// Literal boolean.
    Bool(bool),
    /// `null`.
    Null,
    /// `undefined`.
    Undefined,
    /// Array literal.
    Array(Vec<Expr>),
    /// Bare identifier.
    Ident(String),
    /// Static member access `base.name`.
    Member(Box<Expr>, String),
    /// Computed index `base[index]`.
    Index(Box<Expr>, Box<Expr>),
    /// Unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Conditional `cond ? then : else`.
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}
