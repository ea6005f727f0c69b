//! Typed abstract syntax for WLP4 programs.
//!
//! The derivation tree produced by the parser stage is lowered once into the
//! types here (see [`lower`]); the semantic passes and the code generator
//! then dispatch by exhaustive pattern matching instead of production-string
//! comparison. Parenthesized expressions and lvalues are dissolved during
//! lowering, so the tree carries only meaningful structure.

mod lower;

pub use lower::lower;

use smol_str::SmolStr;
use std::fmt;

/// A WLP4 value type. The language has exactly two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer.
    Int,
    /// Pointer to a 32-bit signed integer.
    IntStar,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::IntStar => write!(f, "int*"),
        }
    }
}

/// A whole translation unit: user procedures in source order, then `wain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// User-defined procedures in declaration order.
    pub procedures: Vec<Procedure>,
    /// The main procedure.
    pub main: Main,
}

/// A user-defined procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    /// The procedure name.
    pub name: SmolStr,
    /// Parameter declarations in source order.
    pub params: Vec<Dcl>,
    /// The procedure body.
    pub body: Body,
}

/// The `wain` entry procedure. Its two parameters are fixed by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Main {
    /// The two entry parameters.
    pub params: [Dcl; 2],
    /// The procedure body.
    pub body: Body,
}

/// Shared body shape: local declarations, statements, return expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Initialized local declarations in source order.
    pub dcls: Vec<LocalDecl>,
    /// Statements in source order.
    pub statements: Vec<Statement>,
    /// The return expression.
    pub ret: Expr,
}

/// A bare declaration: type and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dcl {
    /// The declared type.
    pub ty: Type,
    /// The declared name.
    pub name: SmolStr,
}

impl Dcl {
    /// Creates a declaration.
    pub fn new(ty: Type, name: impl Into<SmolStr>) -> Self {
        Self {
            ty,
            name: name.into(),
        }
    }
}

/// A local declaration with its mandatory initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecl {
    /// The declared variable.
    pub dcl: Dcl,
    /// The initializer.
    pub init: Initializer,
}

/// The two initializer forms the grammar admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initializer {
    /// An integer literal.
    Number(i32),
    /// The `NULL` literal.
    Null,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `lvalue = expr;`
    Assign {
        /// The assignment target.
        target: Lvalue,
        /// The assigned value.
        value: Expr,
    },
    /// `if (test) { ... } else { ... }` (the else branch is mandatory).
    If {
        /// The branch condition.
        test: Test,
        /// Statements of the then branch.
        then_branch: Vec<Statement>,
        /// Statements of the else branch.
        else_branch: Vec<Statement>,
    },
    /// `while (test) { ... }`
    While {
        /// The loop condition.
        test: Test,
        /// The loop body.
        body: Vec<Statement>,
    },
    /// `println(expr);`
    Println(Expr),
    /// `delete [] expr;`
    Delete(Expr),
}

/// A comparison between two expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Test {
    /// The comparison operator.
    pub op: Comparison,
    /// The left operand.
    pub lhs: Expr,
    /// The right operand.
    pub rhs: Expr,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

/// An expression together with its inferred type.
///
/// The type starts unset and is filled in by the typing pass; reading it
/// before analysis is a caller bug, not a reportable error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    /// The expression shape.
    pub kind: ExprKind,
    ty: Option<Type>,
}

impl Expr {
    /// Creates an untyped expression.
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, ty: None }
    }

    /// Shorthand for an integer literal.
    pub fn number(value: i32) -> Self {
        Self::new(ExprKind::Number(value))
    }

    /// Shorthand for the `NULL` literal.
    pub fn null() -> Self {
        Self::new(ExprKind::Null)
    }

    /// Shorthand for a variable reference.
    pub fn variable(name: impl Into<SmolStr>) -> Self {
        Self::new(ExprKind::Variable(name.into()))
    }

    /// Shorthand for a binary operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// The inferred type.
    ///
    /// # Panics
    ///
    /// Panics if the typing pass has not annotated this node.
    pub fn ty(&self) -> Type {
        self.ty.expect("expression type resolved during analysis")
    }

    /// The inferred type, if the typing pass has run.
    pub fn ty_opt(&self) -> Option<Type> {
        self.ty
    }

    pub(crate) fn set_ty(&mut self, ty: Type) {
        self.ty = Some(ty);
    }
}

/// Expression shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// An integer literal.
    Number(i32),
    /// The `NULL` literal.
    Null,
    /// A variable reference.
    Variable(SmolStr),
    /// A procedure call.
    Call {
        /// The callee name.
        name: SmolStr,
        /// Arguments in source order.
        arguments: Vec<Expr>,
    },
    /// `& lvalue`
    AddressOf(Lvalue),
    /// `* expr`
    Dereference(Box<Expr>),
    /// `new int [expr]`
    New(Box<Expr>),
    /// A binary arithmetic operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left operand.
        lhs: Box<Expr>,
        /// The right operand.
        rhs: Box<Expr>,
    },
}

/// An assignable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lvalue {
    /// A named variable slot.
    Variable(SmolStr),
    /// A dereferenced pointer expression.
    Dereference(Box<Expr>),
}
