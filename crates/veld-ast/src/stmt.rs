//! Statement AST nodes.

use crate::{NodeId, Span};
use crate::expr::Expr;

/// A statement in the AST.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),
    /// Short variable declaration (`a := expr` or `a, b := expr`).
    ///
    /// This is the allocation site of the bound value(s). `names` is
    /// ordered and never empty; `ty` is the declared type when one is
    /// written, inferred downstream otherwise. `escapes` starts false and
    /// is raised by escape analysis when the value's lifetime outlives
    /// the enclosing function's frame; lowering maps false to frame-local
    /// storage and true to heap storage.
    Alloc {
        names: Vec<String>,
        ty: Option<String>,
        init: Expr,
        escapes: bool,
    },
    /// Assignment to an existing place
    Assign {
        target: Expr,
        value: Expr,
    },
    /// Return statement, zero or more values
    Return(Vec<Expr>),
    /// If statement
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    /// For loop; `cond: None` loops forever
    For {
        cond: Option<Expr>,
        body: Vec<Stmt>,
    },
    /// Break statement
    Break,
    /// Continue statement
    Continue,
}
