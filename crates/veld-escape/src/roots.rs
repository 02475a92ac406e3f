// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Escaping-root collection.
//!
//! A root is the outermost named binding a returned expression's
//! reference chain originates from. Returning `x`, `&x`, `x.field`, or a
//! literal whose field initializers mention `x` all root at `x`.

use std::collections::HashSet;

use veld_ast::expr::{Expr, ExprKind, UnaryOp};
use veld_ast::stmt::{Stmt, StmtKind};

/// Union the root names of every return statement in the body.
///
/// All returns count, regardless of which branch or loop they sit in: a
/// value returned on any path escapes on every path.
pub(crate) fn collect(body: &[Stmt]) -> HashSet<String> {
    let mut roots = HashSet::new();
    collect_block(body, &mut roots);
    roots
}

fn collect_block(stmts: &[Stmt], roots: &mut HashSet<String>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Return(values) => {
                for value in values {
                    collect_expr(value, roots);
                }
            }
            StmtKind::If { then_body, else_body, .. } => {
                collect_block(then_body, roots);
                if let Some(else_body) = else_body {
                    collect_block(else_body, roots);
                }
            }
            StmtKind::For { body, .. } => {
                collect_block(body, roots);
            }
            StmtKind::Alloc { .. }
            | StmtKind::Assign { .. }
            | StmtKind::Expr(_)
            | StmtKind::Break
            | StmtKind::Continue => {}
        }
    }
}

fn collect_expr(expr: &Expr, roots: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Ident(name) => {
            roots.insert(name.clone());
        }
        // `&x` escapes the named slot itself, not a synthetic value
        ExprKind::Unary { op: UnaryOp::Addr | UnaryOp::Deref, operand } => {
            collect_expr(operand, roots);
        }
        // Place chains resolve to their base
        ExprKind::Field { object, .. } | ExprKind::Index { object, .. } => {
            collect_expr(object, roots);
        }
        // An inline literal roots at whatever its fields reference
        ExprKind::StructLit { fields, .. } => {
            for field in fields {
                collect_expr(&field.value, roots);
            }
        }
        // Everything else produces a fresh value; no named slot is
        // reachable through it
        ExprKind::Int(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::Unary { .. }
        | ExprKind::Binary { .. }
        | ExprKind::Call { .. } => {}
    }
}
