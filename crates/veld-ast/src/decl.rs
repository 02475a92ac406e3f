// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration AST nodes.

use crate::{NodeId, Span};
use crate::stmt::Stmt;

/// A parsed source file: the package clause plus its top-level
/// declarations, in source order.
#[derive(Debug, Clone)]
pub struct Program {
    pub package: String,
    pub decls: Vec<Decl>,
}

/// A top-level declaration.
#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub kind: DeclKind,
    pub span: Span,
}

/// The kind of declaration.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// Function declaration
    Fn(FnDecl),
    /// Struct type declaration
    Struct(StructDecl),
}

/// A function declaration.
///
/// Each function body is an independent unit of analysis; semantic passes
/// never carry state from one `FnDecl` to another.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// Return types; empty means no return value, more than one is a
    /// multi-value return.
    pub ret: Vec<String>,
    pub body: Vec<Stmt>,
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

/// A struct type declaration (`type Name struct { ... }`).
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

/// A struct field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: String,
}
