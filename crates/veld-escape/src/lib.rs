// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Escape analysis for the Veld language.
//!
//! For every local binding, this pass decides whether the bound value can
//! live in the function's stack frame or must be heap-allocated because
//! its lifetime outlives the call. Lowering reads the verdict off each
//! allocation site: `escapes == false` means frame-local storage is safe,
//! `escapes == true` requires heap storage.
//!
//! The analysis is strictly per function:
//! - Every return statement in the body is scanned (branches and loops
//!   included) and the returned expressions' root names are unioned.
//! - An allocation site escapes iff one of its bound names is in that
//!   union. Returning by value and by address are treated alike.
//! - Sites never mentioned by a return keep `escapes == false`, whatever
//!   else the function does with them. Escape through call arguments,
//!   field stores into other values, and similar channels is not modeled.
//!
//! Known limitation: an aggregate whose field holds a pointer to a
//! separately constructed inner literal (`Foo{bar: &Bar{...}}`) is marked
//! as one unit. The inner literal is not split into its own site with its
//! own verdict.
//!
//! The pass is total over well-formed trees: it never fails, performs no
//! I/O, allocates no new nodes, and only ever raises `escapes` flags
//! (running it again reproduces the same verdicts).

mod roots;

use std::collections::HashSet;

use veld_ast::decl::{DeclKind, FnDecl, Program};
use veld_ast::stmt::{Stmt, StmtKind};

/// Annotate every allocation site in the program with its escape verdict.
pub fn analyze(program: &mut Program) {
    for decl in &mut program.decls {
        match &mut decl.kind {
            DeclKind::Fn(f) => analyze_fn(f),
            DeclKind::Struct(_) => {}
        }
    }
}

/// Analyze a single function body.
///
/// Functions share no analysis state, so callers may process them in any
/// order (or in parallel over disjoint `&mut FnDecl`s) and get identical
/// verdicts.
pub fn analyze_fn(f: &mut FnDecl) {
    let roots = roots::collect(&f.body);
    stamp_block(&mut f.body, &roots);
}

fn stamp_block(stmts: &mut [Stmt], roots: &HashSet<String>) {
    for stmt in stmts {
        match &mut stmt.kind {
            StmtKind::Alloc { names, escapes, .. } => {
                // Multi-name sites escape as one unit. The flag is only
                // ever raised, never cleared.
                if names.iter().any(|name| roots.contains(name)) {
                    *escapes = true;
                }
            }
            StmtKind::If { then_body, else_body, .. } => {
                stamp_block(then_body, roots);
                if let Some(else_body) = else_body {
                    stamp_block(else_body, roots);
                }
            }
            StmtKind::For { body, .. } => {
                stamp_block(body, roots);
            }
            StmtKind::Assign { .. }
            | StmtKind::Expr(_)
            | StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(src: &str) -> Program {
        let lex_result = veld_lexer::Lexer::new(src).tokenize();
        assert!(lex_result.is_ok(), "Lex errors: {:?}", lex_result.errors);
        let parse_result = veld_parser::Parser::new(lex_result.tokens).parse();
        assert!(parse_result.is_ok(), "Parse errors: {:?}", parse_result.errors);
        parse_result.program
    }

    /// Every allocation site in the program, keyed by its first bound
    /// name, with its verdict.
    fn alloc_verdicts(program: &Program) -> Vec<(String, bool)> {
        fn walk(stmts: &[Stmt], out: &mut Vec<(String, bool)>) {
            for stmt in stmts {
                match &stmt.kind {
                    StmtKind::Alloc { names, escapes, .. } => {
                        out.push((names[0].clone(), *escapes));
                    }
                    StmtKind::If { then_body, else_body, .. } => {
                        walk(then_body, out);
                        if let Some(else_body) = else_body {
                            walk(else_body, out);
                        }
                    }
                    StmtKind::For { body, .. } => walk(body, out),
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        for decl in &program.decls {
            if let DeclKind::Fn(f) = &decl.kind {
                walk(&f.body, &mut out);
            }
        }
        out
    }

    /// Parse, analyze, and compare every allocation site's verdict
    /// against the expectation map (which must cover every site).
    fn escape_check(src: &str, expected: &[(&str, bool)]) {
        let mut program = parse(src);
        analyze(&mut program);

        let verdicts = alloc_verdicts(&program);
        let expected: HashMap<&str, bool> = expected.iter().copied().collect();
        for (name, escapes) in &verdicts {
            assert_eq!(
                expected.get(name.as_str()),
                Some(escapes),
                "verdict for `{}`",
                name
            );
        }
        assert_eq!(verdicts.len(), expected.len());
    }

    #[test]
    fn no_escape() {
        escape_check(
            "package main\n\nfunc main() {\n\ta := 100\n\tb := 200\n}\n",
            &[("a", false), ("b", false)],
        );
    }

    #[test]
    fn escapes_by_value() {
        escape_check(
            "package main\n\nfunc main() int {\n\ta := 100\n\tb := 200\n\treturn b\n}\n",
            &[("a", false), ("b", true)],
        );
    }

    #[test]
    fn escapes_by_address() {
        escape_check(
            "package main\n\nfunc main() *int {\n\ta := 100\n\tb := 200\n\treturn &b\n}\n",
            &[("a", false), ("b", true)],
        );
    }

    #[test]
    fn escapes_struct_pointer() {
        escape_check(
            "package main\n\ntype mytype struct {\n\ta int\n\tb int\n}\n\nfunc main() *mytype {\n\ta := 100\n\tb := mytype{\n\t\ta: 100,\n\t\tb: 200,\n\t}\n\treturn &b\n}\n",
            &[("a", false), ("b", true)],
        );
    }

    #[test]
    fn nested_literal_marks_outer_site_only() {
        // The inner &Bar{...} literal is not an independent site; only
        // the named outer allocation gets a verdict.
        escape_check(
            "package main\n\ntype Bar struct {\n\tnum int\n}\n\ntype Foo struct {\n\tnum int\n\tbar *Bar\n}\n\nfunc GetFooPtr() *Foo {\n\tf := Foo{\n\t\tnum: 300,\n\t\tbar: &Bar{num: 400},\n\t}\n\treturn &f\n}\n",
            &[("f", true)],
        );
    }

    #[test]
    fn inline_literal_roots_named_fields() {
        // Returning a freshly built literal escapes the named bindings
        // its fields reference, not the anonymous literal itself.
        escape_check(
            "package main\n\ntype pair struct {\n\tx int\n\ty int\n}\n\nfunc make() pair {\n\ta := 1\n\tb := 2\n\tc := 3\n\treturn pair{x: a, y: b}\n}\n",
            &[("a", true), ("b", true), ("c", false)],
        );
    }

    #[test]
    fn return_in_branch_counts() {
        // No control-flow sensitivity: a return on any path escapes.
        escape_check(
            "package main\n\nfunc pick(flag bool) *int {\n\ta := 1\n\tb := 2\n\tif flag {\n\t\treturn &a\n\t}\n\tfor flag {\n\t\treturn &b\n\t}\n\treturn &a\n}\n",
            &[("a", true), ("b", true)],
        );
    }

    #[test]
    fn alloc_in_branch_gets_verdict() {
        escape_check(
            "package main\n\nfunc f(flag bool) *int {\n\tif flag {\n\t\tinner := 5\n\t\treturn &inner\n\t}\n\touter := 6\n\treturn &outer\n}\n",
            &[("inner", true), ("outer", true)],
        );
    }

    #[test]
    fn field_access_roots_base() {
        escape_check(
            "package main\n\ntype Foo struct {\n\tnum int\n}\n\nfunc get() int {\n\tf := Foo{num: 1}\n\tg := Foo{num: 2}\n\treturn f.num\n}\n",
            &[("f", true), ("g", false)],
        );
    }

    #[test]
    fn multi_value_return() {
        escape_check(
            "package main\n\nfunc f() (int, int) {\n\ta := 1\n\tb := 2\n\tc := 3\n\treturn a, b\n}\n",
            &[("a", true), ("b", true), ("c", false)],
        );
    }

    #[test]
    fn multi_name_site_escapes_as_unit() {
        escape_check(
            "package main\n\nfunc f() int {\n\ta, b := pair()\n\tc := 3\n\treturn a\n}\n",
            &[("a", true), ("c", false)],
        );
    }

    #[test]
    fn var_decl_escapes_by_address() {
        escape_check(
            "package main\n\nfunc f() *int {\n\tvar n int = 5\n\tvar m int = 6\n\treturn &n\n}\n",
            &[("n", true), ("m", false)],
        );
    }

    #[test]
    fn bound_literal_does_not_chain_to_its_fields() {
        // `f` escapes through `return &f`; `a` is only mentioned in f's
        // initializer, not in any return, so it keeps its own verdict.
        escape_check(
            "package main\n\ntype Foo struct {\n\tptr *int\n}\n\nfunc get() *Foo {\n\ta := 100\n\tf := Foo{ptr: &a}\n\treturn &f\n}\n",
            &[("a", false), ("f", true)],
        );
    }

    #[test]
    fn other_uses_do_not_escape() {
        // Passing an address to a call or storing into another value's
        // field is not a modeled escape channel; only returns count.
        escape_check(
            "package main\n\nfunc f() int {\n\ta := 100\n\tsink(&a)\n\tb := holder{}\n\tb.ptr = &a\n\tc := 1\n\treturn c\n}\n",
            &[("a", false), ("b", false), ("c", true)],
        );
    }

    #[test]
    fn call_results_are_fresh_values() {
        escape_check(
            "package main\n\nfunc f() int {\n\ta := 1\n\treturn id(a)\n}\n",
            &[("a", false)],
        );
    }

    #[test]
    fn arithmetic_results_are_fresh_values() {
        escape_check(
            "package main\n\nfunc f() int {\n\ta := 1\n\tb := 2\n\treturn a + b\n}\n",
            &[("a", false), ("b", false)],
        );
    }

    #[test]
    fn bare_return_roots_nothing() {
        escape_check(
            "package main\n\nfunc f() {\n\ta := 1\n\treturn\n}\n",
            &[("a", false)],
        );
    }

    #[test]
    fn functions_are_independent() {
        // A return in one function never marks a site in another, even
        // when the binding names collide.
        let mut program = parse(
            "package main\n\nfunc f() int {\n\tx := 1\n\treturn x\n}\n\nfunc g() {\n\tx := 1\n}\n",
        );
        analyze(&mut program);
        assert_eq!(
            alloc_verdicts(&program),
            vec![("x".to_string(), true), ("x".to_string(), false)]
        );
    }

    #[test]
    fn idempotent() {
        let src = "package main\n\nfunc f() *int {\n\ta := 1\n\tb := 2\n\treturn &b\n}\n";
        let mut program = parse(src);
        analyze(&mut program);
        let first = alloc_verdicts(&program);
        analyze(&mut program);
        let second = alloc_verdicts(&program);
        assert_eq!(first, second);
    }

    #[test]
    fn order_independent() {
        let src = "package main\n\nfunc f() int {\n\ta := 1\n\treturn a\n}\n\nfunc g() *int {\n\tb := 2\n\tc := 3\n\treturn &c\n}\n";

        let mut forward = parse(src);
        analyze(&mut forward);

        let mut reversed = parse(src);
        reversed.decls.reverse();
        for decl in &mut reversed.decls {
            if let DeclKind::Fn(f) = &mut decl.kind {
                analyze_fn(f);
            }
        }

        let mut expected = alloc_verdicts(&forward);
        expected.sort();
        let mut got = alloc_verdicts(&reversed);
        got.sort();
        assert_eq!(expected, got);
    }
}
