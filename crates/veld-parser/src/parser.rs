// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The parser implementation using Pratt parsing for expressions.

use thiserror::Error;
use veld_ast::decl::{Decl, DeclKind, Field, FnDecl, Param, Program, StructDecl};
use veld_ast::expr::{BinOp, Expr, ExprKind, FieldInit, UnaryOp};
use veld_ast::stmt::{Stmt, StmtKind};
use veld_ast::token::{Token, TokenKind};
use veld_ast::{NodeId, Span};

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// The parser for Veld source code.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Controls whether `ident {` starts a struct literal (false in
    /// control flow headers, where `{` opens the body)
    allow_brace_expr: bool,
    /// Collected errors during parsing
    errors: Vec<ParseError>,
    /// Counter for generating unique NodeIds
    next_node_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, allow_brace_expr: true, errors: Vec::new(), next_node_id: 0 }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Record error, return if should continue.
    fn record_error(&mut self, error: ParseError) -> bool {
        self.errors.push(error);
        self.errors.len() < MAX_ERRORS
    }

    /// Skip to next declaration after error.
    fn synchronize(&mut self) {
        let mut brace_depth = 0;

        while !self.at_end() {
            match self.current_kind() {
                TokenKind::LBrace => {
                    brace_depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    if brace_depth > 0 {
                        brace_depth -= 1;
                        self.advance();
                        if brace_depth == 0 {
                            self.skip_newlines();
                            return;
                        }
                    } else {
                        self.advance();
                    }
                }
                TokenKind::Func | TokenKind::Type if brace_depth == 0 => {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // =========================================================================
    // Token Navigation
    // =========================================================================

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek(&self, n: usize) -> &TokenKind {
        self.tokens.get(self.pos + n).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.pos += 1;
        }
        self.tokens.get(self.pos - 1).unwrap()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(
                kind.display_name(),
                self.current_kind(),
                self.current().span,
            ))
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn expect_terminator(&mut self) -> Result<(), ParseError> {
        if self.check(&TokenKind::Newline) || self.check(&TokenKind::Semi) {
            self.advance();
            self.skip_newlines();
            Ok(())
        } else if self.check(&TokenKind::Eof) || self.check(&TokenKind::RBrace) {
            Ok(())
        } else {
            Err(ParseError::expected(
                "newline or ';'",
                self.current_kind(),
                self.current().span,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::expected(
                "a name",
                self.current_kind(),
                self.current().span,
            )),
        }
    }

    /// Start offset of the current token, for building spans.
    fn span_start(&self) -> usize {
        self.current().span.start
    }

    /// End offset of the last consumed token.
    fn prev_span_end(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Parse a whole source file.
    pub fn parse(&mut self) -> ParseResult {
        self.skip_newlines();

        let package = match self.parse_package_clause() {
            Ok(name) => name,
            Err(e) => {
                self.errors.push(e);
                String::new()
            }
        };

        let mut decls = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            match self.parse_decl() {
                Ok(decl) => decls.push(decl),
                Err(e) => {
                    if !self.record_error(e) {
                        break;
                    }
                    self.synchronize();
                }
            }
            self.skip_newlines();
        }

        ParseResult {
            program: Program { package, decls },
            errors: std::mem::take(&mut self.errors),
        }
    }

    fn parse_package_clause(&mut self) -> Result<String, ParseError> {
        self.expect(&TokenKind::Package)?;
        let name = self.expect_ident()?;
        self.expect_terminator()?;
        Ok(name)
    }

    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        let start = self.span_start();
        let kind = match self.current_kind() {
            TokenKind::Func => self.parse_fn_decl()?,
            TokenKind::Type => self.parse_struct_decl()?,
            _ => {
                return Err(ParseError::expected(
                    "declaration (func, type)",
                    self.current_kind(),
                    self.current().span,
                ));
            }
        };
        Ok(Decl {
            id: self.next_id(),
            kind,
            span: Span::new(start, self.prev_span_end()),
        })
    }

    fn parse_fn_decl(&mut self) -> Result<DeclKind, ParseError> {
        self.expect(&TokenKind::Func)?;
        let name = self.expect_ident()?;

        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::RParen)?;

        let ret = self.parse_ret_types()?;
        let body = self.parse_block()?;

        Ok(DeclKind::Fn(FnDecl { name, params, ret, body }))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RParen) && !self.at_end() {
            let name = self.expect_ident()?;
            let ty = self.parse_type_name()?;
            params.push(Param { name, ty });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        Ok(params)
    }

    /// Return types: nothing, a single type, or a parenthesized list.
    fn parse_ret_types(&mut self) -> Result<Vec<String>, ParseError> {
        if self.check(&TokenKind::LBrace) {
            return Ok(Vec::new());
        }
        if self.match_token(&TokenKind::LParen) {
            let mut types = Vec::new();
            self.skip_newlines();
            while !self.check(&TokenKind::RParen) && !self.at_end() {
                types.push(self.parse_type_name()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
                self.skip_newlines();
            }
            self.expect(&TokenKind::RParen)?;
            return Ok(types);
        }
        Ok(vec![self.parse_type_name()?])
    }

    /// Types are carried as plain strings; resolution happens downstream.
    fn parse_type_name(&mut self) -> Result<String, ParseError> {
        if self.match_token(&TokenKind::Star) {
            let inner = self.parse_type_name()?;
            return Ok(format!("*{}", inner));
        }
        if self.match_token(&TokenKind::LBracket) {
            self.expect(&TokenKind::RBracket)?;
            let inner = self.parse_type_name()?;
            return Ok(format!("[]{}", inner));
        }
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::expected(
                "type",
                self.current_kind(),
                self.current().span,
            )),
        }
    }

    fn parse_struct_decl(&mut self) -> Result<DeclKind, ParseError> {
        self.expect(&TokenKind::Type)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Struct)?;
        self.expect(&TokenKind::LBrace)?;
        self.skip_newlines();

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let field_name = self.expect_ident()?;
            let ty = self.parse_type_name()?;
            fields.push(Field { name: field_name, ty });
            self.expect_terminator()?;
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(DeclKind::Struct(StructDecl { name, fields }))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        self.skip_newlines();

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let stmt = self.parse_stmt()?;
            stmts.push(stmt);
            self.expect_terminator()?;
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span_start();
        let kind = match self.current_kind() {
            TokenKind::Return => self.parse_return_stmt()?,
            TokenKind::If => self.parse_if_stmt()?,
            TokenKind::For => self.parse_for_stmt()?,
            TokenKind::Var => self.parse_var_stmt()?,
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            _ if self.starts_short_decl() => self.parse_short_decl()?,
            _ => {
                let target = self.parse_expr(0)?;
                if self.match_token(&TokenKind::Eq) {
                    let value = self.parse_expr(0)?;
                    StmtKind::Assign { target, value }
                } else {
                    StmtKind::Expr(target)
                }
            }
        };
        Ok(Stmt {
            id: self.next_id(),
            kind,
            span: Span::new(start, self.prev_span_end()),
        })
    }

    /// Lookahead for `a := ...` / `a, b := ...` without consuming.
    fn starts_short_decl(&self) -> bool {
        if !matches!(self.current_kind(), TokenKind::Ident(_)) {
            return false;
        }
        let mut n = 1;
        loop {
            match self.peek(n) {
                TokenKind::ColonEq => return true,
                TokenKind::Comma => {
                    if matches!(self.peek(n + 1), TokenKind::Ident(_)) {
                        n += 2;
                    } else {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }

    /// `a := expr` or `a, b := expr`. The bound names form one
    /// allocation site; its type is inferred downstream.
    fn parse_short_decl(&mut self) -> Result<StmtKind, ParseError> {
        let mut names = vec![self.expect_ident()?];
        while self.match_token(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        self.expect(&TokenKind::ColonEq)?;
        let init = self.parse_expr(0)?;
        Ok(StmtKind::Alloc { names, ty: None, init, escapes: false })
    }

    /// `var a T = expr` or `var a, b T = expr` - like a short declaration
    /// but with the type written out.
    fn parse_var_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::Var)?;
        let mut names = vec![self.expect_ident()?];
        while self.match_token(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        let ty = self.parse_type_name()?;
        self.expect(&TokenKind::Eq)?;
        let init = self.parse_expr(0)?;
        Ok(StmtKind::Alloc { names, ty: Some(ty), init, escapes: false })
    }

    fn parse_return_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::Return)?;
        if self.check(&TokenKind::Newline)
            || self.check(&TokenKind::Semi)
            || self.check(&TokenKind::RBrace)
            || self.check(&TokenKind::Eof)
        {
            return Ok(StmtKind::Return(Vec::new()));
        }
        let mut values = vec![self.parse_expr(0)?];
        while self.match_token(&TokenKind::Comma) {
            self.skip_newlines();
            values.push(self.parse_expr(0)?);
        }
        Ok(StmtKind::Return(values))
    }

    fn parse_if_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::If)?;
        let cond = self.parse_header_expr()?;
        let then_body = self.parse_block()?;

        let else_body = if self.match_token(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                // else-if chains nest as a single-statement else body
                let start = self.span_start();
                let kind = self.parse_if_stmt()?;
                Some(vec![Stmt {
                    id: self.next_id(),
                    kind,
                    span: Span::new(start, self.prev_span_end()),
                }])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(StmtKind::If { cond, then_body, else_body })
    }

    fn parse_for_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::For)?;
        let cond = if self.check(&TokenKind::LBrace) {
            None
        } else {
            Some(self.parse_header_expr()?)
        };
        let body = self.parse_block()?;
        Ok(StmtKind::For { cond, body })
    }

    /// Parse a control-flow header expression with struct literals
    /// suppressed, so `{` opens the body (as in Go).
    fn parse_header_expr(&mut self) -> Result<Expr, ParseError> {
        let saved = self.allow_brace_expr;
        self.allow_brace_expr = false;
        let result = self.parse_expr(0);
        self.allow_brace_expr = saved;
        result
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    const PREFIX_BP: u8 = 13;

    fn postfix_bp(&self) -> Option<u8> {
        match self.current_kind() {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => Some(15),
            _ => None,
        }
    }

    fn infix_bp(&self) -> Option<(u8, u8)> {
        match self.current_kind() {
            TokenKind::PipePipe => Some((1, 2)),
            TokenKind::AmpAmp => Some((3, 4)),
            TokenKind::EqEq | TokenKind::BangEq => Some((5, 6)),
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => Some((7, 8)),
            TokenKind::Plus | TokenKind::Minus => Some((9, 10)),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((11, 12)),
            _ => None,
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if let Some(bp) = self.postfix_bp() {
                if bp < min_bp {
                    break;
                }
                lhs = self.parse_postfix(lhs)?;
                continue;
            }
            if let Some((lbp, rbp)) = self.infix_bp() {
                if lbp < min_bp {
                    break;
                }
                let op = self.parse_binop()?;
                let rhs = self.parse_expr(rbp)?;
                let span = Span::new(lhs.span.start, rhs.span.end);
                lhs = Expr {
                    id: self.next_id(),
                    kind: ExprKind::Binary { op, left: Box::new(lhs), right: Box::new(rhs) },
                    span,
                };
                continue;
            }
            break;
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let start = self.span_start();
        match self.current_kind().clone() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(self.make_expr(ExprKind::Int(value), start))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(self.make_expr(ExprKind::Str(value), start))
            }
            TokenKind::Bool(value) => {
                self.advance();
                Ok(self.make_expr(ExprKind::Bool(value), start))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.allow_brace_expr && self.check(&TokenKind::LBrace) {
                    let fields = self.parse_struct_lit_fields()?;
                    return Ok(self.make_expr(ExprKind::StructLit { name, fields }, start));
                }
                Ok(self.make_expr(ExprKind::Ident(name), start))
            }
            TokenKind::Amp => self.parse_unary(UnaryOp::Addr, start),
            TokenKind::Minus => self.parse_unary(UnaryOp::Neg, start),
            TokenKind::Bang => self.parse_unary(UnaryOp::Not, start),
            TokenKind::Star => self.parse_unary(UnaryOp::Deref, start),
            TokenKind::LParen => {
                self.advance();
                // A parenthesized group re-enables struct literals even
                // inside control flow headers
                let saved = self.allow_brace_expr;
                self.allow_brace_expr = true;
                self.skip_newlines();
                let expr = self.parse_expr(0);
                self.allow_brace_expr = saved;
                let expr = expr?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(ParseError::expected(
                "expression",
                self.current_kind(),
                self.current().span,
            )),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, start: usize) -> Result<Expr, ParseError> {
        self.advance();
        let operand = self.parse_expr(Self::PREFIX_BP)?;
        Ok(self.make_expr(
            ExprKind::Unary { op, operand: Box::new(operand) },
            start,
        ))
    }

    fn parse_postfix(&mut self, lhs: Expr) -> Result<Expr, ParseError> {
        let start = lhs.span.start;
        match self.current_kind() {
            TokenKind::Dot => {
                self.advance();
                let field = self.expect_ident()?;
                Ok(self.make_expr(
                    ExprKind::Field { object: Box::new(lhs), field },
                    start,
                ))
            }
            TokenKind::LParen => {
                self.advance();
                let saved = self.allow_brace_expr;
                self.allow_brace_expr = true;
                let args = self.parse_call_args();
                self.allow_brace_expr = saved;
                let args = args?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.make_expr(
                    ExprKind::Call { func: Box::new(lhs), args },
                    start,
                ))
            }
            TokenKind::LBracket => {
                self.advance();
                let saved = self.allow_brace_expr;
                self.allow_brace_expr = true;
                let index = self.parse_expr(0);
                self.allow_brace_expr = saved;
                let index = index?;
                self.expect(&TokenKind::RBracket)?;
                Ok(self.make_expr(
                    ExprKind::Index { object: Box::new(lhs), index: Box::new(index) },
                    start,
                ))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RParen) && !self.at_end() {
            args.push(self.parse_expr(0)?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        Ok(args)
    }

    /// Field initializers of a struct literal; the `{` is current.
    /// Fields may span lines: `Foo{\n num: 300,\n}`.
    fn parse_struct_lit_fields(&mut self) -> Result<Vec<FieldInit>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let saved = self.allow_brace_expr;
        self.allow_brace_expr = true;
        let result = self.parse_struct_lit_fields_inner();
        self.allow_brace_expr = saved;
        let fields = result?;
        self.expect(&TokenKind::RBrace)?;
        Ok(fields)
    }

    fn parse_struct_lit_fields_inner(&mut self) -> Result<Vec<FieldInit>, ParseError> {
        let mut fields = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expr(0)?;
            fields.push(FieldInit { name, value });
            if !self.match_token(&TokenKind::Comma) {
                self.skip_newlines();
                break;
            }
            self.skip_newlines();
        }
        Ok(fields)
    }

    fn parse_binop(&mut self) -> Result<BinOp, ParseError> {
        let op = match self.current_kind() {
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::BangEq => BinOp::Ne,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::LtEq => BinOp::Le,
            TokenKind::GtEq => BinOp::Ge,
            TokenKind::AmpAmp => BinOp::And,
            TokenKind::PipePipe => BinOp::Or,
            _ => {
                return Err(ParseError::expected(
                    "operator like '+' or '-'",
                    self.current_kind(),
                    self.current().span,
                ));
            }
        };
        self.advance();
        Ok(op)
    }

    fn make_expr(&mut self, kind: ExprKind, start: usize) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
            span: Span::new(start, self.prev_span_end()),
        }
    }
}

/// Result of parsing: the program plus any errors found.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Returns true if parsing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A parser error with location and friendly message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl ParseError {
    fn expected(expected: &str, found: &TokenKind, span: Span) -> Self {
        let message = format_expected_message(expected, found);
        let hint = crate::hints::for_expected(expected, found).map(String::from);
        Self { span, message, hint }
    }
}

/// Format a user-friendly "expected X, found Y" message.
fn format_expected_message(expected: &str, found: &TokenKind) -> String {
    match expected {
        "newline or ';'" => "Expected ';' or newline after statement".to_string(),
        "'{'" => format!("Expected '{{' to start block, found {}", found.display_name()),
        "'}'" => format!("Expected '}}' to close block, found {}", found.display_name()),
        "')'" => {
            if matches!(found, TokenKind::Eof) {
                "Unclosed '(' - missing ')'".to_string()
            } else {
                format!("Expected ')', found {}", found.display_name())
            }
        }
        "']'" => {
            if matches!(found, TokenKind::Eof) {
                "Unclosed '[' - missing ']'".to_string()
            } else {
                format!("Expected ']', found {}", found.display_name())
            }
        }
        "a name" => format!("Expected name, found {}", found.display_name()),
        "expression" => format!("Expected expression, found {}", found.display_name()),
        "type" => format!("Expected type, found {}", found.display_name()),
        "declaration (func, type)" => {
            format!("Expected declaration, found {}", found.display_name())
        }
        _ => format!("Expected {}, found {}", expected, found.display_name()),
    }
}
