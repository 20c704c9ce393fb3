//! Identifier prefixing.
//!
//! Free identifiers in template expressions are rewritten to `_ctx.name` so the
//! render function can run without a `with` block. The rewriter is a single-pass
//! scanner over the expression text: it understands string and template literals,
//! member access, object keys and shorthands, and arrow-function parameters, which
//! covers what template expressions use in practice.

use vellum_carton::{is_simple_identifier, phf_set, PhfSet, String};
use vellum_relief::ast::{
    ConstantType, DirectiveKind, ExpressionNode, NodeId, NodeKind, PropNode, SimpleExpressionNode,
};

use crate::transform::{TransformAction, TransformContext};

static GLOBALS_ALLOWED: PhfSet<&'static str> = phf_set! {
    "Infinity", "undefined", "NaN", "isFinite", "isNaN", "parseFloat", "parseInt",
    "decodeURI", "decodeURIComponent", "encodeURI", "encodeURIComponent", "Math",
    "Number", "Date", "Array", "Object", "Boolean", "String", "RegExp", "Map", "Set",
    "JSON", "Intl", "BigInt", "console", "Error",
};

static KEYWORDS: PhfSet<&'static str> = phf_set! {
    "true", "false", "null", "this", "arguments", "await", "async", "break", "case",
    "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "of", "return", "super", "switch", "throw", "try",
    "typeof", "var", "void", "while", "with", "yield",
};

pub fn is_global_allowed(name: &str) -> bool {
    GLOBALS_ALLOWED.contains(name)
}

fn is_literal(name: &str) -> bool {
    matches!(name, "true" | "false" | "null" | "this")
}

/// Node transform: prefix interpolations and directive expressions.
pub fn transform_expression(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    if !ctx.prefix_identifiers {
        return TransformAction::Continue;
    }
    match &ctx.ast.node(node).kind {
        NodeKind::Interpolation(interp) => {
            if let ExpressionNode::Simple(exp) = &interp.content {
                let processed = process_expression(ctx, exp, false);
                if let NodeKind::Interpolation(interp) = &mut ctx.ast.node_mut(node).kind {
                    interp.content = ExpressionNode::Simple(processed);
                }
            }
        }
        NodeKind::Element(el) => {
            let mut props = el.props.clone();
            for prop in props.iter_mut() {
                let PropNode::Directive(dir) = prop else { continue };
                if dir.kind == DirectiveKind::For {
                    continue;
                }
                let skip_exp = dir.kind == DirectiveKind::On && dir.arg.is_some();
                if let (false, Some(ExpressionNode::Simple(exp))) = (skip_exp, &dir.exp) {
                    let as_params = dir.kind == DirectiveKind::Slot;
                    dir.exp = Some(ExpressionNode::Simple(process_expression(ctx, exp, as_params)));
                }
                if let Some(ExpressionNode::Simple(arg)) = &dir.arg {
                    if !arg.is_static {
                        dir.arg = Some(ExpressionNode::Simple(process_expression(ctx, arg, false)));
                    }
                }
            }
            if let Some(el) = ctx.ast.element_mut(node) {
                el.props = props;
            }
        }
        _ => {}
    }
    TransformAction::Continue
}

/// Rewrite one simple expression. `as_params` marks a parameter list (slot props,
/// v-for aliases) whose identifiers are declarations, not references.
pub fn process_expression(
    ctx: &TransformContext,
    exp: &SimpleExpressionNode,
    as_params: bool,
) -> SimpleExpressionNode {
    if !ctx.prefix_identifiers || exp.is_static || exp.content.trim().is_empty() {
        return exp.clone();
    }
    let raw = exp.content.as_str();
    let mut out = exp.clone();

    if as_params {
        out.identifiers = extract_param_identifiers(raw);
        return out;
    }

    if is_simple_identifier(raw) {
        let in_scope = ctx.is_in_scope(raw);
        let global = is_global_allowed(raw);
        let literal = is_literal(raw);
        if !in_scope && !global && !literal {
            out.content = vellum_carton::format_compact!("_ctx.{}", raw);
        } else if !in_scope {
            out.const_type = if literal {
                ConstantType::CanStringify
            } else {
                ConstantType::CanHoist
            };
        }
        return out;
    }

    let rewritten = rewrite_identifiers(raw, &|name| ctx.is_in_scope(name));
    out.content = rewritten.code.as_str().into();
    if rewritten.prefixed == 0 && rewritten.scope_refs == 0 && !bails_constant(raw) {
        out.const_type = ConstantType::CanStringify;
    }
    out
}

/// Whether an expression references any identifier currently in scope.
pub fn has_scope_ref(ctx: &TransformContext, exp: &ExpressionNode) -> bool {
    match exp {
        ExpressionNode::Simple(s) if s.is_static => false,
        ExpressionNode::Simple(s) => {
            rewrite_identifiers(&s.content, &|name| ctx.is_in_scope(name)).scope_refs > 0
        }
        ExpressionNode::Compound(c) => {
            rewrite_identifiers(&c.loc.source, &|name| ctx.is_in_scope(name)).scope_refs > 0
        }
    }
}

/// Calls and member access make an expression unsafe to treat as constant.
fn bails_constant(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'(' {
            let before = raw[..i].trim_end();
            if before
                .bytes()
                .last()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'$')
            {
                return true;
            }
        }
        if b == b'.' && bytes.get(i + 1).is_some_and(|c| !c.is_ascii_digit()) {
            return true;
        }
    }
    false
}

/// Result of [`rewrite_identifiers`].
#[derive(Debug, Default)]
pub struct Rewritten {
    pub code: std::string::String,
    /// Identifiers rewritten to `_ctx.`
    pub prefixed: usize,
    /// References to in-scope identifiers or local arrow parameters
    pub scope_refs: usize,
}

/// Prefix every free identifier in `source` with `_ctx.`.
pub fn rewrite_identifiers(source: &str, in_scope: &dyn Fn(&str) -> bool) -> Rewritten {
    let mut rewriter = Rewriter {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        out: std::string::String::with_capacity(source.len() + 16),
        brackets: Vec::new(),
        locals: Vec::new(),
        in_scope,
        prefixed: 0,
        scope_refs: 0,
    };
    rewriter.run(source.len());
    Rewritten {
        code: rewriter.out,
        prefixed: rewriter.prefixed,
        scope_refs: rewriter.scope_refs,
    }
}

struct Rewriter<'a, 'f> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: std::string::String,
    brackets: Vec<u8>,
    locals: Vec<&'a str>,
    in_scope: &'f dyn Fn(&str) -> bool,
    prefixed: usize,
    scope_refs: usize,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

impl<'a> Rewriter<'a, '_> {
    fn run(&mut self, end: usize) {
        while self.pos < end {
            let b = self.bytes[self.pos];
            match b {
                b'\'' | b'"' => self.copy_string(b),
                b'`' => self.copy_template(),
                b'0'..=b'9' => self.copy_number(),
                b'.' if self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit)
                    && !self.prev_is_ident() =>
                {
                    self.copy_number()
                }
                b'(' => self.open_paren(),
                b'{' | b'[' => {
                    self.brackets.push(b);
                    self.copy(1);
                }
                b')' | b'}' | b']' => {
                    self.brackets.pop();
                    self.copy(1);
                }
                b if is_ident_start(b) => self.identifier(),
                _ => self.copy(1),
            }
        }
    }

    fn copy(&mut self, n: usize) {
        let end = (self.pos + n).min(self.bytes.len());
        self.out.push_str(&self.source[self.pos..end]);
        self.pos = end;
    }

    fn copy_to(&mut self, end: usize) {
        self.out.push_str(&self.source[self.pos..end]);
        self.pos = end;
    }

    fn prev_is_ident(&self) -> bool {
        self.pos > 0 && is_ident_char(self.bytes[self.pos - 1])
    }

    fn copy_string(&mut self, quote: u8) {
        let mut i = self.pos + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b if b == quote => {
                    i += 1;
                    break;
                }
                _ => i += 1,
            }
        }
        self.copy_to(i.min(self.bytes.len()));
    }

    fn copy_template(&mut self) {
        self.copy(1);
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.copy(2),
                b'`' => {
                    self.copy(1);
                    return;
                }
                b'$' if self.bytes.get(self.pos + 1) == Some(&b'{') => {
                    self.copy(2);
                    let close = self.matching(self.pos, b'{', b'}');
                    self.run(close);
                    self.copy(1);
                }
                _ => {
                    let ch_len = self.source[self.pos..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    self.copy(ch_len);
                }
            }
        }
    }

    fn copy_number(&mut self) {
        let mut i = self.pos;
        while i < self.bytes.len() && (is_ident_char(self.bytes[i]) || self.bytes[i] == b'.') {
            i += 1;
        }
        self.copy_to(i);
    }

    /// Index of the bracket closing the one opened just before `from`.
    fn matching(&self, from: usize, open: u8, close: u8) -> usize {
        let mut depth = 1;
        let mut i = from;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\'' | b'"' | b'`' => {
                    let quote = self.bytes[i];
                    i += 1;
                    while i < self.bytes.len() && self.bytes[i] != quote {
                        if self.bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                b if b == open => depth += 1,
                b if b == close => {
                    depth -= 1;
                    if depth == 0 {
                        return i;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.bytes.len()
    }

    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.bytes.len()).find(|&i| !self.bytes[i].is_ascii_whitespace())
    }

    fn prev_significant(&self, before: usize) -> Option<usize> {
        (0..before).rev().find(|&i| !self.bytes[i].is_ascii_whitespace())
    }

    fn open_paren(&mut self) {
        let close = self.matching(self.pos + 1, b'(', b')');
        let is_arrow = self
            .next_significant(close + 1)
            .is_some_and(|i| self.source[i..].starts_with("=>"));
        if is_arrow && close < self.bytes.len() {
            let params = &self.source[self.pos + 1..close];
            for name in extract_param_identifiers(params) {
                let start = params.find(name.as_str()).map(|i| self.pos + 1 + i);
                if let Some(start) = start {
                    self.locals.push(&self.source[start..start + name.len()]);
                }
            }
            self.copy_to(close + 1);
        } else {
            self.brackets.push(b'(');
            self.copy(1);
        }
    }

    fn identifier(&mut self) {
        let start = self.pos;
        let mut end = start;
        while end < self.bytes.len() && is_ident_char(self.bytes[end]) {
            end += 1;
        }
        let name = &self.source[start..end];

        let prev = self.prev_significant(start);
        let prev_byte = prev.map(|i| self.bytes[i]);
        let is_spread = prev.is_some_and(|i| i >= 2 && &self.bytes[i - 2..=i] == b"...");
        let next = self.next_significant(end);
        let next_byte = next.map(|i| self.bytes[i]);

        let is_member = prev_byte == Some(b'.') && !is_spread;
        let in_object = self.brackets.last() == Some(&b'{');
        let at_key = in_object && matches!(prev_byte, Some(b'{') | Some(b','));
        let is_arrow_param = next.is_some_and(|i| self.source[i..].starts_with("=>"));

        if is_member || (at_key && next_byte == Some(b':')) {
            self.copy_to(end);
            return;
        }
        if is_arrow_param {
            self.locals.push(name);
            self.copy_to(end);
            return;
        }
        if self.locals.contains(&name) || (self.in_scope)(name) {
            self.scope_refs += 1;
            self.copy_to(end);
            return;
        }
        if KEYWORDS.contains(name) || is_global_allowed(name) {
            self.copy_to(end);
            return;
        }

        if at_key && matches!(next_byte, Some(b',') | Some(b'}')) {
            self.out.push_str(name);
            self.out.push_str(": _ctx.");
        } else {
            self.out.push_str("_ctx.");
        }
        self.out.push_str(name);
        self.pos = end;
        self.prefixed += 1;
    }
}

/// Identifiers declared by a parameter pattern such as `{ item, index: i }` or
/// `(a, b = 1)`.
pub fn extract_param_identifiers(pattern: &str) -> Vec<String> {
    let bytes = pattern.as_bytes();
    let mut names: Vec<String> = Vec::new();
    let mut depth = 0i32;
    let mut in_default: Option<i32> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => {
                if in_default == Some(depth) {
                    in_default = None;
                }
                depth -= 1;
            }
            b',' => {
                if in_default == Some(depth) {
                    in_default = None;
                }
            }
            b'=' if bytes.get(i + 1) != Some(&b'>') => {
                if in_default.is_none() {
                    in_default = Some(depth);
                }
            }
            b'\'' | b'"' | b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b if is_ident_start(b) => {
                let start = i;
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
                let name = &pattern[start..i];
                let next = pattern[i..].trim_start().as_bytes().first().copied();
                let prev = pattern[..start].trim_end().as_bytes().last().copied();
                let is_key = next == Some(b':');
                let is_member = prev == Some(b'.');
                if in_default.is_none() && !is_key && !is_member && !KEYWORDS.contains(name) {
                    names.push(name.into());
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(src: &str) -> std::string::String {
        rewrite_identifiers(src, &|name| name == "item").code
    }

    #[test]
    fn test_prefix_simple() {
        assert_eq!(rewrite("a + b"), "_ctx.a + _ctx.b");
        assert_eq!(rewrite("foo.bar.baz"), "_ctx.foo.bar.baz");
        assert_eq!(rewrite("foo?.bar"), "_ctx.foo?.bar");
        assert_eq!(rewrite("fn(a, item)"), "_ctx.fn(_ctx.a, item)");
    }

    #[test]
    fn test_literals_and_globals() {
        assert_eq!(rewrite("'a' + b"), "'a' + _ctx.b");
        assert_eq!(rewrite("Math.max(a, 1.5)"), "Math.max(_ctx.a, 1.5)");
        assert_eq!(rewrite("typeof x === 'string'"), "typeof _ctx.x === 'string'");
        assert_eq!(rewrite("`${a} b`"), "`${_ctx.a} b`");
    }

    #[test]
    fn test_object_literals() {
        assert_eq!(rewrite("{ active: isActive }"), "{ active: _ctx.isActive }");
        assert_eq!(rewrite("{ foo, bar: 1 }"), "{ foo: _ctx.foo, bar: 1 }");
        assert_eq!(rewrite("[...list, x]"), "[..._ctx.list, _ctx.x]");
    }

    #[test]
    fn test_arrow_params() {
        assert_eq!(rewrite("x => x + y"), "x => x + _ctx.y");
        assert_eq!(rewrite("(a, b) => a + c"), "(a, b) => a + _ctx.c");
        let r = rewrite_identifiers("(e) => e.target", &|_| false);
        assert_eq!(r.prefixed, 0);
        assert_eq!(r.scope_refs, 1);
    }

    #[test]
    fn test_param_identifiers() {
        assert_eq!(
            extract_param_identifiers("{ item, index: i }"),
            vec!["item", "i"]
        );
        assert_eq!(extract_param_identifiers("(a, b = foo)"), vec!["a", "b"]);
        assert_eq!(extract_param_identifiers("[x, { y }]"), vec!["x", "y"]);
    }

    #[test]
    fn test_bails_constant() {
        assert!(bails_constant("foo()"));
        assert!(bails_constant("a.b"));
        assert!(!bails_constant("1.5 + 2"));
    }
}
