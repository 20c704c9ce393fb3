//! A small lossless CSS tree.
//!
//! Every node keeps the whitespace around it in `raws`, so printing an
//! untouched tree reproduces the input byte for byte. Plugins edit the tree
//! in place; [`print`] turns it back into text with line mappings.

mod parser;
mod printer;
pub mod selector;

use thiserror::Error;
use vellum_relief::ast::Position;

pub use parser::parse;
pub use printer::{print, Printed};
pub use selector::{parse_selector, Selector, SelectorList, SelectorNode, Spaces};

/// Malformed stylesheet or selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct CssError {
    pub message: String,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
}

impl CssError {
    pub(crate) fn at(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            line: position.line,
            column: position.column,
        }
    }
}

/// Whitespace and punctuation kept around a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raws {
    /// Text before the node
    pub before: String,
    /// Between selector/params/prop and `{` or the value
    pub between: String,
    /// Before the closing `}`
    pub after: String,
    /// At-rules: between the name and the params
    pub after_name: String,
    /// Declarations: between the value and the terminator
    pub value_after: String,
    /// Declarations and bodiless at-rules: terminated by `;`
    pub semicolon: bool,
    /// Declarations: the `!important` text as written
    pub important: Option<String>,
    /// Comments: padding inside the delimiters
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Decl(Declaration),
    Comment(Comment),
}

impl Node {
    pub fn raws(&self) -> &Raws {
        match self {
            Self::Rule(n) => &n.raws,
            Self::AtRule(n) => &n.raws,
            Self::Decl(n) => &n.raws,
            Self::Comment(n) => &n.raws,
        }
    }

    pub fn raws_mut(&mut self) -> &mut Raws {
        match self {
            Self::Rule(n) => &mut n.raws,
            Self::AtRule(n) => &mut n.raws,
            Self::Decl(n) => &mut n.raws,
            Self::Comment(n) => &mut n.raws,
        }
    }

    pub fn source(&self) -> Option<Position> {
        match self {
            Self::Rule(n) => n.source,
            Self::AtRule(n) => n.source,
            Self::Decl(n) => n.source,
            Self::Comment(n) => n.source,
        }
    }

    /// Child nodes of rules and block at-rules.
    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Rule(n) => Some(&mut n.nodes),
            Self::AtRule(n) => n.nodes.as_mut(),
            Self::Decl(_) | Self::Comment(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Root {
    pub nodes: Vec<Node>,
    /// Trailing text after the last node
    pub after: String,
}

impl Root {
    /// Visit every node depth-first, parents before children.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        walk_nodes(&mut self.nodes, f);
    }

    /// Visit every declaration.
    pub fn walk_decls_mut(&mut self, f: &mut impl FnMut(&mut Declaration)) {
        self.walk_mut(&mut |node| {
            if let Node::Decl(decl) = node {
                f(decl);
            }
        });
    }
}

fn walk_nodes(nodes: &mut [Node], f: &mut impl FnMut(&mut Node)) {
    for node in nodes.iter_mut() {
        f(node);
        if let Some(children) = node.nodes_mut() {
            walk_nodes(children, f);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
    pub raws: Raws,
    pub source: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtRule {
    /// Name without the `@`
    pub name: String,
    pub params: String,
    /// `None` for statements like `@import "a.css";`
    pub nodes: Option<Vec<Node>>,
    pub raws: Raws,
    pub source: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    pub important: bool,
    pub raws: Raws,
    pub source: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    /// Text without the delimiters and the padding
    pub text: String,
    pub raws: Raws,
    pub source: Option<Position>,
}
