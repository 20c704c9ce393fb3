//! Armature - the structural parser for vellum templates.
//!
//! A recursive-descent markup parser producing the arena AST from
//! [`vellum_relief`]. The parser is configured through [`ParserOptions`]: text
//! modes and namespaces are decided by callbacks, so the same parser serves plain
//! templates, DOM templates and single-file components.
//!
//! ```
//! use vellum_armature::parse;
//! use vellum_relief::ast::{NodeId, NodeType};
//!
//! let (ast, errors) = parse("<div>{{ msg }}</div>");
//! assert!(errors.is_empty());
//! let div = ast.children(NodeId::ROOT)[0];
//! assert_eq!(ast.node_type(div), NodeType::Element);
//! ```

mod cursor;
mod decode;
pub mod parser;

pub use parser::{parse, parse_with_options};
pub use vellum_relief::options::{ParserOptions, TextMode, WhitespaceStrategy};
