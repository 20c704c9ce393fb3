//! Relief - The template AST surface for vellum.
//!
//! A relief is a sculpture raised from a flat background; this crate is the raised
//! structure the template compiler works on. Nodes live in an arena owned by
//! [`TemplateAst`] and are addressed by [`NodeId`], so transforms can replace a node
//! by handing the driver a new one instead of mutating their parent.

pub mod ast;
pub mod errors;
pub mod options;

pub use ast::*;
pub use errors::*;
pub use options::*;
