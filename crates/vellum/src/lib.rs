//! # Vellum
//!
//! Vue single file component compiler written in Rust.
//!
//! This crate re-exports the Vellum sub-crates for unified documentation.
//!
//! ## Crates
//!
//! - [`carton`] - Shared utilities: compact strings, hashing, LRU cache
//! - [`relief`] - Template AST, errors and compiler options
//! - [`armature`] - Template parser
//! - [`atelier_core`] - Transform pipeline and code generation
//! - [`atelier_dom`] - DOM mode template compiler
//! - [`atelier_ssr`] - SSR mode template compiler
//! - [`atelier_sfc`] - Single File Component (SFC) parser and compiler

/// Shared utilities.
pub use vellum_carton as carton;

/// Template AST, errors and compiler options.
pub use vellum_relief as relief;

/// Template parser.
pub use vellum_armature as armature;

/// Transform pipeline and code generation.
pub use vellum_atelier_core as atelier_core;

/// DOM mode template compiler.
pub use vellum_atelier_dom as atelier_dom;

/// SSR mode template compiler.
pub use vellum_atelier_ssr as atelier_ssr;

/// Single File Component (SFC) parser and compiler.
pub use vellum_atelier_sfc as atelier_sfc;
