//! Atelier Core - the workshop where templates become render functions.
//!
//! The pipeline is parse ([`vellum_armature`]) → transform ([`transform`]) →
//! generate ([`codegen`]). Transforms are pluggable: platform compilers start
//! from [`compile::get_base_transform_preset`] and add or override node and
//! directive transforms.
//!
//! ```
//! use vellum_atelier_core::compile::{base_compile, get_base_transform_preset};
//! use vellum_atelier_core::options::CompilerOptions;
//!
//! let options = CompilerOptions { prefix_identifiers: true, ..Default::default() };
//! let result = base_compile("<p>{{ msg }}</p>", &options, get_base_transform_preset(true));
//! assert!(result.code.contains("_toDisplayString(_ctx.msg)"));
//! ```

pub mod codegen;
pub mod compile;
pub mod options;
pub mod transform;
pub mod transforms;
pub mod utils;

pub use codegen::{generate, CodegenResult};
pub use compile::{base_compile, get_base_transform_preset, CompileResult};
pub use options::CompilerOptions;
pub use transform::{
    DirectiveTransform, DirectiveTransformResult, NeedRuntime, NodeTransform, TransformAction,
    TransformContext, TransformPreset,
};
