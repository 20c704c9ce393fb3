//! Atelier SFC - The Single File Component workshop.
//!
//! Turns a `.vue` document into its parts:
//!
//! - [`parse_sfc`] splits the document into a memoized [`SfcDescriptor`]
//!   with a line map per block;
//! - [`compile_template`] compiles the template block to render code with
//!   asset URLs turned into imports;
//! - [`compile_style`] and [`compile_style_async`] run a style block through
//!   the preprocessor and the trim, scoped and CSS modules plugins.
//!
//! Maps produced along the way are composed with [`merge_source_maps`] so
//! generated positions resolve back into the document.

pub mod cache;
pub mod compile_template;
pub mod css;
pub mod parse;
pub mod source_map;
pub mod style;
pub mod transforms;
pub mod types;

pub use cache::{clear_parse_cache, SFC_CACHE_MAX_SIZE};
pub use compile_template::{
    compile_template, SfcTemplateCompileOptions, TemplateCompileResult, TemplateCompilerOptions,
    TemplatePreprocessor, TemplatePreprocessorResolver,
};
pub use parse::parse_sfc;
pub use source_map::{
    decode_source_map, encode_source_map, generate_source_map, merge_source_maps,
    original_position_for, patch_errors, OriginalPosition, SourceMapError,
};
pub use style::{
    compile_style, compile_style_async, PluginContext, PluginMode, PreprocessLang,
    PreprocessOptions, PreprocessResult, PreprocessorResolver, StyleCompileOptions,
    StyleCompileResult, StyleConfigError, StyleError, StylePlugin, StylePreprocessor,
};
pub use transforms::{AssetUrlConfig, AssetUrlOptions, AssetUrlTransform};
pub use types::{
    AttrValue, PadMode, SfcBlock, SfcDescriptor, SfcParseOptions, SfcParseResult,
    TemplateCompilerKind,
};
pub use vellum_carton::generate_code_frame;
