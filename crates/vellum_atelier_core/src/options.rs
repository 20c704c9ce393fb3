//! Compiler options for the transform and codegen stages.

use std::fmt;
use std::sync::Arc;

use vellum_carton::String;
use vellum_relief::{CodegenMode, DirectiveKind, ParserOptions};

use crate::transform::{DirectiveTransform, NodeTransform};

/// Options for a full template compile (parse, transform, generate).
#[derive(Clone)]
pub struct CompilerOptions {
    pub parser: ParserOptions,
    /// Output mode
    pub mode: CodegenMode,
    /// Filename used in source maps and diagnostics
    pub filename: String,
    /// Prefix free identifiers with `_ctx.`; forced on in module mode
    pub prefix_identifiers: bool,
    /// Lift static vnodes and props into module-level constants
    pub hoist_static: bool,
    /// Cache inline event handlers in `_cache`
    pub cache_handlers: bool,
    /// Scope id for scoped styles (module mode only)
    pub scope_id: Option<String>,
    /// Whether the component uses `:slotted` selectors; outlets then carry no scope id
    pub slotted: bool,
    pub ssr: bool,
    pub is_ts: bool,
    /// Generate a source map for the render function
    pub source_map: bool,
    pub runtime_module_name: String,
    pub runtime_global_name: String,
    /// Node transforms appended after the built-in preset
    pub node_transforms: Vec<Arc<dyn NodeTransform>>,
    /// Directive transforms; entries here win over the built-in ones
    pub directive_transforms: Vec<(DirectiveKind, Arc<dyn DirectiveTransform>)>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            parser: ParserOptions::default(),
            mode: CodegenMode::Function,
            filename: String::from("template.vue.html"),
            prefix_identifiers: false,
            hoist_static: false,
            cache_handlers: false,
            scope_id: None,
            slotted: true,
            ssr: false,
            is_ts: false,
            source_map: false,
            runtime_module_name: String::from("vue"),
            runtime_global_name: String::from("Vue"),
            node_transforms: Vec::new(),
            directive_transforms: Vec::new(),
        }
    }
}

impl CompilerOptions {
    /// Module mode always prefixes identifiers.
    pub fn effective_prefix_identifiers(&self) -> bool {
        self.prefix_identifiers || self.mode == CodegenMode::Module
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("mode", &self.mode)
            .field("filename", &self.filename)
            .field("prefix_identifiers", &self.prefix_identifiers)
            .field("hoist_static", &self.hoist_static)
            .field("cache_handlers", &self.cache_handlers)
            .field("scope_id", &self.scope_id)
            .field("ssr", &self.ssr)
            .field("is_ts", &self.is_ts)
            .field("source_map", &self.source_map)
            .field("node_transforms", &self.node_transforms.len())
            .field(
                "directive_transforms",
                &self
                    .directive_transforms
                    .iter()
                    .map(|(kind, _)| kind.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
