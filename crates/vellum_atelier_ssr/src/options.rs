//! SSR compiler options.

use serde::{Deserialize, Serialize};
use vellum_atelier_core::CompilerOptions;
use vellum_carton::String;
use vellum_relief::{CodegenMode, WhitespaceStrategy};

/// SSR compiler options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SsrCompilerOptions {
    /// Output mode: function or module
    #[serde(default)]
    pub mode: CodegenMode,

    /// Filename used in diagnostics
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Scope ID for scoped CSS (data-v-xxx)
    #[serde(default)]
    pub scope_id: Option<String>,

    /// Whether the component styles use `:slotted`
    #[serde(default = "default_true")]
    pub slotted: bool,

    /// Whether to preserve comments
    #[serde(default)]
    pub comments: bool,

    #[serde(default)]
    pub whitespace: WhitespaceStrategy,

    /// Whether is TypeScript
    #[serde(default)]
    pub is_ts: bool,

    /// CSS variables to inject (from SFC <style> blocks with v-bind)
    #[serde(default)]
    pub ssr_css_vars: Option<String>,
}

fn default_filename() -> String {
    String::const_new("template.vue.html")
}

fn default_true() -> bool {
    true
}

impl Default for SsrCompilerOptions {
    fn default() -> Self {
        Self {
            mode: CodegenMode::Function,
            filename: default_filename(),
            scope_id: None,
            slotted: true,
            comments: false,
            whitespace: WhitespaceStrategy::Condense,
            is_ts: false,
            ssr_css_vars: None,
        }
    }
}

impl SsrCompilerOptions {
    /// Core options for the transform pass. Server rendering always prefixes
    /// identifiers and never hoists or caches.
    pub fn to_compiler_options(&self) -> CompilerOptions {
        let mut parser = vellum_atelier_dom::parser_options();
        parser.comments = self.comments;
        parser.whitespace = self.whitespace;
        CompilerOptions {
            parser,
            mode: self.mode,
            filename: self.filename.clone(),
            prefix_identifiers: true,
            hoist_static: false,
            cache_handlers: false,
            scope_id: self.scope_id.clone(),
            slotted: self.slotted,
            ssr: true,
            is_ts: self.is_ts,
            source_map: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = SsrCompilerOptions::default();
        assert!(opts.scope_id.is_none());
        assert!(!opts.comments);
        assert!(!opts.is_ts);
        assert!(opts.ssr_css_vars.is_none());
    }

    #[test]
    fn test_compiler_options_force_prefixing() {
        let core = SsrCompilerOptions::default().to_compiler_options();
        assert!(core.ssr);
        assert!(core.prefix_identifiers);
        assert!(!core.hoist_static);
        assert!(!core.cache_handlers);
    }

    #[test]
    fn test_deserialize() {
        let opts: SsrCompilerOptions =
            serde_json::from_str(r#"{"mode": "module", "ssrCssVars": "{ \"--c\": _ctx.c }"}"#)
                .expect("valid options");
        assert_eq!(opts.mode, CodegenMode::Module);
        assert!(opts.ssr_css_vars.is_some());
        assert!(serde_json::from_str::<SsrCompilerOptions>(r#"{"inline": true}"#).is_err());
    }
}
