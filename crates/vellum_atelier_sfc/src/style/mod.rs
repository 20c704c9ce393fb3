//! Style block compilation.
//!
//! A block goes through an optional preprocessor, is parsed into the
//! [`crate::css`] tree and runs through a plugin chain: caller plugins first,
//! then `trim`, `scoped` and CSS modules. [`compile_style`] runs the chain
//! synchronously; [`compile_style_async`] returns a single future for it and
//! is the only entry that accepts asynchronous plugins such as CSS modules.
//!
//! Failures while processing never escape as `Err`: they are collected in
//! [`StyleCompileResult::errors`] and the code is left empty. `Err` is
//! reserved for configuration mistakes detected before any work starts.

mod modules;
mod plugin;
mod preprocess;
mod scoped;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, Either};
use serde::{Deserialize, Serialize};
use sourcemap::{SourceMap, SourceMapBuilder};
use thiserror::Error;
use vellum_carton::FxHashMap;

use crate::css::{self, CssError, Printed, Root};
use crate::source_map::merge_source_maps;

pub use modules::{LocalsConvention, ModulesOptions, ModulesPlugin, ScopeBehaviour};
pub use plugin::{PluginContext, PluginMode, StylePlugin, TrimPlugin};
pub use preprocess::{
    PreprocessLang, PreprocessOptions, PreprocessResult, PreprocessorResolver, StylePreprocessor,
};
pub use scoped::{scope_selector, ScopedPlugin};

use preprocess::{preprocess, Preprocessed};

/// Problem reported in [`StyleCompileResult::errors`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("[{lang}] {message}")]
    Preprocess {
        lang: PreprocessLang,
        message: String,
    },
    #[error("preprocessor for `{lang}` is not available")]
    PreprocessorUnavailable { lang: PreprocessLang },
    #[error(transparent)]
    CssSyntax(#[from] CssError),
    #[error("[{plugin}] {message}")]
    Plugin { plugin: String, message: String },
}

/// Misconfiguration rejected before compilation starts.
#[derive(Debug, Error)]
pub enum StyleConfigError {
    #[error("[@vue/compiler-sfc] `modules` option can only be used with compileStyleAsync().")]
    ModulesRequireAsync,
    #[error("plugin `{name}` is asynchronous and can only be used with compileStyleAsync()")]
    AsyncPluginInSyncMode { name: String },
    #[error("invalid global module path pattern `{pattern}`")]
    InvalidModulePath {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct StyleCompileOptions {
    pub source: String,
    pub filename: String,
    /// Scope id, e.g. `data-v-7ba5bd90`
    pub id: String,
    /// Map of `source` back to the document
    #[serde(skip)]
    pub map: Option<SourceMap>,
    pub scoped: bool,
    pub trim: bool,
    pub modules: bool,
    pub modules_options: ModulesOptions,
    pub preprocess_lang: Option<String>,
    pub preprocess_options: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub preprocess_custom_require: Option<Arc<dyn PreprocessorResolver>>,
    /// Handed to plugins through [`PluginContext::options`]
    pub postcss_options: serde_json::Map<String, serde_json::Value>,
    /// Run before the built-in plugins
    #[serde(skip)]
    pub postcss_plugins: Vec<Arc<dyn StylePlugin>>,
}

impl Default for StyleCompileOptions {
    fn default() -> Self {
        Self {
            source: String::new(),
            filename: String::new(),
            id: String::new(),
            map: None,
            scoped: false,
            trim: true,
            modules: false,
            modules_options: ModulesOptions::default(),
            preprocess_lang: None,
            preprocess_options: serde_json::Map::new(),
            preprocess_custom_require: None,
            postcss_options: serde_json::Map::new(),
            postcss_plugins: Vec::new(),
        }
    }
}

impl fmt::Debug for StyleCompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.postcss_plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("StyleCompileOptions")
            .field("filename", &self.filename)
            .field("id", &self.id)
            .field("scoped", &self.scoped)
            .field("trim", &self.trim)
            .field("modules", &self.modules)
            .field("modules_options", &self.modules_options)
            .field("preprocess_lang", &self.preprocess_lang)
            .field("has_map", &self.map.is_some())
            .field("postcss_plugins", &plugins)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StyleCompileResult {
    pub code: String,
    pub map: Option<SourceMap>,
    pub errors: Vec<StyleError>,
    /// Local class name to generated class name, when `modules` is on
    pub modules: Option<FxHashMap<String, String>>,
    /// The processed tree
    pub raw_result: Option<Root>,
}

/// Compile a style block with synchronous plugins only.
pub fn compile_style(options: StyleCompileOptions) -> Result<StyleCompileResult, StyleConfigError> {
    let pipeline = Pipeline::new(options, PluginMode::Sync)?;
    Ok(pipeline.run())
}

/// Compile a style block as one future.
///
/// Configuration is checked eagerly; a misconfiguration resolves to `Err`
/// without running anything.
pub fn compile_style_async(
    options: StyleCompileOptions,
) -> impl Future<Output = Result<StyleCompileResult, StyleConfigError>> {
    match Pipeline::new(options, PluginMode::Async) {
        Ok(pipeline) => Either::Left(async move { Ok(pipeline.run_async().await) }),
        Err(error) => Either::Right(future::ready(Err(error))),
    }
}

struct Pipeline {
    plugins: Vec<Arc<dyn StylePlugin>>,
    filename: String,
    postcss_options: serde_json::Map<String, serde_json::Value>,
    /// CSS after preprocessing
    css: String,
    map: Option<SourceMap>,
    errors: Vec<StyleError>,
}

impl Pipeline {
    fn new(options: StyleCompileOptions, mode: PluginMode) -> Result<Self, StyleConfigError> {
        if mode == PluginMode::Sync {
            if options.modules {
                return Err(StyleConfigError::ModulesRequireAsync);
            }
            if let Some(plugin) = options
                .postcss_plugins
                .iter()
                .find(|plugin| plugin.mode() == PluginMode::Async)
            {
                return Err(StyleConfigError::AsyncPluginInSyncMode {
                    name: plugin.name().to_string(),
                });
            }
        }

        let mut plugins = options.postcss_plugins.clone();
        if options.trim {
            plugins.push(Arc::new(TrimPlugin));
        }
        if options.scoped {
            plugins.push(Arc::new(ScopedPlugin::new(options.id.as_str())));
        }
        if options.modules {
            plugins.push(Arc::new(ModulesPlugin::new(&options.modules_options)?));
        }

        let lang = options
            .preprocess_lang
            .as_deref()
            .and_then(PreprocessLang::from_lang);
        let Preprocessed { code, map, errors } = match lang {
            Some(lang) => preprocess(&options, lang),
            None => Preprocessed {
                code: options.source,
                map: options.map,
                errors: Vec::new(),
            },
        };

        Ok(Self {
            plugins,
            filename: options.filename,
            postcss_options: options.postcss_options,
            css: code,
            map,
            errors,
        })
    }

    fn context(&self) -> PluginContext {
        PluginContext {
            filename: self.filename.clone(),
            options: self.postcss_options.clone(),
            modules: None,
        }
    }

    fn run(mut self) -> StyleCompileResult {
        let mut ctx = self.context();
        let mut root = match css::parse(&self.css) {
            Ok(root) => root,
            Err(error) => return self.fail(error.into()),
        };
        for plugin in std::mem::take(&mut self.plugins) {
            tracing::debug!(plugin = plugin.name(), filename = %self.filename, "running style plugin");
            if let Err(error) = plugin.process(&mut root, &mut ctx) {
                return self.fail(error);
            }
        }
        self.finish(root, None)
    }

    async fn run_async(mut self) -> StyleCompileResult {
        let mut ctx = self.context();
        let mut root = match css::parse(&self.css) {
            Ok(root) => root,
            Err(error) => return self.fail(error.into()),
        };
        for plugin in std::mem::take(&mut self.plugins) {
            tracing::debug!(plugin = plugin.name(), filename = %self.filename, "running style plugin");
            if let Err(error) = plugin.process_async(&mut root, &mut ctx).await {
                return self.fail(error);
            }
        }
        let modules = ctx.modules.take();
        self.finish(root, modules)
    }

    fn fail(mut self, error: StyleError) -> StyleCompileResult {
        self.errors.push(error);
        StyleCompileResult {
            code: String::new(),
            map: None,
            errors: self.errors,
            modules: None,
            raw_result: None,
        }
    }

    fn finish(self, root: Root, modules: Option<FxHashMap<String, String>>) -> StyleCompileResult {
        let printed = css::print(&root);
        let map = self.output_map(&printed);
        StyleCompileResult {
            code: printed.css,
            map,
            errors: self.errors,
            modules,
            raw_result: Some(root),
        }
    }

    /// Map of the output back through the inbound map. Without an inbound
    /// map there is nothing to point at, so no map is produced.
    fn output_map(&self, printed: &Printed) -> Option<SourceMap> {
        let prev = self.map.clone()?;
        let mut builder = SourceMapBuilder::new(Some(self.filename.as_str()));
        let source_id = builder.add_source(&self.filename);
        builder.set_source_contents(source_id, Some(self.css.as_str()));
        for (line, column, original) in &printed.mappings {
            builder.add_raw(
                *line,
                *column,
                original.line.saturating_sub(1),
                original.column.saturating_sub(1),
                Some(source_id),
                None,
                false,
            );
        }
        merge_source_maps(Some(prev), Some(builder.into_sourcemap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_map::{generate_source_map, original_position_for};
    use futures::executor::block_on;

    fn options(source: &str) -> StyleCompileOptions {
        StyleCompileOptions {
            source: source.to_string(),
            filename: "App.vue".to_string(),
            id: "data-v-7".to_string(),
            ..Default::default()
        }
    }

    struct Engine;

    impl StylePreprocessor for Engine {
        fn render(
            &self,
            source: &str,
            _map: Option<&SourceMap>,
            options: &PreprocessOptions,
        ) -> PreprocessResult {
            if source.contains("@error") {
                return PreprocessResult {
                    errors: vec!["boom".to_string()],
                    ..Default::default()
                };
            }
            let mut code = source.replace("$color", "red");
            if options.options.contains_key("indentedSyntax") {
                code.push_str("\n/* indented */");
            }
            PreprocessResult {
                code,
                ..Default::default()
            }
        }
    }

    struct Engines;

    impl PreprocessorResolver for Engines {
        fn resolve(&self, lang: PreprocessLang) -> Option<Arc<dyn StylePreprocessor>> {
            match lang {
                PreprocessLang::Scss | PreprocessLang::Sass => Some(Arc::new(Engine)),
                _ => None,
            }
        }
    }

    struct Failing(PluginMode);

    impl StylePlugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn mode(&self) -> PluginMode {
            self.0
        }

        fn process(&self, _root: &mut Root, _ctx: &mut PluginContext) -> Result<(), StyleError> {
            Err(StyleError::Plugin {
                plugin: "failing".to_string(),
                message: "nope".to_string(),
            })
        }
    }

    #[test]
    fn test_trim_and_scoped() {
        let result = compile_style(StyleCompileOptions {
            scoped: true,
            ..options(".a { color: red; }\n\n\n.b .c {}")
        })
        .unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(result.code, ".a[data-v-7] { color: red;\n}\n.b .c[data-v-7] {}");
        assert!(result.raw_result.is_some());
        assert!(result.modules.is_none());
        assert!(result.map.is_none());
    }

    #[test]
    fn test_modules_require_async() {
        let error = compile_style(StyleCompileOptions {
            modules: true,
            ..options(".a {}")
        })
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "[@vue/compiler-sfc] `modules` option can only be used with compileStyleAsync()."
        );
    }

    #[test]
    fn test_async_plugin_rejected_in_sync_mode() {
        let error = compile_style(StyleCompileOptions {
            postcss_plugins: vec![Arc::new(Failing(PluginMode::Async))],
            ..options(".a {}")
        })
        .unwrap_err();
        assert!(matches!(error, StyleConfigError::AsyncPluginInSyncMode { name } if name == "failing"));
    }

    #[test]
    fn test_invalid_module_path_is_config_error() {
        let mut opts = options(".a {}");
        opts.modules = true;
        opts.modules_options.global_module_paths = vec!["(".to_string()];
        let error = block_on(compile_style_async(opts)).unwrap_err();
        assert!(matches!(error, StyleConfigError::InvalidModulePath { pattern, .. } if pattern == "("));
    }

    #[test]
    fn test_syntax_error_is_collected() {
        let result = compile_style(options(".a { color: red")).unwrap();
        assert_eq!(result.code, "");
        assert!(matches!(&result.errors[..], [StyleError::CssSyntax(e)] if e.message == "Unclosed block"));
        assert!(result.raw_result.is_none());
    }

    #[test]
    fn test_preprocessor_runs() {
        let result = compile_style(StyleCompileOptions {
            preprocess_lang: Some("scss".to_string()),
            preprocess_custom_require: Some(Arc::new(Engines)),
            trim: false,
            ..options(".a { color: $color }")
        })
        .unwrap();
        assert_eq!(result.code, ".a { color: red }");

        let result = compile_style(StyleCompileOptions {
            preprocess_lang: Some("sass".to_string()),
            preprocess_custom_require: Some(Arc::new(Engines)),
            trim: false,
            ..options(".a { color: $color }")
        })
        .unwrap();
        assert_eq!(result.code, ".a { color: red }\n/* indented */");
    }

    #[test]
    fn test_preprocessor_failures_come_first() {
        let result = compile_style(StyleCompileOptions {
            preprocess_lang: Some("scss".to_string()),
            preprocess_custom_require: Some(Arc::new(Engines)),
            ..options("@error")
        })
        .unwrap();
        assert_eq!(result.code, "");
        assert_eq!(
            result.errors,
            vec![StyleError::Preprocess {
                lang: PreprocessLang::Scss,
                message: "boom".to_string()
            }]
        );

        let result = compile_style(StyleCompileOptions {
            preprocess_lang: Some("less".to_string()),
            ..options(".a {}")
        })
        .unwrap();
        assert_eq!(result.code, "");
        assert_eq!(
            result.errors,
            vec![StyleError::PreprocessorUnavailable {
                lang: PreprocessLang::Less
            }]
        );
    }

    #[test]
    fn test_unknown_lang_passes_through() {
        let result = compile_style(StyleCompileOptions {
            preprocess_lang: Some("postcss".to_string()),
            ..options(".a { top: 0 }")
        })
        .unwrap();
        assert_eq!(result.code, ".a { top: 0 }");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_async_failure_resolves_with_errors() {
        let result = block_on(compile_style_async(StyleCompileOptions {
            postcss_plugins: vec![Arc::new(Failing(PluginMode::Async))],
            ..options(".a {}")
        }))
        .unwrap();
        assert_eq!(result.code, "");
        assert!(result.map.is_none());
        assert!(result.raw_result.is_none());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].to_string(), "[failing] nope");
    }

    #[test]
    fn test_async_modules_exports() {
        let result = block_on(compile_style_async(StyleCompileOptions {
            modules: true,
            modules_options: ModulesOptions {
                generate_scoped_name: Some("[local]_x".to_string()),
                ..Default::default()
            },
            ..options(".red { color: red }")
        }))
        .unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(result.code, ".red_x { color: red }");
        let modules = result.modules.unwrap();
        assert_eq!(modules.get("red").map(String::as_str), Some("red_x"));
    }

    #[test]
    fn test_output_map_points_into_document() {
        let css = ".a {\n  color: red;\n}";
        let document = format!("<template></template>\n\n\n\n\n<style>\n{css}\n</style>\n");
        let in_map = generate_source_map("App.vue", &document, css, "", 6);
        let result = compile_style(StyleCompileOptions {
            map: Some(in_map),
            ..options(css)
        })
        .unwrap();
        let map = result.map.unwrap();
        let original = original_position_for(&map, 1, 2).unwrap();
        assert_eq!(original.source, "App.vue");
        assert_eq!(original.line, 7);
        assert_eq!(original.column, 2);
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let parsed: StyleCompileOptions =
            serde_json::from_str(r#"{"filename":"a.css","scoped":true,"id":"data-v-1"}"#).unwrap();
        assert!(parsed.scoped);
        assert!(parsed.trim);
        assert!(serde_json::from_str::<StyleCompileOptions>(r#"{"scope":true}"#).is_err());
    }
}
