//! Template block compilation.
//!
//! Wraps the DOM and SSR compilers with the SFC conventions: module output,
//! asset URL imports, a scope id derived from the component id, optional
//! markup preprocessing and source maps that point back into the `.vue` file.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sourcemap::SourceMap;
use vellum_atelier_core::{CompileResult, NodeTransform};
use vellum_atelier_dom::DomCompilerOptions;
use vellum_atelier_ssr::SsrCompilerOptions;
use vellum_carton::{format_compact, String};
use vellum_relief::errors::CompilerError;
use vellum_relief::{CodegenMode, WhitespaceStrategy};

use crate::source_map::{merge_source_maps, patch_errors};
use crate::transforms::{transform_srcset, AssetUrlConfig, AssetUrlTransform};

/// Markup preprocessor (pug and the like) turning block content into HTML.
pub trait TemplatePreprocessor: Send + Sync {
    fn render(
        &self,
        source: &str,
        options: &serde_json::Map<std::string::String, serde_json::Value>,
    ) -> Result<std::string::String, std::string::String>;
}

/// Looks up the preprocessor for a `lang` attribute value.
pub trait TemplatePreprocessorResolver: Send + Sync {
    fn resolve(&self, lang: &str) -> Option<Arc<dyn TemplatePreprocessor>>;
}

/// Options forwarded to the underlying template compiler.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateCompilerOptions {
    #[serde(default = "default_mode")]
    pub mode: CodegenMode,
    #[serde(default = "default_true")]
    pub prefix_identifiers: bool,
    #[serde(default = "default_true")]
    pub hoist_static: bool,
    #[serde(default = "default_true")]
    pub cache_handlers: bool,
    /// Overrides the id derived from `scoped`
    #[serde(default)]
    pub scope_id: Option<String>,
    #[serde(default = "default_true")]
    pub slotted: bool,
    #[serde(default = "default_true")]
    pub comments: bool,
    #[serde(default)]
    pub whitespace: WhitespaceStrategy,
    #[serde(default)]
    pub is_ts: bool,
    /// Run after the asset URL transforms
    #[serde(skip)]
    pub node_transforms: Vec<Arc<dyn NodeTransform>>,
}

fn default_mode() -> CodegenMode {
    CodegenMode::Module
}

fn default_true() -> bool {
    true
}

impl Default for TemplateCompilerOptions {
    fn default() -> Self {
        Self {
            mode: CodegenMode::Module,
            prefix_identifiers: true,
            hoist_static: true,
            cache_handlers: true,
            scope_id: None,
            slotted: true,
            comments: true,
            whitespace: WhitespaceStrategy::Condense,
            is_ts: false,
            node_transforms: Vec::new(),
        }
    }
}

impl fmt::Debug for TemplateCompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCompilerOptions")
            .field("mode", &self.mode)
            .field("prefix_identifiers", &self.prefix_identifiers)
            .field("hoist_static", &self.hoist_static)
            .field("cache_handlers", &self.cache_handlers)
            .field("scope_id", &self.scope_id)
            .field("node_transforms", &self.node_transforms.len())
            .finish_non_exhaustive()
    }
}

/// Options of [`compile_template`].
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SfcTemplateCompileOptions {
    #[serde(default)]
    pub filename: String,
    /// Template block content
    pub source: std::string::String,
    /// Map of the block into the `.vue` file
    #[serde(skip)]
    pub in_map: Option<SourceMap>,
    #[serde(default)]
    pub ssr: bool,
    #[serde(default)]
    pub ssr_css_vars: Option<String>,
    /// Component id; scoped templates get `data-v-{id}`
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub scoped: bool,
    #[serde(default)]
    pub compiler_options: TemplateCompilerOptions,
    #[serde(default)]
    pub transform_asset_urls: AssetUrlConfig,
    #[serde(default)]
    pub preprocess_lang: Option<String>,
    #[serde(default)]
    pub preprocess_options: serde_json::Map<std::string::String, serde_json::Value>,
    #[serde(skip)]
    pub preprocess_custom_require: Option<Arc<dyn TemplatePreprocessorResolver>>,
}

impl fmt::Debug for SfcTemplateCompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SfcTemplateCompileOptions")
            .field("filename", &self.filename)
            .field("ssr", &self.ssr)
            .field("id", &self.id)
            .field("scoped", &self.scoped)
            .field("compiler_options", &self.compiler_options)
            .field("transform_asset_urls", &self.transform_asset_urls)
            .field("preprocess_lang", &self.preprocess_lang)
            .finish_non_exhaustive()
    }
}

/// Output of [`compile_template`].
#[derive(Debug, Clone, Default)]
pub struct TemplateCompileResult {
    pub code: String,
    /// Markup after preprocessing
    pub source: std::string::String,
    pub map: Option<SourceMap>,
    pub errors: Vec<CompilerError>,
    pub tips: Vec<std::string::String>,
    /// Imports and hoists emitted ahead of the render function
    pub preamble: String,
}

const EMPTY_RENDER: &str = "export default function render() {}";

/// Compile a template block to a render function module.
pub fn compile_template(options: SfcTemplateCompileOptions) -> TemplateCompileResult {
    let Some(lang) = options.preprocess_lang.clone() else {
        return do_compile_template(options);
    };

    let engine = options
        .preprocess_custom_require
        .as_ref()
        .and_then(|resolver| resolver.resolve(&lang));
    let Some(engine) = engine else {
        tracing::warn!(filename = %options.filename, %lang, "template preprocessor not available");
        return TemplateCompileResult {
            code: String::const_new(EMPTY_RENDER),
            source: options.source,
            tips: vec![format!(
                "Component {} uses lang {} for template. Please install the language preprocessor.",
                options.filename, lang
            )],
            errors: vec![CompilerError::custom(
                format!(
                    "Component {} uses lang {} for template, however it is not installed.",
                    options.filename, lang
                ),
                None,
            )],
            ..Default::default()
        };
    };

    match engine.render(&options.source, &options.preprocess_options) {
        Ok(html) => do_compile_template(SfcTemplateCompileOptions {
            source: html,
            ..options
        }),
        Err(message) => TemplateCompileResult {
            code: String::const_new(EMPTY_RENDER),
            source: options.source,
            errors: vec![CompilerError::custom(message, None)],
            ..Default::default()
        },
    }
}

fn do_compile_template(options: SfcTemplateCompileOptions) -> TemplateCompileResult {
    let SfcTemplateCompileOptions {
        filename,
        source,
        in_map,
        ssr,
        ssr_css_vars,
        id,
        scoped,
        compiler_options,
        transform_asset_urls,
        ..
    } = options;

    let mut node_transforms: Vec<Arc<dyn NodeTransform>> = Vec::new();
    if let AssetUrlConfig::Enabled(asset_urls) = transform_asset_urls {
        node_transforms.push(Arc::new(AssetUrlTransform::new(asset_urls)));
        node_transforms.push(Arc::new(transform_srcset));
    }
    node_transforms.extend(compiler_options.node_transforms.iter().cloned());

    let scope_id = compiler_options
        .scope_id
        .clone()
        .or_else(|| scoped.then(|| format_compact!("data-v-{id}")));

    let result: CompileResult = if ssr {
        let ssr_options = SsrCompilerOptions {
            mode: compiler_options.mode,
            filename: filename.clone(),
            scope_id,
            slotted: compiler_options.slotted,
            comments: compiler_options.comments,
            whitespace: compiler_options.whitespace,
            is_ts: compiler_options.is_ts,
            ssr_css_vars,
        };
        vellum_atelier_ssr::compile_ssr_with_transforms(&source, &ssr_options, node_transforms)
    } else {
        let mut dom_options = DomCompilerOptions {
            mode: compiler_options.mode,
            filename: filename.clone(),
            prefix_identifiers: compiler_options.prefix_identifiers,
            hoist_static: compiler_options.hoist_static,
            cache_handlers: compiler_options.cache_handlers,
            scope_id,
            slotted: compiler_options.slotted,
            ssr: false,
            source_map: true,
            comments: compiler_options.comments,
            whitespace: compiler_options.whitespace,
            is_ts: compiler_options.is_ts,
        }
        .to_compiler_options();
        dom_options.node_transforms = node_transforms;
        vellum_atelier_dom::compile_with_options(&source, &dom_options)
    };

    let CompileResult {
        code,
        preamble,
        map,
        mut errors,
        ..
    } = result;
    tracing::debug!(%filename, ssr, errors = errors.len(), "compiled template");

    let map = match in_map {
        Some(in_map) => {
            patch_errors(&mut errors, &source, &in_map);
            merge_source_maps(Some(in_map), map)
        }
        None => map,
    };

    TemplateCompileResult {
        code: code.into(),
        source,
        map,
        errors,
        tips: Vec::new(),
        preamble: preamble.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_sfc;
    use crate::source_map::original_position_for;
    use crate::types::SfcParseOptions;

    struct Upper;

    impl TemplatePreprocessor for Upper {
        fn render(
            &self,
            source: &str,
            options: &serde_json::Map<std::string::String, serde_json::Value>,
        ) -> Result<std::string::String, std::string::String> {
            if options.contains_key("fail") {
                return Err("preprocessor exploded".into());
            }
            Ok(source.replace("P ", "<p>").replace(" /P", "</p>"))
        }
    }

    struct Resolver;

    impl TemplatePreprocessorResolver for Resolver {
        fn resolve(&self, lang: &str) -> Option<Arc<dyn TemplatePreprocessor>> {
            (lang == "upper").then(|| Arc::new(Upper) as Arc<dyn TemplatePreprocessor>)
        }
    }

    fn options(source: &str) -> SfcTemplateCompileOptions {
        SfcTemplateCompileOptions {
            filename: "App.vue".into(),
            source: source.into(),
            id: "abc123".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_module_output_with_asset_imports() {
        let result = compile_template(options(r#"<img src="./logo.png"><p>{{ msg }}</p>"#));
        assert!(result.errors.is_empty());
        assert!(result.code.contains("import _imports_0 from './logo.png'"));
        assert!(result.code.contains("export function render(_ctx, _cache)"));
        assert!(result.code.contains("_ctx.msg"));
    }

    #[test]
    fn test_asset_urls_can_be_disabled() {
        let result = compile_template(SfcTemplateCompileOptions {
            transform_asset_urls: AssetUrlConfig::Disabled,
            ..options(r#"<img src="./logo.png" srcset="./a.png 2x">"#)
        });
        assert!(!result.code.contains("_imports_"));
    }

    #[test]
    fn test_scoped_uses_component_id() {
        let result = compile_template(SfcTemplateCompileOptions {
            scoped: true,
            ssr: true,
            ..options("<div/>")
        });
        assert!(result.code.contains("data-v-abc123"));

        let result = compile_template(SfcTemplateCompileOptions {
            scoped: true,
            ssr: true,
            compiler_options: TemplateCompilerOptions {
                scope_id: Some("data-v-custom".into()),
                ..Default::default()
            },
            ..options("<div/>")
        });
        assert!(result.code.contains("data-v-custom"));
        assert!(!result.code.contains("data-v-abc123"));
    }

    #[test]
    fn test_ssr_compiler_selected() {
        let result = compile_template(SfcTemplateCompileOptions {
            ssr: true,
            ..options(r#"<img src="./logo.png">"#)
        });
        assert!(result.code.contains("ssrRender"));
        assert!(result.code.contains("import _imports_0 from './logo.png'"));
    }

    #[test]
    fn test_missing_preprocessor() {
        let result = compile_template(SfcTemplateCompileOptions {
            preprocess_lang: Some("pug".into()),
            ..options("div")
        });
        assert_eq!(result.code, EMPTY_RENDER);
        assert_eq!(
            result.tips,
            vec!["Component App.vue uses lang pug for template. Please install the language preprocessor."]
        );
        assert_eq!(
            result.errors[0].message,
            "Component App.vue uses lang pug for template, however it is not installed."
        );
    }

    #[test]
    fn test_preprocessor_runs_before_compile() {
        let resolver: Arc<dyn TemplatePreprocessorResolver> = Arc::new(Resolver);
        let result = compile_template(SfcTemplateCompileOptions {
            preprocess_lang: Some("upper".into()),
            preprocess_custom_require: Some(resolver.clone()),
            ..options("P hi /P")
        });
        assert_eq!(result.source, "<p>hi</p>");
        assert!(result.errors.is_empty());

        let mut failing = serde_json::Map::new();
        failing.insert("fail".into(), serde_json::Value::Bool(true));
        let result = compile_template(SfcTemplateCompileOptions {
            preprocess_lang: Some("upper".into()),
            preprocess_custom_require: Some(resolver),
            preprocess_options: failing,
            ..options("P hi /P")
        });
        assert_eq!(result.code, EMPTY_RENDER);
        assert_eq!(result.errors[0].message, "preprocessor exploded");
    }

    #[test]
    fn test_errors_and_map_point_into_document() {
        let document = "<script>\nexport default {}\n</script>\n<template>\n  <div v-if>\n  </div>\n</template>\n";
        let parsed = parse_sfc(
            document,
            SfcParseOptions {
                filename: "Doc.vue".into(),
                ..Default::default()
            },
        );
        let template = parsed.descriptor.template.clone().unwrap();
        let result = compile_template(SfcTemplateCompileOptions {
            source: template.content.to_string(),
            in_map: template.map.clone(),
            ..options("")
        });

        let error = result.errors.first().unwrap();
        let loc = error.loc.as_ref().unwrap();
        assert_eq!(loc.start.line, 5);
        assert_eq!(&document[loc.start.offset as usize..loc.end.offset as usize], "v-if");

        let map = result.map.unwrap();
        assert_eq!(map.get_source_contents(0), Some(document));
        assert!(map
            .tokens()
            .filter_map(|t| original_position_for(&map, t.get_dst_line(), t.get_dst_col()))
            .all(|p| p.line >= 3));
    }
}
