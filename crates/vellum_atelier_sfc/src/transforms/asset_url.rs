//! Relative asset URLs in static attributes become module imports.
//!
//! `<img src="./logo.png">` compiles to `import _imports_0 from './logo.png'`
//! and `:src="_imports_0"`, so bundlers resolve the file.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use vellum_atelier_core::{NodeTransform, TransformAction, TransformContext};
use vellum_carton::{format_compact, String};
use vellum_relief::ast::{
    ConstantType, DirectiveNode, ExpressionNode, ImportItem, JsNode, NodeId, PropNode,
    SimpleExpressionNode, SourceLocation,
};

/// Tags and the attributes holding URLs on them.
const DEFAULT_ASSET_TAGS: &[(&str, &[&str])] = &[
    ("video", &["src", "poster"]),
    ("source", &["src"]),
    ("img", &["src"]),
    ("image", &["xlink:href", "href"]),
    ("use", &["xlink:href", "href"]),
];

/// Tag to attribute table. The `*` tag matches every element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetUrlOptions {
    tags: Vec<(String, Vec<String>)>,
}

impl AssetUrlOptions {
    /// Defaults with `overrides` replacing whole tag entries.
    pub fn with_overrides<I, A>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, A)>,
        A: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        for (tag, attrs) in overrides {
            let attrs: Vec<String> = attrs.into_iter().collect();
            match options.tags.iter_mut().find(|(t, _)| *t == tag) {
                Some(entry) => entry.1 = attrs,
                None => options.tags.push((tag, attrs)),
            }
        }
        options
    }

    pub fn attributes_for<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |(t, _)| t == "*" || t == tag)
            .flat_map(|(_, attrs)| attrs.iter().map(String::as_str))
    }
}

impl Default for AssetUrlOptions {
    fn default() -> Self {
        Self {
            tags: DEFAULT_ASSET_TAGS
                .iter()
                .map(|(tag, attrs)| {
                    (String::from(*tag), attrs.iter().map(|a| String::from(*a)).collect())
                })
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for AssetUrlOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        Ok(Self::with_overrides(overrides))
    }
}

/// `transformAssetUrls`: `false` turns off both URL transforms, a table
/// customizes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetUrlConfig {
    Disabled,
    Enabled(AssetUrlOptions),
}

impl Default for AssetUrlConfig {
    fn default() -> Self {
        Self::Enabled(AssetUrlOptions::default())
    }
}

impl Serialize for AssetUrlConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Disabled => serializer.serialize_bool(false),
            Self::Enabled(options) => options.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AssetUrlConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Table(AssetUrlOptions),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Self::Disabled,
            Raw::Flag(true) => Self::default(),
            Raw::Table(options) => Self::Enabled(options),
        })
    }
}

/// Node transform rewriting asset attributes.
#[derive(Debug, Clone, Default)]
pub struct AssetUrlTransform {
    options: AssetUrlOptions,
}

impl AssetUrlTransform {
    pub fn new(options: AssetUrlOptions) -> Self {
        Self { options }
    }
}

impl NodeTransform for AssetUrlTransform {
    fn transform(&self, node: NodeId, ctx: &mut TransformContext) -> TransformAction {
        let Some(el) = ctx.ast.element(node) else {
            return TransformAction::Continue;
        };
        if el.props.is_empty() {
            return TransformAction::Continue;
        }

        let mut rewrites = Vec::new();
        for name in self.options.attributes_for(&el.tag) {
            for (index, prop) in el.props.iter().enumerate() {
                let PropNode::Attribute(attr) = prop else { continue };
                if attr.name != name {
                    continue;
                }
                let Some(value) = attr.value.as_ref() else { continue };
                if !is_relative_url(&value.content) {
                    continue;
                }
                rewrites.push((index, attr.name.clone(), value.content.clone(), attr.loc.clone()));
            }
        }

        for (index, name, url, loc) in rewrites {
            let (path, hash) = parse_url(&url);
            let exp = imports_expression(path, hash, &loc, ctx);
            let dir = bind_directive(&name, exp, loc);
            if let Some(el) = ctx.ast.element_mut(node) {
                el.props[index] = PropNode::Directive(dir);
            }
        }
        TransformAction::Continue
    }
}

/// `v-bind:{name}="{exp}"` built from a static attribute.
pub(crate) fn bind_directive(name: &str, exp: ExpressionNode, loc: SourceLocation) -> DirectiveNode {
    let mut dir = DirectiveNode::new("bind", loc.clone());
    dir.raw_name = format_compact!(":{name}");
    dir.arg = Some(ExpressionNode::simple(name, true, loc));
    dir.exp = Some(exp);
    dir
}

pub fn is_relative_url(url: &str) -> bool {
    matches!(url.as_bytes().first(), Some(b'.' | b'~' | b'@'))
}

/// Split into path and `#hash`, dropping a leading `~` or `~/`.
pub fn parse_url(url: &str) -> (&str, Option<&str>) {
    let url = match url.strip_prefix('~') {
        Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
        None => url,
    };
    match url.find('#') {
        Some(at) => (&url[..at], Some(&url[at..])),
        None => (url, None),
    }
}

/// Name of the import for `path`, registering it on first use.
pub(crate) fn import_name(path: &str, loc: &SourceLocation, ctx: &mut TransformContext) -> String {
    if let Some(existing) = ctx.imports.iter().find(|item| item.path == path) {
        return existing.exp.content.clone();
    }
    let name = format_compact!("_imports_{}", ctx.imports.len());
    ctx.imports.push(ImportItem {
        exp: SimpleExpressionNode::new(name.clone(), false, loc.clone())
            .with_const_type(ConstantType::CanHoist),
        path: path.into(),
    });
    name
}

fn imports_expression(
    path: &str,
    hash: Option<&str>,
    loc: &SourceLocation,
    ctx: &mut TransformContext,
) -> ExpressionNode {
    if path.is_empty() {
        return constant(format_compact!("''"), loc);
    }
    let name = import_name(path, loc, ctx);
    let Some(hash) = hash.filter(|h| h.len() > 1) else {
        return constant(name, loc);
    };
    let joined = constant(format_compact!("{name} + '{hash}'"), loc);
    // SSR output has no hoist section
    if ctx.options.ssr {
        return joined;
    }
    hoisted(joined, ctx)
}

pub(crate) fn hoisted(exp: ExpressionNode, ctx: &mut TransformContext) -> ExpressionNode {
    let js = match exp {
        ExpressionNode::Simple(simple) => JsNode::Simple(simple),
        ExpressionNode::Compound(compound) => JsNode::Compound(compound),
    };
    ExpressionNode::Simple(ctx.hoist_expression(js))
}

fn constant(content: String, loc: &SourceLocation) -> ExpressionNode {
    ExpressionNode::Simple(
        SimpleExpressionNode::new(content, false, loc.clone()).with_const_type(ConstantType::CanHoist),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vellum_atelier_dom::{compile_with_options, DomCompilerOptions};
    use vellum_relief::CodegenMode;

    fn compile(template: &str, options: AssetUrlOptions) -> std::string::String {
        let mut compiler = DomCompilerOptions {
            mode: CodegenMode::Module,
            prefix_identifiers: true,
            hoist_static: true,
            ..Default::default()
        }
        .to_compiler_options();
        compiler.node_transforms.push(Arc::new(AssetUrlTransform::new(options)));
        compile_with_options(template, &compiler).code.to_string()
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(parse_url("./a.png"), ("./a.png", None));
        assert_eq!(parse_url("~/a.png"), ("a.png", None));
        assert_eq!(parse_url("~pkg/a.svg#icon"), ("pkg/a.svg", Some("#icon")));
        assert_eq!(parse_url("~"), ("", None));
    }

    #[test]
    fn test_relative_urls_become_imports() {
        let code = compile(
            r#"<img src="./logo.png"><img src="./logo.png"><img src="https://x.io/a.png"><video poster="@/p.jpg"/>"#,
            AssetUrlOptions::default(),
        );
        assert!(code.contains("import _imports_0 from './logo.png'"));
        assert!(code.contains("import _imports_1 from '@/p.jpg'"));
        assert!(!code.contains("_imports_2"));
        assert!(code.contains("src: _imports_0"));
        assert!(code.contains("poster: _imports_1"));
        assert!(code.contains(r#""https://x.io/a.png""#));
    }

    #[test]
    fn test_hash_is_hoisted() {
        let code = compile(r##"<use href="./sprite.svg#home"/>"##, AssetUrlOptions::default());
        assert!(code.contains("import _imports_0 from './sprite.svg'"));
        assert!(code.contains("_imports_0 + '#home'"));
        assert!(code.contains("_hoisted_"));
    }

    #[test]
    fn test_overrides_replace_tags() {
        let options = AssetUrlOptions::with_overrides([("img".into(), vec!["data-src".into()])]);
        let code = compile(r#"<img src="./a.png" data-src="./b.png"/>"#, options);
        assert!(code.contains("import _imports_0 from './b.png'"));
        assert!(!code.contains("./a.png'"));
    }

    #[test]
    fn test_config_deserializes_from_bool_or_table() {
        let disabled: AssetUrlConfig = serde_json::from_str("false").unwrap();
        assert_eq!(disabled, AssetUrlConfig::Disabled);
        let table: AssetUrlConfig = serde_json::from_str(r#"{"*":["data-src"]}"#).unwrap();
        let AssetUrlConfig::Enabled(options) = table else {
            panic!("expected a table");
        };
        let attrs: Vec<&str> = options.attributes_for("div").collect();
        assert_eq!(attrs, vec!["data-src"]);
        let img: Vec<&str> = options.attributes_for("img").collect();
        assert_eq!(img, vec!["src", "data-src"]);
    }
}
