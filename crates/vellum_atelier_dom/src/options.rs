//! DOM compiler options and the browser parsing rules.

use serde::{Deserialize, Serialize};
use vellum_atelier_core::CompilerOptions;
use vellum_carton::String;
use vellum_relief::ast::{ElementNode, Namespace, PropNode, RuntimeHelper};
use vellum_relief::{CodegenMode, ParserOptions, TextMode, WhitespaceStrategy};

/// DOM compiler options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DomCompilerOptions {
    /// Output mode: function or module
    #[serde(default)]
    pub mode: CodegenMode,

    /// Filename used in source maps and diagnostics
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Whether to prefix identifiers
    #[serde(default)]
    pub prefix_identifiers: bool,

    /// Whether to hoist static nodes
    #[serde(default)]
    pub hoist_static: bool,

    /// Whether to cache event handlers
    #[serde(default)]
    pub cache_handlers: bool,

    /// Scope ID for scoped CSS
    #[serde(default)]
    pub scope_id: Option<String>,

    /// Whether the component styles use `:slotted`
    #[serde(default = "default_true")]
    pub slotted: bool,

    /// Whether in SSR mode
    #[serde(default)]
    pub ssr: bool,

    /// Whether to generate source map
    #[serde(default)]
    pub source_map: bool,

    /// Whether to preserve comments
    #[serde(default = "default_true")]
    pub comments: bool,

    #[serde(default)]
    pub whitespace: WhitespaceStrategy,

    /// Whether is TypeScript
    #[serde(default)]
    pub is_ts: bool,
}

fn default_filename() -> String {
    String::const_new("template.vue.html")
}

fn default_true() -> bool {
    true
}

impl Default for DomCompilerOptions {
    fn default() -> Self {
        Self {
            mode: CodegenMode::Function,
            filename: default_filename(),
            prefix_identifiers: false,
            hoist_static: false,
            cache_handlers: false,
            scope_id: None,
            slotted: true,
            ssr: false,
            source_map: false,
            comments: true,
            whitespace: WhitespaceStrategy::Condense,
            is_ts: false,
        }
    }
}

impl DomCompilerOptions {
    /// Core options with the DOM parser rules installed.
    pub fn to_compiler_options(&self) -> CompilerOptions {
        let mut parser = parser_options();
        parser.comments = self.comments;
        parser.whitespace = self.whitespace;
        CompilerOptions {
            parser,
            mode: self.mode,
            filename: self.filename.clone(),
            prefix_identifiers: self.prefix_identifiers,
            hoist_static: self.hoist_static,
            cache_handlers: self.cache_handlers,
            scope_id: self.scope_id.clone(),
            slotted: self.slotted,
            ssr: self.ssr,
            is_ts: self.is_ts,
            source_map: self.source_map,
            ..Default::default()
        }
    }
}

/// Parser configuration for browser templates.
pub fn parser_options() -> ParserOptions {
    ParserOptions {
        is_void_tag: vellum_carton::is_void_tag,
        is_native_tag: Some(vellum_carton::is_native_tag),
        is_pre_tag: |tag| tag == "pre",
        is_builtin_component,
        get_namespace,
        get_text_mode,
        ..Default::default()
    }
}

pub fn is_builtin_component(tag: &str) -> Option<RuntimeHelper> {
    match tag {
        "Transition" | "transition" => Some(RuntimeHelper::Transition),
        "TransitionGroup" | "transition-group" => Some(RuntimeHelper::TransitionGroup),
        _ => None,
    }
}

/// Namespace of `tag`, following the HTML tree-construction dispatcher.
pub fn get_namespace(tag: &str, parent: Option<&ElementNode>) -> Namespace {
    let Some(parent) = parent else {
        return html_namespace(tag, Namespace::Html);
    };
    let mut ns = parent.ns;
    match ns {
        Namespace::MathMl => {
            if parent.tag == "annotation-xml" {
                if tag == "svg" {
                    return Namespace::Svg;
                }
                if has_html_encoding(parent) {
                    ns = Namespace::Html;
                }
            } else if matches!(parent.tag.as_str(), "mi" | "mo" | "mn" | "ms" | "mtext")
                && tag != "mglyph"
                && tag != "malignmark"
            {
                ns = Namespace::Html;
            }
        }
        Namespace::Svg => {
            if matches!(parent.tag.as_str(), "foreignObject" | "desc" | "title") {
                ns = Namespace::Html;
            }
        }
        Namespace::Html => {}
    }
    html_namespace(tag, ns)
}

fn html_namespace(tag: &str, ns: Namespace) -> Namespace {
    match (ns, tag) {
        (Namespace::Html, "svg") => Namespace::Svg,
        (Namespace::Html, "math") => Namespace::MathMl,
        _ => ns,
    }
}

fn has_html_encoding(el: &ElementNode) -> bool {
    el.props.iter().any(|p| match p {
        PropNode::Attribute(attr) => {
            attr.name == "encoding"
                && attr.value.as_ref().is_some_and(|v| {
                    v.content == "text/html" || v.content == "application/xhtml+xml"
                })
        }
        PropNode::Directive(_) => false,
    })
}

pub fn get_text_mode(tag: &str, ns: Namespace, _parent: Option<&ElementNode>) -> TextMode {
    if ns != Namespace::Html {
        return TextMode::Data;
    }
    match tag {
        "textarea" | "title" => TextMode::RcData,
        "style" | "iframe" | "script" | "noscript" => TextMode::RawText,
        _ => TextMode::Data,
    }
}

/// Modifier tables for v-on.
pub mod event_modifiers {
    use phf::phf_set;

    /// Modifiers passed to `addEventListener` as options
    pub static EVENT_OPTION_MODIFIERS: phf::Set<&'static str> = phf_set! {
        "passive", "once", "capture"
    };

    /// Modifiers guarded at runtime by `withModifiers`
    pub static NON_KEY_MODIFIERS: phf::Set<&'static str> = phf_set! {
        "stop", "prevent", "self", "ctrl", "shift", "alt", "meta", "exact",
        "left", "middle", "right"
    };

    static KEYBOARD_EVENTS: phf::Set<&'static str> = phf_set! {
        "onkeyup", "onkeydown", "onkeypress"
    };

    #[inline]
    pub fn is_event_option_modifier(modifier: &str) -> bool {
        EVENT_OPTION_MODIFIERS.contains(modifier)
    }

    #[inline]
    pub fn is_non_key_modifier(modifier: &str) -> bool {
        NON_KEY_MODIFIERS.contains(modifier)
    }

    /// `key` is a handler key such as `onKeyup`; compared case-insensitively.
    pub fn is_keyboard_event(key: &str) -> bool {
        KEYBOARD_EVENTS.contains(key.to_ascii_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, ns: Namespace) -> ElementNode {
        let mut el = ElementNode::new(tag);
        el.ns = ns;
        el
    }

    #[test]
    fn test_namespace_switches() {
        assert_eq!(get_namespace("svg", None), Namespace::Svg);
        assert_eq!(get_namespace("math", None), Namespace::MathMl);

        let svg = element("svg", Namespace::Svg);
        assert_eq!(get_namespace("circle", Some(&svg)), Namespace::Svg);

        let foreign = element("foreignObject", Namespace::Svg);
        assert_eq!(get_namespace("div", Some(&foreign)), Namespace::Html);

        let mi = element("mi", Namespace::MathMl);
        assert_eq!(get_namespace("span", Some(&mi)), Namespace::Html);
        assert_eq!(get_namespace("mglyph", Some(&mi)), Namespace::MathMl);

        let annotation = element("annotation-xml", Namespace::MathMl);
        assert_eq!(get_namespace("svg", Some(&annotation)), Namespace::Svg);
        assert_eq!(get_namespace("div", Some(&annotation)), Namespace::MathMl);
    }

    #[test]
    fn test_annotation_xml_html_encoding() {
        let (ast, errors) = vellum_armature::parse_with_options(
            r#"<math><annotation-xml encoding="text/html"><div/></annotation-xml></math>"#,
            parser_options(),
        );
        assert!(errors.is_empty());
        let math = ast.children(vellum_relief::ast::NodeId::ROOT)[0];
        let annotation = ast.children(math)[0];
        let div = ast.children(annotation)[0];
        assert_eq!(ast.element(annotation).map(|e| e.ns), Some(Namespace::MathMl));
        assert_eq!(ast.element(div).map(|e| e.ns), Some(Namespace::Html));
    }

    #[test]
    fn test_text_modes() {
        assert_eq!(get_text_mode("textarea", Namespace::Html, None), TextMode::RcData);
        assert_eq!(get_text_mode("script", Namespace::Html, None), TextMode::RawText);
        assert_eq!(get_text_mode("title", Namespace::Svg, None), TextMode::Data);
        assert_eq!(get_text_mode("div", Namespace::Html, None), TextMode::Data);
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: DomCompilerOptions =
            serde_json::from_str(r#"{"prefixIdentifiers": true, "scopeId": "data-v-1"}"#)
                .expect("valid options");
        assert!(options.prefix_identifiers);
        assert_eq!(options.scope_id.as_deref(), Some("data-v-1"));
        assert!(options.comments);
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let result: Result<DomCompilerOptions, _> = serde_json::from_str(r#"{"hoist": true}"#);
        assert!(result.is_err());
    }
}
