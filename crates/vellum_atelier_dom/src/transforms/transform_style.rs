//! Static `style` attributes become `:style` bindings.
//!
//! `style="color: red"` turns into `:style='{"color":"red"}'`, which
//! `transform_element` then merges with any dynamic style binding. The parsed
//! object is a constant and can be hoisted.

use vellum_atelier_core::{TransformAction, TransformContext};
use vellum_carton::to_json_string;
use vellum_relief::ast::{
    ConstantType, DirectiveNode, ExpressionNode, NodeId, PropNode, SimpleExpressionNode,
};

pub fn transform_style(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let Some(el) = ctx.ast.element_mut(node) else {
        return TransformAction::Continue;
    };
    for prop in el.props.iter_mut() {
        let PropNode::Attribute(attr) = prop else { continue };
        if attr.name != "style" {
            continue;
        }
        let Some(value) = &attr.value else { continue };
        let loc = attr.loc.clone();
        let mut dir = DirectiveNode::new("bind", loc.clone());
        dir.raw_name = ":style".into();
        dir.arg = Some(ExpressionNode::simple("style", true, loc.clone()));
        dir.exp = Some(ExpressionNode::Simple(
            SimpleExpressionNode::new(parse_inline_css(&value.content), false, loc)
                .with_const_type(ConstantType::CanStringify),
        ));
        *prop = PropNode::Directive(dir);
    }
    TransformAction::Continue
}

/// JSON object text for a declaration list, keys in first-seen order.
pub fn parse_inline_css(css: &str) -> String {
    let mut entries: Vec<(&str, &str)> = Vec::new();
    for item in split_declarations(css) {
        if item.is_empty() {
            continue;
        }
        let Some((name, value)) = item.split_once(':') else { continue };
        if value.is_empty() {
            continue;
        }
        let (name, value) = (name.trim(), value.trim());
        match entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => entries.push((name, value)),
        }
    }
    let body: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{}:{}", to_json_string(k), to_json_string(v)))
        .collect();
    format!("{{{}}}", body.join(","))
}

/// Split on `;` unless the next parenthesis after it is a closing one, so
/// `url(data:a;b)` stays whole.
fn split_declarations(css: &str) -> Vec<&str> {
    let bytes = css.as_bytes();
    let mut items = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b != b';' {
            continue;
        }
        let inside_parens = bytes[i + 1..]
            .iter()
            .find(|&&c| c == b'(' || c == b')')
            .is_some_and(|&c| c == b')');
        if !inside_parens {
            items.push(&css[start..i]);
            start = i + 1;
        }
    }
    items.push(&css[start..]);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, DomCompilerOptions};

    #[test]
    fn test_parse_inline_css() {
        assert_eq!(parse_inline_css("color: red"), r#"{"color":"red"}"#);
        assert_eq!(
            parse_inline_css("color: red; ; margin:0 auto;"),
            r#"{"color":"red","margin":"0 auto"}"#
        );
        assert_eq!(
            parse_inline_css("background: url(data:image/png;base64,AA); color: blue"),
            r#"{"background":"url(data:image/png;base64,AA)","color":"blue"}"#
        );
        assert_eq!(parse_inline_css("color: red; color: blue"), r#"{"color":"blue"}"#);
        assert_eq!(parse_inline_css("broken"), "{}");
    }

    #[test]
    fn test_static_style_becomes_binding() {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        let code = compile(r#"<div style="color: red"/>"#, &options).code;
        assert!(code.contains(r#"{ style: {"color":"red"} }"#));
        assert!(!code.contains("/* STYLE */"));
    }

    #[test]
    fn test_merged_with_dynamic_style() {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        let code = compile(r#"<div style="color: red" :style="s"/>"#, &options).code;
        assert!(code.contains(r#"style: _normalizeStyle([{"color":"red"}, _ctx.s])"#));
        assert!(code.contains("4 /* STYLE */"));
    }
}
