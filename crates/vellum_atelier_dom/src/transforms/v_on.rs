//! v-on with DOM event modifiers.
//!
//! Modifiers fall into three groups:
//! - event options (`.passive`, `.once`, `.capture`) end up in an
//!   `{ handler, options }` object;
//! - guards such as `.stop` or `.ctrl` wrap the handler in `withModifiers`;
//! - anything else names a key and wraps the handler in `withKeys`.

use vellum_atelier_core::transforms::transform_on_with;
use vellum_atelier_core::{DirectiveTransformResult, TransformContext};
use vellum_carton::to_json_string;
use vellum_relief::ast::{
    CompoundChild, CompoundExpressionNode, DirectiveNode, ExpressionNode, JsNode, NodeId,
    ObjectExpression, Property, RuntimeHelper,
};

use crate::options::event_modifiers::{
    is_event_option_modifier, is_keyboard_event, is_non_key_modifier,
};

pub fn transform_on(
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    let augment = |result: DirectiveTransformResult, ctx: &mut TransformContext| {
        apply_modifiers(dir, result, ctx)
    };
    transform_on_with(dir, node, ctx, Some(&augment))
}

#[derive(Debug, Default)]
struct ResolvedModifiers<'a> {
    key: Vec<&'a str>,
    non_key: Vec<&'a str>,
    event_option: Vec<&'a str>,
}

fn resolve_modifiers(dir: &DirectiveNode) -> ResolvedModifiers<'_> {
    let mut resolved = ResolvedModifiers::default();
    for modifier in &dir.modifiers {
        let name = modifier.content.as_str();
        if is_event_option_modifier(name) {
            resolved.event_option.push(name);
        } else if is_non_key_modifier(name) {
            resolved.non_key.push(name);
        } else {
            resolved.key.push(name);
        }
    }
    resolved
}

fn apply_modifiers(
    dir: &DirectiveNode,
    mut result: DirectiveTransformResult,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    if dir.modifiers.is_empty() || result.props.is_empty() {
        return result;
    }
    let Property { mut key, value } = result.props.remove(0);
    let mut handler = value;
    let modifiers = resolve_modifiers(dir);

    // click.right and click.middle never fire a click event
    if modifiers.non_key.contains(&"right") {
        key = transform_click(key, "onContextmenu");
    }
    if modifiers.non_key.contains(&"middle") {
        key = transform_click(key, "onMouseup");
    }

    if !modifiers.non_key.is_empty() {
        let helper = ctx.helper(RuntimeHelper::WithModifiers);
        handler = JsNode::call(helper, vec![handler, json_list(&modifiers.non_key)]);
    }
    let dynamic_event = !key.is_static();
    if !modifiers.key.is_empty()
        && (dynamic_event || key.static_content().is_some_and(is_keyboard_event))
    {
        let helper = ctx.helper(RuntimeHelper::WithKeys);
        handler = JsNode::call(helper, vec![handler, json_list(&modifiers.key)]);
    }
    if !modifiers.event_option.is_empty() {
        let options = modifiers
            .event_option
            .iter()
            .map(|m| Property::static_key(*m, JsNode::simple("true", false)))
            .collect();
        handler = JsNode::Object(ObjectExpression {
            properties: vec![
                Property::static_key("handler", handler),
                Property::static_key("options", JsNode::Object(ObjectExpression { properties: options })),
            ],
        });
    }

    result.props.insert(0, Property::new(key, handler));
    result
}

/// `["stop","prevent"]`
fn json_list(items: &[&str]) -> JsNode {
    let quoted: Vec<_> = items.iter().map(|m| to_json_string(m)).collect();
    JsNode::simple(format!("[{}]", quoted.join(",")), false)
}

fn transform_click(key: ExpressionNode, event: &str) -> ExpressionNode {
    match &key {
        ExpressionNode::Simple(s) if s.is_static => {
            if s.content.eq_ignore_ascii_case("onclick") {
                let mut renamed = ExpressionNode::simple(event, true, s.loc.clone());
                if let ExpressionNode::Simple(r) = &mut renamed {
                    r.is_handler_key = true;
                }
                renamed
            } else {
                key
            }
        }
        ExpressionNode::Compound(c) => {
            let mut compound = CompoundExpressionNode::new(
                vec![
                    CompoundChild::Code("(".into()),
                    CompoundChild::Compound(c.clone()),
                    CompoundChild::Code(
                        format!(").toLowerCase() === \"onclick\" ? \"{event}\" : (").into(),
                    ),
                    CompoundChild::Compound(c.clone()),
                    CompoundChild::Code(")".into()),
                ],
                c.loc.clone(),
            );
            compound.is_handler_key = true;
            ExpressionNode::Compound(compound)
        }
        ExpressionNode::Simple(_) => key,
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, DomCompilerOptions};

    fn compile_prefixed(source: &str) -> String {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        compile(source, &options).code
    }

    #[test]
    fn test_non_key_modifiers() {
        let code = compile_prefixed(r#"<div @click.stop.prevent="test"/>"#);
        assert!(code.contains(r#"onClick: _withModifiers(_ctx.test, ["stop","prevent"])"#));
    }

    #[test]
    fn test_key_modifiers_on_keyboard_event() {
        let code = compile_prefixed(r#"<input @keyup.enter="submit"/>"#);
        assert!(code.contains(r#"onKeyup: _withKeys(_ctx.submit, ["enter"])"#));
    }

    #[test]
    fn test_key_modifiers_ignored_on_mouse_event() {
        let code = compile_prefixed(r#"<div @click.enter="test"/>"#);
        assert!(code.contains("onClick: _ctx.test"));
        assert!(!code.contains("_withKeys"));
    }

    #[test]
    fn test_mixed_modifiers() {
        let code = compile_prefixed(r#"<input @keydown.stop.esc="close"/>"#);
        assert!(code.contains(
            r#"onKeydown: _withKeys(_withModifiers(_ctx.close, ["stop"]), ["esc"])"#
        ));
    }

    #[test]
    fn test_event_options() {
        let code = compile_prefixed(r#"<div @scroll.passive="onScroll"/>"#);
        assert!(code.contains("handler: _ctx.onScroll"));
        assert!(code.contains("options: { passive: true }"));
    }

    #[test]
    fn test_right_click_static() {
        let code = compile_prefixed(r#"<div @click.right="menu"/>"#);
        assert!(code.contains(r#"onContextmenu: _withModifiers(_ctx.menu, ["right"])"#));
    }

    #[test]
    fn test_middle_click_static() {
        let code = compile_prefixed(r#"<div @click.middle="paste"/>"#);
        assert!(code.contains(r#"onMouseup: _withModifiers(_ctx.paste, ["middle"])"#));
    }

    #[test]
    fn test_right_click_dynamic_event() {
        let code = compile_prefixed(r#"<div @[event].right="menu"/>"#);
        assert!(code.contains(
            r#"(_toHandlerKey(_ctx.event)).toLowerCase() === "onclick" ? "onContextmenu" : (_toHandlerKey(_ctx.event))"#
        ));
    }

    #[test]
    fn test_dynamic_event_always_guards_keys() {
        let code = compile_prefixed(r#"<div @[event].enter="go"/>"#);
        assert!(code.contains(r#"_withKeys(_ctx.go, ["enter"])"#));
    }

    #[test]
    fn test_cached_handler_wraps_modifiers() {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            cache_handlers: true,
            ..Default::default()
        };
        let code = compile(r#"<div @click.stop="count++"/>"#, &options).code;
        assert!(code.contains(
            r#"_cache[0] || (_cache[0] = _withModifiers($event => (_ctx.count++), ["stop"]))"#
        ));
    }
}
