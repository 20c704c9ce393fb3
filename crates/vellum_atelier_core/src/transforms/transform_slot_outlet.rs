//! `<slot>` outlets become `renderSlot($slots, name, props, fallback)` calls.

use vellum_carton::{camelize, to_json_string};
use vellum_relief::ast::{
    DirectiveKind, ExpressionNode, FunctionExpression, JsNode, NodeId, PropNode, RuntimeHelper,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{TransformAction, TransformContext};
use crate::transforms::transform_element::build_props;
use crate::utils::is_slot_outlet;

pub fn transform_slot_outlet(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    if !is_slot_outlet(&ctx.ast, node) {
        return TransformAction::Continue;
    }
    let children = ctx.ast.children(node).to_vec();
    let (slot_name, slot_props) = process_slot_outlet(ctx, node);

    let slots = if ctx.prefix_identifiers {
        "_ctx.$slots"
    } else {
        "$slots"
    };
    let mut args = vec![
        JsNode::simple(slots, false),
        slot_name,
        JsNode::simple("{}", false),
        JsNode::simple("undefined", false),
        JsNode::simple("true", false),
    ];
    let mut expected_len = 2;
    if let Some(props) = slot_props {
        args[2] = props;
        expected_len = 3;
    }
    if !children.is_empty() {
        args[3] = JsNode::Function(FunctionExpression {
            params: Vec::new(),
            returns: Box::new(JsNode::Array(children.into_iter().map(JsNode::Node).collect())),
            newline: false,
        });
        expected_len = 4;
    }
    if ctx.options.scope_id.is_some() && !ctx.options.slotted {
        expected_len = 5;
    }
    args.truncate(expected_len);

    let render_slot = ctx.helper(RuntimeHelper::RenderSlot);
    if let Some(el) = ctx.ast.element_mut(node) {
        el.codegen_node = Some(JsNode::call(render_slot, args));
    }
    TransformAction::Continue
}

/// Slot name expression and the props object passed to the slot.
fn process_slot_outlet(ctx: &mut TransformContext, node: NodeId) -> (JsNode, Option<JsNode>) {
    let mut slot_name = JsNode::simple("\"default\"", false);
    let mut non_name_props = Vec::new();

    let props = ctx
        .ast
        .element(node)
        .map(|el| el.props.clone())
        .unwrap_or_default();
    for prop in props {
        match prop {
            PropNode::Attribute(mut attr) => {
                let Some(value) = &attr.value else { continue };
                if attr.name == "name" {
                    slot_name = JsNode::simple(to_json_string(&value.content), false);
                } else {
                    attr.name = camelize(&attr.name);
                    non_name_props.push(PropNode::Attribute(attr));
                }
            }
            PropNode::Directive(mut dir) => {
                let is_bind = dir.kind == DirectiveKind::Bind;
                if is_bind && dir.arg.as_ref().is_some_and(|a| a.is_static_key("name")) {
                    if let Some(exp) = dir.exp {
                        slot_name = JsNode::from(exp);
                    }
                    continue;
                }
                if is_bind {
                    if let Some(ExpressionNode::Simple(arg)) = dir.arg.as_mut() {
                        if arg.is_static {
                            arg.content = camelize(&arg.content);
                        }
                    }
                }
                non_name_props.push(PropNode::Directive(dir));
            }
        }
    }

    if non_name_props.is_empty() {
        return (slot_name, None);
    }
    let built = build_props(ctx, node, &non_name_props, false, false);
    if let Some((dir, _)) = built.directives.first() {
        ctx.on_error(CompilerError::new(
            ErrorCode::VSlotUnexpectedDirectiveOnSlotOutlet,
            Some(dir.loc.clone()),
        ));
    }
    (slot_name, built.props)
}

#[cfg(test)]
mod tests {
    use crate::compile::{base_compile, get_base_transform_preset};
    use crate::options::CompilerOptions;

    fn compile(source: &str, options: CompilerOptions) -> std::string::String {
        base_compile(source, &options, get_base_transform_preset(true))
            .code
            .to_string()
    }

    fn prefixed() -> CompilerOptions {
        CompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_outlet() {
        let code = compile("<slot/>", prefixed());
        assert!(code.contains(r#"_renderSlot(_ctx.$slots, "default")"#));
    }

    #[test]
    fn test_named_outlet_with_props() {
        let code = compile(r#"<slot name="foo" :item-id="id" data-x="1"/>"#, prefixed());
        assert!(code.contains(r#"_renderSlot(_ctx.$slots, "foo", {"#));
        assert!(code.contains("itemId: _ctx.id"));
        assert!(code.contains(r#"dataX: "1""#));
    }

    #[test]
    fn test_dynamic_name_and_fallback() {
        let code = compile(r#"<slot :name="n"><div/></slot>"#, prefixed());
        assert!(code.contains("_renderSlot(_ctx.$slots, _ctx.n, {}, () => ["));
    }

    #[test]
    fn test_scope_id_without_slotted() {
        let options = CompilerOptions {
            scope_id: Some("data-v-1".into()),
            slotted: false,
            mode: vellum_relief::CodegenMode::Module,
            ..Default::default()
        };
        let code = compile("<slot/>", options);
        assert!(code.contains(r#"_renderSlot(_ctx.$slots, "default", {}, undefined, true)"#));
    }

    #[test]
    fn test_directive_on_outlet_is_error() {
        let result = base_compile(
            r#"<slot v-foo/>"#,
            &prefixed(),
            get_base_transform_preset(true),
        );
        assert!(result.errors.iter().any(|e| e.code
            == vellum_relief::errors::ErrorCode::VSlotUnexpectedDirectiveOnSlotOutlet.code()));
    }
}
