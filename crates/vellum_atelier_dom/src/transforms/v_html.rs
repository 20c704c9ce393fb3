//! v-html: sets `innerHTML` and drops the element's children.

use vellum_atelier_core::{DirectiveTransformResult, TransformContext};
use vellum_relief::ast::{DirectiveNode, ExpressionNode, JsNode, NodeId, Property};

use crate::errors::DomErrorCode;

pub fn transform_v_html(
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    content_prop(
        "innerHTML",
        dir,
        node,
        ctx,
        DomErrorCode::VHtmlNoExpression,
        DomErrorCode::VHtmlWithChildren,
    )
}

/// One static-keyed prop holding the directive expression. Shared with v-text.
pub(crate) fn content_prop(
    key: &str,
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
    missing: DomErrorCode,
    with_children: DomErrorCode,
) -> DirectiveTransformResult {
    if dir.exp_is_empty() {
        ctx.on_error(missing.into_error(Some(dir.loc.clone())));
    }
    let had_children = match ctx.ast.children_mut(node) {
        Some(children) if !children.is_empty() => {
            children.clear();
            true
        }
        _ => false,
    };
    if had_children {
        ctx.on_error(with_children.into_error(Some(dir.loc.clone())));
    }

    let value = match &dir.exp {
        Some(exp) if !dir.exp_is_empty() => JsNode::from(exp.clone()),
        _ => JsNode::simple("", true),
    };
    DirectiveTransformResult::new(vec![Property::new(
        ExpressionNode::simple(key, true, dir.loc.clone()),
        value,
    )])
}

#[cfg(test)]
mod tests {
    use crate::{compile, DomCompilerOptions, DomErrorCode};

    fn options() -> DomCompilerOptions {
        DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_inner_html_prop() {
        let result = compile(r#"<div v-html="test"/>"#, &options());
        assert!(result.errors.is_empty());
        assert!(result.code.contains(
            r#"_createElementBlock("div", { innerHTML: _ctx.test }, null, 8 /* PROPS */, ["innerHTML"])"#
        ));
    }

    #[test]
    fn test_children_are_dropped() {
        let result = compile(r#"<div v-html="test">hello</div>"#, &options());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, DomErrorCode::VHtmlWithChildren.code());
        assert!(!result.code.contains("hello"));
    }

    #[test]
    fn test_missing_expression() {
        let result = compile("<div v-html></div>", &options());
        assert_eq!(result.errors[0].code, DomErrorCode::VHtmlNoExpression.code());
        assert!(result.code.contains(r#"innerHTML: """#));
    }
}
