//! v-text: sets `textContent` and drops the element's children.

use vellum_atelier_core::{DirectiveTransformResult, TransformContext};
use vellum_relief::ast::{DirectiveNode, NodeId};

use crate::errors::DomErrorCode;
use crate::transforms::v_html::content_prop;

pub fn transform_v_text(
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    content_prop(
        "textContent",
        dir,
        node,
        ctx,
        DomErrorCode::VTextNoExpression,
        DomErrorCode::VTextWithChildren,
    )
}

#[cfg(test)]
mod tests {
    use crate::{compile, DomCompilerOptions, DomErrorCode};

    #[test]
    fn test_text_content_prop() {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        let result = compile(r#"<div v-text="msg">x</div>"#, &options);
        assert!(result.code.contains("textContent: _ctx.msg"));
        assert!(result
            .errors
            .iter()
            .any(|e| e.code == DomErrorCode::VTextWithChildren.code()));
    }

    #[test]
    fn test_blank_expression_is_missing() {
        let result = compile(r#"<div v-text=" "/>"#, &DomCompilerOptions::default());
        assert_eq!(result.errors[0].code, DomErrorCode::VTextNoExpression.code());
    }
}
