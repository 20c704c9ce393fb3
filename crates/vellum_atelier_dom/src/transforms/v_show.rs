//! v-show: no props, the `vShow` runtime directive does the work.

use vellum_atelier_core::{DirectiveTransformResult, NeedRuntime, TransformContext};
use vellum_relief::ast::{DirectiveNode, NodeId, RuntimeHelper};

use crate::errors::DomErrorCode;

pub fn transform_show(
    dir: &DirectiveNode,
    _node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    if dir.exp_is_empty() {
        ctx.on_error(DomErrorCode::VShowNoExpression.into_error(Some(dir.loc.clone())));
    }
    DirectiveTransformResult {
        props: Vec::new(),
        need_runtime: Some(NeedRuntime::Helper(ctx.helper(RuntimeHelper::VShow))),
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, DomCompilerOptions, DomErrorCode};

    #[test]
    fn test_v_show_runtime_directive() {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        let result = compile(r#"<div v-show="ok"/>"#, &options);
        assert!(result.errors.is_empty());
        assert!(result.code.contains("vShow: _vShow"));
        assert!(result.code.contains("[_vShow, _ctx.ok]"));
        assert!(result.code.contains("512 /* NEED_PATCH */"));
    }

    #[test]
    fn test_missing_expression() {
        let result = compile("<div v-show/>", &DomCompilerOptions::default());
        assert_eq!(result.errors[0].code, DomErrorCode::VShowNoExpression.code());
    }
}
