//! `v-memo`: skip re-rendering while the dependency array is unchanged.

use vellum_carton::format_compact;
use vellum_relief::ast::{
    DirectiveKind, ExpressionNode, FunctionExpression, JsNode, NodeId, RuntimeHelper,
};

use crate::transform::{TransformAction, TransformContext};
use crate::transforms::transform_expression::process_expression;
use crate::utils::{codegen_slot, take_dir};

pub fn transform_memo(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let Some(el) = ctx.ast.element(node) else {
        return TransformAction::Continue;
    };
    // Memoized list items are not supported; such lists render without a memo.
    if el.find_dir(&DirectiveKind::Memo).is_none()
        || el.find_dir(&DirectiveKind::For).is_some()
        || ctx.options.ssr
    {
        return TransformAction::Continue;
    }
    let is_component = el.is_component();
    let Some(dir) = take_dir(&mut ctx.ast, node, &DirectiveKind::Memo) else {
        return TransformAction::Continue;
    };
    let exp = match dir.exp {
        Some(ExpressionNode::Simple(exp)) => process_expression(ctx, &exp, false),
        _ => return TransformAction::Continue,
    };

    TransformAction::Exit(Box::new(move |ctx: &mut TransformContext| {
        let target = match codegen_slot(&mut ctx.ast, node) {
            Some(slot) if slot.is_some() => node,
            _ => match ctx.current_node {
                Some(current) => current,
                None => return,
            },
        };
        let mut vnode = match codegen_slot(&mut ctx.ast, target).and_then(Option::take) {
            Some(JsNode::VNode(vnode)) => vnode,
            other => {
                if let Some(slot) = codegen_slot(&mut ctx.ast, target) {
                    *slot = other;
                }
                return;
            }
        };
        if !is_component {
            ctx.make_block(&mut vnode);
        }
        let with_memo = ctx.helper(RuntimeHelper::WithMemo);
        let index = ctx.cached;
        ctx.cached += 1;
        let call = JsNode::call(
            with_memo,
            vec![
                JsNode::Simple(exp),
                JsNode::Function(FunctionExpression {
                    params: Vec::new(),
                    returns: Box::new(JsNode::VNode(vnode)),
                    newline: false,
                }),
                JsNode::simple("_cache", false),
                JsNode::simple(format_compact!("{}", index), false),
            ],
        );
        if let Some(slot) = codegen_slot(&mut ctx.ast, target) {
            *slot = Some(call);
        }
    }))
}
