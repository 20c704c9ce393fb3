//! `v-once`: render once, then serve the vnode from `_cache`.

use vellum_relief::ast::{DirectiveKind, NodeId, RuntimeHelper};

use crate::transform::{TransformAction, TransformContext};
use crate::utils::{codegen_slot, take_dir};

pub fn transform_once(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let has_once = ctx
        .ast
        .element(node)
        .is_some_and(|el| el.find_dir(&DirectiveKind::Once).is_some());
    if !has_once || ctx.in_v_once || ctx.options.ssr {
        return TransformAction::Continue;
    }
    take_dir(&mut ctx.ast, node, &DirectiveKind::Once);
    ctx.in_v_once = true;
    ctx.helper(RuntimeHelper::SetBlockTracking);

    TransformAction::Exit(Box::new(|ctx: &mut TransformContext| {
        ctx.in_v_once = false;
        let Some(current) = ctx.current_node else { return };
        let codegen = codegen_slot(&mut ctx.ast, current).and_then(Option::take);
        if let Some(codegen) = codegen {
            let cached = ctx.cache(codegen, true);
            if let Some(slot) = codegen_slot(&mut ctx.ast, current) {
                *slot = Some(cached);
            }
        }
    }))
}
