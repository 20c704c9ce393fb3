//! Merge adjacent text and interpolations into one expression, and wrap text
//! children that sit next to elements in `createTextVNode` calls.

use vellum_carton::PatchFlags;
use vellum_relief::ast::{
    CompoundChild, CompoundExpressionNode, ConstantType, ElementType, JsNode, NodeId, NodeKind,
    NodeType, PropNode, RuntimeHelper, SourceLocation, TextCallNode,
};

use crate::transform::{TransformAction, TransformContext};
use crate::transforms::hoist_static::get_constant_type;
use crate::utils::is_text;

pub fn transform_text(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    if !matches!(
        ctx.ast.node_type(node),
        NodeType::Root | NodeType::Element | NodeType::For | NodeType::IfBranch
    ) {
        return TransformAction::Continue;
    }
    TransformAction::Exit(Box::new(move |ctx: &mut TransformContext| {
        let has_text = merge_adjacent_text(ctx, node);
        if !has_text || keeps_bare_text(ctx, node) {
            return;
        }
        wrap_text_calls(ctx, node);
    }))
}

fn compound_part(ctx: &TransformContext, node: NodeId) -> Option<CompoundChild> {
    match &ctx.ast.node(node).kind {
        NodeKind::Text(t) => Some(CompoundChild::Text(t.content.clone())),
        NodeKind::Interpolation(i) => Some(CompoundChild::Interpolation(i.content.clone())),
        _ => None,
    }
}

/// Returns whether any text-like child was seen.
fn merge_adjacent_text(ctx: &mut TransformContext, node: NodeId) -> bool {
    let mut children = ctx.ast.children(node).to_vec();
    let mut has_text = false;
    let mut changed = false;
    let mut i = 0;
    while i < children.len() {
        if !is_text(&ctx.ast, children[i]) {
            i += 1;
            continue;
        }
        has_text = true;
        let run_end = children[i..]
            .iter()
            .position(|&c| !is_text(&ctx.ast, c))
            .map_or(children.len(), |p| i + p);
        if run_end - i > 1 {
            let run: Vec<NodeId> = children.drain(i..run_end).collect();
            let start = ctx.ast.node(run[0]).loc.start;
            let end = ctx.ast.node(run[run.len() - 1]).loc.end;
            let source = ctx.ast.source.get(start.offset as usize..end.offset as usize);
            let loc = SourceLocation::new(start, end, source.unwrap_or_default());

            let mut parts = Vec::with_capacity(run.len() * 2);
            for (n, &id) in run.iter().enumerate() {
                if n > 0 {
                    parts.push(CompoundChild::Code(" + ".into()));
                }
                parts.extend(compound_part(ctx, id));
            }
            let compound = ctx.ast.alloc(
                NodeKind::CompoundExpression(CompoundExpressionNode::new(parts, loc.clone())),
                loc,
            );
            children.insert(i, compound);
            changed = true;
        }
        i += 1;
    }
    if changed {
        if let Some(slot) = ctx.ast.children_mut(node) {
            *slot = children;
        }
    }
    has_text
}

/// A lone text child of the root or of a plain element is set as the element's
/// text content directly.
fn keeps_bare_text(ctx: &TransformContext, node: NodeId) -> bool {
    if ctx.ast.children(node).len() != 1 {
        return false;
    }
    match &ctx.ast.node(node).kind {
        NodeKind::Root(_) => true,
        NodeKind::Element(el) => {
            el.tag_type == ElementType::Element
                && !el.props.iter().any(|p| match p {
                    PropNode::Directive(dir) => ctx.directive_transform(&dir.kind).is_none(),
                    PropNode::Attribute(_) => false,
                })
        }
        _ => false,
    }
}

fn wrap_text_calls(ctx: &mut TransformContext, node: NodeId) {
    let mut children = ctx.ast.children(node).to_vec();
    for child in children.iter_mut() {
        let is_text_like = matches!(
            ctx.ast.node_type(*child),
            NodeType::Text | NodeType::Interpolation | NodeType::CompoundExpression
        );
        if !is_text_like {
            continue;
        }
        let single_space = matches!(&ctx.ast.node(*child).kind, NodeKind::Text(t) if t.content == " ");
        let mut args = Vec::new();
        if !single_space {
            args.push(JsNode::Node(*child));
        }
        if !ctx.options.ssr && get_constant_type(ctx, *child) == ConstantType::NotConstant {
            args.push(JsNode::simple(
                format!("{} /* TEXT */", PatchFlags::TEXT.bits()),
                false,
            ));
        }
        let create_text = ctx.helper(RuntimeHelper::CreateText);
        let loc = ctx.ast.node(*child).loc.clone();
        *child = ctx.ast.alloc(
            NodeKind::TextCall(TextCallNode {
                content: *child,
                codegen_node: Some(JsNode::call(create_text, args)),
            }),
            loc,
        );
    }
    if let Some(slot) = ctx.ast.children_mut(node) {
        *slot = children;
    }
}

#[cfg(test)]
mod tests {
    use crate::compile::{base_compile, get_base_transform_preset};
    use crate::options::CompilerOptions;

    fn compile(source: &str) -> std::string::String {
        let options = CompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        base_compile(source, &options, get_base_transform_preset(true))
            .code
            .to_string()
    }

    #[test]
    fn test_single_text_stays_inline() {
        let code = compile("<div>hello {{ name }}</div>");
        assert!(code.contains(
            r#"_createElementBlock("div", null, "hello " + _toDisplayString(_ctx.name), 1 /* TEXT */)"#
        ));
    }

    #[test]
    fn test_text_next_to_element() {
        let code = compile("<div>a<span/>{{ b }}</div>");
        assert!(code.contains(r#"_createTextVNode("a")"#));
        assert!(code.contains(r#"_createTextVNode(_toDisplayString(_ctx.b), 1 /* TEXT */)"#));
    }

    #[test]
    fn test_root_text() {
        let code = compile("{{ a }} b");
        assert!(code.contains(r#"return _toDisplayString(_ctx.a) + " b""#));
    }

    #[test]
    fn test_component_text_child_is_wrapped() {
        let code = compile("<Comp>hi</Comp>");
        assert!(code.contains(r#"_createTextVNode("hi")"#));
    }
}
