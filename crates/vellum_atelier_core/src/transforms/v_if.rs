//! `v-if` / `v-else-if` / `v-else`.
//!
//! A `v-if` element is replaced by an [`IfNode`] holding its first branch. Each
//! following `v-else(-if)` sibling is moved into that node's branch list and
//! removed from its parent, and its codegen is chained onto the alternate of the
//! previous conditional.

use vellum_carton::{format_compact, PatchFlags};
use vellum_relief::ast::{
    ConditionalExpression, ConstantType, DirectiveKind, DirectiveNode, ElementType,
    ExpressionNode, IfBranchNode, IfNode, JsNode, NodeId, NodeKind, NodeType, ObjectExpression,
    PropNode, Property, RuntimeHelper, SimpleExpressionNode, SourceLocation, VNodeChildren,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{TransformAction, TransformContext};
use crate::transforms::transform_expression::process_expression;
use crate::utils::{
    codegen_slot, fragment_block, inject_prop, inject_vnode_prop, is_slot_template,
    memoed_vnode_mut, take_dir,
};

pub fn transform_if(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let Some(el) = ctx.ast.element(node) else {
        return TransformAction::Continue;
    };
    if is_slot_template(&ctx.ast, node) {
        return TransformAction::Continue;
    }
    let kind = if el.find_dir(&DirectiveKind::If).is_some() {
        DirectiveKind::If
    } else if el.find_dir(&DirectiveKind::ElseIf).is_some() {
        DirectiveKind::ElseIf
    } else if el.find_dir(&DirectiveKind::Else).is_some() {
        DirectiveKind::Else
    } else {
        return TransformAction::Continue;
    };
    let Some(mut dir) = take_dir(&mut ctx.ast, node, &kind) else {
        return TransformAction::Continue;
    };

    if kind != DirectiveKind::Else && dir.exp_is_empty() {
        ctx.on_error(CompilerError::new(
            ErrorCode::VIfNoExpression,
            Some(dir.loc.clone()),
        ));
        dir.exp = Some(ExpressionNode::simple("true", false, dir.loc.clone()));
    }
    if ctx.prefix_identifiers {
        if let Some(ExpressionNode::Simple(exp)) = &dir.exp {
            dir.exp = Some(ExpressionNode::Simple(process_expression(ctx, exp, false)));
        }
    }

    if kind == DirectiveKind::If {
        open_if(node, dir, ctx)
    } else {
        attach_else(node, dir, ctx)
    }
}

fn create_branch(ctx: &mut TransformContext, node: NodeId, dir: DirectiveNode) -> NodeId {
    let el = ctx.ast.element(node);
    let is_template_if = el.is_some_and(|el| el.tag_type == ElementType::Template);
    let children = match el {
        Some(el) if is_template_if && el.find_dir(&DirectiveKind::For).is_none() => {
            el.children.clone()
        }
        _ => vec![node],
    };
    let user_key = el.and_then(|el| el.find_prop("key", false, false).cloned());
    let condition = match dir.kind {
        DirectiveKind::Else => None,
        _ => dir.exp,
    };
    let loc = ctx.ast.node(node).loc.clone();
    ctx.ast.alloc(
        NodeKind::IfBranch(IfBranchNode {
            condition,
            children,
            user_key,
            is_template_if,
        }),
        loc,
    )
}

/// Total branch count of `v-if` chains preceding `index` among the parent's children.
fn preceding_branch_count(ctx: &TransformContext, index: usize) -> usize {
    let Some(parent) = ctx.parent else { return 0 };
    ctx.ast.children(parent)[..index.min(ctx.ast.children(parent).len())]
        .iter()
        .map(|&sibling| match &ctx.ast.node(sibling).kind {
            NodeKind::If(if_node) => if_node.branches.len(),
            _ => 0,
        })
        .sum()
}

fn open_if(node: NodeId, dir: DirectiveNode, ctx: &mut TransformContext) -> TransformAction {
    let loc = ctx.ast.node(node).loc.clone();
    let branch = create_branch(ctx, node, dir);
    let if_node = ctx.ast.alloc(
        NodeKind::If(IfNode {
            branches: vec![branch],
            codegen_node: None,
        }),
        loc,
    );
    let key = preceding_branch_count(ctx, ctx.child_index);

    TransformAction::Replace {
        node: if_node,
        exit: Some(Box::new(move |ctx: &mut TransformContext| {
            let codegen = create_branch_codegen(ctx, branch, key);
            if let NodeKind::If(n) = &mut ctx.ast.node_mut(if_node).kind {
                n.codegen_node = Some(codegen);
            }
        })),
    }
}

fn attach_else(node: NodeId, dir: DirectiveNode, ctx: &mut TransformContext) -> TransformAction {
    let Some(parent) = ctx.parent else {
        ctx.on_error(CompilerError::new(
            ErrorCode::VElseNoAdjacentIf,
            Some(dir.loc.clone()),
        ));
        return TransformAction::Continue;
    };
    let is_else_if = dir.kind == DirectiveKind::ElseIf;
    let dir_loc = dir.loc.clone();
    let mut comments = Vec::new();

    while ctx.child_index > 0 {
        let index = ctx.child_index - 1;
        let sibling = ctx.ast.children(parent)[index];
        match ctx.ast.node_type(sibling) {
            NodeType::Comment => {
                ctx.remove_sibling(index);
                comments.insert(0, sibling);
            }
            NodeType::Text if ctx.ast.is_whitespace_text(sibling) => {
                ctx.remove_sibling(index);
            }
            NodeType::If => {
                let last_is_else = match &ctx.ast.node(sibling).kind {
                    NodeKind::If(n) => n.branches.last().is_some_and(|&b| {
                        matches!(&ctx.ast.node(b).kind, NodeKind::IfBranch(b) if b.condition.is_none())
                    }),
                    _ => false,
                };
                if is_else_if && last_is_else {
                    ctx.on_error(CompilerError::new(
                        ErrorCode::VElseNoAdjacentIf,
                        Some(dir_loc.clone()),
                    ));
                }

                let branch = create_branch(ctx, node, dir);
                if !comments.is_empty() && !parent_is_transition(ctx, parent) {
                    if let NodeKind::IfBranch(b) = &mut ctx.ast.node_mut(branch).kind {
                        comments.extend(b.children.drain(..));
                        b.children = comments;
                    }
                }
                check_same_key(ctx, sibling, branch);
                if let NodeKind::If(n) = &mut ctx.ast.node_mut(sibling).kind {
                    n.branches.push(branch);
                }

                let key = preceding_branch_count(ctx, index);
                ctx.traverse_node(branch);
                ctx.current_node = None;

                let branch_count = match &ctx.ast.node(sibling).kind {
                    NodeKind::If(n) => n.branches.len(),
                    _ => 1,
                };
                let codegen = create_branch_codegen(ctx, branch, key + branch_count - 1);
                if let NodeKind::If(n) = &mut ctx.ast.node_mut(sibling).kind {
                    if let Some(root) = n.codegen_node.as_mut() {
                        set_last_alternate(root, codegen);
                    }
                }
                return TransformAction::Remove;
            }
            _ => break,
        }
    }

    ctx.on_error(CompilerError::new(
        ErrorCode::VElseNoAdjacentIf,
        Some(dir_loc),
    ));
    TransformAction::Continue
}

fn parent_is_transition(ctx: &TransformContext, parent: NodeId) -> bool {
    ctx.ast.element(parent).is_some_and(|el| {
        el.builtin == Some(RuntimeHelper::Transition)
            || el.tag == "transition"
            || el.tag == "Transition"
    })
}

fn check_same_key(ctx: &mut TransformContext, if_node: NodeId, branch: NodeId) {
    let NodeKind::IfBranch(new_branch) = &ctx.ast.node(branch).kind else {
        return;
    };
    let Some(key) = &new_branch.user_key else { return };
    let NodeKind::If(n) = &ctx.ast.node(if_node).kind else {
        return;
    };
    let duplicate = n.branches.iter().any(|&b| match &ctx.ast.node(b).kind {
        NodeKind::IfBranch(existing) => existing
            .user_key
            .as_ref()
            .is_some_and(|other| same_key(other, key)),
        _ => false,
    });
    if duplicate {
        let loc = key.loc().clone();
        ctx.on_error(CompilerError::new(ErrorCode::VIfSameKey, Some(loc)));
    }
}

fn same_key(a: &PropNode, b: &PropNode) -> bool {
    match (a, b) {
        (PropNode::Attribute(a), PropNode::Attribute(b)) => {
            a.value.as_ref().map(|v| &v.content) == b.value.as_ref().map(|v| &v.content)
        }
        (PropNode::Directive(a), PropNode::Directive(b)) => {
            a.exp.as_ref().map(ExpressionNode::source_text)
                == b.exp.as_ref().map(ExpressionNode::source_text)
        }
        _ => false,
    }
}

/// Walk the `a ? b : c ? d : ...` chain and replace the last alternate.
fn set_last_alternate(root: &mut JsNode, alternate: JsNode) {
    let mut current = root;
    loop {
        match current {
            JsNode::Conditional(cond) => {
                if matches!(cond.alternate.as_ref(), JsNode::Conditional(_)) {
                    current = cond.alternate.as_mut();
                } else {
                    *cond.alternate = alternate;
                    return;
                }
            }
            JsNode::Cache(cache) => current = cache.value.as_mut(),
            _ => return,
        }
    }
}

fn create_branch_codegen(ctx: &mut TransformContext, branch: NodeId, key: usize) -> JsNode {
    let (condition, children) = match &ctx.ast.node(branch).kind {
        NodeKind::IfBranch(b) => (b.condition.clone(), b.children.clone()),
        _ => return JsNode::simple("null", false),
    };
    let body = create_children_codegen(ctx, &children, key);
    match condition {
        Some(test) => {
            let comment = ctx.helper(RuntimeHelper::CreateComment);
            JsNode::Conditional(ConditionalExpression {
                test: Box::new(test.into()),
                consequent: Box::new(body),
                alternate: Box::new(JsNode::call(
                    comment,
                    vec![JsNode::simple("\"v-if\"", false), JsNode::simple("true", false)],
                )),
                newline: true,
            })
        }
        None => body,
    }
}

fn create_children_codegen(
    ctx: &mut TransformContext,
    children: &[NodeId],
    key: usize,
) -> JsNode {
    let key_property = || {
        Property::static_key(
            "key",
            JsNode::Simple(
                SimpleExpressionNode::new(format_compact!("{}", key), false, SourceLocation::STUB)
                    .with_const_type(ConstantType::CanHoist),
            ),
        )
    };

    let single_element = match children {
        [only] if ctx.ast.node_type(*only) == NodeType::Element => Some(*only),
        _ => None,
    };

    let Some(element) = single_element else {
        if let [only] = children {
            if ctx.ast.node_type(*only) == NodeType::For {
                let mut codegen = match &mut ctx.ast.node_mut(*only).kind {
                    NodeKind::For(f) => f.codegen_node.take(),
                    _ => None,
                };
                if let Some(codegen) = codegen.as_mut() {
                    inject_prop(ctx, codegen, key_property());
                }
                if let NodeKind::For(f) = &mut ctx.ast.node_mut(*only).kind {
                    f.codegen_node = codegen;
                }
                return JsNode::Node(*only);
            }
        }
        let props = JsNode::Object(ObjectExpression {
            properties: vec![key_property()],
        });
        let vnode = fragment_block(
            ctx,
            Some(props),
            VNodeChildren::Nodes(children.to_vec()),
            PatchFlags::STABLE_FRAGMENT,
        );
        return JsNode::VNode(Box::new(vnode));
    };

    let mut codegen = codegen_slot(&mut ctx.ast, element).and_then(Option::take);
    if let Some(codegen) = codegen.as_mut() {
        if let Some(vnode) = memoed_vnode_mut(codegen) {
            ctx.make_block(vnode);
            inject_vnode_prop(ctx, vnode, key_property());
        } else {
            inject_prop(ctx, codegen, key_property());
        }
    }
    if let Some(slot) = codegen_slot(&mut ctx.ast, element) {
        *slot = codegen;
    }
    JsNode::Node(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{base_compile, get_base_transform_preset};
    use crate::options::CompilerOptions;

    fn compile(source: &str) -> (std::string::String, Vec<CompilerError>) {
        let result = base_compile(source, &CompilerOptions::default(), get_base_transform_preset(false));
        (result.code.to_string(), result.errors)
    }

    #[test]
    fn test_if_else_chain() {
        let (code, errors) = compile(r#"<div v-if="a"/><p v-else-if="b"/><span v-else/>"#);
        assert!(errors.is_empty());
        assert!(code.contains("? (_openBlock(), _createElementBlock(\"div\", { key: 0 }))"));
        assert!(code.contains("? (_openBlock(), _createElementBlock(\"p\", { key: 1 }))"));
        assert!(code.contains(": (_openBlock(), _createElementBlock(\"span\", { key: 2 }))"));
    }

    #[test]
    fn test_if_without_else_renders_comment() {
        let (code, _) = compile(r#"<div v-if="ok"/>"#);
        assert!(code.contains(": _createCommentVNode(\"v-if\", true)"));
    }

    #[test]
    fn test_template_if_uses_fragment() {
        let (code, _) = compile(r#"<template v-if="ok"><a/><b/></template>"#);
        assert!(code.contains("_createElementBlock(_Fragment, { key: 0 }"));
    }

    #[test]
    fn test_else_without_if() {
        let (_, errors) = compile(r#"<div/><p v-else/>"#);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::VElseNoAdjacentIf.code());
    }

    #[test]
    fn test_missing_expression() {
        let (_, errors) = compile(r#"<div v-if=""/>"#);
        assert_eq!(errors[0].code, ErrorCode::VIfNoExpression.code());
    }

    #[test]
    fn test_same_key() {
        let (_, errors) = compile(r#"<div v-if="a" key="x"/><div v-else key="x"/>"#);
        assert_eq!(errors[0].code, ErrorCode::VIfSameKey.code());
    }

    #[test]
    fn test_whitespace_between_branches_is_dropped() {
        let (_, errors) = compile("<div v-if=\"a\"/>\n  <div v-else/>");
        assert!(errors.is_empty());
    }
}
