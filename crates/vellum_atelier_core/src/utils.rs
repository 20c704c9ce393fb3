//! Small AST helpers shared by the transforms.

use vellum_carton::{PatchFlags, String};
use vellum_relief::ast::{
    Callee, CompoundChild, DirectiveKind, DirectiveNode, ElementType, ExpressionNode, JsNode, NodeId, NodeKind,
    NodeType, ObjectExpression, PropNode, Property, RuntimeHelper, TemplateAst, VNodeCall,
    VNodeChildren, VNodeTag,
};

use crate::transform::TransformContext;

/// Remove and return the first directive of `kind` on an element.
pub fn take_dir(ast: &mut TemplateAst, node: NodeId, kind: &DirectiveKind) -> Option<DirectiveNode> {
    let el = ast.element_mut(node)?;
    let index = el
        .props
        .iter()
        .position(|p| matches!(p, PropNode::Directive(d) if &d.kind == kind))?;
    match el.props.remove(index) {
        PropNode::Directive(dir) => Some(dir),
        PropNode::Attribute(_) => None,
    }
}

pub fn is_slot_outlet(ast: &TemplateAst, node: NodeId) -> bool {
    ast.element(node)
        .is_some_and(|el| el.tag_type == ElementType::Slot)
}

pub fn is_template_node(ast: &TemplateAst, node: NodeId) -> bool {
    ast.element(node)
        .is_some_and(|el| el.tag_type == ElementType::Template)
}

/// `<template v-slot>`: structural directives on it are handled by slot building.
pub fn is_slot_template(ast: &TemplateAst, node: NodeId) -> bool {
    ast.element(node).is_some_and(|el| {
        el.tag_type == ElementType::Template && el.find_dir(&DirectiveKind::Slot).is_some()
    })
}

/// Mutable access to whatever codegen slot a node carries.
pub fn codegen_slot(ast: &mut TemplateAst, node: NodeId) -> Option<&mut Option<JsNode>> {
    match &mut ast.node_mut(node).kind {
        NodeKind::Element(n) => Some(&mut n.codegen_node),
        NodeKind::If(n) => Some(&mut n.codegen_node),
        NodeKind::For(n) => Some(&mut n.codegen_node),
        NodeKind::TextCall(n) => Some(&mut n.codegen_node),
        NodeKind::Root(n) => Some(&mut n.codegen_node),
        _ => None,
    }
}

/// The vnode call inside a codegen node, looking through `withMemo`.
pub fn memoed_vnode_mut(codegen: &mut JsNode) -> Option<&mut VNodeCall> {
    match codegen {
        JsNode::VNode(vnode) => Some(vnode),
        JsNode::Call(call) if call.callee == Callee::Symbol(RuntimeHelper::WithMemo) => {
            match call.arguments.get_mut(1) {
                Some(JsNode::Function(f)) => match f.returns.as_mut() {
                    JsNode::VNode(vnode) => Some(vnode),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

/// `(openBlock(), createElementBlock(Fragment, props, children, flag))`
pub fn fragment_block(
    ctx: &mut TransformContext,
    props: Option<JsNode>,
    children: VNodeChildren,
    patch_flag: PatchFlags,
) -> VNodeCall {
    let fragment = ctx.helper(RuntimeHelper::Fragment);
    ctx.helper(RuntimeHelper::OpenBlock);
    ctx.helper(RuntimeHelper::CreateElementBlock);
    let mut vnode = VNodeCall::new(VNodeTag::Symbol(fragment));
    vnode.props = props;
    vnode.children = Some(children);
    vnode.patch_flag = patch_flag;
    vnode.is_block = true;
    vnode
}

/// Code for an expression used inline inside generated code.
pub fn inline_expression(exp: &ExpressionNode) -> String {
    match exp {
        ExpressionNode::Simple(s) if s.is_static => vellum_carton::to_json_string(&s.content),
        ExpressionNode::Simple(s) => s.content.clone(),
        ExpressionNode::Compound(c) => {
            let mut out = String::default();
            for child in &c.children {
                match child {
                    CompoundChild::Simple(s) if s.is_static => {
                        out.push_str(&vellum_carton::to_json_string(&s.content))
                    }
                    CompoundChild::Simple(s) => out.push_str(&s.content),
                    CompoundChild::Compound(inner) => {
                        out.push_str(&inline_expression(&ExpressionNode::Compound(inner.clone())))
                    }
                    CompoundChild::Interpolation(exp) => {
                        out.push_str("_toDisplayString(");
                        out.push_str(&inline_expression(exp));
                        out.push(')');
                    }
                    CompoundChild::Text(text) => out.push_str(&vellum_carton::to_json_string(text)),
                    CompoundChild::Code(code) => out.push_str(code),
                    CompoundChild::Symbol(helper) => {
                        out.push('_');
                        out.push_str(helper.name());
                    }
                }
            }
            out
        }
    }
}

/// Add `prop` to the props of a vnode call or a `renderSlot` call.
pub fn inject_prop(ctx: &mut TransformContext, target: &mut JsNode, prop: Property) {
    match target {
        JsNode::VNode(vnode) => inject_into_props(ctx, &mut vnode.props, prop),
        JsNode::Call(call) if call.callee == Callee::Symbol(RuntimeHelper::RenderSlot) => {
            if call.arguments.len() < 3 {
                call.arguments
                    .push(JsNode::Object(ObjectExpression::default()));
            }
            let mut props = Some(std::mem::replace(
                &mut call.arguments[2],
                JsNode::Object(ObjectExpression::default()),
            ));
            inject_into_props(ctx, &mut props, prop);
            if let Some(props) = props {
                call.arguments[2] = props;
            }
        }
        _ => {}
    }
}

/// Add `prop` to the props of a vnode call.
pub fn inject_vnode_prop(ctx: &mut TransformContext, vnode: &mut VNodeCall, prop: Property) {
    inject_into_props(ctx, &mut vnode.props, prop);
}

fn inject_into_props(ctx: &mut TransformContext, props: &mut Option<JsNode>, prop: Property) {
    let key = prop.key_static_content().map(String::from);
    match props.take() {
        None => {
            *props = Some(JsNode::Object(ObjectExpression {
                properties: vec![prop],
            }));
        }
        Some(JsNode::Object(mut obj)) => {
            let exists = key.as_deref().is_some_and(|key| {
                obj.properties
                    .iter()
                    .any(|p| p.key_static_content() == Some(key))
            });
            if !exists {
                obj.properties.insert(0, prop);
            }
            *props = Some(JsNode::Object(obj));
        }
        Some(JsNode::Call(mut call)) if call.callee == Callee::Symbol(RuntimeHelper::MergeProps) => {
            call.arguments.insert(
                0,
                JsNode::Object(ObjectExpression {
                    properties: vec![prop],
                }),
            );
            *props = Some(JsNode::Call(call));
        }
        Some(other) => {
            let merge = ctx.helper(RuntimeHelper::MergeProps);
            *props = Some(JsNode::call(
                merge,
                vec![
                    JsNode::Object(ObjectExpression {
                        properties: vec![prop],
                    }),
                    other,
                ],
            ));
        }
    }
}

/// Whether a node renders something other than whitespace or a comment.
pub fn is_non_whitespace_content(ast: &TemplateAst, node: NodeId) -> bool {
    match &ast.node(node).kind {
        NodeKind::Comment(_) => false,
        NodeKind::Text(t) => !t.content.trim().is_empty(),
        NodeKind::TextCall(t) => is_non_whitespace_content(ast, t.content),
        _ => true,
    }
}

/// Whether `children` contain a `<slot>` outlet at any depth.
pub fn has_forwarded_slots(ast: &TemplateAst, children: &[NodeId]) -> bool {
    children.iter().any(|&child| match &ast.node(child).kind {
        NodeKind::Element(el) => {
            el.tag_type == ElementType::Slot || has_forwarded_slots(ast, &el.children)
        }
        NodeKind::If(n) => n
            .branches
            .iter()
            .any(|&b| has_forwarded_slots(ast, ast.children(b))),
        NodeKind::For(n) => has_forwarded_slots(ast, &n.children),
        _ => false,
    })
}

/// Whether `node` is a text-like child (text or interpolation).
pub fn is_text(ast: &TemplateAst, node: NodeId) -> bool {
    matches!(ast.node_type(node), NodeType::Text | NodeType::Interpolation)
}

/// Props that never make an element dynamic.
pub fn is_reserved_prop(name: &str) -> bool {
    matches!(
        name,
        "" | "key"
            | "ref"
            | "ref_for"
            | "ref_key"
            | "onVnodeBeforeMount"
            | "onVnodeMounted"
            | "onVnodeBeforeUpdate"
            | "onVnodeUpdated"
            | "onVnodeBeforeUnmount"
            | "onVnodeUnmounted"
    )
}

/// `onClick`, `onUpdate:x`; not `once`.
pub fn is_on(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > 2 && bytes.starts_with(b"on") && !bytes[2].is_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_on() {
        assert!(is_on("onClick"));
        assert!(is_on("onUpdate:modelValue"));
        assert!(!is_on("once"));
        assert!(!is_on("on"));
    }

    #[test]
    fn test_take_dir() {
        let (mut ast, _) = vellum_armature::parse(r#"<div v-if="ok" id="a"></div>"#);
        let div = ast.children(NodeId::ROOT)[0];
        let dir = take_dir(&mut ast, div, &DirectiveKind::If);
        assert!(dir.is_some());
        assert_eq!(ast.element(div).map(|el| el.props.len()), Some(1));
        assert!(take_dir(&mut ast, div, &DirectiveKind::If).is_none());
    }

    #[test]
    fn test_forwarded_slots() {
        let (ast, _) = vellum_armature::parse("<div><span><slot/></span></div><p/>");
        let children = ast.children(NodeId::ROOT).to_vec();
        assert!(has_forwarded_slots(&ast, &children[..1]));
        assert!(!has_forwarded_slots(&ast, &children[1..]));
    }
}
