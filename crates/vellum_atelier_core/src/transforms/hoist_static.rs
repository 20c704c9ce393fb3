//! Static hoisting.
//!
//! Runs once after the main traversal. Fully static element subtrees, static
//! text calls and static prop objects are moved into module-level `_hoisted_N`
//! constants so they are created once instead of on every render.

use vellum_carton::PatchFlags;
use vellum_relief::ast::{
    Callee, CompoundChild, ConstantType, DirectiveKind, ElementType, ExpressionNode, JsNode,
    NodeId, NodeKind, PropNode, RuntimeHelper, VNodeChildren,
};

use crate::transform::{block_helper, vnode_helper, TransformContext};
use crate::utils::is_slot_outlet;

/// Hoist everything hoistable under the root.
pub fn hoist_static(ctx: &mut TransformContext) {
    let root_children = ctx.ast.children(NodeId::ROOT).to_vec();
    let single_element_root = matches!(root_children.as_slice(), [only]
        if ctx.ast.element(*only).is_some() && !is_slot_outlet(&ctx.ast, *only));
    walk(ctx, NodeId::ROOT, single_element_root);
}

fn walk(ctx: &mut TransformContext, node: NodeId, do_not_hoist_node: bool) {
    let children = ctx.ast.children(node).to_vec();
    let original_count = children.len();
    let mut hoisted_count = 0;

    for &child in &children {
        match &ctx.ast.node(child).kind {
            NodeKind::Element(el) if el.tag_type == ElementType::Element => {
                let constant_type = if do_not_hoist_node {
                    ConstantType::NotConstant
                } else {
                    get_constant_type(ctx, child)
                };
                if constant_type > ConstantType::NotConstant {
                    if constant_type >= ConstantType::CanHoist {
                        hoist_element(ctx, child);
                        hoisted_count += 1;
                        continue;
                    }
                } else {
                    hoist_props(ctx, child);
                }
            }
            NodeKind::TextCall(text) => {
                let content = text.content;
                if get_constant_type(ctx, content) >= ConstantType::CanHoist {
                    let codegen = match &mut ctx.ast.node_mut(child).kind {
                        NodeKind::TextCall(text) => text.codegen_node.take(),
                        _ => None,
                    };
                    if let Some(codegen) = codegen {
                        let hoisted = ctx.hoist(codegen);
                        if let NodeKind::TextCall(text) = &mut ctx.ast.node_mut(child).kind {
                            text.codegen_node = Some(hoisted);
                        }
                    }
                    hoisted_count += 1;
                }
            }
            _ => {}
        }

        match &ctx.ast.node(child).kind {
            NodeKind::Element(el) => {
                let is_component = el.tag_type == ElementType::Component;
                if is_component {
                    ctx.scopes.v_slot += 1;
                }
                walk(ctx, child, false);
                if is_component {
                    ctx.scopes.v_slot -= 1;
                }
            }
            NodeKind::For(f) => {
                let single = f.children.len() == 1;
                walk(ctx, child, single);
            }
            NodeKind::If(n) => {
                for branch in n.branches.clone() {
                    let single = ctx.ast.children(branch).len() == 1;
                    walk(ctx, branch, single);
                }
            }
            _ => {}
        }
    }

    // Every child hoisted: the children array itself is static.
    if hoisted_count > 0 && hoisted_count == original_count {
        let is_plain = ctx
            .ast
            .element(node)
            .is_some_and(|el| el.tag_type == ElementType::Element);
        if !is_plain {
            return;
        }
        let children = match ctx.ast.element_mut(node).and_then(|el| el.codegen_node.as_mut()) {
            Some(JsNode::VNode(vnode)) => match vnode.children.take() {
                Some(VNodeChildren::Nodes(nodes)) => Some(nodes),
                other => {
                    vnode.children = other;
                    None
                }
            },
            _ => None,
        };
        if let Some(nodes) = children {
            let array = JsNode::Array(nodes.into_iter().map(JsNode::Node).collect());
            let hoisted = ctx.hoist(array);
            if let Some(JsNode::VNode(vnode)) =
                ctx.ast.element_mut(node).and_then(|el| el.codegen_node.as_mut())
            {
                vnode.children = Some(VNodeChildren::Expr(Box::new(hoisted)));
            }
        }
    }
}

fn hoist_element(ctx: &mut TransformContext, node: NodeId) {
    let Some(el) = ctx.ast.element_mut(node) else { return };
    if let Some(codegen) = el.codegen_node.take() {
        let hoisted = ctx.hoist(codegen);
        if let Some(el) = ctx.ast.element_mut(node) {
            el.codegen_node = Some(hoisted);
        }
    }
}

/// Dynamic element whose props object is still static.
fn hoist_props(ctx: &mut TransformContext, node: NodeId) {
    let flag = match ctx.ast.element(node).and_then(|el| el.codegen_node.as_ref()) {
        Some(JsNode::VNode(vnode)) => vnode.patch_flag,
        _ => return,
    };
    let eligible = flag.is_empty() || flag == PatchFlags::NEED_PATCH || flag == PatchFlags::TEXT;
    if !eligible || generated_props_constant_type(ctx, node) < ConstantType::CanHoist {
        return;
    }
    let props = match ctx.ast.element_mut(node).and_then(|el| el.codegen_node.as_mut()) {
        Some(JsNode::VNode(vnode)) => vnode.props.take(),
        _ => None,
    };
    if let Some(props) = props {
        let hoisted = ctx.hoist(props);
        if let Some(JsNode::VNode(vnode)) =
            ctx.ast.element_mut(node).and_then(|el| el.codegen_node.as_mut())
        {
            vnode.props = Some(hoisted);
        }
    }
}

/// How static a template node is.
pub fn get_constant_type(ctx: &mut TransformContext, node: NodeId) -> ConstantType {
    match &ctx.ast.node(node).kind {
        NodeKind::Element(el) => {
            if el.tag_type != ElementType::Element {
                return ConstantType::NotConstant;
            }
            if let Some(cached) = ctx.constant_cache.get(&node) {
                return *cached;
            }
            let result = element_constant_type(ctx, node);
            ctx.constant_cache.insert(node, result);
            result
        }
        NodeKind::Text(_) | NodeKind::Comment(_) => ConstantType::CanStringify,
        NodeKind::If(_) | NodeKind::IfBranch(_) | NodeKind::For(_) | NodeKind::Root(_) => {
            ConstantType::NotConstant
        }
        NodeKind::Interpolation(interp) => expression_constant_type(&interp.content),
        NodeKind::TextCall(text) => {
            let content = text.content;
            get_constant_type(ctx, content)
        }
        NodeKind::CompoundExpression(c) => compound_constant_type(&c.children),
    }
}

fn element_constant_type(ctx: &mut TransformContext, node: NodeId) -> ConstantType {
    let Some(el) = ctx.ast.element(node) else {
        return ConstantType::NotConstant;
    };
    let Some(JsNode::VNode(vnode)) = el.codegen_node.as_ref() else {
        return ConstantType::NotConstant;
    };
    let is_svg_like = el.tag == "svg" || el.tag == "foreignObject";
    if vnode.is_block && !is_svg_like {
        return ConstantType::NotConstant;
    }
    if !vnode.patch_flag.is_empty() {
        return ConstantType::NotConstant;
    }
    let is_block = vnode.is_block;
    let children = el.children.clone();
    let bind_exps: Vec<ConstantType> = el
        .props
        .iter()
        .filter_map(|p| match p {
            PropNode::Directive(d) if d.kind == DirectiveKind::Bind => {
                d.exp.as_ref().map(expression_constant_type)
            }
            _ => None,
        })
        .collect();
    let has_directive = el.props.iter().any(|p| matches!(p, PropNode::Directive(_)));

    let mut return_type = ConstantType::CanStringify;
    let props_type = generated_props_constant_type(ctx, node);
    if props_type == ConstantType::NotConstant {
        return ConstantType::NotConstant;
    }
    return_type = return_type.min(props_type);

    for child in children {
        let child_type = get_constant_type(ctx, child);
        if child_type == ConstantType::NotConstant {
            return ConstantType::NotConstant;
        }
        return_type = return_type.min(child_type);
    }

    if return_type > ConstantType::CanSkipPatch {
        for exp_type in bind_exps {
            if exp_type == ConstantType::NotConstant {
                return ConstantType::NotConstant;
            }
            return_type = return_type.min(exp_type);
        }
    }

    // Static svg needs no block; custom directives still do.
    if is_block {
        if has_directive {
            return ConstantType::NotConstant;
        }
        let is_component = match ctx.ast.element(node).and_then(|el| el.codegen_node.as_ref()) {
            Some(JsNode::VNode(vnode)) => vnode.is_component,
            _ => false,
        };
        ctx.remove_helper(RuntimeHelper::OpenBlock);
        ctx.remove_helper(block_helper(is_component));
        ctx.helper(vnode_helper(is_component));
        if let Some(JsNode::VNode(vnode)) =
            ctx.ast.element_mut(node).and_then(|el| el.codegen_node.as_mut())
        {
            vnode.is_block = false;
        }
    }
    return_type
}

pub fn expression_constant_type(exp: &ExpressionNode) -> ConstantType {
    match exp {
        ExpressionNode::Simple(s) => s.const_type,
        ExpressionNode::Compound(c) => compound_constant_type(&c.children),
    }
}

fn compound_constant_type(children: &[CompoundChild]) -> ConstantType {
    let mut return_type = ConstantType::CanStringify;
    for child in children {
        let child_type = match child {
            CompoundChild::Text(_) | CompoundChild::Code(_) | CompoundChild::Symbol(_) => continue,
            CompoundChild::Simple(s) => s.const_type,
            CompoundChild::Compound(c) => compound_constant_type(&c.children),
            CompoundChild::Interpolation(exp) => expression_constant_type(exp),
        };
        if child_type == ConstantType::NotConstant {
            return ConstantType::NotConstant;
        }
        return_type = return_type.min(child_type);
    }
    return_type
}

/// Constant type of the props object an element's vnode call was given.
fn generated_props_constant_type(ctx: &TransformContext, node: NodeId) -> ConstantType {
    let props = match ctx.ast.element(node).and_then(|el| el.codegen_node.as_ref()) {
        Some(JsNode::VNode(vnode)) => vnode.props.as_ref(),
        _ => None,
    };
    let Some(JsNode::Object(obj)) = props else {
        return ConstantType::CanStringify;
    };
    let mut return_type = ConstantType::CanStringify;
    for prop in &obj.properties {
        let key_type = expression_constant_type(&prop.key);
        if key_type == ConstantType::NotConstant {
            return key_type;
        }
        return_type = return_type.min(key_type);
        let value_type = match &prop.value {
            JsNode::Simple(s) => s.const_type,
            call @ JsNode::Call(_) => helper_call_constant_type(call),
            _ => ConstantType::NotConstant,
        };
        if value_type == ConstantType::NotConstant {
            return value_type;
        }
        return_type = return_type.min(value_type);
    }
    return_type
}

/// `normalizeClass("static")` and friends are as constant as their argument.
fn helper_call_constant_type(value: &JsNode) -> ConstantType {
    let JsNode::Call(call) = value else {
        return ConstantType::NotConstant;
    };
    let allowed = matches!(
        call.callee,
        Callee::Symbol(
            RuntimeHelper::NormalizeClass
                | RuntimeHelper::NormalizeStyle
                | RuntimeHelper::NormalizeProps
                | RuntimeHelper::GuardReactiveProps
        )
    );
    if !allowed {
        return ConstantType::NotConstant;
    }
    match call.arguments.first() {
        Some(JsNode::Simple(s)) => s.const_type,
        Some(inner @ JsNode::Call(_)) => helper_call_constant_type(inner),
        _ => ConstantType::NotConstant,
    }
}

#[cfg(test)]
mod tests {
    use crate::compile::{base_compile, get_base_transform_preset};
    use crate::options::CompilerOptions;

    fn compile(source: &str) -> std::string::String {
        let options = CompilerOptions {
            hoist_static: true,
            prefix_identifiers: true,
            ..Default::default()
        };
        base_compile(source, &options, get_base_transform_preset(true))
            .code
            .to_string()
    }

    #[test]
    fn test_hoists_static_subtree() {
        let code = compile(r#"<div><span class="a">hi</span>{{ msg }}</div>"#);
        assert!(code.contains("const _hoisted_1 = /*#__PURE__*/_createElementVNode(\"span\", { class: \"a\" }, \"hi\", -1 /* HOISTED */)"));
        assert!(code.contains("_hoisted_1,"));
    }

    #[test]
    fn test_single_root_keeps_vnode_but_hoists_props() {
        let code = compile(r#"<div class="a"/>"#);
        assert!(code.contains("const _hoisted_1 = { class: \"a\" }"));
        assert!(code.contains("_createElementBlock(\"div\", _hoisted_1)"));
    }

    #[test]
    fn test_hoists_static_props_of_dynamic_element() {
        let code = compile(r#"<div><p id="x">{{ msg }}</p></div>"#);
        assert!(code.contains("const _hoisted_1 = { id: \"x\" }"));
        assert!(code.contains("_createElementVNode(\"p\", _hoisted_1, _toDisplayString(_ctx.msg), 1 /* TEXT */)"));
    }

    #[test]
    fn test_static_children_array() {
        let code = compile(r#"<div :id="x"><b>1</b><i>2</i></div>"#);
        assert!(code.contains("const _hoisted_3 = [\n  _hoisted_1,\n  _hoisted_2\n]"));
    }

    #[test]
    fn test_scope_dependent_not_hoisted() {
        let code = compile(r#"<div v-for="i in list"><span>{{ i }}</span></div>"#);
        assert!(!code.contains("_hoisted_"));
    }
}
