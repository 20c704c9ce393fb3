//! Slot scope tracking and component slot objects.

use rustc_hash::FxHashSet;
use vellum_carton::{SlotFlags, String};
use vellum_relief::ast::{
    CompoundChild, ConditionalExpression, DirectiveKind, DirectiveNode, ElementType,
    ExpressionNode, FunctionExpression, JsNode, NodeId, NodeKind, NodeType, ObjectExpression,
    PropNode, Property, RuntimeHelper, SourceLocation,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{TransformAction, TransformContext};
use crate::transforms::transform_expression::{
    extract_param_identifiers, has_scope_ref, process_expression,
};
use crate::transforms::v_for::{for_loop_params, parse_for_expression};
use crate::utils::{has_forwarded_slots, is_non_whitespace_content, is_template_node};

/// Put slot props in scope while the slot content is transformed.
pub fn track_slot_scopes(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let Some(el) = ctx.ast.element(node) else {
        return TransformAction::Continue;
    };
    if !matches!(el.tag_type, ElementType::Component | ElementType::Template) {
        return TransformAction::Continue;
    }
    let Some(dir) = el.find_dir(&DirectiveKind::Slot) else {
        return TransformAction::Continue;
    };

    let identifiers: Vec<String> = match &dir.exp {
        Some(ExpressionNode::Simple(exp)) if ctx.prefix_identifiers => exp.identifiers.clone(),
        _ => Vec::new(),
    };
    for id in &identifiers {
        ctx.add_identifier(id);
    }
    ctx.scopes.v_slot += 1;
    TransformAction::Exit(Box::new(move |ctx: &mut TransformContext| {
        for id in &identifiers {
            ctx.remove_identifier(id);
        }
        ctx.scopes.v_slot -= 1;
    }))
}

/// `<template v-for v-slot>`: the loop aliases are in scope for the slot content.
pub fn track_v_for_slot_scopes(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let Some(el) = ctx.ast.element(node) else {
        return TransformAction::Continue;
    };
    if el.tag_type != ElementType::Template || el.find_dir(&DirectiveKind::Slot).is_none() {
        return TransformAction::Continue;
    }
    let Some(ExpressionNode::Simple(exp)) = el.find_dir(&DirectiveKind::For).and_then(|d| d.exp.as_ref())
    else {
        return TransformAction::Continue;
    };
    let Some(parsed) = parse_for_expression(exp) else {
        return TransformAction::Continue;
    };

    let identifiers: Vec<String> = [&parsed.value, &parsed.key, &parsed.index]
        .into_iter()
        .flatten()
        .flat_map(|alias| extract_param_identifiers(&alias.content))
        .collect();
    for id in &identifiers {
        ctx.add_identifier(id);
    }
    TransformAction::Exit(Box::new(move |ctx: &mut TransformContext| {
        for id in &identifiers {
            ctx.remove_identifier(id);
        }
    }))
}

/// Whether any expression under `node` references an identifier in scope.
pub fn node_has_scope_ref(ctx: &TransformContext, node: NodeId) -> bool {
    match &ctx.ast.node(node).kind {
        NodeKind::Element(el) => {
            el.props.iter().any(|p| match p {
                PropNode::Directive(dir) => {
                    dir.exp.as_ref().is_some_and(|e| has_scope_ref(ctx, e))
                        || dir.arg.as_ref().is_some_and(|a| has_scope_ref(ctx, a))
                }
                PropNode::Attribute(_) => false,
            }) || el.children.iter().any(|&c| node_has_scope_ref(ctx, c))
        }
        NodeKind::For(f) => {
            has_scope_ref(ctx, &f.source) || f.children.iter().any(|&c| node_has_scope_ref(ctx, c))
        }
        NodeKind::If(n) => n.branches.iter().any(|&b| node_has_scope_ref(ctx, b)),
        NodeKind::IfBranch(b) => {
            b.condition.as_ref().is_some_and(|c| has_scope_ref(ctx, c))
                || b.children.iter().any(|&c| node_has_scope_ref(ctx, c))
        }
        NodeKind::Interpolation(i) => has_scope_ref(ctx, &i.content),
        NodeKind::TextCall(t) => node_has_scope_ref(ctx, t.content),
        NodeKind::CompoundExpression(c) => c.children.iter().any(|child| match child {
            CompoundChild::Simple(s) => has_scope_ref(ctx, &ExpressionNode::Simple(s.clone())),
            CompoundChild::Interpolation(e) => has_scope_ref(ctx, e),
            CompoundChild::Compound(c) => has_scope_ref(ctx, &ExpressionNode::Compound(c.clone())),
            _ => false,
        }),
        NodeKind::Root(_) | NodeKind::Text(_) | NodeKind::Comment(_) => false,
    }
}

/// `_withCtx((props) => [children])`
fn build_slot_fn(ctx: &mut TransformContext, props: Option<&ExpressionNode>, children: &[NodeId]) -> JsNode {
    let with_ctx = ctx.helper(RuntimeHelper::WithCtx);
    let params = props
        .map(|p| vec![p.source_text()])
        .unwrap_or_default();
    JsNode::call(
        with_ctx,
        vec![JsNode::Function(FunctionExpression {
            params,
            returns: Box::new(JsNode::Array(children.iter().map(|&c| JsNode::Node(c)).collect())),
            newline: false,
        })],
    )
}

/// `{ name, fn, key? }` entry of `createSlots`.
fn build_dynamic_slot(name: ExpressionNode, slot_fn: JsNode, index: Option<usize>) -> JsNode {
    let mut properties = vec![
        Property::static_key("name", JsNode::from(name)),
        Property::static_key("fn", slot_fn),
    ];
    if let Some(index) = index {
        properties.push(Property::static_key(
            "key",
            JsNode::simple(index.to_string(), true),
        ));
    }
    JsNode::Object(ObjectExpression { properties })
}

fn default_fallback() -> JsNode {
    JsNode::simple("undefined", false)
}

fn conditional_slot(test: &ExpressionNode, consequent: JsNode) -> JsNode {
    JsNode::Conditional(ConditionalExpression {
        test: Box::new(JsNode::from(test.clone())),
        consequent: Box::new(consequent),
        alternate: Box::new(default_fallback()),
        newline: true,
    })
}

fn slot_dir(ctx: &TransformContext, node: NodeId, kind: &DirectiveKind) -> Option<DirectiveNode> {
    ctx.ast.element(node)?.find_dir(kind).cloned()
}

/// Build the slots object of a component. Returns the expression and whether
/// the slots must be treated as dynamic.
pub fn build_slots(ctx: &mut TransformContext, node: NodeId) -> (JsNode, bool) {
    ctx.helper(RuntimeHelper::WithCtx);
    let loc = ctx.ast.node(node).loc.clone();

    let mut has_dynamic_slots = ctx.scopes.v_slot > 0 || ctx.scopes.v_for > 0;
    if !ctx.options.ssr && ctx.prefix_identifiers {
        has_dynamic_slots = node_has_scope_ref(ctx, node);
    }

    let mut properties: Vec<Property> = Vec::new();
    let mut dynamic_slots: Vec<JsNode> = Vec::new();

    let on_component_slot = slot_dir(ctx, node, &DirectiveKind::Slot);
    let children = ctx.ast.children(node).to_vec();
    if let Some(dir) = &on_component_slot {
        if dir.arg.as_ref().is_some_and(|a| !a.is_static()) {
            has_dynamic_slots = true;
        }
        let key = dir
            .arg
            .clone()
            .unwrap_or_else(|| ExpressionNode::simple("default", true, SourceLocation::STUB));
        let slot_fn = build_slot_fn(ctx, dir.exp.as_ref(), &children);
        properties.push(Property::new(key, slot_fn));
    }

    let mut has_template_slots = false;
    let mut has_named_default_slot = false;
    let mut implicit_default_children: Vec<NodeId> = Vec::new();
    let mut seen_slot_names: FxHashSet<String> = FxHashSet::default();
    let mut conditional_branch_index = 0usize;
    let mut removed: Vec<NodeId> = Vec::new();

    for (i, &child) in children.iter().enumerate() {
        let slot = if is_template_node(&ctx.ast, child) {
            slot_dir(ctx, child, &DirectiveKind::Slot)
        } else {
            None
        };
        let Some(slot) = slot else {
            if ctx.ast.node_type(child) != NodeType::Comment {
                implicit_default_children.push(child);
            }
            continue;
        };

        if on_component_slot.is_some() {
            ctx.on_error(CompilerError::new(
                ErrorCode::VSlotMixedSlotUsage,
                Some(slot.loc.clone()),
            ));
            break;
        }
        has_template_slots = true;

        let slot_name = slot
            .arg
            .clone()
            .unwrap_or_else(|| ExpressionNode::simple("default", true, SourceLocation::STUB));
        let static_slot_name = slot_name.static_content().map(String::from);
        if static_slot_name.is_none() {
            has_dynamic_slots = true;
        }

        let slot_children = ctx.ast.children(child).to_vec();
        let slot_fn = build_slot_fn(ctx, slot.exp.as_ref(), &slot_children);
        let v_for = slot_dir(ctx, child, &DirectiveKind::For);
        let v_if = slot_dir(ctx, child, &DirectiveKind::If);
        let v_else = slot_dir(ctx, child, &DirectiveKind::ElseIf)
            .or_else(|| slot_dir(ctx, child, &DirectiveKind::Else));

        if let Some(v_if) = v_if {
            has_dynamic_slots = true;
            let test = v_if
                .exp
                .unwrap_or_else(|| ExpressionNode::simple("true", false, SourceLocation::STUB));
            let entry = build_dynamic_slot(slot_name, slot_fn, Some(conditional_branch_index));
            conditional_branch_index += 1;
            dynamic_slots.push(conditional_slot(&test, entry));
        } else if let Some(v_else) = v_else {
            let prev = children[..i]
                .iter()
                .rev()
                .find(|&&c| ctx.ast.node_type(c) != NodeType::Comment && !removed.contains(&c))
                .copied();
            let follows_if = prev.is_some_and(|p| {
                is_template_node(&ctx.ast, p)
                    && slot_dir(ctx, p, &DirectiveKind::If).is_some()
            });
            match dynamic_slots.last_mut().filter(|_| follows_if) {
                Some(last) => {
                    removed.push(child);
                    let entry =
                        build_dynamic_slot(slot_name, slot_fn, Some(conditional_branch_index));
                    conditional_branch_index += 1;
                    let alternate = match &v_else.exp {
                        Some(test) if v_else.kind == DirectiveKind::ElseIf => {
                            conditional_slot(test, entry)
                        }
                        _ => entry,
                    };
                    set_slot_alternate(last, alternate);
                }
                None => ctx.on_error(CompilerError::new(
                    ErrorCode::VElseNoAdjacentIf,
                    Some(v_else.loc.clone()),
                )),
            }
        } else if let Some(v_for) = v_for {
            has_dynamic_slots = true;
            let parsed = match &v_for.exp {
                Some(ExpressionNode::Simple(exp)) => parse_for_expression(exp),
                _ => None,
            };
            match parsed {
                Some(mut parsed) => {
                    parsed.source = process_expression(ctx, &parsed.source, false);
                    let render_list = ctx.helper(RuntimeHelper::RenderList);
                    dynamic_slots.push(JsNode::call(
                        render_list,
                        vec![
                            JsNode::Simple(parsed.source.clone()),
                            JsNode::Function(FunctionExpression {
                                params: for_loop_params(&parsed),
                                returns: Box::new(build_dynamic_slot(slot_name, slot_fn, None)),
                                newline: true,
                            }),
                        ],
                    ));
                }
                None => ctx.on_error(CompilerError::new(
                    ErrorCode::VForMalformedExpression,
                    Some(v_for.loc.clone()),
                )),
            }
        } else {
            if let Some(name) = static_slot_name {
                if !seen_slot_names.insert(name.clone()) {
                    let loc = slot.arg.as_ref().map(|a| a.loc().clone()).unwrap_or(slot.loc);
                    ctx.on_error(CompilerError::new(
                        ErrorCode::VSlotDuplicateSlotNames,
                        Some(loc),
                    ));
                    continue;
                }
                if name == "default" {
                    has_named_default_slot = true;
                }
            }
            properties.push(Property::new(slot_name, slot_fn));
        }
    }

    if !removed.is_empty() {
        if let Some(el) = ctx.ast.element_mut(node) {
            el.children.retain(|c| !removed.contains(c));
        }
    }

    if on_component_slot.is_none() {
        if !has_template_slots {
            let slot_fn = build_slot_fn(ctx, None, &children);
            properties.push(Property::static_key("default", slot_fn));
        } else if implicit_default_children
            .iter()
            .any(|&c| is_non_whitespace_content(&ctx.ast, c))
        {
            if has_named_default_slot {
                let loc = ctx.ast.node(implicit_default_children[0]).loc.clone();
                ctx.on_error(CompilerError::new(
                    ErrorCode::VSlotExtraneousDefaultSlotChildren,
                    Some(loc),
                ));
            } else {
                let slot_fn = build_slot_fn(ctx, None, &implicit_default_children);
                properties.push(Property::static_key("default", slot_fn));
            }
        }
    }

    let slot_flag = if has_dynamic_slots {
        SlotFlags::Dynamic
    } else if has_forwarded_slots(&ctx.ast, ctx.ast.children(node)) {
        SlotFlags::Forwarded
    } else {
        SlotFlags::Stable
    };
    properties.push(Property::static_key(
        "_",
        JsNode::simple(slot_flag.annotated(), false),
    ));

    let mut slots = JsNode::Object(ObjectExpression { properties });
    if !dynamic_slots.is_empty() {
        let create_slots = ctx.helper(RuntimeHelper::CreateSlots);
        slots = JsNode::call(create_slots, vec![slots, JsNode::Array(dynamic_slots)]);
    }
    tracing::trace!(?loc, has_dynamic_slots, "built component slots");
    (slots, has_dynamic_slots)
}

fn set_slot_alternate(conditional: &mut JsNode, alternate: JsNode) {
    if let JsNode::Conditional(c) = conditional {
        if matches!(c.alternate.as_ref(), JsNode::Conditional(_)) {
            set_slot_alternate(c.alternate.as_mut(), alternate);
        } else {
            c.alternate = Box::new(alternate);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::compile::{base_compile, get_base_transform_preset};
    use crate::options::CompilerOptions;
    use vellum_relief::errors::ErrorCode;

    fn compile(source: &str) -> crate::compile::CompileResult {
        let options = CompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        base_compile(source, &options, get_base_transform_preset(true))
    }

    #[test]
    fn test_implicit_default_slot() {
        let code = compile("<Comp><div/></Comp>").code;
        assert!(code.contains("default: _withCtx(() => ["));
        assert!(code.contains("_: 1 /* STABLE */"));
    }

    #[test]
    fn test_named_slots_with_props() {
        let code = compile(
            r#"<Comp><template #one="{ foo }">{{ foo }}{{ bar }}</template><template #two>x</template></Comp>"#,
        )
        .code;
        assert!(code.contains("one: _withCtx(({ foo }) => ["));
        assert!(code.contains("_toDisplayString(foo) + _toDisplayString(_ctx.bar)"));
        assert!(code.contains("two: _withCtx(() => ["));
    }

    #[test]
    fn test_conditional_slots() {
        let code = compile(
            r#"<Comp><template v-if="ok" #one>a</template><template v-else #two>b</template></Comp>"#,
        )
        .code;
        assert!(code.contains("_createSlots({ _: 2 /* DYNAMIC */ }, ["));
        assert!(code.contains("_ctx.ok"));
        assert!(code.contains("key: \"0\""));
        assert!(code.contains("key: \"1\""));
        assert!(code.contains("1024 /* DYNAMIC_SLOTS */"));
    }

    #[test]
    fn test_else_if_chain_slots() {
        let code = compile(
            r#"<Comp><template v-if="a" #one>a</template><template v-else-if="b" #two>b</template><template v-else #three>c</template></Comp>"#,
        )
        .code;
        assert!(code.contains("_ctx.a"));
        assert!(code.contains("_ctx.b"));
        assert!(code.contains("key: \"0\""));
        assert!(code.contains("key: \"1\""));
        assert!(code.contains("key: \"2\""));
        assert!(code.contains("name: \"three\""));
    }

    #[test]
    fn test_v_for_slots() {
        let code = compile(
            r#"<Comp><template v-for="name in list" #[name]>{{ name }}</template></Comp>"#,
        )
        .code;
        assert!(code.contains("_renderList(_ctx.list, (name) => {"));
        assert!(code.contains("name: name,"));
    }

    #[test]
    fn test_slot_errors() {
        let mixed = compile(r#"<Comp v-slot="p"><template #a/></Comp>"#);
        assert!(mixed.errors.iter().any(|e| e.code == ErrorCode::VSlotMixedSlotUsage.code()));

        let dup = compile(r#"<Comp><template #a/><template #a/></Comp>"#);
        assert!(dup.errors.iter().any(|e| e.code == ErrorCode::VSlotDuplicateSlotNames.code()));

        let extraneous = compile(r#"<Comp><template #default/>text</Comp>"#);
        assert!(extraneous
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::VSlotExtraneousDefaultSlotChildren.code()));
    }

    #[test]
    fn test_nested_scope_ref_makes_slots_dynamic() {
        let code = compile(r#"<div v-for="i in list"><Comp>{{ i }}</Comp></div>"#).code;
        assert!(code.contains("_: 2 /* DYNAMIC */"));
    }
}
