//! `v-for`.

use vellum_carton::{PatchFlags, String};
use vellum_relief::ast::{
    ConstantType, DirectiveKind, ExpressionNode, ForNode, FunctionExpression, JsNode, NodeId,
    NodeKind, NodeType, ObjectExpression, Position, PropNode, Property, RuntimeHelper,
    SimpleExpressionNode, SourceLocation, VNodeCall, VNodeChildren, VNodeTag,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{block_helper, vnode_helper, TransformAction, TransformContext};
use crate::transforms::transform_expression::process_expression;
use crate::utils::{
    codegen_slot, fragment_block, inject_prop, is_slot_outlet, is_slot_template, is_template_node,
    take_dir,
};

/// Parsed `alias in source` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ForParseResult {
    pub source: SimpleExpressionNode,
    pub value: Option<SimpleExpressionNode>,
    pub key: Option<SimpleExpressionNode>,
    pub index: Option<SimpleExpressionNode>,
}

/// Advance a position over `text`.
fn advance(mut pos: Position, text: &str) -> Position {
    for c in text.chars() {
        pos.offset += c.len_utf8() as u32;
        if c == '\n' {
            pos.line += 1;
            pos.column = 1;
        } else {
            pos.column += 1;
        }
    }
    pos
}

fn sub_expression(base: &SimpleExpressionNode, start: usize, text: &str) -> SimpleExpressionNode {
    let loc_start = advance(base.loc.start, &base.content[..start]);
    let loc_end = advance(loc_start, text);
    SimpleExpressionNode::new(text, false, SourceLocation::new(loc_start, loc_end, text))
}

/// Byte offset of the ` in ` / ` of ` separator: (alias end, source start).
fn find_alias_separator(content: &str) -> Option<(usize, usize)> {
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            let ws_start = i;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let rest = &content[i..];
            if (rest.starts_with("in") || rest.starts_with("of"))
                && rest[2..].starts_with(|c: char| c.is_ascii_whitespace())
            {
                let mut source_start = i + 2;
                while source_start < bytes.len() && bytes[source_start].is_ascii_whitespace() {
                    source_start += 1;
                }
                return Some((ws_start, source_start));
            }
            continue;
        }
        i += 1;
    }
    None
}

/// Parse `(item, key, index) in source`.
pub fn parse_for_expression(exp: &SimpleExpressionNode) -> Option<ForParseResult> {
    let content = exp.content.as_str();
    let (alias_end, source_start) = find_alias_separator(content)?;
    let source_text = content[source_start..].trim_end();
    if source_text.is_empty() {
        return None;
    }
    let source = sub_expression(exp, source_start, source_text);

    // strip surrounding parens from the alias list
    let lhs = &content[..alias_end];
    let lead_ws = lhs.len() - lhs.trim_start().len();
    let mut start = lead_ws;
    let mut end = lhs.trim_end().len();
    if content[start..end].starts_with('(') {
        start += 1;
    }
    if end > start && content[start..end].ends_with(')') {
        end -= 1;
    }
    let aliases = &content[start..end];

    let trimmed_part = |from: usize, to: usize| -> Option<SimpleExpressionNode> {
        let part = &aliases[from..to];
        let text = part.trim();
        if text.is_empty() {
            return None;
        }
        let offset = start + from + (part.len() - part.trim_start().len());
        Some(sub_expression(exp, offset, text))
    };

    let is_clean = |s: &str| !s.contains(['}', ']']);
    let last_comma = aliases.rfind(',');
    let (value_end, key, index) = match last_comma {
        Some(c2) if is_clean(&aliases[c2 + 1..]) => {
            match aliases[..c2].rfind(',') {
                Some(c1) if is_clean(&aliases[c1 + 1..c2]) => (
                    c1,
                    trimmed_part(c1 + 1, c2),
                    trimmed_part(c2 + 1, aliases.len()),
                ),
                _ => (c2, trimmed_part(c2 + 1, aliases.len()), None),
            }
        }
        _ => (aliases.len(), None, None),
    };
    let value = trimmed_part(0, value_end);

    Some(ForParseResult {
        source,
        value,
        key,
        index,
    })
}

/// `(value, key, index)` with `_` placeholders for skipped positions.
pub fn for_loop_params(result: &ForParseResult) -> Vec<String> {
    let args = [&result.value, &result.key, &result.index];
    let len = args.iter().rposition(|a| a.is_some()).map_or(0, |i| i + 1);
    args[..len]
        .iter()
        .enumerate()
        .map(|(i, arg)| match arg {
            Some(exp) => exp.content.clone(),
            None => "_".repeat(i + 1).into(),
        })
        .collect()
}

pub fn transform_for(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let Some(el) = ctx.ast.element(node) else {
        return TransformAction::Continue;
    };
    if el.find_dir(&DirectiveKind::For).is_none() || is_slot_template(&ctx.ast, node) {
        return TransformAction::Continue;
    }
    let Some(dir) = take_dir(&mut ctx.ast, node, &DirectiveKind::For) else {
        return TransformAction::Continue;
    };

    let Some(ExpressionNode::Simple(exp)) = dir.exp.as_ref().filter(|_| !dir.exp_is_empty()) else {
        ctx.on_error(CompilerError::new(
            ErrorCode::VForNoExpression,
            Some(dir.loc.clone()),
        ));
        return TransformAction::Continue;
    };
    let Some(mut parsed) = parse_for_expression(exp) else {
        ctx.on_error(CompilerError::new(
            ErrorCode::VForMalformedExpression,
            Some(dir.loc.clone()),
        ));
        return TransformAction::Continue;
    };

    if ctx.prefix_identifiers {
        parsed.source = process_expression(ctx, &parsed.source, false);
        for alias in [&mut parsed.value, &mut parsed.key, &mut parsed.index]
            .into_iter()
            .flatten()
        {
            *alias = process_expression(ctx, alias, true);
        }
    }

    let is_template = is_template_node(&ctx.ast, node);
    let (children, key_prop) = match ctx.ast.element(node) {
        Some(el) => (
            if is_template {
                el.children.clone()
            } else {
                vec![node]
            },
            el.find_prop("key", false, false).cloned(),
        ),
        None => (vec![node], None),
    };

    // Scope identifiers introduced by the aliases.
    let declared: Vec<String> = [&parsed.value, &parsed.key, &parsed.index]
        .into_iter()
        .flatten()
        .flat_map(|alias| {
            if alias.identifiers.is_empty() {
                vec![alias.content.clone()]
            } else {
                alias.identifiers.clone()
            }
        })
        .collect();
    ctx.scopes.v_for += 1;
    if ctx.prefix_identifiers {
        for name in &declared {
            ctx.add_identifier(name);
        }
    }

    let mut key_property = key_prop.map(|prop| match prop {
        PropNode::Attribute(attr) => Property::static_key(
            "key",
            JsNode::simple(
                attr.value.map(|v| v.content).unwrap_or_default(),
                true,
            ),
        ),
        PropNode::Directive(dir) => Property::static_key(
            "key",
            dir.exp
                .map(JsNode::from)
                .unwrap_or_else(|| JsNode::simple("undefined", false)),
        ),
    });
    if is_template && ctx.prefix_identifiers {
        if let Some(Property {
            value: JsNode::Simple(exp),
            ..
        }) = key_property.as_mut()
        {
            if !exp.is_static {
                *exp = process_expression(ctx, exp, false);
            }
        }
    }

    let is_stable = parsed.source.const_type > ConstantType::NotConstant;
    let fragment_flag = if is_stable {
        PatchFlags::STABLE_FRAGMENT
    } else if key_property.is_some() {
        PatchFlags::KEYED_FRAGMENT
    } else {
        PatchFlags::UNKEYED_FRAGMENT
    };

    let render_list = ctx.helper(RuntimeHelper::RenderList);
    let fragment = ctx.helper(RuntimeHelper::Fragment);
    ctx.helper(RuntimeHelper::OpenBlock);
    ctx.helper(RuntimeHelper::CreateElementBlock);
    let mut codegen = VNodeCall::new(VNodeTag::Symbol(fragment));
    codegen.children = Some(VNodeChildren::Expr(Box::new(JsNode::call(
        render_list,
        vec![JsNode::Simple(parsed.source.clone())],
    ))));
    codegen.patch_flag = fragment_flag;
    codegen.is_block = true;
    codegen.disable_tracking = !is_stable;

    let params = for_loop_params(&parsed);
    let for_node = ctx.ast.alloc(
        NodeKind::For(ForNode {
            source: ExpressionNode::Simple(parsed.source),
            value_alias: parsed.value.map(ExpressionNode::Simple),
            key_alias: parsed.key.map(ExpressionNode::Simple),
            object_index_alias: parsed.index.map(ExpressionNode::Simple),
            children: children.clone(),
            codegen_node: Some(JsNode::VNode(Box::new(codegen))),
        }),
        dir.loc.clone(),
    );

    TransformAction::Replace {
        node: for_node,
        exit: Some(Box::new(move |ctx: &mut TransformContext| {
            ctx.scopes.v_for -= 1;
            if ctx.prefix_identifiers {
                for name in &declared {
                    ctx.remove_identifier(name);
                }
            }

            let child_block =
                build_child_block(ctx, node, &children, is_template, key_property, is_stable);
            if let NodeKind::For(f) = &mut ctx.ast.node_mut(for_node).kind {
                if let Some(JsNode::VNode(vnode)) = f.codegen_node.as_mut() {
                    if let Some(VNodeChildren::Expr(call)) = vnode.children.as_mut() {
                        if let JsNode::Call(call) = call.as_mut() {
                            call.arguments.push(JsNode::Function(FunctionExpression {
                                params,
                                returns: Box::new(child_block),
                                newline: true,
                            }));
                        }
                    }
                }
            }
        })),
    }
}

fn build_child_block(
    ctx: &mut TransformContext,
    node: NodeId,
    children: &[NodeId],
    is_template: bool,
    key_property: Option<Property>,
    is_stable: bool,
) -> JsNode {
    let slot_outlet = if is_slot_outlet(&ctx.ast, node) {
        Some(node)
    } else if is_template && children.len() == 1 && is_slot_outlet(&ctx.ast, children[0]) {
        Some(children[0])
    } else {
        None
    };

    if let Some(outlet) = slot_outlet {
        if let (true, Some(key)) = (is_template, key_property) {
            let mut codegen = codegen_slot(&mut ctx.ast, outlet).and_then(Option::take);
            if let Some(codegen) = codegen.as_mut() {
                inject_prop(ctx, codegen, key);
            }
            if let Some(slot) = codegen_slot(&mut ctx.ast, outlet) {
                *slot = codegen;
            }
        }
        return JsNode::Node(outlet);
    }

    let needs_fragment =
        children.len() != 1 || ctx.ast.node_type(children[0]) != NodeType::Element;
    if needs_fragment {
        let props = key_property.map(|key| {
            JsNode::Object(ObjectExpression {
                properties: vec![key],
            })
        });
        let vnode = fragment_block(
            ctx,
            props,
            VNodeChildren::Nodes(children.to_vec()),
            PatchFlags::STABLE_FRAGMENT,
        );
        return JsNode::VNode(Box::new(vnode));
    }

    let child = children[0];
    let mut codegen = codegen_slot(&mut ctx.ast, child).and_then(Option::take);
    if let Some(JsNode::VNode(vnode)) = codegen.as_mut() {
        if let (true, Some(key)) = (is_template, key_property) {
            crate::utils::inject_vnode_prop(ctx, vnode, key);
        }
        let want_block = !is_stable;
        if vnode.is_block != want_block {
            if vnode.is_block {
                ctx.remove_helper(RuntimeHelper::OpenBlock);
                ctx.remove_helper(block_helper(vnode.is_component));
            } else {
                ctx.remove_helper(vnode_helper(vnode.is_component));
            }
        }
        vnode.is_block = want_block;
        if want_block {
            ctx.helper(RuntimeHelper::OpenBlock);
            ctx.helper(block_helper(vnode.is_component));
        } else {
            ctx.helper(vnode_helper(vnode.is_component));
        }
    }
    if let Some(slot) = codegen_slot(&mut ctx.ast, child) {
        *slot = codegen;
    }
    JsNode::Node(child)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Option<ForParseResult> {
        parse_for_expression(&SimpleExpressionNode::new(src, false, SourceLocation::STUB))
    }

    #[test]
    fn test_parse_simple() {
        let r = parse("item in items").unwrap();
        assert_eq!(r.source.content, "items");
        assert_eq!(r.value.unwrap().content, "item");
        assert!(r.key.is_none());
    }

    #[test]
    fn test_parse_key_and_index() {
        let r = parse("(value, key, index) of object").unwrap();
        assert_eq!(r.value.unwrap().content, "value");
        assert_eq!(r.key.unwrap().content, "key");
        assert_eq!(r.index.unwrap().content, "index");
        assert_eq!(r.source.content, "object");
    }

    #[test]
    fn test_parse_destructuring() {
        let r = parse("({ id, name }, i) in list").unwrap();
        assert_eq!(r.value.unwrap().content, "{ id, name }");
        assert_eq!(r.key.unwrap().content, "i");
        let r = parse("[a, b] in pairs").unwrap();
        assert_eq!(r.value.unwrap().content, "[a, b]");
    }

    #[test]
    fn test_parse_location() {
        let r = parse("item in items").unwrap();
        assert_eq!(r.source.loc.start.offset, 8);
        assert_eq!(r.source.loc.start.column, 9);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse("items").is_none());
        assert!(parse("item in ").is_none());
    }

    #[test]
    fn test_loop_params() {
        let mut r = parse("(a, b, c) in list").unwrap();
        r.key = None;
        assert_eq!(for_loop_params(&r), vec!["a", "__", "c"]);
        let r = parse("(, i) in list").unwrap();
        assert_eq!(for_loop_params(&r), vec!["_", "i"]);
    }
}
