//! v-model directive transform.
//!
//! Emits the value prop plus an `onUpdate:` handler assigning `$event` back to
//! the bound expression. Platform compilers add the runtime directive for native
//! form elements on top of these props.

use vellum_carton::{camelize, format_compact, is_member_expression, is_simple_identifier};
use vellum_relief::ast::{
    CompoundChild, CompoundExpressionNode, ConstantType, DirectiveNode, ElementType,
    ExpressionNode, JsNode, NodeId, Property, SimpleExpressionNode, SourceLocation,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{DirectiveTransformResult, TransformContext};
use crate::transforms::transform_expression::has_scope_ref;

pub fn transform_model(
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    let Some(exp) = dir.exp.clone() else {
        ctx.on_error(CompilerError::new(
            ErrorCode::VModelNoExpression,
            Some(dir.loc.clone()),
        ));
        return DirectiveTransformResult::default();
    };
    let exp_string = exp.source_text();
    if exp_string.trim().is_empty() || !is_member_expression(&exp_string) {
        ctx.on_error(CompilerError::new(
            ErrorCode::VModelMalformedExpression,
            Some(exp.loc().clone()),
        ));
        return DirectiveTransformResult::default();
    }
    if ctx.prefix_identifiers && is_simple_identifier(&exp_string) && ctx.is_in_scope(&exp_string) {
        ctx.on_error(CompilerError::new(
            ErrorCode::VModelOnScopeVariable,
            Some(exp.loc().clone()),
        ));
        return DirectiveTransformResult::default();
    }

    let prop_name = dir
        .arg
        .clone()
        .unwrap_or_else(|| ExpressionNode::simple("modelValue", true, SourceLocation::STUB));
    let event_name = match &dir.arg {
        None => ExpressionNode::simple("onUpdate:modelValue", true, SourceLocation::STUB),
        Some(ExpressionNode::Simple(arg)) if arg.is_static => ExpressionNode::simple(
            format_compact!("onUpdate:{}", camelize(&arg.content)),
            true,
            SourceLocation::STUB,
        ),
        Some(arg) => ExpressionNode::Compound(CompoundExpressionNode::new(
            vec![
                CompoundChild::Code("\"onUpdate:\" + ".into()),
                compound_child(arg),
            ],
            arg.loc().clone(),
        )),
    };

    let event_arg = if ctx.options.is_ts {
        "($event: any)"
    } else {
        "$event"
    };
    let assignment = JsNode::Compound(CompoundExpressionNode::new(
        vec![
            CompoundChild::Code(format_compact!("{} => ((", event_arg)),
            compound_child(&exp),
            CompoundChild::Code(") = $event)".into()),
        ],
        exp.loc().clone(),
    ));

    let mut props = vec![
        Property::new(prop_name, JsNode::from(exp.clone())),
        Property::new(event_name, assignment),
    ];
    if ctx.prefix_identifiers
        && !ctx.in_v_once
        && ctx.options.cache_handlers
        && !has_scope_ref(ctx, &exp)
    {
        let value = std::mem::replace(&mut props[1].value, JsNode::simple("", false));
        props[1].value = ctx.cache(value, false);
    }

    let is_component = ctx
        .ast
        .element(node)
        .is_some_and(|el| el.tag_type == ElementType::Component);
    if !dir.modifiers.is_empty() && is_component {
        let modifiers = dir
            .modifiers
            .iter()
            .map(|m| {
                if is_simple_identifier(&m.content) {
                    format_compact!("{}: true", m.content)
                } else {
                    format_compact!("{}: true", vellum_carton::to_json_string(&m.content))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let modifiers_key = match &dir.arg {
            None => ExpressionNode::simple("modelModifiers", true, SourceLocation::STUB),
            Some(ExpressionNode::Simple(arg)) if arg.is_static => ExpressionNode::simple(
                format_compact!("{}Modifiers", arg.content),
                true,
                SourceLocation::STUB,
            ),
            Some(arg) => ExpressionNode::Compound(CompoundExpressionNode::new(
                vec![compound_child(arg), CompoundChild::Code(" + \"Modifiers\"".into())],
                arg.loc().clone(),
            )),
        };
        props.push(Property::new(
            modifiers_key,
            JsNode::Simple(
                SimpleExpressionNode::new(format_compact!("{{ {} }}", modifiers), false, dir.loc.clone())
                    .with_const_type(ConstantType::CanHoist),
            ),
        ));
    }

    DirectiveTransformResult::new(props)
}

fn compound_child(exp: &ExpressionNode) -> CompoundChild {
    match exp {
        ExpressionNode::Simple(s) => CompoundChild::Simple(s.clone()),
        ExpressionNode::Compound(c) => CompoundChild::Compound(c.clone()),
    }
}
