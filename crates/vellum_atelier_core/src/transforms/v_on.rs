//! v-on directive transform.
//!
//! Produces the `onXxx` handler property. Inline statements are wrapped in an
//! arrow function, and handlers that do not capture scope variables are cached
//! when `cache_handlers` is set.

use vellum_carton::{camelize, format_compact, is_member_expression, to_handler_key, String};
use vellum_relief::ast::{
    CompoundChild, CompoundExpressionNode, ConstantType, DirectiveNode, ElementType,
    ExpressionNode, JsNode, NodeId, Property, RuntimeHelper, SimpleExpressionNode,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{DirectiveTransformResult, TransformContext};
use crate::transforms::transform_expression::{has_scope_ref, process_expression};

/// Hook run on the generated props before handler caching (used for event modifiers).
pub type OnAugmentor<'a> =
    &'a dyn Fn(DirectiveTransformResult, &mut TransformContext) -> DirectiveTransformResult;

pub fn transform_on(
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    transform_on_with(dir, node, ctx, None)
}

/// Arrow functions and `function` expressions are used as handlers directly.
pub fn is_function_expression(exp: &str) -> bool {
    let s = exp.trim_start();
    let s = s.strip_prefix("async").map_or(s, |rest| {
        if rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
            rest.trim_start()
        } else {
            s
        }
    });
    if let Some(rest) = s.strip_prefix("function") {
        return rest.trim_start().starts_with(|c: char| c == '(' || c.is_alphabetic() || c == '_' || c == '$');
    }
    let after_params = if let Some(rest) = s.strip_prefix('(') {
        match rest.find(')') {
            Some(close) => &rest[close + 1..],
            None => return false,
        }
    } else {
        let len = s
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(s.len());
        if len == 0 {
            return false;
        }
        &s[len..]
    };
    let after_params = after_params.trim_start();
    // optional return type annotation
    let after_params = match after_params.strip_prefix(':') {
        Some(rest) => match rest.find("=>") {
            Some(i) => &rest[i..],
            None => return false,
        },
        None => after_params,
    };
    after_params.starts_with("=>")
}

pub fn transform_on_with(
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
    augmentor: Option<OnAugmentor<'_>>,
) -> DirectiveTransformResult {
    if dir.exp.is_none() && dir.modifiers.is_empty() {
        ctx.on_error(CompilerError::new(
            ErrorCode::VOnNoExpression,
            Some(dir.loc.clone()),
        ));
    }
    let is_component = ctx
        .ast
        .element(node)
        .is_some_and(|el| el.tag_type != ElementType::Element);

    let mut event_name = match &dir.arg {
        Some(ExpressionNode::Simple(arg)) if arg.is_static => {
            let raw: String = match arg.content.strip_prefix("vue:") {
                Some(rest) => format_compact!("vnode-{}", rest),
                None => arg.content.clone(),
            };
            let key = if is_component
                || raw.starts_with("vnode")
                || !raw.chars().any(|c| c.is_ascii_uppercase())
            {
                to_handler_key(&camelize(&raw))
            } else {
                format_compact!("on:{}", raw)
            };
            ExpressionNode::Simple(SimpleExpressionNode::new(key, true, arg.loc.clone()))
        }
        Some(arg) => {
            let helper = ctx.helper_string(RuntimeHelper::ToHandlerKey);
            let inner = match arg {
                ExpressionNode::Simple(s) => CompoundChild::Simple(s.clone()),
                ExpressionNode::Compound(c) => CompoundChild::Compound(c.clone()),
            };
            ExpressionNode::Compound(CompoundExpressionNode::new(
                vec![
                    CompoundChild::Code(format_compact!("{}(", helper)),
                    inner,
                    CompoundChild::Code(")".into()),
                ],
                arg.loc().clone(),
            ))
        }
        None => ExpressionNode::simple("", true, dir.loc.clone()),
    };

    let exp = match &dir.exp {
        Some(ExpressionNode::Simple(s)) if s.content.trim().is_empty() => None,
        Some(ExpressionNode::Simple(s)) => Some(s.clone()),
        _ => None,
    };
    let mut should_cache = ctx.options.cache_handlers && exp.is_none() && !ctx.in_v_once;

    let value = match exp {
        None => JsNode::simple("() => {}", false),
        Some(mut exp) => {
            let is_member = is_member_expression(&exp.content);
            let is_inline = !(is_member || is_function_expression(&exp.content));
            let multiple_statements = exp.content.contains(';');

            if ctx.prefix_identifiers {
                if is_inline {
                    ctx.add_identifier("$event");
                }
                exp = process_expression(ctx, &exp, false);
                if is_inline {
                    ctx.remove_identifier("$event");
                }
                should_cache = ctx.options.cache_handlers
                    && !ctx.in_v_once
                    && exp.const_type == ConstantType::NotConstant
                    && !(is_member && is_component)
                    && !has_scope_ref(ctx, &ExpressionNode::Simple(exp.clone()));
                if should_cache && is_member {
                    exp.content = format_compact!("{0} && {0}(...args)", exp.content);
                }
            }

            if is_inline || (should_cache && is_member) {
                let params = if is_inline {
                    if ctx.options.is_ts {
                        "($event: any)"
                    } else {
                        "$event"
                    }
                } else if ctx.options.is_ts {
                    "\n//@ts-ignore\n(...args)"
                } else {
                    "(...args)"
                };
                let (open, close) = if multiple_statements {
                    ("{", "}")
                } else {
                    ("(", ")")
                };
                let loc = exp.loc.clone();
                JsNode::Compound(CompoundExpressionNode::new(
                    vec![
                        CompoundChild::Code(format_compact!("{} => {}", params, open)),
                        CompoundChild::Simple(exp),
                        CompoundChild::Code(close.into()),
                    ],
                    loc,
                ))
            } else {
                JsNode::Simple(exp)
            }
        }
    };

    match &mut event_name {
        ExpressionNode::Simple(s) => s.is_handler_key = true,
        ExpressionNode::Compound(c) => c.is_handler_key = true,
    }
    let mut result = DirectiveTransformResult::new(vec![Property::new(event_name, value)]);
    if let Some(augment) = augmentor {
        result = augment(result, ctx);
    }
    if should_cache {
        if let Some(first) = result.props.first_mut() {
            let value = std::mem::replace(&mut first.value, JsNode::simple("", false));
            first.value = ctx.cache(value, false);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_expression_detection() {
        assert!(is_function_expression("() => foo()"));
        assert!(is_function_expression("e => handle(e)"));
        assert!(is_function_expression("async (e) => await go(e)"));
        assert!(is_function_expression("function (e) { go(e) }"));
        assert!(is_function_expression("(e): void => go(e)"));
        assert!(!is_function_expression("foo($event)"));
        assert!(!is_function_expression("count++"));
        assert!(!is_function_expression("a = b"));
    }
}
