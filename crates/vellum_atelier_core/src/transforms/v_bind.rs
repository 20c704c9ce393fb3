//! v-bind directive transform.
//!
//! Turns `:name="exp"` into an object property. Argument-less `v-bind="obj"` is
//! merged by the element transform and never reaches this function.

use vellum_carton::{camelize, format_compact};
use vellum_relief::ast::{
    CompoundChild, DirectiveNode, ExpressionNode, JsNode, NodeId, Property,
    RuntimeHelper, SimpleExpressionNode,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{DirectiveTransformResult, TransformContext};

pub fn transform_bind(
    dir: &DirectiveNode,
    _node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    let Some(mut arg) = dir.arg.clone() else {
        return DirectiveTransformResult::default();
    };

    match &mut arg {
        ExpressionNode::Simple(s) if !s.is_static => {
            s.content = format_compact!("{} || \"\"", s.content);
        }
        ExpressionNode::Compound(c) => {
            c.children.insert(0, CompoundChild::Code("(".into()));
            c.children.push(CompoundChild::Code(") || \"\"".into()));
        }
        _ => {}
    }

    if dir.has_modifier("camel") {
        match &mut arg {
            ExpressionNode::Simple(s) if s.is_static => s.content = camelize(&s.content),
            ExpressionNode::Simple(s) => {
                let helper = ctx.helper_string(RuntimeHelper::Camelize);
                s.content = format_compact!("{}({})", helper, s.content);
            }
            ExpressionNode::Compound(c) => {
                let helper = ctx.helper_string(RuntimeHelper::Camelize);
                c.children
                    .insert(0, CompoundChild::Code(format_compact!("{}(", helper)));
                c.children.push(CompoundChild::Code(")".into()));
            }
        }
    }

    if !ctx.options.ssr {
        if dir.has_modifier("prop") {
            inject_prefix(&mut arg, ".");
        }
        if dir.has_modifier("attr") {
            inject_prefix(&mut arg, "^");
        }
    }

    if dir.exp_is_empty() {
        ctx.on_error(CompilerError::new(
            ErrorCode::VBindNoExpression,
            Some(dir.loc.clone()),
        ));
        let empty = SimpleExpressionNode::new("", true, dir.loc.clone());
        return DirectiveTransformResult::new(vec![Property::new(arg, JsNode::Simple(empty))]);
    }

    let exp = dir
        .exp
        .clone()
        .map(JsNode::from)
        .unwrap_or_else(|| JsNode::simple("undefined", false));
    DirectiveTransformResult::new(vec![Property::new(arg, exp)])
}

/// `.prop` binds as `.name`, `.attr` as `^name`.
fn inject_prefix(arg: &mut ExpressionNode, prefix: &str) {
    match arg {
        ExpressionNode::Simple(s) if s.is_static => {
            s.content = format_compact!("{}{}", prefix, s.content);
        }
        ExpressionNode::Simple(s) => {
            s.content = format_compact!("`{}${{{}}}`", prefix, s.content);
        }
        ExpressionNode::Compound(c) => {
            c.children
                .insert(0, CompoundChild::Code(format_compact!("'{}' + (", prefix)));
            c.children.push(CompoundChild::Code(")".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompilerOptions;
    use crate::transform::{TransformContext, TransformPreset};
    use vellum_relief::ast::PropNode;

    fn run(source: &str) -> (DirectiveTransformResult, Vec<CompilerError>) {
        let (ast, _) = vellum_armature::parse(source);
        let div = ast.children(NodeId::ROOT)[0];
        let dir = match &ast.element(div).unwrap().props[0] {
            PropNode::Directive(dir) => dir.clone(),
            PropNode::Attribute(_) => panic!("expected directive"),
        };
        let mut ctx = TransformContext::new(ast, &CompilerOptions::default(), TransformPreset::default());
        let result = transform_bind(&dir, div, &mut ctx);
        (result, ctx.errors)
    }

    fn key(result: &DirectiveTransformResult) -> std::string::String {
        result.props[0].key.source_text().to_string()
    }

    #[test]
    fn test_static_arg() {
        let (result, errors) = run(r#"<div :id="foo"/>"#);
        assert!(errors.is_empty());
        assert_eq!(key(&result), "id");
    }

    #[test]
    fn test_dynamic_arg_gets_fallback() {
        let (result, _) = run(r#"<div :[name]="foo"/>"#);
        assert_eq!(key(&result), "name || \"\"");
    }

    #[test]
    fn test_camel_modifier() {
        let (result, _) = run(r#"<div :foo-bar.camel="x"/>"#);
        assert_eq!(key(&result), "fooBar");
        let (result, _) = run(r#"<div :[name].camel="x"/>"#);
        assert_eq!(key(&result), "_camelize(name || \"\")");
    }

    #[test]
    fn test_prop_and_attr_modifiers() {
        let (result, _) = run(r#"<div :value.prop="x"/>"#);
        assert_eq!(key(&result), ".value");
        let (result, _) = run(r#"<div :value.attr="x"/>"#);
        assert_eq!(key(&result), "^value");
    }

    #[test]
    fn test_missing_expression() {
        let (result, errors) = run(r#"<div :id=""/>"#);
        assert_eq!(errors[0].code, ErrorCode::VBindNoExpression.code());
        assert_eq!(result.props.len(), 1);
    }
}
