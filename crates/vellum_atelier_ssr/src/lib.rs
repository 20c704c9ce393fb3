//! Atelier SSR - the server-rendering compiler workshop.
//!
//! Templates compile to an `ssrRender(_ctx, _push, _parent, _attrs)` function
//! that writes HTML strings through `_push()` instead of building vnodes. The
//! transform pass reuses the structural core transforms (`v-if`, `v-for`,
//! identifier prefixing); elements, components and slots are printed directly
//! by [`codegen`].
//!
//! ```
//! use vellum_atelier_ssr::{compile_ssr, SsrCompilerOptions};
//!
//! let result = compile_ssr("<p>{{ msg }}</p>", &SsrCompilerOptions::default());
//! assert!(result.code.contains("_ssrInterpolate(_ctx.msg)"));
//! ```

mod component;
mod element;

pub mod codegen;
pub mod errors;
pub mod options;

use std::sync::Arc;

use vellum_atelier_core::transform::transform;
use vellum_atelier_core::transforms::{
    parse_for_expression, process_expression, track_slot_scopes, track_v_for_slot_scopes,
    transform_expression, transform_for, transform_if,
};
use vellum_atelier_core::utils::is_slot_template;
use vellum_atelier_core::{NodeTransform, TransformAction, TransformContext, TransformPreset};
use vellum_carton::format_compact;
use vellum_relief::ast::{DirectiveKind, ExpressionNode, NodeId, PropNode};

pub use codegen::{SsrCodegenContext, SsrCodegenResult};
pub use errors::SsrErrorCode;
pub use options::SsrCompilerOptions;
pub use vellum_atelier_core::CompileResult;

/// Structural transforms needed before SSR codegen. No directive transforms
/// run: bindings are printed straight into the markup.
pub fn get_ssr_transform_preset() -> TransformPreset {
    let node_transforms: Vec<Arc<dyn NodeTransform>> = vec![
        Arc::new(transform_if),
        Arc::new(transform_for),
        Arc::new(prefix_slot_list_source),
        Arc::new(track_v_for_slot_scopes),
        Arc::new(transform_expression),
        Arc::new(track_slot_scopes),
    ];
    TransformPreset {
        node_transforms,
        directive_transforms: Vec::new(),
    }
}

/// Compile a template to a server render function.
pub fn compile_ssr(template: &str, options: &SsrCompilerOptions) -> CompileResult {
    compile_ssr_with_transforms(template, options, Vec::new())
}

/// Compile with extra node transforms, run after the built-in ones.
pub fn compile_ssr_with_transforms(
    template: &str,
    options: &SsrCompilerOptions,
    node_transforms: Vec<Arc<dyn NodeTransform>>,
) -> CompileResult {
    let mut compiler_options = options.to_compiler_options();
    compiler_options.node_transforms.extend(node_transforms);

    let (ast, mut errors) =
        vellum_armature::parse_with_options(template, compiler_options.parser.clone());
    let (ast, transform_errors) = transform(ast, &compiler_options, get_ssr_transform_preset());
    errors.extend(transform_errors);

    let generated = SsrCodegenContext::new(&ast, options).generate();
    errors.extend(generated.errors);
    if !errors.is_empty() {
        tracing::debug!(
            filename = %options.filename,
            count = errors.len(),
            "ssr template compiled with diagnostics"
        );
    }

    CompileResult {
        ast,
        code: generated.code,
        preamble: generated.preamble,
        map: None,
        errors,
    }
}

/// `<template v-slot v-for>` is skipped by the `v-for` transform, so the list
/// source is prefixed here, before the loop aliases enter scope.
fn prefix_slot_list_source(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    if !ctx.prefix_identifiers || !is_slot_template(&ctx.ast, node) {
        return TransformAction::Continue;
    }
    let Some(el) = ctx.ast.element(node) else {
        return TransformAction::Continue;
    };
    let Some(index) = el
        .props
        .iter()
        .position(|p| matches!(p, PropNode::Directive(d) if d.kind == DirectiveKind::For))
    else {
        return TransformAction::Continue;
    };
    let PropNode::Directive(dir) = &el.props[index] else {
        return TransformAction::Continue;
    };
    let Some(ExpressionNode::Simple(exp)) = &dir.exp else {
        return TransformAction::Continue;
    };
    let Some(parsed) = parse_for_expression(exp) else {
        return TransformAction::Continue;
    };
    let source = process_expression(ctx, &parsed.source, false);
    let Some(at) = exp.content.rfind(parsed.source.content.as_str()) else {
        return TransformAction::Continue;
    };
    let mut rewritten = exp.clone();
    rewritten.content = format_compact!("{}{}", &exp.content[..at], source.content);

    if let Some(el) = ctx.ast.element_mut(node) {
        if let PropNode::Directive(dir) = &mut el.props[index] {
            dir.exp = Some(ExpressionNode::Simple(rewritten));
        }
    }
    TransformAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> CompileResult {
        compile_ssr(source, &SsrCompilerOptions::default())
    }

    #[test]
    fn test_plain_element_single_push() {
        let result = compile(r#"<div class="a"><span>hi</span></div>"#);
        assert!(result.errors.is_empty());
        assert!(result
            .code
            .contains(r#"_push(`<div class="a"${_ssrRenderAttrs(_attrs)}><span>hi</span></div>`)"#));
        assert!(result.map.is_none());
    }

    #[test]
    fn test_text_is_escaped() {
        let result = compile("<p>a &lt; b</p>");
        assert!(result.code.contains("<p${_ssrRenderAttrs(_attrs)}>a &lt; b</p>"));
    }

    #[test]
    fn test_raw_text_is_not_escaped() {
        let result = compile("<div><style>a > b {}</style></div>");
        assert!(result.code.contains("<style>a > b {}</style>"));
    }

    #[test]
    fn test_unsafe_attribute_name() {
        let result = compile(r#"<div :[key]="v" a"b="1"></div>"#);
        assert!(result
            .errors
            .iter()
            .any(|e| e.code == SsrErrorCode::UnsafeAttrName.code()));
    }

    #[test]
    fn test_slot_list_source_is_prefixed() {
        let result = compile(
            r#"<Comp><template v-for="item in items" #[item.name]="{ x }">{{ x }}{{ item.id }}</template></Comp>"#,
        );
        assert!(result.code.contains("_renderList(_ctx.items, (item) => {"));
        assert!(result.code.contains("name: item.name,"));
        assert!(result.code.contains("_ssrInterpolate(x)"));
        assert!(result.code.contains("_ssrInterpolate(item.id)"));
    }

    #[test]
    fn test_extra_node_transform_runs() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static SEEN: AtomicUsize = AtomicUsize::new(0);

        let count: Arc<dyn NodeTransform> = Arc::new(|_: NodeId, _: &mut TransformContext| {
            SEEN.fetch_add(1, Ordering::SeqCst);
            TransformAction::Continue
        });
        compile_ssr_with_transforms("<div><p/></div>", &SsrCompilerOptions::default(), vec![count]);
        assert!(SEEN.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_v_model_missing_expression() {
        use vellum_relief::errors::ErrorCode;

        let result = compile("<input v-model/>");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::VModelNoExpression.code());
        assert!(!result.code.contains("_ssrRenderAttr(\"value\""));

        let result = compile("<Comp v-model=\"a + b\"/>");
        assert!(result
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::VModelMalformedExpression.code()));
    }

    #[test]
    fn test_v_model_value_is_rendered() {
        let result = compile("<input v-model=\"text\"/>");
        assert!(result.errors.is_empty());
        assert!(result.code.contains("_ssrRenderAttr(\"value\", _ctx.text)"));
    }
}
