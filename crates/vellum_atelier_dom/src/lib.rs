//! Atelier DOM - The DOM compiler workshop.
//!
//! Wraps the core compiler with browser rules: HTML/SVG/MathML namespaces,
//! RCDATA and RAWTEXT elements, `<Transition>` as a built-in, and the DOM
//! directives (`v-model` on form elements, event modifiers, `v-show`,
//! `v-html`, `v-text`, `v-cloak`).

pub mod errors;
pub mod options;
pub mod transforms;

use std::sync::Arc;

use vellum_atelier_core::compile::{base_compile, get_base_transform_preset};
use vellum_atelier_core::{DirectiveTransform, NodeTransform, TransformPreset};
use vellum_relief::ast::{DirectiveKind, TemplateAst};
use vellum_relief::errors::CompilerError;

pub use errors::DomErrorCode;
pub use options::{parser_options, DomCompilerOptions};
pub use vellum_atelier_core::{CompileResult, CompilerOptions};

/// Base transforms plus the DOM node and directive transforms.
pub fn get_dom_transform_preset(prefix_identifiers: bool) -> TransformPreset {
    let mut preset = get_base_transform_preset(prefix_identifiers);
    let node_transforms: [Arc<dyn NodeTransform>; 2] = [
        Arc::new(transforms::transform_style),
        Arc::new(transforms::warn_transition_children),
    ];
    let directive_transforms: [(DirectiveKind, Arc<dyn DirectiveTransform>); 6] = [
        (DirectiveKind::Cloak, Arc::new(transforms::transform_cloak)),
        (DirectiveKind::Html, Arc::new(transforms::transform_v_html)),
        (DirectiveKind::Text, Arc::new(transforms::transform_v_text)),
        (DirectiveKind::Model, Arc::new(transforms::transform_model)),
        (DirectiveKind::On, Arc::new(transforms::transform_on)),
        (DirectiveKind::Show, Arc::new(transforms::transform_show)),
    ];
    preset.node_transforms.extend(node_transforms);
    preset.directive_transforms.extend(directive_transforms);
    preset
}

/// Compile a template for the browser.
pub fn compile(template: &str, options: &DomCompilerOptions) -> CompileResult {
    compile_with_options(template, &options.to_compiler_options())
}

/// Compile with fully specified core options. `options.parser` should come
/// from [`parser_options`] for browser semantics.
pub fn compile_with_options(template: &str, options: &CompilerOptions) -> CompileResult {
    let preset = get_dom_transform_preset(options.effective_prefix_identifiers());
    base_compile(template, options, preset)
}

/// Parse a template with the DOM parser rules.
pub fn parse(template: &str) -> (TemplateAst, Vec<CompilerError>) {
    vellum_armature::parse_with_options(template, parser_options())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textarea_content_is_text() {
        let result = compile("<textarea><div>{{ a }}</div></textarea>", &DomCompilerOptions::default());
        assert!(result.errors.is_empty());
        assert!(result.code.contains(r#""<div>" + _toDisplayString(a) + "</div>""#));
    }

    #[test]
    fn test_transition_resolves_to_helper() {
        let result = compile("<transition><div/></transition>", &DomCompilerOptions::default());
        assert!(result.code.contains("Transition: _Transition"));
        assert!(result.code.contains("_createBlock(_Transition"));
        assert!(!result.code.contains("resolveComponent"));
    }

    #[test]
    fn test_native_tags_are_elements() {
        let result = compile("<Foo><span/></Foo>", &DomCompilerOptions::default());
        assert!(result.code.contains(r#"_resolveComponent("Foo")"#));
        let result = compile("<section/>", &DomCompilerOptions::default());
        assert!(result.code.contains(r#"_createElementBlock("section")"#));
    }

    #[test]
    fn test_user_directive_transform_wins() {
        use vellum_atelier_core::DirectiveTransformResult;
        use vellum_relief::ast::{JsNode, Property};

        let mut options = DomCompilerOptions::default().to_compiler_options();
        let hidden: Arc<dyn DirectiveTransform> = Arc::new(
            |_: &vellum_relief::ast::DirectiveNode,
             _: vellum_relief::ast::NodeId,
             _: &mut vellum_atelier_core::TransformContext| {
                DirectiveTransformResult::new(vec![Property::static_key(
                    "hidden",
                    JsNode::simple("false", false),
                )])
            },
        );
        options.directive_transforms.push((DirectiveKind::Show, hidden));
        let result = compile_with_options(r#"<div v-show="x"/>"#, &options);
        assert!(result.code.contains("hidden: false"));
        assert!(!result.code.contains("_vShow"));
    }
}
