//! Parse, transform and generate in one call.

use std::sync::Arc;

use sourcemap::SourceMap;
use vellum_armature::parse_with_options;
use vellum_relief::ast::{DirectiveKind, TemplateAst};
use vellum_relief::errors::CompilerError;

use crate::codegen::generate;
use crate::options::CompilerOptions;
use crate::transform::{transform, DirectiveTransform, NodeTransform, TransformPreset};
use crate::transforms::{
    track_slot_scopes, track_v_for_slot_scopes, transform_bind, transform_element,
    transform_expression, transform_for, transform_if, transform_memo, transform_model,
    transform_on, transform_once, transform_slot_outlet, transform_text,
};

/// Output of [`base_compile`].
#[derive(Debug)]
pub struct CompileResult {
    pub ast: TemplateAst,
    pub code: String,
    pub preamble: String,
    pub map: Option<SourceMap>,
    /// Parse, transform and codegen diagnostics, in that order
    pub errors: Vec<CompilerError>,
}

/// The platform-independent transforms, in the order they must run.
pub fn get_base_transform_preset(prefix_identifiers: bool) -> TransformPreset {
    let mut node_transforms: Vec<Arc<dyn NodeTransform>> = vec![
        Arc::new(transform_once),
        Arc::new(transform_if),
        Arc::new(transform_memo),
        Arc::new(transform_for),
    ];
    if prefix_identifiers {
        node_transforms.push(Arc::new(track_v_for_slot_scopes));
        node_transforms.push(Arc::new(transform_expression));
    }
    let element_transforms: [Arc<dyn NodeTransform>; 4] = [
        Arc::new(transform_slot_outlet),
        Arc::new(transform_element),
        Arc::new(track_slot_scopes),
        Arc::new(transform_text),
    ];
    node_transforms.extend(element_transforms);

    let directive_transforms: Vec<(DirectiveKind, Arc<dyn DirectiveTransform>)> = vec![
        (DirectiveKind::On, Arc::new(transform_on)),
        (DirectiveKind::Bind, Arc::new(transform_bind)),
        (DirectiveKind::Model, Arc::new(transform_model)),
    ];

    TransformPreset {
        node_transforms,
        directive_transforms,
    }
}

/// Compile a template with `preset` as the built-in transforms.
///
/// Compilation always completes; problems are reported in
/// [`CompileResult::errors`].
pub fn base_compile(
    source: &str,
    options: &CompilerOptions,
    preset: TransformPreset,
) -> CompileResult {
    let (ast, mut errors) = parse_with_options(source, options.parser.clone());
    let (ast, transform_errors) = transform(ast, options, preset);
    errors.extend(transform_errors);

    let generated = generate(&ast, options);
    errors.extend(generated.errors);
    if !errors.is_empty() {
        tracing::debug!(
            filename = %options.filename,
            count = errors.len(),
            "template compiled with diagnostics"
        );
    }

    CompileResult {
        ast,
        code: generated.code,
        preamble: generated.preamble,
        map: generated.map,
        errors,
    }
}
