//! v-model on native form elements.
//!
//! Builds on the core transform and picks the runtime directive matching the
//! element: `vModelText`, `vModelCheckbox`, `vModelRadio`, `vModelSelect` or
//! `vModelDynamic` when the input type is only known at runtime.

use vellum_atelier_core::transforms::transform_model as core_transform_model;
use vellum_atelier_core::{DirectiveTransformResult, NeedRuntime, TransformContext};
use vellum_relief::ast::{DirectiveNode, ElementType, NodeId, PropNode, RuntimeHelper};

use crate::errors::DomErrorCode;

pub fn transform_model(
    dir: &DirectiveNode,
    node: NodeId,
    ctx: &mut TransformContext,
) -> DirectiveTransformResult {
    let mut result = core_transform_model(dir, node, ctx);
    let Some(el) = ctx.ast.element(node) else {
        return result;
    };
    // errors in the base transform, or a component that only needs props
    if result.props.is_empty() || el.tag_type == ElementType::Component {
        return result;
    }

    let tag = el.tag.clone();
    let type_prop = el.find_prop("type", false, false).cloned();
    let value_loc = el.find_prop("value", false, false).map(|p| p.loc().clone());
    let has_dynamic_key = el.has_dynamic_key_v_bind();

    if let Some(arg) = &dir.arg {
        ctx.on_error(DomErrorCode::VModelArgOnElement.into_error(Some(arg.loc().clone())));
    }
    let check_duplicated_value = |ctx: &mut TransformContext| {
        if let Some(loc) = value_loc.clone() {
            ctx.on_error(DomErrorCode::VModelUnnecessaryValue.into_error(Some(loc)));
        }
    };

    let directive = match tag.as_str() {
        "input" => match &type_prop {
            Some(PropNode::Directive(_)) => Some(RuntimeHelper::VModelDynamic),
            Some(PropNode::Attribute(attr)) => {
                match attr.value.as_ref().map(|v| v.content.as_str()) {
                    Some("radio") => Some(RuntimeHelper::VModelRadio),
                    Some("checkbox") => Some(RuntimeHelper::VModelCheckbox),
                    Some("file") => {
                        ctx.on_error(
                            DomErrorCode::VModelOnFileInputElement.into_error(Some(dir.loc.clone())),
                        );
                        None
                    }
                    _ => {
                        check_duplicated_value(ctx);
                        Some(RuntimeHelper::VModelText)
                    }
                }
            }
            // a v-bind object may carry `type`
            None if has_dynamic_key => Some(RuntimeHelper::VModelDynamic),
            None => {
                check_duplicated_value(ctx);
                Some(RuntimeHelper::VModelText)
            }
        },
        "select" => Some(RuntimeHelper::VModelSelect),
        "textarea" => {
            check_duplicated_value(ctx);
            Some(RuntimeHelper::VModelText)
        }
        _ => {
            ctx.on_error(DomErrorCode::VModelOnInvalidElement.into_error(Some(dir.loc.clone())));
            None
        }
    };
    if let Some(helper) = directive {
        result.need_runtime = Some(NeedRuntime::Helper(ctx.helper(helper)));
    }

    // the runtime directive receives the value as `binding.value`
    result
        .props
        .retain(|p| p.key_static_content() != Some("modelValue"));
    result
}

#[cfg(test)]
mod tests {
    use crate::{compile, CompileResult, DomCompilerOptions, DomErrorCode};

    fn compile_prefixed(source: &str) -> CompileResult {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        compile(source, &options)
    }

    fn error_codes(result: &CompileResult) -> Vec<u16> {
        result.errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_text_input() {
        let result = compile_prefixed(r#"<input v-model="model" />"#);
        assert!(result.errors.is_empty());
        assert!(result.code.contains("vModelText: _vModelText"));
        assert!(result.code.contains(r#""onUpdate:modelValue": $event => ((_ctx.model) = $event)"#));
        assert!(result.code.contains("[_vModelText, _ctx.model]"));
        assert!(!result.code.contains("modelValue: _ctx.model"));
    }

    #[test]
    fn test_input_types() {
        assert!(compile_prefixed(r#"<input type="radio" v-model="m" />"#)
            .code
            .contains("[_vModelRadio, _ctx.m]"));
        assert!(compile_prefixed(r#"<input type="checkbox" v-model="m" />"#)
            .code
            .contains("[_vModelCheckbox, _ctx.m]"));
        assert!(compile_prefixed(r#"<input :type="t" v-model="m" />"#)
            .code
            .contains("[_vModelDynamic, _ctx.m]"));
        assert!(compile_prefixed(r#"<input v-bind="attrs" v-model="m" />"#)
            .code
            .contains("[_vModelDynamic, _ctx.m]"));
        assert!(compile_prefixed(r#"<select v-model="m" />"#)
            .code
            .contains("[_vModelSelect, _ctx.m]"));
        assert!(compile_prefixed(r#"<textarea v-model="m" />"#)
            .code
            .contains("[_vModelText, _ctx.m]"));
    }

    #[test]
    fn test_file_input_is_rejected() {
        let result = compile_prefixed(r#"<input type="file" v-model="m" />"#);
        assert_eq!(
            error_codes(&result),
            vec![DomErrorCode::VModelOnFileInputElement.code()]
        );
        assert!(!result.code.contains("_vModel"));
    }

    #[test]
    fn test_invalid_element() {
        let result = compile_prefixed(r#"<span v-model="m" />"#);
        assert_eq!(
            error_codes(&result),
            vec![DomErrorCode::VModelOnInvalidElement.code()]
        );
    }

    #[test]
    fn test_argument_on_element() {
        let result = compile_prefixed(r#"<input v-model:value="m" />"#);
        assert!(error_codes(&result).contains(&DomErrorCode::VModelArgOnElement.code()));
    }

    #[test]
    fn test_unnecessary_value() {
        let result = compile_prefixed(r#"<input v-model="m" :value="x" />"#);
        assert_eq!(
            error_codes(&result),
            vec![DomErrorCode::VModelUnnecessaryValue.code()]
        );
        let result = compile_prefixed(r#"<textarea v-model="m" value="x" />"#);
        assert_eq!(
            error_codes(&result),
            vec![DomErrorCode::VModelUnnecessaryValue.code()]
        );
    }

    #[test]
    fn test_component_keeps_model_value() {
        let result = compile_prefixed(r#"<Comp v-model="m" />"#);
        assert!(result.errors.is_empty());
        assert!(result.code.contains("modelValue: _ctx.m"));
        assert!(!result.code.contains("_vModelText"));
    }
}
