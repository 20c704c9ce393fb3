//! `srcset` candidates with relative URLs become imports.

use vellum_atelier_core::{TransformAction, TransformContext};
use vellum_carton::{format_compact, String};
use vellum_relief::ast::{
    CompoundChild, CompoundExpressionNode, ConstantType, ExpressionNode, NodeId, PropNode,
    SimpleExpressionNode, SourceLocation,
};

use super::asset_url::{bind_directive, hoisted, import_name, is_relative_url, parse_url};

const SRCSET_TAGS: &[&str] = &["img", "source"];

/// One image candidate: a URL and an optional width or density descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate<'a> {
    pub url: &'a str,
    pub descriptor: Option<&'a str>,
}

pub fn transform_srcset(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let Some(el) = ctx.ast.element(node) else {
        return TransformAction::Continue;
    };
    if !SRCSET_TAGS.contains(&el.tag.as_str()) {
        return TransformAction::Continue;
    }

    let rewrites: Vec<(usize, String, SourceLocation)> = el
        .props
        .iter()
        .enumerate()
        .filter_map(|(index, prop)| match prop {
            PropNode::Attribute(attr) if attr.name == "srcset" => attr
                .value
                .as_ref()
                .map(|value| (index, value.content.clone(), attr.loc.clone())),
            _ => None,
        })
        .collect();

    for (index, value, loc) in rewrites {
        let normalized: Vec<std::string::String> = value.split(',').map(normalize_spaces).collect();
        let candidates: Vec<ImageCandidate<'_>> =
            normalized.iter().map(|c| parse_candidate(c)).collect();
        if !candidates.iter().any(|c| is_relative_url(c.url)) {
            continue;
        }

        let compound = candidates_expression(&candidates, &loc, ctx);
        let exp = if ctx.options.ssr {
            compound
        } else {
            hoisted(compound, ctx)
        };
        let dir = bind_directive("srcset", exp, loc);
        if let Some(el) = ctx.ast.element_mut(node) {
            el.props[index] = PropNode::Directive(dir);
        }
    }
    TransformAction::Continue
}

fn candidates_expression(
    candidates: &[ImageCandidate<'_>],
    loc: &SourceLocation,
    ctx: &mut TransformContext,
) -> ExpressionNode {
    let mut children = Vec::with_capacity(candidates.len() * 2);
    let last = candidates.len().saturating_sub(1);
    for (index, candidate) in candidates.iter().enumerate() {
        if is_relative_url(candidate.url) {
            let (path, _) = parse_url(candidate.url);
            let operand = if path.is_empty() {
                String::const_new("''")
            } else {
                import_name(path, loc, ctx)
            };
            children.push(CompoundChild::Simple(constant(operand, loc)));
        } else {
            children.push(CompoundChild::Simple(constant(
                format_compact!("\"{}\"", candidate.url),
                loc,
            )));
        }

        let not_last = index < last;
        let joiner = match candidate.descriptor {
            Some(descriptor) if not_last => format_compact!(" + ' {descriptor}, ' + "),
            Some(descriptor) => format_compact!(" + ' {descriptor}'"),
            None if not_last => String::const_new(" + ', ' + "),
            None => continue,
        };
        children.push(CompoundChild::Code(joiner));
    }
    ExpressionNode::Compound(CompoundExpressionNode::new(children, loc.clone()))
}

fn constant(content: String, loc: &SourceLocation) -> SimpleExpressionNode {
    SimpleExpressionNode::new(content, false, loc.clone()).with_const_type(ConstantType::CanHoist)
}

/// Collapse runs of spaces and escaped whitespace (`\t`, `\n`, `\f`, `\r`
/// written as two characters) into one space.
fn normalize_spaces(candidate: &str) -> std::string::String {
    let mut out = std::string::String::with_capacity(candidate.len());
    let mut rest = candidate;
    let mut in_run = false;
    while let Some(c) = rest.chars().next() {
        let width = match c {
            ' ' => 1,
            '\\' if matches!(rest.as_bytes().get(1), Some(b't' | b'n' | b'f' | b'r')) => 2,
            _ => 0,
        };
        if width > 0 {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
            rest = &rest[width..];
        } else {
            out.push(c);
            in_run = false;
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn parse_candidate(candidate: &str) -> ImageCandidate<'_> {
    let mut parts = candidate.trim().split(' ');
    let url = parts.next().unwrap_or_default();
    let descriptor = parts.next().filter(|d| !d.is_empty());
    ImageCandidate { url, descriptor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vellum_atelier_dom::{compile_with_options, DomCompilerOptions};
    use vellum_relief::CodegenMode;

    fn compile(template: &str) -> std::string::String {
        let mut compiler = DomCompilerOptions {
            mode: CodegenMode::Module,
            prefix_identifiers: true,
            hoist_static: true,
            ..Default::default()
        }
        .to_compiler_options();
        compiler.node_transforms.push(Arc::new(transform_srcset));
        compile_with_options(template, &compiler).code.to_string()
    }

    #[test]
    fn test_parse_candidates() {
        assert_eq!(
            parse_candidate(&normalize_spaces("  ./a.png   2x ")),
            ImageCandidate {
                url: "./a.png",
                descriptor: Some("2x")
            }
        );
        assert_eq!(normalize_spaces(r"./a.png\t\n200w"), "./a.png 200w");
        assert_eq!(parse_candidate("./a.png").descriptor, None);
    }

    #[test]
    fn test_mixed_candidates_compound() {
        let code = compile(r#"<img srcset="./a.png, ./a.png 2x, https://cdn.io/b.png 3x">"#);
        assert!(code.contains("import _imports_0 from './a.png'"));
        assert!(!code.contains("_imports_1"));
        assert!(code.contains(
            r#"_imports_0 + ', ' + _imports_0 + ' 2x, ' + "https://cdn.io/b.png" + ' 3x'"#
        ));
        assert!(code.contains("srcset: _hoisted_1"));
    }

    #[test]
    fn test_absolute_srcset_untouched() {
        let code = compile(r#"<img srcset="https://cdn.io/a.png 1x, /b.png 2x">"#);
        assert!(!code.contains("_imports_"));
        assert!(code.contains(r#"srcset: "https://cdn.io/a.png 1x, /b.png 2x""#));
    }

    #[test]
    fn test_empty_relative_path_is_empty_literal() {
        let code = compile(r#"<img srcset="~ 2x, ./a.png">"#);
        assert!(code.contains("import _imports_0 from './a.png'"));
        assert!(code.contains("= '' + ' 2x, ' + _imports_0"));
        assert!(!code.contains("=  +"));
    }
}
