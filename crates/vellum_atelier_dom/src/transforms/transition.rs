//! `<Transition>` must wrap a single element or component.

use vellum_atelier_core::{TransformAction, TransformContext};
use vellum_relief::ast::{ElementType, NodeId, NodeKind, RuntimeHelper, SourceLocation, TemplateAst};

use crate::errors::DomErrorCode;

pub fn warn_transition_children(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    let is_transition = ctx.ast.element(node).is_some_and(|el| {
        el.tag_type == ElementType::Component && el.builtin == Some(RuntimeHelper::Transition)
    });
    if !is_transition {
        return TransformAction::Continue;
    }
    TransformAction::Exit(Box::new(move |ctx: &mut TransformContext| {
        let children = effective_children(&ctx.ast, node);
        let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
            return;
        };
        if has_multiple_children(&ctx.ast, node) {
            let start = ctx.ast.node(first).loc.start;
            let end = ctx.ast.node(last).loc.end;
            ctx.on_error(
                DomErrorCode::TransitionInvalidChildren
                    .into_error(Some(SourceLocation::new(start, end, ""))),
            );
        }
    }))
}

/// Children that render something: comments and blank text are skipped.
fn effective_children(ast: &TemplateAst, node: NodeId) -> Vec<NodeId> {
    ast.children(node)
        .iter()
        .copied()
        .filter(|&c| !matches!(ast.node(c).kind, NodeKind::Comment(_)) && !ast.is_whitespace_text(c))
        .collect()
}

fn has_multiple_children(ast: &TemplateAst, node: NodeId) -> bool {
    let children = effective_children(ast, node);
    let [child] = children.as_slice() else {
        return true;
    };
    match &ast.node(*child).kind {
        NodeKind::For(_) => true,
        NodeKind::If(if_node) => if_node
            .branches
            .iter()
            .any(|&branch| has_multiple_children(ast, branch)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, DomCompilerOptions, DomErrorCode};

    fn transition_errors(source: &str) -> usize {
        compile(source, &DomCompilerOptions::default())
            .errors
            .iter()
            .filter(|e| e.code == DomErrorCode::TransitionInvalidChildren.code())
            .count()
    }

    #[test]
    fn test_single_child_is_fine() {
        assert_eq!(transition_errors("<transition><div/></transition>"), 0);
        assert_eq!(
            transition_errors("<Transition>\n  <!-- note -->\n  <div/>\n</Transition>"),
            0
        );
        assert_eq!(transition_errors("<transition></transition>"), 0);
    }

    #[test]
    fn test_multiple_children() {
        assert_eq!(transition_errors("<transition><div/><span/></transition>"), 1);
    }

    #[test]
    fn test_v_for_child() {
        assert_eq!(
            transition_errors(r#"<transition><div v-for="i in list" :key="i"/></transition>"#),
            1
        );
    }

    #[test]
    fn test_v_if_branches() {
        assert_eq!(
            transition_errors(r#"<transition><div v-if="a"/><span v-else/></transition>"#),
            0
        );
        assert_eq!(
            transition_errors(
                r#"<transition><template v-if="a"><div/><div/></template></transition>"#
            ),
            1
        );
    }
}
