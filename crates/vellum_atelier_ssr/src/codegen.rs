//! SSR code generation.
//!
//! The generated `ssrRender` function writes markup through `_push()`. Static
//! markup and `${}` holes accumulate in one template literal until a statement
//! (component, `if`, list, slot) forces a flush, so plain subtrees cost a single
//! `_push` call.

use vellum_atelier_core::transform::to_valid_asset_id;
use vellum_atelier_core::utils::inline_expression;
use vellum_atelier_dom::options::get_text_mode;
use vellum_carton::to_json_string;
use vellum_relief::ast::{
    ElementNode, ElementType, ExpressionNode, ForNode, IfNode, NodeId, NodeKind, NodeType, RuntimeHelper,
    TemplateAst,
};
use vellum_relief::errors::CompilerError;
use vellum_relief::{CodegenMode, TextMode};

use crate::options::SsrCompilerOptions;
use crate::{component, element};

/// SSR codegen result
#[derive(Debug, Default)]
pub struct SsrCodegenResult {
    /// Generated render function code, imports included
    pub code: String,
    /// Import preamble (module mode)
    pub preamble: String,
    pub errors: Vec<CompilerError>,
}

/// A part of a template literal
#[derive(Debug)]
enum TemplatePart {
    Static(String),
    Dynamic(String),
}

/// Where the component's fallthrough attributes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RootAttrs {
    None,
    /// The single root node receives `_attrs`
    Fallthrough,
    /// One of several root nodes; only CSS vars are injected
    CssVars,
}

impl RootAttrs {
    fn for_fragment(self) -> Self {
        match self {
            Self::Fallthrough => Self::CssVars,
            other => other,
        }
    }
}

/// SSR codegen context
pub struct SsrCodegenContext<'a> {
    pub(crate) ast: &'a TemplateAst,
    pub(crate) options: &'a SsrCompilerOptions,
    code: String,
    indent_level: usize,
    ssr_helpers: Vec<RuntimeHelper>,
    core_helpers: Vec<RuntimeHelper>,
    components: Vec<String>,
    parts: Vec<TemplatePart>,
    in_raw_text: bool,
    /// Nesting depth of slot functions; their elements carry `_scopeId`
    pub(crate) slot_depth: u32,
    pub(crate) errors: Vec<CompilerError>,
}

impl<'a> SsrCodegenContext<'a> {
    pub fn new(ast: &'a TemplateAst, options: &'a SsrCompilerOptions) -> Self {
        Self {
            ast,
            options,
            code: String::with_capacity(ast.source.len() * 2 + 128),
            indent_level: 1,
            ssr_helpers: Vec::new(),
            core_helpers: Vec::new(),
            components: Vec::new(),
            parts: Vec::new(),
            in_raw_text: false,
            slot_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Generate the `ssrRender` function for the whole template.
    pub fn generate(mut self) -> SsrCodegenResult {
        let ast = self.ast;
        let children = ast.children(NodeId::ROOT);
        let is_fragment = children.len() > 1
            && children
                .iter()
                .any(|&c| !matches!(ast.node_type(c), NodeType::Text | NodeType::Interpolation));
        let rendered = children
            .iter()
            .filter(|&&c| ast.node_type(c) != NodeType::Comment)
            .count();
        let root = if rendered == 1 {
            RootAttrs::Fallthrough
        } else {
            RootAttrs::CssVars
        };

        if is_fragment {
            self.push_static("<!--[-->");
            for &child in children {
                let child_root = match ast.node_type(child) {
                    NodeType::Comment => RootAttrs::None,
                    _ => root,
                };
                self.process_node(child, false, child_root);
            }
            self.push_static("<!--]-->");
        } else {
            for &child in children {
                self.process_node(child, false, root);
            }
        }
        self.flush_push();

        let body = std::mem::take(&mut self.code);
        self.assemble(&body)
    }

    fn assemble(self, body: &str) -> SsrCodegenResult {
        let is_module = self.options.mode == CodegenMode::Module;
        let mut preamble = String::new();
        if !self.core_helpers.is_empty() {
            preamble.push_str(&import_line(&self.core_helpers, "vue", is_module));
        }
        if !self.ssr_helpers.is_empty() {
            preamble.push_str(&import_line(&self.ssr_helpers, "vue/server-renderer", is_module));
        }
        if is_module {
            for import in &self.ast.root().imports {
                preamble.push_str(&format!("import {} from '{}'\n", import.exp.content, import.path));
            }
        }

        let mut code = preamble.clone();
        if !preamble.is_empty() {
            code.push('\n');
        }
        code.push_str(if is_module { "export " } else { "return " });
        let params = ["_ctx", "_push", "_parent", "_attrs"];
        let signature = if self.options.is_ts {
            params.map(|p| format!("{p}: any")).join(", ")
        } else {
            params.join(", ")
        };
        code.push_str(&format!("function ssrRender({signature}) {{\n"));

        for name in &self.components {
            code.push_str(&format!(
                "  const {} = _{}({})\n",
                to_valid_asset_id(name, "component"),
                RuntimeHelper::ResolveComponent.name(),
                to_json_string(name)
            ));
        }
        if let Some(vars) = &self.options.ssr_css_vars {
            code.push_str(&format!("  const _cssVars = {{ style: {vars} }}\n"));
        }
        if !self.components.is_empty() || self.options.ssr_css_vars.is_some() {
            code.push('\n');
        }
        code.push_str(body);
        code.push_str("}\n");

        SsrCodegenResult {
            code,
            preamble: if is_module { preamble } else { String::new() },
            errors: self.errors,
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Process a list of children nodes
    pub(crate) fn process_children(
        &mut self,
        children: &[NodeId],
        as_fragment: bool,
        disable_nested_fragments: bool,
        root: RootAttrs,
    ) {
        let root = if children.len() == 1 {
            root
        } else {
            root.for_fragment()
        };
        if as_fragment {
            self.push_static("<!--[-->");
        }
        for &child in children {
            self.process_node(child, disable_nested_fragments, root);
        }
        if as_fragment {
            self.push_static("<!--]-->");
        }
    }

    fn process_node(&mut self, id: NodeId, disable_nested_fragments: bool, root: RootAttrs) {
        let ast = self.ast;
        match &ast.node(id).kind {
            NodeKind::Element(el) => self.process_element(id, el, disable_nested_fragments, root),
            NodeKind::Text(text) => {
                if self.in_raw_text {
                    self.push_static(&text.content);
                } else {
                    self.push_static(&htmlize::escape_text(text.content.as_str()));
                }
            }
            NodeKind::Comment(comment) => {
                if self.options.comments {
                    self.push_static(&format!("<!--{}-->", comment.content));
                }
            }
            NodeKind::Interpolation(interp) => {
                let helper = self.use_ssr_helper(RuntimeHelper::SsrInterpolate);
                self.push_dynamic(format!("{helper}({})", inline_expression(&interp.content)));
            }
            NodeKind::If(if_node) => self.process_if(if_node, disable_nested_fragments, root),
            NodeKind::For(for_node) => self.process_for(for_node, disable_nested_fragments),
            // branches are visited through their `If`; text merging does not run for SSR
            NodeKind::Root(_)
            | NodeKind::IfBranch(_)
            | NodeKind::CompoundExpression(_)
            | NodeKind::TextCall(_) => {}
        }
    }

    fn process_element(
        &mut self,
        id: NodeId,
        el: &ElementNode,
        disable_nested_fragments: bool,
        root: RootAttrs,
    ) {
        match el.tag_type {
            ElementType::Element => self.process_plain_element(id, el, root),
            ElementType::Component => {
                component::process_component(self, id, el, disable_nested_fragments, root)
            }
            ElementType::Slot => component::process_slot_outlet(self, id, el),
            ElementType::Template => {
                let ast = self.ast;
                self.process_children(
                    ast.children(id),
                    false,
                    disable_nested_fragments,
                    RootAttrs::None,
                )
            }
        }
    }

    fn process_plain_element(&mut self, id: NodeId, el: &ElementNode, root: RootAttrs) {
        let (ast, options) = (self.ast, self.options);
        let tag = el.tag.as_str();
        self.push_static("<");
        self.push_static(tag);
        let inner = element::render_props(self, el);
        if let Some(attrs) = self.root_attrs_expr(root) {
            let helper = self.use_ssr_helper(RuntimeHelper::SsrRenderAttrs);
            self.push_dynamic(format!("{helper}({attrs})"));
        }
        if let Some(scope_id) = &options.scope_id {
            self.push_static(" ");
            self.push_static(scope_id);
            if self.slot_depth > 0 {
                self.push_dynamic("_scopeId".to_string());
            }
        }
        self.push_static(">");
        if vellum_carton::is_void_tag(tag) {
            return;
        }

        match inner {
            Some(element::InnerContent::Raw(exp)) => self.push_dynamic(exp),
            Some(element::InnerContent::Escaped(exp)) => {
                let helper = self.use_ssr_helper(RuntimeHelper::SsrInterpolate);
                self.push_dynamic(format!("{helper}({exp})"));
            }
            None => {
                let saved = self.in_raw_text;
                self.in_raw_text = get_text_mode(tag, el.ns, None) == TextMode::RawText;
                self.process_children(ast.children(id), false, false, RootAttrs::None);
                self.in_raw_text = saved;
            }
        }

        self.push_static("</");
        self.push_static(tag);
        self.push_static(">");
    }

    fn process_if(&mut self, if_node: &IfNode, disable_nested_fragments: bool, root: RootAttrs) {
        self.flush_push();
        let ast = self.ast;
        for (i, &branch_id) in if_node.branches.iter().enumerate() {
            let NodeKind::IfBranch(branch) = &ast.node(branch_id).kind else {
                continue;
            };
            let head = match (&branch.condition, i) {
                (Some(test), 0) => format!("if ({}) {{", inline_expression(test)),
                (Some(test), _) => format!("}} else if ({}) {{", inline_expression(test)),
                (None, _) => "} else {".to_string(),
            };
            self.push_line(&head);
            self.indent_level += 1;
            let needs_fragment = !disable_nested_fragments && branch.children.len() > 1;
            self.process_children(&branch.children, needs_fragment, disable_nested_fragments, root);
            self.flush_push();
            self.indent_level -= 1;
        }

        let has_else = if_node.branches.iter().any(|&b| {
            matches!(&ast.node(b).kind, NodeKind::IfBranch(branch) if branch.condition.is_none())
        });
        if !has_else {
            self.push_line("} else {");
            self.indent_level += 1;
            self.push_static("<!---->");
            self.flush_push();
            self.indent_level -= 1;
        }
        self.push_line("}");
    }

    fn process_for(&mut self, for_node: &ForNode, disable_nested_fragments: bool) {
        if !disable_nested_fragments {
            self.push_static("<!--[-->");
        }
        self.flush_push();

        let helper = self.use_ssr_helper(RuntimeHelper::SsrRenderList);
        self.push_line(&format!(
            "{helper}({}, ({}) => {{",
            inline_expression(&for_node.source),
            for_params(for_node)
        ));
        self.indent_level += 1;
        let needs_fragment = for_node.children.len() > 1;
        self.process_children(&for_node.children, needs_fragment, true, RootAttrs::None);
        self.flush_push();
        self.indent_level -= 1;
        self.push_line("})");

        if !disable_nested_fragments {
            self.push_static("<!--]-->");
        }
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Attribute object injected into a root node, if any.
    pub(crate) fn root_attrs_expr(&mut self, root: RootAttrs) -> Option<String> {
        let has_css_vars = self.options.ssr_css_vars.is_some();
        match root {
            RootAttrs::Fallthrough if has_css_vars => {
                let merge = self.use_core_helper(RuntimeHelper::MergeProps);
                Some(format!("{merge}(_attrs, _cssVars)"))
            }
            RootAttrs::Fallthrough => Some("_attrs".to_string()),
            RootAttrs::CssVars if has_css_vars => Some("_cssVars".to_string()),
            RootAttrs::CssVars | RootAttrs::None => None,
        }
    }

    /// `_component_Foo`, declared at the top of the render function.
    pub(crate) fn register_component(&mut self, name: &str) -> String {
        if !self.components.iter().any(|c| c == name) {
            self.components.push(name.to_string());
        }
        self.use_core_helper(RuntimeHelper::ResolveComponent);
        to_valid_asset_id(name, "component").to_string()
    }

    pub(crate) fn push_static(&mut self, s: &str) {
        if let Some(TemplatePart::Static(last)) = self.parts.last_mut() {
            last.push_str(s);
        } else {
            self.parts.push(TemplatePart::Static(s.to_string()));
        }
    }

    pub(crate) fn push_dynamic(&mut self, expr: String) {
        self.parts.push(TemplatePart::Dynamic(expr));
    }

    /// Emit the pending template literal as a `_push()` call.
    pub(crate) fn flush_push(&mut self) {
        if self.parts.is_empty() {
            return;
        }
        let parts = std::mem::take(&mut self.parts);
        let mut line = String::from("_push(`");
        for part in &parts {
            match part {
                TemplatePart::Static(s) => line.push_str(&escape_template_literal(s)),
                TemplatePart::Dynamic(expr) => {
                    line.push_str("${");
                    line.push_str(expr);
                    line.push('}');
                }
            }
        }
        line.push_str("`)");
        self.push_line(&line);
    }

    pub(crate) fn use_ssr_helper(&mut self, helper: RuntimeHelper) -> String {
        if !self.ssr_helpers.contains(&helper) {
            self.ssr_helpers.push(helper);
        }
        format!("_{}", helper.name())
    }

    pub(crate) fn use_core_helper(&mut self, helper: RuntimeHelper) -> String {
        if !self.core_helpers.contains(&helper) {
            self.core_helpers.push(helper);
        }
        format!("_{}", helper.name())
    }

    pub(crate) fn push_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.code.push_str("  ");
        }
    }

    pub(crate) fn push_line(&mut self, s: &str) {
        self.push_indent();
        self.code.push_str(s);
        self.code.push('\n');
    }

    pub(crate) fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub(crate) fn deindent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }
}

fn import_line(helpers: &[RuntimeHelper], from: &str, is_module: bool) -> String {
    if is_module {
        let list: Vec<String> = helpers
            .iter()
            .map(|h| format!("{} as _{}", h.name(), h.name()))
            .collect();
        format!("import {{ {} }} from \"{from}\"\n", list.join(", "))
    } else {
        let list: Vec<String> = helpers
            .iter()
            .map(|h| format!("{}: _{}", h.name(), h.name()))
            .collect();
        format!("const {{ {} }} = require(\"{from}\")\n", list.join(", "))
    }
}

/// `(item, index)`; gaps before a later alias become `_`, `__`.
fn for_params(for_node: &ForNode) -> String {
    let aliases = [
        &for_node.value_alias,
        &for_node.key_alias,
        &for_node.object_index_alias,
    ];
    let used = aliases.iter().rposition(|a| a.is_some()).map_or(0, |i| i + 1);
    aliases[..used]
        .iter()
        .enumerate()
        .map(|(i, alias)| match alias {
            Some(exp) => exp.source_text().to_string(),
            None => "_".repeat(i + 1),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inline code of an expression.
pub(crate) fn js(exp: &ExpressionNode) -> String {
    inline_expression(exp).into()
}

fn escape_template_literal(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_template_literal() {
        assert_eq!(escape_template_literal("`${a}`"), "\\`\\${a}\\`");
        assert_eq!(escape_template_literal("a\\b"), "a\\\\b");
        assert_eq!(escape_template_literal("$x"), "$x");
    }

    #[test]
    fn test_import_line_modes() {
        let helpers = [RuntimeHelper::SsrInterpolate];
        assert_eq!(
            import_line(&helpers, "vue/server-renderer", true),
            "import { ssrInterpolate as _ssrInterpolate } from \"vue/server-renderer\"\n"
        );
        assert_eq!(
            import_line(&helpers, "vue/server-renderer", false),
            "const { ssrInterpolate: _ssrInterpolate } = require(\"vue/server-renderer\")\n"
        );
    }
}
