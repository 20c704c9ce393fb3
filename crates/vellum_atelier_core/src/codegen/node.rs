//! Printing of codegen nodes and template nodes.

use vellum_carton::{is_simple_identifier, to_json_string, PatchFlags, PATCH_FLAG_HOISTED};
use vellum_relief::ast::{
    CacheExpression, Callee, CompoundChild, CompoundExpressionNode, ConditionalExpression,
    DirectiveArgument, DirectiveRef, ExpressionNode, FunctionExpression, JsNode, NodeId,
    NodeKind, ObjectExpression, Property, RuntimeHelper, SimpleExpressionNode, TemplateAst,
    VNodeCall, VNodeChildren, VNodeTag,
};

use super::context::CodegenContext;
use crate::transform::{block_helper, vnode_helper};

/// An argument of a generated call: raw code or a node.
enum Arg<'n> {
    Raw(String),
    Node(&'n JsNode),
    Children(&'n VNodeChildren),
}

pub(super) fn gen_node(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, node: &JsNode) {
    match node {
        JsNode::Simple(exp) => gen_simple(ctx, exp),
        JsNode::Compound(exp) => gen_compound(ctx, exp),
        JsNode::VNode(vnode) => gen_vnode(ctx, ast, vnode),
        JsNode::Call(call) => {
            ctx.push_pure();
            gen_callee(ctx, &call.callee);
            ctx.push("(");
            gen_node_list(ctx, ast, &call.arguments, false);
            ctx.push(")");
        }
        JsNode::Object(obj) => gen_object(ctx, ast, obj),
        JsNode::Array(items) => gen_array(ctx, ast, items),
        JsNode::Function(func) => gen_function(ctx, ast, func),
        JsNode::Conditional(cond) => gen_conditional(ctx, ast, cond),
        JsNode::Cache(cache) => gen_cache(ctx, ast, cache),
        JsNode::Node(id) => gen_template_node(ctx, ast, *id),
    }
}

pub(super) fn gen_template_node(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, id: NodeId) {
    let node = ast.node(id);
    match &node.kind {
        NodeKind::Element(el) => match &el.codegen_node {
            Some(codegen) => gen_node(ctx, ast, codegen),
            None => ctx.push("null"),
        },
        NodeKind::If(n) => gen_optional(ctx, ast, n.codegen_node.as_ref()),
        NodeKind::For(n) => gen_optional(ctx, ast, n.codegen_node.as_ref()),
        NodeKind::TextCall(n) => gen_optional(ctx, ast, n.codegen_node.as_ref()),
        NodeKind::Root(n) => gen_optional(ctx, ast, n.codegen_node.as_ref()),
        NodeKind::IfBranch(_) => ctx.push("null"),
        NodeKind::Text(text) => ctx.push_mapped(&to_json_string(&text.content), &node.loc),
        NodeKind::Comment(comment) => {
            ctx.push_pure();
            ctx.push_helper(RuntimeHelper::CreateComment);
            ctx.push("(");
            ctx.push_mapped(&to_json_string(&comment.content), &node.loc);
            ctx.push(")");
        }
        NodeKind::Interpolation(interp) => {
            ctx.push_pure();
            ctx.push_helper(RuntimeHelper::ToDisplayString);
            ctx.push("(");
            gen_expression(ctx, &interp.content);
            ctx.push(")");
        }
        NodeKind::CompoundExpression(c) => gen_compound(ctx, c),
    }
}

fn gen_optional(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, node: Option<&JsNode>) {
    match node {
        Some(node) => gen_node(ctx, ast, node),
        None => ctx.push("null"),
    }
}

pub(super) fn gen_expression(ctx: &mut CodegenContext<'_>, exp: &ExpressionNode) {
    match exp {
        ExpressionNode::Simple(s) => gen_simple(ctx, s),
        ExpressionNode::Compound(c) => gen_compound(ctx, c),
    }
}

fn gen_simple(ctx: &mut CodegenContext<'_>, exp: &SimpleExpressionNode) {
    if exp.is_static {
        ctx.push_mapped(&to_json_string(&exp.content), &exp.loc);
    } else {
        ctx.push_mapped(&exp.content, &exp.loc);
    }
}

fn gen_compound(ctx: &mut CodegenContext<'_>, exp: &CompoundExpressionNode) {
    for child in &exp.children {
        match child {
            CompoundChild::Simple(s) => gen_simple(ctx, s),
            CompoundChild::Compound(c) => gen_compound(ctx, c),
            CompoundChild::Interpolation(inner) => {
                ctx.push_helper(RuntimeHelper::ToDisplayString);
                ctx.push("(");
                gen_expression(ctx, inner);
                ctx.push(")");
            }
            CompoundChild::Text(text) => ctx.push(&to_json_string(text)),
            CompoundChild::Code(code) => ctx.push(code),
            CompoundChild::Symbol(helper) => ctx.push_helper(*helper),
        }
    }
}

fn gen_callee(ctx: &mut CodegenContext<'_>, callee: &Callee) {
    match callee {
        Callee::Symbol(helper) => ctx.push_helper(*helper),
        Callee::String(name) => ctx.push(name),
    }
}

/// Whether an item keeps an array on one line.
fn is_text_like(ast: &TemplateAst, node: &JsNode) -> bool {
    match node {
        JsNode::Simple(_) | JsNode::Compound(_) => true,
        JsNode::Node(id) => matches!(
            ast.node(*id).kind,
            NodeKind::Text(_) | NodeKind::Interpolation(_) | NodeKind::CompoundExpression(_)
        ),
        _ => false,
    }
}

fn gen_node_list(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, nodes: &[JsNode], multilines: bool) {
    for (i, node) in nodes.iter().enumerate() {
        if let JsNode::Array(items) = node {
            gen_array(ctx, ast, items);
        } else {
            gen_node(ctx, ast, node);
        }
        if i + 1 < nodes.len() {
            if multilines {
                ctx.push(",");
                ctx.newline();
            } else {
                ctx.push(", ");
            }
        }
    }
}

fn gen_array(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, items: &[JsNode]) {
    let multilines = items.len() > 3 || items.iter().any(|n| !is_text_like(ast, n));
    ctx.push("[");
    if multilines {
        ctx.indent();
    }
    gen_node_list(ctx, ast, items, multilines);
    if multilines {
        ctx.deindent(false);
    }
    ctx.push("]");
}

fn gen_template_children(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, children: &[NodeId]) {
    let items: Vec<JsNode> = children.iter().map(|&id| JsNode::Node(id)).collect();
    gen_array(ctx, ast, &items);
}

fn gen_property_key(ctx: &mut CodegenContext<'_>, key: &ExpressionNode) {
    match key {
        ExpressionNode::Compound(c) => {
            ctx.push("[");
            gen_compound(ctx, c);
            ctx.push("]");
        }
        ExpressionNode::Simple(s) if s.is_static => {
            let text = if is_simple_identifier(&s.content) {
                s.content.to_string()
            } else {
                to_json_string(&s.content).to_string()
            };
            ctx.push_mapped(&text, &s.loc);
        }
        ExpressionNode::Simple(s) => {
            ctx.push("[");
            ctx.push_mapped(&s.content, &s.loc);
            ctx.push("]");
        }
    }
}

fn gen_object(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, obj: &ObjectExpression) {
    if obj.properties.is_empty() {
        ctx.push("{}");
        return;
    }
    let multilines = obj.properties.len() > 1
        || obj
            .properties
            .iter()
            .any(|p| !matches!(p.value, JsNode::Simple(_)));
    ctx.push(if multilines { "{" } else { "{ " });
    if multilines {
        ctx.indent();
    }
    for (i, Property { key, value }) in obj.properties.iter().enumerate() {
        gen_property_key(ctx, key);
        ctx.push(": ");
        gen_node(ctx, ast, value);
        if i + 1 < obj.properties.len() {
            ctx.push(",");
            ctx.newline();
        }
    }
    if multilines {
        ctx.deindent(false);
    }
    ctx.push(if multilines { "}" } else { " }" });
}

fn gen_function(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, func: &FunctionExpression) {
    ctx.push("(");
    ctx.push(&func.params.join(", "));
    ctx.push(") => ");
    if func.newline {
        ctx.push("{");
        ctx.indent();
        ctx.push("return ");
    }
    gen_node(ctx, ast, &func.returns);
    if func.newline {
        ctx.deindent(false);
        ctx.push("}");
    }
}

fn gen_conditional(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, cond: &ConditionalExpression) {
    match cond.test.as_ref() {
        JsNode::Simple(test) => {
            let needs_parens = !is_simple_identifier(&test.content);
            if needs_parens {
                ctx.push("(");
            }
            gen_simple(ctx, test);
            if needs_parens {
                ctx.push(")");
            }
        }
        other => {
            ctx.push("(");
            gen_node(ctx, ast, other);
            ctx.push(")");
        }
    }
    if cond.newline {
        ctx.indent();
    }
    ctx.indent_level += 1;
    if !cond.newline {
        ctx.push(" ");
    }
    ctx.push("? ");
    gen_node(ctx, ast, &cond.consequent);
    ctx.indent_level -= 1;
    if cond.newline {
        ctx.newline();
    } else {
        ctx.push(" ");
    }
    ctx.push(": ");
    let nested = matches!(cond.alternate.as_ref(), JsNode::Conditional(_));
    if !nested {
        ctx.indent_level += 1;
    }
    gen_node(ctx, ast, &cond.alternate);
    if !nested {
        ctx.indent_level -= 1;
    }
    if cond.newline {
        ctx.deindent(true);
    }
}

fn gen_cache(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, cache: &CacheExpression) {
    let slot = format!("_cache[{}]", cache.index);
    ctx.push(&slot);
    ctx.push(" || (");
    if cache.is_vnode {
        ctx.indent();
        ctx.push_helper(RuntimeHelper::SetBlockTracking);
        ctx.push("(-1),");
        ctx.newline();
    }
    ctx.push(&slot);
    ctx.push(" = ");
    gen_node(ctx, ast, &cache.value);
    if cache.is_vnode {
        ctx.push(",");
        ctx.newline();
        ctx.push_helper(RuntimeHelper::SetBlockTracking);
        ctx.push("(1),");
        ctx.newline();
        ctx.push(&slot);
        ctx.deindent(false);
    }
    ctx.push(")");
}

fn patch_flag_text(vnode: &VNodeCall) -> Option<String> {
    if vnode.hoisted {
        return Some(format!("{} /* HOISTED */", PATCH_FLAG_HOISTED));
    }
    if vnode.patch_flag.is_empty() {
        return None;
    }
    Some(format!(
        "{} /* {} */",
        vnode.patch_flag.bits(),
        PatchFlags::describe(vnode.patch_flag)
    ))
}

fn dynamic_props_text(props: &[vellum_carton::String]) -> String {
    let quoted: Vec<String> = props.iter().map(|p| to_json_string(p).to_string()).collect();
    format!("[{}]", quoted.join(", "))
}

fn directive_array(dir: &DirectiveArgument) -> JsNode {
    let raw = |code: &str| JsNode::simple(code, false);
    let mut items = vec![match &dir.directive {
        DirectiveRef::Helper(helper) => raw(&format!("_{}", helper.name())),
        DirectiveRef::Resolved(id) => raw(id),
    }];
    let has_modifiers = !dir.modifiers.is_empty();
    if dir.exp.is_some() || dir.arg.is_some() || has_modifiers {
        items.push(dir.exp.clone().unwrap_or_else(|| raw("void 0")));
    }
    if dir.arg.is_some() || has_modifiers {
        items.push(dir.arg.clone().unwrap_or_else(|| raw("void 0")));
    }
    if has_modifiers {
        let properties = dir
            .modifiers
            .iter()
            .map(|m| Property::static_key(m.clone(), raw("true")))
            .collect();
        items.push(JsNode::Object(ObjectExpression { properties }));
    }
    JsNode::Array(items)
}

fn gen_vnode(ctx: &mut CodegenContext<'_>, ast: &TemplateAst, vnode: &VNodeCall) {
    ctx.push_pure();
    let has_directives = !vnode.directives.is_empty();
    if has_directives {
        ctx.push_helper(RuntimeHelper::WithDirectives);
        ctx.push("(");
    }
    if vnode.is_block {
        ctx.push("(");
        ctx.push_helper(RuntimeHelper::OpenBlock);
        ctx.push(if vnode.disable_tracking { "(true), " } else { "(), " });
    }
    let helper = if vnode.is_block {
        block_helper(vnode.is_component)
    } else {
        vnode_helper(vnode.is_component)
    };
    ctx.push_helper(helper);
    ctx.push("(");

    let tag = match &vnode.tag {
        VNodeTag::String(tag) => to_json_string(tag).to_string(),
        VNodeTag::Symbol(helper) => ctx.helper(*helper),
        VNodeTag::Expr(code) => code.to_string(),
    };
    let mut args: Vec<Option<Arg<'_>>> = vec![
        Some(Arg::Raw(tag)),
        vnode.props.as_ref().map(Arg::Node),
        vnode.children.as_ref().map(Arg::Children),
        patch_flag_text(vnode).map(Arg::Raw),
        vnode
            .dynamic_props
            .as_deref()
            .map(|props| Arg::Raw(dynamic_props_text(props))),
    ];
    while matches!(args.last(), Some(None)) {
        args.pop();
    }
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            ctx.push(", ");
        }
        match arg {
            None => ctx.push("null"),
            Some(Arg::Raw(code)) => ctx.push(code),
            Some(Arg::Node(node)) => gen_node(ctx, ast, node),
            Some(Arg::Children(children)) => match children {
                VNodeChildren::Nodes(nodes) => gen_template_children(ctx, ast, nodes),
                VNodeChildren::Text(id) => gen_template_node(ctx, ast, *id),
                VNodeChildren::Expr(node) => gen_node(ctx, ast, node),
            },
        }
    }
    ctx.push(")");
    if vnode.is_block {
        ctx.push(")");
    }
    if has_directives {
        ctx.push(", ");
        let dirs: Vec<JsNode> = vnode.directives.iter().map(directive_array).collect();
        gen_array(ctx, ast, &dirs);
        ctx.push(")");
    }
}

/// `const _component_foo = _resolveComponent("foo")` lines.
pub(super) fn gen_assets(ctx: &mut CodegenContext<'_>, assets: &[vellum_carton::String], kind: &str) {
    let resolver = if kind == "component" {
        RuntimeHelper::ResolveComponent
    } else {
        RuntimeHelper::ResolveDirective
    };
    for (i, asset) in assets.iter().enumerate() {
        let (name, self_reference) = match asset.strip_suffix("__self") {
            Some(name) => (name, true),
            None => (asset.as_str(), false),
        };
        ctx.push("const ");
        ctx.push(&crate::transform::to_valid_asset_id(name, kind));
        ctx.push(" = ");
        ctx.push_helper(resolver);
        ctx.push("(");
        ctx.push(&to_json_string(name));
        if self_reference {
            ctx.push(", true");
        }
        ctx.push(")");
        if ctx.options.is_ts {
            ctx.push("!");
        }
        if i + 1 < assets.len() {
            ctx.newline();
        }
    }
}
