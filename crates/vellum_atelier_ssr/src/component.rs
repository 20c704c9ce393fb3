//! Components, slot outlets and the built-in components.
//!
//! A component becomes a `_ssrRenderComponent` call whose slots are
//! `_withCtx` functions writing through their own `_push`. Slot templates
//! guarded by `v-if` or repeated with `v-for` are passed through
//! `_createSlots`.

use vellum_atelier_core::transforms::parse_for_expression;
use vellum_atelier_core::transforms::v_for::for_loop_params;
use vellum_atelier_core::utils::is_non_whitespace_content;
use vellum_carton::{camelize, is_simple_identifier, to_json_string};
use vellum_relief::ast::{
    DirectiveKind, DirectiveNode, ElementNode, ElementType, ExpressionNode, NodeId, PropNode,
    RuntimeHelper, TemplateAst,
};

use crate::codegen::{js, RootAttrs, SsrCodegenContext};
use crate::element::model_expression;
use crate::errors::SsrErrorCode;

pub(crate) fn process_component(
    ctx: &mut SsrCodegenContext<'_>,
    id: NodeId,
    el: &ElementNode,
    disable_nested_fragments: bool,
    root: RootAttrs,
) {
    match el.builtin {
        Some(RuntimeHelper::Teleport) => process_teleport(ctx, id, el),
        Some(RuntimeHelper::TransitionGroup) => process_transition_group(ctx, id, el),
        // Transition, KeepAlive and Suspense render their default content in place
        Some(_) => {
            let ast = ctx.ast;
            let children: Vec<NodeId> = ast
                .children(id)
                .iter()
                .copied()
                .filter(|&c| !is_named_slot_template(ast, c))
                .collect();
            ctx.process_children(&children, false, disable_nested_fragments, root);
        }
        None => render_component(ctx, id, el, root),
    }
}

fn render_component(ctx: &mut SsrCodegenContext<'_>, id: NodeId, el: &ElementNode, root: RootAttrs) {
    ctx.flush_push();
    let component = resolve_component(ctx, el);
    let props = build_component_props(ctx, el);
    let props = match (props, ctx.root_attrs_expr(root)) {
        (None, None) => "null".to_string(),
        (Some(props), None) => props,
        (None, Some(attrs)) => attrs,
        (Some(props), Some(attrs)) => {
            let merge = ctx.use_core_helper(RuntimeHelper::MergeProps);
            format!("{merge}({props}, {attrs})")
        }
    };
    let render = ctx.use_ssr_helper(RuntimeHelper::SsrRenderComponent);
    let slots = collect_slots(ctx.ast, id, el);
    if slots.is_empty() {
        ctx.push_line(&format!("_push({render}({component}, {props}, null, _parent))"));
        return;
    }

    let (fixed, dynamic): (Vec<_>, Vec<_>) = slots
        .into_iter()
        .partition(|slot| matches!(slot, SlotEntry::Static(_)));
    let stability = if dynamic.is_empty() { 1 } else { 2 };
    let open = if dynamic.is_empty() {
        "{".to_string()
    } else {
        format!("{}({{", ctx.use_core_helper(RuntimeHelper::CreateSlots))
    };
    ctx.push_line(&format!("_push({render}({component}, {props}, {open}"));
    ctx.indent();
    for slot in &fixed {
        if let SlotEntry::Static(slot) = slot {
            let key = match &slot.name {
                SlotName::Static(name) => property_key(name),
                SlotName::Dynamic(exp) => format!("[{exp}]"),
            };
            emit_slot_fn(ctx, &format!("{key}: "), slot, ",");
        }
    }
    ctx.push_line(&format!("_: {stability}"));
    ctx.deindent();
    if dynamic.is_empty() {
        ctx.push_line("}, _parent))");
        return;
    }

    ctx.push_line("}, [");
    ctx.indent();
    let mut branch_key = 0;
    for entry in &dynamic {
        emit_dynamic_slot(ctx, entry, &mut branch_key);
    }
    ctx.deindent();
    ctx.push_line("]), _parent))");
}

/// `_component_Foo`, or the `is` target of `<component>`.
fn resolve_component(ctx: &mut SsrCodegenContext<'_>, el: &ElementNode) -> String {
    if el.tag == "component" || el.tag == "Component" {
        match el.find_prop("is", false, false) {
            Some(PropNode::Attribute(attr)) => {
                if let Some(value) = &attr.value {
                    let name = value.content.strip_prefix("vue:").unwrap_or(value.content.as_str());
                    return ctx.register_component(name);
                }
            }
            Some(PropNode::Directive(dir)) => {
                if let Some(exp) = &dir.exp {
                    let resolve = ctx.use_core_helper(RuntimeHelper::ResolveDynamicComponent);
                    return format!("{resolve}({})", js(exp));
                }
            }
            None => {}
        }
    }
    ctx.register_component(&el.tag)
}

// ----------------------------------------------------------------------
// Props
// ----------------------------------------------------------------------

enum PropsSegment {
    Object(Vec<String>),
    Spread(String),
}

fn push_entry(segments: &mut Vec<PropsSegment>, entry: String) {
    match segments.last_mut() {
        Some(PropsSegment::Object(entries)) => entries.push(entry),
        _ => segments.push(PropsSegment::Object(vec![entry])),
    }
}

/// Props object of a component, `None` when it has none.
fn build_component_props(ctx: &mut SsrCodegenContext<'_>, el: &ElementNode) -> Option<String> {
    let is_dynamic_component = el.tag == "component" || el.tag == "Component";
    let mut segments = Vec::new();

    for prop in &el.props {
        match prop {
            PropNode::Attribute(attr) => {
                if attr.name == "ref" || (attr.name == "is" && is_dynamic_component) {
                    continue;
                }
                let value = attr
                    .value
                    .as_ref()
                    .map(|v| to_json_string(&v.content).to_string())
                    .unwrap_or_else(|| "\"\"".to_string());
                push_entry(&mut segments, format!("{}: {value}", property_key(&attr.name)));
            }
            PropNode::Directive(dir) if dir.kind == DirectiveKind::Model => {
                let Some(model) = model_expression(ctx, dir) else {
                    continue;
                };
                let name = dir
                    .arg
                    .as_ref()
                    .and_then(|a| a.static_content())
                    .unwrap_or("modelValue");
                push_entry(&mut segments, format!("{}: {model}", property_key(name)));
                push_entry(
                    &mut segments,
                    format!(
                        "{}: $event => (({model}) = $event)",
                        to_json_string(&format!("onUpdate:{name}"))
                    ),
                );
            }
            PropNode::Directive(dir) => {
                let Some(exp) = dir.exp.as_ref().filter(|_| !dir.exp_is_empty()) else {
                    continue;
                };
                match dir.kind {
                    DirectiveKind::Bind => match &dir.arg {
                        None => segments.push(PropsSegment::Spread(js(exp))),
                        Some(arg) => match arg.static_content() {
                            Some("ref" | "key") => {}
                            Some("is") if is_dynamic_component => {}
                            Some(name) => {
                                let name = if dir.has_modifier("camel") {
                                    camelize(name).to_string()
                                } else {
                                    name.to_string()
                                };
                                push_entry(
                                    &mut segments,
                                    format!("{}: {}", property_key(&name), js(exp)),
                                );
                            }
                            None => push_entry(
                                &mut segments,
                                format!("[{} || \"\"]: {}", js(arg), js(exp)),
                            ),
                        },
                    },
                    // a separate object so `style` merges with any bound style
                    DirectiveKind::Show => segments.push(PropsSegment::Object(vec![format!(
                        "style: ({}) ? null : {{ display: \"none\" }}",
                        js(exp)
                    )])),
                    _ => {}
                }
            }
        }
    }

    let rendered: Vec<String> = segments
        .into_iter()
        .map(|segment| match segment {
            PropsSegment::Object(entries) => format!("{{ {} }}", entries.join(", ")),
            PropsSegment::Spread(exp) => exp,
        })
        .collect();
    match rendered.len() {
        0 => None,
        1 => rendered.into_iter().next(),
        _ => {
            let merge = ctx.use_core_helper(RuntimeHelper::MergeProps);
            Some(format!("{merge}({})", rendered.join(", ")))
        }
    }
}

fn property_key(name: &str) -> String {
    if is_simple_identifier(name) {
        name.to_string()
    } else {
        to_json_string(name).to_string()
    }
}

// ----------------------------------------------------------------------
// Slots
// ----------------------------------------------------------------------

#[derive(Debug)]
enum SlotName {
    Static(String),
    Dynamic(String),
}

impl SlotName {
    fn from_dir(dir: &DirectiveNode) -> Self {
        match &dir.arg {
            None => Self::Static("default".to_string()),
            Some(arg) => match arg.static_content() {
                Some(name) => Self::Static(name.to_string()),
                None => Self::Dynamic(js(arg)),
            },
        }
    }

    fn value(&self) -> String {
        match self {
            Self::Static(name) => to_json_string(name).to_string(),
            Self::Dynamic(exp) => exp.clone(),
        }
    }
}

#[derive(Debug)]
struct SlotFn {
    name: SlotName,
    params: Option<String>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
enum SlotEntry {
    Static(SlotFn),
    /// `v-if` / `v-else-if` / `v-else` chain of slot templates
    Conditional(Vec<(Option<String>, SlotFn)>),
    Looped {
        source: String,
        params: String,
        slot: SlotFn,
    },
}

fn slot_fn(dir: &DirectiveNode, children: &[NodeId]) -> SlotFn {
    SlotFn {
        name: SlotName::from_dir(dir),
        params: dir.exp.as_ref().filter(|_| !dir.exp_is_empty()).map(js),
        children: children.to_vec(),
    }
}

fn is_named_slot_template(ast: &TemplateAst, node: NodeId) -> bool {
    ast.element(node).is_some_and(|el| {
        el.tag_type == ElementType::Template
            && el
                .find_dir(&DirectiveKind::Slot)
                .and_then(|dir| dir.arg.as_ref())
                .is_some_and(|arg| !arg.is_static_key("default"))
    })
}

fn collect_slots(ast: &TemplateAst, id: NodeId, el: &ElementNode) -> Vec<SlotEntry> {
    let children = ast.children(id);
    if let Some(dir) = el.find_dir(&DirectiveKind::Slot) {
        return vec![SlotEntry::Static(slot_fn(dir, children))];
    }

    let mut entries = Vec::new();
    let mut implicit = Vec::new();
    for &child in children {
        let template = ast
            .element(child)
            .filter(|c| c.tag_type == ElementType::Template)
            .and_then(|c| c.find_dir(&DirectiveKind::Slot).map(|dir| (c, dir)));
        let Some((template, dir)) = template else {
            implicit.push(child);
            continue;
        };
        let slot = slot_fn(dir, ast.children(child));

        if let Some(test) = template.find_dir(&DirectiveKind::If) {
            entries.push(SlotEntry::Conditional(vec![(test.exp.as_ref().map(js), slot)]));
        } else if let Some(branch) = template
            .find_dir(&DirectiveKind::ElseIf)
            .or_else(|| template.find_dir(&DirectiveKind::Else))
        {
            // without a preceding v-if slot the branch is dropped
            if let Some(SlotEntry::Conditional(branches)) = entries.last_mut() {
                let test = match branch.kind {
                    DirectiveKind::ElseIf => branch.exp.as_ref().map(js),
                    _ => None,
                };
                branches.push((test, slot));
            }
        } else if let Some(v_for) = template.find_dir(&DirectiveKind::For) {
            let parsed = match &v_for.exp {
                Some(ExpressionNode::Simple(exp)) => parse_for_expression(exp),
                _ => None,
            };
            if let Some(parsed) = parsed {
                let params = for_loop_params(&parsed)
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                entries.push(SlotEntry::Looped {
                    source: parsed.source.content.to_string(),
                    params,
                    slot,
                });
            }
        } else {
            entries.push(SlotEntry::Static(slot));
        }
    }

    if implicit.iter().any(|&c| is_non_whitespace_content(ast, c)) {
        entries.push(SlotEntry::Static(SlotFn {
            name: SlotName::Static("default".to_string()),
            params: None,
            children: implicit,
        }));
    }
    entries
}

/// `{prefix}_withCtx((params, _push, _parent, _scopeId) => { ... }){suffix}`
fn emit_slot_fn(ctx: &mut SsrCodegenContext<'_>, prefix: &str, slot: &SlotFn, suffix: &str) {
    let with_ctx = ctx.use_core_helper(RuntimeHelper::WithCtx);
    let params = slot.params.as_deref().unwrap_or("_");
    ctx.push_line(&format!(
        "{prefix}{with_ctx}(({params}, _push, _parent, _scopeId) => {{"
    ));
    ctx.indent();
    ctx.slot_depth += 1;
    ctx.process_children(&slot.children, false, false, RootAttrs::None);
    ctx.flush_push();
    ctx.slot_depth -= 1;
    ctx.deindent();
    ctx.push_line(&format!("}}){suffix}"));
}

/// One `_createSlots` entry: `{ name, fn[, key] }`.
fn emit_slot_object(ctx: &mut SsrCodegenContext<'_>, slot: &SlotFn, key: Option<usize>) {
    ctx.indent();
    ctx.push_line(&format!("name: {},", slot.name.value()));
    let suffix = if key.is_some() { "," } else { "" };
    emit_slot_fn(ctx, "fn: ", slot, suffix);
    if let Some(key) = key {
        ctx.push_line(&format!("key: \"{key}\""));
    }
    ctx.deindent();
}

fn emit_dynamic_slot(ctx: &mut SsrCodegenContext<'_>, entry: &SlotEntry, branch_key: &mut usize) {
    match entry {
        SlotEntry::Static(_) => {}
        SlotEntry::Conditional(branches) => {
            for (i, (test, slot)) in branches.iter().enumerate() {
                let head = match test {
                    Some(test) if i == 0 => format!("({test})"),
                    Some(test) => format!("}} : ({test})"),
                    None => "}".to_string(),
                };
                match test {
                    Some(_) => ctx.push_line(&format!("{head} ? {{")),
                    None => ctx.push_line(&format!("{head} : {{")),
                }
                emit_slot_object(ctx, slot, Some(*branch_key));
                *branch_key += 1;
            }
            let has_else = branches.last().is_some_and(|(test, _)| test.is_none());
            if has_else {
                ctx.push_line("},");
            } else {
                ctx.push_line("} : undefined,");
            }
        }
        SlotEntry::Looped {
            source,
            params,
            slot,
        } => {
            let render_list = ctx.use_core_helper(RuntimeHelper::RenderList);
            ctx.push_line(&format!("{render_list}({source}, ({params}) => {{"));
            ctx.indent();
            ctx.push_line("return {");
            emit_slot_object(ctx, slot, None);
            ctx.push_line("}");
            ctx.deindent();
            ctx.push_line("}),");
        }
    }
}

// ----------------------------------------------------------------------
// Slot outlets
// ----------------------------------------------------------------------

/// `<slot>` becomes `_ssrRenderSlot($slots, name, props, fallback, ...)`.
pub(crate) fn process_slot_outlet(ctx: &mut SsrCodegenContext<'_>, id: NodeId, el: &ElementNode) {
    ctx.flush_push();
    let mut name = "\"default\"".to_string();
    let mut entries = Vec::new();
    let mut spreads = Vec::new();
    for prop in &el.props {
        match prop {
            PropNode::Attribute(attr) => {
                let Some(value) = &attr.value else { continue };
                if attr.name == "name" {
                    name = to_json_string(&value.content).to_string();
                } else {
                    entries.push(format!(
                        "{}: {}",
                        property_key(&camelize(&attr.name)),
                        to_json_string(&value.content)
                    ));
                }
            }
            PropNode::Directive(dir) if dir.kind == DirectiveKind::Bind => {
                let Some(exp) = dir.exp.as_ref().filter(|_| !dir.exp_is_empty()) else {
                    continue;
                };
                match dir.arg.as_ref().map(|a| a.static_content()) {
                    None => spreads.push(js(exp)),
                    Some(Some("name")) => name = js(exp),
                    Some(Some(key)) => {
                        entries.push(format!("{}: {}", property_key(&camelize(key)), js(exp)))
                    }
                    Some(None) => {
                        if let Some(arg) = &dir.arg {
                            entries.push(format!("[{}]: {}", js(arg), js(exp)));
                        }
                    }
                }
            }
            PropNode::Directive(_) => {}
        }
    }

    let object = (!entries.is_empty()).then(|| format!("{{ {} }}", entries.join(", ")));
    let props = match (object, spreads.is_empty()) {
        (None, true) => "{}".to_string(),
        (Some(object), true) => object,
        (object, false) => {
            let merge = ctx.use_core_helper(RuntimeHelper::MergeProps);
            let mut args = spreads;
            args.extend(object);
            format!("{merge}({})", args.join(", "))
        }
    };
    let options = ctx.options;
    let scope = match &options.scope_id {
        Some(scope_id) if options.slotted => format!(", \"{scope_id}-s\""),
        _ => String::new(),
    };
    let render_slot = ctx.use_ssr_helper(RuntimeHelper::SsrRenderSlot);
    let head = format!("{render_slot}(_ctx.$slots, {name}, {props}, ");

    let ast = ctx.ast;
    let children = ast.children(id);
    if !children.iter().any(|&c| is_non_whitespace_content(ast, c)) {
        ctx.push_line(&format!("{head}null, _push, _parent{scope})"));
        return;
    }
    ctx.push_line(&format!("{head}() => {{"));
    ctx.indent();
    ctx.process_children(children, false, false, RootAttrs::None);
    ctx.flush_push();
    ctx.deindent();
    ctx.push_line(&format!("}}, _push, _parent{scope})"));
}

// ----------------------------------------------------------------------
// Built-ins
// ----------------------------------------------------------------------

fn process_teleport(ctx: &mut SsrCodegenContext<'_>, id: NodeId, el: &ElementNode) {
    let target = match el.find_prop("to", false, false) {
        Some(PropNode::Attribute(attr)) => attr.value.as_ref().map(|v| to_json_string(&v.content).to_string()),
        Some(PropNode::Directive(dir)) => dir.exp.as_ref().map(js),
        None => None,
    };
    let Some(target) = target else {
        ctx.errors
            .push(SsrErrorCode::NoTeleportTarget.into_error(Some(ctx.ast.node(id).loc.clone())));
        return;
    };
    let disabled = match el.find_prop("disabled", false, true) {
        Some(PropNode::Attribute(_)) => "true".to_string(),
        Some(PropNode::Directive(dir)) => dir
            .exp
            .as_ref()
            .map(js)
            .unwrap_or_else(|| "false".to_string()),
        None => "false".to_string(),
    };

    ctx.flush_push();
    let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderTeleport);
    ctx.push_line(&format!("{helper}(_push, (_push) => {{"));
    ctx.indent();
    let ast = ctx.ast;
    ctx.process_children(ast.children(id), false, false, RootAttrs::None);
    ctx.flush_push();
    ctx.deindent();
    ctx.push_line(&format!("}}, {target}, {disabled}, _parent)"));
}

/// With a `tag`, the group renders that element around its children;
/// otherwise the children form a fragment.
fn process_transition_group(ctx: &mut SsrCodegenContext<'_>, id: NodeId, el: &ElementNode) {
    let ast = ctx.ast;
    let children = ast.children(id);
    let tag = match el.find_prop("tag", false, false) {
        Some(PropNode::Attribute(attr)) => attr.value.as_ref().map(|v| (v.content.to_string(), false)),
        Some(PropNode::Directive(dir)) => dir.exp.as_ref().map(|e| (js(e), true)),
        None => None,
    };

    let options = ctx.options;
    match tag {
        Some((tag, dynamic)) => {
            ctx.push_static("<");
            push_tag(ctx, &tag, dynamic);
            if let Some(scope_id) = &options.scope_id {
                ctx.push_static(" ");
                ctx.push_static(scope_id);
            }
            ctx.push_static(">");
            ctx.process_children(children, false, true, RootAttrs::None);
            ctx.push_static("</");
            push_tag(ctx, &tag, dynamic);
            ctx.push_static(">");
        }
        None => ctx.process_children(children, true, true, RootAttrs::None),
    }
}

fn push_tag(ctx: &mut SsrCodegenContext<'_>, tag: &str, dynamic: bool) {
    if dynamic {
        ctx.push_dynamic(tag.to_string());
    } else {
        ctx.push_static(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::property_key;

    #[test]
    fn test_property_key() {
        assert_eq!(property_key("msg"), "msg");
        assert_eq!(property_key("data-id"), "\"data-id\"");
        assert_eq!(property_key("onUpdate:modelValue"), "\"onUpdate:modelValue\"");
    }
}
