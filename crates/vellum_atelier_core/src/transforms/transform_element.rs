//! Element codegen.
//!
//! Runs on exit, after children are done, and turns a plain element or component
//! into a [`VNodeCall`]: resolves the tag, builds the props object with patch
//! flags, collects runtime directives and decides between a vnode and a block.

use rustc_hash::FxHashMap;
use vellum_carton::{format_compact, PatchFlags, String};
use vellum_relief::ast::{
    ConstantType, DirectiveArgument, DirectiveKind, DirectiveNode, DirectiveRef, ElementType,
    ExpressionNode, JsNode, NodeId, NodeType, ObjectExpression, PropNode,
    Property, RuntimeHelper, SimpleExpressionNode, SourceLocation, VNodeCall, VNodeChildren,
    VNodeTag,
};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::transform::{
    block_helper, to_valid_asset_id, vnode_helper, NeedRuntime, TransformAction,
    TransformContext,
};
use crate::transforms::hoist_static::{expression_constant_type, get_constant_type};
use crate::transforms::v_slot::build_slots;
use crate::utils::{inline_expression, is_on, is_reserved_prop};

pub fn transform_element(node: NodeId, ctx: &mut TransformContext) -> TransformAction {
    if !ctx.is_plain_element(node) {
        return TransformAction::Continue;
    }
    TransformAction::Exit(Box::new(move |ctx: &mut TransformContext| {
        post_transform_element(node, ctx);
    }))
}

fn post_transform_element(node: NodeId, ctx: &mut TransformContext) {
    let Some(el) = ctx.ast.element(node) else { return };
    let tag = el.tag.clone();
    let is_component = el.tag_type == ElementType::Component;
    let props = el.props.clone();

    let (vnode_tag, is_dynamic_component) = if is_component {
        resolve_component_type(node, ctx)
    } else {
        (VNodeTag::String(tag.clone()), false)
    };

    let mut should_use_block = is_dynamic_component
        || matches!(
            vnode_tag,
            VNodeTag::Symbol(RuntimeHelper::Teleport | RuntimeHelper::Suspense)
        )
        || (!is_component && (tag == "svg" || tag == "foreignObject"));

    let mut vnode_props = None;
    let mut patch_flag = PatchFlags::empty();
    let mut dynamic_props = None;
    let mut directives = Vec::new();

    if !props.is_empty() {
        let built = build_props(ctx, node, &props, is_component, is_dynamic_component);
        vnode_props = built.props;
        patch_flag = built.patch_flag;
        if !built.dynamic_prop_names.is_empty() {
            dynamic_props = Some(built.dynamic_prop_names);
        }
        directives = built
            .directives
            .iter()
            .map(|(dir, runtime)| build_directive_arg(ctx, dir, *runtime))
            .collect();
        should_use_block |= built.should_use_block;
    }

    // directive transforms (v-html, v-text) may have dropped the children
    let children = ctx.ast.children(node).to_vec();
    let mut vnode_children = None;
    if !children.is_empty() {
        let is_keep_alive = vnode_tag == VNodeTag::Symbol(RuntimeHelper::KeepAlive);
        if is_keep_alive {
            should_use_block = true;
            patch_flag |= PatchFlags::DYNAMIC_SLOTS;
            if children.len() > 1 {
                let loc = ctx.ast.node(node).loc.clone();
                ctx.on_error(CompilerError::new(
                    ErrorCode::KeepAliveInvalidChildren,
                    Some(loc),
                ));
            }
        }

        let is_teleport = vnode_tag == VNodeTag::Symbol(RuntimeHelper::Teleport);
        let build_as_slots = is_component && !is_teleport && !is_keep_alive;
        if build_as_slots {
            let (slots, has_dynamic_slots) = build_slots(ctx, node);
            vnode_children = Some(VNodeChildren::Expr(Box::new(slots)));
            if has_dynamic_slots {
                patch_flag |= PatchFlags::DYNAMIC_SLOTS;
            }
        } else if children.len() == 1 && !is_teleport {
            let child = children[0];
            let child_type = ctx.ast.node_type(child);
            let dynamic_text = matches!(
                child_type,
                NodeType::Interpolation | NodeType::CompoundExpression
            );
            if dynamic_text && get_constant_type(ctx, child) == ConstantType::NotConstant {
                patch_flag |= PatchFlags::TEXT;
            }
            vnode_children = Some(if dynamic_text || child_type == NodeType::Text {
                VNodeChildren::Text(child)
            } else {
                VNodeChildren::Nodes(children)
            });
        } else {
            vnode_children = Some(VNodeChildren::Nodes(children));
        }
    }

    let mut vnode = VNodeCall::new(vnode_tag);
    vnode.props = vnode_props;
    vnode.children = vnode_children;
    vnode.patch_flag = patch_flag;
    vnode.dynamic_props = dynamic_props;
    vnode.is_component = is_component;
    vnode.is_block = should_use_block;
    if !directives.is_empty() {
        ctx.helper(RuntimeHelper::WithDirectives);
    }
    vnode.directives = directives;
    if should_use_block {
        ctx.helper(RuntimeHelper::OpenBlock);
        ctx.helper(block_helper(is_component));
    } else {
        ctx.helper(vnode_helper(is_component));
    }

    if let Some(el) = ctx.ast.element_mut(node) {
        el.codegen_node = Some(JsNode::VNode(Box::new(vnode)));
    }
}

fn is_component_tag(tag: &str) -> bool {
    tag == "component" || tag == "Component"
}

/// Tag of a component vnode, and whether it is resolved at runtime.
fn resolve_component_type(node: NodeId, ctx: &mut TransformContext) -> (VNodeTag, bool) {
    let Some(el) = ctx.ast.element(node) else {
        return (VNodeTag::Expr("null".into()), false);
    };
    let mut tag = el.tag.clone();
    let builtin = el.builtin;
    let is_explicit_dynamic = is_component_tag(&tag);

    match el.find_prop("is", false, false).cloned() {
        Some(prop) if is_explicit_dynamic => {
            let exp = match prop {
                PropNode::Attribute(attr) => attr
                    .value
                    .map(|v| ExpressionNode::simple(v.content, true, v.loc)),
                PropNode::Directive(dir) => dir.exp,
            };
            if let Some(exp) = exp {
                let helper = ctx.helper_string(RuntimeHelper::ResolveDynamicComponent);
                let code = format_compact!("{}({})", helper, inline_expression(&exp));
                return (VNodeTag::Expr(code), true);
            }
        }
        Some(PropNode::Attribute(attr)) => {
            if let Some(name) = attr
                .value
                .as_ref()
                .and_then(|v| v.content.strip_prefix("vue:"))
            {
                tag = name.into();
            }
        }
        _ => {}
    }

    if !is_explicit_dynamic {
        let v_is = ctx
            .ast
            .element(node)
            .and_then(|el| el.find_dir(&DirectiveKind::Is))
            .and_then(|dir| dir.exp.clone());
        if let Some(exp) = v_is {
            let helper = ctx.helper_string(RuntimeHelper::ResolveDynamicComponent);
            let code = format_compact!("{}({})", helper, inline_expression(&exp));
            return (VNodeTag::Expr(code), true);
        }
    }

    if let Some(builtin) = builtin {
        if !ctx.options.ssr {
            ctx.helper(builtin);
        }
        return (VNodeTag::Symbol(builtin), false);
    }

    ctx.helper(RuntimeHelper::ResolveComponent);
    ctx.add_component(&tag);
    (VNodeTag::Expr(to_valid_asset_id(&tag, "component")), false)
}

/// Result of [`build_props`].
#[derive(Debug, Default)]
pub struct PropsBuildResult {
    pub props: Option<JsNode>,
    /// Directives applied at runtime, with their helper when built in
    pub directives: Vec<(DirectiveNode, Option<RuntimeHelper>)>,
    pub patch_flag: PatchFlags,
    pub dynamic_prop_names: Vec<String>,
    pub should_use_block: bool,
}

#[derive(Default)]
struct PatchAnalysis {
    has_ref: bool,
    has_class_binding: bool,
    has_style_binding: bool,
    has_hydration_event_binding: bool,
    has_dynamic_keys: bool,
    has_vnode_hook: bool,
    dynamic_prop_names: Vec<String>,
}

impl PatchAnalysis {
    fn analyze(&mut self, prop: &Property, is_component: bool, is_dynamic_component: bool) {
        let Some(name) = prop.key_static_content() else {
            self.has_dynamic_keys = true;
            return;
        };
        let is_event_handler = is_on(name);
        if is_event_handler
            && (!is_component || is_dynamic_component)
            && !name.eq_ignore_ascii_case("onclick")
            && name != "onUpdate:modelValue"
            && !is_reserved_prop(name)
        {
            self.has_hydration_event_binding = true;
        }
        if is_event_handler && is_reserved_prop(name) {
            self.has_vnode_hook = true;
        }

        let value_is_constant = match &prop.value {
            JsNode::Cache(_) => true,
            JsNode::Simple(s) => s.const_type > ConstantType::NotConstant,
            JsNode::Compound(c) => {
                expression_constant_type(&ExpressionNode::Compound(c.clone()))
                    > ConstantType::NotConstant
            }
            _ => false,
        };
        if value_is_constant {
            return;
        }

        match name {
            "ref" => self.has_ref = true,
            "class" => self.has_class_binding = true,
            "style" => self.has_style_binding = true,
            "key" => {}
            _ => self.push_dynamic(name),
        }
        if is_component && (name == "class" || name == "style") {
            self.push_dynamic(name);
        }
    }

    fn push_dynamic(&mut self, name: &str) {
        if !self.dynamic_prop_names.iter().any(|n| n == name) {
            self.dynamic_prop_names.push(name.into());
        }
    }
}

fn ref_for_property() -> Property {
    Property::static_key(
        "ref_for",
        JsNode::Simple(
            SimpleExpressionNode::new("true", false, SourceLocation::STUB)
                .with_const_type(ConstantType::CanStringify),
        ),
    )
}

/// Build the props expression of an element from `props`.
pub fn build_props(
    ctx: &mut TransformContext,
    node: NodeId,
    props: &[PropNode],
    is_component: bool,
    is_dynamic_component: bool,
) -> PropsBuildResult {
    let (tag, has_children) = match ctx.ast.element(node) {
        Some(el) => (el.tag.clone(), !el.children.is_empty()),
        None => (String::default(), false),
    };
    let ssr = ctx.options.ssr;
    let mut properties: Vec<Property> = Vec::new();
    let mut merge_args: Vec<JsNode> = Vec::new();
    let mut runtime_directives: Vec<(DirectiveNode, Option<RuntimeHelper>)> = Vec::new();
    let mut should_use_block = false;
    let mut analysis = PatchAnalysis::default();

    for prop in props {
        match prop {
            PropNode::Attribute(attr) => {
                if attr.name == "ref" {
                    analysis.has_ref = true;
                    if ctx.scopes.v_for > 0 {
                        properties.push(ref_for_property());
                    }
                }
                let is_vue_prefixed = attr
                    .value
                    .as_ref()
                    .is_some_and(|v| v.content.starts_with("vue:"));
                if attr.name == "is" && (is_component_tag(&tag) || is_vue_prefixed) {
                    continue;
                }
                let value = attr
                    .value
                    .as_ref()
                    .map(|v| SimpleExpressionNode::new(v.content.clone(), true, v.loc.clone()))
                    .unwrap_or_else(|| SimpleExpressionNode::new("", true, attr.loc.clone()));
                properties.push(Property::new(
                    ExpressionNode::simple(attr.name.clone(), true, attr.name_loc.clone()),
                    JsNode::Simple(value),
                ));
            }
            PropNode::Directive(dir) => {
                let is_v_bind = dir.kind == DirectiveKind::Bind;
                let is_v_on = dir.kind == DirectiveKind::On;
                let static_arg = |name: &str| dir.arg.as_ref().is_some_and(|a| a.is_static_key(name));

                match dir.kind {
                    DirectiveKind::Slot => {
                        if !is_component {
                            ctx.on_error(CompilerError::new(
                                ErrorCode::VSlotMisplaced,
                                Some(dir.loc.clone()),
                            ));
                        }
                        continue;
                    }
                    DirectiveKind::Once | DirectiveKind::Memo | DirectiveKind::Is => continue,
                    ref kind if kind.is_structural() => continue,
                    _ => {}
                }
                if is_v_bind && static_arg("is") && is_component_tag(&tag) {
                    continue;
                }
                if is_v_on && ssr {
                    continue;
                }
                if (is_v_bind && static_arg("key"))
                    || (is_v_on && has_children && static_arg("vue:before-update"))
                {
                    should_use_block = true;
                }
                if is_v_bind && static_arg("ref") && ctx.scopes.v_for > 0 {
                    properties.push(ref_for_property());
                }

                if dir.arg.is_none() && (is_v_bind || is_v_on) {
                    analysis.has_dynamic_keys = true;
                    match &dir.exp {
                        Some(exp) => {
                            if !properties.is_empty() {
                                merge_args.push(JsNode::Object(dedupe_properties(
                                    std::mem::take(&mut properties),
                                )));
                            }
                            if is_v_bind {
                                merge_args.push(JsNode::from(exp.clone()));
                            } else {
                                let to_handlers = ctx.helper(RuntimeHelper::ToHandlers);
                                let mut args = vec![JsNode::from(exp.clone())];
                                if !is_component {
                                    args.push(JsNode::simple("true", false));
                                }
                                merge_args.push(JsNode::call(to_handlers, args));
                            }
                        }
                        None => {
                            let code = if is_v_bind {
                                ErrorCode::VBindNoExpression
                            } else {
                                ErrorCode::VOnNoExpression
                            };
                            ctx.on_error(CompilerError::new(code, Some(dir.loc.clone())));
                        }
                    }
                    continue;
                }

                match ctx.directive_transform(&dir.kind) {
                    Some(dir_transform) => {
                        let result = dir_transform.transform(dir, node, ctx);
                        if !ssr {
                            for prop in &result.props {
                                analysis.analyze(prop, is_component, is_dynamic_component);
                            }
                        }
                        properties.extend(result.props);
                        match result.need_runtime {
                            Some(NeedRuntime::Helper(helper)) => {
                                runtime_directives.push((dir.clone(), Some(helper)));
                            }
                            Some(NeedRuntime::Resolve) => {
                                runtime_directives.push((dir.clone(), None));
                            }
                            None => {}
                        }
                    }
                    None => {
                        if matches!(dir.kind, DirectiveKind::Custom(_)) {
                            runtime_directives.push((dir.clone(), None));
                            if has_children {
                                should_use_block = true;
                            }
                        }
                    }
                }
            }
        }
    }

    let mut props_expression = if !merge_args.is_empty() {
        if !properties.is_empty() {
            merge_args.push(JsNode::Object(dedupe_properties(properties)));
        }
        if merge_args.len() > 1 {
            let merge = ctx.helper(RuntimeHelper::MergeProps);
            Some(JsNode::call(merge, merge_args))
        } else {
            merge_args.pop()
        }
    } else if !properties.is_empty() {
        Some(JsNode::Object(dedupe_properties(properties)))
    } else {
        None
    };

    let mut patch_flag = PatchFlags::empty();
    if analysis.has_dynamic_keys {
        patch_flag |= PatchFlags::FULL_PROPS;
    } else {
        if analysis.has_class_binding && !is_component {
            patch_flag |= PatchFlags::CLASS;
        }
        if analysis.has_style_binding && !is_component {
            patch_flag |= PatchFlags::STYLE;
        }
        if !analysis.dynamic_prop_names.is_empty() {
            patch_flag |= PatchFlags::PROPS;
        }
        if analysis.has_hydration_event_binding {
            patch_flag |= PatchFlags::NEED_HYDRATION;
        }
    }
    if !should_use_block
        && (patch_flag.is_empty() || patch_flag == PatchFlags::NEED_HYDRATION)
        && (analysis.has_ref || analysis.has_vnode_hook || !runtime_directives.is_empty())
    {
        patch_flag |= PatchFlags::NEED_PATCH;
    }

    if !ssr {
        props_expression = props_expression.map(|props| normalize_props(ctx, props, &analysis));
    }

    PropsBuildResult {
        props: props_expression,
        directives: runtime_directives,
        patch_flag,
        dynamic_prop_names: analysis.dynamic_prop_names,
        should_use_block,
    }
}

/// Wrap class/style values (or the whole object) in the runtime normalizers.
fn normalize_props(ctx: &mut TransformContext, props: JsNode, analysis: &PatchAnalysis) -> JsNode {
    match props {
        JsNode::Object(mut obj) => {
            let has_dynamic_key = obj.properties.iter().any(|p| p.key_static_content().is_none());
            if has_dynamic_key {
                let normalize = ctx.helper(RuntimeHelper::NormalizeProps);
                return JsNode::call(normalize, vec![JsNode::Object(obj)]);
            }
            for prop in obj.properties.iter_mut() {
                let key = prop.key_static_content().map(String::from);
                match key.as_deref() {
                    Some("class") => {
                        let is_static = matches!(&prop.value, JsNode::Simple(s) if s.is_static);
                        if !is_static {
                            let helper = ctx.helper(RuntimeHelper::NormalizeClass);
                            wrap_value(prop, helper);
                        }
                    }
                    Some("style") => {
                        let array_like = match &prop.value {
                            JsNode::Simple(s) => s.content.trim_start().starts_with('['),
                            JsNode::Array(_) => true,
                            _ => false,
                        };
                        if analysis.has_style_binding || array_like {
                            let helper = ctx.helper(RuntimeHelper::NormalizeStyle);
                            wrap_value(prop, helper);
                        }
                    }
                    _ => {}
                }
            }
            JsNode::Object(obj)
        }
        JsNode::Call(call) => JsNode::Call(call),
        single => {
            let guard = ctx.helper(RuntimeHelper::GuardReactiveProps);
            let normalize = ctx.helper(RuntimeHelper::NormalizeProps);
            JsNode::call(normalize, vec![JsNode::call(guard, vec![single])])
        }
    }
}

fn wrap_value(prop: &mut Property, helper: RuntimeHelper) {
    let value = std::mem::replace(&mut prop.value, JsNode::simple("", false));
    prop.value = JsNode::call(helper, vec![value]);
}

/// Merge duplicate static keys; `class`, `style` and handlers merge into arrays.
fn dedupe_properties(properties: Vec<Property>) -> ObjectExpression {
    let mut known: FxHashMap<String, usize> = FxHashMap::default();
    let mut deduped: Vec<Property> = Vec::with_capacity(properties.len());
    for prop in properties {
        let Some(name) = prop.key_static_content().map(String::from) else {
            deduped.push(prop);
            continue;
        };
        match known.get(&name) {
            Some(&index) => {
                if name == "style" || name == "class" || is_on(&name) {
                    let existing = &mut deduped[index].value;
                    match existing {
                        JsNode::Array(items) => items.push(prop.value),
                        _ => {
                            let first = std::mem::replace(existing, JsNode::Array(Vec::new()));
                            *existing = JsNode::Array(vec![first, prop.value]);
                        }
                    }
                }
            }
            None => {
                known.insert(name, deduped.len());
                deduped.push(prop);
            }
        }
    }
    ObjectExpression {
        properties: deduped,
    }
}

/// `[dir, exp, arg, modifiers]` entry of `withDirectives`.
fn build_directive_arg(
    ctx: &mut TransformContext,
    dir: &DirectiveNode,
    runtime: Option<RuntimeHelper>,
) -> DirectiveArgument {
    let directive = match runtime {
        Some(helper) => {
            ctx.helper(helper);
            DirectiveRef::Helper(helper)
        }
        None => {
            ctx.helper(RuntimeHelper::ResolveDirective);
            ctx.add_directive(&dir.name);
            DirectiveRef::Resolved(to_valid_asset_id(&dir.name, "directive"))
        }
    };
    DirectiveArgument {
        directive,
        exp: dir.exp.clone().map(JsNode::from),
        arg: dir.arg.clone().map(JsNode::from),
        modifiers: dir.modifiers.iter().map(|m| m.content.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use crate::compile::{base_compile, get_base_transform_preset};
    use crate::options::CompilerOptions;

    fn compile(source: &str) -> std::string::String {
        let options = CompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        base_compile(source, &options, get_base_transform_preset(true))
            .code
            .to_string()
    }

    #[test]
    fn test_static_props() {
        let code = compile(r#"<div><span id="foo" class="bar"/></div>"#);
        assert!(code.contains(
            "_createElementVNode(\"span\", {\n      id: \"foo\",\n      class: \"bar\"\n    })"
        ));
    }

    #[test]
    fn test_dynamic_class_and_props() {
        let code = compile(r#"<div :class="cls" :id="id"/>"#);
        assert!(code.contains("_normalizeClass(_ctx.cls)"));
        assert!(code.contains(r#"10 /* CLASS, PROPS */, ["id"]"#));
    }

    #[test]
    fn test_v_bind_object_uses_normalize_props() {
        let code = compile(r#"<div v-bind="obj"/>"#);
        assert!(code.contains("_normalizeProps(_guardReactiveProps(_ctx.obj))"));
        assert!(code.contains("16 /* FULL_PROPS */"));
    }

    #[test]
    fn test_merge_props_order() {
        let code = compile(r#"<div id="a" v-bind="obj" class="b"/>"#);
        assert!(code.contains("_mergeProps({ id: \"a\" }, _ctx.obj, { class: \"b\" })"));
    }

    #[test]
    fn test_component_resolution() {
        let code = compile(r#"<MyComp/>"#);
        assert!(code.contains("const _component_MyComp = _resolveComponent(\"MyComp\")"));
        assert!(code.contains("_createBlock(_component_MyComp)"));
    }

    #[test]
    fn test_hyphenated_tag_without_native_check_is_element() {
        // without `is_native_tag` only capitalized tags count as components
        let code = compile(r#"<my-comp/>"#);
        assert!(code.contains("_createElementBlock(\"my-comp\""));
        assert!(!code.contains("_resolveComponent"));
    }

    #[test]
    fn test_dynamic_component() {
        let code = compile(r#"<component :is="view"/>"#);
        assert!(code.contains("_createBlock(_resolveDynamicComponent(_ctx.view))"));
    }

    #[test]
    fn test_custom_directive() {
        let code = compile(r#"<div v-focus:arg.mod="x"/>"#);
        assert!(code.contains("const _directive_focus = _resolveDirective(\"focus\")"));
        // four entries print one per line
        assert!(code.contains("_withDirectives("));
        assert!(code.contains("_directive_focus,\n"));
        assert!(code.contains("_ctx.x,\n"));
        assert!(code.contains("\"arg\",\n"));
        assert!(code.contains("{ mod: true }\n"));
        assert!(code.contains("512 /* NEED_PATCH */"));
    }

    #[test]
    fn test_keyed_element_is_block() {
        let code = compile(r#"<div><p :key="k"/></div>"#);
        assert!(code.contains("(_openBlock(), _createElementBlock(\"p\", { key: _ctx.k }))"));
    }

    #[test]
    fn test_duplicate_class_merges() {
        let code = compile(r#"<div class="a" :class="b"/>"#);
        assert!(code.contains("class: _normalizeClass([\"a\", _ctx.b])"));
    }

    #[test]
    fn test_ref_in_v_for() {
        let code = compile(r#"<div v-for="i in list" ref="el"/>"#);
        assert!(code.contains("ref_for: true"));
    }
}
