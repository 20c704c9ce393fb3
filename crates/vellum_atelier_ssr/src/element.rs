//! Attributes of plain elements.
//!
//! Static attributes are printed straight into the template literal. Bindings
//! become `${}` holes calling the server-renderer helpers. `class` and `style`
//! are merged once at their first occurrence so a static value and its binding
//! render as a single attribute; `v-show` folds into `style`.

use vellum_atelier_dom::transforms::parse_inline_css;
use vellum_carton::{
    camelize, is_boolean_attr, is_member_expression, is_ssr_safe_attr_name, to_json_string,
};
use vellum_relief::ast::{DirectiveKind, DirectiveNode, ElementNode, PropNode, RuntimeHelper};
use vellum_relief::errors::{CompilerError, ErrorCode};

use crate::codegen::{js, SsrCodegenContext};
use crate::errors::SsrErrorCode;

/// Element content that replaces the children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InnerContent {
    /// `v-html`, printed unescaped
    Raw(String),
    /// `v-text` and `<textarea v-model>`
    Escaped(String),
}

/// `class`, `style` and `v-show` sources of one element.
#[derive(Debug, Default)]
struct MergedAttrs {
    static_class: Option<String>,
    dynamic_class: Option<String>,
    static_style: Option<String>,
    dynamic_style: Option<String>,
    show: Option<String>,
}

impl MergedAttrs {
    fn collect(el: &ElementNode) -> Self {
        let mut merged = Self::default();
        for prop in &el.props {
            match prop {
                PropNode::Attribute(attr) => {
                    let value = attr.value.as_ref().map(|v| v.content.to_string());
                    match attr.name.as_str() {
                        "class" => merged.static_class = value,
                        "style" => merged.static_style = value,
                        _ => {}
                    }
                }
                PropNode::Directive(dir) => {
                    let Some(exp) = dir.exp.as_ref().filter(|_| !dir.exp_is_empty()) else {
                        continue;
                    };
                    match dir.kind {
                        DirectiveKind::Show => merged.show = Some(js(exp)),
                        DirectiveKind::Bind => match dir.arg.as_ref().and_then(|a| a.static_content()) {
                            Some("class") => merged.dynamic_class = Some(js(exp)),
                            Some("style") => merged.dynamic_style = Some(js(exp)),
                            _ => {}
                        },
                        _ => {}
                    }
                }
            }
        }
        merged
    }
}

#[derive(Debug, Default)]
struct Rendered {
    class: bool,
    style: bool,
}

/// Print the attributes of `el` into the current template literal.
pub(crate) fn render_props(ctx: &mut SsrCodegenContext<'_>, el: &ElementNode) -> Option<InnerContent> {
    let merged = MergedAttrs::collect(el);
    let mut rendered = Rendered::default();
    let mut inner = None;

    for prop in &el.props {
        match prop {
            PropNode::Attribute(attr) => match attr.name.as_str() {
                "class" => render_class(ctx, &merged, &mut rendered),
                "style" => render_style(ctx, &merged, &mut rendered),
                "key" | "ref" => {}
                name if !is_ssr_safe_attr_name(name) => {
                    ctx.errors
                        .push(SsrErrorCode::UnsafeAttrName.into_error(Some(attr.loc.clone())));
                }
                name => {
                    ctx.push_static(" ");
                    ctx.push_static(name);
                    if let Some(value) = &attr.value {
                        ctx.push_static("=\"");
                        ctx.push_static(&htmlize::escape_attribute(value.content.as_str()));
                        ctx.push_static("\"");
                    }
                }
            },
            PropNode::Directive(dir) => match dir.kind {
                DirectiveKind::Bind => render_bind(ctx, el, dir, &merged, &mut rendered, &mut inner),
                DirectiveKind::Show => render_style(ctx, &merged, &mut rendered),
                DirectiveKind::Model => render_model(ctx, el, dir, &mut inner),
                DirectiveKind::Html => {
                    inner = dir.exp.as_ref().map(|e| InnerContent::Raw(js(e)));
                }
                DirectiveKind::Text => {
                    inner = dir
                        .exp
                        .as_ref()
                        .map(|e| InnerContent::Escaped(js(e)));
                }
                // listeners and client-only directives leave no trace in the markup
                _ => {}
            },
        }
    }
    inner
}

fn render_class(ctx: &mut SsrCodegenContext<'_>, merged: &MergedAttrs, rendered: &mut Rendered) {
    if std::mem::replace(&mut rendered.class, true) {
        return;
    }
    match (&merged.static_class, &merged.dynamic_class) {
        (static_class, Some(dynamic)) => {
            let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderClass);
            let arg = match static_class {
                Some(s) => format!("[{}, {dynamic}]", to_json_string(s)),
                None => dynamic.clone(),
            };
            ctx.push_static(" class=\"");
            ctx.push_dynamic(format!("{helper}({arg})"));
            ctx.push_static("\"");
        }
        (Some(s), None) => {
            ctx.push_static(" class=\"");
            ctx.push_static(&htmlize::escape_attribute(s.as_str()));
            ctx.push_static("\"");
        }
        (None, None) => {}
    }
}

fn render_style(ctx: &mut SsrCodegenContext<'_>, merged: &MergedAttrs, rendered: &mut Rendered) {
    if std::mem::replace(&mut rendered.style, true) {
        return;
    }
    if merged.dynamic_style.is_none() && merged.show.is_none() {
        if let Some(s) = &merged.static_style {
            ctx.push_static(" style=\"");
            ctx.push_static(&htmlize::escape_attribute(s.as_str()));
            ctx.push_static("\"");
        }
        return;
    }

    let mut items = Vec::new();
    if let Some(s) = &merged.static_style {
        items.push(parse_inline_css(s));
    }
    if let Some(dynamic) = &merged.dynamic_style {
        items.push(dynamic.clone());
    }
    if let Some(show) = &merged.show {
        items.push(format!("({show}) ? null : {{ display: \"none\" }}"));
    }
    let arg = match items.len() {
        1 => items.remove(0),
        _ => format!("[{}]", items.join(", ")),
    };
    let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderStyle);
    ctx.push_static(" style=\"");
    ctx.push_dynamic(format!("{helper}({arg})"));
    ctx.push_static("\"");
}

fn render_bind(
    ctx: &mut SsrCodegenContext<'_>,
    el: &ElementNode,
    dir: &DirectiveNode,
    merged: &MergedAttrs,
    rendered: &mut Rendered,
    inner: &mut Option<InnerContent>,
) {
    let Some(exp) = dir.exp.as_ref().filter(|_| !dir.exp_is_empty()) else {
        return;
    };
    let value = js(exp);
    let Some(arg) = &dir.arg else {
        let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderAttrs);
        ctx.push_dynamic(format!("{helper}({value})"));
        return;
    };
    let Some(name) = arg.static_content() else {
        let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderAttrs);
        ctx.push_dynamic(format!("{helper}({{ [{}]: {value} }})", js(arg)));
        return;
    };

    match name {
        "class" => render_class(ctx, merged, rendered),
        "style" => render_style(ctx, merged, rendered),
        "key" | "ref" => {}
        "innerHTML" => *inner = Some(InnerContent::Raw(value)),
        "textContent" => *inner = Some(InnerContent::Escaped(value)),
        "value" if el.tag == "textarea" => *inner = Some(InnerContent::Escaped(value)),
        _ => {
            let name = if dir.has_modifier("camel") {
                camelize(name).to_string()
            } else {
                name.to_string()
            };
            if !is_ssr_safe_attr_name(&name) {
                ctx.errors
                    .push(SsrErrorCode::UnsafeAttrName.into_error(Some(dir.loc.clone())));
            } else if is_boolean_attr(&name) {
                let helper = ctx.use_ssr_helper(RuntimeHelper::SsrIncludeBooleanAttr);
                ctx.push_dynamic(format!("({helper}({value})) ? \" {name}\" : \"\""));
            } else {
                let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderAttr);
                ctx.push_dynamic(format!("{helper}({}, {value})", to_json_string(&name)));
            }
        }
    }
}

/// `v-model` renders the current value: `value` for text inputs, `checked`
/// for radios and checkboxes, the content of a textarea.
fn render_model(
    ctx: &mut SsrCodegenContext<'_>,
    el: &ElementNode,
    dir: &DirectiveNode,
    inner: &mut Option<InnerContent>,
) {
    let Some(model) = model_expression(ctx, dir) else {
        return;
    };
    match el.tag.as_str() {
        "input" => match el.find_prop("type", false, false) {
            Some(PropNode::Directive(type_dir)) => {
                let input_type = type_dir
                    .exp
                    .as_ref()
                    .map(js)
                    .unwrap_or_else(|| "undefined".to_string());
                let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderDynamicModel);
                ctx.push_dynamic(format!(
                    "{helper}({input_type}, {model}, {})",
                    value_of(el)
                ));
            }
            Some(PropNode::Attribute(attr)) => {
                match attr.value.as_ref().map(|v| v.content.as_str()) {
                    Some("radio") => {
                        let include = ctx.use_ssr_helper(RuntimeHelper::SsrIncludeBooleanAttr);
                        let equal = ctx.use_ssr_helper(RuntimeHelper::SsrLooseEqual);
                        ctx.push_dynamic(format!(
                            "({include}({equal}({model}, {}))) ? \" checked\" : \"\"",
                            value_of(el)
                        ));
                    }
                    Some("checkbox") => {
                        let include = ctx.use_ssr_helper(RuntimeHelper::SsrIncludeBooleanAttr);
                        let contain = ctx.use_ssr_helper(RuntimeHelper::SsrLooseContain);
                        ctx.push_dynamic(format!(
                            "({include}((Array.isArray({model})) ? {contain}({model}, {}) : {model})) ? \" checked\" : \"\"",
                            value_of(el)
                        ));
                    }
                    Some("file") => {}
                    _ => render_value(ctx, &model),
                }
            }
            None => render_value(ctx, &model),
        },
        "textarea" => *inner = Some(InnerContent::Escaped(model)),
        // options are matched against the model by the runtime
        _ => {}
    }
}

/// Bound expression of a `v-model`, reporting the same diagnostics as the
/// client compiler when it is missing or not assignable.
pub(crate) fn model_expression(
    ctx: &mut SsrCodegenContext<'_>,
    dir: &DirectiveNode,
) -> Option<String> {
    let Some(exp) = &dir.exp else {
        ctx.errors
            .push(CompilerError::new(ErrorCode::VModelNoExpression, Some(dir.loc.clone())));
        return None;
    };
    let source = exp.source_text();
    if source.trim().is_empty() || !is_member_expression(&source) {
        ctx.errors.push(CompilerError::new(
            ErrorCode::VModelMalformedExpression,
            Some(exp.loc().clone()),
        ));
        return None;
    }
    Some(js(exp))
}

fn render_value(ctx: &mut SsrCodegenContext<'_>, model: &str) {
    let helper = ctx.use_ssr_helper(RuntimeHelper::SsrRenderAttr);
    ctx.push_dynamic(format!("{helper}(\"value\", {model})"));
}

/// Code for the element's `value`, `null` when absent.
fn value_of(el: &ElementNode) -> String {
    match el.find_prop("value", false, false) {
        Some(PropNode::Attribute(attr)) => attr
            .value
            .as_ref()
            .map(|v| to_json_string(&v.content).to_string())
            .unwrap_or_else(|| "null".to_string()),
        Some(PropNode::Directive(dir)) => dir
            .exp
            .as_ref()
            .map(js)
            .unwrap_or_else(|| "null".to_string()),
        None => "null".to_string(),
    }
}
