//! Scoped styles: every selector gets the component's attribute selector.
//!
//! `.a .b` becomes `.a .b[data-v-xxx]`. `::v-deep(...)` stops the scoping
//! before the inner selector, `::v-slotted(...)` scopes the inner selector
//! with the slot id and `::v-global(...)` is left unscoped. Keyframes are
//! renamed per component and animation declarations follow.

use vellum_carton::FxHashMap;

use super::plugin::{PluginContext, StylePlugin};
use super::StyleError;
use crate::css::{parse_selector, CssError, Declaration, Node, Root, Selector, SelectorNode};

#[derive(Debug, Clone)]
pub struct ScopedPlugin {
    id: String,
}

impl ScopedPlugin {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl StylePlugin for ScopedPlugin {
    fn name(&self) -> &str {
        "vue-scoped"
    }

    fn process(&self, root: &mut Root, _ctx: &mut PluginContext) -> Result<(), StyleError> {
        let mut keyframes = FxHashMap::default();
        rewrite_nodes(&mut root.nodes, &self.id, &mut keyframes)?;
        if !keyframes.is_empty() {
            root.walk_decls_mut(&mut |decl| rename_animations(decl, &keyframes));
        }
        Ok(())
    }
}

fn rewrite_nodes(
    nodes: &mut [Node],
    id: &str,
    keyframes: &mut FxHashMap<String, String>,
) -> Result<(), CssError> {
    for node in nodes {
        match node {
            Node::Rule(rule) => rule.selector = scope_selector(&rule.selector, id)?,
            Node::AtRule(at_rule) if matches!(at_rule.name.as_str(), "media" | "supports") => {
                if let Some(children) = at_rule.nodes.as_mut() {
                    rewrite_nodes(children, id, keyframes)?;
                }
            }
            Node::AtRule(at_rule) if is_keyframes(&at_rule.name) => {
                let scoped = format!("{}-{id}", at_rule.params);
                keyframes.insert(std::mem::replace(&mut at_rule.params, scoped.clone()), scoped);
            }
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn is_keyframes(name: &str) -> bool {
    name.ends_with("keyframes")
}

/// Scope every selector of a rule.
pub fn scope_selector(selector: &str, id: &str) -> Result<String, CssError> {
    let mut list = parse_selector(selector)?;
    list.selectors = list
        .selectors
        .into_iter()
        .map(|selector| rewrite_selector(selector, id, false))
        .collect();
    Ok(list.to_string())
}

enum Step {
    Concrete,
    Skip,
    DeepCombinator,
    Deep(Option<Selector>),
    Slotted(Option<Selector>),
    Global(Option<Selector>),
}

fn first_arg(args: &mut Option<Vec<Selector>>) -> Option<Selector> {
    args.take().and_then(|args| args.into_iter().next())
}

fn rewrite_selector(mut selector: Selector, id: &str, slotted: bool) -> Selector {
    let mut anchor = None;
    let mut inject = true;

    let mut i = 0;
    while i < selector.nodes.len() {
        let step = match &mut selector.nodes[i] {
            SelectorNode::Combinator { value, .. } if value == ">>>" || value == "/deep/" => {
                Step::DeepCombinator
            }
            SelectorNode::Pseudo { value, args, .. } => match value.as_str() {
                "::v-deep" => Step::Deep(first_arg(args)),
                "::v-slotted" => Step::Slotted(first_arg(args)),
                "::v-global" => Step::Global(first_arg(args)),
                _ => Step::Skip,
            },
            SelectorNode::Combinator { .. } => Step::Skip,
            _ => Step::Concrete,
        };

        match step {
            Step::Concrete => anchor = Some(i),
            Step::Skip => {}
            Step::DeepCombinator => {
                tracing::warn!(
                    "[@vue/compiler-sfc] the >>> and /deep/ combinators have been deprecated. \
                     Use ::v-deep instead."
                );
                selector.nodes[i] = SelectorNode::combinator(" ");
                break;
            }
            Step::Deep(Some(inner)) => {
                let mut replacement = Vec::with_capacity(inner.nodes.len() + 1);
                if i == 0 || !selector.nodes[i - 1].is_space_combinator() {
                    replacement.push(SelectorNode::combinator(" "));
                }
                replacement.extend(inner.nodes);
                selector.nodes.splice(i..=i, replacement);
                break;
            }
            Step::Deep(None) => {
                tracing::warn!(
                    "[@vue/compiler-sfc] ::v-deep usage as a combinator has been deprecated. \
                     Use ::v-deep(<inner-selector>) instead."
                );
                selector.nodes.remove(i);
                if i > 0 && selector.nodes[i - 1].is_space_combinator() {
                    selector.nodes.remove(i - 1);
                }
                break;
            }
            Step::Slotted(inner) => {
                let inner = rewrite_selector(inner.unwrap_or_default(), id, true);
                selector.nodes.splice(i..=i, inner.nodes);
                inject = false;
                break;
            }
            Step::Global(inner) => return inner.unwrap_or_default(),
        }
        i += 1;
    }

    let attribute = if slotted {
        format!("{id}-s")
    } else {
        id.to_string()
    };
    match anchor {
        Some(anchor) => {
            let trailing = std::mem::take(&mut selector.nodes[anchor].spaces_mut().after);
            if inject {
                let mut node = SelectorNode::attribute(attribute);
                node.spaces_mut().after = trailing;
                selector.nodes.insert(anchor + 1, node);
            }
        }
        None => {
            if let Some(first) = selector.nodes.first_mut() {
                first.spaces_mut().before.clear();
            }
            if inject {
                selector.nodes.insert(0, SelectorNode::attribute(attribute));
            }
        }
    }
    selector
}

/// `(-prefix-)?{name}`
pub(crate) fn is_prop(prop: &str, name: &str) -> bool {
    let Some(prefix) = prop.strip_suffix(name) else {
        return false;
    };
    if prefix.is_empty() {
        return true;
    }
    prefix.len() > 2
        && prefix.starts_with('-')
        && prefix.ends_with('-')
        && prefix[1..prefix.len() - 1]
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
}

/// Point animation declarations at renamed keyframes.
pub(crate) fn rename_animations(decl: &mut Declaration, keyframes: &FxHashMap<String, String>) {
    if is_prop(&decl.prop, "animation-name") {
        decl.value = decl
            .value
            .split(',')
            .map(|name| {
                let name = name.trim();
                keyframes.get(name).map_or(name, String::as_str)
            })
            .collect::<Vec<_>>()
            .join(",");
    }
    if is_prop(&decl.prop, "animation") {
        decl.value = decl
            .value
            .split(',')
            .map(|entry| {
                let mut parts: Vec<&str> = entry.split_whitespace().collect();
                match parts.iter().position(|part| keyframes.contains_key(*part)) {
                    Some(at) => {
                        parts[at] = keyframes[parts[at]].as_str();
                        parts.join(" ")
                    }
                    None => entry.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(",");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::{parse, print};

    const ID: &str = "data-v-123";

    fn scoped(css: &str) -> String {
        let mut root = parse(css).unwrap();
        ScopedPlugin::new(ID)
            .process(&mut root, &mut PluginContext::default())
            .unwrap();
        print(&root).css
    }

    #[test]
    fn test_attribute_goes_on_last_compound() {
        assert_eq!(scope_selector(".a .b", ID).unwrap(), ".a .b[data-v-123]");
        assert_eq!(scope_selector("h1", ID).unwrap(), "h1[data-v-123]");
        assert_eq!(scope_selector(".a:hover", ID).unwrap(), ".a[data-v-123]:hover");
        assert_eq!(scope_selector(".a > .b::after", ID).unwrap(), ".a > .b[data-v-123]::after");
        assert_eq!(scope_selector(".a , .b", ID).unwrap(), ".a[data-v-123] , .b[data-v-123]");
        assert_eq!(scope_selector(":hover", ID).unwrap(), "[data-v-123]:hover");
    }

    #[test]
    fn test_deep() {
        assert_eq!(scope_selector(".a::v-deep(.b)", ID).unwrap(), ".a[data-v-123] .b");
        assert_eq!(scope_selector(".a ::v-deep(.b .c)", ID).unwrap(), ".a[data-v-123] .b .c");
        assert_eq!(scope_selector("::v-deep(.b)", ID).unwrap(), "[data-v-123] .b");
        assert_eq!(scope_selector(".a ::v-deep .b", ID).unwrap(), ".a[data-v-123] .b");
        assert_eq!(scope_selector(".a >>> .b", ID).unwrap(), ".a[data-v-123] .b");
        assert_eq!(scope_selector(".a /deep/ .b", ID).unwrap(), ".a[data-v-123] .b");
    }

    #[test]
    fn test_slotted_and_global() {
        assert_eq!(scope_selector("::v-slotted(.a)", ID).unwrap(), ".a[data-v-123-s]");
        assert_eq!(scope_selector(".x ::v-slotted(.a)", ID).unwrap(), ".x .a[data-v-123-s]");
        assert_eq!(scope_selector(".a::v-global(.b)", ID).unwrap(), ".b");
        assert_eq!(scope_selector("::v-global(body .c)", ID).unwrap(), "body .c");
    }

    #[test]
    fn test_media_supports_and_keyframes() {
        let css = scoped(
            "@media print { .a { color: red } }\n\
             @supports (display: grid) { .b {} }\n\
             @font-face { font-family: x }\n\
             @keyframes fade { from { opacity: 0 } }\n\
             @-webkit-keyframes fade { to { opacity: 1 } }\n\
             .c { animation: fade 1s, spin 2s; -webkit-animation-name: fade , other }",
        );
        assert!(css.contains("@media print { .a[data-v-123] { color: red } }"));
        assert!(css.contains("@supports (display: grid) { .b[data-v-123] {} }"));
        assert!(css.contains("@font-face { font-family: x }"));
        assert!(css.contains("@keyframes fade-data-v-123 { from { opacity: 0 } }"));
        assert!(css.contains("@-webkit-keyframes fade-data-v-123"));
        assert!(css.contains("animation: fade-data-v-123 1s, spin 2s;"));
        assert!(css.contains("-webkit-animation-name: fade-data-v-123,other"));
    }

    #[test]
    fn test_animation_untouched_without_keyframes() {
        let css = scoped(".c { animation: fade 1s }");
        assert_eq!(css, ".c[data-v-123] { animation: fade 1s }");
    }

    #[test]
    fn test_vendor_prefix_matching() {
        assert!(is_prop("animation", "animation"));
        assert!(is_prop("-moz-animation", "animation"));
        assert!(!is_prop("x-animation", "animation"));
        assert!(!is_prop("--animation", "animation"));
    }
}
