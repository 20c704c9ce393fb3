//! CSS modules: local class, id and keyframes names are replaced by
//! generated ones and exported.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use vellum_carton::hash::short_hash;
use vellum_carton::FxHashMap;

use super::plugin::{PluginContext, PluginMode, StylePlugin};
use super::scoped::{is_keyframes, rename_animations};
use super::{StyleConfigError, StyleError};
use crate::css::{parse_selector, print, AtRule, Node, Root, Rule, Selector, SelectorNode};

const PLUGIN: &str = "postcss-modules";

/// Mode of selectors not wrapped in `:local` or `:global`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeBehaviour {
    #[default]
    Local,
    Global,
}

/// Keys under which exported names are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocalsConvention {
    #[default]
    AsIs,
    /// Original and camelCased
    CamelCase,
    CamelCaseOnly,
    /// Original and with only dashes camelCased
    Dashes,
    DashesOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ModulesOptions {
    /// Pattern with `[name]`, `[local]` and `[hash]`/`[hash:N]`
    pub generate_scoped_name: Option<String>,
    pub scope_behaviour: ScopeBehaviour,
    /// Files matching any of these regexes are treated as global
    pub global_module_paths: Vec<String>,
    pub hash_prefix: String,
    pub locals_convention: LocalsConvention,
}

pub struct ModulesPlugin {
    options: ModulesOptions,
    global_paths: Vec<Regex>,
}

impl ModulesPlugin {
    pub fn new(options: &ModulesOptions) -> Result<Self, StyleConfigError> {
        let global_paths = options
            .global_module_paths
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| StyleConfigError::InvalidModulePath {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            options: options.clone(),
            global_paths,
        })
    }

    fn generate_name(&self, local: &str, filename: &str, css: &str) -> String {
        let Some(pattern) = &self.options.generate_scoped_name else {
            let line = css
                .find(&format!(".{local}"))
                .map_or(1, |at| css[..at].matches('\n').count() + 1);
            let hash = short_hash(&format!("{}{css}", self.options.hash_prefix), 5);
            return format!("_{local}_{hash}_{line}");
        };

        let stem = Path::new(filename)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let digest = format!("{}{filename}\u{0}{local}", self.options.hash_prefix);
        let mut out = String::with_capacity(pattern.len() + local.len());
        let mut rest = pattern.as_str();
        while let Some(open) = rest.find('[') {
            out.push_str(&rest[..open]);
            rest = &rest[open..];
            let Some(close) = rest.find(']') else {
                break;
            };
            match &rest[1..close] {
                "name" => out.push_str(&stem),
                "local" => out.push_str(local),
                token if token.starts_with("hash") => {
                    let len = token
                        .rsplit(':')
                        .next()
                        .and_then(|len| len.parse().ok())
                        .unwrap_or(5);
                    out.push_str(&short_hash(&digest, len));
                }
                _ => out.push_str(&rest[..=close]),
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn export_keys(&self, name: &str) -> Vec<String> {
        let camel = || camel_case(name, &['-', '_']);
        let dashes = || camel_case(name, &['-']);
        let keys = match self.options.locals_convention {
            LocalsConvention::AsIs => vec![name.to_string()],
            LocalsConvention::CamelCase => vec![name.to_string(), camel()],
            LocalsConvention::CamelCaseOnly => vec![camel()],
            LocalsConvention::Dashes => vec![name.to_string(), dashes()],
            LocalsConvention::DashesOnly => vec![dashes()],
        };
        let mut unique = Vec::with_capacity(keys.len());
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        unique
    }
}

impl StylePlugin for ModulesPlugin {
    fn name(&self) -> &str {
        PLUGIN
    }

    fn mode(&self) -> PluginMode {
        PluginMode::Async
    }

    fn process(&self, root: &mut Root, ctx: &mut PluginContext) -> Result<(), StyleError> {
        let global = self.options.scope_behaviour == ScopeBehaviour::Global
            || self.global_paths.iter().any(|re| re.is_match(&ctx.filename));
        let mut localizer = Localizer {
            plugin: self,
            filename: &ctx.filename,
            css: print(root).css,
            global,
            exports: FxHashMap::default(),
            keyframes: FxHashMap::default(),
        };
        localizer.nodes(&mut root.nodes)?;

        let Localizer {
            exports, keyframes, ..
        } = localizer;
        if !keyframes.is_empty() {
            root.walk_decls_mut(&mut |decl| rename_animations(decl, &keyframes));
        }

        let mut modules = FxHashMap::default();
        for (local, names) in exports {
            let joined = names.join(" ");
            for key in self.export_keys(&local) {
                modules.insert(key, joined.clone());
            }
        }
        tracing::debug!(filename = %ctx.filename, exports = modules.len(), "css modules");
        ctx.modules = Some(modules);
        Ok(())
    }
}

fn camel_case(name: &str, separators: &[char]) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if separators.contains(&c) {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn plugin_error(message: impl Into<String>) -> StyleError {
    StyleError::Plugin {
        plugin: PLUGIN.to_string(),
        message: message.into(),
    }
}

struct Localizer<'a> {
    plugin: &'a ModulesPlugin,
    filename: &'a str,
    /// Stylesheet as it entered the plugin
    css: String,
    global: bool,
    /// Local name to generated names, composed ones after the first
    exports: FxHashMap<String, Vec<String>>,
    keyframes: FxHashMap<String, String>,
}

impl Localizer<'_> {
    fn rename(&mut self, local: &str) -> String {
        if let Some(names) = self.exports.get(local) {
            return names[0].clone();
        }
        let generated = self.plugin.generate_name(local, self.filename, &self.css);
        self.exports
            .insert(local.to_string(), vec![generated.clone()]);
        generated
    }

    fn nodes(&mut self, nodes: &mut [Node]) -> Result<(), StyleError> {
        for node in nodes {
            match node {
                Node::Rule(rule) => self.rule(rule)?,
                Node::AtRule(at_rule) if is_keyframes(&at_rule.name) => self.keyframes(at_rule),
                Node::AtRule(at_rule) => {
                    if let Some(children) = at_rule.nodes.as_mut() {
                        self.nodes(children)?;
                    }
                }
                Node::Decl(_) | Node::Comment(_) => {}
            }
        }
        Ok(())
    }

    fn keyframes(&mut self, at_rule: &mut AtRule) {
        let params = at_rule.params.trim();
        let (name, local) = if let Some(inner) = wrapped(params, ":global(") {
            (inner.to_string(), false)
        } else if let Some(inner) = wrapped(params, ":local(") {
            (inner.to_string(), true)
        } else {
            (params.to_string(), !self.global)
        };
        at_rule.params = if local {
            let generated = self.rename(&name);
            self.keyframes.insert(name, generated.clone());
            generated
        } else {
            name
        };
    }

    fn rule(&mut self, rule: &mut Rule) -> Result<(), StyleError> {
        let mut list = parse_selector(&rule.selector)?;
        let owner = match &list.selectors[..] {
            [only] => match &only.nodes[..] {
                [SelectorNode::Class { value, .. }] if !self.global => Some(value.clone()),
                _ => None,
            },
            _ => None,
        };
        for selector in &mut list.selectors {
            let nodes = std::mem::take(&mut selector.nodes);
            selector.nodes = self.localize(nodes, !self.global);
        }
        rule.selector = list.to_string();

        let mut composes = Vec::new();
        rule.nodes.retain(|node| match node {
            Node::Decl(decl) if decl.prop == "composes" || decl.prop == "compose-with" => {
                composes.push(decl.value.clone());
                false
            }
            _ => true,
        });
        if composes.is_empty() {
            return Ok(());
        }
        let Some(owner) = owner else {
            return Err(plugin_error(
                "composition is only allowed when selector is single :local class name",
            ));
        };
        for value in composes {
            self.compose(&owner, &value)?;
        }
        Ok(())
    }

    fn compose(&mut self, owner: &str, value: &str) -> Result<(), StyleError> {
        let words: Vec<&str> = value.split_whitespace().collect();
        let (classes, from) = match words.iter().position(|word| *word == "from") {
            Some(at) => (&words[..at], Some(words[at + 1..].join(" "))),
            None => (&words[..], None),
        };
        let names: Vec<String> = match from.as_deref() {
            None => classes.iter().map(|class| self.rename(class)).collect(),
            Some("global") => classes.iter().map(|class| class.to_string()).collect(),
            Some(source) => {
                return Err(plugin_error(format!(
                    "composes from {source} is not supported"
                )))
            }
        };
        if let Some(exported) = self.exports.get_mut(owner) {
            for name in names {
                if !exported.contains(&name) {
                    exported.push(name);
                }
            }
        }
        Ok(())
    }

    fn localize(&mut self, nodes: Vec<SelectorNode>, mut local: bool) -> Vec<SelectorNode> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut iter = nodes.into_iter().peekable();
        while let Some(node) = iter.next() {
            match node {
                SelectorNode::Pseudo {
                    value,
                    args: None,
                    spaces,
                } if value == ":global" || value == ":local" => {
                    local = value == ":local";
                    if iter.peek().is_some_and(SelectorNode::is_space_combinator) {
                        iter.next();
                    }
                    if let Some(next) = iter.peek_mut() {
                        next.spaces_mut().before.insert_str(0, &spaces.before);
                    }
                }
                SelectorNode::Pseudo {
                    value,
                    args: Some(args),
                    spaces,
                } if value == ":global" || value == ":local" => {
                    let inner = args.into_iter().next().unwrap_or_default();
                    let mut inner = self.localize(inner.nodes, value == ":local");
                    if let Some(first) = inner.first_mut() {
                        first.spaces_mut().before.insert_str(0, &spaces.before);
                    }
                    if let Some(last) = inner.last_mut() {
                        last.spaces_mut().after.push_str(&spaces.after);
                    }
                    out.extend(inner);
                }
                SelectorNode::Class { value, spaces } if local => {
                    let value = self.rename(&value);
                    out.push(SelectorNode::Class { value, spaces });
                }
                SelectorNode::Id { value, spaces } if local => {
                    let value = self.rename(&value);
                    out.push(SelectorNode::Id { value, spaces });
                }
                SelectorNode::Pseudo {
                    value,
                    args: Some(args),
                    spaces,
                } => {
                    let args = args
                        .into_iter()
                        .map(|selector| Selector {
                            nodes: self.localize(selector.nodes, local),
                        })
                        .collect();
                    out.push(SelectorNode::Pseudo {
                        value,
                        args: Some(args),
                        spaces,
                    });
                }
                other => out.push(other),
            }
        }
        out
    }
}

fn wrapped<'a>(text: &'a str, open: &str) -> Option<&'a str> {
    text.strip_prefix(open)?.strip_suffix(')').map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse;

    fn run(
        css: &str,
        options: ModulesOptions,
        filename: &str,
    ) -> Result<(String, FxHashMap<String, String>), StyleError> {
        let mut root = parse(css).unwrap();
        let mut ctx = PluginContext {
            filename: filename.to_string(),
            ..Default::default()
        };
        ModulesPlugin::new(&options).unwrap().process(&mut root, &mut ctx)?;
        Ok((print(&root).css, ctx.modules.unwrap()))
    }

    fn named(pattern: &str) -> ModulesOptions {
        ModulesOptions {
            generate_scoped_name: Some(pattern.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_names_use_hash_and_line() {
        let css = ".red { color: red }\n.blue {}";
        let (code, modules) = run(css, ModulesOptions::default(), "App.vue").unwrap();
        let hash = short_hash(css, 5);
        assert_eq!(modules["red"], format!("_red_{hash}_1"));
        assert_eq!(modules["blue"], format!("_blue_{hash}_2"));
        assert_eq!(code, format!(".{} {{ color: red }}\n.{} {{}}", modules["red"], modules["blue"]));
    }

    #[test]
    fn test_pattern_placeholders() {
        let (code, modules) = run(".red {}", named("[name]__[local]"), "src/Button.vue").unwrap();
        assert_eq!(code, ".Button__red {}");
        assert_eq!(modules["red"], "Button__red");

        let (_, modules) = run(".red {}", named("[local]-[hash:8]"), "src/Button.vue").unwrap();
        let name = &modules["red"];
        assert!(name.starts_with("red-"));
        assert_eq!(name.len(), "red-".len() + 8);
    }

    #[test]
    fn test_global_and_local_switches() {
        let (code, modules) =
            run(":global(.a) .b, :global .c .d {}", named("[local]_m"), "App.vue").unwrap();
        assert_eq!(code, ".a .b_m, .c .d {}");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules["b"], "b_m");
    }

    #[test]
    fn test_global_scope_behaviour() {
        let options = ModulesOptions {
            scope_behaviour: ScopeBehaviour::Global,
            ..named("[local]_m")
        };
        let (code, modules) = run(":local(.x) .y #z {}", options, "App.vue").unwrap();
        assert_eq!(code, ".x_m .y #z {}");
        assert_eq!(modules.keys().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn test_global_module_paths() {
        let options = ModulesOptions {
            global_module_paths: vec![r"vendor/".to_string()],
            ..named("[local]_m")
        };
        let (code, modules) = run(".x {}", options, "src/vendor/x.css").unwrap();
        assert_eq!(code, ".x {}");
        assert!(modules.is_empty());
    }

    #[test]
    fn test_composes() {
        let (code, modules) = run(
            ".base { color: red }\n.btn { composes: util from global; top: 0 }",
            named("[local]_m"),
            "App.vue",
        )
        .unwrap();
        assert_eq!(code, ".base_m { color: red }\n.btn_m { top: 0 }");
        assert_eq!(modules["btn"], "btn_m util");

        let (_, modules) = run(".btn { composes: base }", named("[local]_m"), "App.vue").unwrap();
        assert_eq!(modules["btn"], "btn_m base_m");
    }

    #[test]
    fn test_composes_errors() {
        let error = run(".a { composes: b from './b.css' }", named("[local]"), "App.vue").unwrap_err();
        assert_eq!(error.to_string(), "[postcss-modules] composes from './b.css' is not supported");
        let error = run(".a .c { composes: b }", named("[local]"), "App.vue").unwrap_err();
        assert!(matches!(error, StyleError::Plugin { .. }));
    }

    #[test]
    fn test_keyframes_and_animations() {
        let (code, modules) = run(
            "@keyframes fade {}\n@keyframes :global(spin) {}\n.a { animation: fade 1s, spin 2s }",
            named("[local]_m"),
            "App.vue",
        )
        .unwrap();
        assert_eq!(
            code,
            "@keyframes fade_m {}\n@keyframes spin {}\n.a_m { animation: fade_m 1s, spin 2s }"
        );
        assert_eq!(modules["fade"], "fade_m");
        assert!(!modules.contains_key("spin"));
    }

    #[test]
    fn test_pseudo_arguments_are_localized() {
        let (code, _) = run(".a:not(.b) {}", named("[local]_m"), "App.vue").unwrap();
        assert_eq!(code, ".a_m:not(.b_m) {}");
    }

    #[test]
    fn test_locals_convention() {
        let options = ModulesOptions {
            locals_convention: LocalsConvention::CamelCaseOnly,
            ..named("[local]")
        };
        let (_, modules) = run(".foo-bar_baz {}", options, "App.vue").unwrap();
        assert_eq!(modules.keys().collect::<Vec<_>>(), vec!["fooBarBaz"]);

        let options = ModulesOptions {
            locals_convention: LocalsConvention::Dashes,
            ..named("[local]")
        };
        let (_, modules) = run(".foo-bar_baz {}", options, "App.vue").unwrap();
        assert_eq!(modules["foo-bar_baz"], "foo-bar_baz");
        assert_eq!(modules["fooBar_baz"], "foo-bar_baz");
    }
}
