//! Style plugin interface and the whitespace trim pass.

use futures::future::BoxFuture;
use vellum_carton::FxHashMap;

use super::StyleError;
use crate::css::{Node, Root};

/// How a plugin completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PluginMode {
    #[default]
    Sync,
    /// Only usable from `compile_style_async`
    Async,
}

/// State shared by the plugins of one compilation.
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    pub filename: String,
    /// `postcss_options` of the compilation
    pub options: serde_json::Map<String, serde_json::Value>,
    /// Class name exports, set by the CSS modules pass
    pub modules: Option<FxHashMap<String, String>>,
}

/// A transformation over the stylesheet tree.
pub trait StylePlugin: Send + Sync {
    fn name(&self) -> &str;

    fn mode(&self) -> PluginMode {
        PluginMode::Sync
    }

    fn process(&self, root: &mut Root, ctx: &mut PluginContext) -> Result<(), StyleError>;

    fn process_async<'a>(
        &'a self,
        root: &'a mut Root,
        ctx: &'a mut PluginContext,
    ) -> BoxFuture<'a, Result<(), StyleError>> {
        Box::pin(async move { self.process(root, ctx) })
    }
}

/// Collapses the whitespace around rules and at-rules to a single newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimPlugin;

impl StylePlugin for TrimPlugin {
    fn name(&self) -> &str {
        "trim"
    }

    fn process(&self, root: &mut Root, _ctx: &mut PluginContext) -> Result<(), StyleError> {
        root.walk_mut(&mut |node| {
            if !matches!(node, Node::Rule(_) | Node::AtRule(_)) {
                return;
            }
            let raws = node.raws_mut();
            if !raws.before.is_empty() {
                raws.before = "\n".into();
            }
            if !raws.after.is_empty() {
                raws.after = "\n".into();
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::{parse, print};

    #[test]
    fn test_trim_normalizes_rule_spacing() {
        let mut root = parse(".a { color: red;   }\n\n\n  .b {top:0}\n@media print {\n\n .c{}  }").unwrap();
        TrimPlugin.process(&mut root, &mut PluginContext::default()).unwrap();
        assert_eq!(
            print(&root).css,
            ".a { color: red;\n}\n.b {top:0}\n@media print {\n.c{}\n}"
        );
    }
}
