//! Transform driver.
//!
//! The driver walks the arena depth-first. Each node transform is called on entry
//! and answers with a [`TransformAction`]: keep going, register an exit callback,
//! replace the node (structural directives) or remove it. Exit callbacks run in
//! reverse registration order once all children have been processed, so a parent's
//! exit always sees finished child codegen.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use vellum_carton::{format_compact, PatchFlags, String};
use vellum_relief::ast::{
    CacheExpression, ConstantType, DirectiveKind, DirectiveNode, ElementType, ImportItem, JsNode,
    NodeId, NodeKind, NodeType, Property, RuntimeHelper, SimpleExpressionNode, SourceLocation,
    TemplateAst, VNodeCall, VNodeChildren, VNodeTag,
};
use vellum_relief::errors::CompilerError;

use crate::options::CompilerOptions;

/// Callback run when the driver leaves a node.
pub type ExitFn = Box<dyn FnOnce(&mut TransformContext)>;

/// What a node transform asks the driver to do next.
pub enum TransformAction {
    Continue,
    Exit(ExitFn),
    /// The current node was replaced by `node`; remaining transforms see `node`.
    Replace { node: NodeId, exit: Option<ExitFn> },
    /// Detach the current node from its parent and stop processing it.
    Remove,
}

pub trait NodeTransform: Send + Sync {
    fn transform(&self, node: NodeId, ctx: &mut TransformContext) -> TransformAction;
}

impl<F> NodeTransform for F
where
    F: Fn(NodeId, &mut TransformContext) -> TransformAction + Send + Sync,
{
    fn transform(&self, node: NodeId, ctx: &mut TransformContext) -> TransformAction {
        self(node, ctx)
    }
}

/// Runtime support a directive needs after its props are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeedRuntime {
    /// User directive resolved with `resolveDirective`
    Resolve,
    Helper(RuntimeHelper),
}

#[derive(Debug, Default)]
pub struct DirectiveTransformResult {
    pub props: Vec<Property>,
    pub need_runtime: Option<NeedRuntime>,
}

impl DirectiveTransformResult {
    pub fn new(props: Vec<Property>) -> Self {
        Self {
            props,
            need_runtime: None,
        }
    }
}

pub trait DirectiveTransform: Send + Sync {
    fn transform(
        &self,
        dir: &DirectiveNode,
        node: NodeId,
        ctx: &mut TransformContext,
    ) -> DirectiveTransformResult;
}

impl<F> DirectiveTransform for F
where
    F: Fn(&DirectiveNode, NodeId, &mut TransformContext) -> DirectiveTransformResult + Send + Sync,
{
    fn transform(
        &self,
        dir: &DirectiveNode,
        node: NodeId,
        ctx: &mut TransformContext,
    ) -> DirectiveTransformResult {
        self(dir, node, ctx)
    }
}

/// Built-in transforms handed to [`transform`] by a platform compiler.
#[derive(Clone, Default)]
pub struct TransformPreset {
    pub node_transforms: Vec<Arc<dyn NodeTransform>>,
    pub directive_transforms: Vec<(DirectiveKind, Arc<dyn DirectiveTransform>)>,
}

/// Nesting counters for scoped constructs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scopes {
    pub v_for: u32,
    pub v_slot: u32,
    pub v_pre: u32,
    pub v_once: u32,
}

/// Shared state of one transform pass.
pub struct TransformContext {
    pub ast: TemplateAst,
    pub options: CompilerOptions,
    pub prefix_identifiers: bool,
    pub components: Vec<String>,
    pub directives: Vec<String>,
    pub hoists: Vec<JsNode>,
    pub imports: Vec<ImportItem>,
    pub cached: u32,
    pub scopes: Scopes,
    pub parent: Option<NodeId>,
    pub child_index: usize,
    /// Node whose exit callbacks are running
    pub current_node: Option<NodeId>,
    pub in_v_once: bool,
    pub errors: Vec<CompilerError>,
    /// Memoized constant analysis of elements
    pub constant_cache: FxHashMap<NodeId, ConstantType>,
    helpers: Vec<(RuntimeHelper, u32)>,
    identifiers: FxHashMap<String, u32>,
    node_removed: bool,
    node_transforms: Arc<[Arc<dyn NodeTransform>]>,
    directive_transforms: FxHashMap<DirectiveKind, Arc<dyn DirectiveTransform>>,
}

impl TransformContext {
    pub fn new(ast: TemplateAst, options: &CompilerOptions, preset: TransformPreset) -> Self {
        let mut node_transforms = preset.node_transforms;
        node_transforms.extend(options.node_transforms.iter().cloned());

        let mut directive_transforms = FxHashMap::default();
        for (kind, t) in preset
            .directive_transforms
            .into_iter()
            .chain(options.directive_transforms.iter().cloned())
        {
            directive_transforms.insert(kind, t);
        }

        Self {
            ast,
            prefix_identifiers: options.effective_prefix_identifiers(),
            options: options.clone(),
            components: Vec::new(),
            directives: Vec::new(),
            hoists: Vec::new(),
            imports: Vec::new(),
            cached: 0,
            scopes: Scopes::default(),
            parent: None,
            child_index: 0,
            current_node: None,
            in_v_once: false,
            errors: Vec::new(),
            constant_cache: FxHashMap::default(),
            helpers: Vec::new(),
            identifiers: FxHashMap::default(),
            node_removed: false,
            node_transforms: node_transforms.into(),
            directive_transforms,
        }
    }

    // ------------------------------------------------------------------
    // Helpers and assets
    // ------------------------------------------------------------------

    pub fn helper(&mut self, helper: RuntimeHelper) -> RuntimeHelper {
        match self.helpers.iter_mut().find(|(h, _)| *h == helper) {
            Some((_, count)) => *count += 1,
            None => self.helpers.push((helper, 1)),
        }
        helper
    }

    pub fn remove_helper(&mut self, helper: RuntimeHelper) {
        if let Some(i) = self.helpers.iter().position(|(h, _)| *h == helper) {
            self.helpers[i].1 -= 1;
            if self.helpers[i].1 == 0 {
                self.helpers.remove(i);
            }
        }
    }

    pub fn has_helper(&self, helper: RuntimeHelper) -> bool {
        self.helpers.iter().any(|(h, _)| *h == helper)
    }

    /// Helpers in first-use order.
    pub fn helpers(&self) -> Vec<RuntimeHelper> {
        self.helpers.iter().map(|(h, _)| *h).collect()
    }

    /// `_name` alias of a helper, registering it.
    pub fn helper_string(&mut self, helper: RuntimeHelper) -> String {
        self.helper(helper);
        format_compact!("_{}", helper.name())
    }

    pub fn add_component(&mut self, name: &str) {
        if !self.components.iter().any(|c| c == name) {
            self.components.push(name.into());
        }
    }

    pub fn add_directive(&mut self, name: &str) {
        if !self.directives.iter().any(|d| d == name) {
            self.directives.push(name.into());
        }
    }

    // ------------------------------------------------------------------
    // Scope identifiers
    // ------------------------------------------------------------------

    pub fn add_identifier(&mut self, name: &str) {
        *self.identifiers.entry(name.into()).or_insert(0) += 1;
    }

    pub fn remove_identifier(&mut self, name: &str) {
        if let Some(count) = self.identifiers.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                self.identifiers.remove(name);
            }
        }
    }

    pub fn is_in_scope(&self, name: &str) -> bool {
        self.identifiers.contains_key(name)
    }

    // ------------------------------------------------------------------
    // Hoisting and caching
    // ------------------------------------------------------------------

    /// Move `exp` into a module-level constant and return a reference to it.
    pub fn hoist(&mut self, exp: JsNode) -> JsNode {
        JsNode::Simple(self.hoist_expression(exp))
    }

    /// Like [`hoist`](Self::hoist), returning the bare `_hoisted_N` reference.
    pub fn hoist_expression(&mut self, mut exp: JsNode) -> SimpleExpressionNode {
        if let JsNode::VNode(vnode) = &mut exp {
            vnode.hoisted = true;
        }
        self.hoists.push(exp);
        SimpleExpressionNode::new(
            format_compact!("_hoisted_{}", self.hoists.len()),
            false,
            SourceLocation::STUB,
        )
        .with_const_type(ConstantType::CanHoist)
    }

    pub fn cache(&mut self, exp: JsNode, is_vnode: bool) -> JsNode {
        let index = self.cached;
        self.cached += 1;
        JsNode::Cache(CacheExpression {
            index,
            value: Box::new(exp),
            is_vnode,
        })
    }

    /// Convert a vnode call into a block, swapping its creation helper.
    pub fn make_block(&mut self, vnode: &mut VNodeCall) {
        if vnode.is_block {
            return;
        }
        vnode.is_block = true;
        self.remove_helper(vnode_helper(vnode.is_component));
        self.helper(RuntimeHelper::OpenBlock);
        self.helper(block_helper(vnode.is_component));
    }

    pub fn on_error(&mut self, error: CompilerError) {
        tracing::debug!(code = error.code, message = %error.message, "template transform error");
        self.errors.push(error);
    }

    pub fn directive_transform(&self, kind: &DirectiveKind) -> Option<Arc<dyn DirectiveTransform>> {
        self.directive_transforms.get(kind).cloned()
    }

    // ------------------------------------------------------------------
    // Tree editing
    // ------------------------------------------------------------------

    /// Remove a sibling of the current node from the parent's children.
    pub fn remove_sibling(&mut self, index: usize) {
        let Some(parent) = self.parent else { return };
        if let Some(children) = self.ast.children_mut(parent) {
            if index < children.len() {
                children.remove(index);
                if index < self.child_index {
                    self.child_index -= 1;
                }
            }
        }
    }

    fn replace_current(&mut self, node: NodeId) {
        let Some(parent) = self.parent else { return };
        let index = self.child_index;
        if let Some(slot) = self
            .ast
            .children_mut(parent)
            .and_then(|children| children.get_mut(index))
        {
            *slot = node;
        }
    }

    fn remove_current(&mut self) {
        let Some(parent) = self.parent else { return };
        let index = self.child_index;
        if let Some(children) = self.ast.children_mut(parent) {
            if index < children.len() {
                children.remove(index);
            }
        }
        self.node_removed = true;
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    pub fn traverse_node(&mut self, node: NodeId) {
        let transforms = Arc::clone(&self.node_transforms);
        let mut exits: Vec<ExitFn> = Vec::new();
        let mut node = node;

        for t in transforms.iter() {
            match t.transform(node, self) {
                TransformAction::Continue => {}
                TransformAction::Exit(exit) => exits.push(exit),
                TransformAction::Replace { node: new, exit } => {
                    self.replace_current(new);
                    node = new;
                    exits.extend(exit);
                }
                TransformAction::Remove => {
                    self.remove_current();
                    return;
                }
            }
        }

        let ssr = self.options.ssr;
        match self.ast.node_type(node) {
            NodeType::Comment => {
                if !ssr {
                    self.helper(RuntimeHelper::CreateComment);
                }
            }
            NodeType::Interpolation => {
                if !ssr {
                    self.helper(RuntimeHelper::ToDisplayString);
                }
            }
            NodeType::If => {
                let saved = self.save_position();
                let mut i = 0;
                while let Some(branch) = self.if_branch(node, i) {
                    self.traverse_node(branch);
                    i += 1;
                }
                self.restore_position(saved);
            }
            NodeType::IfBranch | NodeType::For | NodeType::Element | NodeType::Root => {
                let saved = self.save_position();
                self.traverse_children(node);
                self.restore_position(saved);
            }
            _ => {}
        }

        self.current_node = Some(node);
        while let Some(exit) = exits.pop() {
            self.current_node = Some(node);
            exit(self);
        }
    }

    fn if_branch(&self, node: NodeId, i: usize) -> Option<NodeId> {
        match &self.ast.node(node).kind {
            NodeKind::If(if_node) => if_node.branches.get(i).copied(),
            _ => None,
        }
    }

    pub fn traverse_children(&mut self, parent: NodeId) {
        let mut i = 0;
        while let Some(&child) = self.ast.children(parent).get(i) {
            self.parent = Some(parent);
            self.child_index = i;
            self.node_removed = false;
            self.traverse_node(child);
            i = if self.node_removed {
                self.child_index
            } else {
                self.child_index + 1
            };
        }
    }

    fn save_position(&self) -> (Option<NodeId>, usize, bool) {
        (self.parent, self.child_index, self.node_removed)
    }

    fn restore_position(&mut self, saved: (Option<NodeId>, usize, bool)) {
        (self.parent, self.child_index, self.node_removed) = saved;
    }

    /// Whether `node` is an element (or a component) rather than a slot outlet
    /// or template.
    pub fn is_plain_element(&self, node: NodeId) -> bool {
        self.ast
            .element(node)
            .is_some_and(|el| matches!(el.tag_type, ElementType::Element | ElementType::Component))
    }
}

/// Helper creating a non-block vnode.
pub fn vnode_helper(is_component: bool) -> RuntimeHelper {
    if is_component {
        RuntimeHelper::CreateVNode
    } else {
        RuntimeHelper::CreateElementVNode
    }
}

/// Helper creating a block vnode.
pub fn block_helper(is_component: bool) -> RuntimeHelper {
    if is_component {
        RuntimeHelper::CreateBlock
    } else {
        RuntimeHelper::CreateElementBlock
    }
}

/// Asset identifier for a resolved component or directive
/// (`my-comp` -> `_component_my_comp`).
pub fn to_valid_asset_id(name: &str, kind: &str) -> String {
    let mut out = format_compact!("_{}_", kind);
    out.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        }
    }));
    out
}

/// Run the transform pass over a parsed template.
pub fn transform(
    ast: TemplateAst,
    options: &CompilerOptions,
    preset: TransformPreset,
) -> (TemplateAst, Vec<CompilerError>) {
    let mut ctx = TransformContext::new(ast, options, preset);
    ctx.traverse_node(NodeId::ROOT);

    if options.hoist_static {
        crate::transforms::hoist_static::hoist_static(&mut ctx);
    }
    if !options.ssr {
        create_root_codegen(&mut ctx);
    }

    let helpers = ctx.helpers();
    let root = ctx.ast.root_mut();
    root.helpers = helpers;
    root.components = std::mem::take(&mut ctx.components);
    root.directives = std::mem::take(&mut ctx.directives);
    root.hoists = std::mem::take(&mut ctx.hoists);
    root.imports = std::mem::take(&mut ctx.imports);
    root.cached = ctx.cached;
    root.transformed = true;

    (ctx.ast, ctx.errors)
}

fn create_root_codegen(ctx: &mut TransformContext) {
    let children = ctx.ast.children(NodeId::ROOT).to_vec();
    match children.as_slice() {
        [] => {}
        [child] => {
            if ctx.is_plain_element(*child) {
                let mut codegen = ctx
                    .ast
                    .element_mut(*child)
                    .and_then(|el| el.codegen_node.take());
                if let Some(JsNode::VNode(vnode)) = &mut codegen {
                    ctx.make_block(vnode);
                }
                if let Some(el) = ctx.ast.element_mut(*child) {
                    el.codegen_node = codegen;
                }
            }
            ctx.ast.root_mut().codegen_node = Some(JsNode::Node(*child));
        }
        _ => {
            let fragment = ctx.helper(RuntimeHelper::Fragment);
            let mut vnode = VNodeCall::new(VNodeTag::Symbol(fragment));
            vnode.children = Some(VNodeChildren::Nodes(children));
            vnode.patch_flag = PatchFlags::STABLE_FRAGMENT;
            ctx.helper(RuntimeHelper::OpenBlock);
            ctx.helper(RuntimeHelper::CreateElementBlock);
            vnode.is_block = true;
            ctx.ast.root_mut().codegen_node = Some(JsNode::VNode(Box::new(vnode)));
        }
    }
}
