//! Template AST node types.
//!
//! Every template node is stored in the [`TemplateAst`] arena and referenced by
//! [`NodeId`]. Expression and codegen nodes are plain owned values hanging off the
//! template nodes.

use serde::{Deserialize, Serialize};
use vellum_carton::{PatchFlags, String};

/// Node type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Root = 0,
    Element = 1,
    Text = 2,
    Comment = 3,
    SimpleExpression = 4,
    Interpolation = 5,
    Attribute = 6,
    Directive = 7,
    CompoundExpression = 8,
    If = 9,
    IfBranch = 10,
    For = 11,
    TextCall = 12,
}

/// Element type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ElementType {
    #[default]
    Element = 0,
    Component = 1,
    Slot = 2,
    Template = 3,
}

/// Namespace for elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Namespace {
    #[default]
    Html = 0,
    Svg = 1,
    MathMl = 2,
}

/// Constant type levels for static analysis
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum ConstantType {
    #[default]
    NotConstant = 0,
    CanSkipPatch = 1,
    CanHoist = 2,
    CanStringify = 3,
}

/// Source position in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    /// Byte offset from start of file
    pub offset: u32,
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column number
    pub column: u32,
}

impl Position {
    pub const fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Source location span [start, end)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
    pub source: String,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::STUB
    }
}

impl SourceLocation {
    /// Stub location for generated nodes
    pub const STUB: Self = Self {
        start: Position {
            offset: 0,
            line: 1,
            column: 1,
        },
        end: Position {
            offset: 0,
            line: 1,
            column: 1,
        },
        source: String::const_new(""),
    };

    pub fn new(start: Position, end: Position, source: impl Into<String>) -> Self {
        Self {
            start,
            end,
            source: source.into(),
        }
    }
}

/// Runtime helper symbols.
///
/// Each helper maps to exactly one import name through [`RuntimeHelper::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum RuntimeHelper {
    // Core helpers
    Fragment,
    Teleport,
    Suspense,
    KeepAlive,
    BaseTransition,
    OpenBlock,
    CreateBlock,
    CreateElementBlock,
    CreateVNode,
    CreateElementVNode,
    CreateComment,
    CreateText,
    CreateStatic,
    ResolveComponent,
    ResolveDynamicComponent,
    ResolveDirective,
    WithDirectives,
    RenderList,
    RenderSlot,
    ToDisplayString,
    MergeProps,
    NormalizeClass,
    NormalizeStyle,
    NormalizeProps,
    ToHandlers,
    Camelize,
    ToHandlerKey,
    WithCtx,
    CreateSlots,
    SetBlockTracking,
    WithMemo,
    GuardReactiveProps,

    // DOM helpers
    Transition,
    TransitionGroup,
    VShow,
    VModelText,
    VModelCheckbox,
    VModelRadio,
    VModelSelect,
    VModelDynamic,
    WithModifiers,
    WithKeys,

    // SSR helpers
    SsrInterpolate,
    SsrRenderComponent,
    SsrRenderSlot,
    SsrRenderAttrs,
    SsrRenderAttr,
    SsrRenderClass,
    SsrRenderStyle,
    SsrRenderList,
    SsrIncludeBooleanAttr,
    SsrLooseEqual,
    SsrLooseContain,
    SsrRenderDynamicModel,
    SsrRenderTeleport,
}

impl RuntimeHelper {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fragment => "Fragment",
            Self::Teleport => "Teleport",
            Self::Suspense => "Suspense",
            Self::KeepAlive => "KeepAlive",
            Self::BaseTransition => "BaseTransition",
            Self::OpenBlock => "openBlock",
            Self::CreateBlock => "createBlock",
            Self::CreateElementBlock => "createElementBlock",
            Self::CreateVNode => "createVNode",
            Self::CreateElementVNode => "createElementVNode",
            Self::CreateComment => "createCommentVNode",
            Self::CreateText => "createTextVNode",
            Self::CreateStatic => "createStaticVNode",
            Self::ResolveComponent => "resolveComponent",
            Self::ResolveDynamicComponent => "resolveDynamicComponent",
            Self::ResolveDirective => "resolveDirective",
            Self::WithDirectives => "withDirectives",
            Self::RenderList => "renderList",
            Self::RenderSlot => "renderSlot",
            Self::ToDisplayString => "toDisplayString",
            Self::MergeProps => "mergeProps",
            Self::NormalizeClass => "normalizeClass",
            Self::NormalizeStyle => "normalizeStyle",
            Self::NormalizeProps => "normalizeProps",
            Self::ToHandlers => "toHandlers",
            Self::Camelize => "camelize",
            Self::ToHandlerKey => "toHandlerKey",
            Self::WithCtx => "withCtx",
            Self::CreateSlots => "createSlots",
            Self::SetBlockTracking => "setBlockTracking",
            Self::WithMemo => "withMemo",
            Self::GuardReactiveProps => "guardReactiveProps",

            Self::Transition => "Transition",
            Self::TransitionGroup => "TransitionGroup",
            Self::VShow => "vShow",
            Self::VModelText => "vModelText",
            Self::VModelCheckbox => "vModelCheckbox",
            Self::VModelRadio => "vModelRadio",
            Self::VModelSelect => "vModelSelect",
            Self::VModelDynamic => "vModelDynamic",
            Self::WithModifiers => "withModifiers",
            Self::WithKeys => "withKeys",

            Self::SsrInterpolate => "ssrInterpolate",
            Self::SsrRenderComponent => "ssrRenderComponent",
            Self::SsrRenderSlot => "ssrRenderSlot",
            Self::SsrRenderAttrs => "ssrRenderAttrs",
            Self::SsrRenderAttr => "ssrRenderAttr",
            Self::SsrRenderClass => "ssrRenderClass",
            Self::SsrRenderStyle => "ssrRenderStyle",
            Self::SsrRenderList => "ssrRenderList",
            Self::SsrIncludeBooleanAttr => "ssrIncludeBooleanAttr",
            Self::SsrLooseEqual => "ssrLooseEqual",
            Self::SsrLooseContain => "ssrLooseContain",
            Self::SsrRenderDynamicModel => "ssrRenderDynamicModel",
            Self::SsrRenderTeleport => "ssrRenderTeleport",
        }
    }

    /// Check if this is an SSR-specific helper
    pub fn is_ssr(&self) -> bool {
        matches!(
            self,
            Self::SsrInterpolate
                | Self::SsrRenderComponent
                | Self::SsrRenderSlot
                | Self::SsrRenderAttrs
                | Self::SsrRenderAttr
                | Self::SsrRenderClass
                | Self::SsrRenderStyle
                | Self::SsrRenderList
                | Self::SsrIncludeBooleanAttr
                | Self::SsrLooseEqual
                | Self::SsrLooseContain
                | Self::SsrRenderDynamicModel
                | Self::SsrRenderTeleport
        )
    }

    /// Runtime directive helpers are applied through `withDirectives`.
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            Self::VShow
                | Self::VModelText
                | Self::VModelCheckbox
                | Self::VModelRadio
                | Self::VModelSelect
                | Self::VModelDynamic
        )
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Stable handle to a node in a [`TemplateAst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena-backed template AST. Node 0 is always the root.
#[derive(Debug)]
pub struct TemplateAst {
    nodes: Vec<Node>,
    pub source: String,
}

/// A template node with its location.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: SourceLocation,
}

impl TemplateAst {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let root = Node {
            kind: NodeKind::Root(RootNode::default()),
            loc: SourceLocation::STUB,
        };
        Self {
            nodes: vec![root],
            source,
        }
    }

    /// Allocate a detached node. Attach it by pushing the id into a parent's
    /// children.
    pub fn alloc(&mut self, kind: NodeKind, loc: SourceLocation) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, loc });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1 && self.root().children.is_empty()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.node(id).kind.node_type()
    }

    pub fn root(&self) -> &RootNode {
        match &self.nodes[0].kind {
            NodeKind::Root(root) => root,
            _ => unreachable!("node 0 is always the root"),
        }
    }

    pub fn root_mut(&mut self) -> &mut RootNode {
        match &mut self.nodes[0].kind {
            NodeKind::Root(root) => root,
            _ => unreachable!("node 0 is always the root"),
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        match &self.node(id).kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Children of a container node (root, element, if-branch, for).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Root(n) => &n.children,
            NodeKind::Element(n) => &n.children,
            NodeKind::IfBranch(n) => &n.children,
            NodeKind::For(n) => &n.children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match &mut self.node_mut(id).kind {
            NodeKind::Root(n) => Some(&mut n.children),
            NodeKind::Element(n) => Some(&mut n.children),
            NodeKind::IfBranch(n) => Some(&mut n.children),
            NodeKind::For(n) => Some(&mut n.children),
            _ => None,
        }
    }

    /// Whether a text node consists only of whitespace.
    pub fn is_whitespace_text(&self, id: NodeId) -> bool {
        matches!(&self.node(id).kind, NodeKind::Text(t) if t.content.trim().is_empty())
    }
}

/// Template node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Root(RootNode),
    Element(ElementNode),
    Text(TextNode),
    Comment(CommentNode),
    Interpolation(InterpolationNode),
    CompoundExpression(CompoundExpressionNode),
    If(IfNode),
    IfBranch(IfBranchNode),
    For(ForNode),
    TextCall(TextCallNode),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Root(_) => NodeType::Root,
            Self::Element(_) => NodeType::Element,
            Self::Text(_) => NodeType::Text,
            Self::Comment(_) => NodeType::Comment,
            Self::Interpolation(_) => NodeType::Interpolation,
            Self::CompoundExpression(_) => NodeType::CompoundExpression,
            Self::If(_) => NodeType::If,
            Self::IfBranch(_) => NodeType::IfBranch,
            Self::For(_) => NodeType::For,
            Self::TextCall(_) => NodeType::TextCall,
        }
    }
}

/// Root AST node
#[derive(Debug, Clone, Default)]
pub struct RootNode {
    pub children: Vec<NodeId>,
    pub helpers: Vec<RuntimeHelper>,
    pub components: Vec<String>,
    pub directives: Vec<String>,
    pub hoists: Vec<JsNode>,
    pub imports: Vec<ImportItem>,
    pub cached: u32,
    pub codegen_node: Option<JsNode>,
    pub transformed: bool,
}

/// Import item for code generation
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    pub exp: SimpleExpressionNode,
    pub path: String,
}

// ============================================================================
// Template Nodes
// ============================================================================

/// Element node
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub ns: Namespace,
    pub tag: String,
    pub tag_type: ElementType,
    /// Set for built-in components (Transition, KeepAlive, ...)
    pub builtin: Option<RuntimeHelper>,
    pub props: Vec<PropNode>,
    pub children: Vec<NodeId>,
    pub is_self_closing: bool,
    pub codegen_node: Option<JsNode>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            ns: Namespace::Html,
            tag: tag.into(),
            tag_type: ElementType::Element,
            builtin: None,
            props: Vec::new(),
            children: Vec::new(),
            is_self_closing: false,
            codegen_node: None,
        }
    }

    pub fn is_component(&self) -> bool {
        self.tag_type == ElementType::Component
    }

    /// Find a static attribute, or (with `dynamic_only == false`) a `v-bind:name`.
    pub fn find_prop(&self, name: &str, dynamic_only: bool, allow_empty: bool) -> Option<&PropNode> {
        self.props.iter().find(|p| match p {
            PropNode::Attribute(attr) => {
                !dynamic_only && attr.name == name && (allow_empty || attr.value.is_some())
            }
            PropNode::Directive(dir) => {
                dir.kind == DirectiveKind::Bind
                    && (allow_empty || dir.exp.is_some())
                    && dir.arg.as_ref().is_some_and(|arg| arg.is_static_key(name))
            }
        })
    }

    pub fn find_attr(&self, name: &str) -> Option<&AttributeNode> {
        self.props.iter().find_map(|p| match p {
            PropNode::Attribute(attr) if attr.name == name => Some(attr),
            _ => None,
        })
    }

    pub fn find_dir(&self, kind: &DirectiveKind) -> Option<&DirectiveNode> {
        self.props.iter().find_map(|p| match p {
            PropNode::Directive(dir) if &dir.kind == kind => Some(dir),
            _ => None,
        })
    }

    /// `v-bind="obj"` without an argument (a dynamic-key spread).
    pub fn has_dynamic_key_v_bind(&self) -> bool {
        self.props.iter().any(|p| match p {
            PropNode::Directive(dir) => {
                dir.kind == DirectiveKind::Bind
                    && dir
                        .arg
                        .as_ref()
                        .is_none_or(|arg| !arg.is_static())
            }
            _ => false,
        })
    }
}

/// Prop node (attribute or directive)
#[derive(Debug, Clone, PartialEq)]
pub enum PropNode {
    Attribute(AttributeNode),
    Directive(DirectiveNode),
}

impl PropNode {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Attribute(n) => &n.loc,
            Self::Directive(n) => &n.loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Attribute(_) => NodeType::Attribute,
            Self::Directive(_) => NodeType::Directive,
        }
    }
}

/// Attribute node
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNode {
    pub name: String,
    pub name_loc: SourceLocation,
    pub value: Option<TextNode>,
    pub loc: SourceLocation,
}

impl AttributeNode {
    pub fn new(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            name: name.into(),
            name_loc: loc.clone(),
            value: None,
            loc,
        }
    }
}

/// Directive identity. Parsed once from the directive name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Bind,
    On,
    Model,
    Show,
    Html,
    Text,
    Cloak,
    If,
    ElseIf,
    Else,
    For,
    Slot,
    Once,
    Memo,
    Is,
    Custom(String),
}

impl DirectiveKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "bind" => Self::Bind,
            "on" => Self::On,
            "model" => Self::Model,
            "show" => Self::Show,
            "html" => Self::Html,
            "text" => Self::Text,
            "cloak" => Self::Cloak,
            "if" => Self::If,
            "else-if" => Self::ElseIf,
            "else" => Self::Else,
            "for" => Self::For,
            "slot" => Self::Slot,
            "once" => Self::Once,
            "memo" => Self::Memo,
            "is" => Self::Is,
            other => Self::Custom(other.into()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Bind => "bind",
            Self::On => "on",
            Self::Model => "model",
            Self::Show => "show",
            Self::Html => "html",
            Self::Text => "text",
            Self::Cloak => "cloak",
            Self::If => "if",
            Self::ElseIf => "else-if",
            Self::Else => "else",
            Self::For => "for",
            Self::Slot => "slot",
            Self::Once => "once",
            Self::Memo => "memo",
            Self::Is => "is",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Directives consumed by structural transforms before element codegen.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::If
                | Self::ElseIf
                | Self::Else
                | Self::For
                | Self::Slot
                | Self::Once
                | Self::Memo
        )
    }
}

/// Directive node (v-if, v-for, v-bind, etc.)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveNode {
    /// Normalized directive name without prefix (e.g., "if", "for", "bind")
    pub name: String,
    pub kind: DirectiveKind,
    /// Raw attribute name including shorthand (e.g., "@click", ":class")
    pub raw_name: String,
    pub exp: Option<ExpressionNode>,
    pub arg: Option<ExpressionNode>,
    pub modifiers: Vec<SimpleExpressionNode>,
    pub loc: SourceLocation,
}

impl DirectiveNode {
    pub fn new(name: impl Into<String>, loc: SourceLocation) -> Self {
        let name = name.into();
        Self {
            kind: DirectiveKind::from_name(&name),
            raw_name: name.clone(),
            name,
            exp: None,
            arg: None,
            modifiers: Vec::new(),
            loc,
        }
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m.content == name)
    }

    /// True when `exp` is missing or blank.
    pub fn exp_is_empty(&self) -> bool {
        match &self.exp {
            None => true,
            Some(ExpressionNode::Simple(s)) => s.content.trim().is_empty(),
            Some(ExpressionNode::Compound(c)) => c.children.is_empty(),
        }
    }
}

/// Text node
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub content: String,
    pub loc: SourceLocation,
}

impl TextNode {
    pub fn new(content: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            loc,
        }
    }
}

/// Comment node
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub content: String,
}

/// Interpolation node ({{ expr }})
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationNode {
    pub content: ExpressionNode,
}

// ============================================================================
// Expression Nodes
// ============================================================================

/// Expression node types
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    Simple(SimpleExpressionNode),
    Compound(CompoundExpressionNode),
}

impl ExpressionNode {
    pub fn simple(content: impl Into<String>, is_static: bool, loc: SourceLocation) -> Self {
        Self::Simple(SimpleExpressionNode::new(content, is_static, loc))
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Simple(n) => &n.loc,
            Self::Compound(n) => &n.loc,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Simple(s) if s.is_static)
    }

    /// Static expression whose content equals `key`.
    pub fn is_static_key(&self, key: &str) -> bool {
        matches!(self, Self::Simple(s) if s.is_static && s.content == key)
    }

    pub fn const_type(&self) -> ConstantType {
        match self {
            Self::Simple(s) => s.const_type,
            Self::Compound(_) => ConstantType::NotConstant,
        }
    }

    /// Static content when this is a static simple expression.
    pub fn static_content(&self) -> Option<&str> {
        match self {
            Self::Simple(s) if s.is_static => Some(s.content.as_str()),
            _ => None,
        }
    }

    /// Source text of the expression as written in the template.
    pub fn source_text(&self) -> String {
        match self {
            Self::Simple(s) => s.content.clone(),
            Self::Compound(c) => c.loc.source.clone(),
        }
    }
}

/// Simple expression node
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleExpressionNode {
    pub content: String,
    pub is_static: bool,
    pub const_type: ConstantType,
    pub loc: SourceLocation,
    /// Whether this is a handler key
    pub is_handler_key: bool,
    /// Identifiers declared by this expression (v-for aliases, slot props)
    pub identifiers: Vec<String>,
}

impl SimpleExpressionNode {
    pub fn new(content: impl Into<String>, is_static: bool, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            is_static,
            const_type: if is_static {
                ConstantType::CanStringify
            } else {
                ConstantType::NotConstant
            },
            loc,
            is_handler_key: false,
            identifiers: Vec::new(),
        }
    }

    pub fn with_const_type(mut self, const_type: ConstantType) -> Self {
        self.const_type = const_type;
        self
    }
}

/// Compound expression node (mixed content)
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundExpressionNode {
    pub children: Vec<CompoundChild>,
    pub loc: SourceLocation,
    pub is_handler_key: bool,
}

impl CompoundExpressionNode {
    pub fn new(children: Vec<CompoundChild>, loc: SourceLocation) -> Self {
        Self {
            children,
            loc,
            is_handler_key: false,
        }
    }
}

/// Child of a compound expression
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundChild {
    Simple(SimpleExpressionNode),
    Compound(CompoundExpressionNode),
    /// `{{ exp }}` inside merged text
    Interpolation(ExpressionNode),
    /// Static text inside merged text
    Text(String),
    /// Raw generated code
    Code(String),
    Symbol(RuntimeHelper),
}

// ============================================================================
// Control Flow Nodes
// ============================================================================

/// If node (v-if)
#[derive(Debug, Clone)]
pub struct IfNode {
    pub branches: Vec<NodeId>,
    pub codegen_node: Option<JsNode>,
}

/// If branch node (v-if, v-else-if, v-else)
#[derive(Debug, Clone)]
pub struct IfBranchNode {
    pub condition: Option<ExpressionNode>,
    pub children: Vec<NodeId>,
    pub user_key: Option<PropNode>,
    pub is_template_if: bool,
}

/// For node (v-for)
#[derive(Debug, Clone)]
pub struct ForNode {
    pub source: ExpressionNode,
    pub value_alias: Option<ExpressionNode>,
    pub key_alias: Option<ExpressionNode>,
    pub object_index_alias: Option<ExpressionNode>,
    pub children: Vec<NodeId>,
    pub codegen_node: Option<JsNode>,
}

/// Text call node: a text-like child wrapped in `createTextVNode`
#[derive(Debug, Clone)]
pub struct TextCallNode {
    pub content: NodeId,
    pub codegen_node: Option<JsNode>,
}

// ============================================================================
// Codegen Nodes
// ============================================================================

/// Codegen IR produced by transforms and printed by the code generator.
#[derive(Debug, Clone, PartialEq)]
pub enum JsNode {
    Simple(SimpleExpressionNode),
    Compound(CompoundExpressionNode),
    VNode(Box<VNodeCall>),
    Call(CallExpression),
    Object(ObjectExpression),
    Array(Vec<JsNode>),
    Function(FunctionExpression),
    Conditional(ConditionalExpression),
    Cache(CacheExpression),
    /// A template node printed through its own codegen
    Node(NodeId),
}

impl JsNode {
    pub fn simple(content: impl Into<String>, is_static: bool) -> Self {
        Self::Simple(SimpleExpressionNode::new(
            content,
            is_static,
            SourceLocation::STUB,
        ))
    }

    pub fn call(callee: impl Into<Callee>, arguments: Vec<JsNode>) -> Self {
        Self::Call(CallExpression {
            callee: callee.into(),
            arguments,
        })
    }

    pub fn const_type(&self) -> ConstantType {
        match self {
            Self::Simple(s) => s.const_type,
            Self::Object(o) => o
                .properties
                .iter()
                .map(|p| p.key.const_type().min(p.value.const_type()))
                .min()
                .unwrap_or(ConstantType::CanStringify),
            Self::Array(items) => items
                .iter()
                .map(JsNode::const_type)
                .min()
                .unwrap_or(ConstantType::CanStringify),
            _ => ConstantType::NotConstant,
        }
    }
}

impl From<ExpressionNode> for JsNode {
    fn from(exp: ExpressionNode) -> Self {
        match exp {
            ExpressionNode::Simple(s) => Self::Simple(s),
            ExpressionNode::Compound(c) => Self::Compound(c),
        }
    }
}

/// VNode call expression
#[derive(Debug, Clone, PartialEq)]
pub struct VNodeCall {
    pub tag: VNodeTag,
    pub props: Option<JsNode>,
    pub children: Option<VNodeChildren>,
    pub patch_flag: PatchFlags,
    pub dynamic_props: Option<Vec<String>>,
    pub directives: Vec<DirectiveArgument>,
    pub is_block: bool,
    pub disable_tracking: bool,
    pub is_component: bool,
    /// Lifted into a module-level constant; printed with the HOISTED flag
    pub hoisted: bool,
}

impl VNodeCall {
    pub fn new(tag: VNodeTag) -> Self {
        Self {
            tag,
            props: None,
            children: None,
            patch_flag: PatchFlags::empty(),
            dynamic_props: None,
            directives: Vec::new(),
            is_block: false,
            disable_tracking: false,
            is_component: false,
            hoisted: false,
        }
    }
}

/// VNode tag type
#[derive(Debug, Clone, PartialEq)]
pub enum VNodeTag {
    /// Native tag, printed as a string literal
    String(String),
    Symbol(RuntimeHelper),
    /// Resolved component identifier or expression
    Expr(String),
}

/// VNode children type
#[derive(Debug, Clone, PartialEq)]
pub enum VNodeChildren {
    Nodes(Vec<NodeId>),
    /// Single text-like child printed inline
    Text(NodeId),
    Expr(Box<JsNode>),
}

/// Directive applied with `withDirectives`
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveArgument {
    pub directive: DirectiveRef,
    pub exp: Option<JsNode>,
    pub arg: Option<JsNode>,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveRef {
    Helper(RuntimeHelper),
    /// `_directive_name` from `resolveDirective`
    Resolved(String),
}

/// Call expression
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Callee,
    pub arguments: Vec<JsNode>,
}

/// Callee type
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    String(String),
    Symbol(RuntimeHelper),
}

impl From<RuntimeHelper> for Callee {
    fn from(helper: RuntimeHelper) -> Self {
        Self::Symbol(helper)
    }
}

impl From<&str> for Callee {
    fn from(name: &str) -> Self {
        Self::String(name.into())
    }
}

/// Object expression
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectExpression {
    pub properties: Vec<Property>,
}

/// Object property
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: ExpressionNode,
    pub value: JsNode,
}

impl Property {
    pub fn new(key: ExpressionNode, value: JsNode) -> Self {
        Self { key, value }
    }

    /// Property with a static string key.
    pub fn static_key(key: impl Into<String>, value: JsNode) -> Self {
        Self {
            key: ExpressionNode::simple(key, true, SourceLocation::STUB),
            value,
        }
    }

    pub fn key_static_content(&self) -> Option<&str> {
        self.key.static_content()
    }
}

/// Arrow function expression
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub params: Vec<String>,
    pub returns: Box<JsNode>,
    pub newline: bool,
}

/// Conditional expression
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub test: Box<JsNode>,
    pub consequent: Box<JsNode>,
    pub alternate: Box<JsNode>,
    pub newline: bool,
}

/// `_cache[n] || (_cache[n] = value)`
#[derive(Debug, Clone, PartialEq)]
pub struct CacheExpression {
    pub index: u32,
    pub value: Box<JsNode>,
    /// Cached vnodes suspend block tracking while they are created
    pub is_vnode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_alloc() {
        let mut ast = TemplateAst::new("<div></div>");
        let id = ast.alloc(
            NodeKind::Element(ElementNode::new("div")),
            SourceLocation::STUB,
        );
        ast.root_mut().children.push(id);
        assert_eq!(ast.children(NodeId::ROOT), &[id]);
        assert_eq!(ast.node_type(id), NodeType::Element);
        assert_eq!(ast.element(id).map(|e| e.tag.as_str()), Some("div"));
    }

    #[test]
    fn test_directive_kind() {
        assert_eq!(DirectiveKind::from_name("model"), DirectiveKind::Model);
        assert_eq!(
            DirectiveKind::from_name("focus"),
            DirectiveKind::Custom("focus".into())
        );
        assert_eq!(DirectiveKind::from_name("else-if").name(), "else-if");
    }

    #[test]
    fn test_helper_names() {
        assert_eq!(RuntimeHelper::VModelCheckbox.name(), "vModelCheckbox");
        assert_eq!(RuntimeHelper::WithModifiers.name(), "withModifiers");
        assert!(RuntimeHelper::VShow.is_directive());
        assert!(RuntimeHelper::SsrInterpolate.is_ssr());
    }

    #[test]
    fn test_find_prop() {
        let mut el = ElementNode::new("input");
        let mut attr = AttributeNode::new("type", SourceLocation::STUB);
        attr.value = Some(TextNode::new("file", SourceLocation::STUB));
        el.props.push(PropNode::Attribute(attr));
        assert!(el.find_prop("type", false, false).is_some());
        assert!(el.find_prop("type", true, false).is_none());
        assert!(!el.has_dynamic_key_v_bind());
    }
}
