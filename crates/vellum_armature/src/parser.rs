//! Recursive-descent template parser.
//!
//! The input is consumed once, front to back. Children of an element are parsed in
//! the text mode returned by [`ParserOptions::get_text_mode`], and each element's
//! namespace comes from [`ParserOptions::get_namespace`]. Nodes are collected per
//! sibling list, whitespace-normalized, then allocated into the [`TemplateAst`]
//! arena bottom-up.

use memchr::{memchr, memchr_iter, memmem};
use vellum_carton::{FxHashSet, String};
use vellum_relief::ast::{
    AttributeNode, CommentNode, DirectiveKind, DirectiveNode, ElementNode, ElementType,
    ExpressionNode, InterpolationNode, Namespace, NodeId, NodeKind, NodeType, Position,
    PropNode, RuntimeHelper, SimpleExpressionNode, SourceLocation, TemplateAst, TextNode,
};
use vellum_relief::errors::{CompilerError, ErrorCode};
use vellum_relief::options::{ParserOptions, TextMode, WhitespaceStrategy};

use crate::cursor::{advance_position, is_whitespace, Cursor};
use crate::decode::decode_entities;

/// Parse a template with default options.
pub fn parse(source: &str) -> (TemplateAst, Vec<CompilerError>) {
    parse_with_options(source, ParserOptions::default())
}

/// Parse a template. Parsing never fails: problems are reported as
/// diagnostics next to a best-effort AST.
pub fn parse_with_options(
    source: &str,
    options: ParserOptions,
) -> (TemplateAst, Vec<CompilerError>) {
    Parser::new(source, options).parse()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagType {
    Start,
    End,
}

/// A parsed node not yet placed in the arena.
#[derive(Debug)]
struct Pending {
    kind: NodeKind,
    loc: SourceLocation,
}

struct AttrValue {
    content: String,
    /// Span including quotes
    loc: SourceLocation,
    /// Span of the text between the quotes
    inner: SourceLocation,
}

/// Template parser state.
pub struct Parser<'a> {
    options: ParserOptions,
    cursor: Cursor<'a>,
    ast: TemplateAst,
    errors: Vec<CompilerError>,
    in_pre: bool,
    in_v_pre: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, options: ParserOptions) -> Self {
        Self {
            options,
            cursor: Cursor::new(source),
            ast: TemplateAst::new(source),
            errors: Vec::new(),
            in_pre: false,
            in_v_pre: false,
        }
    }

    pub fn parse(mut self) -> (TemplateAst, Vec<CompilerError>) {
        let start = self.cursor.position();
        let mut ancestors = Vec::new();
        let nodes = self.parse_children(TextMode::Data, &mut ancestors);
        let children = self.alloc_all(nodes);

        self.ast.node_mut(NodeId::ROOT).loc = self.cursor.selection(start, None);
        self.ast.root_mut().children = children;
        (self.ast, self.errors)
    }

    fn emit_error(&mut self, code: ErrorCode, offset: usize, at: Option<Position>) {
        let mut pos = at.unwrap_or_else(|| self.cursor.position());
        pos.offset += offset as u32;
        pos.column += offset as u32;
        self.errors.push(CompilerError::new(
            code,
            Some(SourceLocation::new(pos, pos, "")),
        ));
    }

    fn alloc_all(&mut self, nodes: Vec<Pending>) -> Vec<NodeId> {
        nodes
            .into_iter()
            .map(|n| self.ast.alloc(n.kind, n.loc))
            .collect()
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    fn parse_children(&mut self, mode: TextMode, ancestors: &mut Vec<ElementNode>) -> Vec<Pending> {
        let ns = ancestors.last().map(|p| p.ns).unwrap_or_default();
        let mut nodes: Vec<Pending> = Vec::new();

        while !self.is_end(mode, ancestors) {
            let mut node = None;

            if matches!(mode, TextMode::Data | TextMode::RcData) {
                if !self.in_v_pre && self.cursor.starts_with(&self.options.delimiters.0) {
                    node = self.parse_interpolation(mode);
                } else if mode == TextMode::Data && self.cursor.peek(0) == Some(b'<') {
                    match self.cursor.peek(1) {
                        None => self.emit_error(ErrorCode::EofBeforeTagName, 1, None),
                        Some(b'!') => {
                            if self.cursor.starts_with("<!--") {
                                node = Some(self.parse_comment());
                            } else if self.cursor.starts_with("<!DOCTYPE") {
                                node = Some(self.parse_bogus_comment());
                            } else if self.cursor.starts_with("<![CDATA[") {
                                if ns != Namespace::Html {
                                    let cdata = self.parse_cdata(ancestors);
                                    for n in cdata {
                                        push_node(&mut nodes, n);
                                    }
                                    continue;
                                }
                                self.emit_error(ErrorCode::CdataInHtmlContent, 0, None);
                                node = Some(self.parse_bogus_comment());
                            } else {
                                self.emit_error(ErrorCode::IncorrectlyOpenedComment, 0, None);
                                node = Some(self.parse_bogus_comment());
                            }
                        }
                        Some(b'/') => match self.cursor.peek(2) {
                            None => self.emit_error(ErrorCode::EofBeforeTagName, 2, None),
                            Some(b'>') => {
                                self.emit_error(ErrorCode::MissingEndTagName, 2, None);
                                self.cursor.advance_by(3);
                                continue;
                            }
                            Some(c) if c.is_ascii_alphabetic() => {
                                self.emit_error(ErrorCode::InvalidEndTag, 0, None);
                                self.parse_tag(TagType::End, ancestors.last());
                                continue;
                            }
                            Some(_) => {
                                self.emit_error(ErrorCode::InvalidFirstCharacterOfTagName, 2, None);
                                node = Some(self.parse_bogus_comment());
                            }
                        },
                        Some(c) if c.is_ascii_alphabetic() => {
                            node = self.parse_element(ancestors);
                        }
                        Some(b'?') => {
                            self.emit_error(
                                ErrorCode::UnexpectedQuestionMarkInsteadOfTagName,
                                1,
                                None,
                            );
                            node = Some(self.parse_bogus_comment());
                        }
                        Some(_) => {
                            self.emit_error(ErrorCode::InvalidFirstCharacterOfTagName, 1, None)
                        }
                    }
                }
            }

            let node = match node {
                Some(node) => node,
                None => self.parse_text(mode),
            };
            push_node(&mut nodes, node);
        }

        if mode != TextMode::RawText {
            self.normalize_whitespace(&mut nodes);
        }

        if self.in_pre {
            if let Some(parent) = ancestors.last() {
                if (self.options.is_pre_tag)(&parent.tag) {
                    strip_leading_newline(&mut nodes);
                }
            }
        }

        nodes
    }

    /// Drop or condense whitespace-only text, condense runs of whitespace
    /// (outside `<pre>`), and drop comments unless they are kept.
    fn normalize_whitespace(&self, nodes: &mut Vec<Pending>) {
        let condense = self.options.whitespace == WhitespaceStrategy::Condense;
        let mut keep = vec![true; nodes.len()];

        for i in 0..nodes.len() {
            let prev = if i > 0 && keep[i - 1] {
                Some(nodes[i - 1].kind.node_type())
            } else {
                None
            };
            let next = nodes.get(i + 1).map(|n| n.kind.node_type());

            match &mut nodes[i].kind {
                NodeKind::Text(text) if !self.in_pre => {
                    if text.content.bytes().all(is_whitespace) {
                        let remove = match (prev, next) {
                            (Some(prev), Some(next)) => {
                                condense
                                    && (prev == NodeType::Comment
                                        || next == NodeType::Comment
                                        || (prev == NodeType::Element
                                            && next == NodeType::Element
                                            && text.content.contains(['\r', '\n'])))
                            }
                            _ => true,
                        };
                        if remove {
                            keep[i] = false;
                        } else {
                            text.content = String::const_new(" ");
                        }
                    } else if condense {
                        text.content = condense_whitespace(&text.content);
                    }
                }
                NodeKind::Comment(_) if !self.options.comments => keep[i] = false,
                _ => {}
            }
        }

        let mut flags = keep.into_iter();
        nodes.retain(|_| flags.next().unwrap_or(true));
    }

    fn is_end(&self, mode: TextMode, ancestors: &[ElementNode]) -> bool {
        let rest = self.cursor.rest();
        match mode {
            TextMode::Data => {
                if rest.starts_with("</")
                    && ancestors
                        .iter()
                        .rev()
                        .any(|a| starts_with_end_tag_open(rest, &a.tag))
                {
                    return true;
                }
            }
            TextMode::RcData | TextMode::RawText => {
                if ancestors
                    .last()
                    .is_some_and(|parent| starts_with_end_tag_open(rest, &parent.tag))
                {
                    return true;
                }
            }
            TextMode::CData => {
                if rest.starts_with("]]>") {
                    return true;
                }
            }
            TextMode::AttributeValue => {}
        }
        rest.is_empty()
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    fn parse_element(&mut self, ancestors: &mut Vec<ElementNode>) -> Option<Pending> {
        let was_in_pre = self.in_pre;
        let was_in_v_pre = self.in_v_pre;
        let (element, start_loc) = self.parse_tag(TagType::Start, ancestors.last());
        let start = start_loc.start;
        let is_pre_boundary = self.in_pre && !was_in_pre;
        let is_v_pre_boundary = self.in_v_pre && !was_in_v_pre;

        if element.is_self_closing || (self.options.is_void_tag)(&element.tag) {
            if is_pre_boundary {
                self.in_pre = false;
            }
            if is_v_pre_boundary {
                self.in_v_pre = false;
            }
            return Some(Pending {
                kind: NodeKind::Element(element),
                loc: start_loc,
            });
        }

        let mode = (self.options.get_text_mode)(&element.tag, element.ns, ancestors.last());
        ancestors.push(element);
        let children = self.parse_children(mode, ancestors);
        let mut element = ancestors.pop()?;

        if starts_with_end_tag_open(self.cursor.rest(), &element.tag) {
            self.parse_tag(TagType::End, ancestors.last());
        } else {
            self.emit_error(ErrorCode::MissingEndTag, 0, Some(start));
            if self.cursor.is_eof()
                && element.tag.eq_ignore_ascii_case("script")
                && children
                    .first()
                    .is_some_and(|c| c.loc.source.starts_with("<!--"))
            {
                self.emit_error(ErrorCode::EofInScriptHtmlCommentLikeText, 0, None);
            }
        }

        element.children = self.alloc_all(children);
        let loc = self.cursor.selection(start, None);

        if is_pre_boundary {
            self.in_pre = false;
        }
        if is_v_pre_boundary {
            self.in_v_pre = false;
        }

        Some(Pending {
            kind: NodeKind::Element(element),
            loc,
        })
    }

    /// Parse `<tag ...>` or `</tag ...>`. The cursor must be on `<` followed by
    /// an ASCII letter (or `/` and a letter).
    fn parse_tag(
        &mut self,
        tag_type: TagType,
        parent: Option<&ElementNode>,
    ) -> (ElementNode, SourceLocation) {
        let start = self.cursor.position();
        let rest = self.cursor.rest();
        let prefix = if tag_type == TagType::End { 2 } else { 1 };
        let name_len = rest
            .as_bytes()
            .get(prefix..)
            .unwrap_or_default()
            .iter()
            .take_while(|b| !is_whitespace(**b) && **b != b'/' && **b != b'>')
            .count();
        let tag = String::from(&rest[prefix..prefix + name_len]);
        let ns = (self.options.get_namespace)(&tag, parent);

        self.cursor.advance_by(prefix + name_len);
        self.cursor.advance_spaces();

        let attrs_start = self.cursor.position();
        let error_mark = self.errors.len();
        let mut props = self.parse_attributes(tag_type);

        if tag_type == TagType::Start {
            if (self.options.is_pre_tag)(&tag) {
                self.in_pre = true;
            }
            let has_v_pre = props
                .iter()
                .any(|p| matches!(p, PropNode::Directive(d) if d.name == "pre"));
            if !self.in_v_pre && has_v_pre {
                // Re-read the attributes verbatim.
                self.in_v_pre = true;
                self.cursor.reset(attrs_start);
                self.errors.truncate(error_mark);
                props = self.parse_attributes(tag_type);
                props.retain(|p| !matches!(p, PropNode::Attribute(a) if a.name == "v-pre"));
            }
        }

        let mut is_self_closing = false;
        if self.cursor.is_eof() {
            self.emit_error(ErrorCode::EofInTag, 0, None);
        } else {
            is_self_closing = self.cursor.starts_with("/>");
            if tag_type == TagType::End && is_self_closing {
                self.emit_error(ErrorCode::EndTagWithTrailingSolidus, 0, None);
            }
            self.cursor.advance_by(if is_self_closing { 2 } else { 1 });
        }

        let mut element = ElementNode::new(tag);
        element.ns = ns;
        element.props = props;
        element.is_self_closing = is_self_closing;
        if tag_type == TagType::Start {
            self.resolve_element_type(&mut element);
        }

        (element, self.cursor.selection(start, None))
    }

    fn resolve_element_type(&self, element: &mut ElementNode) {
        if self.in_v_pre || (self.options.is_custom_element)(&element.tag) {
            return;
        }
        let tag = element.tag.as_str();
        let has_v_is = element
            .props
            .iter()
            .any(|p| matches!(p, PropNode::Directive(d) if d.kind == DirectiveKind::Is));
        let builtin = core_component(tag).or_else(|| (self.options.is_builtin_component)(tag));

        let is_component = match self.options.is_native_tag {
            Some(is_native_tag) if !has_v_is => !is_native_tag(tag),
            _ => {
                has_v_is
                    || builtin.is_some()
                    || tag.starts_with(|c: char| c.is_ascii_uppercase())
                    || tag == "component"
            }
        };
        if is_component {
            element.tag_type = ElementType::Component;
            element.builtin = builtin;
        }

        if tag == "slot" {
            element.tag_type = ElementType::Slot;
        } else if tag == "template"
            && element.props.iter().any(|p| {
                matches!(p, PropNode::Directive(d) if matches!(
                    d.kind,
                    DirectiveKind::If
                        | DirectiveKind::ElseIf
                        | DirectiveKind::Else
                        | DirectiveKind::For
                        | DirectiveKind::Slot
                ))
            })
        {
            element.tag_type = ElementType::Template;
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn parse_attributes(&mut self, tag_type: TagType) -> Vec<PropNode> {
        let mut props = Vec::new();
        let mut names = FxHashSet::default();

        while !self.cursor.is_eof() && !self.cursor.starts_with(">") && !self.cursor.starts_with("/>")
        {
            if self.cursor.starts_with("/") {
                self.emit_error(ErrorCode::UnexpectedSolidusInTag, 0, None);
                self.cursor.advance_by(1);
                self.cursor.advance_spaces();
                continue;
            }
            if tag_type == TagType::End {
                self.emit_error(ErrorCode::EndTagWithAttributes, 0, None);
            }

            let attr = self.parse_attribute(&mut names);
            if tag_type == TagType::Start {
                props.push(attr);
            }

            if self
                .cursor
                .peek(0)
                .is_some_and(|b| !is_whitespace(b) && b != b'/' && b != b'>')
            {
                self.emit_error(ErrorCode::MissingWhitespaceBetweenAttributes, 0, None);
            }
            self.cursor.advance_spaces();
        }
        props
    }

    fn parse_attribute(&mut self, names: &mut FxHashSet<String>) -> PropNode {
        let start = self.cursor.position();
        let rest = self.cursor.rest();
        let first_len = rest.chars().next().map_or(0, char::len_utf8);
        let name_len = first_len
            + rest.as_bytes()[first_len..]
                .iter()
                .take_while(|b| !is_whitespace(**b) && !matches!(**b, b'/' | b'>' | b'='))
                .count();
        let name = String::from(&rest[..name_len]);

        if !names.insert(name.clone()) {
            self.emit_error(ErrorCode::DuplicateAttribute, 0, None);
        }
        if name.starts_with('=') {
            self.emit_error(ErrorCode::UnexpectedEqualsSignBeforeAttributeName, 0, None);
        }
        for (i, b) in name.bytes().enumerate() {
            if matches!(b, b'"' | b'\'' | b'<') {
                self.emit_error(ErrorCode::UnexpectedCharacterInAttributeName, i, None);
            }
        }
        self.cursor.advance_by(name_len);
        let name_loc = self.cursor.selection(start, None);

        let mut value = None;
        if self.cursor.rest().bytes().find(|b| !is_whitespace(*b)) == Some(b'=') {
            self.cursor.advance_spaces();
            self.cursor.advance_by(1);
            self.cursor.advance_spaces();
            value = self.parse_attribute_value();
            if value.is_none() {
                self.emit_error(ErrorCode::MissingAttributeValue, 0, None);
            }
        }
        let loc = self.cursor.selection(start, None);

        if !self.in_v_pre && is_directive_name(&name) {
            return PropNode::Directive(self.build_directive(name, start, value, loc));
        }

        PropNode::Attribute(AttributeNode {
            name,
            name_loc,
            value: value.map(|v| TextNode::new(v.content, v.loc)),
            loc,
        })
    }

    fn parse_attribute_value(&mut self) -> Option<AttrValue> {
        let start = self.cursor.position();
        match self.cursor.peek(0) {
            Some(quote @ (b'"' | b'\'')) => {
                self.cursor.advance_by(1);
                let inner_start = self.cursor.position();
                let rest = self.cursor.rest();
                let end = memchr(quote, rest.as_bytes());
                let content =
                    self.parse_text_data(end.unwrap_or(rest.len()), TextMode::AttributeValue);
                let inner = self.cursor.selection(inner_start, None);
                if end.is_some() {
                    self.cursor.advance_by(1);
                }
                Some(AttrValue {
                    content,
                    loc: self.cursor.selection(start, None),
                    inner,
                })
            }
            _ => {
                let rest = self.cursor.rest();
                let len = rest
                    .bytes()
                    .take_while(|b| !is_whitespace(*b) && *b != b'>')
                    .count();
                if len == 0 {
                    return None;
                }
                for (i, b) in rest.as_bytes()[..len].iter().enumerate() {
                    if matches!(b, b'"' | b'\'' | b'<' | b'=' | b'`') {
                        self.emit_error(
                            ErrorCode::UnexpectedCharacterInUnquotedAttributeValue,
                            i,
                            None,
                        );
                    }
                }
                let content = self.parse_text_data(len, TextMode::AttributeValue);
                let loc = self.cursor.selection(start, None);
                Some(AttrValue {
                    content,
                    inner: loc.clone(),
                    loc,
                })
            }
        }
    }

    fn build_directive(
        &mut self,
        raw_name: String,
        start: Position,
        value: Option<AttrValue>,
        loc: SourceLocation,
    ) -> DirectiveNode {
        let parts = split_directive_name(&raw_name);
        let name = match parts.name {
            Some(name) => name,
            None if raw_name.starts_with(':') => "bind",
            None if raw_name.starts_with('@') => "on",
            None => "slot",
        };

        let mut arg = None;
        if let Some((raw_arg, arg_offset)) = parts.arg {
            let is_slot = name == "slot";
            let slot_suffix = if is_slot { parts.rest.unwrap_or("") } else { "" };
            let input = self.cursor.input();
            let arg_start = advance_position(input, start, arg_offset);
            let arg_end =
                advance_position(input, start, arg_offset + raw_arg.len() + slot_suffix.len());
            let arg_loc = self.cursor.selection(arg_start, Some(arg_end));

            let (content, is_static) = if raw_arg.starts_with('[') {
                if !raw_arg.ends_with(']') {
                    self.emit_error(ErrorCode::MissingDynamicDirectiveArgumentEnd, 0, None);
                }
                let inner = raw_arg.get(1..raw_arg.len() - 1).unwrap_or_default();
                (String::from(inner), false)
            } else {
                let mut content = String::from(raw_arg);
                content.push_str(slot_suffix);
                (content, true)
            };
            arg = Some(ExpressionNode::Simple(SimpleExpressionNode::new(
                content, is_static, arg_loc,
            )));
        }

        let modifiers = parts
            .rest
            .map(|rest| {
                skip_first_char(rest)
                    .split('.')
                    .map(|m| SimpleExpressionNode::new(m, true, SourceLocation::STUB))
                    .collect()
            })
            .unwrap_or_default();

        let mut dir = DirectiveNode::new(name, loc);
        dir.raw_name = raw_name;
        dir.arg = arg;
        dir.exp = value.map(|v| ExpressionNode::Simple(SimpleExpressionNode::new(v.content, false, v.inner)));
        dir.modifiers = modifiers;
        dir
    }

    // ------------------------------------------------------------------
    // Text, interpolation and comments
    // ------------------------------------------------------------------

    fn parse_interpolation(&mut self, mode: TextMode) -> Option<Pending> {
        let (open_len, close) = (
            self.options.delimiters.0.len(),
            self.options.delimiters.1.clone(),
        );
        let rest = self.cursor.rest();
        let Some(close_index) = rest
            .as_bytes()
            .get(open_len..)
            .and_then(|tail| memmem::find(tail, close.as_bytes()))
            .map(|i| i + open_len)
        else {
            self.emit_error(ErrorCode::MissingInterpolationEnd, 0, None);
            return None;
        };

        let start = self.cursor.position();
        self.cursor.advance_by(open_len);
        let content_start = self.cursor.position();

        let raw = &rest[open_len..close_index];
        let lead = raw.len() - raw.trim_start().len();
        let trail = raw.len() - raw.trim_end().len();
        let decoded = self.parse_text_data(raw.len(), mode);

        let input = self.cursor.input();
        let inner_start = advance_position(input, content_start, lead);
        let inner_end = advance_position(input, content_start, (raw.len() - trail).max(lead));
        self.cursor.advance_by(close.len());

        let exp = SimpleExpressionNode::new(
            decoded.trim(),
            false,
            self.cursor.selection(inner_start, Some(inner_end)),
        );
        Some(Pending {
            kind: NodeKind::Interpolation(InterpolationNode {
                content: ExpressionNode::Simple(exp),
            }),
            loc: self.cursor.selection(start, None),
        })
    }

    fn parse_text(&mut self, mode: TextMode) -> Pending {
        let rest = self.cursor.rest();
        let tail = rest.as_bytes().get(1..).unwrap_or_default();
        let mut end = rest.len();

        let mut tokens: Vec<&[u8]> = vec![b"<".as_slice(), self.options.delimiters.0.as_bytes()];
        if mode == TextMode::CData {
            tokens.push(b"]]>".as_slice());
        }
        for token in tokens {
            if let Some(index) = memmem::find(tail, token) {
                end = end.min(index + 1);
            }
        }

        let start = self.cursor.position();
        let content = self.parse_text_data(end, mode);
        let loc = self.cursor.selection(start, None);
        Pending {
            kind: NodeKind::Text(TextNode::new(content, loc.clone())),
            loc,
        }
    }

    /// Consume `length` bytes, decoding character references where the mode
    /// allows it.
    fn parse_text_data(&mut self, length: usize, mode: TextMode) -> String {
        let rest = self.cursor.rest();
        let raw = rest.get(..length).unwrap_or(rest);

        let text = if matches!(mode, TextMode::RawText | TextMode::CData) {
            String::from(raw)
        } else {
            if let Some(i) = memchr(0, raw.as_bytes()) {
                self.emit_error(ErrorCode::UnexpectedNullCharacter, i, None);
            }
            let text = if self.options.decode_entities {
                decode_entities(raw, mode == TextMode::AttributeValue)
            } else {
                raw.into()
            };
            String::from(text.replace('\0', "\u{FFFD}"))
        };

        self.cursor.advance_by(raw.len());
        text
    }

    fn parse_comment(&mut self) -> Pending {
        let start = self.cursor.position();
        let rest = self.cursor.rest();

        let content = match find_comment_close(rest) {
            None => {
                self.cursor.advance_by(rest.len());
                self.emit_error(ErrorCode::EofInComment, 0, None);
                rest.get(4..).unwrap_or_default()
            }
            Some((index, close_len, bang)) => {
                if index <= 3 {
                    self.emit_error(ErrorCode::AbruptClosingOfEmptyComment, 0, None);
                }
                if bang {
                    self.emit_error(ErrorCode::IncorrectlyClosedComment, 0, None);
                }
                let body = &rest.as_bytes()[..index];
                let mut prev = 1;
                while let Some(nested) = memmem::find(&body[prev..], b"<!--").map(|i| i + prev) {
                    self.cursor.advance_by(nested - prev + 1);
                    if nested + 4 < body.len() {
                        self.emit_error(ErrorCode::NestedComment, 0, None);
                    }
                    prev = nested + 1;
                }
                self.cursor.advance_by(index + close_len - prev + 1);
                rest.get(4..index).unwrap_or_default()
            }
        };

        Pending {
            kind: NodeKind::Comment(CommentNode {
                content: content.into(),
            }),
            loc: self.cursor.selection(start, None),
        }
    }

    /// `<!DOCTYPE ...>`, `<?...>` and other malformed markup, kept as comments.
    fn parse_bogus_comment(&mut self) -> Pending {
        let start = self.cursor.position();
        let rest = self.cursor.rest();
        let content_start = if rest.as_bytes().get(1) == Some(&b'?') { 1 } else { 2 };

        let content = match memchr(b'>', rest.as_bytes()) {
            None => {
                self.cursor.advance_by(rest.len());
                rest.get(content_start..).unwrap_or_default()
            }
            Some(close) => {
                self.cursor.advance_by(close + 1);
                rest.get(content_start..close).unwrap_or_default()
            }
        };

        Pending {
            kind: NodeKind::Comment(CommentNode {
                content: content.into(),
            }),
            loc: self.cursor.selection(start, None),
        }
    }

    fn parse_cdata(&mut self, ancestors: &mut Vec<ElementNode>) -> Vec<Pending> {
        self.cursor.advance_by("<![CDATA[".len());
        let nodes = self.parse_children(TextMode::CData, ancestors);
        if self.cursor.is_eof() {
            self.emit_error(ErrorCode::EofInCdata, 0, None);
        } else {
            self.cursor.advance_by(3);
        }
        nodes
    }
}

/// Append a node, merging it into a directly preceding text node.
fn push_node(nodes: &mut Vec<Pending>, node: Pending) {
    if let (NodeKind::Text(text), Some(prev)) = (&node.kind, nodes.last_mut()) {
        if prev.loc.end.offset == node.loc.start.offset {
            if let NodeKind::Text(prev_text) = &mut prev.kind {
                prev_text.content.push_str(&text.content);
                prev.loc.end = node.loc.end;
                prev.loc.source.push_str(&node.loc.source);
                prev_text.loc = prev.loc.clone();
                return;
            }
        }
    }
    nodes.push(node);
}

fn strip_leading_newline(nodes: &mut [Pending]) {
    if let Some(NodeKind::Text(text)) = nodes.first_mut().map(|n| &mut n.kind) {
        if let Some(stripped) = text
            .content
            .strip_prefix("\r\n")
            .or_else(|| text.content.strip_prefix('\n'))
        {
            text.content = String::from(stripped);
        }
    }
}

fn condense_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_ascii() && is_whitespace(ch as u8) {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

fn starts_with_end_tag_open(source: &str, tag: &str) -> bool {
    let bytes = source.as_bytes();
    let end = 2 + tag.len();
    source.starts_with("</")
        && bytes.len() >= end
        && bytes[2..end].eq_ignore_ascii_case(tag.as_bytes())
        && bytes
            .get(end)
            .is_none_or(|b| is_whitespace(*b) || *b == b'/' || *b == b'>')
}

/// Offset and length of the first `-->` or `--!>`, and whether it was the
/// latter.
fn find_comment_close(source: &str) -> Option<(usize, usize, bool)> {
    let bytes = source.as_bytes();
    memchr_iter(b'-', bytes).find_map(|i| {
        if bytes.get(i + 1) != Some(&b'-') {
            return None;
        }
        match bytes.get(i + 2) {
            Some(b'>') => Some((i, 3, false)),
            Some(b'!') if bytes.get(i + 3) == Some(&b'>') => Some((i, 4, true)),
            _ => None,
        }
    })
}

fn core_component(tag: &str) -> Option<RuntimeHelper> {
    match tag {
        "Teleport" | "teleport" => Some(RuntimeHelper::Teleport),
        "Suspense" | "suspense" => Some(RuntimeHelper::Suspense),
        "KeepAlive" | "keep-alive" => Some(RuntimeHelper::KeepAlive),
        "BaseTransition" | "base-transition" => Some(RuntimeHelper::BaseTransition),
        _ => None,
    }
}

fn is_directive_name(name: &str) -> bool {
    name.starts_with("v-") || name.starts_with([':', '@', '#'])
}

/// Pieces of a directive attribute name such as `v-on:click.stop`.
struct DirectiveNameParts<'s> {
    /// `on` in `v-on:click`
    name: Option<&'s str>,
    /// Argument text and its byte offset in the attribute name
    arg: Option<(&'s str, usize)>,
    /// Everything after the argument (`.stop`)
    rest: Option<&'s str>,
}

fn split_directive_name(raw: &str) -> DirectiveNameParts<'_> {
    let bytes = raw.as_bytes();
    let mut pos = 0;
    let mut name = None;

    if raw.starts_with("v-") || raw.starts_with("V-") {
        let len = bytes[2..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
            .count();
        if len > 0 {
            name = Some(&raw[2..2 + len]);
            pos = 2 + len;
        }
    }

    let mut arg = None;
    let sep = bytes.get(pos).copied();
    if sep == Some(b':') || (pos == 0 && matches!(sep, Some(b'@' | b'#'))) {
        let arg_start = pos + 1;
        let tail = &raw[arg_start..];
        let len = dynamic_arg_len(tail)
            .unwrap_or_else(|| tail.bytes().take_while(|b| *b != b'.').count());
        if len > 0 {
            arg = Some((&tail[..len], arg_start));
            pos = arg_start + len;
        }
    }

    DirectiveNameParts {
        name,
        arg,
        rest: (pos < raw.len()).then(|| &raw[pos..]),
    }
}

/// Length of a complete `[...]` argument at the start of `tail`.
fn dynamic_arg_len(tail: &str) -> Option<usize> {
    if !tail.starts_with('[') {
        return None;
    }
    let close = memchr(b']', tail.as_bytes())?;
    (close > 1).then_some(close + 1)
}

fn skip_first_char(s: &str) -> &str {
    let mut chars = s.chars();
    chars.next();
    chars.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(ast: &TemplateAst) -> &ElementNode {
        let id = ast.children(NodeId::ROOT)[0];
        ast.element(id).unwrap()
    }

    fn text_of(ast: &TemplateAst, id: NodeId) -> &str {
        match &ast.node(id).kind {
            NodeKind::Text(t) => t.content.as_str(),
            other => panic!("expected text, got {:?}", other.node_type()),
        }
    }

    fn directive<'a>(el: &'a ElementNode, raw: &str) -> &'a DirectiveNode {
        el.props
            .iter()
            .find_map(|p| match p {
                PropNode::Directive(d) if d.raw_name == raw => Some(d),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_parse_simple_element() {
        let (ast, errors) = parse(r#"<div id="app">hello</div>"#);
        assert!(errors.is_empty());
        let div = first_element(&ast);
        assert_eq!(div.tag, "div");
        assert_eq!(div.tag_type, ElementType::Element);
        let id = div.find_attr("id").unwrap();
        assert_eq!(id.value.as_ref().unwrap().content, "app");
        assert_eq!(id.value.as_ref().unwrap().loc.source, "\"app\"");
        assert_eq!(text_of(&ast, div.children[0]), "hello");
    }

    #[test]
    fn test_parse_interpolation() {
        let (ast, errors) = parse("{{  msg }}");
        assert!(errors.is_empty());
        let id = ast.children(NodeId::ROOT)[0];
        let NodeKind::Interpolation(interp) = &ast.node(id).kind else {
            panic!("expected interpolation");
        };
        let exp = interp.content.loc();
        assert_eq!(interp.content.source_text(), "msg");
        assert_eq!(exp.start.offset, 4);
        assert_eq!(exp.end.offset, 7);
        assert_eq!(exp.source, "msg");
        assert_eq!(ast.node(id).loc.source, "{{  msg }}");
    }

    #[test]
    fn test_missing_interpolation_end() {
        let (ast, errors) = parse("{{ msg");
        assert_eq!(errors[0].code, ErrorCode::MissingInterpolationEnd.code());
        let id = ast.children(NodeId::ROOT)[0];
        assert_eq!(text_of(&ast, id), "{{ msg");
    }

    #[test]
    fn test_parse_directives() {
        let source = r#"<div v-if="ok" :class="cls" @click.stop.prevent="go" v-bind:[key]="v" v-custom></div>"#;
        let (ast, errors) = parse(source);
        assert!(errors.is_empty());
        let div = first_element(&ast);

        let v_if = directive(div, "v-if");
        assert_eq!(v_if.kind, DirectiveKind::If);
        assert_eq!(v_if.exp.as_ref().unwrap().source_text(), "ok");
        assert_eq!(v_if.exp.as_ref().unwrap().loc().source, "ok");

        let class = directive(div, ":class");
        assert_eq!(class.kind, DirectiveKind::Bind);
        assert!(class.arg.as_ref().unwrap().is_static_key("class"));

        let click = directive(div, "@click.stop.prevent");
        assert_eq!(click.name, "on");
        assert!(click.has_modifier("stop"));
        assert!(click.has_modifier("prevent"));
        assert_eq!(click.arg.as_ref().unwrap().loc().source, "click");

        let dynamic = directive(div, "v-bind:[key]");
        let arg = dynamic.arg.as_ref().unwrap();
        assert!(!arg.is_static());
        assert_eq!(arg.source_text(), "key");

        let custom = directive(div, "v-custom");
        assert_eq!(custom.kind, DirectiveKind::Custom("custom".into()));
        assert!(custom.exp.is_none());
    }

    #[test]
    fn test_slot_shorthand_keeps_dotted_arg() {
        let (ast, _) = parse(r#"<Comp><template #item.name="{ x }"></template></Comp>"#);
        let comp = first_element(&ast);
        let template = ast.element(comp.children[0]).unwrap();
        let slot = directive(template, "#item.name");
        assert_eq!(slot.kind, DirectiveKind::Slot);
        assert_eq!(slot.arg.as_ref().unwrap().source_text(), "item.name");
        assert_eq!(template.tag_type, ElementType::Template);
    }

    #[test]
    fn test_void_and_self_closing() {
        let (ast, errors) = parse(r#"<img src="a.png"><br/><span/>"#);
        assert!(errors.is_empty());
        let children = ast.children(NodeId::ROOT);
        assert_eq!(children.len(), 3);
        assert!(ast.element(children[1]).unwrap().is_self_closing);
        assert_eq!(ast.node(children[0]).loc.source, r#"<img src="a.png">"#);
    }

    #[test]
    fn test_missing_end_tag() {
        let (ast, errors) = parse("<div><span></div>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::MissingEndTag.code());
        assert_eq!(errors[0].loc.as_ref().unwrap().start.offset, 5);
        let div = first_element(&ast);
        assert_eq!(div.children.len(), 1);
    }

    #[test]
    fn test_invalid_end_tag() {
        let (_, errors) = parse("<div></span></div>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::InvalidEndTag.code());
    }

    #[test]
    fn test_condense_whitespace() {
        let (ast, _) = parse("<div>\n  <span>a</span>\n  <span>b</span>\n</div><p>a   b\n c</p>");
        let root = ast.children(NodeId::ROOT);
        let div = ast.element(root[0]).unwrap();
        assert_eq!(div.children.len(), 2);
        let p = ast.element(root[1]).unwrap();
        assert_eq!(text_of(&ast, p.children[0]), "a b c");
    }

    #[test]
    fn test_whitespace_between_inline_nodes_kept() {
        let (ast, _) = parse("<span>a</span> <span>b</span>");
        let root = ast.children(NodeId::ROOT);
        assert_eq!(root.len(), 3);
        assert_eq!(text_of(&ast, root[1]), " ");
    }

    #[test]
    fn test_pre_preserves_whitespace() {
        let options = ParserOptions {
            is_pre_tag: |tag| tag == "pre",
            ..Default::default()
        };
        let (ast, _) = parse_with_options("<pre>\n  a  \n</pre>", options);
        let pre = first_element(&ast);
        assert_eq!(text_of(&ast, pre.children[0]), "  a  \n");
    }

    #[test]
    fn test_raw_text_mode() {
        let options = ParserOptions {
            get_text_mode: |tag, _, _| {
                if tag == "script" {
                    TextMode::RawText
                } else {
                    TextMode::Data
                }
            },
            ..Default::default()
        };
        let (ast, errors) =
            parse_with_options("<script>if (a < b) { x('</div>') }</script>", options);
        assert!(errors.is_empty());
        let script = first_element(&ast);
        assert_eq!(script.children.len(), 1);
        assert_eq!(
            text_of(&ast, script.children[0]),
            "if (a < b) { x('</div>') }"
        );
    }

    #[test]
    fn test_rcdata_decodes_entities() {
        let options = ParserOptions {
            get_text_mode: |tag, _, _| {
                if tag == "textarea" {
                    TextMode::RcData
                } else {
                    TextMode::Data
                }
            },
            ..Default::default()
        };
        let (ast, _) = parse_with_options("<textarea>&lt;b&gt;<i></textarea>", options);
        let textarea = first_element(&ast);
        assert_eq!(textarea.children.len(), 1);
        assert_eq!(text_of(&ast, textarea.children[0]), "<b><i>");
    }

    #[test]
    fn test_namespace_callback() {
        let options = ParserOptions {
            get_namespace: |tag, parent| {
                if tag == "svg" {
                    Namespace::Svg
                } else {
                    parent.map(|p| p.ns).unwrap_or_default()
                }
            },
            ..Default::default()
        };
        let (ast, _) = parse_with_options("<svg><circle/></svg>", options);
        let svg = first_element(&ast);
        assert_eq!(svg.ns, Namespace::Svg);
        assert_eq!(ast.element(svg.children[0]).unwrap().ns, Namespace::Svg);
    }

    #[test]
    fn test_locations() {
        let source = "<template>\n  <div/>\n</template>";
        let (ast, _) = parse(source);
        let template = first_element(&ast);
        assert_eq!(template.children.len(), 1);
        let loc = &ast.node(template.children[0]).loc;
        assert_eq!(loc.start, Position::new(13, 2, 3));
        assert_eq!(loc.end, Position::new(19, 2, 9));
        assert_eq!(&source[loc.start.offset as usize..loc.end.offset as usize], "<div/>");
        assert_eq!(ast.node(NodeId::ROOT).loc.source, source);
    }

    #[test]
    fn test_element_types() {
        let (ast, _) = parse(
            r#"<Foo/><component is="x"/><keep-alive></keep-alive><slot/><template v-if="a"></template><template></template>"#,
        );
        let types: Vec<_> = ast
            .children(NodeId::ROOT)
            .iter()
            .map(|id| ast.element(*id).unwrap().tag_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ElementType::Component,
                ElementType::Component,
                ElementType::Component,
                ElementType::Slot,
                ElementType::Template,
                ElementType::Element,
            ]
        );
        let keep_alive = ast.element(ast.children(NodeId::ROOT)[2]).unwrap();
        assert_eq!(keep_alive.builtin, Some(RuntimeHelper::KeepAlive));
    }

    #[test]
    fn test_native_tag_option() {
        let options = ParserOptions {
            is_native_tag: Some(|tag| tag == "div"),
            ..Default::default()
        };
        let (ast, _) = parse_with_options("<div></div><my-comp></my-comp>", options);
        let root = ast.children(NodeId::ROOT);
        assert_eq!(ast.element(root[0]).unwrap().tag_type, ElementType::Element);
        assert_eq!(ast.element(root[1]).unwrap().tag_type, ElementType::Component);
    }

    #[test]
    fn test_comments() {
        let (ast, errors) = parse("<!-- hi --><div></div>");
        assert!(errors.is_empty());
        let NodeKind::Comment(comment) = &ast.node(ast.children(NodeId::ROOT)[0]).kind else {
            panic!("expected comment");
        };
        assert_eq!(comment.content, " hi ");

        let options = ParserOptions {
            comments: false,
            ..Default::default()
        };
        let (ast, _) = parse_with_options("<!-- hi --><div></div>", options);
        assert_eq!(ast.children(NodeId::ROOT).len(), 1);
    }

    #[test]
    fn test_comment_errors() {
        let (_, errors) = parse("<!-->");
        assert_eq!(errors[0].code, ErrorCode::AbruptClosingOfEmptyComment.code());
        let (_, errors) = parse("<!-- a");
        assert_eq!(errors[0].code, ErrorCode::EofInComment.code());
    }

    #[test]
    fn test_v_pre() {
        let (ast, errors) = parse(r#"<div v-pre>{{ raw }} <span :a="b"></span></div>"#);
        assert!(errors.is_empty());
        let div = first_element(&ast);
        assert!(div.props.is_empty());
        assert_eq!(text_of(&ast, div.children[0]), "{{ raw }} ");
        let span = ast.element(div.children[1]).unwrap();
        assert!(matches!(&span.props[0], PropNode::Attribute(a) if a.name == ":a"));
    }

    #[test]
    fn test_attribute_errors() {
        let (_, errors) = parse(r#"<div a="1" a="2"></div>"#);
        assert_eq!(errors[0].code, ErrorCode::DuplicateAttribute.code());
        let (_, errors) = parse(r#"<div a="1"b></div>"#);
        assert_eq!(
            errors[0].code,
            ErrorCode::MissingWhitespaceBetweenAttributes.code()
        );
        let (_, errors) = parse("<div");
        assert_eq!(errors[0].code, ErrorCode::EofInTag.code());
    }

    #[test]
    fn test_attribute_entities() {
        let (ast, _) = parse(r#"<a title="a &amp; b" href=x&amp;y></a>"#);
        let a = first_element(&ast);
        let title = a.find_attr("title").unwrap();
        assert_eq!(title.value.as_ref().unwrap().content, "a & b");
        let href = a.find_attr("href").unwrap();
        assert_eq!(href.value.as_ref().unwrap().content, "x&y");
    }
}
