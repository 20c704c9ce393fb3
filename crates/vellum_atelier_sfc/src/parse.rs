//! Splitting a `.vue` document into blocks.
//!
//! The document is read with the template parser under SFC rules: every
//! top-level element except `<template>` holds raw text and whitespace is kept
//! everywhere, so block content can be sliced straight out of the input.

use std::sync::Arc;

use vellum_carton::{generate_code_frame, String};
use vellum_relief::ast::{ElementNode, NodeId, PropNode, SourceLocation, TemplateAst};
use vellum_relief::{ParserOptions, TextMode, WhitespaceStrategy};

use crate::cache::{ParseCacheKey, PARSE_CACHE};
use crate::source_map::generate_source_map;
use crate::types::{AttrValue, PadMode, SfcBlock, SfcDescriptor, SfcParseOptions, SfcParseResult};

/// Parse an SFC into its descriptor.
///
/// Results are memoized: the same source and options hand back the same
/// `Arc`.
pub fn parse_sfc(source: &str, options: SfcParseOptions) -> Arc<SfcParseResult> {
    let key = ParseCacheKey::new(source, &options);
    if let Some(cached) = PARSE_CACHE.get(&key) {
        tracing::debug!(filename = %options.filename, "sfc parse cache hit");
        return cached;
    }
    tracing::debug!(filename = %options.filename, "sfc parse cache miss");

    let result = Arc::new(parse_uncached(source, &options));
    PARSE_CACHE.insert(key, Arc::clone(&result));
    result
}

fn parse_uncached(source: &str, options: &SfcParseOptions) -> SfcParseResult {
    let mut descriptor = SfcDescriptor::new(options.filename.clone(), source);
    let (ast, errors) = vellum_armature::parse_with_options(source, sfc_parser_options());

    for &child in ast.children(NodeId::ROOT) {
        let Some(el) = ast.element(child) else {
            continue;
        };
        if el.children.is_empty() && !has_src(el) {
            continue;
        }
        match el.tag.as_str() {
            "template" => {
                if descriptor.template.is_none() {
                    descriptor.template = Some(create_block(&ast, child, source, PadMode::None));
                } else {
                    warn_duplicate_block(source, &options.filename, el, &ast.node(child).loc);
                }
            }
            "script" => {
                if descriptor.script.is_none() {
                    descriptor.script = Some(create_block(&ast, child, source, options.pad));
                } else {
                    warn_duplicate_block(source, &options.filename, el, &ast.node(child).loc);
                }
            }
            "style" => descriptor
                .styles
                .push(create_block(&ast, child, source, options.pad)),
            _ => descriptor
                .custom_blocks
                .push(create_block(&ast, child, source, options.pad)),
        }
    }

    if options.source_map {
        let gen_map = |block: &mut SfcBlock| {
            if block.src.is_some() {
                return;
            }
            let line_offset = if options.pad == PadMode::None || block.block_type == "template" {
                block.loc.start.line.saturating_sub(1)
            } else {
                0
            };
            block.map = Some(generate_source_map(
                &options.filename,
                source,
                &block.content,
                &options.source_root,
                line_offset,
            ));
        };
        let blocks = descriptor
            .template
            .iter_mut()
            .chain(descriptor.script.iter_mut())
            .chain(descriptor.styles.iter_mut());
        blocks.for_each(gen_map);
    }

    SfcParseResult { descriptor, errors }
}

/// Markup rules for the block level. Only `<template>` content is markup;
/// nothing is resolved as a component here.
fn sfc_parser_options() -> ParserOptions {
    ParserOptions {
        whitespace: WhitespaceStrategy::Preserve,
        is_pre_tag: |_| true,
        is_native_tag: Some(|_| true),
        get_text_mode: |tag, _, parent| {
            if parent.is_none() && tag != "template" {
                TextMode::RawText
            } else {
                TextMode::Data
            }
        },
        comments: true,
        ..vellum_atelier_dom::parser_options()
    }
}

fn has_src(el: &ElementNode) -> bool {
    el.props
        .iter()
        .any(|p| matches!(p, PropNode::Attribute(attr) if attr.name == "src"))
}

fn create_block(ast: &TemplateAst, node: NodeId, source: &str, pad: PadMode) -> SfcBlock {
    let node_loc = &ast.node(node).loc;
    let Some(el) = ast.element(node) else {
        return SfcBlock::new("", "", node_loc.clone());
    };

    let (start, end) = match (el.children.first(), el.children.last()) {
        (Some(&first), Some(&last)) => (ast.node(first).loc.start, ast.node(last).loc.end),
        _ => (node_loc.start, node_loc.end),
    };
    let content = if el.children.is_empty() {
        ""
    } else {
        source
            .get(start.offset as usize..end.offset as usize)
            .unwrap_or_default()
    };
    let mut block = SfcBlock::new(el.tag.clone(), content, SourceLocation::new(start, end, content));

    for prop in &el.props {
        let PropNode::Attribute(attr) = prop else {
            continue;
        };
        let value = attr
            .value
            .as_ref()
            .map(|v| v.content.clone())
            .filter(|v| !v.is_empty());
        block.attrs.insert(
            attr.name.clone(),
            value.clone().map_or(AttrValue::True, AttrValue::Str),
        );
        match attr.name.as_str() {
            "lang" => block.lang = value,
            "src" => block.src = value,
            "scoped" if block.block_type == "style" => block.scoped = true,
            "module" if block.block_type == "style" => {
                block.module = Some(value.map_or(AttrValue::True, AttrValue::Str));
            }
            "functional" if block.block_type == "template" => block.functional = true,
            _ => {}
        }
    }

    if pad != PadMode::None {
        let mut padded = pad_content(source, &block, pad);
        padded.push_str(&block.content);
        block.content = padded;
    }
    block
}

/// Filler placed before a block's content so offsets or line numbers line up
/// with the document.
fn pad_content(source: &str, block: &SfcBlock, pad: PadMode) -> String {
    let prefix = source
        .get(..block.loc.start.offset as usize)
        .unwrap_or_default();
    match pad {
        PadMode::None => String::default(),
        PadMode::Space => {
            let mut out = String::with_capacity(prefix.len());
            for ch in prefix.chars() {
                match ch {
                    '\n' | '\r' | '\u{2028}' | '\u{2029}' => out.push(ch),
                    // one space per UTF-16 unit
                    _ => (0..ch.len_utf16()).for_each(|_| out.push(' ')),
                }
            }
            out
        }
        PadMode::Line => {
            let lines = prefix.split('\n').count();
            let pad_line = if block.block_type == "script" && block.lang.is_none() {
                "//\n"
            } else {
                "\n"
            };
            String::from(pad_line.repeat(lines - 1))
        }
    }
}

fn warn_duplicate_block(source: &str, filename: &str, el: &ElementNode, loc: &SourceLocation) {
    let frame = generate_code_frame(source, loc.start.offset as usize, loc.end.offset as usize);
    let location = format!("{filename}:{}:{}", loc.start.line, loc.start.column);
    tracing::warn!(
        filename = %filename,
        line = loc.start.line,
        column = loc.start.column,
        "Single file component can contain only one {} element ({location}):\n\n{frame}",
        el.tag
    );
}
