//! Code generation buffer with position tracking for source maps.

use sourcemap::{SourceMap, SourceMapBuilder};
use vellum_relief::ast::{RuntimeHelper, SourceLocation};
use vellum_relief::errors::CompilerError;

use crate::options::CompilerOptions;

/// Result of generating a render function.
#[derive(Debug, Clone)]
pub struct CodegenResult {
    /// Full module or function body, preamble included
    pub code: String,
    /// Imports and hoists emitted before the render function (module mode)
    pub preamble: String,
    pub map: Option<SourceMap>,
    pub errors: Vec<CompilerError>,
}

pub struct CodegenContext<'a> {
    pub(super) options: &'a CompilerOptions,
    pub(super) code: String,
    pub(super) indent_level: usize,
    /// Annotate calls with `/*#__PURE__*/` (inside hoisted declarations)
    pub(super) pure: bool,
    /// 0-based generated line
    line: u32,
    /// 0-based generated column, in UTF-16 code units
    column: u32,
    map: Option<MapState>,
}

struct MapState {
    builder: SourceMapBuilder,
    source_id: u32,
}

impl<'a> CodegenContext<'a> {
    pub fn new(options: &'a CompilerOptions, source: &str) -> Self {
        let map = options.source_map.then(|| {
            let mut builder = SourceMapBuilder::new(None);
            let source_id = builder.add_source(&options.filename);
            builder.set_source_contents(source_id, Some(source));
            MapState { builder, source_id }
        });
        Self {
            options,
            code: String::with_capacity(source.len() * 2 + 256),
            indent_level: 0,
            pure: false,
            line: 0,
            column: 0,
            map,
        }
    }

    pub fn push(&mut self, code: &str) {
        for ch in code.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += ch.len_utf16() as u32;
            }
        }
        self.code.push_str(code);
    }

    /// Push code produced from `loc`, recording a mapping at its start.
    pub fn push_mapped(&mut self, code: &str, loc: &SourceLocation) {
        if let Some(map) = self.map.as_mut() {
            if *loc != SourceLocation::STUB {
                map.builder.add_raw(
                    self.line,
                    self.column,
                    loc.start.line.saturating_sub(1),
                    loc.start.column.saturating_sub(1),
                    Some(map.source_id),
                    None,
                    false,
                );
            }
        }
        self.push(code);
    }

    pub fn newline(&mut self) {
        self.push("\n");
        for _ in 0..self.indent_level {
            self.push("  ");
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
        self.newline();
    }

    pub fn deindent(&mut self, without_newline: bool) {
        self.indent_level = self.indent_level.saturating_sub(1);
        if !without_newline {
            self.newline();
        }
    }

    pub fn helper(&self, helper: RuntimeHelper) -> String {
        format!("_{}", helper.name())
    }

    pub fn push_helper(&mut self, helper: RuntimeHelper) {
        self.push("_");
        self.push(helper.name());
    }

    pub fn push_pure(&mut self) {
        if self.pure {
            self.push("/*#__PURE__*/");
        }
    }

    pub fn finish(self) -> (String, Option<SourceMap>) {
        (self.code, self.map.map(|m| m.builder.into_sourcemap()))
    }
}
