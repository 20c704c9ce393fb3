//! Input cursor with line/column tracking.

use memchr::{memchr_iter, memrchr};
use vellum_relief::ast::{Position, SourceLocation};

#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    input: &'a str,
    pos: Position,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: Position::new(0, 1, 1),
        }
    }

    #[inline]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Unconsumed input.
    #[inline]
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos.offset as usize..]
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn reset(&mut self, pos: Position) {
        self.pos = pos;
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos.offset as usize >= self.input.len()
    }

    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Byte at `i` in the unconsumed input.
    #[inline]
    pub fn peek(&self, i: usize) -> Option<u8> {
        self.rest().as_bytes().get(i).copied()
    }

    pub fn advance_by(&mut self, n: usize) {
        self.pos = advance_position(self.input, self.pos, n);
    }

    pub fn advance_spaces(&mut self) {
        let n = self
            .rest()
            .bytes()
            .take_while(|b| is_whitespace(*b))
            .count();
        if n > 0 {
            self.advance_by(n);
        }
    }

    /// Location from `start` to `end` (or the current position).
    pub fn selection(&self, start: Position, end: Option<Position>) -> SourceLocation {
        let end = end.unwrap_or(self.pos);
        let source = self
            .input
            .get(start.offset as usize..end.offset as usize)
            .unwrap_or_default();
        SourceLocation::new(start, end, source)
    }
}

/// Position `n` bytes after `start`. Columns count characters.
pub(crate) fn advance_position(input: &str, start: Position, n: usize) -> Position {
    let from = start.offset as usize;
    let to = (from + n).min(input.len());
    let bytes = &input.as_bytes()[from..to];

    let newlines = memchr_iter(b'\n', bytes).count() as u32;
    let tail = match memrchr(b'\n', bytes) {
        Some(i) => &bytes[i + 1..],
        None => bytes,
    };
    let chars = tail.iter().filter(|b| (**b & 0xC0) != 0x80).count() as u32;

    Position {
        offset: to as u32,
        line: start.line + newlines,
        column: if newlines > 0 { chars + 1 } else { start.column + chars },
    }
}

#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\r' | b'\n' | b'\x0c' | b' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_lines() {
        let mut cursor = Cursor::new("ab\ncd\né");
        cursor.advance_by(4);
        assert_eq!(cursor.position(), Position::new(4, 2, 2));
        cursor.advance_by(4);
        assert_eq!(cursor.position(), Position::new(8, 3, 2));
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_selection_slices_input() {
        let mut cursor = Cursor::new("  <div>");
        cursor.advance_spaces();
        let start = cursor.position();
        cursor.advance_by(5);
        let loc = cursor.selection(start, None);
        assert_eq!(loc.source, "<div>");
        assert_eq!(loc.start.column, 3);
        assert_eq!(loc.end.column, 8);
    }
}
