//! Stylesheet parser.

use vellum_relief::ast::Position;

use super::{AtRule, Comment, CssError, Declaration, Node, Raws, Root, Rule};

/// Parse a stylesheet into a lossless tree.
pub fn parse(css: &str) -> Result<Root, CssError> {
    let mut parser = Parser::new(css);
    let (nodes, after) = parser.nodes(None)?;
    Ok(Root { nodes, after })
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    line_starts: Vec<usize>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(memchr::memchr_iter(b'\n', input.as_bytes()).map(|i| i + 1))
            .collect();
        Self {
            input,
            pos: 0,
            line_starts,
        }
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        let column = self.input[line_start..offset].chars().count() + 1;
        Position::new(offset as u32, line as u32, column as u32)
    }

    fn error(&self, message: &str, offset: usize) -> CssError {
        CssError::at(message, self.position(offset))
    }

    #[inline]
    fn byte(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(offset).copied()
    }

    /// Children until the closing `}` of the block opened at `open`, or the
    /// end of input at the top level. Returns them with the trailing text.
    fn nodes(&mut self, open: Option<usize>) -> Result<(Vec<Node>, String), CssError> {
        let mut nodes = Vec::new();
        loop {
            let start = self.pos;
            while matches!(self.byte(self.pos), Some(b) if b.is_ascii_whitespace() || b == b';') {
                self.pos += 1;
            }
            let before = self.input[start..self.pos].to_string();

            match (self.byte(self.pos), open) {
                (None, None) => return Ok((nodes, before)),
                (None, Some(open)) => return Err(self.error("Unclosed block", open)),
                (Some(b'}'), Some(_)) => return Ok((nodes, before)),
                (Some(b'}'), None) => return Err(self.error("Unexpected }", self.pos)),
                (Some(b'/'), _) if self.byte(self.pos + 1) == Some(b'*') => {
                    nodes.push(Node::Comment(self.comment(before)?));
                }
                (Some(b'@'), _) => nodes.push(Node::AtRule(self.at_rule(before)?)),
                _ => nodes.push(self.rule_or_decl(before)?),
            }
        }
    }

    fn comment(&mut self, before: String) -> Result<Comment, CssError> {
        let start = self.pos;
        let body = start + 2;
        let Some(len) = self.input[body..].find("*/") else {
            return Err(self.error("Unclosed comment", start));
        };
        let inner = &self.input[body..body + len];
        self.pos = body + len + 2;

        let text = inner.trim();
        let (left, right) = if text.is_empty() {
            (inner.to_string(), String::new())
        } else {
            let left = &inner[..inner.len() - inner.trim_start().len()];
            let right = &inner[inner.trim_end().len()..];
            (left.to_string(), right.to_string())
        };
        Ok(Comment {
            text: text.to_string(),
            raws: Raws {
                before,
                left,
                right,
                ..Default::default()
            },
            source: Some(self.position(start)),
        })
    }

    fn at_rule(&mut self, before: String) -> Result<AtRule, CssError> {
        let start = self.pos;
        let name_start = start + 1;
        let name_len = self.input[name_start..]
            .bytes()
            .take_while(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80)
            .count();
        let name = &self.input[name_start..name_start + name_len];
        self.pos = name_start + name_len;

        let spaces_start = self.pos;
        while matches!(self.byte(self.pos), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let after_name = self.input[spaces_start..self.pos].to_string();

        let end = self.scan(self.pos, b"{;}")?;
        let raw = &self.input[self.pos..end];
        let params = raw.trim_end();
        let mut at_rule = AtRule {
            name: name.to_string(),
            params: params.to_string(),
            nodes: None,
            raws: Raws {
                before,
                after_name,
                between: raw[params.len()..].to_string(),
                ..Default::default()
            },
            source: Some(self.position(start)),
        };

        match self.byte(end) {
            Some(b'{') => {
                self.pos = end + 1;
                let (children, after) = self.nodes(Some(end))?;
                self.pos += 1;
                at_rule.nodes = Some(children);
                at_rule.raws.after = after;
            }
            Some(b';') => {
                self.pos = end + 1;
                at_rule.raws.semicolon = true;
            }
            _ => self.pos = end,
        }
        Ok(at_rule)
    }

    fn rule_or_decl(&mut self, before: String) -> Result<Node, CssError> {
        let start = self.pos;
        let end = self.scan(start, b"{;}")?;
        let raw = &self.input[start..end];

        if self.byte(end) == Some(b'{') {
            let selector = raw.trim_end();
            let between = raw[selector.len()..].to_string();
            self.pos = end + 1;
            let (nodes, after) = self.nodes(Some(end))?;
            self.pos += 1;
            return Ok(Node::Rule(Rule {
                selector: selector.to_string(),
                nodes,
                raws: Raws {
                    before,
                    between,
                    after,
                    ..Default::default()
                },
                source: Some(self.position(start)),
            }));
        }

        let colon = self.scan(start, b":")?;
        if colon >= end {
            return Err(self.error("Unknown word", start));
        }
        let prop = self.input[start..colon].trim_end();
        let value_start = colon
            + 1
            + self.input[colon + 1..end]
                .bytes()
                .take_while(u8::is_ascii_whitespace)
                .count();
        let between = self.input[start + prop.len()..value_start].to_string();

        let value_raw = &self.input[value_start..end];
        let trimmed = value_raw.trim_end();
        let value_after = value_raw[trimmed.len()..].to_string();
        let (value, important) = split_important(trimmed);

        let semicolon = self.byte(end) == Some(b';');
        self.pos = if semicolon { end + 1 } else { end };

        Ok(Node::Decl(Declaration {
            prop: prop.to_string(),
            value: value.to_string(),
            important: important.is_some(),
            raws: Raws {
                before,
                between,
                value_after,
                semicolon,
                important: important.map(str::to_string),
                ..Default::default()
            },
            source: Some(self.position(start)),
        }))
    }

    /// Offset of the first byte in `stops` outside strings, comments and
    /// brackets, or the end of input.
    fn scan(&self, from: usize, stops: &[u8]) -> Result<usize, CssError> {
        let bytes = self.input.as_bytes();
        let mut depth = 0usize;
        let mut i = from;
        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'\\' => i += 1,
                b'"' | b'\'' => i = self.string_end(i)?,
                b'/' if bytes.get(i + 1) == Some(&b'*') => match self.input[i + 2..].find("*/") {
                    Some(len) => i += len + 3,
                    None => return Err(self.error("Unclosed comment", i)),
                },
                b'(' | b'[' => depth += 1,
                b')' | b']' if depth > 0 => depth -= 1,
                _ if depth == 0 && stops.contains(&b) => return Ok(i),
                _ => {}
            }
            i += 1;
        }
        if depth > 0 {
            return Err(self.error("Unclosed bracket", from));
        }
        Ok(bytes.len())
    }

    /// Offset of the quote closing the string opened at `open`.
    fn string_end(&self, open: usize) -> Result<usize, CssError> {
        let bytes = self.input.as_bytes();
        let quote = bytes[open];
        let mut i = open + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 1,
                b if b == quote => return Ok(i),
                b'\n' => break,
                _ => {}
            }
            i += 1;
        }
        Err(self.error("Unclosed string", open))
    }
}

/// Split `value !important` into the value and the important text with its
/// leading whitespace.
fn split_important(value: &str) -> (&str, Option<&str>) {
    let Some(bang) = value.rfind('!') else {
        return (value, None);
    };
    if !value[bang + 1..].trim_start().eq_ignore_ascii_case("important") {
        return (value, None);
    }
    let head = value[..bang].trim_end();
    (head, Some(&value[head.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::print;

    fn round_trip(css: &str) {
        let root = parse(css).unwrap();
        assert_eq!(print(&root).css, css);
    }

    #[test]
    fn test_round_trips_formatting() {
        round_trip("");
        round_trip(".a { color: red; }\n");
        round_trip("  .a,.b{color:red;background : url( 'x;y.png' )}\n\n");
        round_trip("@import 'a.css';\n@media (max-width: 600px) {\n  .a { margin: 0 }\n}\n");
        round_trip("/* note */\n.a { color: red !important ; }\n/**/");
        round_trip("@font-face{font-family:x}\n.a{;color:red;;}\n");
        round_trip("@keyframes fade {\n  from { opacity: 0 }\n  50% { opacity: .5 }\n}");
    }

    #[test]
    fn test_node_shapes() {
        let root = parse("@media screen { .a:hover { color: red !IMPORTANT; top: 0 } }").unwrap();
        let Node::AtRule(media) = &root.nodes[0] else {
            panic!("expected at-rule");
        };
        assert_eq!((media.name.as_str(), media.params.as_str()), ("media", "screen"));
        let Node::Rule(rule) = &media.nodes.as_ref().unwrap()[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ".a:hover");
        let Node::Decl(color) = &rule.nodes[0] else {
            panic!("expected declaration");
        };
        assert_eq!((color.prop.as_str(), color.value.as_str()), ("color", "red"));
        assert!(color.important);
        assert_eq!(color.raws.important.as_deref(), Some(" !IMPORTANT"));
        let Node::Decl(top) = &rule.nodes[1] else {
            panic!("expected declaration");
        };
        assert!(!top.raws.semicolon);
    }

    #[test]
    fn test_source_positions() {
        let root = parse(".a {}\n\n.b {\n  color: red;\n}").unwrap();
        let Node::Rule(b) = &root.nodes[1] else {
            panic!("expected rule");
        };
        let start = b.source.unwrap();
        assert_eq!((start.line, start.column, start.offset), (3, 1, 7));
        assert_eq!(b.nodes[0].source().unwrap().line, 4);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse(".a { color: red").unwrap_err().message, "Unclosed block");
        assert_eq!(parse(".a {}\n}").unwrap_err().line, 2);
        assert_eq!(parse("/* open").unwrap_err().message, "Unclosed comment");
        assert_eq!(parse(".a { content: \"x }").unwrap_err().message, "Unclosed string");
        assert_eq!(parse(".a { color }").unwrap_err().message, "Unknown word");
    }
}
