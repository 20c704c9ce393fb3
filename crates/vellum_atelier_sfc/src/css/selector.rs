//! Selector lists as node sequences.
//!
//! Whitespace is kept on the nodes: a descendant combinator stores its raw
//! whitespace as its value, while padding around `>`, `+`, `~` and at the
//! ends of a selector lives in `spaces`. Serializing an untouched list gives
//! back the input.

use std::fmt::{self, Write as _};

use vellum_relief::ast::Position;

use super::CssError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spaces {
    pub before: String,
    pub after: String,
}

/// Comma separated selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub nodes: Vec<SelectorNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorNode {
    Tag { value: String, spaces: Spaces },
    /// Name without the dot
    Class { value: String, spaces: Spaces },
    /// Name without the hash
    Id { value: String, spaces: Spaces },
    /// Text between the brackets
    Attribute { value: String, spaces: Spaces },
    Universal { spaces: Spaces },
    Nesting { spaces: Spaces },
    /// `value` keeps its colons; `args` holds the parenthesized selectors
    Pseudo {
        value: String,
        args: Option<Vec<Selector>>,
        spaces: Spaces,
    },
    Combinator { value: String, spaces: Spaces },
    /// Quoted text, quotes included
    String { value: String, spaces: Spaces },
    /// Comment text, delimiters included
    Comment { value: String, spaces: Spaces },
}

impl SelectorNode {
    pub fn attribute(value: impl Into<String>) -> Self {
        Self::Attribute {
            value: value.into(),
            spaces: Spaces::default(),
        }
    }

    pub fn combinator(value: impl Into<String>) -> Self {
        Self::Combinator {
            value: value.into(),
            spaces: Spaces::default(),
        }
    }

    pub fn spaces(&self) -> &Spaces {
        match self {
            Self::Tag { spaces, .. }
            | Self::Class { spaces, .. }
            | Self::Id { spaces, .. }
            | Self::Attribute { spaces, .. }
            | Self::Universal { spaces }
            | Self::Nesting { spaces }
            | Self::Pseudo { spaces, .. }
            | Self::Combinator { spaces, .. }
            | Self::String { spaces, .. }
            | Self::Comment { spaces, .. } => spaces,
        }
    }

    pub fn spaces_mut(&mut self) -> &mut Spaces {
        match self {
            Self::Tag { spaces, .. }
            | Self::Class { spaces, .. }
            | Self::Id { spaces, .. }
            | Self::Attribute { spaces, .. }
            | Self::Universal { spaces }
            | Self::Nesting { spaces }
            | Self::Pseudo { spaces, .. }
            | Self::Combinator { spaces, .. }
            | Self::String { spaces, .. }
            | Self::Comment { spaces, .. } => spaces,
        }
    }

    pub fn is_combinator(&self) -> bool {
        matches!(self, Self::Combinator { .. })
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self, Self::Pseudo { .. })
    }

    /// Descendant combinator: whitespace only.
    pub fn is_space_combinator(&self) -> bool {
        match self {
            Self::Combinator { value, .. } => {
                !value.is_empty() && value.chars().all(char::is_whitespace)
            }
            _ => false,
        }
    }

    fn write_body(&self, out: &mut String) -> fmt::Result {
        match self {
            Self::Tag { value, .. }
            | Self::Combinator { value, .. }
            | Self::String { value, .. }
            | Self::Comment { value, .. } => out.push_str(value),
            Self::Class { value, .. } => write!(out, ".{value}")?,
            Self::Id { value, .. } => write!(out, "#{value}")?,
            Self::Attribute { value, .. } => write!(out, "[{value}]")?,
            Self::Universal { .. } => out.push('*'),
            Self::Nesting { .. } => out.push('&'),
            Self::Pseudo { value, args, .. } => {
                out.push_str(value);
                if let Some(args) = args {
                    out.push('(');
                    write_selectors(out, args)?;
                    out.push(')');
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for SelectorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let spaces = self.spaces();
        out.push_str(&spaces.before);
        self.write_body(&mut out)?;
        out.push_str(&spaces.after);
        f.write_str(&out)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_selectors(&mut out, &self.selectors)?;
        f.write_str(&out)
    }
}

fn write_selectors(out: &mut String, selectors: &[Selector]) -> fmt::Result {
    for (i, selector) in selectors.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write!(out, "{selector}")?;
    }
    Ok(())
}

/// Parse a rule's selector text.
pub fn parse_selector(input: &str) -> Result<SelectorList, CssError> {
    let selectors = SelectorParser { input }.list(0, input.len())?;
    Ok(SelectorList { selectors })
}

struct SelectorParser<'a> {
    input: &'a str,
}

impl SelectorParser<'_> {
    fn error(&self, message: &str, offset: usize) -> CssError {
        let before = &self.input[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        CssError::at(message, Position::new(offset as u32, line as u32, column as u32))
    }

    fn list(&self, start: usize, end: usize) -> Result<Vec<Selector>, CssError> {
        let mut selectors = Vec::new();
        let mut from = start;
        loop {
            let comma = self.top_level(from, end, b',')?;
            selectors.push(self.selector(from, comma)?);
            if comma >= end {
                return Ok(selectors);
            }
            from = comma + 1;
        }
    }

    /// First `needle` in `start..end` outside brackets, parentheses and strings.
    fn top_level(&self, start: usize, end: usize, needle: u8) -> Result<usize, CssError> {
        let bytes = self.input.as_bytes();
        let mut depth = 0usize;
        let mut i = start;
        while i < end {
            match bytes[i] {
                b if b == needle && depth == 0 => return Ok(i),
                b'\\' => i += 1,
                b'"' | b'\'' => i = self.string_end(i, end)?,
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }
        Ok(end)
    }

    fn string_end(&self, open: usize, end: usize) -> Result<usize, CssError> {
        let bytes = self.input.as_bytes();
        let mut i = open + 1;
        while i < end {
            match bytes[i] {
                b'\\' => i += 1,
                b if b == bytes[open] => return Ok(i),
                _ => {}
            }
            i += 1;
        }
        Err(self.error("Unclosed quote", open))
    }

    /// Offset of the bracket closing the one at `open`.
    fn closing(&self, open: usize, end: usize) -> Result<usize, CssError> {
        let close = match self.input.as_bytes()[open] {
            b'(' => b')',
            _ => b']',
        };
        let found = self.top_level(open + 1, end, close)?;
        if found >= end {
            return Err(self.error("Unclosed bracket", open));
        }
        Ok(found)
    }

    fn selector(&self, start: usize, end: usize) -> Result<Selector, CssError> {
        let bytes = self.input.as_bytes();
        let mut nodes: Vec<SelectorNode> = Vec::new();
        let mut pending = String::new();
        let mut i = start;

        while i < end {
            let b = bytes[i];
            if b.is_ascii_whitespace() {
                let run = bytes[i..end]
                    .iter()
                    .take_while(|c| c.is_ascii_whitespace())
                    .count();
                let spaces = &self.input[i..i + run];
                i += run;
                let next_is_combinator = i < end && self.combinator_len(i, end) > 0;
                match nodes.last_mut() {
                    None => pending.push_str(spaces),
                    Some(last) if i >= end || last.is_combinator() => {
                        last.spaces_mut().after.push_str(spaces);
                    }
                    Some(_) if next_is_combinator => pending.push_str(spaces),
                    Some(_) => nodes.push(SelectorNode::combinator(spaces)),
                }
                continue;
            }

            let (mut node, next) = self.node(i, end)?;
            node.spaces_mut().before = std::mem::take(&mut pending);
            nodes.push(node);
            i = next;
        }

        // a selector of only whitespace keeps it
        if nodes.is_empty() && !pending.is_empty() {
            nodes.push(SelectorNode::combinator(pending));
        }
        Ok(Selector { nodes })
    }

    fn combinator_len(&self, i: usize, end: usize) -> usize {
        let rest = &self.input[i..end];
        if rest.starts_with(">>>") {
            3
        } else if rest.starts_with("/deep/") {
            6
        } else if matches!(rest.as_bytes().first(), Some(b'>' | b'+' | b'~')) {
            1
        } else {
            0
        }
    }

    fn node(&self, i: usize, end: usize) -> Result<(SelectorNode, usize), CssError> {
        let bytes = self.input.as_bytes();
        let spaces = Spaces::default();

        let combinator = self.combinator_len(i, end);
        if combinator > 0 {
            let value = self.input[i..i + combinator].to_string();
            return Ok((SelectorNode::Combinator { value, spaces }, i + combinator));
        }

        Ok(match bytes[i] {
            b'.' => {
                let stop = self.ident_end(i + 1, end);
                let value = self.input[i + 1..stop].to_string();
                (SelectorNode::Class { value, spaces }, stop)
            }
            b'#' => {
                let stop = self.ident_end(i + 1, end);
                let value = self.input[i + 1..stop].to_string();
                (SelectorNode::Id { value, spaces }, stop)
            }
            b'[' => {
                let close = self.closing(i, end)?;
                let value = self.input[i + 1..close].to_string();
                (SelectorNode::Attribute { value, spaces }, close + 1)
            }
            b'*' => (SelectorNode::Universal { spaces }, i + 1),
            b'&' => (SelectorNode::Nesting { spaces }, i + 1),
            b'"' | b'\'' => {
                let close = self.string_end(i, end)?;
                let value = self.input[i..=close].to_string();
                (SelectorNode::String { value, spaces }, close + 1)
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = self.input[i + 2..end]
                    .find("*/")
                    .map(|at| i + 2 + at + 2)
                    .ok_or_else(|| self.error("Unclosed comment", i))?;
                let value = self.input[i..close].to_string();
                (SelectorNode::Comment { value, spaces }, close)
            }
            b':' => {
                let colons = if bytes.get(i + 1) == Some(&b':') { 2 } else { 1 };
                let stop = self.ident_end(i + colons, end);
                let value = self.input[i..stop].to_string();
                if bytes.get(stop) == Some(&b'(') && stop < end {
                    let close = self.closing(stop, end)?;
                    let args = Some(self.list(stop + 1, close)?);
                    (SelectorNode::Pseudo { value, args, spaces }, close + 1)
                } else {
                    (SelectorNode::Pseudo { value, args: None, spaces }, stop)
                }
            }
            b'(' | b')' | b']' | b',' => return Err(self.error("Unexpected character", i)),
            _ => {
                let first = self.input[i..].chars().next().map_or(1, char::len_utf8);
                let stop = self.ident_end(i, end).max(i + first);
                let value = self.input[i..stop].to_string();
                (SelectorNode::Tag { value, spaces }, stop)
            }
        })
    }

    /// End of an identifier-like word starting at `i`.
    fn ident_end(&self, mut i: usize, end: usize) -> usize {
        let bytes = self.input.as_bytes();
        while i < end {
            match bytes[i] {
                b'\\' => i = (i + 2).min(end),
                b if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'%') || b >= 0x80 => {
                    i += 1
                }
                _ => break,
            }
        }
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for input in [
            ".a .b",
            "a > b+c ~ d",
            "  .a,\n.b::before , #x[data-a=\"]\"]",
            ".a >>> .b",
            ".a /deep/ .b",
            ".a::v-deep(.b .c)",
            "li:nth-child(2n + 1):not(.x, .y)",
            "*|* & /* c */ .z",
            "from",
            "50%",
        ] {
            assert_eq!(parse_selector(input).unwrap().to_string(), input, "{input}");
        }
    }

    #[test]
    fn test_node_kinds() {
        let list = parse_selector(".a > #b [c]::v-deep(.d)").unwrap();
        let nodes = &list.selectors[0].nodes;
        assert!(matches!(&nodes[0], SelectorNode::Class { value, .. } if value == "a"));
        assert!(matches!(&nodes[1], SelectorNode::Combinator { value, spaces }
            if value == ">" && spaces.before == " " && spaces.after == " "));
        assert!(matches!(&nodes[2], SelectorNode::Id { value, .. } if value == "b"));
        assert!(nodes[3].is_space_combinator());
        assert!(matches!(&nodes[4], SelectorNode::Attribute { value, .. } if value == "c"));
        let SelectorNode::Pseudo { value, args: Some(args), .. } = &nodes[5] else {
            panic!("expected pseudo with arguments");
        };
        assert_eq!(value, "::v-deep");
        assert_eq!(args[0].to_string(), ".d");
    }

    #[test]
    fn test_list_leading_spaces_belong_to_first_node() {
        let list = parse_selector(".a, .b").unwrap();
        assert_eq!(list.selectors.len(), 2);
        assert_eq!(list.selectors[1].nodes[0].spaces().before, " ");
    }

    #[test]
    fn test_errors() {
        assert!(parse_selector("[data-x").is_err());
        assert!(parse_selector(":not(.a").is_err());
        assert!(parse_selector("a[x='y]").is_err());
    }
}
