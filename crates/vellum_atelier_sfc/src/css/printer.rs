//! Tree to text, with a mapping for every node that has a source position.

use vellum_relief::ast::Position;

use super::{Node, Root};

/// Printed stylesheet.
#[derive(Debug, Clone, Default)]
pub struct Printed {
    pub css: String,
    /// `(generated line, generated column, original position)`; generated
    /// coordinates are 0-based
    pub mappings: Vec<(u32, u32, Position)>,
}

pub fn print(root: &Root) -> Printed {
    let mut printer = Printer::default();
    printer.nodes(&root.nodes);
    printer.push(&root.after);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: Printed,
    line: u32,
    column: u32,
}

impl Printer {
    fn push(&mut self, text: &str) {
        match text.rfind('\n') {
            Some(last) => {
                self.line += memchr::memchr_iter(b'\n', text.as_bytes()).count() as u32;
                self.column = text[last + 1..].chars().count() as u32;
            }
            None => self.column += text.chars().count() as u32,
        }
        self.out.css.push_str(text);
    }

    fn mark(&mut self, source: Option<Position>) {
        if let Some(position) = source {
            self.out.mappings.push((self.line, self.column, position));
        }
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &Node) {
        let raws = node.raws();
        self.push(&raws.before);
        self.mark(node.source());
        match node {
            Node::Rule(rule) => {
                self.push(&rule.selector);
                self.push(&raws.between);
                self.block(&rule.nodes, &raws.after);
            }
            Node::AtRule(at_rule) => {
                self.push("@");
                self.push(&at_rule.name);
                self.push(&raws.after_name);
                self.push(&at_rule.params);
                self.push(&raws.between);
                match &at_rule.nodes {
                    Some(children) => self.block(children, &raws.after),
                    None if raws.semicolon => self.push(";"),
                    None => {}
                }
            }
            Node::Decl(decl) => {
                self.push(&decl.prop);
                self.push(if raws.between.is_empty() { ":" } else { raws.between.as_str() });
                self.push(&decl.value);
                if decl.important {
                    self.push(raws.important.as_deref().unwrap_or(" !important"));
                }
                self.push(&raws.value_after);
                if raws.semicolon {
                    self.push(";");
                }
            }
            Node::Comment(comment) => {
                self.push("/*");
                self.push(&raws.left);
                self.push(&comment.text);
                self.push(&raws.right);
                self.push("*/");
            }
        }
    }

    fn block(&mut self, children: &[Node], after: &str) {
        self.push("{");
        self.nodes(children);
        self.push(after);
        self.push("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::{parse, Declaration, Raws, Rule};

    #[test]
    fn test_mappings_follow_output_lines() {
        let root = parse(".a {\n  color: red;\n}\n.b { top: 0 }").unwrap();
        let printed = print(&root);
        let lines: Vec<(u32, u32, u32)> = printed
            .mappings
            .iter()
            .map(|(line, column, original)| (*line, *column, original.line))
            .collect();
        assert_eq!(lines, vec![(0, 0, 1), (1, 2, 2), (3, 0, 4), (3, 5, 4)]);
    }

    #[test]
    fn test_built_nodes_get_default_punctuation() {
        let root = Root {
            nodes: vec![Node::Rule(Rule {
                selector: ".a".into(),
                nodes: vec![Node::Decl(Declaration {
                    prop: "color".into(),
                    value: "red".into(),
                    important: true,
                    raws: Raws {
                        semicolon: true,
                        ..Default::default()
                    },
                    source: None,
                })],
                ..Default::default()
            })],
            after: String::new(),
        };
        let printed = print(&root);
        assert_eq!(printed.css, ".a{color:red !important;}");
        assert!(printed.mappings.is_empty());
    }
}
