//! Serialization back to text.
//!
//! Rendering is line-for-line. Untouched nodes and comment lines are written
//! exactly as they were read, and deleted nodes are skipped together with
//! everything below them. Only nodes flagged [`Node::modified`] are rebuilt,
//! as `key: value` under their original indent or list marker. A document
//! that was parsed and not modified renders to its input byte-for-byte,
//! except that a `---` header line is always written as `---`.

use super::{Document, Node, NodeValue};
use std::fmt::{self, Write};

impl Document {
    /// Render the document to a string.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the document to an I/O sink.
    pub fn write_to(&self, mut out: impl std::io::Write) -> std::io::Result<()> {
        out.write_all(self.render().as_bytes())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if self.header {
            out.push_str("---\n");
        }
        if let Some(children) = self.root.children() {
            for child in children {
                write_node(&mut out, child, None)?;
            }
        }
        if !self.trailing_newline && out.ends_with('\n') {
            out.pop();
        }
        f.write_str(&out)
    }
}

/// Write `node` and its subtree.
///
/// `marker` is the `"  - "` style prefix of a list item, handed down until
/// the first surviving keyed line of that item consumes it.
fn write_node(f: &mut impl Write, node: &Node, marker: Option<String>) -> fmt::Result {
    if node.deleted {
        return Ok(());
    }

    let lead = marker.unwrap_or_else(|| " ".repeat(node.indent));

    match &node.value {
        NodeValue::Comment(text) => writeln!(f, "{text}"),
        NodeValue::Scalar(value) if node.modified || node.text.is_empty() => {
            writeln!(f, "{lead}{}", scalar_line(node, value))
        }
        NodeValue::Scalar(_) => write_source(f, node, &lead),
        NodeValue::Dict(children) if node.key.is_empty() => {
            // List item: the marker goes on the first surviving keyed entry.
            let mut marker = Some(lead);
            for child in children {
                if child.is_comment() || child.deleted {
                    write_node(f, child, None)?;
                } else {
                    write_node(f, child, marker.take())?;
                }
            }
            Ok(())
        }
        NodeValue::Dict(children) => {
            write_header(f, node, &lead)?;
            children.iter().try_for_each(|child| write_node(f, child, None))
        }
        NodeValue::List(children) => {
            write_header(f, node, &lead)?;
            for child in children {
                if child.is_comment() {
                    write_node(f, child, None)?;
                } else {
                    let marker = format!("{}- ", " ".repeat(child.indent.saturating_sub(2)));
                    write_node(f, child, Some(marker))?;
                }
            }
            Ok(())
        }
    }
}

/// The `key:` line that opens a dict or list.
fn write_header(f: &mut impl Write, node: &Node, lead: &str) -> fmt::Result {
    if node.text.is_empty() {
        writeln!(f, "{lead}{}:", node.key)
    } else {
        write_source(f, node, lead)
    }
}

/// Write the source line of `node`.
///
/// The part before the key is swapped for `lead` when the list marker moved
/// onto or off this line; the rest of the line is kept as read.
fn write_source(f: &mut impl Write, node: &Node, lead: &str) -> fmt::Result {
    let (head, body) = node
        .text
        .split_at_checked(node.indent.min(node.text.len()))
        .unwrap_or(("", node.text.as_str()));
    if head.trim_end() == lead.trim_end() {
        writeln!(f, "{}", node.text)
    } else {
        writeln!(f, "{lead}{body}")
    }
}

/// Canonical text of a rebuilt scalar, without its lead.
fn scalar_line(node: &Node, value: &str) -> String {
    let value = match (node.commented, value.is_empty()) {
        (false, _) => value.to_string(),
        (true, true) => "#".to_string(),
        (true, false) => format!("# {value}"),
    };
    match (node.key.is_empty(), value.is_empty()) {
        (true, _) => value,
        (false, true) => format!("{}:", node.key),
        (false, false) => format!("{}: {value}", node.key),
    }
}
