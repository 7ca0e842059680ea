//! Tree builder.
//!
//! Turns the token stream into a [`Node`] tree rooted at a dict. Block
//! membership is decided purely by indent:
//!
//! - a key followed by a deeper token opens a nested block, a list when that
//!   token starts with `- ` and a dict otherwise
//! - a key with an empty value and no deeper block is an empty dict
//! - consecutive `- ` tokens at the same indent are items of one list
//! - a list item continues as a dict while same-indent tokens without a
//!   marker follow it
//!
//! Comment lines attach to the innermost open block whose indent does not
//! exceed the next non-comment token. Comments before a dedent therefore
//! bubble up to the outer block, and trailing comments at end of input go to
//! the root.

use super::error::ParseError;
use super::lexer::Token;
use super::{Location, Node, NodeValue, Segment};
use std::sync::Arc;

/// Kind of dict block being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DictBlock {
    Root,
    Keyed,
    /// Continuation of a list item; a marker at the item's indent ends it
    ListItem,
}

pub struct TreeBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl TreeBuilder {
    #[must_use]
    pub const fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
        }
    }

    /// Consume all tokens and return the root dict.
    pub fn build(mut self) -> Result<Node, ParseError> {
        let location = Location::root();
        let children = self.dict_block(0, &location, DictBlock::Root)?;
        if let Some(token) = self.tokens.get(self.pos) {
            return Err(ParseError::Internal {
                line: token.line,
                reason: "tokens left after the root block",
            });
        }
        Ok(Node::new("", NodeValue::Dict(children), 0, 0, location))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Next non-comment token after the cursor, at or after `from`.
    fn significant_from(&self, from: usize) -> Option<&Token> {
        self.tokens[from.min(self.tokens.len())..].iter().find(|t| !t.comment)
    }

    /// Comment at the cursor belongs to a block at `indent`.
    fn comment_belongs(&self, indent: usize, block: DictBlock) -> bool {
        match self.significant_from(self.pos) {
            None => block == DictBlock::Root,
            Some(next) => next.indent >= indent,
        }
    }

    fn take_comment(&mut self) -> Node {
        let token = &self.tokens[self.pos];
        self.pos += 1;
        // Comments have no path of their own; they share the root location.
        Node::new("", NodeValue::Comment(token.text.clone()), token.indent, token.line, Location::root())
            .with_text(token.text.clone())
    }

    fn dict_block(
        &mut self,
        indent: usize,
        parent: &Arc<Location>,
        block: DictBlock,
    ) -> Result<Vec<Node>, ParseError> {
        let mut children = Vec::new();

        while let Some(token) = self.peek() {
            if token.comment {
                if !self.comment_belongs(indent, block) {
                    break;
                }
                children.push(self.take_comment());
                continue;
            }

            if token.indent < indent {
                if block == DictBlock::Root {
                    return Err(ParseError::Internal {
                        line: token.line,
                        reason: "token above the root indent",
                    });
                }
                break;
            }

            if token.list_start {
                if block == DictBlock::ListItem && token.indent == indent {
                    break;
                }
                return Err(unexpected(token, "list item without an owning key"));
            }

            if token.indent > indent {
                return Err(ParseError::Indent {
                    line: token.line,
                    text: token.text.clone(),
                    indent: token.indent,
                    expected: indent,
                });
            }

            if token.key.is_empty() {
                return Err(unexpected(token, "entry without a key in a mapping"));
            }

            let node = self.entry(parent)?;
            children.push(node);
        }

        renumber(&mut children);
        Ok(children)
    }

    /// Build one keyed entry starting at the cursor, including any nested
    /// block below it.
    fn entry(&mut self, parent: &Arc<Location>) -> Result<Node, ParseError> {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        let location = Location::child(parent, Segment::Key(token.key.clone()));

        let nested = self
            .significant_from(self.pos)
            .filter(|next| next.indent > token.indent)
            .map(|next| (next.indent, next.list_start));

        let Some((nested_indent, nested_list)) = nested else {
            let value = if token.value.is_empty() && !token.commented {
                NodeValue::Dict(Vec::new())
            } else {
                NodeValue::Scalar(token.value)
            };
            let mut node = Node::new(token.key, value, token.indent, token.line, location).with_text(token.text);
            node.commented = token.commented;
            return Ok(node);
        };

        if !token.value.is_empty() || token.commented {
            return Err(unexpected(&token, "value given for a key with a nested block"));
        }

        let value = if nested_list {
            NodeValue::List(self.list_block(nested_indent, &location)?)
        } else {
            NodeValue::Dict(self.dict_block(nested_indent, &location, DictBlock::Keyed)?)
        };
        Ok(Node::new(token.key, value, token.indent, token.line, location).with_text(token.text))
    }

    fn list_block(
        &mut self,
        indent: usize,
        parent: &Arc<Location>,
    ) -> Result<Vec<Node>, ParseError> {
        let mut children = Vec::new();
        let mut elements = 0;
        // Keyless scalars and keyed items never share a list.
        let mut keyless: Option<bool> = None;

        while let Some(token) = self.peek() {
            if token.comment {
                if !self.comment_belongs(indent, DictBlock::Keyed) {
                    break;
                }
                children.push(self.take_comment());
                continue;
            }

            if token.indent < indent {
                break;
            }
            if token.indent > indent {
                return Err(ParseError::Indent {
                    line: token.line,
                    text: token.text.clone(),
                    indent: token.indent,
                    expected: indent,
                });
            }
            if !token.list_start {
                return Err(unexpected(token, "list item expected"));
            }

            let item_indent = token.indent;
            let is_dict = self.significant_from(self.pos + 1).is_some_and(|next| {
                next.indent > item_indent || (next.indent == item_indent && !next.list_start)
            });

            if let Some(previous) = keyless
                && previous != token.key.is_empty()
            {
                return Err(unexpected(token, "list mixes keyless and keyed items"));
            }
            keyless = Some(token.key.is_empty());

            let location = Location::child(parent, Segment::Index(elements));
            let mut node = if is_dict {
                if token.key.is_empty() {
                    return Err(unexpected(token, "keyless list item cannot start a mapping"));
                }
                let line = token.line;
                let first = self.entry(&location)?;
                let mut entries = vec![first];
                entries.extend(self.dict_block(item_indent, &location, DictBlock::ListItem)?);
                renumber(&mut entries);
                Node::new("", NodeValue::Dict(entries), item_indent, line, location)
            } else {
                let token = token.clone();
                self.pos += 1;
                let mut node =
                    Node::new(token.key, NodeValue::Scalar(token.value), item_indent, token.line, location)
                        .with_text(token.text);
                node.commented = token.commented;
                node
            };
            node.index = elements;
            elements += 1;
            children.push(node);
        }

        Ok(children)
    }
}

/// Number the non-comment entries of a block by position.
fn renumber(children: &mut [Node]) {
    for (index, node) in children.iter_mut().filter(|n| !n.is_comment()).enumerate() {
        node.index = index;
    }
}

fn unexpected(token: &Token, reason: &'static str) -> ParseError {
    ParseError::UnexpectedBlock {
        line: token.line,
        text: token.text.clone(),
        reason,
    }
}
