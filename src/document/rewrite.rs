//! Path rewrites.
//!
//! A directive has the form `path=value`. The path is a `.`-separated list of
//! segments, each of which is one of
//!
//! - `key`: the dict entry named `key`
//! - `key[]`: every element of the list `key`
//! - `key[N]`: element `N` of the list `key`, counting list elements only
//!
//! A value of `~` deletes the target. Any other value replaces the target
//! with an active scalar, and a missing final key is appended to its dict.
//! Paths that do not resolve are skipped.

use super::{Document, Node, NodeValue};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ITEM_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?) *\[ *([0-9]*) *\]$").expect("item segment pattern is valid"));

/// One step of a rewrite path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    /// `key[]`
    Each(String),
    /// `key[N]`
    Item(String, usize),
}

impl PathSegment {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let Some(caps) = ITEM_SEGMENT.captures(text) else {
            return Some(Self::Key(text.to_string()));
        };
        let key = caps.get(1)?.as_str().trim().to_string();
        if key.is_empty() {
            return None;
        }
        match caps.get(2)?.as_str() {
            "" => Some(Self::Each(key)),
            index => index.parse().ok().map(|n| Self::Item(key, n)),
        }
    }

    fn key(&self) -> &str {
        match self {
            Self::Key(key) | Self::Each(key) | Self::Item(key, _) => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteAction {
    /// `~`
    Delete,
    Set(String),
}

/// A parsed `path=value` rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub path: Vec<PathSegment>,
    pub action: RewriteAction,
}

impl Directive {
    /// Parse `path=value`, splitting on the first `=`.
    ///
    /// Returns `None` for text without `=` or with an empty path segment.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (path, value) = text.split_once('=')?;
        let path = path.split('.').map(PathSegment::parse).collect::<Option<Vec<_>>>()?;
        let action = match value.trim() {
            "~" => RewriteAction::Delete,
            value => RewriteAction::Set(value.to_string()),
        };
        Some(Self {
            path,
            action,
        })
    }

    /// Shorthand for a set directive on a plain key path.
    #[must_use]
    pub fn set(path: &str, value: impl Into<String>) -> Self {
        Self {
            path: path.split('.').map(|k| PathSegment::Key(k.to_string())).collect(),
            action: RewriteAction::Set(value.into()),
        }
    }

    /// Apply to the tree below `root`; returns the number of nodes changed.
    pub fn apply(&self, root: &mut Node) -> usize {
        apply_at(root, &self.path, &self.action)
    }
}

fn apply_at(node: &mut Node, path: &[PathSegment], action: &RewriteAction) -> usize {
    let Some((segment, rest)) = path.split_first() else {
        return 0;
    };

    if rest.is_empty() {
        return apply_last(node, segment, action);
    }

    let Some(child) = node.get_mut(segment.key()) else {
        return 0;
    };
    match segment {
        PathSegment::Key(_) => apply_at(child, rest, action),
        PathSegment::Each(_) => list_elements(child)
            .into_iter()
            .map(|element| apply_at(element, rest, action))
            .sum(),
        PathSegment::Item(_, n) => list_elements(child)
            .into_iter()
            .nth(*n)
            .map_or(0, |element| apply_at(element, rest, action)),
    }
}

fn apply_last(node: &mut Node, segment: &PathSegment, action: &RewriteAction) -> usize {
    match segment {
        PathSegment::Key(key) => match (node.get_mut(key), action) {
            (Some(target), _) => {
                act(target, action);
                1
            }
            (None, RewriteAction::Set(value)) => usize::from(node.set(key, value.clone())),
            (None, RewriteAction::Delete) => 0,
        },
        PathSegment::Each(key) => node.get_mut(key).map_or(0, |list| {
            let elements = list_elements(list);
            let changed = elements.len();
            for element in elements {
                act(element, action);
            }
            changed
        }),
        PathSegment::Item(key, n) => node
            .get_mut(key)
            .and_then(|list| list_elements(list).into_iter().nth(*n))
            .map_or(0, |element| {
                act(element, action);
                1
            }),
    }
}

fn act(target: &mut Node, action: &RewriteAction) {
    match action {
        RewriteAction::Delete => target.deleted = true,
        RewriteAction::Set(value) => target.set_scalar(value.clone()),
    }
}

fn list_elements(node: &mut Node) -> Vec<&mut Node> {
    match &mut node.value {
        NodeValue::List(children) => children.iter_mut().filter(|n| !n.is_comment()).collect(),
        _ => Vec::new(),
    }
}

impl Document {
    /// Apply directives in order; returns the total number of nodes changed.
    pub fn rewrite<'a>(&mut self, directives: impl IntoIterator<Item = &'a Directive>) -> usize {
        directives
            .into_iter()
            .map(|directive| {
                let changed = directive.apply(&mut self.root);
                if changed == 0 {
                    debug!(target: "document::rewrite", ?directive, "rewrite matched nothing");
                }
                changed
            })
            .sum()
    }

    /// Parse and apply textual `path=value` directives, skipping malformed ones.
    pub fn rewrite_str<S: AsRef<str>>(&mut self, directives: &[S]) -> usize {
        let parsed: Vec<Directive> = directives
            .iter()
            .filter_map(|text| {
                let directive = Directive::parse(text.as_ref());
                if directive.is_none() {
                    debug!(target: "document::rewrite", text = text.as_ref(), "skipping malformed rewrite");
                }
                directive
            })
            .collect();
        self.rewrite(&parsed)
    }
}
