use thiserror::Error;

/// Diagnostic raised by the lexer or the tree builder.
///
/// Every variant carries the 1-based line number of the offending input line
/// and its text, so the message can be shown to an operator verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A non-comment line without a `key:` separator that is not a list scalar
    #[error("missing ':' separator (line {line}): '{text}'")]
    MissingSeparator {
        /// Line number
        line: usize,
        /// Offending line
        text: String,
    },

    /// `-` followed by more than one space
    #[error("more than one space after '-' (line {line}): '{text}'")]
    ListMarkerSpacing {
        /// Line number
        line: usize,
        /// Offending line
        text: String,
    },

    /// A line indented where no open block expects it
    #[error("indent {indent} is invalid, expected {expected} (line {line}): '{text}'")]
    Indent {
        /// Line number
        line: usize,
        /// Offending line
        text: String,
        /// Indent of the offending line
        indent: usize,
        /// Indent of the enclosing block
        expected: usize,
    },

    /// A token that cannot start or continue the current block
    #[error("{reason} (line {line}): '{text}'")]
    UnexpectedBlock {
        /// Line number
        line: usize,
        /// Offending line
        text: String,
        /// What was wrong
        reason: &'static str,
    },

    /// Builder reached a state it cannot handle
    #[error("internal parser fault (line {line}): {reason}")]
    Internal {
        /// Line number
        line: usize,
        /// Description of the state
        reason: &'static str,
    },
}

impl ParseError {
    /// Line number the diagnostic refers to.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::MissingSeparator {
                line,
                ..
            }
            | Self::ListMarkerSpacing {
                line,
                ..
            }
            | Self::Indent {
                line,
                ..
            }
            | Self::UnexpectedBlock {
                line,
                ..
            }
            | Self::Internal {
                line,
                ..
            } => *line,
        }
    }
}
