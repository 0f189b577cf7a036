use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Line kinds that only make sense inside a table block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineContext {
    Chain,
    Rule,
}

impl fmt::Display for LineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineContext::Chain => f.write_str("chain"),
            LineContext::Rule => f.write_str("rule"),
        }
    }
}

/// A non-fatal problem found while parsing. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseIssue {
    /// The line matched none of the known line grammars
    #[error("line {line_no}: unrecognized line: {line}")]
    Unrecognized { line_no: usize, line: String },

    /// A chain or rule line outside of any `*table` ... `COMMIT` block
    #[error("line {line_no}: {context} line outside of a table: {line}")]
    NoCurrentTable {
        line_no: usize,
        context: LineContext,
        line: String,
    },

    /// A rule appended to a chain the current table never declared
    #[error("line {line_no}: rule for undeclared chain '{chain}' in table '{table}': {line}")]
    UnknownChain {
        line_no: usize,
        table: String,
        chain: String,
        line: String,
    },
}

impl ParseIssue {
    pub fn line_no(&self) -> usize {
        match self {
            Self::Unrecognized { line_no, .. }
            | Self::NoCurrentTable { line_no, .. }
            | Self::UnknownChain { line_no, .. } => *line_no,
        }
    }

    pub fn line(&self) -> &str {
        match self {
            Self::Unrecognized { line, .. }
            | Self::NoCurrentTable { line, .. }
            | Self::UnknownChain { line, .. } => line,
        }
    }

    /// True for lines that were well-formed but appeared in the wrong place.
    pub fn is_context_error(&self) -> bool {
        match self {
            Self::NoCurrentTable { .. } | Self::UnknownChain { .. } => true,
            Self::Unrecognized { .. } => false,
        }
    }
}

/// Failure to read the input stream. Line content never causes this.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read iptables-save input: {0}")]
    Io(#[from] std::io::Error),
}
