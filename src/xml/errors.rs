use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading or parsing an XML document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },

    #[error("malformed markup at byte {offset}: {detail}")]
    Malformed { offset: usize, detail: String },

    #[error("mismatched closing tag </{found}> at byte {offset}, expected </{expected}>")]
    MismatchedTag {
        offset: usize,
        expected: String,
        found: String,
    },
}

/// Errors produced while parsing a node path expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathExprError {
    #[error("empty path expression")]
    Empty,

    #[error("malformed step {step:?} in path expression {expr:?}")]
    MalformedStep { expr: String, step: String },

    #[error("malformed predicate [{predicate}] in path expression {expr:?}")]
    MalformedPredicate { expr: String, predicate: String },
}
