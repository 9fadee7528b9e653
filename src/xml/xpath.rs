//! Node path expressions.
//!
//! A deliberately small dialect, child axis only: steps separated by `/`,
//! each step an element name, `*`, or `.`, optionally filtered by
//! predicates `[@attr]`, `[@attr='value']` or a 1-based position `[n]`.
//! A leading `/` anchors the first step at the document root instead of
//! the context node. The descendant axis is not supported.

use crate::xml::errors::PathExprError;
use crate::xml::node::{Document, NodeId};

/// A parsed path expression, ready to evaluate against any context node.
#[derive(Debug, Clone)]
pub struct PathExpr {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
struct Step {
    test: NameTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone)]
enum NameTest {
    /// `.`: the context node itself.
    Current,
    /// `*`: any element child.
    Any,
    /// A literal element name.
    Name(String),
}

#[derive(Debug, Clone)]
enum Predicate {
    AttrExists { name: String },
    AttrEquals { name: String, value: String },
    Position(usize),
}

impl PathExpr {
    pub fn parse(expr: &str) -> Result<Self, PathExprError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(PathExprError::Empty);
        }
        let (absolute, body) = match trimmed.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(PathExprError::MalformedStep {
                expr: expr.to_string(),
                step: String::new(),
            });
        }
        let steps = split_steps(body)
            .into_iter()
            .map(|raw| parse_step(expr, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { absolute, steps })
    }

    /// Resolve the expression, returning every matching node in document
    /// order. A non-matching expression yields an empty list, never an
    /// error.
    #[must_use]
    pub fn evaluate(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        let start = if self.absolute { doc.root() } else { context };
        let mut current = vec![start];
        for step in &self.steps {
            let mut next = Vec::new();
            for &node in &current {
                let mut candidates: Vec<NodeId> = match &step.test {
                    NameTest::Current => vec![node],
                    NameTest::Any => doc.element_children(node).collect(),
                    NameTest::Name(name) => doc.children_named(node, name).collect(),
                };
                for predicate in &step.predicates {
                    apply_predicate(doc, &mut candidates, predicate);
                }
                next.extend(candidates);
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

fn apply_predicate(doc: &Document, candidates: &mut Vec<NodeId>, predicate: &Predicate) {
    match predicate {
        Predicate::AttrExists { name } => {
            candidates.retain(|&c| doc.attribute(c, name).is_some());
        }
        Predicate::AttrEquals { name, value } => {
            candidates.retain(|&c| doc.attribute(c, name) == Some(value.as_str()));
        }
        Predicate::Position(n) => {
            // 1-based position among the candidates that survived so far.
            if *n <= candidates.len() {
                let kept = candidates[*n - 1];
                candidates.clear();
                candidates.push(kept);
            } else {
                candidates.clear();
            }
        }
    }
}

/// Split on `/` outside quotes and predicate brackets, so attribute
/// values may contain separators.
fn split_steps(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '\'' | '"' => match quote {
                Some(q) if q == c => quote = None,
                Some(_) => {}
                None => quote = Some(c),
            },
            '[' if quote.is_none() => depth += 1,
            ']' if quote.is_none() => depth = depth.saturating_sub(1),
            '/' if quote.is_none() && depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn parse_step(expr: &str, raw: &str) -> Result<Step, PathExprError> {
    let raw = raw.trim();
    let malformed = || PathExprError::MalformedStep {
        expr: expr.to_string(),
        step: raw.to_string(),
    };
    let (name_part, predicate_part) = match raw.find('[') {
        Some(i) => (raw[..i].trim(), &raw[i..]),
        None => (raw, ""),
    };
    let test = match name_part {
        "." => NameTest::Current,
        "*" => NameTest::Any,
        name if is_valid_name(name) => NameTest::Name(name.to_string()),
        _ => return Err(malformed()),
    };
    let predicates = parse_predicates(expr, predicate_part)?;
    Ok(Step { test, predicates })
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn parse_predicates(expr: &str, mut rest: &str) -> Result<Vec<Predicate>, PathExprError> {
    let mut predicates = Vec::new();
    rest = rest.trim_start();
    while !rest.is_empty() {
        let malformed = |p: &str| PathExprError::MalformedPredicate {
            expr: expr.to_string(),
            predicate: p.to_string(),
        };
        if !rest.starts_with('[') {
            return Err(malformed(rest));
        }
        let close = find_predicate_end(rest).ok_or_else(|| malformed(rest))?;
        let inner = rest[1..close].trim();
        predicates.push(parse_predicate(expr, inner)?);
        rest = rest[close + 1..].trim_start();
    }
    Ok(predicates)
}

/// Index of the `]` closing the predicate that starts at byte 0, skipping
/// quoted sections.
fn find_predicate_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            '\'' | '"' => match quote {
                Some(q) if q == c => quote = None,
                Some(_) => {}
                None => quote = Some(c),
            },
            ']' if quote.is_none() => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(expr: &str, inner: &str) -> Result<Predicate, PathExprError> {
    let malformed = || PathExprError::MalformedPredicate {
        expr: expr.to_string(),
        predicate: inner.to_string(),
    };
    if inner.is_empty() {
        return Err(malformed());
    }
    if inner.bytes().all(|b| b.is_ascii_digit()) {
        let n: usize = inner.parse().map_err(|_| malformed())?;
        if n == 0 {
            return Err(malformed());
        }
        return Ok(Predicate::Position(n));
    }
    let attr = inner.strip_prefix('@').ok_or_else(malformed)?;
    match attr.find('=') {
        None => {
            let name = attr.trim();
            if !is_valid_name(name) {
                return Err(malformed());
            }
            Ok(Predicate::AttrExists {
                name: name.to_string(),
            })
        }
        Some(eq) => {
            let name = attr[..eq].trim();
            let value = attr[eq + 1..].trim();
            if !is_valid_name(name) {
                return Err(malformed());
            }
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or_else(malformed)?;
            Ok(Predicate::AttrEquals {
                name: name.to_string(),
                value: unquoted.to_string(),
            })
        }
    }
}
