//! Lowering predicate trees into concrete query backends.

use super::predicate::{Comparison, PredicateNode, PredicateTree, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// A query technology a compiled search can be lowered into.
///
/// The compiler only produces [`PredicateTree`]s; everything specific to a
/// store (SQL text, an index scan, an in-memory filter) lives behind this
/// trait.
pub trait PredicateBackend {
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    fn lower(&self, tree: &PredicateTree) -> Result<Self::Output, Self::Error>;
}

pub type Record = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryBackendError {
    #[error("unknown table `{0}`")]
    UnknownTable(String),
}

/// Evaluates trees against in-memory records.
///
/// `lower` returns the indices of matching rows in the primary table.
/// `Member` nodes look up rows in named secondary tables. A missing field
/// never matches; comparing text with a number never matches.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    rows: Vec<Record>,
    tables: BTreeMap<String, Vec<Record>>,
}

impl MemoryBackend {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            tables: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Record>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Matching rows, in table order.
    pub fn select(&self, tree: &PredicateTree) -> Result<Vec<&Record>, MemoryBackendError> {
        Ok(self.lower(tree)?.into_iter().map(|i| &self.rows[i]).collect())
    }

    fn eval(&self, node: &PredicateNode, row: &Record) -> Result<bool, MemoryBackendError> {
        Ok(match node {
            PredicateNode::All => true,
            PredicateNode::Equals { field, value } => {
                row.get(field).is_some_and(|v| compare_values(v, value) == Some(Ordering::Equal))
            }
            PredicateNode::Like {
                field,
                pattern,
                escape,
                case_insensitive,
            } => match row.get(field) {
                Some(Value::Text(text)) => like_matches(text, pattern, *escape, *case_insensitive),
                _ => false,
            },
            PredicateNode::Compare {
                field,
                comparison,
                value,
            } => match row.get(field).and_then(|v| compare_values(v, value)) {
                Some(ordering) => match comparison {
                    Comparison::Greater => ordering == Ordering::Greater,
                    Comparison::GreaterOrEqual => ordering != Ordering::Less,
                    Comparison::Less => ordering == Ordering::Less,
                    Comparison::LessOrEqual => ordering != Ordering::Greater,
                    Comparison::NotEqual => ordering != Ordering::Equal,
                },
                None => false,
            },
            PredicateNode::Member {
                field,
                subquery,
                key,
                predicate,
            } => {
                let Some(needle) = row.get(field) else {
                    return Ok(false);
                };
                let table = self
                    .tables
                    .get(subquery)
                    .ok_or_else(|| MemoryBackendError::UnknownTable(subquery.clone()))?;
                let mut found = false;
                for candidate in table {
                    let keyed = candidate
                        .get(key)
                        .is_some_and(|k| compare_values(k, needle) == Some(Ordering::Equal));
                    if keyed && self.eval(predicate, candidate)? {
                        found = true;
                        break;
                    }
                }
                found
            }
            PredicateNode::And(nodes) => {
                for n in nodes {
                    if !self.eval(n, row)? {
                        return Ok(false);
                    }
                }
                true
            }
            PredicateNode::Or(nodes) => {
                for n in nodes {
                    if self.eval(n, row)? {
                        return Ok(true);
                    }
                }
                false
            }
            PredicateNode::Not(inner) => !self.eval(inner, row)?,
        })
    }
}

impl PredicateBackend for MemoryBackend {
    type Output = Vec<usize>;
    type Error = MemoryBackendError;

    fn lower(&self, tree: &PredicateTree) -> Result<Vec<usize>, MemoryBackendError> {
        let mut hits = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            if self.eval(tree.root(), row)? {
                hits.push(i);
            }
        }
        Ok(hits)
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Integer(x), Value::Number(y)) => (*x as f64).partial_cmp(y),
        (Value::Number(x), Value::Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Piece {
    Any,
    One,
    Literal(char),
}

fn like_pieces(pattern: &str, escape: char, fold: bool) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let piece = match c {
            c if c == escape => match chars.next() {
                Some(lit) => Piece::Literal(lit),
                None => Piece::Literal(escape),
            },
            '%' => Piece::Any,
            '_' => Piece::One,
            other => Piece::Literal(other),
        };
        pieces.push(match piece {
            Piece::Literal(c) if fold => Piece::Literal(fold_char(c)),
            p => p,
        });
    }
    pieces
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// SQL `LIKE` semantics over characters.
pub fn like_matches(text: &str, pattern: &str, escape: char, case_insensitive: bool) -> bool {
    let pieces = like_pieces(pattern, escape, case_insensitive);
    let text: Vec<char> = if case_insensitive {
        text.chars().map(fold_char).collect()
    } else {
        text.chars().collect()
    };

    // matches[j]: pieces[..i] match text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for piece in &pieces {
        let mut next = vec![false; text.len() + 1];
        match piece {
            Piece::Any => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matches[j];
                    next[j] = seen;
                }
            }
            Piece::One => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1];
                }
            }
            Piece::Literal(c) => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn people() -> MemoryBackend {
        MemoryBackend::new(vec![
            record(&[("id", Value::Integer(1)), ("name", "John Doe".into()), ("age", Value::Integer(40))]),
            record(&[("id", Value::Integer(2)), ("name", "Jane Roe".into()), ("age", Value::Number(7.5))]),
            record(&[("id", Value::Integer(3)), ("name", "100% Fan".into())]),
        ])
        .with_table(
            "groups",
            vec![
                record(&[("user", Value::Integer(1)), ("group", "staff".into())]),
                record(&[("user", Value::Integer(3)), ("group", "guests".into())]),
            ],
        )
    }

    #[test]
    fn like_handles_wildcards_and_escapes() {
        assert!(like_matches("John Doe", "%doe", '\\', true));
        assert!(!like_matches("John Doe", "%doe", '\\', false));
        assert!(like_matches("abc", "a_c", '\\', false));
        assert!(!like_matches("abc", "a_", '\\', false));
        assert!(like_matches("100% Fan", r"%100\%%", '\\', false));
        assert!(!like_matches("1000 Fans", r"%100\%%", '\\', false));
        assert!(like_matches("", "%", '\\', false));
    }

    #[test]
    fn comparisons_mix_integers_and_numbers() {
        let tree = PredicateTree::new(PredicateNode::compare("age", Comparison::Greater, 5));
        assert_eq!(people().lower(&tree).unwrap(), vec![0, 1]);
        let tree = PredicateTree::new(PredicateNode::compare("age", Comparison::NotEqual, 40));
        assert_eq!(people().lower(&tree).unwrap(), vec![1]);
    }

    #[test]
    fn negation_includes_rows_missing_the_field() {
        let tree = PredicateTree::new(PredicateNode::equals("age", 40).negate());
        assert_eq!(people().lower(&tree).unwrap(), vec![1, 2]);
    }

    #[test]
    fn membership_consults_the_subquery_table() {
        let tree = PredicateTree::new(PredicateNode::member(
            "id",
            "groups",
            "user",
            PredicateNode::equals("group", "staff"),
        ));
        let backend = people();
        let rows = backend.select(&tree).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("John Doe".into())));

        let missing = PredicateTree::new(PredicateNode::member("id", "teams", "user", PredicateNode::All));
        assert_eq!(
            backend.lower(&missing),
            Err(MemoryBackendError::UnknownTable("teams".into()))
        );
    }

    #[test]
    fn all_selects_every_row() {
        assert_eq!(people().lower(&PredicateTree::new(PredicateNode::All)).unwrap(), vec![0, 1, 2]);
    }
}
