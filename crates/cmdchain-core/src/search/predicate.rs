//! Backend-agnostic predicate algebra.
//!
//! Handlers produce nodes of this small closed set; a [`PredicateBackend`]
//! lowers the finished tree into whatever query technology it wraps. The
//! compiler never evaluates a tree itself.
//!
//! [`PredicateBackend`]: super::backend::PredicateBackend

use serde::{Deserialize, Serialize};
use std::fmt;

/// Escape character used by [`PredicateNode::contains`] patterns.
pub const LIKE_ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    NotEqual,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::NotEqual => "<>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateNode {
    /// Matches everything (the empty search).
    All,
    Equals {
        field: String,
        value: Value,
    },
    /// SQL-style pattern: `%` any run, `_` one character, `escape` makes the
    /// next character literal.
    Like {
        field: String,
        pattern: String,
        escape: char,
        case_insensitive: bool,
    },
    Compare {
        field: String,
        comparison: Comparison,
        value: Value,
    },
    /// `field IN (SELECT key FROM subquery WHERE predicate)`.
    Member {
        field: String,
        subquery: String,
        key: String,
        predicate: Box<PredicateNode>,
    },
    And(Vec<PredicateNode>),
    Or(Vec<PredicateNode>),
    Not(Box<PredicateNode>),
}

impl PredicateNode {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        PredicateNode::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn compare(field: impl Into<String>, comparison: Comparison, value: impl Into<Value>) -> Self {
        PredicateNode::Compare {
            field: field.into(),
            comparison,
            value: value.into(),
        }
    }

    /// Case-insensitive "contains" match with `%`/`_`/escape in `needle`
    /// taken literally.
    pub fn contains(field: impl Into<String>, needle: &str) -> Self {
        PredicateNode::Like {
            field: field.into(),
            pattern: format!("%{}%", escape_like(needle, LIKE_ESCAPE)),
            escape: LIKE_ESCAPE,
            case_insensitive: true,
        }
    }

    pub fn member(
        field: impl Into<String>,
        subquery: impl Into<String>,
        key: impl Into<String>,
        predicate: PredicateNode,
    ) -> Self {
        PredicateNode::Member {
            field: field.into(),
            subquery: subquery.into(),
            key: key.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    pub fn and(nodes: impl IntoIterator<Item = PredicateNode>) -> Self {
        let mut flat = Vec::new();
        for node in nodes {
            match node {
                PredicateNode::All => {}
                PredicateNode::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => PredicateNode::All,
            1 => flat.remove(0),
            _ => PredicateNode::And(flat),
        }
    }

    /// Disjunction, flattening nested `Or`s. `All` absorbs the rest.
    pub fn or(nodes: impl IntoIterator<Item = PredicateNode>) -> Self {
        let mut flat = Vec::new();
        for node in nodes {
            match node {
                PredicateNode::All => return PredicateNode::All,
                PredicateNode::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => PredicateNode::All,
            1 => flat.remove(0),
            _ => PredicateNode::Or(flat),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            PredicateNode::Not(inner) => *inner,
            other => PredicateNode::Not(Box::new(other)),
        }
    }
}

/// Escape `%`, `_`, and the escape character itself.
pub fn escape_like(text: &str, escape: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '%' || c == '_' || c == escape {
            out.push(escape);
        }
        out.push(c);
    }
    out
}

/// The compiled result of one search expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateTree {
    root: PredicateNode,
}

impl PredicateTree {
    pub fn new(root: PredicateNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PredicateNode {
        &self.root
    }

    pub fn into_root(self) -> PredicateNode {
        self.root
    }

    pub fn is_unrestricted(&self) -> bool {
        self.root == PredicateNode::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens_and_drops_all() {
        let a = PredicateNode::equals("a", 1);
        let b = PredicateNode::equals("b", 2);
        let c = PredicateNode::equals("c", 3);
        let nested = PredicateNode::and([PredicateNode::and([a.clone(), b.clone()]), PredicateNode::All, c.clone()]);
        assert_eq!(nested, PredicateNode::And(vec![a.clone(), b, c]));
        assert_eq!(PredicateNode::and([a.clone()]), a);
        assert_eq!(PredicateNode::and(Vec::new()), PredicateNode::All);
    }

    #[test]
    fn or_is_absorbed_by_all() {
        let a = PredicateNode::equals("a", 1);
        assert_eq!(PredicateNode::or([a, PredicateNode::All]), PredicateNode::All);
    }

    #[test]
    fn double_negation_cancels() {
        let a = PredicateNode::equals("a", true);
        assert_eq!(a.clone().negate().negate(), a);
    }

    #[test]
    fn contains_escapes_wildcards() {
        let node = PredicateNode::contains("name", r"50%_off\");
        match node {
            PredicateNode::Like { pattern, escape, .. } => {
                assert_eq!(pattern, r"%50\%\_off\\%");
                assert_eq!(escape, '\\');
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn tree_serializes_as_tagged_json() {
        let tree = PredicateTree::new(PredicateNode::and([
            PredicateNode::equals("name", "John Doe"),
            PredicateNode::compare("age", Comparison::Greater, 5),
        ]));
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["root"]["and"][0]["equals"]["value"], "John Doe");
        assert_eq!(json["root"]["and"][1]["compare"]["comparison"], "greater");
        let back: PredicateTree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
