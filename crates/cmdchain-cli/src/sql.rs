//! Lowers compiled searches into a parameterized SQL `WHERE` clause.
//!
//! Identifiers are double-quoted and must be plain `[A-Za-z_][A-Za-z0-9_]*`
//! names; every literal becomes a `?` placeholder with its value pushed to
//! [`SqlWhere::params`] in placeholder order.

use cmdchain_core::search::{PredicateBackend, PredicateNode, PredicateTree, Value};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlError {
    #[error("`{0}` is not a valid SQL identifier")]
    Identifier(String),
    #[error("LIKE escape {0:?} cannot be used in SQL")]
    Escape(char),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlWhere {
    pub clause: String,
    pub params: Vec<Value>,
}

/// SQL dialect knobs. The default targets SQLite/Postgres style `?` params.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlBackend;

impl SqlBackend {
    pub fn new() -> Self {
        Self
    }

    fn write(&self, node: &PredicateNode, out: &mut SqlWhere) -> Result<String, SqlError> {
        Ok(match node {
            PredicateNode::All => "1 = 1".to_string(),
            PredicateNode::Equals { field, value } => {
                out.params.push(value.clone());
                format!("{} = ?", ident(field)?)
            }
            PredicateNode::Like {
                field,
                pattern,
                escape,
                case_insensitive,
            } => {
                if *escape == '\'' || escape.is_control() {
                    return Err(SqlError::Escape(*escape));
                }
                out.params.push(Value::Text(pattern.clone()));
                if *case_insensitive {
                    format!("LOWER({}) LIKE LOWER(?) ESCAPE '{escape}'", ident(field)?)
                } else {
                    format!("{} LIKE ? ESCAPE '{escape}'", ident(field)?)
                }
            }
            PredicateNode::Compare {
                field,
                comparison,
                value,
            } => {
                out.params.push(value.clone());
                format!("{} {} ?", ident(field)?, comparison.symbol())
            }
            PredicateNode::Member {
                field,
                subquery,
                key,
                predicate,
            } => {
                let inner = self.write(predicate, out)?;
                format!(
                    "{} IN (SELECT {} FROM {} WHERE {inner})",
                    ident(field)?,
                    ident(key)?,
                    ident(subquery)?
                )
            }
            PredicateNode::And(nodes) => self.join(nodes, "AND", "1 = 1", out)?,
            PredicateNode::Or(nodes) => self.join(nodes, "OR", "1 = 0", out)?,
            PredicateNode::Not(inner) => format!("NOT ({})", self.write(inner, out)?),
        })
    }

    fn join(&self, nodes: &[PredicateNode], op: &str, empty: &str, out: &mut SqlWhere) -> Result<String, SqlError> {
        match nodes {
            [] => Ok(empty.to_string()),
            [single] => self.write(single, out),
            _ => {
                let parts = nodes
                    .iter()
                    .map(|n| self.write(n, out))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(&format!(" {op} "))))
            }
        }
    }
}

impl PredicateBackend for SqlBackend {
    type Output = SqlWhere;
    type Error = SqlError;

    fn lower(&self, tree: &PredicateTree) -> Result<SqlWhere, SqlError> {
        let mut out = SqlWhere {
            clause: String::new(),
            params: Vec::new(),
        };
        out.clause = self.write(tree.root(), &mut out)?;
        Ok(out)
    }
}

fn ident(name: &str) -> Result<String, SqlError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(SqlError::Identifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}
