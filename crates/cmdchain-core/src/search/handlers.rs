//! Built-in clause handlers.

use super::handler::{ClauseHandler, Handler};
use super::parse::SearchOperator;
use super::predicate::{Comparison, PredicateNode, Value};
use crate::arguments::{looks_like_integer, looks_like_number, parse_number};
use crate::error::CommandError;
use std::sync::Arc;

fn unsupported(field: &str, operator: SearchOperator) -> CommandError {
    CommandError::argument(format!("`{field}` does not support `{}`.", operator.symbol()))
}

fn require_value<'v>(field: &str, value: &'v str) -> Result<&'v str, CommandError> {
    if value.is_empty() {
        Err(CommandError::argument(format!("`{field}` needs a value.")))
    } else {
        Ok(value)
    }
}

/// Exact text match. `name!value` negates.
#[derive(Debug, Clone)]
pub struct Equals {
    field: String,
}

impl ClauseHandler for Equals {
    fn handle(&self, operator: SearchOperator, value: &str) -> Result<PredicateNode, CommandError> {
        let value = require_value(&self.field, value)?;
        let node = PredicateNode::equals(self.field.as_str(), value);
        match operator {
            SearchOperator::Colon | SearchOperator::Equal => Ok(node),
            SearchOperator::Bang => Ok(node.negate()),
            other => Err(unsupported(&self.field, other)),
        }
    }
}

/// Case-insensitive substring match; `name=value` is exact.
#[derive(Debug, Clone)]
pub struct Contains {
    field: String,
}

impl ClauseHandler for Contains {
    fn handle(&self, operator: SearchOperator, value: &str) -> Result<PredicateNode, CommandError> {
        let value = require_value(&self.field, value)?;
        match operator {
            SearchOperator::Colon => Ok(PredicateNode::contains(self.field.as_str(), value)),
            SearchOperator::Equal => Ok(PredicateNode::equals(self.field.as_str(), value)),
            SearchOperator::Bang => Ok(PredicateNode::contains(self.field.as_str(), value).negate()),
            other => Err(unsupported(&self.field, other)),
        }
    }
}

/// Numeric comparison.
///
/// After `name:` the value may start with its own comparison: `>5`, `>=5`,
/// `<5`, `<=5`, `=5`, `!5`/`!=5`; a bare number is an exact match. The split
/// operators `name>5`, `name>=5`, `name<5`, `name=5`, `name!=5` mean the same.
#[derive(Debug, Clone)]
pub struct Numeric {
    field: String,
}

impl Numeric {
    fn comparison(&self, operator: SearchOperator, value: &str) -> Result<(Option<Comparison>, String), CommandError> {
        let (lead, body) = match operator {
            SearchOperator::Colon => match value.chars().next() {
                Some(c @ ('>' | '<' | '=' | '!')) => (Some(c), &value[1..]),
                _ => (None, value),
            },
            other => (Some(other.symbol()), value),
        };
        let or_equal = body.starts_with('=');
        let body = if lead.is_some() && or_equal { &body[1..] } else { body };
        let comparison = match (lead, or_equal) {
            (None, _) | (Some('='), false) => None,
            (Some('='), true) => return Err(unsupported(&self.field, SearchOperator::Equal)),
            (Some('>'), false) => Some(Comparison::Greater),
            (Some('>'), true) => Some(Comparison::GreaterOrEqual),
            (Some('<'), false) => Some(Comparison::Less),
            (Some('<'), true) => Some(Comparison::LessOrEqual),
            (Some(_), _) => Some(Comparison::NotEqual),
        };
        Ok((comparison, body.to_string()))
    }

    fn parse(&self, text: &str) -> Result<Value, CommandError> {
        if looks_like_integer(text) {
            return text
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| CommandError::cast(format!("`{text}` is out of range for `{}`.", self.field)));
        }
        if looks_like_number(text) {
            return parse_number(text).map(Value::Number);
        }
        Err(CommandError::cast(format!("`{text}` is not a valid number for `{}`.", self.field)))
    }
}

impl ClauseHandler for Numeric {
    fn handle(&self, operator: SearchOperator, value: &str) -> Result<PredicateNode, CommandError> {
        let value = require_value(&self.field, value)?;
        let (comparison, body) = self.comparison(operator, value)?;
        let body = require_value(&self.field, &body)?;
        let number = self.parse(body)?;
        Ok(match comparison {
            None => PredicateNode::equals(self.field.as_str(), number),
            Some(comparison) => PredicateNode::compare(self.field.as_str(), comparison, number),
        })
    }
}

/// Bare-word command setting `field` to a fixed value (`active`).
#[derive(Debug, Clone)]
pub struct Flag {
    field: String,
    value: Value,
}

impl ClauseHandler for Flag {
    fn handle(&self, _operator: SearchOperator, _value: &str) -> Result<PredicateNode, CommandError> {
        Ok(PredicateNode::equals(self.field.as_str(), self.value.clone()))
    }
}

/// Matches rows whose `field` appears as `key` in `subquery` rows selected by
/// the inner handler.
pub struct Member {
    field: String,
    subquery: String,
    key: String,
    inner: Handler,
}

impl ClauseHandler for Member {
    fn handle(&self, operator: SearchOperator, value: &str) -> Result<PredicateNode, CommandError> {
        let predicate = self.inner.handle(operator, value)?;
        Ok(PredicateNode::member(
            self.field.as_str(),
            self.subquery.as_str(),
            self.key.as_str(),
            predicate,
        ))
    }
}

pub fn equals(field: impl Into<String>) -> Equals {
    Equals { field: field.into() }
}

pub fn contains(field: impl Into<String>) -> Contains {
    Contains { field: field.into() }
}

pub fn numeric(field: impl Into<String>) -> Numeric {
    Numeric { field: field.into() }
}

pub fn flag(field: impl Into<String>, value: impl Into<Value>) -> Flag {
    Flag {
        field: field.into(),
        value: value.into(),
    }
}

pub fn member(
    field: impl Into<String>,
    subquery: impl Into<String>,
    key: impl Into<String>,
    inner: impl ClauseHandler + 'static,
) -> Member {
    Member {
        field: field.into(),
        subquery: subquery.into(),
        key: key.into(),
        inner: Arc::new(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CastLevel, ErrorKind};

    #[test]
    fn numeric_reads_a_leading_comparison() {
        let age = numeric("age");
        assert_eq!(
            age.handle(SearchOperator::Colon, ">5").unwrap(),
            PredicateNode::compare("age", Comparison::Greater, 5)
        );
        assert_eq!(age.handle(SearchOperator::Colon, "5").unwrap(), PredicateNode::equals("age", 5));
        assert_eq!(
            age.handle(SearchOperator::Colon, "<=2.5").unwrap(),
            PredicateNode::compare("age", Comparison::LessOrEqual, Value::Number(2.5))
        );
        assert_eq!(
            age.handle(SearchOperator::Colon, "!7").unwrap(),
            PredicateNode::compare("age", Comparison::NotEqual, 7)
        );
        assert_eq!(age.handle(SearchOperator::Colon, "=7").unwrap(), PredicateNode::equals("age", 7));
    }

    #[test]
    fn numeric_accepts_split_operators() {
        let age = numeric("age");
        assert_eq!(
            age.handle(SearchOperator::Greater, "=18").unwrap(),
            PredicateNode::compare("age", Comparison::GreaterOrEqual, 18)
        );
        assert_eq!(
            age.handle(SearchOperator::Bang, "=3").unwrap(),
            PredicateNode::compare("age", Comparison::NotEqual, 3)
        );
        assert_eq!(age.handle(SearchOperator::Equal, "3").unwrap(), PredicateNode::equals("age", 3));
        assert!(age.handle(SearchOperator::Equal, "=3").is_err());
    }

    #[test]
    fn numeric_rejects_empty_and_garbage() {
        let age = numeric("age");
        assert_eq!(age.handle(SearchOperator::Colon, "").unwrap_err().kind(), ErrorKind::Argument);
        assert_eq!(age.handle(SearchOperator::Colon, ">").unwrap_err().kind(), ErrorKind::Argument);
        assert_eq!(
            age.handle(SearchOperator::Colon, ">old").unwrap_err().kind(),
            ErrorKind::ArgumentCast(CastLevel::Cast)
        );
        assert_eq!(
            age.handle(SearchOperator::Colon, "99999999999999999999").unwrap_err().kind(),
            ErrorKind::ArgumentCast(CastLevel::Cast)
        );
    }

    #[test]
    fn equals_supports_negation_only() {
        let name = equals("name");
        assert_eq!(
            name.handle(SearchOperator::Bang, "bob").unwrap(),
            PredicateNode::equals("name", "bob").negate()
        );
        assert!(name.handle(SearchOperator::Greater, "bob").is_err());
        assert!(name.handle(SearchOperator::Colon, "").is_err());
    }

    #[test]
    fn contains_builds_an_escaped_like() {
        let bio = contains("bio");
        assert_eq!(bio.handle(SearchOperator::Colon, "100%").unwrap(), PredicateNode::contains("bio", "100%"));
        assert_eq!(bio.handle(SearchOperator::Equal, "x").unwrap(), PredicateNode::equals("bio", "x"));
    }

    #[test]
    fn member_wraps_the_inner_predicate() {
        let group = member("id", "memberships", "user_id", equals("group"));
        assert_eq!(
            group.handle(SearchOperator::Colon, "staff").unwrap(),
            PredicateNode::member("id", "memberships", "user_id", PredicateNode::equals("group", "staff"))
        );
    }
}
