//! Resolution state shared by argument variants: the token cursor, the
//! accumulated typed values, and match priorities.

use crate::error::CommandError;
use crate::lexer::Token;
use crate::search::CompiledSearch;
use serde::Serialize;

/// Match confidence returned by an argument variant.
///
/// `None` means "did not match" and aborts the signature being tried.
/// Successful signatures are ranked by their priority vectors, compared
/// lexicographically from the first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    None,
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn is_match(self) -> bool {
        self != Priority::None
    }
}

/// One typed value produced by an argument variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Label(String),
    Text(String),
    Integer(i64),
    Number(f64),
    /// An optional argument that was not supplied.
    Absent,
    Search(CompiledSearch),
}

impl ArgValue {
    fn kind_name(&self) -> &'static str {
        match self {
            ArgValue::Label(_) => "label",
            ArgValue::Text(_) => "text",
            ArgValue::Integer(_) => "integer",
            ArgValue::Number(_) => "number",
            ArgValue::Absent => "absent",
            ArgValue::Search(_) => "search",
        }
    }
}

/// Typed arguments of a resolved signature.
///
/// Every variant contributes exactly one value, so [`Arguments::all`] lines up
/// with the signature. The indexed accessors skip labels: for
/// `grant user <name> <permission>`, `text(0)` is the name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Arguments {
    values: Vec<ArgValue>,
}

impl Arguments {
    pub fn new(values: Vec<ArgValue>) -> Self {
        Self { values }
    }

    pub fn all(&self) -> &[ArgValue] {
        &self.values
    }

    /// Values excluding labels.
    pub fn bound(&self) -> Vec<&ArgValue> {
        self.values
            .iter()
            .filter(|v| !matches!(v, ArgValue::Label(_)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bound().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values
            .iter()
            .filter(|v| !matches!(v, ArgValue::Label(_)))
            .nth(index)
    }

    fn expect_value(&self, index: usize) -> Result<&ArgValue, CommandError> {
        self.get(index)
            .ok_or_else(|| CommandError::router(format!("argument #{index} was not bound")))
    }

    fn mismatch(index: usize, wanted: &str, got: &ArgValue) -> CommandError {
        CommandError::router(format!(
            "argument #{index} is {}, not {wanted}",
            got.kind_name()
        ))
    }

    pub fn text(&self, index: usize) -> Result<&str, CommandError> {
        match self.expect_value(index)? {
            ArgValue::Text(s) | ArgValue::Label(s) => Ok(s),
            other => Err(Self::mismatch(index, "text", other)),
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64, CommandError> {
        match self.expect_value(index)? {
            ArgValue::Integer(n) => Ok(*n),
            other => Err(Self::mismatch(index, "an integer", other)),
        }
    }

    pub fn number(&self, index: usize) -> Result<f64, CommandError> {
        match self.expect_value(index)? {
            ArgValue::Number(n) => Ok(*n),
            ArgValue::Integer(n) => Ok(*n as f64),
            other => Err(Self::mismatch(index, "a number", other)),
        }
    }

    pub fn search(&self, index: usize) -> Result<&CompiledSearch, CommandError> {
        match self.expect_value(index)? {
            ArgValue::Search(s) => Ok(s),
            other => Err(Self::mismatch(index, "a search", other)),
        }
    }

    /// `false` for an optional argument that was left out.
    pub fn is_present(&self, index: usize) -> bool {
        !matches!(self.get(index), None | Some(ArgValue::Absent))
    }
}

/// Saved cursor/accumulator position for backtracking inside a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    cursor: usize,
    values: usize,
}

/// Cursor over the remaining tokens plus the values parsed so far.
///
/// Owned by exactly one resolution attempt. Attempts fork by cloning, which
/// copies only the slice reference, the cursor, and the values.
#[derive(Debug, Clone)]
pub struct ChainState<'t> {
    tokens: &'t [Token],
    cursor: usize,
    values: Vec<ArgValue>,
}

impl<'t> ChainState<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            cursor: 0,
            values: Vec::new(),
        }
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.cursor)
    }

    pub fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    pub fn remaining(&self) -> &'t [Token] {
        &self.tokens[self.cursor..]
    }

    /// Consume every remaining token.
    pub fn take_rest(&mut self) -> &'t [Token] {
        let rest = self.remaining();
        self.cursor = self.tokens.len();
        rest
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn push(&mut self, value: ArgValue) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[ArgValue] {
        &self.values
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cursor: self.cursor,
            values: self.values.len(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor = checkpoint.cursor;
        self.values.truncate(checkpoint.values);
    }

    pub fn into_values(self) -> Vec<ArgValue> {
        self.values
    }
}
