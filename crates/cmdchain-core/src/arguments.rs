//! Argument variants: the pluggable parsers a signature is built from.
//!
//! Each variant is a small function over a [`ChainState`]. On success it
//! consumes tokens, pushes exactly one [`ArgValue`], and reports a
//! [`Priority`]. Returning [`Priority::None`] must leave the state untouched.
//! A token that matches structurally but fails conversion (an integer that
//! overflows, a value out of range) is reported as a cast error instead.

use crate::chain::{ArgValue, ChainState, Priority};
use crate::error::CommandError;
use nom::character::complete::{digit1, one_of};
use nom::combinator::{all_consuming, opt, recognize};
use nom::number::complete::recognize_float;
use nom::sequence::pair;
use nom::IResult;
use std::fmt;
use std::sync::Arc;

pub type Variant = Arc<dyn ArgumentVariant>;

/// Structural identity of a variant, used to detect signatures that could
/// never be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariantShape {
    Label(String),
    Text,
    Integer,
    Number,
    Choice(Vec<String>),
    Remainder,
    Optional(Box<VariantShape>),
    Search,
    Custom(String),
}

pub trait ArgumentVariant: fmt::Debug + Send + Sync {
    /// Try to consume input from `state`.
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError>;

    fn shape(&self) -> VariantShape;

    /// Placeholder shown in usage lines, e.g. `<name>` or `grant`.
    fn usage(&self) -> String;

    /// Terminal variants consume the rest of the input.
    fn is_terminal(&self) -> bool {
        false
    }

    /// May `other` directly follow this variant in a signature?
    fn can_extend(&self, _other: &dyn ArgumentVariant) -> bool {
        !self.is_terminal()
    }

    /// May this variant and `other` appear in the same signature?
    fn can_coexist(&self, _other: &dyn ArgumentVariant) -> bool {
        true
    }
}

// ============================================================================
// Label
// ============================================================================

/// A literal keyword. Matches at [`Priority::High`] so labels decide between
/// overloads. Only unquoted words match; a quoted token is always data.
#[derive(Debug, Clone)]
pub struct Label {
    literal: String,
    case_sensitive: bool,
}

impl Label {
    pub fn new(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    fn matches(&self, word: &str) -> bool {
        if self.case_sensitive {
            word == self.literal
        } else {
            word.to_lowercase() == self.literal.to_lowercase()
        }
    }
}

impl ArgumentVariant for Label {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        match state.peek() {
            Some(token) if token.is_word() && self.matches(&token.text()) => {
                state.advance();
                state.push(ArgValue::Label(self.literal.clone()));
                Ok(Priority::High)
            }
            _ => Ok(Priority::None),
        }
    }

    fn shape(&self) -> VariantShape {
        if self.case_sensitive {
            VariantShape::Label(self.literal.clone())
        } else {
            VariantShape::Label(self.literal.to_lowercase())
        }
    }

    fn usage(&self) -> String {
        self.literal.clone()
    }
}

// ============================================================================
// Text
// ============================================================================

/// Any single token.
#[derive(Debug, Clone)]
pub struct Text {
    name: String,
}

impl ArgumentVariant for Text {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        match state.advance() {
            Some(token) => {
                state.push(ArgValue::Text(token.text().into_owned()));
                Ok(Priority::Low)
            }
            None => Ok(Priority::None),
        }
    }

    fn shape(&self) -> VariantShape {
        VariantShape::Text
    }

    fn usage(&self) -> String {
        format!("<{}>", self.name)
    }
}

// ============================================================================
// Numbers
// ============================================================================

fn integer_literal(input: &str) -> IResult<&str, &str> {
    all_consuming(recognize(pair(opt(one_of("+-")), digit1)))(input)
}

fn float_literal(input: &str) -> IResult<&str, &str> {
    all_consuming(recognize_float)(input)
}

/// True when `text` is shaped like an integer (sign + digits).
pub fn looks_like_integer(text: &str) -> bool {
    integer_literal(text).is_ok()
}

/// True when `text` is shaped like a decimal number.
pub fn looks_like_number(text: &str) -> bool {
    float_literal(text).is_ok()
}

/// Parse a decimal, rejecting non-finite results.
pub fn parse_number(text: &str) -> Result<f64, CommandError> {
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CommandError::cast(format!("`{text}` is not a valid number.")))
}

#[derive(Debug, Clone)]
pub struct Integer {
    name: String,
    min: i64,
    max: i64,
}

impl ArgumentVariant for Integer {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        let Some(token) = state.peek() else {
            return Ok(Priority::None);
        };
        let text = token.text();
        if !looks_like_integer(&text) {
            return Ok(Priority::None);
        }
        let value: i64 = text
            .parse()
            .map_err(|_| CommandError::cast(format!("`{text}` is out of range for <{}>.", self.name)))?;
        if value < self.min || value > self.max {
            return Err(CommandError::cast(format!(
                "<{}> must be between {} and {}, got {value}.",
                self.name, self.min, self.max
            )));
        }
        state.advance();
        state.push(ArgValue::Integer(value));
        Ok(Priority::Normal)
    }

    fn shape(&self) -> VariantShape {
        VariantShape::Integer
    }

    fn usage(&self) -> String {
        format!("<{}>", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Number {
    name: String,
}

impl ArgumentVariant for Number {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        let Some(token) = state.peek() else {
            return Ok(Priority::None);
        };
        let text = token.text();
        if !looks_like_number(&text) {
            return Ok(Priority::None);
        }
        let value = parse_number(&text)?;
        state.advance();
        state.push(ArgValue::Number(value));
        Ok(Priority::Normal)
    }

    fn shape(&self) -> VariantShape {
        VariantShape::Number
    }

    fn usage(&self) -> String {
        format!("<{}>", self.name)
    }
}

// ============================================================================
// Choice, Remainder, Optional
// ============================================================================

/// One of a fixed set of words (case-insensitive). Yields the canonical
/// spelling as text. Usage reads `<name:a|b>`.
#[derive(Debug, Clone)]
pub struct Choice {
    name: String,
    options: Vec<String>,
}

impl ArgumentVariant for Choice {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        let Some(token) = state.peek() else {
            return Ok(Priority::None);
        };
        let text = token.text().to_lowercase();
        match self.options.iter().find(|o| o.to_lowercase() == text) {
            Some(option) => {
                state.advance();
                state.push(ArgValue::Text(option.clone()));
                Ok(Priority::Normal)
            }
            None => Ok(Priority::None),
        }
    }

    fn shape(&self) -> VariantShape {
        let mut options: Vec<String> = self.options.iter().map(|o| o.to_lowercase()).collect();
        options.sort();
        VariantShape::Choice(options)
    }

    fn usage(&self) -> String {
        format!("<{}:{}>", self.name, self.options.join("|"))
    }
}

/// Greedy free text: every remaining token joined by single spaces.
#[derive(Debug, Clone)]
pub struct Remainder {
    name: String,
}

impl ArgumentVariant for Remainder {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        if state.is_exhausted() {
            return Ok(Priority::None);
        }
        let text = state
            .take_rest()
            .iter()
            .map(|t| t.text().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        state.push(ArgValue::Text(text));
        Ok(Priority::Low)
    }

    fn shape(&self) -> VariantShape {
        VariantShape::Remainder
    }

    fn usage(&self) -> String {
        format!("<{}...>", self.name)
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

/// Wraps another variant; when it does not match, yields [`ArgValue::Absent`]
/// at [`Priority::Low`] without consuming input.
#[derive(Debug, Clone)]
pub struct Optional {
    inner: Variant,
}

impl ArgumentVariant for Optional {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        let checkpoint = state.checkpoint();
        match self.inner.cast(state)? {
            Priority::None => {
                state.restore(checkpoint);
                state.push(ArgValue::Absent);
                Ok(Priority::Low)
            }
            matched => Ok(matched),
        }
    }

    fn shape(&self) -> VariantShape {
        VariantShape::Optional(Box::new(self.inner.shape()))
    }

    fn usage(&self) -> String {
        let inner = self.inner.usage();
        let bare = inner.trim_start_matches('<').trim_end_matches('>');
        format!("[{bare}]")
    }

    fn is_terminal(&self) -> bool {
        self.inner.is_terminal()
    }

    fn can_extend(&self, other: &dyn ArgumentVariant) -> bool {
        self.inner.can_extend(other)
    }

    fn can_coexist(&self, other: &dyn ArgumentVariant) -> bool {
        self.inner.can_coexist(other)
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Case-insensitive keyword.
pub fn label(literal: impl Into<String>) -> Variant {
    Arc::new(Label::new(literal))
}

/// Case-sensitive keyword.
pub fn label_exact(literal: impl Into<String>) -> Variant {
    Arc::new(Label::new(literal).case_sensitive(true))
}

pub fn text(name: impl Into<String>) -> Variant {
    Arc::new(Text { name: name.into() })
}

pub fn integer(name: impl Into<String>) -> Variant {
    Arc::new(Integer {
        name: name.into(),
        min: i64::MIN,
        max: i64::MAX,
    })
}

pub fn integer_in(name: impl Into<String>, min: i64, max: i64) -> Variant {
    Arc::new(Integer {
        name: name.into(),
        min,
        max,
    })
}

pub fn number(name: impl Into<String>) -> Variant {
    Arc::new(Number { name: name.into() })
}

pub fn choice<S: AsRef<str>>(name: impl Into<String>, options: &[S]) -> Variant {
    Arc::new(Choice {
        name: name.into(),
        options: options.iter().map(|o| o.as_ref().to_string()).collect(),
    })
}

pub fn remainder(name: impl Into<String>) -> Variant {
    Arc::new(Remainder { name: name.into() })
}

pub fn optional(inner: Variant) -> Variant {
    Arc::new(Optional { inner })
}
