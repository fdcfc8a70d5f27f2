//! Search expressions: clause grammar over search-mode tokens.
//!
//! ```text
//! search  := clause*
//! clause  := ("|" | "OR")? "!"? predicate
//! predicate := QUOTED            string predicate
//!            | WORD              argument predicate
//! ```
//!
//! Clauses join with AND unless OR-joined; folding is left to right, so
//! `a b | c` means `(a AND b) OR c`. `OR` is only an operator between two
//! clauses; a leading `OR` is an ordinary word.

use crate::error::CommandError;
use crate::lexer::{Lexer, Token, NOT_OPERATOR, OR_OPERATOR};
use nom::bytes::complete::take_till;
use nom::character::complete::one_of;
use nom::combinator::rest;
use nom::sequence::tuple;
use nom::IResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Word that OR-joins the following clause.
pub const OR_KEYWORD: &str = "OR";

/// Characters that split an argument predicate into `name`, operator, value.
pub const OPERATOR_CHARS: &str = ":><=!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPredicate {
    /// Quoted free text, handled by the registry's string handler.
    String(String),
    /// `name<op>value` or a bare command word.
    Argument(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub combinator: Combinator,
    pub negated: bool,
    pub predicate: SearchPredicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOperator {
    Colon,
    Greater,
    Less,
    Equal,
    Bang,
}

impl SearchOperator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            ':' => Some(Self::Colon),
            '>' => Some(Self::Greater),
            '<' => Some(Self::Less),
            '=' => Some(Self::Equal),
            '!' => Some(Self::Bang),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Colon => ':',
            Self::Greater => '>',
            Self::Less => '<',
            Self::Equal => '=',
            Self::Bang => '!',
        }
    }
}

/// An argument predicate split at its first operator character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchArgument<'a> {
    pub name: &'a str,
    pub operator: SearchOperator,
    pub value: &'a str,
}

fn split_clause(input: &str) -> IResult<&str, (&str, char, &str)> {
    tuple((take_till(|c| OPERATOR_CHARS.contains(c)), one_of(OPERATOR_CHARS), rest))(input)
}

impl<'a> SearchArgument<'a> {
    /// Split `name<op>value`. Returns `None` for a bare word (no operator, or
    /// an operator with nothing before it).
    pub fn split(raw: &'a str) -> Option<Self> {
        let (_, (name, op, value)) = split_clause(raw).ok()?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            operator: SearchOperator::from_char(op)?,
            value,
        })
    }
}

/// A parsed search expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    clauses: Vec<Clause>,
}

impl Search {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Parse search-mode tokens (see [`Lexer::tokenize_search`]).
    pub fn from_tokens(tokens: &[Token]) -> Result<Self, CommandError> {
        let mut clauses = Vec::new();
        let mut combinator = Combinator::And;
        let mut negated = false;
        let mut pending_operator: Option<String> = None;

        for token in tokens {
            let predicate = match token {
                Token::Operator(c) if *c == OR_OPERATOR => {
                    if negated {
                        return Err(CommandError::argument(format!(
                            "`{NOT_OPERATOR}` must be followed by a search term, not `{OR_OPERATOR}`."
                        )));
                    }
                    combinator = Combinator::Or;
                    pending_operator = Some(c.to_string());
                    continue;
                }
                Token::Operator(c) if *c == NOT_OPERATOR => {
                    negated = !negated;
                    pending_operator = Some(c.to_string());
                    continue;
                }
                Token::Word(w) if w == OR_KEYWORD && !clauses.is_empty() && !negated => {
                    combinator = Combinator::Or;
                    pending_operator = Some(w.clone());
                    continue;
                }
                Token::Operator(c) => {
                    return Err(CommandError::argument(format!("Unexpected search operator `{c}`.")));
                }
                Token::Quoted(text) => SearchPredicate::String(text.clone()),
                Token::Word(word) | Token::Escaped(word) => SearchPredicate::Argument(word.clone()),
            };
            clauses.push(Clause {
                combinator: if clauses.is_empty() { Combinator::And } else { combinator },
                negated,
                predicate,
            });
            combinator = Combinator::And;
            negated = false;
            pending_operator = None;
        }

        if let Some(op) = pending_operator {
            return Err(CommandError::argument(format!(
                "Search ends with `{op}`; expected a search term after it."
            )));
        }
        Ok(Self { clauses })
    }

    /// Tokenize and parse `text` in one step.
    pub fn parse(lexer: &Lexer, text: &str) -> Result<Self, CommandError> {
        Self::from_tokens(&lexer.tokenize_search(text))
    }
}

impl fmt::Display for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lexer = Lexer::default();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
                if clause.combinator == Combinator::Or {
                    write!(f, "{OR_OPERATOR} ")?;
                }
            }
            if clause.negated {
                write!(f, "{NOT_OPERATOR}")?;
            }
            match &clause.predicate {
                SearchPredicate::String(s) => f.write_str(&lexer.render(&Token::Quoted(s.clone())))?,
                SearchPredicate::Argument(a) => f.write_str(&lexer.render(&Token::literal(a.clone())))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Search {
        Search::parse(&Lexer::default(), text).unwrap()
    }

    fn arg(combinator: Combinator, negated: bool, raw: &str) -> Clause {
        Clause {
            combinator,
            negated,
            predicate: SearchPredicate::Argument(raw.into()),
        }
    }

    #[test]
    fn quoted_values_stay_in_one_clause() {
        let search = parse(r#"name:"John Doe" active"#);
        assert_eq!(
            search.clauses(),
            &[
                arg(Combinator::And, false, "name:John Doe"),
                arg(Combinator::And, false, "active"),
            ]
        );
    }

    #[test]
    fn operators_set_negation_and_disjunction() {
        let search = parse(r#"!banned | admin OR "root""#);
        assert_eq!(search.clauses().len(), 3);
        assert_eq!(search.clauses()[0], arg(Combinator::And, true, "banned"));
        assert_eq!(search.clauses()[1], arg(Combinator::Or, false, "admin"));
        assert_eq!(
            search.clauses()[2],
            Clause {
                combinator: Combinator::Or,
                negated: false,
                predicate: SearchPredicate::String("root".into()),
            }
        );
    }

    #[test]
    fn leading_or_is_a_word() {
        assert_eq!(parse("OR").clauses(), &[arg(Combinator::And, false, "OR")]);
    }

    #[test]
    fn dangling_operators_are_rejected() {
        assert!(Search::parse(&Lexer::default(), "active |").is_err());
        assert!(Search::parse(&Lexer::default(), "active !").is_err());
        assert!(Search::parse(&Lexer::default(), "! | x").is_err());
    }

    #[test]
    fn dangling_operator_errors_name_what_was_typed() {
        let message = |text: &str| Search::parse(&Lexer::default(), text).unwrap_err().message().to_string();
        assert_eq!(message("active OR"), "Search ends with `OR`; expected a search term after it.");
        assert_eq!(message("active |"), "Search ends with `|`; expected a search term after it.");
        assert_eq!(message("active !"), "Search ends with `!`; expected a search term after it.");
    }

    #[test]
    fn escaped_operators_are_arguments() {
        let search = parse(r"\!active \| !\!x");
        assert_eq!(
            search.clauses(),
            &[
                arg(Combinator::And, false, "!active"),
                arg(Combinator::And, false, "|"),
                arg(Combinator::And, true, "!x"),
            ]
        );
        assert_eq!(search.to_string(), r"\!active \| !\!x");
        assert_eq!(parse(&search.to_string()), search);
    }

    #[test]
    fn empty_input_is_an_empty_search() {
        assert!(parse("   ").is_empty());
    }

    #[test]
    fn arguments_split_on_first_operator() {
        let split = SearchArgument::split("age>=21").unwrap();
        assert_eq!(split.name, "age");
        assert_eq!(split.operator, SearchOperator::Greater);
        assert_eq!(split.value, "=21");

        let split = SearchArgument::split("name:John Doe").unwrap();
        assert_eq!((split.name, split.value), ("name", "John Doe"));

        let split = SearchArgument::split("created:>2020").unwrap();
        assert_eq!(split.operator, SearchOperator::Colon);
        assert_eq!(split.value, ">2020");

        assert_eq!(SearchArgument::split("active"), None);
        assert_eq!(SearchArgument::split(":oops"), None);
    }

    #[test]
    fn display_renders_reparsable_text() {
        let search = parse(r#"!name:"John Doe" | "free text""#);
        assert_eq!(parse(&search.to_string()), search);
    }
}
