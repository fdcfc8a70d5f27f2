//! Shell-style tokenizer for command lines and search expressions.
//!
//! The lexer is total: it never fails. Malformed quoting degrades to literal
//! text the way an interactive shell would treat it:
//!
//! - whitespace outside quotes separates tokens and is discarded,
//! - whitespace inside quotes is preserved,
//! - `\` followed by any character yields that character (inside or outside
//!   quotes),
//! - an unmatched trailing quote makes the rest of the line the quoted text,
//! - adjacent quoted/unquoted segments join into one token (`name:"John Doe"`
//!   is the single word `name:John Doe`).
//!
//! A token whose *first* segment was quoted is a [`Token::Quoted`]. A word
//! whose leading `!` or lone `|` was escaped is a [`Token::Escaped`], so it
//! stays literal when the line is later re-lexed as a search. Anything else is
//! a [`Token::Word`].
//!
//! Search mode ([`Lexer::tokenize_search`]) additionally recognizes two
//! operator tokens: a leading unescaped `!` on a word (negation) and a
//! standalone `|` word (disjunction).

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub const DEFAULT_QUOTE: char = '"';
pub const DEFAULT_ESCAPE: char = '\\';

/// Prefix operator negating the next search clause.
pub const NOT_OPERATOR: char = '!';
/// Standalone operator joining the next search clause with OR.
pub const OR_OPERATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Word(String),
    Quoted(String),
    /// A word whose operator-looking first character was escaped.
    Escaped(String),
    Operator(char),
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Token::Word(text.into())
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Token::Quoted(text.into())
    }

    /// An unquoted word that must stay literal in search mode: `Escaped` when
    /// `text` would otherwise lex as an operator, `Word` otherwise.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        if operator_like(&text) {
            Token::Escaped(text)
        } else {
            Token::Word(text)
        }
    }

    /// The token's content with quoting removed.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Token::Word(s) | Token::Quoted(s) | Token::Escaped(s) => Cow::Borrowed(s.as_str()),
            Token::Operator(c) => Cow::Owned(c.to_string()),
        }
    }

    /// Unquoted text, escaped or not.
    pub fn is_word(&self) -> bool {
        matches!(self, Token::Word(_) | Token::Escaped(_))
    }

    /// Render back into input for the default lexer.
    pub fn to_source(&self) -> String {
        Lexer::default().render(self)
    }
}

/// Whether an unescaped word with this text lexes as a search operator.
fn operator_like(text: &str) -> bool {
    text.starts_with(NOT_OPERATOR) || (text.len() == 1 && text.starts_with(OR_OPERATOR))
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Tokenizer with a fixed quote and escape character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexer {
    pub quote: char,
    pub escape: char,
}

impl Default for Lexer {
    fn default() -> Self {
        Self {
            quote: DEFAULT_QUOTE,
            escape: DEFAULT_ESCAPE,
        }
    }
}

/// In-progress token while scanning.
#[derive(Default)]
struct Pending {
    text: String,
    started: bool,
    /// Char offset at which the first quoted segment opened.
    quoted_at: Option<usize>,
    /// The first character came from an escape sequence.
    escaped_first: bool,
    chars: usize,
}

impl Pending {
    fn push(&mut self, c: char) {
        self.started = true;
        self.text.push(c);
        self.chars += 1;
    }
}

impl Lexer {
    pub fn new(quote: char, escape: char) -> Self {
        Self { quote, escape }
    }

    /// Tokenize a command line into words and quoted strings.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.scan(text, false)
    }

    /// Tokenize a search expression; like [`Lexer::tokenize`] but also emits
    /// `!` and `|` operator tokens.
    pub fn tokenize_search(&self, text: &str) -> Vec<Token> {
        self.scan(text, true)
    }

    fn scan(&self, text: &str, operators: bool) -> Vec<Token> {
        let mut out = Vec::new();
        let mut pending = Pending::default();
        let mut in_quotes = false;
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            if c == self.escape {
                // A dangling escape at end of input is kept literally.
                let next = chars.next().unwrap_or(self.escape);
                if !pending.started {
                    pending.escaped_first = true;
                }
                pending.push(next);
                continue;
            }
            if c == self.quote {
                if !in_quotes && pending.quoted_at.is_none() {
                    pending.quoted_at = Some(pending.chars);
                }
                pending.started = true;
                in_quotes = !in_quotes;
                continue;
            }
            if c.is_whitespace() && !in_quotes {
                if pending.started {
                    self.finish(std::mem::take(&mut pending), operators, &mut out);
                }
                continue;
            }
            pending.push(c);
        }

        if pending.started {
            self.finish(pending, operators, &mut out);
        }
        out
    }

    fn finish(&self, pending: Pending, operators: bool, out: &mut Vec<Token>) {
        let Pending {
            text,
            quoted_at,
            escaped_first,
            ..
        } = pending;

        if quoted_at == Some(0) {
            out.push(Token::Quoted(text));
            return;
        }
        if escaped_first {
            out.push(Token::literal(text));
            return;
        }
        if !operators {
            out.push(Token::Word(text));
            return;
        }
        if text.len() == 1 && text.starts_with(OR_OPERATOR) {
            out.push(Token::Operator(OR_OPERATOR));
            return;
        }
        if let Some(rest) = text.strip_prefix(NOT_OPERATOR) {
            out.push(Token::Operator(NOT_OPERATOR));
            if quoted_at == Some(1) {
                out.push(Token::Quoted(rest.to_string()));
            } else if !rest.is_empty() {
                out.push(Token::literal(rest));
            }
            return;
        }
        out.push(Token::Word(text));
    }

    /// Render one token back into lexer input.
    ///
    /// Re-tokenizing the output in command mode yields the same token, so a
    /// token slice can be joined into text and handed to another parser
    /// without losing quoting. A `Word` that looks like an operator is
    /// rendered bare and lexes as one in search mode; use [`Token::literal`]
    /// to keep it literal there.
    pub fn render(&self, token: &Token) -> String {
        match token {
            Token::Operator(c) => c.to_string(),
            Token::Quoted(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push(self.quote);
                for c in s.chars() {
                    if c == self.quote || c == self.escape {
                        out.push(self.escape);
                    }
                    out.push(c);
                }
                out.push(self.quote);
                out
            }
            Token::Word(s) | Token::Escaped(s) => {
                let escape_first = matches!(token, Token::Escaped(_));
                let mut out = String::with_capacity(s.len() + 1);
                for (i, c) in s.chars().enumerate() {
                    let special = c.is_whitespace()
                        || c == self.quote
                        || c == self.escape
                        || (i == 0 && escape_first && (c == NOT_OPERATOR || c == OR_OPERATOR));
                    if special {
                        out.push(self.escape);
                    }
                    out.push(c);
                }
                out
            }
        }
    }

    /// Render a token slice, separated by single spaces.
    pub fn render_all(&self, tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|t| self.render(t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render command-line tokens as input for [`Lexer::tokenize_search`].
    ///
    /// A leading `!` and a lone `|` on a typed word stay live so they lex as
    /// operators; on a [`Token::Escaped`] they stay escaped. The command-line
    /// lexer has already merged `!"John Doe"` into the word `!John Doe`; a
    /// negated word with whitespace is therefore re-quoted.
    pub fn render_search_source(&self, tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|token| match token {
                Token::Word(w) if w.len() == 1 && w.starts_with(OR_OPERATOR) => w.clone(),
                Token::Word(w) => match w.strip_prefix(NOT_OPERATOR) {
                    Some(rest) if rest.chars().any(char::is_whitespace) => {
                        format!("{NOT_OPERATOR}{}", self.render(&Token::Quoted(rest.to_string())))
                    }
                    Some(rest) if !rest.is_empty() => {
                        format!("{NOT_OPERATOR}{}", self.render(&Token::literal(rest)))
                    }
                    _ => self.render(token),
                },
                other => self.render(other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Tokenize with the default quote/escape characters.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::default().tokenize(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<Token> {
        items.iter().map(|s| Token::word(*s)).collect()
    }

    #[test]
    fn splits_on_whitespace_and_drops_it() {
        assert_eq!(tokenize("  grant  user\tbob read "), words(&["grant", "user", "bob", "read"]));
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn quoted_segments_preserve_whitespace() {
        assert_eq!(
            tokenize(r#"say "hello   world" now"#),
            vec![Token::word("say"), Token::quoted("hello   world"), Token::word("now")]
        );
    }

    #[test]
    fn adjacent_segments_join_into_one_word() {
        assert_eq!(tokenize(r#"name:"John Doe""#), words(&["name:John Doe"]));
        assert_eq!(tokenize(r#""John"Doe"#), vec![Token::quoted("JohnDoe")]);
    }

    #[test]
    fn escapes_are_literal() {
        assert_eq!(tokenize(r#"a\ b"#), words(&["a b"]));
        assert_eq!(tokenize(r#""say \"hi\"""#), vec![Token::quoted(r#"say "hi""#)]);
        assert_eq!(tokenize(r#""a\\b""#), vec![Token::quoted(r"a\b")]);
        assert_eq!(tokenize("trailing\\"), words(&["trailing\\"]));
    }

    #[test]
    fn unmatched_quote_takes_the_remainder() {
        assert_eq!(
            tokenize(r#"echo "unterminated  text"#),
            vec![Token::word("echo"), Token::quoted("unterminated  text")]
        );
    }

    #[test]
    fn empty_quotes_produce_an_empty_token() {
        assert_eq!(tokenize(r#"set """#), vec![Token::word("set"), Token::quoted("")]);
    }

    #[test]
    fn custom_quote_and_escape() {
        let lexer = Lexer::new('\'', '^');
        assert_eq!(
            lexer.tokenize("say 'a b' c^ d"),
            vec![Token::word("say"), Token::quoted("a b"), Token::word("c d")]
        );
    }

    #[test]
    fn search_mode_emits_operators() {
        let lexer = Lexer::default();
        assert_eq!(
            lexer.tokenize_search(r#"!active | name:bob !"John Doe" \!literal"#),
            vec![
                Token::Operator('!'),
                Token::word("active"),
                Token::Operator('|'),
                Token::word("name:bob"),
                Token::Operator('!'),
                Token::quoted("John Doe"),
                Token::Escaped("!literal".into()),
            ]
        );
        assert_eq!(lexer.tokenize_search(r"\| \x"), vec![Token::Escaped("|".into()), Token::word("x")]);
    }

    #[test]
    fn command_mode_treats_operators_as_text() {
        assert_eq!(tokenize("!x |"), words(&["!x", "|"]));
        assert_eq!(
            tokenize(r"\!x \| a\!"),
            vec![Token::Escaped("!x".into()), Token::Escaped("|".into()), Token::word("a!")]
        );
        assert!(Token::Escaped("!x".into()).is_word());
        assert_eq!(Token::Escaped("!x".into()).text(), "!x");
    }

    #[test]
    fn render_round_trips_tricky_tokens() {
        let lexer = Lexer::default();
        let tokens = vec![
            Token::word("name:John Doe"),
            Token::quoted(r#"say "hi" \o/"#),
            Token::word("!bang"),
            Token::word("|"),
            Token::Escaped("!kept".into()),
            Token::quoted(""),
        ];
        let text = lexer.render_all(&tokens);
        assert_eq!(text, r#"name:John\ Doe "say \"hi\" \\o/" !bang | \!kept """#);
        assert_eq!(lexer.tokenize(&text), tokens);

        let literal = vec![Token::literal("!bang"), Token::literal("|"), Token::literal("plain")];
        let text = lexer.render_all(&literal);
        assert_eq!(lexer.tokenize(&text), literal);
        assert_eq!(lexer.tokenize_search(&text), literal);
    }

    #[test]
    fn search_source_keeps_operators_live() {
        let lexer = Lexer::default();
        let command_tokens = lexer.tokenize(r#"name:"John Doe" !active | !"bad guy" "quoted text""#);
        let source = lexer.render_search_source(&command_tokens);
        assert_eq!(
            lexer.tokenize_search(&source),
            vec![
                Token::word("name:John Doe"),
                Token::Operator('!'),
                Token::word("active"),
                Token::Operator('|'),
                Token::Operator('!'),
                Token::quoted("bad guy"),
                Token::quoted("quoted text"),
            ]
        );
        assert_eq!(Token::word("a b").to_source(), r"a\ b");
    }

    #[test]
    fn search_source_keeps_escaped_operators_literal() {
        let lexer = Lexer::default();
        let command_tokens = lexer.tokenize(r"\!active \| !\!x");
        let source = lexer.render_search_source(&command_tokens);
        assert_eq!(source, r"\!active \| !\!x");
        assert_eq!(
            lexer.tokenize_search(&source),
            vec![
                Token::Escaped("!active".into()),
                Token::Escaped("|".into()),
                Token::Operator('!'),
                Token::Escaped("!x".into()),
            ]
        );
    }
}
