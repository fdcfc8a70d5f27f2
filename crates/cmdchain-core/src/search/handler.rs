//! Handler registry and the search compiler.

use super::parse::{Clause, Combinator, Search, SearchArgument, SearchOperator, SearchPredicate};
use super::predicate::{PredicateNode, PredicateTree};
use crate::error::{CommandError, RegistrationError};
use crate::snapshot::Snapshot;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Translates one resolved clause into a predicate node.
pub trait ClauseHandler: Send + Sync {
    fn handle(&self, operator: SearchOperator, value: &str) -> Result<PredicateNode, CommandError>;
}

impl<F> ClauseHandler for F
where
    F: Fn(SearchOperator, &str) -> Result<PredicateNode, CommandError> + Send + Sync,
{
    fn handle(&self, operator: SearchOperator, value: &str) -> Result<PredicateNode, CommandError> {
        self(operator, value)
    }
}

pub type Handler = Arc<dyn ClauseHandler>;

#[derive(Clone, Default)]
struct HandlerTable {
    named: BTreeMap<String, Handler>,
    commands: BTreeMap<String, Handler>,
    string: Option<Handler>,
}

/// Registry of search handlers: named (`name:value`), command (bare word),
/// and at most one string handler for quoted text.
///
/// Names are matched case-insensitively. Reads take a snapshot, so a
/// compilation in progress is unaffected by concurrent registration.
#[derive(Default)]
pub struct SearchHandlers {
    table: Snapshot<HandlerTable>,
}

impl fmt::Debug for SearchHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.load();
        f.debug_struct("SearchHandlers")
            .field("named", &table.named.keys().collect::<Vec<_>>())
            .field("commands", &table.commands.keys().collect::<Vec<_>>())
            .field("string", &table.string.is_some())
            .finish()
    }
}

fn handler_key(name: &str) -> Result<String, RegistrationError> {
    let invalid = name.is_empty()
        || name.chars().any(|c| c.is_whitespace() || super::parse::OPERATOR_CHARS.contains(c));
    if invalid {
        return Err(RegistrationError::InvalidLabel(name.to_string()));
    }
    Ok(name.to_lowercase())
}

impl SearchHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler(&self, name: &str, handler: impl ClauseHandler + 'static) -> Result<(), RegistrationError> {
        let key = handler_key(name)?;
        let handler: Handler = Arc::new(handler);
        self.table.try_update(|table| {
            if table.named.contains_key(&key) {
                return Err(RegistrationError::DuplicateHandler(name.to_string()));
            }
            table.named.insert(key, handler);
            Ok(())
        })
    }

    pub fn register_command(&self, name: &str, handler: impl ClauseHandler + 'static) -> Result<(), RegistrationError> {
        let key = handler_key(name)?;
        let handler: Handler = Arc::new(handler);
        self.table.try_update(|table| {
            if table.commands.contains_key(&key) {
                return Err(RegistrationError::DuplicateHandler(name.to_string()));
            }
            table.commands.insert(key, handler);
            Ok(())
        })
    }

    /// Install the string handler, replacing any previous one.
    pub fn register_string_handler(&self, handler: impl ClauseHandler + 'static) {
        let handler: Handler = Arc::new(handler);
        self.table.update(|table| table.string = Some(handler));
    }

    pub fn unregister_handler(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.table.update(|table| table.named.remove(&key).is_some())
    }

    pub fn unregister_command(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.table.update(|table| table.commands.remove(&key).is_some())
    }

    pub fn clear_string_handler(&self) -> bool {
        self.table.update(|table| table.string.take().is_some())
    }

    /// Names accepted as `name:value`.
    pub fn handler_names(&self) -> Vec<String> {
        self.table.load().named.keys().cloned().collect()
    }

    /// Bare words accepted as commands.
    pub fn command_names(&self) -> Vec<String> {
        self.table.load().commands.keys().cloned().collect()
    }

    /// Compile a parsed search into a predicate tree.
    ///
    /// Each clause is dispatched to its handler, negated when prefixed by
    /// `!`, and folded into the running tree with its combinator. An empty
    /// search compiles to [`PredicateNode::All`].
    pub fn compile(&self, search: &Search) -> Result<PredicateTree, CommandError> {
        let table = self.table.load();
        let mut root: Option<PredicateNode> = None;

        for clause in search.clauses() {
            let node = table.compile_clause(clause)?;
            let node = if clause.negated { node.negate() } else { node };
            root = Some(match (root, clause.combinator) {
                (None, _) => node,
                (Some(acc), Combinator::And) => PredicateNode::and([acc, node]),
                (Some(acc), Combinator::Or) => PredicateNode::or([acc, node]),
            });
        }

        let tree = PredicateTree::new(root.unwrap_or(PredicateNode::All));
        tracing::debug!(clauses = search.clauses().len(), "compiled search");
        Ok(tree)
    }
}

impl HandlerTable {
    fn compile_clause(&self, clause: &Clause) -> Result<PredicateNode, CommandError> {
        match &clause.predicate {
            SearchPredicate::String(text) => match &self.string {
                Some(handler) => handler.handle(SearchOperator::Colon, text),
                None => Err(CommandError::argument("This search does not handle string arguments.")),
            },
            SearchPredicate::Argument(raw) => match SearchArgument::split(raw) {
                Some(arg) => {
                    let handler = self
                        .named
                        .get(&arg.name.to_lowercase())
                        .ok_or_else(|| unexpected(arg.name))?;
                    tracing::trace!(name = arg.name, operator = ?arg.operator, "search clause");
                    handler.handle(arg.operator, arg.value)
                }
                None => {
                    let handler = self.commands.get(&raw.to_lowercase()).ok_or_else(|| unexpected(raw))?;
                    tracing::trace!(command = %raw, "search command");
                    handler.handle(SearchOperator::Colon, "")
                }
            },
        }
    }
}

fn unexpected(name: &str) -> CommandError {
    CommandError::argument(format!("Unexpected argument/command: \"{name}\""))
}
