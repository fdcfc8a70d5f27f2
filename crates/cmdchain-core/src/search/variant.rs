//! The argument variant that turns the rest of a command line into a
//! compiled search.

use super::handler::SearchHandlers;
use super::parse::Search;
use super::predicate::PredicateTree;
use crate::arguments::{ArgumentVariant, VariantShape};
use crate::chain::{ArgValue, ChainState, Priority};
use crate::error::CommandError;
use crate::lexer::Lexer;
use serde::Serialize;
use std::sync::Arc;

/// A search bound to a command argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSearch {
    /// The search text as re-assembled from the command line.
    pub source: String,
    pub search: Search,
    pub tree: PredicateTree,
}

/// Consumes every remaining token, re-lexes them as a search expression and
/// compiles them with `handlers`. Matches empty input as the unrestricted
/// search. At most one per signature.
#[derive(Debug, Clone)]
pub struct SearchExpression {
    name: String,
    lexer: Lexer,
    handlers: Arc<SearchHandlers>,
}

impl SearchExpression {
    pub fn new(name: impl Into<String>, lexer: Lexer, handlers: Arc<SearchHandlers>) -> Self {
        Self {
            name: name.into(),
            lexer,
            handlers,
        }
    }
}

impl ArgumentVariant for SearchExpression {
    fn cast(&self, state: &mut ChainState<'_>) -> Result<Priority, CommandError> {
        let source = self.lexer.render_search_source(state.remaining());
        let search = Search::parse(&self.lexer, &source)?;
        let tree = self.handlers.compile(&search)?;
        state.take_rest();
        state.push(ArgValue::Search(CompiledSearch { source, search, tree }));
        Ok(Priority::Low)
    }

    fn shape(&self) -> VariantShape {
        VariantShape::Search
    }

    fn usage(&self) -> String {
        format!("<{}...>", self.name)
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn can_extend(&self, _other: &dyn ArgumentVariant) -> bool {
        false
    }

    fn can_coexist(&self, other: &dyn ArgumentVariant) -> bool {
        other.shape() != VariantShape::Search
    }
}

/// Search over the rest of the line with the default lexer.
pub fn search(name: impl Into<String>, handlers: Arc<SearchHandlers>) -> crate::arguments::Variant {
    Arc::new(SearchExpression::new(name, Lexer::default(), handlers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::{label, optional, text};
    use crate::error::RegistrationError;
    use crate::lexer::tokenize;
    use crate::search::handlers::{equals, flag};
    use crate::search::predicate::PredicateNode;
    use crate::signature::Signature;

    fn handlers() -> Arc<SearchHandlers> {
        let handlers = SearchHandlers::new();
        handlers.register_handler("name", equals("name")).unwrap();
        handlers.register_command("active", flag("active", true)).unwrap();
        Arc::new(handlers)
    }

    #[test]
    fn consumes_the_rest_and_compiles() {
        let variant = search("query", handlers());
        let tokens = tokenize(r#"name:"John Doe" !active"#);
        let mut state = ChainState::new(&tokens);
        assert_eq!(variant.cast(&mut state).unwrap(), Priority::Low);
        assert!(state.is_exhausted());
        let ArgValue::Search(compiled) = &state.values()[0] else {
            panic!("expected a search value");
        };
        assert_eq!(compiled.source, r"name:John\ Doe !active");
        assert_eq!(
            compiled.tree.root(),
            &PredicateNode::and([
                PredicateNode::equals("name", "John Doe"),
                PredicateNode::equals("active", true).negate(),
            ])
        );
    }

    #[test]
    fn empty_input_is_unrestricted() {
        let variant = search("query", handlers());
        let mut state = ChainState::new(&[]);
        assert_eq!(variant.cast(&mut state).unwrap(), Priority::Low);
        let ArgValue::Search(compiled) = &state.values()[0] else {
            panic!("expected a search value");
        };
        assert!(compiled.tree.is_unrestricted());
    }

    #[test]
    fn compile_errors_surface_and_leave_state_untouched() {
        let variant = search("query", handlers());
        let tokens = tokenize("colour:red");
        let mut state = ChainState::new(&tokens);
        let err = variant.cast(&mut state).unwrap_err();
        assert_eq!(err.message(), "Unexpected argument/command: \"colour\"");
        assert_eq!(state.position(), 0);
    }

    #[test]
    fn escaped_operators_stay_literal_through_the_command_line() {
        let signatures = [Signature::new(vec![label("find"), search("query", handlers())]).unwrap()];
        let refs: Vec<&Signature> = signatures.iter().collect();

        let err = crate::resolver::resolve("users", &refs, &tokenize(r"find \!active")).unwrap_err();
        assert_eq!(err.message(), "Unexpected argument/command: \"!active\"");
        let err = crate::resolver::resolve("users", &refs, &tokenize(r"find active \| name:bob")).unwrap_err();
        assert_eq!(err.message(), "Unexpected argument/command: \"|\"");

        let resolved = crate::resolver::resolve("users", &refs, &tokenize("find !active | name:bob")).unwrap();
        let ArgValue::Search(compiled) = resolved.arguments.get(1).unwrap() else {
            panic!("expected a search value");
        };
        assert_eq!(
            compiled.tree.root(),
            &PredicateNode::or([
                PredicateNode::equals("active", true).negate(),
                PredicateNode::equals("name", "bob"),
            ])
        );
    }

    #[test]
    fn one_search_per_signature_and_nothing_after_it() {
        let h = handlers();
        assert!(Signature::new(vec![label("find"), search("query", Arc::clone(&h))]).is_ok());
        assert!(matches!(
            Signature::new(vec![search("a", Arc::clone(&h)), text("b")]),
            Err(RegistrationError::InvalidChain { position: 1, .. })
        ));
        assert!(matches!(
            Signature::new(vec![search("a", Arc::clone(&h)), optional(search("b", h))]),
            Err(RegistrationError::InvalidChain { .. })
        ));
    }
}
