//! Search predicate compiler.
//!
//! A search expression (`name:"John Doe" active | !banned`) is tokenized in
//! search mode, parsed into clauses, and compiled clause by clause through a
//! [`SearchHandlers`] registry into a backend-agnostic [`PredicateTree`].
//! Backends implement [`PredicateBackend`] to turn the tree into a query.

pub mod backend;
pub mod handler;
pub mod handlers;
pub mod parse;
pub mod predicate;
pub mod variant;

pub use backend::{MemoryBackend, MemoryBackendError, PredicateBackend, Record};
pub use handler::{ClauseHandler, Handler, SearchHandlers};
pub use parse::{Clause, Combinator, Search, SearchArgument, SearchOperator, SearchPredicate};
pub use predicate::{Comparison, PredicateNode, PredicateTree, Value};
pub use variant::{search, CompiledSearch, SearchExpression};
