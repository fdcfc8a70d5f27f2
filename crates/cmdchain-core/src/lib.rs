//! cmdchain: command-argument resolution for chat-style bots.
//!
//! A command line is tokenized shell-style, routed by label through nested
//! [`Router`]s, and resolved against a [`Command`]'s overloads: each
//! [`Signature`] is an ordered chain of pluggable argument variants, and the
//! resolver picks the best-matching chain by priority. Search arguments are
//! compiled into a backend-agnostic [`PredicateTree`].
//!
//! ## Module Organization
//!
//! - `lexer`: shell-style tokenizer (command and search modes)
//! - `chain`, `arguments`, `signature`, `resolver`: overload resolution
//! - `command`, `router`, `dispatcher`: execution surface
//! - `search`: search expressions, handlers, predicate algebra, backends
//! - `permission`, `presentation`, `config`: supporting concerns

pub mod arguments;
pub mod chain;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lexer;
pub mod permission;
pub mod presentation;
pub mod resolver;
pub mod router;
pub mod search;
pub mod signature;
mod snapshot;

pub use arguments::{ArgumentVariant, Variant, VariantShape};
pub use chain::{ArgValue, Arguments, ChainState, Priority};
pub use command::{
    Command, CommandBuilder, CommandExecutor, CommandSender, HelpEntry, Invocation, RecordingSender,
};
pub use config::{ConfigError, FrameworkConfig};
pub use dispatcher::Dispatcher;
pub use error::{CastLevel, CommandError, ErrorKind, RegistrationError};
pub use lexer::{tokenize, Lexer, Token};
pub use permission::{AllowAll, Grants, NodeId, PermissionCheck, PermissionNode, PermissionNodes};
pub use presentation::GlyphStyle;
pub use resolver::{resolve, Resolution};
pub use router::Router;
pub use search::{CompiledSearch, PredicateBackend, PredicateNode, PredicateTree, Search, SearchHandlers};
pub use signature::Signature;
