//! Entry point tying the lexer, the root router and presentation together.

use crate::arguments::{Label, Variant};
use crate::command::{CommandExecutor, CommandSender, HelpEntry};
use crate::config::FrameworkConfig;
use crate::error::CommandError;
use crate::presentation::{render_error, render_help};
use crate::router::Router;
use crate::search::{SearchExpression, SearchHandlers};
use std::sync::Arc;

pub struct Dispatcher {
    config: FrameworkConfig,
    root: Arc<Router>,
}

impl Dispatcher {
    pub fn new(config: FrameworkConfig, root: Arc<Router>) -> Self {
        Self { config, root }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn root(&self) -> &Arc<Router> {
        &self.root
    }

    /// Tokenize `line` and route it from the root.
    pub fn dispatch(&self, sender: &dyn CommandSender, line: &str) -> Result<(), CommandError> {
        let tokens = self.config.lexer.tokenize(line);
        tracing::debug!(sender = sender.name(), tokens = tokens.len(), "dispatching line");
        self.root.execute(sender, "", &tokens)
    }

    /// Like [`Dispatcher::dispatch`], but reports a failure to the sender.
    pub fn handle(&self, sender: &dyn CommandSender, line: &str) -> Result<(), CommandError> {
        self.dispatch(sender, line).map_err(|err| {
            sender.send_message(&self.render_error(&err));
            err
        })
    }

    pub fn help(&self, sender: &dyn CommandSender) -> Result<Vec<HelpEntry>, CommandError> {
        self.root.help(sender, "")
    }

    pub fn render_help(&self, entries: &[HelpEntry]) -> String {
        render_help(entries, self.config.glyphs)
    }

    pub fn render_error(&self, err: &CommandError) -> String {
        render_error(err, self.config.glyphs)
    }

    /// Keyword variant honoring the configured case sensitivity.
    pub fn label(&self, literal: &str) -> Variant {
        Arc::new(Label::new(literal).case_sensitive(self.config.labels_case_sensitive))
    }

    /// Search variant using the configured lexer.
    pub fn search_variant(&self, name: &str, handlers: Arc<SearchHandlers>) -> Variant {
        Arc::new(SearchExpression::new(name, self.config.lexer, handlers))
    }
}
