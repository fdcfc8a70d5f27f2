//! Commands: a named set of overloads, each with its own body.

use crate::arguments::Variant;
use crate::chain::Arguments;
use crate::error::{CommandError, RegistrationError};
use crate::lexer::Token;
use crate::permission::PermissionNode;
use crate::resolver::{resolve, Resolution};
use crate::signature::{check_overloads, Signature};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Whoever issued a command line.
pub trait CommandSender: Send + Sync {
    fn name(&self) -> &str;
    fn send_message(&self, message: &str);
}

/// Sender that keeps every message it receives.
#[derive(Debug, Default)]
pub struct RecordingSender {
    name: String,
    messages: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// One usage line for help output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpEntry {
    pub usage: String,
    pub description: Option<String>,
}

/// Anything a router can dispatch to: a [`Command`] or a nested router.
pub trait CommandExecutor: Send + Sync {
    /// Run with `args`, the tokens after `label`.
    fn execute(&self, sender: &dyn CommandSender, label: &str, args: &[Token]) -> Result<(), CommandError>;

    fn help(&self, sender: &dyn CommandSender, label: &str) -> Result<Vec<HelpEntry>, CommandError>;

    /// Node a sender must hold to run or list this executor.
    fn permission(&self) -> Option<&PermissionNode> {
        None
    }
}

/// What a command body sees.
pub struct Invocation<'a> {
    pub sender: &'a dyn CommandSender,
    pub label: &'a str,
    pub arguments: Arguments,
    /// Index of the resolved overload.
    pub overload: usize,
    pub signature: &'a Signature,
}

impl Invocation<'_> {
    pub fn reply(&self, message: impl AsRef<str>) {
        self.sender.send_message(message.as_ref());
    }
}

pub type CommandBody = Arc<dyn Fn(&Invocation<'_>) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
struct Overload {
    signature: Signature,
    body: CommandBody,
}

#[derive(Clone)]
pub struct Command {
    name: String,
    description: Option<String>,
    permission: Option<PermissionNode>,
    overloads: Vec<Overload>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("permission", &self.permission)
            .field("signatures", &self.signatures())
            .finish()
    }
}

impl Command {
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            description: None,
            permission: None,
            overloads: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn signatures(&self) -> Vec<&Signature> {
        self.overloads.iter().map(|o| &o.signature).collect()
    }

    /// Pick the overload for `tokens` without running it.
    pub fn resolve(&self, label: &str, tokens: &[Token]) -> Result<Resolution, CommandError> {
        resolve(label, &self.signatures(), tokens)
    }
}

impl CommandExecutor for Command {
    fn execute(&self, sender: &dyn CommandSender, label: &str, args: &[Token]) -> Result<(), CommandError> {
        let Resolution { index, arguments, .. } = self.resolve(label, args)?;
        let overload = &self.overloads[index];
        let invocation = Invocation {
            sender,
            label,
            arguments,
            overload: index,
            signature: &overload.signature,
        };
        tracing::debug!(command = %self.name, label, overload = index, sender = sender.name(), "running command");
        (overload.body)(&invocation).map_err(CommandError::from_body)
    }

    fn help(&self, _sender: &dyn CommandSender, label: &str) -> Result<Vec<HelpEntry>, CommandError> {
        Ok(self
            .overloads
            .iter()
            .map(|o| HelpEntry {
                usage: o.signature.usage(label),
                description: o
                    .signature
                    .description()
                    .or(self.description.as_deref())
                    .map(str::to_string),
            })
            .collect())
    }

    fn permission(&self) -> Option<&PermissionNode> {
        self.permission.as_ref()
    }
}

/// Builder for [`Command`]. Signature errors are reported by
/// [`CommandBuilder::build`].
pub struct CommandBuilder {
    name: String,
    description: Option<String>,
    permission: Option<PermissionNode>,
    overloads: Vec<Overload>,
    error: Option<RegistrationError>,
}

impl CommandBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn permission(mut self, node: PermissionNode) -> Self {
        self.permission = Some(node);
        self
    }

    /// Add an overload built from `variants`.
    pub fn overload<F>(self, variants: Vec<Variant>, body: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        match Signature::new(variants) {
            Ok(signature) => self.overload_with(signature, body),
            Err(err) => self.fail(err),
        }
    }

    /// Add an overload with a prepared signature (trailing input, description).
    pub fn overload_with<F>(mut self, signature: Signature, body: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.overloads.push(Overload {
            signature,
            body: Arc::new(body),
        });
        self
    }

    fn fail(mut self, err: RegistrationError) -> Self {
        self.error.get_or_insert(err);
        self
    }

    pub fn build(self) -> Result<Command, RegistrationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(RegistrationError::InvalidLabel(self.name));
        }
        let signatures: Vec<&Signature> = self.overloads.iter().map(|o| &o.signature).collect();
        check_overloads(&self.name, &signatures)?;
        Ok(Command {
            name: self.name,
            description: self.description,
            permission: self.permission,
            overloads: self.overloads,
        })
    }
}
