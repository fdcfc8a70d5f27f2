//! Error taxonomy.
//!
//! [`CommandError`] is what a user sees when their input is rejected. It is a
//! plain tagged union: a machine-readable kind plus a message. Glyphs and
//! colors are applied later by [`crate::presentation`].
//!
//! [`RegistrationError`] covers programming mistakes caught while commands,
//! routes, and search handlers are being registered. They are surfaced at
//! startup and never at call time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown in place of any failure that is not a [`CommandError`].
pub const UNEXPECTED_PROBLEM: &str = "An unexpected problem occurred while running this command.";

/// Sub-level of an argument cast failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastLevel {
    /// The selected signature does not carry the requested value.
    Router,
    /// A value matched structurally but could not be converted.
    Cast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Argument,
    ArgumentCast(CastLevel),
    Access,
    Execution,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No route matched a label.
    #[error("{0}")]
    NotFound(String),
    /// A signature rejected its input, or a search handler lookup failed.
    #[error("{0}")]
    Argument(String),
    #[error("{message}")]
    ArgumentCast { level: CastLevel, message: String },
    /// The sender lacks permission for the resolved executor.
    #[error("{0}")]
    Access(String),
    /// A command body failed unexpectedly.
    #[error("{0}")]
    Execution(String),
}

impl CommandError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    pub fn cast(message: impl Into<String>) -> Self {
        Self::ArgumentCast {
            level: CastLevel::Cast,
            message: message.into(),
        }
    }

    pub fn router(message: impl Into<String>) -> Self {
        Self::ArgumentCast {
            level: CastLevel::Router,
            message: message.into(),
        }
    }

    pub fn access(message: impl Into<String>) -> Self {
        Self::Access(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Argument(_) => ErrorKind::Argument,
            Self::ArgumentCast { level, .. } => ErrorKind::ArgumentCast(*level),
            Self::Access(_) => ErrorKind::Access,
            Self::Execution(_) => ErrorKind::Execution,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Argument(m)
            | Self::Access(m)
            | Self::Execution(m)
            | Self::ArgumentCast { message: m, .. } => m,
        }
    }

    /// Convert a failure returned by a command body.
    ///
    /// Structured errors pass through unchanged. Anything else is logged and
    /// replaced by [`UNEXPECTED_PROBLEM`] so internals never reach the user.
    pub fn from_body(err: anyhow::Error) -> Self {
        match err.downcast::<CommandError>() {
            Ok(structured) => structured,
            Err(other) => {
                tracing::error!(error = %other, detail = ?other, "command body failed unexpectedly");
                Self::Execution(UNEXPECTED_PROBLEM.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("route `{0}` is already registered")]
    DuplicateRoute(String),
    #[error("route `{0}` is not registered")]
    UnknownRoute(String),
    #[error("invalid label `{0}`: labels must be non-empty and contain no whitespace")]
    InvalidLabel(String),
    #[error("command `{0}` declares no signatures")]
    EmptyCommand(String),
    #[error("invalid signature at argument {position}: {reason}")]
    InvalidChain { position: usize, reason: String },
    #[error("command `{command}`: signatures {first} and {second} are indistinguishable")]
    AmbiguousSignatures {
        command: String,
        first: usize,
        second: usize,
    },
    #[error("search handler `{0}` is already registered")]
    DuplicateHandler(String),
}
