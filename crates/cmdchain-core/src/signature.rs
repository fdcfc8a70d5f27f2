//! Signatures: one declared overload of a command.

use crate::arguments::{Variant, VariantShape};
use crate::error::RegistrationError;
use std::fmt;

/// An ordered sequence of argument variants, validated on construction.
#[derive(Clone)]
pub struct Signature {
    variants: Vec<Variant>,
    allow_trailing: bool,
    description: Option<String>,
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("usage", &self.usage(""))
            .field("allow_trailing", &self.allow_trailing)
            .finish()
    }
}

impl Signature {
    /// Build a signature, checking that every variant may follow its
    /// predecessor and that no two variants exclude each other.
    pub fn new(variants: Vec<Variant>) -> Result<Self, RegistrationError> {
        for (position, pair) in variants.windows(2).enumerate() {
            if !pair[0].can_extend(&*pair[1]) {
                return Err(RegistrationError::InvalidChain {
                    position: position + 1,
                    reason: format!(
                        "`{}` consumes the rest of the input and cannot be followed by `{}`",
                        pair[0].usage(),
                        pair[1].usage()
                    ),
                });
            }
        }
        for (i, a) in variants.iter().enumerate() {
            for (j, b) in variants.iter().enumerate().skip(i + 1) {
                if !a.can_coexist(&**b) || !b.can_coexist(&**a) {
                    return Err(RegistrationError::InvalidChain {
                        position: j,
                        reason: format!(
                            "`{}` cannot appear in the same signature as `{}`",
                            b.usage(),
                            a.usage()
                        ),
                    });
                }
            }
        }
        Ok(Self {
            variants,
            allow_trailing: false,
            description: None,
        })
    }

    /// Accept (and ignore) tokens left over after the last variant.
    pub fn allow_trailing(mut self) -> Self {
        self.allow_trailing = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn allows_trailing(&self) -> bool {
        self.allow_trailing
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True when some variant swallows the rest of the input.
    pub fn is_terminal(&self) -> bool {
        self.variants.iter().any(|v| v.is_terminal())
    }

    pub fn shape(&self) -> Vec<VariantShape> {
        self.variants.iter().map(|v| v.shape()).collect()
    }

    /// Usage line, e.g. `grant user <name> <permission>`.
    pub fn usage(&self, label: &str) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.variants.len() + 1);
        if !label.is_empty() {
            parts.push(label.to_string());
        }
        parts.extend(self.variants.iter().map(|v| v.usage()));
        parts.join(" ")
    }

    /// Two signatures that no input can tell apart.
    pub fn is_indistinguishable_from(&self, other: &Signature) -> bool {
        self.allow_trailing == other.allow_trailing && self.shape() == other.shape()
    }
}

/// Reject overload sets containing indistinguishable signatures.
pub fn check_overloads(command: &str, signatures: &[&Signature]) -> Result<(), RegistrationError> {
    if signatures.is_empty() {
        return Err(RegistrationError::EmptyCommand(command.to_string()));
    }
    for (i, a) in signatures.iter().enumerate() {
        for (j, b) in signatures.iter().enumerate().skip(i + 1) {
            if a.is_indistinguishable_from(b) {
                return Err(RegistrationError::AmbiguousSignatures {
                    command: command.to_string(),
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}
