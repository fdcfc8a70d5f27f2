//! Chain resolver: pick the best-matching overload for a token sequence.
//!
//! Every candidate signature is tried on its own fork of the token cursor,
//! applying its variants strictly left to right. An attempt fails when a
//! variant reports [`Priority::None`] or a cast error, or when tokens remain
//! and the signature neither ends in a terminal variant nor allows trailing
//! input. Among the attempts that succeed, the one with the lexicographically
//! greatest priority vector wins; ties go to the earliest declaration.
//!
//! Resolution is deterministic: identical input and an unchanged overload set
//! always select the same signature and produce the same values.

use crate::chain::{Arguments, ChainState, Priority};
use crate::error::CommandError;
use crate::lexer::Token;
use crate::signature::Signature;

/// The winning overload.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Index of the selected signature in declaration order.
    pub index: usize,
    pub priorities: Vec<Priority>,
    pub arguments: Arguments,
}

#[derive(Debug)]
enum Rejection {
    NoMatch,
    Failed(CommandError),
    Leftover(Token),
}

#[derive(Debug)]
struct Attempt {
    /// Number of variants that matched before the attempt stopped.
    depth: usize,
    outcome: Result<(Vec<Priority>, Arguments), Rejection>,
}

fn attempt(signature: &Signature, tokens: &[Token]) -> Attempt {
    let mut state = ChainState::new(tokens);
    let mut priorities = Vec::with_capacity(signature.variants().len());

    for (depth, variant) in signature.variants().iter().enumerate() {
        match variant.cast(&mut state) {
            Ok(Priority::None) => {
                return Attempt {
                    depth,
                    outcome: Err(Rejection::NoMatch),
                }
            }
            Ok(priority) => priorities.push(priority),
            Err(err) => {
                return Attempt {
                    depth,
                    outcome: Err(Rejection::Failed(err)),
                }
            }
        }
    }

    let depth = priorities.len();
    if let Some(extra) = state.peek() {
        if !signature.is_terminal() && !signature.allows_trailing() {
            return Attempt {
                depth,
                outcome: Err(Rejection::Leftover(extra.clone())),
            };
        }
    }

    Attempt {
        depth,
        outcome: Ok((priorities, Arguments::new(state.into_values()))),
    }
}

/// Resolve `tokens` (the input after the command's own label) against the
/// command's overloads.
pub fn resolve(label: &str, signatures: &[&Signature], tokens: &[Token]) -> Result<Resolution, CommandError> {
    let mut best: Option<Resolution> = None;
    let mut deepest_failure: Option<(usize, Rejection)> = None;

    for (index, signature) in signatures.iter().enumerate() {
        let Attempt { depth, outcome } = attempt(signature, tokens);
        match outcome {
            Ok((priorities, arguments)) => {
                tracing::trace!(label, index, ?priorities, "signature matched");
                let better = best
                    .as_ref()
                    .map_or(true, |current| priorities > current.priorities);
                if better {
                    best = Some(Resolution {
                        index,
                        priorities,
                        arguments,
                    });
                }
            }
            Err(rejection) => {
                tracing::trace!(label, index, depth, ?rejection, "signature rejected");
                let deeper = deepest_failure
                    .as_ref()
                    .map_or(true, |(best_depth, _)| depth > *best_depth);
                if deeper {
                    deepest_failure = Some((depth, rejection));
                }
            }
        }
    }

    if let Some(resolution) = best {
        tracing::debug!(
            label,
            index = resolution.index,
            priorities = ?resolution.priorities,
            "resolved command arguments"
        );
        return Ok(resolution);
    }

    Err(match deepest_failure {
        Some((_, Rejection::Failed(err))) => err,
        Some((_, Rejection::Leftover(extra))) => {
            CommandError::argument(format!("Too many arguments: unexpected `{extra}`. {}", usage_hint(label, signatures)))
        }
        _ => CommandError::argument(format!("No matching arguments. {}", usage_hint(label, signatures))),
    })
}

fn usage_hint(label: &str, signatures: &[&Signature]) -> String {
    let lines: Vec<String> = signatures.iter().map(|s| s.usage(label)).collect();
    match lines.as_slice() {
        [] => String::new(),
        [one] => format!("Usage: {one}"),
        many => format!("Usage: {}", many.join(" | ")),
    }
}
