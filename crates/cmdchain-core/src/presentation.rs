//! Rendering errors and help for people. Glyphs are applied here and nowhere
//! else; error values carry plain messages.

use crate::command::HelpEntry;
use crate::error::{CommandError, ErrorKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlyphStyle {
    #[default]
    Unicode,
    Plain,
}

impl GlyphStyle {
    pub fn glyph(self, kind: ErrorKind) -> &'static str {
        match (self, kind) {
            (GlyphStyle::Unicode, ErrorKind::NotFound) => "❓",
            (GlyphStyle::Unicode, ErrorKind::Argument | ErrorKind::ArgumentCast(_)) => "⚠",
            (GlyphStyle::Unicode, ErrorKind::Access) => "⛔",
            (GlyphStyle::Unicode, ErrorKind::Execution) => "✖",
            (GlyphStyle::Plain, ErrorKind::NotFound) => "[not found]",
            (GlyphStyle::Plain, ErrorKind::Argument | ErrorKind::ArgumentCast(_)) => "[invalid]",
            (GlyphStyle::Plain, ErrorKind::Access) => "[denied]",
            (GlyphStyle::Plain, ErrorKind::Execution) => "[error]",
        }
    }

    /// Marker pointing at the offending input in argument errors.
    pub fn pointer(self) -> &'static str {
        match self {
            GlyphStyle::Unicode => "➜",
            GlyphStyle::Plain => ">",
        }
    }

    pub fn bullet(self) -> &'static str {
        match self {
            GlyphStyle::Unicode => "•",
            GlyphStyle::Plain => "-",
        }
    }
}

pub fn render_error(err: &CommandError, style: GlyphStyle) -> String {
    let kind = err.kind();
    match kind {
        ErrorKind::Argument | ErrorKind::ArgumentCast(_) => {
            format!("{} {} {}", style.glyph(kind), style.pointer(), err.message())
        }
        _ => format!("{} {}", style.glyph(kind), err.message()),
    }
}

pub fn render_help(entries: &[HelpEntry], style: GlyphStyle) -> String {
    let width = entries.iter().map(|e| e.usage.chars().count()).max().unwrap_or(0);
    entries
        .iter()
        .map(|entry| match &entry.description {
            Some(desc) => format!("{} {:<width$}  {desc}", style.bullet(), entry.usage),
            None => format!("{} {}", style.bullet(), entry.usage),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
