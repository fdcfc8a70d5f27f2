//! Framework configuration, loaded from JSON.

use crate::lexer::Lexer;
use crate::presentation::GlyphStyle;
use crate::router::{Router, DEFAULT_SUGGESTION_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Quote and escape characters for command lines and searches
    pub lexer: Lexer,
    /// Match label variants case-sensitively
    pub labels_case_sensitive: bool,
    /// Glyphs used when rendering errors and help
    pub glyphs: GlyphStyle,
    /// Minimum similarity (0..=1) for "did you mean" hints
    pub suggestion_threshold: f64,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            lexer: Lexer::default(),
            labels_case_sensitive: false,
            glyphs: GlyphStyle::Unicode,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
        }
    }
}

impl FrameworkConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Lexer { quote, escape } = self.lexer;
        if quote == escape {
            return Err(ConfigError::Invalid(format!(
                "quote and escape must differ (both are {quote:?})"
            )));
        }
        if quote.is_whitespace() || escape.is_whitespace() {
            return Err(ConfigError::Invalid("quote and escape must not be whitespace".into()));
        }
        if !(0.0..=1.0).contains(&self.suggestion_threshold) {
            return Err(ConfigError::Invalid(format!(
                "suggestion_threshold must be within 0..=1, got {}",
                self.suggestion_threshold
            )));
        }
        Ok(())
    }

    /// An empty router using this configuration.
    pub fn router(&self) -> Router {
        Router::new().with_suggestion_threshold(self.suggestion_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let config = FrameworkConfig::from_json_str(r#"{ "glyphs": "plain" }"#).unwrap();
        assert_eq!(config.glyphs, GlyphStyle::Plain);
        assert_eq!(config.lexer, Lexer::default());
        assert!(!config.labels_case_sensitive);
    }

    #[test]
    fn partial_lexer_section_merges_with_defaults() {
        let config = FrameworkConfig::from_json_str(r#"{ "lexer": { "quote": "'" } }"#).unwrap();
        assert_eq!(config.lexer, Lexer::new('\'', '\\'));
    }

    #[test]
    fn conflicting_characters_are_rejected() {
        let err = FrameworkConfig::from_json_str(r#"{ "lexer": { "quote": "\\" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
        let err = FrameworkConfig::from_json_str(r#"{ "suggestion_threshold": 3 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
        assert!(matches!(
            FrameworkConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "labels_case_sensitive": true }}"#).unwrap();
        let config = FrameworkConfig::load(file.path()).unwrap();
        assert!(config.labels_case_sensitive);

        let missing = FrameworkConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
