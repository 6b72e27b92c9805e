//! Configuration options for reading Pica+ dumps.
//!
//! This module provides the [`PicaConfig`] struct which controls how boundary
//! marker lines are recognised and how field bodies are split into subfields.

/// Literal prefix of a boundary marker line.
pub const DEFAULT_MARKER_PREFIX: &str = "SET:";

/// Whitespace token position (0-indexed) of the record key on a marker line.
pub const DEFAULT_KEY_POSITION: usize = 6;

/// Subfield separator used by plaintext Pica+ exports.
pub const DEFAULT_SEPARATOR: char = 'ƒ';

/// Configuration for framing and parsing a Pica+ dump.
///
/// # Examples
///
/// ```
/// use pica_parse::PicaConfig;
///
/// // Defaults: "SET:" markers, key at token 6, 'ƒ' subfield separator
/// let config = PicaConfig::default();
/// assert_eq!(config.separator, 'ƒ');
///
/// // A dump whose subfields are delimited with '$'
/// let config = PicaConfig::default().with_separator('$');
/// assert_eq!(config.separator, '$');
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PicaConfig {
    /// Prefix identifying a boundary marker line.
    pub marker_prefix: String,

    /// Token position of the record key on a marker line.
    ///
    /// Tokens are separated by runs of whitespace. A marker with fewer than
    /// `key_position + 1` tokens is malformed.
    pub key_position: usize,

    /// Subfield separator stored on every record built with this config.
    pub separator: char,
}

impl Default for PicaConfig {
    fn default() -> Self {
        PicaConfig {
            marker_prefix: DEFAULT_MARKER_PREFIX.to_string(),
            key_position: DEFAULT_KEY_POSITION,
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl PicaConfig {
    /// Set the subfield separator.
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set the boundary marker prefix.
    #[must_use]
    pub fn with_marker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.marker_prefix = prefix.into();
        self
    }

    /// Set the key token position on marker lines.
    #[must_use]
    pub fn with_key_position(mut self, position: usize) -> Self {
        self.key_position = position;
        self
    }
}
